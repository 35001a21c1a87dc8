//! Market data.
//!
//! Defines the `MarketDataService` trait: conversion rates and the
//! aggregate lended totals that feed the per-cycle status line.

pub mod paper;

use async_trait::async_trait;

use crate::types::LendingError;

/// Conversion rates and lended totals, refreshed once per cycle.
#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Refresh rates into `output_currency`. `report_extended` asks for the
    /// extra per-currency stats that only matter when status is persisted.
    async fn refresh(&self, output_currency: &str, report_extended: bool) -> Result<(), LendingError>;

    /// One-line summary of what is currently lent out.
    fn current_lended_summary(&self) -> String;

    /// Longest loan duration still allowed before `end_date`, formatted for `mode`.
    fn max_duration_until(&self, end_date: Option<&str>, mode: &str) -> String;
}
