//! Lending strategy.
//!
//! Defines the `LendingStrategy` trait. How much of each balance to lend,
//! and at what rate, is decided entirely by the implementor; the engine
//! only sequences the calls.

pub mod paper;

use async_trait::async_trait;
use std::time::Duration;

use crate::types::LendingError;

/// Per-cycle lending decisions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LendingStrategy: Send + Sync {
    /// Move idle balances into the lending account.
    async fn transfer_balances(&self) -> Result<(), LendingError>;

    /// Cancel open offers that are no longer wanted.
    async fn cancel_all(&self) -> Result<(), LendingError>;

    /// Place new offers for every lendable balance.
    async fn lend_all(&self) -> Result<(), LendingError>;

    /// How long to wait before the next cycle. Consulted after every cycle,
    /// failed or not.
    fn sleep_time(&self) -> Duration;
}
