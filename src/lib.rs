//! LENDBOT: Resilient lending-exchange offer bot
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod exchange;
pub mod market;
pub mod lending;
pub mod status;
pub mod engine;
pub mod dashboard;
