//! Exchange integration.
//!
//! Defines the `ExchangeGateway` trait: the narrow slice of the lending
//! exchange's authenticated API the engine needs. The live protocol client
//! lives outside this crate; `paper` provides an in-memory stand-in.

pub mod paper;

use async_trait::async_trait;

use crate::types::{LendingError, LoanRecord};

/// Authenticated calls against the lending exchange.
///
/// Every call may block for a long time or fail; timeout detection is the
/// implementor's job and should surface as `ErrorClass::Timeout`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// All loans currently provided by the account.
    async fn list_active_loans(&self) -> Result<Vec<LoanRecord>, LendingError>;

    /// Flip the auto-renew flag of one loan.
    async fn toggle_auto_renew(&self, loan_id: u64) -> Result<(), LendingError>;
}
