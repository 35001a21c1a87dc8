//! Paper exchange.
//!
//! Holds the account's active loans in memory so the bot can run end to
//! end without a live exchange client.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::info;

use super::ExchangeGateway;
use crate::types::{ErrorClass, LendingError, LoanRecord};

/// In-memory exchange. Clones share the same loan book.
#[derive(Debug, Clone, Default)]
pub struct PaperExchange {
    loans: Arc<Mutex<Vec<LoanRecord>>>,
}

impl PaperExchange {
    pub fn new(loans: Vec<LoanRecord>) -> Self {
        Self {
            loans: Arc::new(Mutex::new(loans)),
        }
    }

    /// Current loan book.
    pub fn loans(&self) -> Vec<LoanRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LoanRecord>> {
        self.loans.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ExchangeGateway for PaperExchange {
    async fn list_active_loans(&self) -> Result<Vec<LoanRecord>, LendingError> {
        Ok(self.loans())
    }

    async fn toggle_auto_renew(&self, loan_id: u64) -> Result<(), LendingError> {
        let mut loans = self.lock();
        let loan = loans
            .iter_mut()
            .find(|l| l.id == loan_id)
            .ok_or_else(|| {
                LendingError::new(ErrorClass::Unknown, format!("No active loan with id {loan_id}"))
            })?;
        loan.auto_renew = !loan.auto_renew;
        info!(loan_id, auto_renew = loan.auto_renew, "[DRY RUN] Toggled auto-renew");
        Ok(())
    }
}
