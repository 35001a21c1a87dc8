//! Auto-renew controller.
//!
//! Brings every active loan's auto-renew flag to a target value in one
//! best-effort pass. Toggles are independent: if the pass stops early,
//! loans already processed keep their new flag.

use std::sync::Arc;
use tracing::{debug, info};

use super::interrupt::Interrupt;
use crate::exchange::ExchangeGateway;
use crate::status::StatusLog;
use crate::types::{AutoRenewTarget, LendingError};

#[derive(Debug, thiserror::Error)]
pub enum AutoRenewError {
    /// The operator interrupted the pass. `toggled` loans were already changed.
    #[error("auto-renew pass interrupted after {toggled} loans")]
    Interrupted { toggled: usize },

    #[error("auto-renew pass failed: {0}")]
    Exchange(#[from] LendingError),
}

pub struct AutoRenewController {
    exchange: Arc<dyn ExchangeGateway>,
    status: Arc<StatusLog>,
}

impl AutoRenewController {
    pub fn new(exchange: Arc<dyn ExchangeGateway>, status: Arc<StatusLog>) -> Self {
        Self { exchange, status }
    }

    /// Toggle every active loan whose flag differs from `target`.
    ///
    /// Returns the number of loans toggled. The count is logged on every
    /// exit path except an exchange failure, which aborts the pass as-is.
    pub async fn set_auto_renew(
        &self,
        target: AutoRenewTarget,
        interrupt: &mut Interrupt,
    ) -> Result<usize, AutoRenewError> {
        self.status
            .log(format!("{} AutoRenew...(Please Wait)", target.action()));

        let loans = self.exchange.list_active_loans().await?;
        let total = loans.len();
        let mut toggled = 0usize;

        for loan in loans.iter().filter(|l| target.needs_toggle(l.auto_renew)) {
            if interrupt.is_pending() {
                interrupt.acknowledge();
                self.log_toggled(toggled);
                return Err(AutoRenewError::Interrupted { toggled });
            }

            self.status.refresh_status(
                format!("Processing AutoRenew - {toggled} of {total} loans"),
                "",
            );
            debug!(loan_id = loan.id, currency = %loan.currency, ?target, "Toggling auto-renew");
            self.exchange.toggle_auto_renew(loan.id).await?;
            toggled += 1;
        }

        self.log_toggled(toggled);
        info!(?target, toggled, total, "Auto-renew pass complete");
        Ok(toggled)
    }

    fn log_toggled(&self, toggled: usize) {
        self.status.log(format!("Toggled AutoRenew for {toggled} loans"));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
