//! Paper strategy: logs what a live strategy would do and never places
//! real offers.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use super::LendingStrategy;
use crate::types::LendingError;

pub struct PaperStrategy {
    sleep_time: Duration,
}

impl PaperStrategy {
    pub fn new(sleep_time: Duration) -> Self {
        Self { sleep_time }
    }
}

#[async_trait]
impl LendingStrategy for PaperStrategy {
    async fn transfer_balances(&self) -> Result<(), LendingError> {
        info!("[DRY RUN] Would transfer balances to lending account");
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), LendingError> {
        info!("[DRY RUN] Would cancel open loan offers");
        Ok(())
    }

    async fn lend_all(&self) -> Result<(), LendingError> {
        info!("[DRY RUN] Would place loan offers");
        Ok(())
    }

    fn sleep_time(&self) -> Duration {
        self.sleep_time
    }
}
