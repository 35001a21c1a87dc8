//! In-memory collaborators for integration testing.
//!
//! Deterministic stand-ins for the exchange, market data, strategy, and
//! clock, fully controllable from test code.

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lendbot::engine::clock::Clock;
use lendbot::engine::interrupt::InterruptTrigger;
use lendbot::exchange::ExchangeGateway;
use lendbot::lending::LendingStrategy;
use lendbot::market::MarketDataService;
use lendbot::types::{LendingError, LoanRecord};

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// Exchange that records every toggle call.
#[derive(Clone, Default)]
pub struct MockExchange {
    loans: Arc<Mutex<Vec<LoanRecord>>>,
    toggles: Arc<Mutex<Vec<u64>>>,
    /// Fire the interrupt right after this many toggles.
    interrupt_after: Arc<Mutex<Option<(usize, InterruptTrigger)>>>,
}

impl MockExchange {
    pub fn with_flags(flags: &[bool]) -> Self {
        let loans = flags
            .iter()
            .enumerate()
            .map(|(i, &f)| LoanRecord::new(100 + i as u64, "BTC", dec!(0.1), f))
            .collect();
        Self {
            loans: Arc::new(Mutex::new(loans)),
            ..Default::default()
        }
    }

    pub fn interrupt_after(&self, toggles: usize, trigger: InterruptTrigger) {
        *self.interrupt_after.lock().unwrap() = Some((toggles, trigger));
    }

    pub fn flags(&self) -> Vec<bool> {
        self.loans.lock().unwrap().iter().map(|l| l.auto_renew).collect()
    }

    pub fn toggles(&self) -> Vec<u64> {
        self.toggles.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeGateway for MockExchange {
    async fn list_active_loans(&self) -> Result<Vec<LoanRecord>, LendingError> {
        Ok(self.loans.lock().unwrap().clone())
    }

    async fn toggle_auto_renew(&self, loan_id: u64) -> Result<(), LendingError> {
        {
            let mut loans = self.loans.lock().unwrap();
            let loan = loans
                .iter_mut()
                .find(|l| l.id == loan_id)
                .ok_or_else(|| LendingError::from_message(format!("unknown loan {loan_id}")))?;
            loan.auto_renew = !loan.auto_renew;
        }
        let count = {
            let mut toggles = self.toggles.lock().unwrap();
            toggles.push(loan_id);
            toggles.len()
        };
        if let Some((after, trigger)) = self.interrupt_after.lock().unwrap().as_ref() {
            if count == *after {
                trigger.fire();
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// Market data whose `refresh` fails with queued messages, then succeeds.
#[derive(Default)]
pub struct ScriptedMarket {
    failures: Mutex<VecDeque<String>>,
    refreshes: Mutex<usize>,
}

impl ScriptedMarket {
    pub fn failing_with(messages: &[&str]) -> Self {
        Self {
            failures: Mutex::new(messages.iter().map(|m| m.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn refreshes(&self) -> usize {
        *self.refreshes.lock().unwrap()
    }
}

#[async_trait]
impl MarketDataService for ScriptedMarket {
    async fn refresh(&self, _output_currency: &str, _report_extended: bool) -> Result<(), LendingError> {
        *self.refreshes.lock().unwrap() += 1;
        match self.failures.lock().unwrap().pop_front() {
            Some(msg) => Err(LendingError::from_message(msg)),
            None => Ok(()),
        }
    }

    fn current_lended_summary(&self) -> String {
        "Lended: BTC:0.30000000".to_string()
    }

    fn max_duration_until(&self, _end_date: Option<&str>, _mode: &str) -> String {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Strategy whose `lend_all` can be made to fail; records every call.
pub struct ScriptedStrategy {
    pub sleep: Duration,
    pub lend_error: Mutex<Option<String>>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl ScriptedStrategy {
    pub fn new(sleep_secs: u64) -> Self {
        Self {
            sleep: Duration::from_secs(sleep_secs),
            lend_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_lend(sleep_secs: u64, message: &str) -> Self {
        let s = Self::new(sleep_secs);
        *s.lend_error.lock().unwrap() = Some(message.to_string());
        s
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LendingStrategy for ScriptedStrategy {
    async fn transfer_balances(&self) -> Result<(), LendingError> {
        self.calls.lock().unwrap().push("transfer");
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), LendingError> {
        self.calls.lock().unwrap().push("cancel");
        Ok(())
    }

    async fn lend_all(&self) -> Result<(), LendingError> {
        self.calls.lock().unwrap().push("lend");
        match self.lend_error.lock().unwrap().clone() {
            Some(msg) => Err(LendingError::from_message(msg)),
            None => Ok(()),
        }
    }

    fn sleep_time(&self) -> Duration {
        self.sleep
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Records requested sleeps and interrupts the loop on the `stop_after`-th one.
pub struct StopClock {
    sleeps: Mutex<Vec<Duration>>,
    stop_after: usize,
    trigger: InterruptTrigger,
}

impl StopClock {
    pub fn new(stop_after: usize, trigger: InterruptTrigger) -> Self {
        Self {
            sleeps: Mutex::new(Vec::new()),
            stop_after,
            trigger,
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for StopClock {
    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(duration);
            sleeps.len()
        };
        if count >= self.stop_after {
            self.trigger.fire();
            std::future::pending::<()>().await;
        }
    }
}
