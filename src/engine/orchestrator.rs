//! Cycle orchestrator: the polling loop.
//!
//! Each cycle runs refresh → transfer → cancel → lend → report, then sleeps
//! for the strategy's sleep time. A failure skips the rest of the cycle and
//! is classified: fatal classes end the loop, everything else is logged and
//! retried from the top after the same sleep.

use futures::FutureExt;
use std::any::Any;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::interrupt::Interrupt;
use crate::config::AppConfig;
use crate::lending::LendingStrategy;
use crate::market::MarketDataService;
use crate::status::StatusLog;
use crate::types::{CycleOutcome, ErrorClass, LendingError};

/// Mode passed to `max_duration_until` for the status line.
const STATUS_MODE: &str = "status";

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Terminated(ErrorClass),
}

/// Decide what follows a cycle. Pure: no logging, no sleeping.
pub fn next_state(outcome: &CycleOutcome) -> PollState {
    match outcome {
        CycleOutcome::Success => PollState::Polling,
        CycleOutcome::Failure { class, .. } if class.is_fatal() => PollState::Terminated(*class),
        CycleOutcome::Failure { .. } => PollState::Polling,
    }
}

/// How far a cycle got before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Completed,
    /// An interrupt arrived; holds the last step that ran.
    Halted(&'static str),
}

/// Why the polling loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The operator interrupted the loop; run the shutdown sequence.
    Interrupted,
    /// A fatal classified error; exit without cleanup.
    Fatal(ErrorClass),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Per-cycle parameters taken from the bot configuration.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub output_currency: String,
    pub report_extended: bool,
    pub end_date: Option<String>,
}

impl From<&AppConfig> for CycleSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            output_currency: cfg.bot.output_currency.clone(),
            report_extended: cfg.json_output_enabled(),
            end_date: cfg.bot.end_date.clone(),
        }
    }
}

pub struct CycleOrchestrator {
    market: Arc<dyn MarketDataService>,
    strategy: Arc<dyn LendingStrategy>,
    status: Arc<StatusLog>,
    clock: Arc<dyn Clock>,
    settings: CycleSettings,
    cycles: u64,
}

impl CycleOrchestrator {
    pub fn new(
        market: Arc<dyn MarketDataService>,
        strategy: Arc<dyn LendingStrategy>,
        status: Arc<StatusLog>,
        clock: Arc<dyn Clock>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            market,
            strategy,
            status,
            clock,
            settings,
            cycles: 0,
        }
    }

    /// Cycles attempted so far, failed ones included.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Poll until interrupted or a fatal error occurs.
    pub async fn run(&mut self, interrupt: &mut Interrupt) -> LoopExit {
        info!(
            output_currency = %self.settings.output_currency,
            "Entering main loop. Press Ctrl+C to stop."
        );
        loop {
            if interrupt.is_pending() {
                interrupt.acknowledge();
                info!("Shutdown signal received.");
                return LoopExit::Interrupted;
            }

            let outcome = self.run_cycle(interrupt).await;
            if let PollState::Terminated(class) = next_state(&outcome) {
                return LoopExit::Fatal(class);
            }

            let pause = self.strategy.sleep_time();
            tokio::select! {
                biased;
                _ = interrupt.recv() => {
                    info!("Shutdown signal received.");
                    return LoopExit::Interrupted;
                }
                _ = self.clock.sleep(pause) => {}
            }
        }
    }

    /// Run one cycle and report any failure. Does not sleep.
    ///
    /// A pending interrupt lets the in-flight step finish and skips the
    /// rest; it is left unacknowledged for the caller.
    pub async fn run_cycle(&mut self, interrupt: &Interrupt) -> CycleOutcome {
        self.cycles += 1;
        debug!(cycle = self.cycles, "Starting cycle");

        let result = match AssertUnwindSafe(self.execute_cycle(interrupt)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(LendingError::new(ErrorClass::Unknown, panic_message(&*panic))),
        };

        match result {
            Ok(Progress::Completed) => CycleOutcome::Success,
            Ok(Progress::Halted(step)) => {
                info!(cycle = self.cycles, after = step, "Cycle cut short by interrupt");
                CycleOutcome::Success
            }
            Err(err) => {
                self.report_failure(&err);
                CycleOutcome::from(&err)
            }
        }
    }

    async fn execute_cycle(&self, interrupt: &Interrupt) -> Result<Progress, LendingError> {
        self.market
            .refresh(&self.settings.output_currency, self.settings.report_extended)
            .await?;
        if interrupt.is_pending() {
            return Ok(Progress::Halted("refresh"));
        }
        self.strategy.transfer_balances().await?;
        if interrupt.is_pending() {
            return Ok(Progress::Halted("transfer_balances"));
        }
        self.strategy.cancel_all().await?;
        if interrupt.is_pending() {
            return Ok(Progress::Halted("cancel_all"));
        }
        self.strategy.lend_all().await?;
        if interrupt.is_pending() {
            return Ok(Progress::Halted("lend_all"));
        }

        self.status.refresh_status(
            self.market.current_lended_summary(),
            self.market
                .max_duration_until(self.settings.end_date.as_deref(), STATUS_MODE),
        );
        self.status
            .persist()
            .map_err(|e| LendingError::from_message(format!("{e:#}")))?;
        flush_stdout();
        Ok(Progress::Completed)
    }

    fn report_failure(&self, err: &LendingError) {
        let class = err.class();
        self.status.log_error(err.message());
        if let Err(e) = self.status.persist() {
            warn!(error = %e, "Failed to persist status");
        }

        match class {
            ErrorClass::InvalidCredentials | ErrorClass::NonceConflict | ErrorClass::PermissionDenied => {
                error!(
                    class = %class,
                    hint = class.hint().unwrap_or_default(),
                    "!!! Troubleshooting !!!"
                );
            }
            ErrorClass::Timeout => {
                warn!(
                    cycle = self.cycles,
                    "Timed out, will retry in {}sec",
                    self.strategy.sleep_time().as_secs()
                );
            }
            ErrorClass::Unknown => {
                error!(
                    cycle = self.cycles,
                    trace = err.trace().unwrap_or_default(),
                    "Unhandled error, please open an issue so it can be fixed!"
                );
            }
        }
        flush_stdout();
    }
}

fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic during cycle: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic during cycle: {s}")
    } else {
        "panic during cycle".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
