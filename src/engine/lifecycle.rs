//! Process lifecycle.
//!
//! Startup: start the status server, then clear auto-renew on every loan.
//! Runtime: hand control to the polling loop.
//! Shutdown (interrupt only): restore auto-renew, stop the status server.
//! A fatal cycle error returns straight away with no shutdown steps.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use super::autorenew::{AutoRenewController, AutoRenewError};
use super::interrupt::Interrupt;
use super::orchestrator::{CycleOrchestrator, LoopExit};
use crate::config::StatusServerConfig;
use crate::dashboard::StatusReporter;
use crate::status::StatusLog;
use crate::types::{AutoRenewTarget, ProcessExit, ProcessState};

pub struct LifecycleManager {
    orchestrator: CycleOrchestrator,
    status: Arc<StatusLog>,
    auto_renew: Option<AutoRenewController>,
    reporter: Option<ReporterSlot>,
    state: ProcessState,
}

struct ReporterSlot {
    reporter: Box<dyn StatusReporter>,
    config: StatusServerConfig,
    started: bool,
}

impl LifecycleManager {
    pub fn new(orchestrator: CycleOrchestrator, status: Arc<StatusLog>) -> Self {
        Self {
            orchestrator,
            status,
            auto_renew: None,
            reporter: None,
            state: ProcessState::Starting,
        }
    }

    /// Clear auto-renew at startup and restore it at shutdown.
    pub fn with_auto_renew(mut self, controller: AutoRenewController) -> Self {
        self.auto_renew = Some(controller);
        self
    }

    pub fn with_status_reporter(
        mut self,
        reporter: Box<dyn StatusReporter>,
        config: StatusServerConfig,
    ) -> Self {
        self.reporter = Some(ReporterSlot {
            reporter,
            config,
            started: false,
        });
        self
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn orchestrator(&self) -> &CycleOrchestrator {
        &self.orchestrator
    }

    /// Run startup, the polling loop, and (on interrupt) shutdown.
    ///
    /// Errors from auto-renew passes or the status server are returned
    /// as-is; they are outside the loop's retry policy.
    pub async fn run(&mut self, mut interrupt: Interrupt) -> Result<ProcessExit> {
        self.state = ProcessState::Starting;
        let interrupted = self.startup(&mut interrupt).await?;

        if !interrupted {
            self.state = ProcessState::Running;
            info!(state = %self.state, "Startup complete");
            if let LoopExit::Fatal(class) = self.orchestrator.run(&mut interrupt).await {
                return Ok(ProcessExit::Fatal(class));
            }
        }

        self.shutdown(&mut interrupt).await?;
        Ok(ProcessExit::Graceful)
    }

    /// Returns `true` if the operator interrupted the startup clear.
    async fn startup(&mut self, interrupt: &mut Interrupt) -> Result<bool> {
        if let Some(slot) = self.reporter.as_mut() {
            slot.reporter
                .start(&slot.config)
                .await
                .context("Failed to start status server")?;
            slot.started = true;
        }

        if let Some(controller) = &self.auto_renew {
            match controller.set_auto_renew(AutoRenewTarget::Clear, interrupt).await {
                Ok(_) => {}
                Err(AutoRenewError::Interrupted { toggled }) => {
                    warn!(toggled, "Interrupted while clearing auto-renew");
                    return Ok(true);
                }
                Err(e) => return Err(e).context("Failed to clear auto-renew"),
            }
        }
        Ok(false)
    }

    async fn shutdown(&mut self, interrupt: &mut Interrupt) -> Result<()> {
        self.state = ProcessState::ShuttingDown;
        info!(state = %self.state, "Shutting down");

        if let Some(controller) = &self.auto_renew {
            match controller.set_auto_renew(AutoRenewTarget::Set, interrupt).await {
                Ok(_) => {}
                // A second interrupt abandons the restore but not the rest of shutdown.
                Err(AutoRenewError::Interrupted { toggled }) => {
                    warn!(toggled, "Auto-renew restore interrupted");
                }
                Err(e) => return Err(e).context("Failed to restore auto-renew"),
            }
        }

        if let Some(slot) = self.reporter.as_mut().filter(|s| s.started) {
            slot.reporter
                .stop()
                .await
                .context("Failed to stop status server")?;
            slot.started = false;
        }

        self.status.log("bye");
        if let Err(e) = self.status.persist() {
            warn!(error = %e, "Failed to persist final status");
        }
        self.state = ProcessState::Stopped;
        info!(
            state = %self.state,
            cycles = self.orchestrator.cycles(),
            "Shut down cleanly."
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
