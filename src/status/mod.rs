//! Status log.
//!
//! Holds the transient status line and a bounded activity log, persists
//! both to a JSON file, and publishes read-only snapshots for the status
//! server through a `watch` channel.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, error, info};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Point-in-time view of the bot's status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Latest status line, e.g. lended totals.
    pub status: String,
    /// Supplementary text shown after the status line.
    pub extra: String,
    /// Bumped on every status refresh.
    pub revision: u64,
    pub updated_at: Option<DateTime<Utc>>,
    /// Most recent entries, oldest first.
    pub log: VecDeque<LogEntry>,
}

// ---------------------------------------------------------------------------
// Status log
// ---------------------------------------------------------------------------

pub struct StatusLog {
    path: Option<PathBuf>,
    capacity: usize,
    tx: watch::Sender<StatusSnapshot>,
}

impl StatusLog {
    /// `path` is where `persist` writes; `None` keeps everything in memory.
    pub fn new(path: Option<PathBuf>, capacity: usize) -> Self {
        let (tx, _) = watch::channel(StatusSnapshot::default());
        Self {
            path,
            capacity: capacity.max(1),
            tx,
        }
    }

    /// Receiver for read-only snapshots. Never blocks the writer.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }

    /// Record an operator-facing activity line.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.push(LogLevel::Info, message);
    }

    pub fn log_error(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        self.push(LogLevel::Error, message);
    }

    /// Replace the transient status line.
    pub fn refresh_status(&self, status: impl Into<String>, extra: impl Into<String>) {
        let status = status.into();
        let extra = extra.into();
        debug!(status = %status, extra = %extra, "Status refreshed");
        self.tx.send_modify(|snap| {
            snap.status = status;
            snap.extra = extra;
            snap.revision += 1;
            snap.updated_at = Some(Utc::now());
        });
    }

    /// Write the current snapshot to the status file, if one is configured.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&*self.tx.borrow())
            .context("Failed to serialise status")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write status to {}", path.display()))?;
        debug!(path = %path.display(), "Status persisted");
        Ok(())
    }

    fn push(&self, level: LogLevel, message: String) {
        let capacity = self.capacity;
        self.tx.send_modify(|snap| {
            snap.log.push_back(LogEntry {
                timestamp: Utc::now(),
                level,
                message,
            });
            while snap.log.len() > capacity {
                snap.log.pop_front();
            }
        });
    }
}

/// Load a previously persisted snapshot.
pub fn load_snapshot(path: &Path) -> Result<StatusSnapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read status from {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse status from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
