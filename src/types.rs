//! Shared types for the lending bot.
//!
//! The data model used across the exchange, engine, and status modules:
//! active loans, auto-renew targets, the five-way error taxonomy, and the
//! process lifecycle states.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::backtrace::Backtrace;
use std::fmt;

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

/// An active loan held by the account, as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: u64,
    pub currency: String,
    #[serde(default)]
    pub amount: Decimal,
    /// Exchange-side auto-renew flag (wire format is 0/1).
    #[serde(rename = "autoRenew", alias = "auto_renew", deserialize_with = "flag_from_wire")]
    pub auto_renew: bool,
}

impl LoanRecord {
    pub fn new(id: u64, currency: &str, amount: Decimal, auto_renew: bool) -> Self {
        Self {
            id,
            currency: currency.to_string(),
            amount,
            auto_renew,
        }
    }
}

/// Accept `0`/`1`, `"0"`/`"1"`, or a plain boolean.
fn flag_from_wire<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    match Wire::deserialize(deserializer)? {
        Wire::Bool(b) => Ok(b),
        Wire::Int(0) => Ok(false),
        Wire::Int(1) => Ok(true),
        Wire::Text(s) if s.trim() == "0" => Ok(false),
        Wire::Text(s) if s.trim() == "1" => Ok(true),
        _ => Err(serde::de::Error::custom("auto-renew flag must be 0 or 1")),
    }
}

/// Desired state of the auto-renew flag for a toggle pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoRenewTarget {
    Clear = 0,
    Set = 1,
}

impl AutoRenewTarget {
    /// The flag value a loan has once it matches this target.
    pub fn as_flag(self) -> bool {
        self == AutoRenewTarget::Set
    }

    /// Whether a loan with the given flag needs toggling to reach this target.
    pub fn needs_toggle(self, current: bool) -> bool {
        current != self.as_flag()
    }

    /// Verb used in operator-facing log lines.
    pub fn action(self) -> &'static str {
        match self {
            AutoRenewTarget::Clear => "Clearing",
            AutoRenewTarget::Set => "Setting",
        }
    }
}

impl From<bool> for AutoRenewTarget {
    fn from(flag: bool) -> Self {
        if flag {
            AutoRenewTarget::Set
        } else {
            AutoRenewTarget::Clear
        }
    }
}

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Classification of a collaborator failure.
///
/// Fatal classes stop the process; the rest are retried after the
/// strategy's sleep time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    InvalidCredentials,
    NonceConflict,
    PermissionDenied,
    Timeout,
    Unknown,
}

/// Message fragments matched (case-insensitively) in priority order.
const CLASS_PATTERNS: [(&str, ErrorClass); 4] = [
    ("invalid api key", ErrorClass::InvalidCredentials),
    ("nonce must be greater", ErrorClass::NonceConflict),
    ("permission denied", ErrorClass::PermissionDenied),
    ("timed out", ErrorClass::Timeout),
];

impl ErrorClass {
    /// Classify a raw failure message by substring match.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        CLASS_PATTERNS
            .iter()
            .find(|(pattern, _)| lower.contains(pattern))
            .map(|(_, class)| *class)
            .unwrap_or(ErrorClass::Unknown)
    }

    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorClass::InvalidCredentials | ErrorClass::NonceConflict | ErrorClass::PermissionDenied
        )
    }

    /// Remediation hint shown before a fatal exit.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            ErrorClass::InvalidCredentials => {
                Some("Are your API keys correct? No quotation. Just plain keys.")
            }
            ErrorClass::NonceConflict => Some(
                "Are you reusing the API key in multiple applications? \
                 Use a unique key for every application.",
            ),
            ErrorClass::PermissionDenied => {
                Some("Are you using IP filter on the key? Maybe your IP changed?")
            }
            ErrorClass::Timeout | ErrorClass::Unknown => None,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::InvalidCredentials => "invalid-credentials",
            ErrorClass::NonceConflict => "nonce-conflict",
            ErrorClass::PermissionDenied => "permission-denied",
            ErrorClass::Timeout => "timeout",
            ErrorClass::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Failure raised by an exchange, market-data, or strategy collaborator.
///
/// The raising side sets the classification. Collaborators that only have
/// message text go through [`LendingError::from_message`].
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct LendingError {
    class: ErrorClass,
    message: String,
    trace: Option<String>,
}

impl LendingError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        // Traces are captured for `Unknown` only.
        let trace = (class == ErrorClass::Unknown)
            .then(|| Backtrace::force_capture().to_string());
        Self {
            class,
            message: message.into(),
            trace,
        }
    }

    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorClass::classify(&message), message)
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Backtrace captured at construction, present for `Unknown` only.
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Cycle and process state
// ---------------------------------------------------------------------------

/// Result of one orchestration cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Success,
    Failure { message: String, class: ErrorClass },
}

impl From<&LendingError> for CycleOutcome {
    fn from(err: &LendingError) -> Self {
        CycleOutcome::Failure {
            message: err.message().to_string(),
            class: err.class(),
        }
    }
}

/// Process lifecycle: `Starting → Running → ShuttingDown → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Starting => write!(f, "STARTING"),
            ProcessState::Running => write!(f, "RUNNING"),
            ProcessState::ShuttingDown => write!(f, "SHUTTING_DOWN"),
            ProcessState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// How the process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// Interrupt-driven shutdown completed.
    Graceful,
    /// A fatal classified error; shutdown steps were skipped.
    Fatal(ErrorClass),
}

impl ProcessExit {
    pub fn code(self) -> i32 {
        match self {
            ProcessExit::Graceful => 0,
            ProcessExit::Fatal(_) => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
