//! Error taxonomy for device automation.
//!
//! The split matters to callers:
//!
//! - [`DeviceError::Transport`] is recoverable locally, either by falling
//!   back to the other backend or by reconnect-and-retry.
//! - [`DeviceError::HumanTakeoverRequired`] is fatal by design: the retry
//!   budget is spent and automation must stop until a human intervenes.
//!   It is surfaced through every layer unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which transport backend an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// JSON-line RPC to the on-device automation agent. Preferred.
    Bridge,
    /// Raw `adb shell` commands. Fallback.
    Shell,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Bridge => write!(f, "bridge"),
            Backend::Shell => write!(f, "shell"),
        }
    }
}

/// Errors produced by the device automation layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeviceError {
    /// The device serial could not be found or addressed at all.
    #[error("device '{serial}' unreachable: {reason}")]
    DeviceUnreachable { serial: String, reason: String },

    /// A single transport call failed. Recovered locally by backend
    /// fallback or reconnect-and-retry; only escalated when both
    /// backends are out of options.
    #[error("{backend} transport failed during {op}: {message}")]
    Transport {
        backend: Backend,
        op: &'static str,
        message: String,
    },

    /// Both capture backends failed for one screenshot request.
    #[error("screenshot failed on all backends")]
    CaptureFailed,

    /// A capture or wire payload could not be decoded. Retried like a
    /// transport failure: the bytes were damaged in transit more often
    /// than the screen is unreadable.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Retry budget exhausted with no remaining backend to try.
    /// Fatal: not to be caught and continued on.
    #[error("{op} failed after {attempts} attempts, human takeover required")]
    HumanTakeoverRequired { op: &'static str, attempts: u32 },

    /// Malformed action target or region. A programming error,
    /// surfaced immediately and never retried.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
}

impl DeviceError {
    /// Shorthand for a transport-level failure.
    pub fn transport(backend: Backend, op: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            backend,
            op,
            message: message.into(),
        }
    }

    /// True for errors that must stop automation rather than be absorbed
    /// by fallback logic.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::HumanTakeoverRequired { .. })
    }
}

/// Result alias used across droidpilot.
pub type Result<T> = std::result::Result<T, DeviceError>;
