//! Error taxonomy for receiver control.
//!
//! None of these are fatal: the service loop logs them and keeps polling.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiverError {
    /// Timeout, connection refused or non-200 status. The transport already
    /// collapsed this into an empty response.
    #[error("no response from receiver at {0}")]
    Transport(String),

    /// XML that could not be parsed, or a field with an unexpected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The device answered a PUT with a non-zero RC code.
    #[error("receiver rejected command (RC={0})")]
    Rejected(String),

    #[error("{operation} is not supported while source is {current_source}")]
    UnsupportedOperation {
        operation: String,
        current_source: String,
    },

    /// The menu stayed busy (or never reached the requested layer) within
    /// the retry budget.
    #[error("menu navigation still busy after {attempts} attempts")]
    NavigationBusy { attempts: u32 },

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("invalid preset {0} (expected 1-8)")]
    InvalidPreset(String),

    #[error("invalid menu path: {0}")]
    InvalidPath(String),

    #[error("invalid receiver endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ReceiverError {
    pub fn unsupported(operation: impl Into<String>, current_source: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            current_source: current_source.into(),
        }
    }

    /// Whether the failure means the device could not be reached (as opposed
    /// to a bad request from the caller).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::NavigationBusy { .. })
    }
}

pub type Result<T, E = ReceiverError> = std::result::Result<T, E>;
