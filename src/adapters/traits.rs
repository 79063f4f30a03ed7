use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::bus::SharedBus;

/// Context passed to a running adapter service
pub struct AdapterContext {
    /// Event bus for publishing events
    pub bus: SharedBus,
    /// Cancellation token for shutdown coordination
    pub shutdown: CancellationToken,
}

/// Command that can be sent to an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum AdapterCommand {
    TurnOn,
    TurnOff,
    /// Fraction in `[0, 1]`.
    VolumeAbsolute(f64),
    Mute(bool),
    /// Host-facing source name, e.g. `"Net Radio"`.
    SelectSource(String),
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Shuffle(bool),
    PlayMedia {
        media_type: String,
        media_id: String,
    },
}

/// Response from command execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterCommandResponse {
    pub success: bool,
    pub error: Option<String>,
}

impl AdapterCommandResponse {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
