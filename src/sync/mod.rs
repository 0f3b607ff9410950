//! Synchronization core - merges user commands, status polls and push events
//! into one display state

mod coordinator;
mod poller;
mod recording;
mod registry;
mod run_state;

use thiserror::Error;

pub use coordinator::{create_console_channels, Coordinator};
pub use poller::StatusPoller;
pub use recording::{
    Detection, RecordingPhase, RecordingSession, RecordingWorkflow, ResolveOutcome, TickOutcome,
    COUNTDOWN_DONE,
};
pub use registry::{validate_new_gesture, GestureRegistry};
pub use run_state::{ControlAction, EngineRunState, RunStateMachine, Transition};

/// Commands that can be sent to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start gesture recognition
    StartEngine,
    /// Stop gesture recognition
    StopEngine,
    /// Retrain the model
    Retrain,
    /// Reload the gesture registry
    LoadGestures,
    /// Register a new gesture
    AddGesture {
        name: String,
        action: String,
        description: String,
    },
    /// Register a gesture carrying the last detected finger count
    SaveRecorded {
        name: String,
        action: String,
        description: String,
    },
    /// Remove a gesture by id
    DeleteGesture(i64),
    /// Begin recording a new sample
    Record,
    /// Leave the recording workflow
    LeaveRecording,
    /// Camera / capture device report
    Device(DeviceStatus),
    /// Shutdown the coordinator
    Shutdown,
}

/// Capture device state reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    Connected,
    Failed(String),
}

/// Input rejected before any request is issued
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a gesture name.")]
    EmptyName,

    #[error("Unknown action \"{0}\".")]
    UnknownAction(String),

    #[error("Nothing recorded to save. Record a gesture first.")]
    NothingRecorded,
}
