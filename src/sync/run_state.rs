//! Engine control state machine
//!
//! Transitions are applied optimistically when a control request is issued.
//! If the request later fails and no newer transition has happened since,
//! the machine reverts to the state it held before the request.

use serde::Serialize;
use std::fmt;

use crate::ui::LogKind;

/// Client-local engine run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineRunState {
    #[default]
    Stopped,
    Running,
    Training,
}

impl EngineRunState {
    /// Header label
    pub fn label(&self) -> &'static str {
        match self {
            EngineRunState::Stopped => "System Stopped",
            EngineRunState::Running => "System Running",
            EngineRunState::Training => "Retraining...",
        }
    }
}

impl fmt::Display for EngineRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineRunState::Stopped => "Stopped",
            EngineRunState::Running => "Running",
            EngineRunState::Training => "Training",
        })
    }
}

/// User-initiated control requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Stop,
    Retrain,
}

impl ControlAction {
    /// State applied as soon as the request is issued
    pub fn target(&self) -> EngineRunState {
        match self {
            ControlAction::Start => EngineRunState::Running,
            ControlAction::Stop => EngineRunState::Stopped,
            ControlAction::Retrain => EngineRunState::Training,
        }
    }

    /// Feed line written when the request is issued
    pub fn announcement(&self) -> (LogKind, &'static str) {
        match self {
            ControlAction::Start => (LogKind::Info, "Gesture recognition started."),
            ControlAction::Stop => (LogKind::Error, "Gesture recognition stopped."),
            ControlAction::Retrain => (LogKind::Info, "Retraining model..."),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ControlAction::Start => "Start",
            ControlAction::Stop => "Stop",
            ControlAction::Retrain => "Retrain",
        }
    }
}

/// Receipt for an optimistic transition, handed back on completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub action: ControlAction,
    previous: EngineRunState,
    ticket: u64,
}

#[derive(Debug, Default)]
pub struct RunStateMachine {
    state: EngineRunState,
    control_error: Option<String>,
    /// Bumped by every local write; a failed request only reverts if it is still the latest
    ticket: u64,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EngineRunState {
        self.state
    }

    pub fn control_error(&self) -> Option<&str> {
        self.control_error.as_deref()
    }

    /// Apply the optimistic transition for `action`
    pub fn begin(&mut self, action: ControlAction) -> Transition {
        let previous = self.state;
        self.state = action.target();
        self.ticket += 1;
        Transition {
            action,
            previous,
            ticket: self.ticket,
        }
    }

    /// Settle a transition once its request finishes.
    ///
    /// Returns the error message to surface when the request failed.
    pub fn complete(&mut self, transition: Transition, result: Result<(), String>) -> Option<String> {
        match result {
            Ok(()) => {
                self.control_error = None;
                None
            }
            Err(reason) => {
                if transition.ticket == self.ticket {
                    self.state = transition.previous;
                }
                let message = format!("{} request failed: {}", transition.action.name(), reason);
                self.control_error = Some(message.clone());
                Some(message)
            }
        }
    }

    /// `retrain_complete` forces the engine to stopped regardless of prior state
    pub fn retrain_complete(&mut self) {
        self.state = EngineRunState::Stopped;
        self.ticket += 1;
    }
}
