//! Push events delivered asynchronously by the backend
//!
//! The backend emits two named events. Frames arrive either as
//! `{"event": "<name>", "data": {...}}` objects or as Socket.IO-style
//! `["<name>", {...}]` arrays; both decode into [`PushEvent`].

mod stream;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub use stream::spawn_push_listener;

/// Sentinel finger count meaning "no hand detected"
pub const NO_HAND_DETECTED: i32 = -1;

/// An event pushed by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// Model retraining finished
    RetrainComplete { message: String },
    /// A recording finished with its detection outcome
    RecordComplete(RecordOutcome),
}

/// Payload of `record_complete`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordOutcome {
    /// Averaged finger count, or [`NO_HAND_DETECTED`]
    pub finger_count: i32,

    /// Session the result belongs to, when the backend echoes it
    #[serde(default)]
    pub session_id: Option<String>,
}

#[cfg(test)]
impl RecordOutcome {
    pub fn new(finger_count: i32) -> Self {
        Self {
            finger_count,
            session_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RetrainPayload {
    message: String,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame has no event name")]
    MissingName,

    #[error("bad payload for {event}: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode one frame. Returns `Ok(None)` for well-formed frames carrying an
/// event the console does not consume.
pub fn parse_frame(frame: &str) -> Result<Option<PushEvent>, FrameError> {
    let value: Value = serde_json::from_str(frame)?;

    let (name, payload) = match value {
        Value::Object(mut map) => {
            let name = match map.remove("event") {
                Some(Value::String(name)) => name,
                _ => return Err(FrameError::MissingName),
            };
            (name, map.remove("data").unwrap_or(Value::Null))
        }
        Value::Array(mut items) if !items.is_empty() => {
            let payload = if items.len() > 1 {
                items.swap_remove(1)
            } else {
                Value::Null
            };
            match items.swap_remove(0) {
                Value::String(name) => (name, payload),
                _ => return Err(FrameError::MissingName),
            }
        }
        _ => return Err(FrameError::MissingName),
    };

    let payload_error = |source| FrameError::Payload {
        event: name.clone(),
        source,
    };

    match name.as_str() {
        "retrain_complete" => {
            let payload: RetrainPayload =
                serde_json::from_value(payload).map_err(payload_error)?;
            Ok(Some(PushEvent::RetrainComplete {
                message: payload.message,
            }))
        }
        "record_complete" => {
            let outcome: RecordOutcome = serde_json::from_value(payload).map_err(payload_error)?;
            Ok(Some(PushEvent::RecordComplete(outcome)))
        }
        _ => Ok(None),
    }
}
