//! Display snapshot published by the coordinator

use serde::Serialize;
use std::fmt::Write;

use crate::api::Gesture;
use crate::sync::{Detection, EngineRunState, RecordingPhase, RecordingSession, COUNTDOWN_DONE};

/// Color class of the recording result line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordResult {
    pub text: String,
    pub tone: Tone,
}

impl RecordResult {
    pub fn for_detection(detection: Detection) -> Self {
        match detection {
            Detection::NoHand => Self {
                text: "❌ No hand detected. Try again.".to_string(),
                tone: Tone::Error,
            },
            Detection::Fingers(n) => Self {
                text: format!("✅ Detected {} fingers. Click + Add to save.", n),
                tone: Tone::Success,
            },
        }
    }
}

/// Recording panel state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordingView {
    pub phase: Option<RecordingPhase>,
    /// Remaining seconds, or the completion glyph
    pub countdown: String,
    pub result: Option<RecordResult>,
}

impl RecordingView {
    pub fn from_session(session: Option<&RecordingSession>) -> Self {
        let Some(session) = session else {
            return Self::default();
        };

        let countdown = match session.phase {
            RecordingPhase::CountingDown => session.seconds_remaining.to_string(),
            _ if session.seconds_remaining == 0 => COUNTDOWN_DONE.to_string(),
            _ => session.seconds_remaining.to_string(),
        };

        let result = match session.phase {
            RecordingPhase::Resolved => session
                .last_detected_finger_count
                .map(|count| RecordResult::for_detection(Detection::from_count(count))),
            _ => None,
        };

        Self {
            phase: Some(session.phase),
            countdown,
            result,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.phase.is_some()
    }
}

/// Everything the user can see, rebuilt after each coordinator step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub run_state: EngineRunState,
    pub control_error: Option<String>,
    pub last_gesture: Option<String>,
    pub last_action: Option<String>,
    pub gestures: Vec<Gesture>,
    pub total_gestures: usize,
    /// Id of the most recently added gesture, as returned by the backend
    pub last_added_id: Option<i64>,
    pub recording: RecordingView,
}

impl DisplayState {
    /// Multi-line text rendering for the console
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({})", self.run_state.label(), self.run_state);
        if let Some(ref error) = self.control_error {
            let _ = writeln!(out, "  ! {}", error);
        }
        let _ = writeln!(
            out,
            "  Last gesture: {}",
            self.last_gesture.as_deref().unwrap_or("-")
        );
        let _ = writeln!(
            out,
            "  Last action:  {}",
            self.last_action.as_deref().unwrap_or("-")
        );
        let _ = writeln!(out, "  Gestures:     {}", self.total_gestures);
        if let Some(id) = self.last_added_id {
            let _ = writeln!(out, "  Last added:   #{}", id);
        }

        if self.recording.is_visible() {
            let _ = writeln!(out, "  Recording:    {}", self.recording.countdown);
            if let Some(ref result) = self.recording.result {
                let _ = writeln!(out, "  {}", result.text);
            }
        }
        out
    }

    pub fn render_gestures(&self) -> String {
        if self.gestures.is_empty() {
            return "  (no gestures)\n".to_string();
        }

        let mut out = String::new();
        for gesture in &self.gestures {
            let _ = writeln!(
                out,
                "  #{:<4} {:<16} [{}] {}{}",
                gesture.id,
                gesture.name,
                gesture.action,
                gesture.description.as_deref().unwrap_or("No description"),
                gesture
                    .fingers
                    .map(|n| format!(" ({} fingers)", n))
                    .unwrap_or_default()
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GestureAction, ListedAction};
    use uuid::Uuid;

    fn session(phase: RecordingPhase, seconds_remaining: u32, count: Option<i32>) -> RecordingSession {
        RecordingSession {
            id: Uuid::new_v4(),
            phase,
            seconds_remaining,
            last_detected_finger_count: count,
        }
    }

    #[test]
    fn test_result_texts() {
        assert_eq!(
            RecordResult::for_detection(Detection::Fingers(4)),
            RecordResult {
                text: "✅ Detected 4 fingers. Click + Add to save.".to_string(),
                tone: Tone::Success,
            }
        );
        assert_eq!(
            RecordResult::for_detection(Detection::NoHand).tone,
            Tone::Error
        );
    }

    #[test]
    fn test_recording_view_phases() {
        assert!(!RecordingView::from_session(None).is_visible());

        let counting = RecordingView::from_session(Some(&session(RecordingPhase::CountingDown, 2, None)));
        assert_eq!(counting.countdown, "2");
        assert_eq!(counting.result, None);

        let waiting = RecordingView::from_session(Some(&session(RecordingPhase::AwaitingResult, 0, None)));
        assert_eq!(waiting.countdown, COUNTDOWN_DONE);
        assert_eq!(waiting.result, None);

        // Result arrived before the countdown finished
        let early = RecordingView::from_session(Some(&session(RecordingPhase::Resolved, 1, Some(-1))));
        assert_eq!(early.countdown, "1");
        assert_eq!(early.result.unwrap().text, "❌ No hand detected. Try again.");
    }

    #[test]
    fn test_render_lists_gestures() {
        let state = DisplayState {
            gestures: vec![Gesture {
                id: 7,
                name: "Wave".to_string(),
                action: GestureAction::OpenApp.into(),
                description: None,
                fingers: Some(5),
            }],
            total_gestures: 1,
            last_added_id: Some(7),
            ..DisplayState::default()
        };

        let listing = state.render_gestures();
        assert!(listing.contains("#7"));
        assert!(listing.contains("[open_app]"));
        assert!(listing.contains("No description"));
        assert!(listing.contains("(5 fingers)"));
        let status = state.render();
        assert!(status.starts_with("System Stopped (Stopped)"));
        assert!(status.contains("Last added:   #7"));
    }

    #[test]
    fn test_render_keeps_unrecognized_action() {
        let state = DisplayState {
            gestures: vec![Gesture {
                id: 3,
                name: "Snap".to_string(),
                action: ListedAction::Unrecognized("screenshot".to_string()),
                description: None,
                fingers: None,
            }],
            total_gestures: 1,
            ..DisplayState::default()
        };

        assert!(state.render_gestures().contains("[screenshot]"));
    }
}
