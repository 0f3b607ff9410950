//! Status poll reconciliation
//!
//! The poll loop itself lives in the coordinator; this module decides what a
//! status snapshot changes on screen.

use crate::api::EngineStatus;

/// Visible effects of one applied poll response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollUpdate {
    /// Gesture to display (every non-empty value, even if unchanged)
    pub gesture: Option<String>,
    /// Action that differs from the previous one and must be announced
    pub new_action: Option<String>,
}

#[derive(Debug, Default)]
pub struct StatusPoller {
    /// Last action already surfaced to the user
    previous_action: Option<String>,
    last_gesture: Option<String>,
    issued: u64,
    applied: u64,
}

impl StatusPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number for the next status request
    pub fn next_sequence(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    pub fn last_gesture(&self) -> Option<&str> {
        self.last_gesture.as_deref()
    }

    pub fn last_action(&self) -> Option<&str> {
        self.previous_action.as_deref()
    }

    /// Apply the response to request `sequence`.
    ///
    /// Returns `None` when a newer response has already been applied.
    pub fn apply(&mut self, sequence: u64, status: &EngineStatus) -> Option<PollUpdate> {
        if sequence <= self.applied {
            return None;
        }
        self.applied = sequence;

        let gesture = status
            .last_gesture
            .as_deref()
            .filter(|g| !g.is_empty())
            .map(str::to_string);
        if let Some(ref gesture) = gesture {
            self.last_gesture = Some(gesture.clone());
        }

        let new_action = match status.last_action.as_deref() {
            Some(action) if !action.is_empty() && self.previous_action.as_deref() != Some(action) => {
                self.previous_action = Some(action.to_string());
                Some(action.to_string())
            }
            _ => None,
        };

        Some(PollUpdate {
            gesture,
            new_action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str) -> EngineStatus {
        EngineStatus {
            last_action: Some(name.to_string()),
            ..EngineStatus::default()
        }
    }

    fn poll(poller: &mut StatusPoller, status: EngineStatus) -> PollUpdate {
        let seq = poller.next_sequence();
        poller.apply(seq, &status).expect("fresh response")
    }

    #[test]
    fn test_repeated_action_announced_once() {
        let mut poller = StatusPoller::new();

        let announced: Vec<String> = ["open_app", "open_app", "close_app"]
            .into_iter()
            .filter_map(|name| poll(&mut poller, action(name)).new_action)
            .collect();

        assert_eq!(announced, vec!["open_app", "close_app"]);
        assert_eq!(poller.last_action(), Some("close_app"));
    }

    #[test]
    fn test_reverted_action_is_new_again() {
        let mut poller = StatusPoller::new();
        let announced: Vec<String> = ["next_tab", "next_tab", "prev_tab", "next_tab"]
            .into_iter()
            .filter_map(|name| poll(&mut poller, action(name)).new_action)
            .collect();

        assert_eq!(announced, vec!["next_tab", "prev_tab", "next_tab"]);
    }

    #[test]
    fn test_gesture_shown_every_time() {
        let mut poller = StatusPoller::new();
        let status = EngineStatus {
            last_gesture: Some("2 fingers".to_string()),
            ..EngineStatus::default()
        };

        assert_eq!(poll(&mut poller, status.clone()).gesture.as_deref(), Some("2 fingers"));
        assert_eq!(poll(&mut poller, status).gesture.as_deref(), Some("2 fingers"));
        assert_eq!(poll(&mut poller, EngineStatus::default()).gesture, None);
        assert_eq!(poller.last_gesture(), Some("2 fingers"));
    }

    #[test]
    fn test_empty_fields_change_nothing() {
        let mut poller = StatusPoller::new();
        poll(&mut poller, action("volume_up"));

        let update = poll(
            &mut poller,
            EngineStatus {
                last_gesture: Some(String::new()),
                last_action: Some(String::new()),
                ..EngineStatus::default()
            },
        );

        assert_eq!(update, PollUpdate::default());
        assert_eq!(poller.last_action(), Some("volume_up"));
    }

    #[test]
    fn test_out_of_order_response_is_discarded() {
        let mut poller = StatusPoller::new();
        let first = poller.next_sequence();
        let second = poller.next_sequence();

        assert!(poller.apply(second, &action("close_app")).is_some());
        assert_eq!(poller.apply(first, &action("open_app")), None);
        assert_eq!(poller.last_action(), Some("close_app"));
    }
}
