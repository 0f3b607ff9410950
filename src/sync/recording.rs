//! Recording workflow
//!
//! A recording runs a local countdown that is only a visual cue; the outcome
//! arrives later as a `record_complete` push event. Each `record()` opens a
//! new session with its own id. Countdown ticks and results that do not belong
//! to the active session are dropped, so the most recent session always wins.
//!
//! Results without a session id are matched to sessions in the order the
//! sessions began. A session keeps its place in that queue only until its
//! countdown plus [`RESULT_GRACE`] has passed, so a lost result delays at
//! most one later recording.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::push::{RecordOutcome, NO_HAND_DETECTED};

/// Glyph shown once the local countdown reaches zero
pub const COUNTDOWN_DONE: &str = "✓";

/// How long after its countdown a superseded session may still claim a result
pub const RESULT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingPhase {
    CountingDown,
    AwaitingResult,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    pub id: Uuid,
    pub phase: RecordingPhase,
    pub seconds_remaining: u32,
    /// Finger count from the result; -1 when no hand was seen
    pub last_detected_finger_count: Option<i32>,
}

/// Detection outcome after a session resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    NoHand,
    Fingers(u32),
}

impl Detection {
    pub fn from_count(finger_count: i32) -> Self {
        if finger_count == NO_HAND_DETECTED {
            return Detection::NoHand;
        }
        // Other negative counts are not a usable hand either
        match u32::try_from(finger_count) {
            Ok(n) => Detection::Fingers(n),
            Err(_) => Detection::NoHand,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick belongs to another session or the countdown already finished
    Ignored,
    Counting(u32),
    /// Countdown reached zero; the workflow now waits for the backend
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved(Detection),
    /// Result for a superseded or abandoned session
    Stale,
}

/// A session still owed a `record_complete`
#[derive(Debug, Clone, Copy)]
struct PendingResult {
    id: Uuid,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct RecordingWorkflow {
    countdown_from: u32,
    /// Countdown length plus grace; after this a superseded session drops out of `pending`
    result_timeout: Duration,
    session: Option<RecordingSession>,
    /// Sessions that may still receive a result, oldest first
    pending: VecDeque<PendingResult>,
    /// Most recent successful detection, kept for saving into the registry
    saved_fingers: Option<u8>,
}

impl RecordingWorkflow {
    pub fn new(countdown_from: u32, tick: Duration) -> Self {
        Self {
            countdown_from,
            result_timeout: tick * countdown_from + RESULT_GRACE,
            session: None,
            pending: VecDeque::new(),
            saved_fingers: None,
        }
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    pub fn countdown_from(&self) -> u32 {
        self.countdown_from
    }

    /// Finger count to attach when saving the last recording
    pub fn saved_fingers(&self) -> Option<u8> {
        self.saved_fingers
    }

    /// Start a new session, superseding any open one
    pub fn begin(&mut self, now: Instant) -> Uuid {
        let id = Uuid::new_v4();
        if let Some(previous) = self.session.as_ref() {
            debug!("Recording session {} superseded by {}", previous.id, id);
        }

        let phase = if self.countdown_from == 0 {
            RecordingPhase::AwaitingResult
        } else {
            RecordingPhase::CountingDown
        };

        self.session = Some(RecordingSession {
            id,
            phase,
            seconds_remaining: self.countdown_from,
            last_detected_finger_count: None,
        });
        self.saved_fingers = None;

        self.expire(now);
        self.pending.push_back(PendingResult {
            id,
            expires_at: now + self.result_timeout,
        });
        id
    }

    /// The begin request for `id` failed, so no result will arrive for it.
    /// The session itself stays open.
    pub fn request_failed(&mut self, id: Uuid) -> bool {
        let before = self.pending.len();
        self.pending.retain(|pending| pending.id != id);
        self.pending.len() != before
    }

    pub fn tick(&mut self, id: Uuid) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Ignored;
        };
        if session.id != id || session.phase != RecordingPhase::CountingDown {
            return TickOutcome::Ignored;
        }

        session.seconds_remaining = session.seconds_remaining.saturating_sub(1);
        if session.seconds_remaining == 0 {
            session.phase = RecordingPhase::AwaitingResult;
            TickOutcome::Finished
        } else {
            TickOutcome::Counting(session.seconds_remaining)
        }
    }

    /// Apply a `record_complete` outcome
    pub fn resolve(&mut self, outcome: &RecordOutcome, now: Instant) -> ResolveOutcome {
        self.expire(now);

        let owner = match outcome.session_id.as_deref() {
            Some(raw) => {
                let parsed = Uuid::parse_str(raw).ok();
                if let Some(id) = parsed {
                    self.pending.retain(|pending| pending.id != id);
                }
                parsed
            }
            None => self
                .pending
                .pop_front()
                .map(|pending| pending.id)
                .or_else(|| self.session.as_ref().map(|s| s.id)),
        };

        let Some(session) = self.session.as_mut() else {
            debug!("record_complete with no open recording session");
            return ResolveOutcome::Stale;
        };

        let open = matches!(
            session.phase,
            RecordingPhase::CountingDown | RecordingPhase::AwaitingResult
        );
        if owner != Some(session.id) || !open {
            debug!(
                "Dropping record_complete for {:?} (active session {})",
                owner, session.id
            );
            return ResolveOutcome::Stale;
        }

        session.phase = RecordingPhase::Resolved;
        session.last_detected_finger_count = Some(outcome.finger_count);
        // Everything still queued began before this session
        self.pending.clear();

        let detection = Detection::from_count(outcome.finger_count);
        self.saved_fingers = match detection {
            Detection::Fingers(n) => u8::try_from(n).ok(),
            Detection::NoHand => None,
        };
        ResolveOutcome::Resolved(detection)
    }

    /// Leave the workflow; anything still in flight for the session is ignored
    pub fn leave(&mut self) -> bool {
        self.session.take().is_some()
    }

    /// Drop superseded sessions whose result is overdue. The active session
    /// keeps its place however late its result is.
    fn expire(&mut self, now: Instant) {
        let active = self.session.as_ref().map(|s| s.id);
        self.pending.retain(|pending| {
            let keep = Some(pending.id) == active || pending.expires_at > now;
            if !keep {
                debug!("Recording session {} never received a result", pending.id);
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_secs(1);

    fn phase(workflow: &RecordingWorkflow) -> Option<RecordingPhase> {
        workflow.session().map(|s| s.phase)
    }

    fn outcome(finger_count: i32) -> RecordOutcome {
        RecordOutcome {
            finger_count,
            session_id: None,
        }
    }

    #[test]
    fn test_countdown_then_await_result() {
        let now = Instant::now();
        let mut workflow = RecordingWorkflow::new(3, TICK);
        let id = workflow.begin(now);
        assert_eq!(phase(&workflow), Some(RecordingPhase::CountingDown));

        assert_eq!(workflow.tick(id), TickOutcome::Counting(2));
        assert_eq!(workflow.tick(id), TickOutcome::Counting(1));
        assert_eq!(workflow.tick(id), TickOutcome::Finished);
        assert_eq!(phase(&workflow), Some(RecordingPhase::AwaitingResult));
        assert_eq!(workflow.tick(id), TickOutcome::Ignored);

        let session = workflow.session().unwrap();
        assert_eq!(session.seconds_remaining, 0);
        assert_eq!(session.last_detected_finger_count, None);

        assert_eq!(
            workflow.resolve(&outcome(4), now + 3 * TICK),
            ResolveOutcome::Resolved(Detection::Fingers(4))
        );
        assert_eq!(phase(&workflow), Some(RecordingPhase::Resolved));
        assert_eq!(workflow.saved_fingers(), Some(4));
    }

    #[test]
    fn test_sentinel_means_no_hand() {
        let now = Instant::now();
        let mut workflow = RecordingWorkflow::new(3, TICK);
        workflow.begin(now);

        assert_eq!(
            workflow.resolve(&outcome(NO_HAND_DETECTED), now),
            ResolveOutcome::Resolved(Detection::NoHand)
        );
        assert_eq!(
            workflow.session().unwrap().last_detected_finger_count,
            Some(NO_HAND_DETECTED)
        );
        assert_eq!(workflow.saved_fingers(), None);
    }

    #[test]
    fn test_early_result_stops_countdown() {
        let now = Instant::now();
        let mut workflow = RecordingWorkflow::new(3, TICK);
        let id = workflow.begin(now);
        workflow.tick(id);

        assert!(matches!(
            workflow.resolve(&outcome(0), now + TICK),
            ResolveOutcome::Resolved(Detection::Fingers(0))
        ));
        assert_eq!(workflow.tick(id), TickOutcome::Ignored);
        assert_eq!(phase(&workflow), Some(RecordingPhase::Resolved));
    }

    #[test]
    fn test_late_result_from_superseded_session_is_dropped() {
        let now = Instant::now();
        let mut workflow = RecordingWorkflow::new(3, TICK);
        let first = workflow.begin(now);
        let second = workflow.begin(now + TICK);

        // Old ticker keeps running but cannot touch the new session
        assert_eq!(workflow.tick(first), TickOutcome::Ignored);
        assert_eq!(workflow.tick(second), TickOutcome::Counting(2));

        assert_eq!(
            workflow.resolve(&outcome(2), now + 3 * TICK),
            ResolveOutcome::Stale
        );
        assert_eq!(phase(&workflow), Some(RecordingPhase::CountingDown));

        assert_eq!(
            workflow.resolve(&outcome(5), now + 4 * TICK),
            ResolveOutcome::Resolved(Detection::Fingers(5))
        );
    }

    #[test]
    fn test_lost_result_costs_one_recording_at_most() {
        let now = Instant::now();
        let mut workflow = RecordingWorkflow::new(3, TICK);
        workflow.begin(now);
        // The first result never arrives

        let later = now + Duration::from_secs(10);
        workflow.begin(later);
        assert_eq!(
            workflow.resolve(&outcome(4), later + 3 * TICK),
            ResolveOutcome::Resolved(Detection::Fingers(4))
        );

        let last = later + Duration::from_secs(10);
        workflow.begin(last);
        assert_eq!(
            workflow.resolve(&outcome(2), last + TICK),
            ResolveOutcome::Resolved(Detection::Fingers(2))
        );
        assert!(workflow.pending.is_empty());
    }

    #[test]
    fn test_result_before_request_completes_keeps_queue_aligned() {
        let now = Instant::now();
        let mut workflow = RecordingWorkflow::new(3, TICK);
        workflow.begin(now);
        assert_eq!(
            workflow.resolve(&outcome(1), now),
            ResolveOutcome::Resolved(Detection::Fingers(1))
        );

        workflow.begin(now + TICK);
        assert_eq!(
            workflow.resolve(&outcome(5), now + 2 * TICK),
            ResolveOutcome::Resolved(Detection::Fingers(5))
        );
    }

    #[test]
    fn test_queue_stays_bounded_without_results() {
        let now = Instant::now();
        let mut workflow = RecordingWorkflow::new(3, TICK);
        for i in 0..50u32 {
            workflow.begin(now + Duration::from_secs(10) * i);
        }
        assert_eq!(workflow.pending.len(), 1);
    }

    #[test]
    fn test_failed_request_leaves_no_queue_entry() {
        let now = Instant::now();
        let mut workflow = RecordingWorkflow::new(3, TICK);
        let first = workflow.begin(now);
        workflow.begin(now + TICK);

        assert!(workflow.request_failed(first));
        assert!(!workflow.request_failed(first));
        assert_eq!(
            workflow.resolve(&outcome(3), now + 2 * TICK),
            ResolveOutcome::Resolved(Detection::Fingers(3))
        );
        assert_eq!(phase(&workflow), Some(RecordingPhase::Resolved));
    }

    #[test]
    fn test_explicit_session_id_is_matched_directly() {
        let now = Instant::now();
        let mut workflow = RecordingWorkflow::new(3, TICK);
        let first = workflow.begin(now);
        let second = workflow.begin(now);

        let for_second = RecordOutcome {
            finger_count: 1,
            session_id: Some(second.to_string()),
        };
        assert_eq!(
            workflow.resolve(&for_second, now),
            ResolveOutcome::Resolved(Detection::Fingers(1))
        );

        let for_first = RecordOutcome {
            finger_count: 3,
            session_id: Some(first.to_string()),
        };
        assert_eq!(workflow.resolve(&for_first, now), ResolveOutcome::Stale);
        assert_eq!(
            workflow.session().unwrap().last_detected_finger_count,
            Some(1)
        );
    }

    #[test]
    fn test_leave_discards_pending_result() {
        let now = Instant::now();
        let mut workflow = RecordingWorkflow::new(3, TICK);
        let id = workflow.begin(now);

        assert!(workflow.leave());
        assert_eq!(phase(&workflow), None);
        assert_eq!(workflow.tick(id), TickOutcome::Ignored);
        assert_eq!(workflow.resolve(&outcome(3), now), ResolveOutcome::Stale);

        // The abandoned result no longer shadows the next session
        workflow.begin(now + TICK);
        assert_eq!(
            workflow.resolve(&outcome(3), now + 2 * TICK),
            ResolveOutcome::Resolved(Detection::Fingers(3))
        );
    }

    #[test]
    fn test_zero_countdown_waits_immediately() {
        let mut workflow = RecordingWorkflow::new(0, TICK);
        let id = workflow.begin(Instant::now());
        assert_eq!(phase(&workflow), Some(RecordingPhase::AwaitingResult));
        assert_eq!(workflow.tick(id), TickOutcome::Ignored);
    }
}
