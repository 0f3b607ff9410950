//! Coordinator
//!
//! Owns every piece of mutable console state and applies all changes from a
//! single `select!` loop: user commands, push events, status poll ticks and
//! the completions of spawned backend requests. Requests never block the
//! loop; their results come back as [`Completion`] messages and are applied
//! in arrival order.
//!
//! Push events and poll responses carry no shared ordering token, so the two
//! sources are merged best-effort. Within each source, stale data is
//! discarded: poll and list responses by local sequence number, recording
//! results and countdown ticks by session id.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiResult, Backend, EngineStatus, Gesture};
use crate::config::Config;
use crate::push::PushEvent;
use crate::ui::{ActivityFeed, DisplayState, LogEntry, LogKind, RecordingView};

use super::{
    validate_new_gesture, Command, ControlAction, DeviceStatus, GestureRegistry,
    RecordingWorkflow, ResolveOutcome, RunStateMachine, StatusPoller, TickOutcome, Transition,
    ValidationError,
};

/// Results of spawned work, routed back into the loop
#[derive(Debug)]
enum Completion {
    Control {
        transition: Transition,
        result: Result<(), String>,
    },
    Status {
        sequence: u64,
        result: ApiResult<EngineStatus>,
    },
    Listed {
        sequence: u64,
        result: ApiResult<Vec<Gesture>>,
    },
    Added {
        name: String,
        result: ApiResult<Option<Gesture>>,
    },
    Deleted {
        id: i64,
        result: ApiResult<()>,
    },
    RecordRequested {
        session: Uuid,
        result: ApiResult<()>,
    },
    CountdownTick {
        session: Uuid,
    },
}

/// The console state coordinator
pub struct Coordinator {
    backend: Arc<dyn Backend>,
    /// Command receiver
    cmd_rx: mpsc::Receiver<Command>,
    /// Push events (None when the push channel is disabled)
    push_rx: Option<mpsc::UnboundedReceiver<PushEvent>>,
    /// Completions of spawned requests and countdown tickers
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
    /// Latest display snapshot
    view_tx: watch::Sender<DisplayState>,
    feed: ActivityFeed,
    run_state: RunStateMachine,
    poller: StatusPoller,
    recording: RecordingWorkflow,
    registry: GestureRegistry,
    /// Id the backend assigned to the most recent add
    last_added_id: Option<i64>,
    poll_interval: Duration,
    countdown_tick: Duration,
}

impl Coordinator {
    /// Create a new coordinator
    pub fn new(
        config: &Config,
        backend: Arc<dyn Backend>,
        cmd_rx: mpsc::Receiver<Command>,
        push_rx: Option<mpsc::UnboundedReceiver<PushEvent>>,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (view_tx, _view_rx) = watch::channel(DisplayState::default());

        Self {
            backend,
            cmd_rx,
            push_rx,
            done_tx,
            done_rx,
            view_tx,
            feed: ActivityFeed::new(),
            run_state: RunStateMachine::new(),
            poller: StatusPoller::new(),
            recording: RecordingWorkflow::new(
                config.recording.countdown_secs,
                config.countdown_tick(),
            ),
            registry: GestureRegistry::new(),
            last_added_id: None,
            poll_interval: config.poll_interval(),
            countdown_tick: config.countdown_tick(),
        }
    }

    pub fn subscribe_view(&self) -> watch::Receiver<DisplayState> {
        self.view_tx.subscribe()
    }

    pub fn subscribe_feed(&self) -> broadcast::Receiver<LogEntry> {
        self.feed.subscribe()
    }

    /// Run the coordinator main loop until shutdown
    pub async fn run(mut self) {
        info!(
            "Coordinator starting (status poll every {:?})",
            self.poll_interval
        );

        let mut push_rx = self.push_rx.take();

        self.load_gestures();
        self.publish();

        // First poll after one full interval, like the rest
        let mut poll_timer =
            tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) | None => {
                            info!("Shutdown command received");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd),
                    }
                }

                event = async {
                    match push_rx.as_mut() {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match event {
                        Some(event) => self.handle_push(event),
                        None => {
                            warn!("Push channel closed; retrain and recording results will no longer arrive");
                            push_rx = None;
                        }
                    }
                }

                Some(done) = self.done_rx.recv() => {
                    self.handle_completion(done);
                }

                _ = poll_timer.tick() => {
                    self.poll_status();
                }
            }

            self.publish();
        }

        info!("Coordinator stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::StartEngine => self.control(ControlAction::Start),
            Command::StopEngine => self.control(ControlAction::Stop),
            Command::Retrain => self.control(ControlAction::Retrain),
            Command::LoadGestures => self.load_gestures(),
            Command::AddGesture {
                name,
                action,
                description,
            } => self.add_gesture(&name, &action, &description, None),
            Command::SaveRecorded {
                name,
                action,
                description,
            } => match self.recording.saved_fingers() {
                Some(fingers) => self.add_gesture(&name, &action, &description, Some(fingers)),
                None => self.reject(ValidationError::NothingRecorded),
            },
            Command::DeleteGesture(id) => self.delete_gesture(id),
            Command::Record => self.record(),
            Command::LeaveRecording => {
                if self.recording.leave() {
                    debug!("Left recording workflow");
                }
            }
            Command::Device(DeviceStatus::Connected) => {
                self.feed.push(LogKind::Info, "Camera connected.");
            }
            Command::Device(DeviceStatus::Failed(message)) => {
                self.feed
                    .push(LogKind::Error, format!("Camera error: {}", message));
            }
            // Handled by the run loop
            Command::Shutdown => {}
        }
    }

    fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::RetrainComplete { message } => {
                self.run_state.retrain_complete();
                self.feed.push(LogKind::Action, message);
            }
            PushEvent::RecordComplete(outcome) => match self.recording.resolve(&outcome, Instant::now()) {
                ResolveOutcome::Resolved(detection) => {
                    info!("Recording resolved: {:?}", detection);
                }
                ResolveOutcome::Stale => {
                    debug!(
                        "Ignored record_complete ({} fingers) for an inactive session",
                        outcome.finger_count
                    );
                }
            },
        }
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Control { transition, result } => {
                if let Some(message) = self.run_state.complete(transition, result) {
                    self.feed.push(LogKind::Error, message);
                }
            }

            Completion::Status { sequence, result } => match result {
                Ok(status) => self.apply_status(sequence, &status),
                // Skipped silently, the next tick proceeds as scheduled
                Err(e) => debug!("Status poll {} failed: {}", sequence, e),
            },

            Completion::Listed { sequence, result } => match result {
                Ok(gestures) => {
                    if !self.registry.replace(sequence, gestures) {
                        debug!("Discarding out-of-order gesture list {}", sequence);
                    }
                }
                Err(e) => warn!("Failed to load gestures: {}", e),
            },

            Completion::Added { name, result } => {
                match result {
                    Ok(created) => {
                        if let Some(gesture) = created {
                            debug!("Backend stored {:?} as #{}", gesture.name, gesture.id);
                            self.last_added_id = Some(gesture.id);
                        }
                        self.feed
                            .push(LogKind::Action, format!("Gesture \"{}\" added.", name));
                    }
                    Err(e) => {
                        warn!("Failed to add gesture {:?}: {}", name, e);
                        self.feed
                            .push(LogKind::Error, format!("Could not add gesture \"{}\".", name));
                    }
                }
                self.load_gestures();
            }

            Completion::Deleted { id, result } => {
                match result {
                    Ok(()) => self.feed.push(LogKind::Error, "Gesture deleted."),
                    Err(e) => {
                        warn!("Failed to delete gesture #{}: {}", id, e);
                        self.feed
                            .push(LogKind::Error, format!("Could not delete gesture #{}.", id));
                    }
                }
                self.load_gestures();
            }

            Completion::RecordRequested { session, result } => match result {
                Ok(()) => debug!("Backend accepted recording {}", session),
                // The countdown keeps running; only a pushed result resolves it
                Err(e) => {
                    warn!("Begin recording request for {} failed: {}", session, e);
                    self.recording.request_failed(session);
                }
            },

            Completion::CountdownTick { session } => {
                if self.recording.tick(session) == TickOutcome::Finished {
                    debug!("Countdown finished for {}, awaiting result", session);
                }
            }
        }
    }

    /// Apply an optimistic transition and issue the matching request
    fn control(&mut self, action: ControlAction) {
        let transition = self.run_state.begin(action);
        let (kind, message) = action.announcement();
        self.feed.push(kind, message);

        self.spawn(move |backend| async move {
            let result = match action {
                ControlAction::Start => backend.start_engine().await,
                ControlAction::Stop => backend.stop_engine().await,
                ControlAction::Retrain => backend.retrain().await,
            };
            Completion::Control {
                transition,
                result: result.map_err(|e| e.to_string()),
            }
        });
    }

    fn poll_status(&mut self) {
        let sequence = self.poller.next_sequence();
        self.spawn(move |backend| async move {
            Completion::Status {
                sequence,
                result: backend.engine_status().await,
            }
        });
    }

    fn apply_status(&mut self, sequence: u64, status: &EngineStatus) {
        let Some(update) = self.poller.apply(sequence, status) else {
            debug!("Discarding out-of-order status response {}", sequence);
            return;
        };

        if let Some(action) = update.new_action {
            self.feed
                .push(LogKind::Action, format!("Action triggered: {}", action));
        }

        if let Some(reported) = status.status.as_deref() {
            let local = self.run_state.state().to_string();
            if !reported.eq_ignore_ascii_case(&local) {
                debug!("Backend reports engine {:?}, console shows {}", reported, local);
            }
        }
    }

    fn load_gestures(&mut self) {
        let sequence = self.registry.next_sequence();
        self.spawn(move |backend| async move {
            Completion::Listed {
                sequence,
                result: backend.list_gestures().await,
            }
        });
    }

    fn add_gesture(&mut self, name: &str, action: &str, description: &str, fingers: Option<u8>) {
        let gesture = match validate_new_gesture(name, action, description, fingers) {
            Ok(gesture) => gesture,
            Err(e) => {
                self.reject(e);
                return;
            }
        };

        self.spawn(move |backend| async move {
            let result = backend.add_gesture(&gesture).await;
            Completion::Added {
                name: gesture.name,
                result,
            }
        });
    }

    fn delete_gesture(&mut self, id: i64) {
        self.spawn(move |backend| async move {
            Completion::Deleted {
                id,
                result: backend.delete_gesture(id).await,
            }
        });
    }

    fn record(&mut self) {
        let session = self.recording.begin(Instant::now());
        info!("Recording session {} started", session);

        self.spawn(move |backend| async move {
            Completion::RecordRequested {
                session,
                result: backend.begin_recording().await,
            }
        });

        // Local countdown, independent of the backend's capture timing
        let ticks = self.recording.countdown_from();
        let period = self.countdown_tick;
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            for _ in 0..ticks {
                ticker.tick().await;
                if done_tx.send(Completion::CountdownTick { session }).is_err() {
                    break;
                }
            }
        });
    }

    fn reject(&mut self, error: ValidationError) {
        self.feed.push(LogKind::Error, error.to_string());
    }

    /// Run `work` on its own task and feed its completion back into the loop
    fn spawn<F, Fut>(&self, work: F)
    where
        F: FnOnce(Arc<dyn Backend>) -> Fut,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        let fut = work(self.backend.clone());
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let _ = done_tx.send(fut.await);
        });
    }

    fn snapshot(&self) -> DisplayState {
        DisplayState {
            run_state: self.run_state.state(),
            control_error: self.run_state.control_error().map(str::to_string),
            last_gesture: self.poller.last_gesture().map(str::to_string),
            last_action: self.poller.last_action().map(str::to_string),
            gestures: self.registry.gestures().to_vec(),
            last_added_id: self.last_added_id,
            total_gestures: self.registry.total(),
            recording: RecordingView::from_session(self.recording.session()),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.view_tx.send_if_modified(|view| {
            if *view == snapshot {
                false
            } else {
                *view = snapshot;
                true
            }
        });
    }
}

/// Create the command and push event channels for the coordinator
pub fn create_console_channels() -> (
    mpsc::Sender<Command>,
    mpsc::Receiver<Command>,
    mpsc::UnboundedSender<PushEvent>,
    mpsc::UnboundedReceiver<PushEvent>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (push_tx, push_rx) = mpsc::unbounded_channel();
    (cmd_tx, cmd_rx, push_tx, push_rx)
}
