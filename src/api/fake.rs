//! In-memory backend for tests

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::{ApiError, ApiResult, Backend, EngineStatus, Gesture, NewGesture};

#[derive(Default)]
struct FakeState {
    gestures: Vec<Gesture>,
    next_id: i64,
    statuses: VecDeque<ApiResult<EngineStatus>>,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
    latency: Option<Duration>,
}

/// Backend double that keeps a registry in memory and records every call
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().next_id = 1;
        backend
    }

    pub fn with_gestures(gestures: Vec<Gesture>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock().unwrap();
            state.next_id = gestures.iter().map(|g| g.id).max().unwrap_or(0) + 1;
            state.gestures = gestures;
        }
        backend
    }

    /// Queue a status response; when the queue is empty polls return an empty status
    pub fn push_status(&self, status: ApiResult<EngineStatus>) {
        self.state.lock().unwrap().statuses.push_back(status);
    }

    /// Make every call to `op` fail (op names match [`FakeBackend::calls`])
    pub fn fail(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.state.lock().unwrap().failing.remove(op);
    }

    /// Delay every response by `latency`; the call itself is recorded immediately
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = Some(latency);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == op).count()
    }

    pub fn gestures(&self) -> Vec<Gesture> {
        self.state.lock().unwrap().gestures.clone()
    }

    async fn record(&self, op: &'static str) -> ApiResult<()> {
        let (latency, failing) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(op.to_string());
            (state.latency, state.failing.contains(op))
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if failing {
            return Err(ApiError::Unavailable(format!("{} refused", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn start_engine(&self) -> ApiResult<()> {
        self.record("start").await
    }

    async fn stop_engine(&self) -> ApiResult<()> {
        self.record("stop").await
    }

    async fn retrain(&self) -> ApiResult<()> {
        self.record("retrain").await
    }

    async fn engine_status(&self) -> ApiResult<EngineStatus> {
        self.record("status").await?;
        self.state
            .lock()
            .unwrap()
            .statuses
            .pop_front()
            .unwrap_or_else(|| Ok(EngineStatus::default()))
    }

    async fn list_gestures(&self) -> ApiResult<Vec<Gesture>> {
        self.record("list").await?;
        Ok(self.gestures())
    }

    async fn add_gesture(&self, gesture: &NewGesture) -> ApiResult<Option<Gesture>> {
        self.record("add").await?;
        let mut state = self.state.lock().unwrap();
        let created = Gesture {
            id: state.next_id,
            name: gesture.name.clone(),
            action: gesture.action.into(),
            description: Some(gesture.description.clone()).filter(|d| !d.is_empty()),
            fingers: gesture.fingers,
        };
        state.next_id += 1;
        state.gestures.push(created.clone());
        Ok(Some(created))
    }

    async fn delete_gesture(&self, id: i64) -> ApiResult<()> {
        self.record("delete").await?;
        self.state.lock().unwrap().gestures.retain(|g| g.id != id);
        Ok(())
    }

    async fn begin_recording(&self) -> ApiResult<()> {
        self.record("record").await
    }
}
