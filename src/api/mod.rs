//! Backend API surface consumed by the console
//!
//! The [`Backend`] trait mirrors the engine's HTTP contract one method per
//! endpoint. [`HttpBackend`] talks to a real server; tests use an in-memory
//! fake.

mod http;
mod types;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpBackend;
pub use types::*;

/// Errors from a single backend request
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("could not decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Simulated outage in tests
    #[cfg(test)]
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// One-shot request/response operations against the engine backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /api/engine/start`
    async fn start_engine(&self) -> ApiResult<()>;

    /// `POST /api/engine/stop`
    async fn stop_engine(&self) -> ApiResult<()>;

    /// `POST /api/retrain`
    async fn retrain(&self) -> ApiResult<()>;

    /// `GET /api/engine/status`
    async fn engine_status(&self) -> ApiResult<EngineStatus>;

    /// `GET /api/gestures`
    async fn list_gestures(&self) -> ApiResult<Vec<Gesture>>;

    /// `POST /api/gestures`, returning the created gesture when the backend echoes it
    async fn add_gesture(&self, gesture: &NewGesture) -> ApiResult<Option<Gesture>>;

    /// `DELETE /api/gestures/{id}`
    async fn delete_gesture(&self, id: i64) -> ApiResult<()>;

    /// `POST /api/gestures/record`
    async fn begin_recording(&self) -> ApiResult<()>;
}
