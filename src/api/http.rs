//! reqwest implementation of the backend contract

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{ApiError, ApiResult, Backend, CreatedGesture, EngineStatus, Gesture, GestureList, NewGesture};
use crate::config::Config;

/// HTTP client for the gesture engine backend
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    /// Applied per request; the event stream on the same client stays open
    timeout: Option<Duration>,
}

impl HttpBackend {
    /// Create a new backend client from configuration
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            base_url: config.backend.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
        })
    }

    /// Underlying client, shared with the push listener
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&NewGesture>,
    ) -> ApiResult<Response> {
        debug!("{} {}", method, path);

        let mut request = self.client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&NewGesture>,
    ) -> ApiResult<T> {
        self.send(method, path, body)
            .await?
            .json()
            .await
            .map_err(|source| ApiError::Decode {
                path: path.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn start_engine(&self) -> ApiResult<()> {
        self.send(Method::POST, "/api/engine/start", None).await?;
        Ok(())
    }

    async fn stop_engine(&self) -> ApiResult<()> {
        self.send(Method::POST, "/api/engine/stop", None).await?;
        Ok(())
    }

    async fn retrain(&self) -> ApiResult<()> {
        self.send(Method::POST, "/api/retrain", None).await?;
        Ok(())
    }

    async fn engine_status(&self) -> ApiResult<EngineStatus> {
        self.send_json(Method::GET, "/api/engine/status", None).await
    }

    async fn list_gestures(&self) -> ApiResult<Vec<Gesture>> {
        let list: GestureList = self.send_json(Method::GET, "/api/gestures", None).await?;
        Ok(list.gestures)
    }

    async fn add_gesture(&self, gesture: &NewGesture) -> ApiResult<Option<Gesture>> {
        let created: CreatedGesture = self
            .send_json(Method::POST, "/api/gestures", Some(gesture))
            .await?;
        if !created.success {
            debug!("Backend did not confirm creation of {:?}", gesture.name);
        }
        Ok(created.gesture)
    }

    async fn delete_gesture(&self, id: i64) -> ApiResult<()> {
        self.send(Method::DELETE, &format!("/api/gestures/{}", id), None)
            .await?;
        Ok(())
    }

    async fn begin_recording(&self) -> ApiResult<()> {
        self.send(Method::POST, "/api/gestures/record", None).await?;
        Ok(())
    }
}
