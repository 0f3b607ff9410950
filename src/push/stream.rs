//! Newline-delimited JSON event stream listener

use futures::TryStreamExt;
use reqwest::Client;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

use super::{parse_frame, PushEvent};

/// Connect to the event stream and forward decoded events until the stream
/// ends. Dropped connections are not re-established; events emitted while
/// disconnected are lost.
pub fn spawn_push_listener(
    client: Client,
    url: String,
    tx: mpsc::UnboundedSender<PushEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Subscribing to push events at {}", url);

        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Push channel unavailable: {}", e);
                return;
            }
        };

        if !response.status().is_success() {
            warn!("Push channel returned HTTP {}", response.status());
            return;
        }

        let body = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let forwarded = forward_frames(StreamReader::new(Box::pin(body)), &tx).await;

        warn!("Push channel closed after {} events", forwarded);
    })
}

/// Read frames line by line and forward the consumed events.
/// Returns the number of events forwarded.
pub async fn forward_frames<R>(reader: R, tx: &mpsc::UnboundedSender<PushEvent>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = LinesStream::new(reader.lines());
    let mut forwarded = 0;

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Push channel read error: {}", e);
                break;
            }
        };

        let frame = line.trim();
        // Blank lines and SSE-style comments keep the connection alive
        if frame.is_empty() || frame.starts_with(':') {
            continue;
        }
        let frame = frame.strip_prefix("data:").map(str::trim).unwrap_or(frame);

        match parse_frame(frame) {
            Ok(Some(event)) => {
                debug!("Push event: {:?}", event);
                if tx.send(event).is_err() {
                    debug!("Push receiver dropped, stopping listener");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => warn!("Ignoring unknown push event: {}", frame),
            Err(e) => warn!("Skipping malformed push frame: {}", e),
        }
    }

    forwarded
}
