//! Local capture device check
//!
//! The console does not read frames itself; it only confirms at startup that
//! the configured camera can be opened, and reports the result to the feed.

use std::path::Path;
use tokio::fs::File;
use tracing::{debug, warn};

use crate::sync::DeviceStatus;

/// Open the capture device once to see whether it is usable
pub async fn check_camera(device: &Path) -> DeviceStatus {
    match File::open(device).await {
        Ok(_) => {
            debug!("Capture device {} opened", device.display());
            DeviceStatus::Connected
        }
        Err(e) => {
            warn!("Cannot open capture device {}: {}", device.display(), e);
            DeviceStatus::Failed(format!("{}: {}", device.display(), e))
        }
    }
}
