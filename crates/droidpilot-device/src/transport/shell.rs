//! Shell transport: gestures and capture via `adb shell`.
//!
//! Slower than the bridge but needs nothing installed on the device,
//! which is what makes it a usable fallback.

use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use droidpilot_core::error::{Backend, DeviceError, Result};
use droidpilot_core::frame::Frame;
use droidpilot_core::geometry::Point;

use crate::adb::AdbClient;
use crate::transport::Transport;

/// Where screencap writes on the device before we pull it.
const REMOTE_CAPTURE_PATH: &str = "/data/local/tmp/droidpilot-screencap.png";

/// Transport backed by `adb shell input` and `screencap`.
pub struct ShellTransport {
    adb: AdbClient,
}

impl ShellTransport {
    pub fn new(adb: AdbClient) -> Self {
        Self { adb }
    }
}

#[async_trait]
impl Transport for ShellTransport {
    fn backend(&self) -> Backend {
        Backend::Shell
    }

    async fn tap(&mut self, point: Point) -> Result<()> {
        let (x, y) = (point.x.to_string(), point.y.to_string());
        self.adb.shell("tap", &["input", "tap", &x, &y]).await?;
        Ok(())
    }

    async fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<()> {
        let args = [
            from.x.to_string(),
            from.y.to_string(),
            to.x.to_string(),
            to.y.to_string(),
            duration.as_millis().to_string(),
        ];
        self.adb
            .shell(
                "swipe",
                &[
                    "input", "swipe", &args[0], &args[1], &args[2], &args[3], &args[4],
                ],
            )
            .await?;
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<Frame> {
        self.adb
            .shell("screencap", &["screencap", "-p", REMOTE_CAPTURE_PATH])
            .await?;

        let local = NamedTempFile::new()
            .map_err(|e| DeviceError::transport(Backend::Shell, "screencap", e.to_string()))?;
        let pulled = self.adb.pull(REMOTE_CAPTURE_PATH, local.path()).await;
        // Best effort: never leave captures piling up on the device.
        if let Err(e) = self.adb.shell("rm", &["rm", "-f", REMOTE_CAPTURE_PATH]).await {
            debug!("failed to remove remote capture: {e}");
        }
        pulled?;

        let bytes = tokio::fs::read(local.path())
            .await
            .map_err(|e| DeviceError::transport(Backend::Shell, "screencap", e.to_string()))?;
        Frame::from_png_bytes(&bytes)
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.adb.connect_serial().await
    }
}
