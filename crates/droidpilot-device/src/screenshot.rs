//! Rate-limited screenshot acquisition.
//!
//! Screenshots dominate device traffic, so attempts are spaced by a
//! minimum interval: a call arriving early sleeps out the remainder
//! instead of failing. Capture prefers the bridge and falls back to
//! the shell; both failing yields a single capture error rather than
//! the underlying pair.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use droidpilot_core::error::{Backend, DeviceError, Result};
use droidpilot_core::frame::Frame;

use crate::config::DeviceConfig;
use crate::connection::Connection;

struct CaptureState {
    last_attempt: Option<Instant>,
    last_frame: Option<Arc<Frame>>,
}

/// Screenshot front-end over a [`Connection`].
pub struct Screenshots {
    conn: Arc<Connection>,
    min_interval: Duration,
    state: Mutex<CaptureState>,
}

impl Screenshots {
    pub fn new(conn: Arc<Connection>, config: &DeviceConfig) -> Self {
        Self {
            conn,
            min_interval: config.screenshot_interval,
            state: Mutex::new(CaptureState {
                last_attempt: None,
                last_frame: None,
            }),
        }
    }

    /// Capture a fresh frame, waiting out the rate limit first.
    ///
    /// Concurrent callers are serialized, so the spacing holds across
    /// tasks. A takeover escalation from the shell path is returned
    /// as-is; any other double failure collapses to
    /// [`DeviceError::CaptureFailed`].
    pub async fn capture(&self) -> Result<Arc<Frame>> {
        let mut state = self.state.lock().await;
        if let Some(last) = state.last_attempt {
            let since = last.elapsed();
            if since < self.min_interval {
                sleep(self.min_interval - since).await;
            }
        }
        state.last_attempt = Some(Instant::now());

        let frame = match self.conn.capture_via(Backend::Bridge).await {
            Ok(frame) => frame,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("bridge capture failed ({e}), falling back to shell");
                match self.conn.capture_via(Backend::Shell).await {
                    Ok(frame) => frame,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("shell capture failed too ({e})");
                        return Err(DeviceError::CaptureFailed);
                    }
                }
            }
        };
        debug!(width = frame.width(), height = frame.height(), "frame captured");
        let frame = Arc::new(frame);
        state.last_frame = Some(Arc::clone(&frame));
        Ok(frame)
    }

    /// The most recent frame, if any capture has succeeded.
    pub async fn last_frame(&self) -> Option<Arc<Frame>> {
        self.state.lock().await.last_frame.clone()
    }
}
