//! One handle per device, composing the three sub-components.
//!
//! [`Device`] owns a [`Connection`], a [`Screenshots`] acquirer and a
//! [`Control`] executor. Matching and waiting live here: they need
//! frames and gestures together and nothing below does.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use droidpilot_core::button::Button;
use droidpilot_core::error::Result;
use droidpilot_core::frame::Frame;
use droidpilot_core::geometry::{Point, Region};
use droidpilot_core::timer::Timer;

use crate::config::DeviceConfig;
use crate::connection::Connection;
use crate::control::{ActionTarget, Control};
use crate::matcher::{match_template, TemplateMatcher};
use crate::ocr::{self, Ocr, TextMatchPolicy, TextSpan};
use crate::screenshot::Screenshots;

/// A connected device.
pub struct Device {
    conn: Arc<Connection>,
    screenshots: Screenshots,
    control: Control,
}

impl Device {
    /// Connect to the device named by the config.
    pub async fn connect(config: DeviceConfig) -> Result<Self> {
        let conn = Arc::new(Connection::open(&config).await?);
        Ok(Self::from_parts(conn, config))
    }

    /// Assemble a device around an existing connection.
    pub fn from_parts(conn: Arc<Connection>, config: DeviceConfig) -> Self {
        let screenshots = Screenshots::new(Arc::clone(&conn), &config);
        let control = Control::new(Arc::clone(&conn), &config);
        Self {
            conn,
            screenshots,
            control,
        }
    }

    pub fn serial(&self) -> &str {
        self.conn.serial()
    }

    pub async fn is_alive(&self) -> bool {
        self.conn.is_alive().await
    }

    pub async fn reconnect(&self) -> Result<()> {
        self.conn.reconnect().await
    }

    // Gestures.

    pub async fn click(&self, target: impl Into<ActionTarget>) -> Result<()> {
        self.control.click(&target.into()).await
    }

    pub async fn long_click(
        &self,
        target: impl Into<ActionTarget>,
        duration: Duration,
    ) -> Result<()> {
        self.control.long_click(&target.into(), duration).await
    }

    pub async fn swipe(&self, from: Point, to: Point) -> Result<()> {
        self.control.swipe(from, to).await
    }

    pub async fn drag(&self, from: Point, to: Point) -> Result<()> {
        self.control.drag(from, to).await
    }

    pub async fn swipe_vector(&self, vector: (i32, i32), bounds: Region) -> Result<()> {
        self.control.swipe_vector(vector, bounds).await
    }

    pub async fn swipe_vector_for(
        &self,
        vector: (i32, i32),
        bounds: Region,
        duration: Duration,
    ) -> Result<()> {
        self.control.swipe_vector_for(vector, bounds, duration).await
    }

    // Frames.

    /// Capture a fresh frame, rate-limited.
    pub async fn capture(&self) -> Result<Arc<Frame>> {
        self.screenshots.capture().await
    }

    /// The most recent frame, or none if never captured.
    pub async fn last_frame(&self) -> Option<Arc<Frame>> {
        self.screenshots.last_frame().await
    }

    /// The last frame if one exists, otherwise a fresh capture.
    async fn current_frame(&self) -> Result<Arc<Frame>> {
        match self.screenshots.last_frame().await {
            Some(frame) => Ok(frame),
            None => self.screenshots.capture().await,
        }
    }

    // Appearance matching.

    /// Whether the button currently shows its expected color.
    ///
    /// Uses the last captured frame, capturing one only if none exists
    /// yet. Poll with [`wait_until_appear`](Self::wait_until_appear)
    /// for fresh-frame semantics.
    pub async fn appear(&self, button: &Button, threshold: f64) -> Result<bool> {
        let frame = self.current_frame().await?;
        button.appears_on(&frame, threshold)
    }

    /// Check the button and click it when present; waits `interval`
    /// after the click so the UI can react. Returns whether it clicked.
    pub async fn appear_then_click(
        &self,
        button: &Button,
        threshold: f64,
        interval: Duration,
    ) -> Result<bool> {
        if !self.appear(button, threshold).await? {
            return Ok(false);
        }
        info!(button = %button, "appeared, clicking");
        self.control.click(&ActionTarget::from(button)).await?;
        sleep(interval).await;
        Ok(true)
    }

    /// Poll fresh frames until the button appears or `timeout` passes,
    /// sleeping `interval` between checks.
    ///
    /// Always performs at least one check, even for a zero timeout.
    pub async fn wait_until_appear(
        &self,
        button: &Button,
        threshold: f64,
        timeout: Duration,
        interval: Duration,
    ) -> Result<bool> {
        let mut timer = Timer::new(timeout);
        timer.start();
        loop {
            let frame = self.screenshots.capture().await?;
            if button.appears_on(&frame, threshold)? {
                debug!(button = %button, waited = ?timer.current(), "appeared");
                return Ok(true);
            }
            if timer.reached() {
                debug!(button = %button, ?timeout, "wait expired");
                return Ok(false);
            }
            sleep(interval).await;
        }
    }

    /// Wait for the button, then click it. Returns whether it showed
    /// up within the timeout.
    pub async fn wait_until_appear_then_click(
        &self,
        button: &Button,
        threshold: f64,
        timeout: Duration,
        interval: Duration,
    ) -> Result<bool> {
        if !self
            .wait_until_appear(button, threshold, timeout, interval)
            .await?
        {
            return Ok(false);
        }
        self.control.click(&ActionTarget::from(button)).await?;
        Ok(true)
    }

    /// Template-match the button against the current frame.
    pub async fn match_template(
        &self,
        button: &Button,
        matcher: &dyn TemplateMatcher,
        threshold: f32,
    ) -> Result<bool> {
        let frame = self.current_frame().await?;
        match_template(&frame, button, matcher, threshold)
    }

    // Text.

    /// All recognized text on the current screen, optionally scoped to
    /// a region. Empty when no recognizer is installed.
    pub async fn ocr_text(&self, region: Option<Region>) -> Result<String> {
        let Some(recognizer) = ocr::recognizer() else {
            return Ok(String::new());
        };
        let frame = self.capture().await?;
        let scope = region.map(Ocr::with_region).unwrap_or_default();
        scope.text(&frame, recognizer.as_ref())
    }

    /// First line of recognized text in a region known to hold a
    /// single label. Empty when no recognizer is installed.
    pub async fn ocr_text_single_line(&self, region: Region) -> Result<String> {
        let Some(recognizer) = ocr::recognizer() else {
            return Ok(String::new());
        };
        let frame = self.capture().await?;
        Ocr::with_region(region).text_single_line(&frame, recognizer.as_ref())
    }

    /// Find the first on-screen text matching `wanted`.
    pub async fn find_text(
        &self,
        wanted: &str,
        policy: &TextMatchPolicy,
    ) -> Result<Option<TextSpan>> {
        let Some(recognizer) = ocr::recognizer() else {
            return Ok(None);
        };
        let frame = self.capture().await?;
        Ocr::new().find(&frame, recognizer.as_ref(), wanted, policy)
    }

    /// Find text and tap the center of its span. Returns whether
    /// anything was found.
    pub async fn click_text(&self, wanted: &str, policy: &TextMatchPolicy) -> Result<bool> {
        let Some(span) = self.find_text(wanted, policy).await? else {
            return Ok(false);
        };
        info!(text = %span.text, at = %span.region, "clicking text");
        self.control
            .click(&ActionTarget::Point(span.region.center()))
            .await?;
        Ok(true)
    }

    /// Errors for a region that lies outside the current frame.
    pub async fn check_target(&self, region: Region) -> Result<()> {
        self.current_frame().await?.check_region(region)
    }
}
