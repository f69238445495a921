//! Gesture execution with backend fallback.
//!
//! Every gesture is tried on the bridge first; a non-fatal failure
//! (the bridge's retries already exhausted) falls back to the shell.
//! Targets resolve to concrete points here, with jitter inside
//! regions so repeated actions do not land on the same pixel.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use droidpilot_core::button::Button;
use droidpilot_core::error::{Backend, Result};
use droidpilot_core::geometry::{jitter_duration, Point, Region};

use crate::config::DeviceConfig;
use crate::connection::Connection;

/// Something a gesture can land on.
#[derive(Debug, Clone)]
pub enum ActionTarget {
    Point(Point),
    Region(Region),
    Button(Button),
}

impl ActionTarget {
    /// Pick the concrete point to strike. Regions and buttons get a
    /// fresh random point on every call.
    pub fn strike_point(&self) -> Point {
        match self {
            ActionTarget::Point(p) => *p,
            ActionTarget::Region(r) => r.random_point(),
            ActionTarget::Button(b) => b.click_region().random_point(),
        }
    }

    /// Label for logging.
    pub fn label(&self) -> String {
        match self {
            ActionTarget::Point(p) => p.to_string(),
            ActionTarget::Region(r) => r.to_string(),
            ActionTarget::Button(b) => b.name().to_string(),
        }
    }
}

impl From<Point> for ActionTarget {
    fn from(p: Point) -> Self {
        ActionTarget::Point(p)
    }
}

impl From<(i32, i32)> for ActionTarget {
    fn from(p: (i32, i32)) -> Self {
        ActionTarget::Point(p.into())
    }
}

impl From<Region> for ActionTarget {
    fn from(r: Region) -> Self {
        ActionTarget::Region(r)
    }
}

impl From<&Button> for ActionTarget {
    fn from(b: &Button) -> Self {
        ActionTarget::Button(b.clone())
    }
}

/// Gesture front-end over a [`Connection`].
pub struct Control {
    conn: Arc<Connection>,
    min_swipe_distance: f64,
    swipe_duration: Duration,
    drag_duration: Duration,
}

impl Control {
    pub fn new(conn: Arc<Connection>, config: &DeviceConfig) -> Self {
        Self {
            conn,
            min_swipe_distance: config.min_swipe_distance,
            swipe_duration: config.swipe_duration,
            drag_duration: config.drag_duration,
        }
    }

    /// Tap the target once.
    pub async fn click(&self, target: &ActionTarget) -> Result<()> {
        let point = target.strike_point();
        debug!(target = %target.label(), %point, "click");
        match self.conn.tap_via(Backend::Bridge, point).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("bridge click failed ({e}), falling back to shell");
                self.conn.tap_via(Backend::Shell, point).await
            }
        }
    }

    /// Hold the target for a duration. Delivered as a zero-distance
    /// swipe, so the short-swipe guard does not apply.
    pub async fn long_click(&self, target: &ActionTarget, duration: Duration) -> Result<()> {
        let point = target.strike_point();
        debug!(target = %target.label(), %point, ?duration, "long click");
        self.swipe_raw(point, point, duration).await
    }

    /// Swipe between two points, jittering the default duration.
    pub async fn swipe(&self, from: Point, to: Point) -> Result<()> {
        self.swipe_for(from, to, Self::humanize(self.swipe_duration))
            .await
    }

    /// Swipe between two points over an explicit duration.
    ///
    /// Endpoints closer than the minimum distance make the swipe a
    /// no-op: gestures that short register as taps on some devices.
    pub async fn swipe_for(&self, from: Point, to: Point, duration: Duration) -> Result<()> {
        if from.distance_to(to) < self.min_swipe_distance {
            warn!(%from, %to, "swipe shorter than {} px, dropped", self.min_swipe_distance);
            return Ok(());
        }
        debug!(%from, %to, ?duration, "swipe");
        self.swipe_raw(from, to, duration).await
    }

    /// Like [`swipe_for`](Self::swipe_for) but with a slower default
    /// duration, for drag-and-drop style gestures.
    pub async fn drag(&self, from: Point, to: Point) -> Result<()> {
        self.swipe_for(from, to, Self::humanize(self.drag_duration))
            .await
    }

    /// Jitter a default duration to ±20% of its configured value.
    fn humanize(base: Duration) -> Duration {
        jitter_duration(base.mul_f64(0.8), base.mul_f64(1.2))
    }

    /// Swipe by a displacement vector from a random start point,
    /// jittering the default duration.
    pub async fn swipe_vector(&self, vector: (i32, i32), bounds: Region) -> Result<()> {
        self.swipe_vector_for(vector, bounds, Self::humanize(self.swipe_duration))
            .await
    }

    /// Swipe by a displacement vector over an explicit duration.
    ///
    /// The start is drawn from `bounds` shrunk by half the vector on
    /// each axis, so both endpoints stay inside `bounds`.
    pub async fn swipe_vector_for(
        &self,
        vector: (i32, i32),
        bounds: Region,
        duration: Duration,
    ) -> Result<()> {
        let (dx, dy) = vector;
        let safe = bounds.shrink((dx.abs() + 1) / 2 + 1, (dy.abs() + 1) / 2 + 1)?;
        let center = safe.random_point();
        let from = Point::new(center.x - dx / 2, center.y - dy / 2);
        let to = Point::new(from.x + dx, from.y + dy);
        self.swipe_for(from, to, duration).await
    }

    async fn swipe_raw(&self, from: Point, to: Point, duration: Duration) -> Result<()> {
        match self.conn.swipe_via(Backend::Bridge, from, to, duration).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("bridge swipe failed ({e}), falling back to shell");
                self.conn.swipe_via(Backend::Shell, from, to, duration).await
            }
        }
    }
}
