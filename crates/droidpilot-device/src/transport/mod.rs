//! Transport backends.
//!
//! A [`Transport`] injects gestures and captures frames over one
//! concrete channel to the device. Two implementations exist: the
//! bridge agent spoken to over a forwarded TCP socket, and plain
//! `adb shell` subprocess calls. The connection manager owns one of
//! each and decides which to use, retry and reconnect.

use std::time::Duration;

use async_trait::async_trait;

use droidpilot_core::error::Result;
use droidpilot_core::frame::Frame;
use droidpilot_core::geometry::Point;

pub use droidpilot_core::error::Backend;

mod bridge;
mod shell;

pub use bridge::BridgeTransport;
pub use shell::ShellTransport;

/// One channel for driving a device.
///
/// Calls take `&mut self`: the connection manager serializes access
/// per backend, so implementations never see concurrent calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Which backend this transport implements.
    fn backend(&self) -> Backend;

    /// Tap at a point.
    async fn tap(&mut self, point: Point) -> Result<()>;

    /// Swipe between two points over a duration. A zero-distance
    /// swipe held for a duration is how long presses are delivered.
    async fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<()>;

    /// Capture a full-screen frame.
    async fn capture_frame(&mut self) -> Result<Frame>;

    /// Tear down and re-establish the channel after a failure.
    async fn reconnect(&mut self) -> Result<()>;
}
