//! Async device automation over adb.
//!
//! The layering, bottom up:
//!
//! - [`transport`]: two ways to drive a device, the on-device bridge
//!   agent (preferred) and raw `adb shell` commands (fallback).
//! - [`connection`]: one logical session per serial; wraps transport
//!   calls in reconnect-and-retry.
//! - [`control`] / [`screenshot`]: gestures with backend fallback,
//!   and rate-limited frame capture.
//! - [`device`]: the per-device facade for appearance matching,
//!   wait-until loops and text finding.
//! - [`registry`]: one live session per serial, process-wide.
//!
//! Pure types (regions, colors, buttons, frames, timers, errors) live
//! in `droidpilot-core`.

pub mod adb;
pub mod config;
pub mod connection;
pub mod control;
pub mod device;
pub mod matcher;
pub mod ocr;
pub mod registry;
pub mod screenshot;
pub mod transport;

pub use config::DeviceConfig;
pub use connection::{Connection, RetryPolicy};
pub use control::ActionTarget;
pub use device::Device;
pub use registry::DeviceRegistry;
