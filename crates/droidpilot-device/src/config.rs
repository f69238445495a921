//! Device configuration with environment overrides.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::connection::RetryPolicy;

/// Environment variable naming the adb binary to use.
pub const ENV_ADB: &str = "DROIDPILOT_ADB";
/// Environment variable naming the device serial.
pub const ENV_SERIAL: &str = "DROIDPILOT_SERIAL";
/// Environment variable overriding the on-device bridge agent port.
pub const ENV_BRIDGE_PORT: &str = "DROIDPILOT_BRIDGE_PORT";

/// Everything needed to open and drive one device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Device serial, e.g. `emulator-5554` or `127.0.0.1:5555`.
    pub serial: String,
    /// Path to the adb binary.
    pub adb_path: PathBuf,
    /// Port the bridge agent listens on, on the device side.
    pub bridge_remote_port: u16,
    /// Local port `adb forward` binds for the bridge connection.
    pub bridge_local_port: u16,
    /// Per-call timeout for bridge requests.
    pub bridge_call_timeout: Duration,
    /// Minimum spacing between consecutive screenshot attempts.
    pub screenshot_interval: Duration,
    /// Retry behavior for transport calls.
    pub retry: RetryPolicy,
    /// Swipes and drags shorter than this many pixels are dropped.
    pub min_swipe_distance: f64,
    /// Default swipe duration.
    pub swipe_duration: Duration,
    /// Default drag duration.
    pub drag_duration: Duration,
}

impl DeviceConfig {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            ..Self::default()
        }
    }

    /// Build a config from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(serial) = env::var(ENV_SERIAL) {
            if !serial.is_empty() {
                config.serial = serial;
            }
        }
        if let Ok(adb) = env::var(ENV_ADB) {
            if !adb.is_empty() {
                config.adb_path = PathBuf::from(adb);
            }
        }
        if let Some(port) = env::var(ENV_BRIDGE_PORT)
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
        {
            config.bridge_remote_port = port;
        }
        config
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial: "127.0.0.1:5555".to_string(),
            adb_path: PathBuf::from("adb"),
            bridge_remote_port: 7912,
            bridge_local_port: 17912,
            bridge_call_timeout: Duration::from_secs(10),
            screenshot_interval: Duration::from_millis(300),
            retry: RetryPolicy::default(),
            min_swipe_distance: 10.0,
            swipe_duration: Duration::from_millis(200),
            drag_duration: Duration::from_millis(500),
        }
    }
}
