//! Connection lifecycle and retry.
//!
//! A [`Connection`] owns both transports for one device and wraps
//! every call in the retry loop: failed attempts trigger a reconnect,
//! then a linearly growing backoff before the next try. Exhausting
//! retries on the bridge surfaces a transport error so callers can
//! fall back to the shell; exhausting them on the shell for a gesture
//! means nothing automated is left to try and escalates to a human.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use droidpilot_core::error::{Backend, DeviceError, Result};
use droidpilot_core::frame::Frame;
use droidpilot_core::geometry::Point;

use crate::adb::AdbClient;
use crate::config::DeviceConfig;
use crate::transport::{BridgeTransport, ShellTransport, Transport};

/// How transport calls are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Base backoff; the wait before attempt `n` is `base * (n - 1)`.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay to sleep before the given attempt (1-based).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff * attempt.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// One transport call, reified so the retry loop can replay it.
enum TransportOp {
    Tap(Point),
    Swipe {
        from: Point,
        to: Point,
        duration: Duration,
    },
    Capture,
}

impl TransportOp {
    fn name(&self) -> &'static str {
        match self {
            TransportOp::Tap(_) => "tap",
            TransportOp::Swipe { .. } => "swipe",
            TransportOp::Capture => "screenshot",
        }
    }

    async fn run(&self, transport: &mut dyn Transport) -> Result<Option<Frame>> {
        match self {
            TransportOp::Tap(point) => transport.tap(*point).await.map(|()| None),
            TransportOp::Swipe { from, to, duration } => {
                transport.swipe(*from, *to, *duration).await.map(|()| None)
            }
            TransportOp::Capture => transport.capture_frame().await.map(Some),
        }
    }
}

/// Both transports for one device, plus the retry policy around them.
pub struct Connection {
    serial: String,
    adb: AdbClient,
    policy: RetryPolicy,
    bridge: Mutex<Box<dyn Transport>>,
    shell: Mutex<Box<dyn Transport>>,
    /// Serializes reconnects so concurrent failures re-establish the
    /// transports once, not once per caller.
    reconnect_gate: Mutex<()>,
}

impl Connection {
    /// Open a connection to the configured device.
    ///
    /// Verifies the serial is visible to adb (issuing `adb connect`
    /// first for TCP serials) and establishes the bridge socket.
    pub async fn open(config: &DeviceConfig) -> Result<Self> {
        let adb = AdbClient::new(config.adb_path.as_path(), config.serial.as_str());
        adb.connect_serial().await.ok();

        let serials = AdbClient::list_devices(&config.adb_path).await?;
        if !serials.iter().any(|s| s == &config.serial) {
            return Err(DeviceError::DeviceUnreachable {
                serial: config.serial.clone(),
                reason: "not listed by adb devices".to_string(),
            });
        }

        let bridge = BridgeTransport::connect(
            adb.clone(),
            config.bridge_local_port,
            config.bridge_remote_port,
            config.bridge_call_timeout,
        )
        .await?;
        let shell = ShellTransport::new(adb.clone());
        info!(serial = %config.serial, "device connected");

        Ok(Self::from_parts(
            &config.serial,
            adb,
            config.retry,
            Box::new(bridge),
            Box::new(shell),
        ))
    }

    /// Assemble a connection from already-built transports.
    pub fn from_parts(
        serial: &str,
        adb: AdbClient,
        policy: RetryPolicy,
        bridge: Box<dyn Transport>,
        shell: Box<dyn Transport>,
    ) -> Self {
        Self {
            serial: serial.to_string(),
            adb,
            policy,
            bridge: Mutex::new(bridge),
            shell: Mutex::new(shell),
            reconnect_gate: Mutex::new(()),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Whether adb currently lists this device as usable.
    pub async fn is_alive(&self) -> bool {
        match AdbClient::list_devices(self.adb.path()).await {
            Ok(serials) => serials.iter().any(|s| s == &self.serial),
            Err(_) => false,
        }
    }

    /// Re-establish both transports. Serialized: a reconnect already
    /// in flight makes later callers wait and then proceed.
    pub async fn reconnect(&self) -> Result<()> {
        let _gate = self.reconnect_gate.lock().await;
        info!(serial = %self.serial, "reconnecting transports");
        self.bridge.lock().await.reconnect().await?;
        self.shell.lock().await.reconnect().await?;
        Ok(())
    }

    /// Run one transport op under the retry policy.
    ///
    /// Each failed attempt reconnects, waits out the backoff and tries
    /// again. Invalid-target errors are caller bugs and never retried.
    ///
    /// `escalate` controls what exhaustion on the shell means: gestures
    /// escalate to a takeover request because nothing automated is
    /// left, while captures surface the last error so the acquirer can
    /// report the combined failure itself.
    async fn call_with_retry(
        &self,
        backend: Backend,
        escalate: bool,
        op: &TransportOp,
    ) -> Result<Option<Frame>> {
        let lock = match backend {
            Backend::Bridge => &self.bridge,
            Backend::Shell => &self.shell,
        };
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            if attempt > 1 {
                sleep(self.policy.delay_before(attempt)).await;
                self.reconnect().await?;
                debug!(%backend, op = op.name(), attempt, "retrying");
            }
            let result = {
                let mut transport = lock.lock().await;
                op.run(transport.as_mut()).await
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e @ DeviceError::InvalidTarget(_)) => return Err(e),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(%backend, op = op.name(), attempt, "attempt failed: {e}");
                    last_error = Some(e);
                }
            }
        }
        if escalate && backend == Backend::Shell {
            // The shell is the last automated resort for gestures.
            warn!(serial = %self.serial, op = op.name(), "shell retries exhausted, requesting takeover");
            return Err(DeviceError::HumanTakeoverRequired {
                op: op.name(),
                attempts,
            });
        }
        // Bridge exhaustion is recoverable: the caller falls back.
        Err(last_error
            .unwrap_or_else(|| DeviceError::transport(backend, op.name(), "retries exhausted")))
    }

    pub async fn tap_via(&self, backend: Backend, point: Point) -> Result<()> {
        self.call_with_retry(backend, true, &TransportOp::Tap(point))
            .await?;
        Ok(())
    }

    pub async fn swipe_via(
        &self,
        backend: Backend,
        from: Point,
        to: Point,
        duration: Duration,
    ) -> Result<()> {
        self.call_with_retry(backend, true, &TransportOp::Swipe { from, to, duration })
            .await?;
        Ok(())
    }

    pub async fn capture_via(&self, backend: Backend) -> Result<Frame> {
        match self
            .call_with_retry(backend, false, &TransportOp::Capture)
            .await?
        {
            Some(frame) => Ok(frame),
            None => Err(DeviceError::transport(
                backend,
                "screenshot",
                "transport returned no frame",
            )),
        }
    }
}
