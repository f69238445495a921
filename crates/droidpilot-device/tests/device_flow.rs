//! End-to-end behavior against scripted mock transports: retry and
//! fallback ordering, capture rate limiting, gesture guards, and the
//! wait-until polling loop.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use tokio::time::Instant;

use droidpilot_core::button::Button;
use droidpilot_core::color::Color;
use droidpilot_core::error::{Backend, DeviceError, Result};
use droidpilot_core::frame::Frame;
use droidpilot_core::geometry::{Point, Region};

use droidpilot_device::adb::AdbClient;
use droidpilot_device::connection::{Connection, RetryPolicy};
use droidpilot_device::device::Device;
use droidpilot_device::registry::DeviceRegistry;
use droidpilot_device::transport::Transport;
use droidpilot_device::DeviceConfig;

const FRAME_W: u32 = 640;
const FRAME_H: u32 = 480;

/// Counters shared between a mock transport and the test body.
#[derive(Default)]
struct MockState {
    taps: Mutex<Vec<Point>>,
    swipes: Mutex<Vec<(Point, Point, Duration)>>,
    reconnects: AtomicU32,
    /// Gesture calls left to fail. `u32::MAX` means always fail.
    gesture_failures: AtomicU32,
    /// Capture calls left to fail. `u32::MAX` means always fail.
    capture_failures: AtomicU32,
}

impl MockState {
    fn take_failure(counter: &AtomicU32) -> bool {
        let left = counter.load(Ordering::SeqCst);
        if left == 0 {
            return false;
        }
        if left != u32::MAX {
            counter.store(left - 1, Ordering::SeqCst);
        }
        true
    }

    fn tap_count(&self) -> usize {
        self.taps.lock().unwrap().len()
    }

    fn swipe_log(&self) -> Vec<(Point, Point, Duration)> {
        self.swipes.lock().unwrap().clone()
    }
}

struct MockTransport {
    backend: Backend,
    frame_color: Color,
    state: Arc<MockState>,
}

impl MockTransport {
    fn build(backend: Backend, frame_color: Color) -> (Box<dyn Transport>, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        let transport = Box::new(Self {
            backend,
            frame_color,
            state: Arc::clone(&state),
        });
        (transport, state)
    }

    fn err(&self, op: &'static str) -> DeviceError {
        DeviceError::transport(self.backend, op, "scripted failure")
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn tap(&mut self, point: Point) -> Result<()> {
        if MockState::take_failure(&self.state.gesture_failures) {
            return Err(self.err("tap"));
        }
        self.state.taps.lock().unwrap().push(point);
        Ok(())
    }

    async fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<()> {
        if MockState::take_failure(&self.state.gesture_failures) {
            return Err(self.err("swipe"));
        }
        self.state.swipes.lock().unwrap().push((from, to, duration));
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<Frame> {
        if MockState::take_failure(&self.state.capture_failures) {
            return Err(self.err("screenshot"));
        }
        let Color(r, g, b) = self.frame_color;
        Ok(Frame::new(RgbImage::from_pixel(
            FRAME_W,
            FRAME_H,
            Rgb([r, g, b]),
        )))
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.state.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn test_config() -> DeviceConfig {
    let mut config = DeviceConfig::new("TEST0001");
    config.retry = RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_millis(1),
    };
    config.screenshot_interval = Duration::from_millis(1);
    config.swipe_duration = Duration::from_millis(50);
    config
}

fn build_device(
    config: DeviceConfig,
    frame_color: Color,
) -> (Device, Arc<MockState>, Arc<MockState>) {
    let (bridge, bridge_state) = MockTransport::build(Backend::Bridge, frame_color);
    let (shell, shell_state) = MockTransport::build(Backend::Shell, frame_color);
    let conn = Connection::from_parts(
        &config.serial,
        AdbClient::new(config.adb_path.as_path(), config.serial.as_str()),
        config.retry,
        bridge,
        shell,
    );
    let device = Device::from_parts(Arc::new(conn), config);
    (device, bridge_state, shell_state)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn retry_absorbs_transient_bridge_failures() {
    init_tracing();
    let (device, bridge, shell) = build_device(test_config(), Color(0, 0, 0));
    // First two attempts fail, third succeeds: the retry loop absorbs
    // the failures and the fallback is never touched.
    bridge.gesture_failures.store(2, Ordering::SeqCst);

    device.click((10, 20)).await.unwrap();

    assert_eq!(bridge.tap_count(), 1);
    assert_eq!(shell.tap_count(), 0);
    assert_eq!(bridge.reconnects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fallback_engages_after_bridge_exhaustion() {
    init_tracing();
    let (device, bridge, shell) = build_device(test_config(), Color(0, 0, 0));
    bridge.gesture_failures.store(u32::MAX, Ordering::SeqCst);

    device.click((10, 20)).await.unwrap();

    assert_eq!(bridge.tap_count(), 0);
    assert_eq!(shell.tap_count(), 1);
}

#[tokio::test]
async fn exhausting_both_backends_requests_takeover() {
    init_tracing();
    let (device, bridge, shell) = build_device(test_config(), Color(0, 0, 0));
    bridge.gesture_failures.store(u32::MAX, Ordering::SeqCst);
    shell.gesture_failures.store(u32::MAX, Ordering::SeqCst);

    let err = device.click((10, 20)).await.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, DeviceError::HumanTakeoverRequired { .. }));
}

#[tokio::test]
async fn capture_rate_limit_spaces_attempts() {
    init_tracing();
    let mut config = test_config();
    config.screenshot_interval = Duration::from_millis(300);
    let (device, _bridge, _shell) = build_device(config, Color(0, 0, 0));

    let started = Instant::now();
    device.capture().await.unwrap();
    device.capture().await.unwrap();
    assert!(
        started.elapsed() >= Duration::from_millis(290),
        "second capture ran {:?} after the first",
        started.elapsed()
    );
}

#[tokio::test]
async fn capture_falls_back_then_reports_combined_failure() {
    init_tracing();
    let (device, bridge, _shell) = build_device(test_config(), Color(9, 9, 9));
    bridge.capture_failures.store(u32::MAX, Ordering::SeqCst);

    let frame = device.capture().await.unwrap();
    assert_eq!(frame.mean_color(Region::new(0, 0, 10, 10).unwrap()).unwrap(), Color(9, 9, 9));

    let (device, bridge, shell) = build_device(test_config(), Color(9, 9, 9));
    bridge.capture_failures.store(u32::MAX, Ordering::SeqCst);
    shell.capture_failures.store(u32::MAX, Ordering::SeqCst);
    let err = device.capture().await.unwrap_err();
    assert!(matches!(err, DeviceError::CaptureFailed));
}

#[tokio::test]
async fn short_swipe_is_dropped_without_transport_calls() {
    init_tracing();
    let (device, bridge, shell) = build_device(test_config(), Color(0, 0, 0));

    // Distance ~7px, under the 10px minimum.
    device
        .swipe(Point::new(0, 0), Point::new(5, 5))
        .await
        .unwrap();

    assert!(bridge.swipe_log().is_empty());
    assert!(shell.swipe_log().is_empty());
}

#[tokio::test]
async fn long_click_is_a_held_zero_distance_swipe() {
    init_tracing();
    let (device, bridge, _shell) = build_device(test_config(), Color(0, 0, 0));
    let hold = Duration::from_secs(1);

    device.long_click((100, 100), hold).await.unwrap();

    let swipes = bridge.swipe_log();
    assert_eq!(swipes.len(), 1);
    let (from, to, duration) = swipes[0];
    assert_eq!(from, to);
    assert_eq!(duration, hold);
}

#[tokio::test]
async fn swipe_vector_endpoints_stay_inside_bounds() {
    init_tracing();
    let (device, bridge, _shell) = build_device(test_config(), Color(0, 0, 0));
    let bounds = Region::new(0, 0, 600, 400).unwrap();

    for _ in 0..50 {
        device.swipe_vector((250, -120), bounds).await.unwrap();
    }

    let swipes = bridge.swipe_log();
    assert_eq!(swipes.len(), 50);
    for (from, to, _) in swipes {
        assert!(bounds.contains(from), "start {from} escaped {bounds}");
        assert!(bounds.contains(to), "end {to} escaped {bounds}");
        assert_eq!(to, Point::new(from.x + 250, from.y - 120));
    }
}

#[tokio::test]
async fn swipe_vector_for_honors_explicit_duration() {
    init_tracing();
    let (device, bridge, _shell) = build_device(test_config(), Color(0, 0, 0));
    let bounds = Region::new(0, 0, 600, 400).unwrap();
    let duration = Duration::from_millis(120);

    device
        .swipe_vector_for((250, -120), bounds, duration)
        .await
        .unwrap();

    let swipes = bridge.swipe_log();
    assert_eq!(swipes.len(), 1);
    let (from, to, got) = swipes[0];
    assert_eq!(got, duration);
    assert!(bounds.contains(from) && bounds.contains(to));
}

#[tokio::test]
async fn appear_matches_frame_color() {
    init_tracing();
    let (device, _bridge, _shell) = build_device(test_config(), Color(254, 1, 1));
    let area = Region::new(100, 200, 300, 400).unwrap();

    let red = Button::new(area).with_color(Color(255, 0, 0)).with_name("RED");
    assert!(device.appear(&red, 10.0).await.unwrap());

    let green = Button::new(area).with_color(Color(0, 255, 0)).with_name("GREEN");
    assert!(!device.appear(&green, 10.0).await.unwrap());
}

#[tokio::test]
async fn appear_then_click_taps_inside_click_region() {
    init_tracing();
    let (device, bridge, _shell) = build_device(test_config(), Color(255, 0, 0));
    let area = Region::new(100, 200, 300, 400).unwrap();
    let click = Region::new(500, 50, 540, 90).unwrap();
    let button = Button::new(area)
        .with_color(Color(255, 0, 0))
        .with_click(click)
        .with_name("OK");

    let clicked = device
        .appear_then_click(&button, 10.0, Duration::from_millis(5))
        .await
        .unwrap();

    assert!(clicked);
    let taps = bridge.taps.lock().unwrap().clone();
    assert_eq!(taps.len(), 1);
    assert!(click.contains(taps[0]));
}

#[tokio::test]
async fn wait_until_appear_times_out_against_nonmatching_frames() {
    init_tracing();
    let (device, _bridge, _shell) = build_device(test_config(), Color(0, 0, 255));
    let button = Button::new(Region::new(100, 200, 300, 400).unwrap())
        .with_color(Color(255, 0, 0))
        .with_name("NEVER");

    let started = Instant::now();
    let appeared = device
        .wait_until_appear(
            &button,
            10.0,
            Duration::from_secs(1),
            Duration::from_millis(300),
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(!appeared);
    assert!(
        elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1600),
        "wait took {elapsed:?}"
    );
}

#[tokio::test]
async fn wait_until_appear_returns_on_first_matching_frame() {
    init_tracing();
    let (device, _bridge, _shell) = build_device(test_config(), Color(255, 0, 0));
    let button = Button::new(Region::new(100, 200, 300, 400).unwrap())
        .with_color(Color(255, 0, 0))
        .with_name("NOW");

    // Zero timeout still performs one check.
    let appeared = device
        .wait_until_appear(&button, 10.0, Duration::ZERO, Duration::from_millis(50))
        .await
        .unwrap();
    assert!(appeared);
}

#[tokio::test]
async fn registry_connect_reuses_the_live_session() {
    init_tracing();
    let registry = DeviceRegistry::new();
    let serial = test_config().serial;
    let sessions_built = Arc::new(AtomicU32::new(0));

    let establish = |built: Arc<AtomicU32>| async move {
        built.fetch_add(1, Ordering::SeqCst);
        let (device, _bridge, _shell) = build_device(test_config(), Color(0, 0, 0));
        Ok::<_, DeviceError>(device)
    };

    let first = registry
        .connect_with(&serial, || establish(Arc::clone(&sessions_built)))
        .await
        .unwrap();
    let second = registry
        .connect_with(&serial, || establish(Arc::clone(&sessions_built)))
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second), "second connect must reuse");
    assert_eq!(sessions_built.load(Ordering::SeqCst), 1);
    assert_eq!(registry.serials().await, vec![serial.clone()]);

    registry.disconnect(&serial).await.unwrap();
    assert!(registry.get(&serial).await.is_none());
    let err = registry.disconnect(&serial).await.unwrap_err();
    assert!(matches!(err, DeviceError::DeviceUnreachable { .. }));
}

#[tokio::test]
async fn takeover_passes_through_the_polling_loop() {
    init_tracing();
    let (device, bridge, shell) = build_device(test_config(), Color(0, 0, 0));
    bridge.gesture_failures.store(u32::MAX, Ordering::SeqCst);
    shell.gesture_failures.store(u32::MAX, Ordering::SeqCst);
    let button = Button::new(Region::new(100, 200, 300, 400).unwrap())
        .with_color(Color(0, 0, 0))
        .with_name("DOOMED");

    // The button appears, so the wait succeeds and the click runs into
    // the dead transports.
    let err = device
        .wait_until_appear_then_click(
            &button,
            10.0,
            Duration::from_secs(1),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::HumanTakeoverRequired { .. }));
}
