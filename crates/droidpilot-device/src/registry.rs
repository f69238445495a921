//! Process-wide device registry.
//!
//! One live [`Device`] per serial: connecting to a serial that is
//! already connected hands back the existing handle instead of racing
//! a second session against it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use droidpilot_core::error::{DeviceError, Result};

use crate::config::DeviceConfig;
use crate::device::Device;

/// Registry of connected devices, keyed by serial.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Arc<Device>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to a device, or return the existing handle for its
    /// serial. Idempotent.
    pub async fn connect(&self, config: DeviceConfig) -> Result<Arc<Device>> {
        let serial = config.serial.clone();
        self.connect_with(&serial, || Device::connect(config)).await
    }

    /// Like [`DeviceRegistry::connect`], with the session built by
    /// `establish`. The factory only runs when the serial has no live
    /// session yet.
    pub async fn connect_with<F, Fut>(&self, serial: &str, establish: F) -> Result<Arc<Device>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Device>>,
    {
        if let Some(device) = self.devices.read().await.get(serial) {
            debug!(serial, "reusing existing session");
            return Ok(Arc::clone(device));
        }

        let serial = serial.to_string();
        let device = Arc::new(establish().await?);

        let mut devices = self.devices.write().await;
        // Two callers may have raced past the read check; the first
        // insert wins and the later connection is dropped.
        if let Some(existing) = devices.get(&serial) {
            return Ok(Arc::clone(existing));
        }
        devices.insert(serial.clone(), Arc::clone(&device));
        info!(serial = %serial, sessions = devices.len(), "device registered");
        Ok(device)
    }

    /// The device for a serial, if connected.
    pub async fn get(&self, serial: &str) -> Option<Arc<Device>> {
        self.devices.read().await.get(serial).cloned()
    }

    /// Drop the session for a serial.
    pub async fn disconnect(&self, serial: &str) -> Result<()> {
        match self.devices.write().await.remove(serial) {
            Some(_) => {
                info!(serial, "device disconnected");
                Ok(())
            }
            None => Err(DeviceError::DeviceUnreachable {
                serial: serial.to_string(),
                reason: "not connected".to_string(),
            }),
        }
    }

    /// Serials of all connected devices.
    pub async fn serials(&self) -> Vec<String> {
        self.devices.read().await.keys().cloned().collect()
    }
}
