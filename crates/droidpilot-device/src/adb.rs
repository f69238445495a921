//! Thin wrapper around the `adb` binary.
//!
//! Both transports and the connection manager go through this client:
//! the shell transport for gesture injection and screencap, the
//! connection manager for device discovery and port forwarding.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use droidpilot_core::error::{Backend, DeviceError, Result};

/// Handle for running `adb` against one device serial.
#[derive(Debug, Clone)]
pub struct AdbClient {
    adb_path: PathBuf,
    serial: String,
}

impl AdbClient {
    pub fn new(adb_path: impl Into<PathBuf>, serial: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
            serial: serial.into(),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn path(&self) -> &Path {
        &self.adb_path
    }

    /// Base command scoped to this device.
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        cmd.arg("-s").arg(&self.serial);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Run an adb subcommand and collect stdout, failing on a non-zero
    /// exit status.
    async fn run(&self, op: &'static str, args: &[&str]) -> Result<Vec<u8>> {
        debug!(serial = %self.serial, ?args, "adb {op}");
        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(|e| DeviceError::transport(Backend::Shell, op, e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeviceError::transport(
                Backend::Shell,
                op,
                format!("adb exited with {}: {}", output.status, stderr.trim()),
            ));
        }
        Ok(output.stdout)
    }

    /// Run a shell command on the device and return its output as text.
    pub async fn shell(&self, op: &'static str, shell_args: &[&str]) -> Result<String> {
        let mut args = vec!["shell"];
        args.extend_from_slice(shell_args);
        let stdout = self.run(op, &args).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Pull a file from the device.
    pub async fn pull(&self, remote: &str, local: &Path) -> Result<()> {
        let local = local.to_string_lossy();
        self.run("pull", &["pull", remote, local.as_ref()]).await?;
        Ok(())
    }

    /// Forward a local TCP port to a port on the device.
    pub async fn forward(&self, local_port: u16, remote_port: u16) -> Result<()> {
        let local = format!("tcp:{local_port}");
        let remote = format!("tcp:{remote_port}");
        self.run("forward", &["forward", &local, &remote]).await?;
        Ok(())
    }

    /// Ask the adb server to connect to a TCP serial (`host:port`).
    /// No-op for USB serials, which adb discovers on its own.
    pub async fn connect_serial(&self) -> Result<()> {
        if !self.serial.contains(':') {
            return Ok(());
        }
        // `adb connect` is not device-scoped.
        let output = Command::new(&self.adb_path)
            .args(["connect", &self.serial])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DeviceError::transport(Backend::Shell, "connect", e.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        // adb connect reports failures on stdout with a zero exit status.
        if stdout.contains("failed") || stdout.contains("cannot") {
            return Err(DeviceError::transport(
                Backend::Shell,
                "connect",
                stdout.trim().to_string(),
            ));
        }
        Ok(())
    }

    /// List serials the adb server currently sees in the `device` state.
    pub async fn list_devices(adb_path: &Path) -> Result<Vec<String>> {
        let output = Command::new(adb_path)
            .arg("devices")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DeviceError::transport(Backend::Shell, "devices", e.to_string()))?;
        if !output.status.success() {
            return Err(DeviceError::transport(
                Backend::Shell,
                "devices",
                format!("adb devices exited with {}", output.status),
            ));
        }
        Ok(parse_device_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `adb devices` output into serials in the `device` state.
///
/// Skips the banner line, offline devices and unauthorized entries.
fn parse_device_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            (state == "device").then(|| serial.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_list() {
        let output = "List of devices attached\n\
                      emulator-5554\tdevice\n\
                      127.0.0.1:5565\tdevice\n\
                      0123456789ABCDEF\toffline\n\
                      FEDCBA9876543210\tunauthorized\n\n";
        let serials = parse_device_list(output);
        assert_eq!(serials, vec!["emulator-5554", "127.0.0.1:5565"]);
    }

    #[test]
    fn parses_empty_device_list() {
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
        assert!(parse_device_list("").is_empty());
    }

    #[tokio::test]
    async fn missing_adb_binary_is_a_transport_error() {
        let err = AdbClient::list_devices(Path::new("/nonexistent/adb"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Transport {
                backend: Backend::Shell,
                op: "devices",
                ..
            }
        ));
    }
}
