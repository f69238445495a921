//! Bridge transport: JSON-line RPC to the on-device agent.
//!
//! The agent listens on a TCP port on the device; we reach it through
//! `adb forward`. Requests are single JSON lines. Responses are a JSON
//! header line, followed for screenshots by `len` raw PNG bytes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use droidpilot_core::error::{Backend, DeviceError, Result};
use droidpilot_core::frame::Frame;
use droidpilot_core::geometry::Point;

use crate::adb::AdbClient;
use crate::transport::Transport;

#[derive(Debug, Serialize)]
struct BridgeRequest {
    id: String,
    #[serde(flatten)]
    command: BridgeCommand,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
enum BridgeCommand {
    Tap {
        x: i32,
        y: i32,
    },
    Swipe {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration_ms: u64,
    },
    Screenshot,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: String,
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    /// Byte count of the PNG payload following the header line.
    #[serde(default)]
    len: Option<u64>,
}

/// Transport backed by the on-device bridge agent.
pub struct BridgeTransport {
    adb: AdbClient,
    local_port: u16,
    remote_port: u16,
    call_timeout: Duration,
    stream: Option<BufStream<TcpStream>>,
}

impl BridgeTransport {
    /// Forward the agent port and open the RPC socket.
    pub async fn connect(
        adb: AdbClient,
        local_port: u16,
        remote_port: u16,
        call_timeout: Duration,
    ) -> Result<Self> {
        let mut transport = Self {
            adb,
            local_port,
            remote_port,
            call_timeout,
            stream: None,
        };
        transport.establish().await?;
        Ok(transport)
    }

    async fn establish(&mut self) -> Result<()> {
        self.stream = None;
        self.adb.forward(self.local_port, self.remote_port).await?;
        let stream = TcpStream::connect(("127.0.0.1", self.local_port))
            .await
            .map_err(|e| DeviceError::transport(Backend::Bridge, "connect", e.to_string()))?;
        debug!(
            serial = %self.adb.serial(),
            port = self.local_port,
            "bridge socket established"
        );
        self.stream = Some(BufStream::new(stream));
        Ok(())
    }

    fn stream(&mut self, op: &'static str) -> Result<&mut BufStream<TcpStream>> {
        self.stream
            .as_mut()
            .ok_or_else(|| DeviceError::transport(Backend::Bridge, op, "bridge not connected"))
    }

    /// Send one request and read the header line of its response.
    ///
    /// Drops the socket on any I/O or protocol error so the next
    /// attempt starts from a reconnect.
    async fn call(&mut self, op: &'static str, command: BridgeCommand) -> Result<BridgeResponse> {
        let request = BridgeRequest {
            id: Uuid::new_v4().to_string(),
            command,
        };
        let call_timeout = self.call_timeout;
        let result = async {
            let line = serde_json::to_string(&request)
                .map_err(|e| DeviceError::transport(Backend::Bridge, op, e.to_string()))?;
            let stream = self.stream(op)?;
            let io_err = |e: std::io::Error| DeviceError::transport(Backend::Bridge, op, e.to_string());

            let exchange = async {
                stream.write_all(line.as_bytes()).await.map_err(io_err)?;
                stream.write_all(b"\n").await.map_err(io_err)?;
                stream.flush().await.map_err(io_err)?;
                let mut reply = String::new();
                let n = stream.read_line(&mut reply).await.map_err(io_err)?;
                if n == 0 {
                    return Err(DeviceError::transport(
                        Backend::Bridge,
                        op,
                        "bridge closed the connection",
                    ));
                }
                Ok(reply)
            };
            let reply = timeout(call_timeout, exchange)
                .await
                .map_err(|_| DeviceError::transport(Backend::Bridge, op, "bridge call timed out"))??;

            let response: BridgeResponse = serde_json::from_str(reply.trim())
                .map_err(|e| DeviceError::transport(Backend::Bridge, op, e.to_string()))?;
            if response.id != request.id {
                return Err(DeviceError::transport(
                    Backend::Bridge,
                    op,
                    format!("response id mismatch: {}", response.id),
                ));
            }
            if !response.ok {
                let message = response.error.unwrap_or_else(|| "unknown error".to_string());
                return Err(DeviceError::transport(Backend::Bridge, op, message));
            }
            Ok(response)
        }
        .await;

        if result.is_err() {
            self.stream = None;
        }
        result
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    fn backend(&self) -> Backend {
        Backend::Bridge
    }

    async fn tap(&mut self, point: Point) -> Result<()> {
        self.call(
            "tap",
            BridgeCommand::Tap {
                x: point.x,
                y: point.y,
            },
        )
        .await?;
        Ok(())
    }

    async fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<()> {
        self.call(
            "swipe",
            BridgeCommand::Swipe {
                x1: from.x,
                y1: from.y,
                x2: to.x,
                y2: to.y,
                duration_ms: duration.as_millis() as u64,
            },
        )
        .await?;
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<Frame> {
        let op = "screenshot";
        let response = self.call(op, BridgeCommand::Screenshot).await?;
        let len = response.len.ok_or_else(|| {
            self.stream = None;
            DeviceError::transport(Backend::Bridge, op, "screenshot reply missing payload length")
        })?;

        let call_timeout = self.call_timeout;
        let payload = {
            let stream = self.stream(op)?;
            let read = async {
                let mut buf = vec![0u8; len as usize];
                stream.read_exact(&mut buf).await?;
                Ok::<_, std::io::Error>(buf)
            };
            timeout(call_timeout, read)
                .await
                .map_err(|_| DeviceError::transport(Backend::Bridge, op, "screenshot read timed out"))
                .and_then(|r| {
                    r.map_err(|e| DeviceError::transport(Backend::Bridge, op, e.to_string()))
                })
        };
        let payload = match payload {
            Ok(bytes) => bytes,
            Err(e) => {
                self.stream = None;
                return Err(e);
            }
        };
        Frame::from_png_bytes(&payload)
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.adb.connect_serial().await?;
        self.establish().await
    }
}
