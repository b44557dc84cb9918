//! Minimal client for the container runtime's control socket.
//!
//! Speaks just enough HTTP/1.1 over a Unix stream for the two calls we need
//! (restart and inspect). Each request opens a fresh connection with
//! `Connection: close` and reads the reply to EOF.

use crate::error::{ControlError, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, trace};

const API_HOST: &str = "docker";

#[derive(Debug, Clone)]
pub struct RuntimeResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RuntimeResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }
}

/// Subset of `GET /containers/{id}/json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspect {
    #[serde(default)]
    pub state: ContainerState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub restarting: bool,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct RuntimeClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl RuntimeClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    pub async fn restart_container(&self, id: &str) -> Result<RuntimeResponse> {
        let response = self
            .request("POST", &format!("/containers/{}/restart", id))
            .await?;
        ensure_success(response)
    }

    pub async fn inspect_container(&self, id: &str) -> Result<ContainerInspect> {
        let response = self.request("GET", &format!("/containers/{}/json", id)).await?;
        let response = ensure_success(response)?;
        serde_json::from_slice(&response.body).map_err(|e| {
            ControlError::Execution(format!("unreadable inspect response for {}: {}", id, e))
        })
    }

    /// One request/response round trip, bounded by the client timeout.
    pub async fn request(&self, method: &str, path: &str) -> Result<RuntimeResponse> {
        let label = format!("{} {}", method, path);
        match tokio::time::timeout(self.timeout, self.round_trip(method, path)).await {
            Ok(result) => result,
            Err(_) => Err(ControlError::timeout(label, self.timeout)),
        }
    }

    #[cfg(unix)]
    async fn round_trip(&self, method: &str, path: &str) -> Result<RuntimeResponse> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        debug!(socket = %self.socket_path.display(), "{} {}", method, path);

        let mut stream = tokio::net::UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| {
                ControlError::Connect(format!("{}: {}", self.socket_path.display(), e))
            })?;

        let request = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            method, path, API_HOST
        );
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| ControlError::Connect(format!("write to runtime socket: {}", e)))?;

        let mut raw = Vec::new();
        stream
            .read_to_end(&mut raw)
            .await
            .map_err(|e| ControlError::Connect(format!("read from runtime socket: {}", e)))?;

        let response = parse_response(&raw)?;
        trace!(status = response.status, bytes = response.body.len(), "Runtime replied");
        Ok(response)
    }

    #[cfg(not(unix))]
    async fn round_trip(&self, _method: &str, _path: &str) -> Result<RuntimeResponse> {
        Err(ControlError::Connect(
            "container runtime sockets are only supported on unix hosts".to_string(),
        ))
    }
}

fn ensure_success(response: RuntimeResponse) -> Result<RuntimeResponse> {
    if response.status >= 400 {
        return Err(ControlError::Remote {
            status: response.status,
            body: response.body_text(),
        });
    }
    Ok(response)
}

pub(crate) fn parse_response(raw: &[u8]) -> Result<RuntimeResponse> {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| ControlError::Execution("runtime response missing header delimiter".into()))?;

    let header_text = String::from_utf8_lossy(&raw[..split]);
    let mut lines = header_text.lines();
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| ControlError::Execution("runtime response has invalid status line".into()))?;

    let chunked = lines
        .filter_map(|line| line.split_once(':'))
        .any(|(key, value)| {
            key.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.trim().eq_ignore_ascii_case("chunked")
        });

    let payload = &raw[split + 4..];
    let body = if chunked {
        decode_chunked(payload)?
    } else {
        payload.to_vec()
    };

    Ok(RuntimeResponse { status, body })
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>> {
    let malformed = || ControlError::Execution("malformed chunked runtime response".into());
    let mut body = Vec::new();

    loop {
        let line_end = data
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(malformed)?;
        let size_field = std::str::from_utf8(&data[..line_end]).map_err(|_| malformed())?;
        let size_hex = size_field.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| malformed())?;
        data = &data[line_end + 2..];

        if size == 0 {
            return Ok(body);
        }
        if data.len() < size {
            return Err(malformed());
        }
        body.extend_from_slice(&data[..size]);
        data = data.get(size + 2..).unwrap_or(&[]);
    }
}
