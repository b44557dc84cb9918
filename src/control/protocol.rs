//! Result types shared by the control layer and its transports.
//!
//! Everything here derives `Serialize` so the HTTP surface and the CLI can
//! emit the same JSON shapes.

use crate::error::{ControlError, ErrorKind};
use crate::settings::DeploymentMode;
use serde::Serialize;

/// Outcome of a syntax check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Raw checker output, not machine-parsed
    #[serde(rename = "error")]
    pub diagnostic: String,
}

impl ValidationResult {
    pub fn valid(diagnostic: impl Into<String>) -> Self {
        Self {
            valid: true,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn invalid(diagnostic: impl Into<String>) -> Self {
        Self {
            valid: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Uniform envelope returned by every mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Output captured from the supervisor or runtime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    /// Classification of a failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            log: None,
            kind: None,
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            log: None,
            kind: Some(kind),
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        let log = log.into();
        if !log.is_empty() {
            self.log = Some(log);
        }
        self
    }

    /// Short human-readable summary: message, then log.
    pub fn detail(&self) -> String {
        match (&self.message, &self.log) {
            (Some(m), Some(l)) => format!("{}\n{}", m, l.trim_end()),
            (Some(m), None) => m.clone(),
            (None, Some(l)) => l.trim_end().to_string(),
            (None, None) => String::new(),
        }
    }
}

impl From<ControlError> for OperationResult {
    fn from(err: ControlError) -> Self {
        let kind = err.kind();
        let log = match &err {
            ControlError::Remote { body, .. } => body.clone(),
            _ => String::new(),
        };
        Self::failed(kind, err.to_string()).with_log(log)
    }
}

/// Point-in-time view of the daemon. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub active: bool,
    pub pid: Option<u32>,
    pub mode: DeploymentMode,
    pub target_container: Option<String>,
    /// Whether the supervisor or runtime answered the probe at all
    pub reachable: bool,
}

impl StatusSnapshot {
    /// The degraded answer used when a probe fails or overruns.
    pub fn inactive(mode: &DeploymentMode) -> Self {
        Self {
            active: false,
            pid: None,
            mode: mode.clone(),
            target_container: mode.container().map(|c| c.to_string()),
            reachable: false,
        }
    }
}

/// Wire form of [`StatusSnapshot`] consumed by the dashboard.
///
/// `uptime`, `cpu` and `memory` are placeholders; no metrics are collected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusResponse {
    pub active: bool,
    pub uptime: String,
    pub cpu: f64,
    pub memory: f64,
    /// 0 when unknown
    pub pid: u32,
    pub connected: bool,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_container: Option<String>,
}

impl From<&StatusSnapshot> for StatusResponse {
    fn from(s: &StatusSnapshot) -> Self {
        Self {
            active: s.active,
            uptime: if s.active { "Running" } else { "Stopped" }.to_string(),
            cpu: 0.0,
            memory: 0.0,
            pid: s.pid.unwrap_or(0),
            connected: s.reachable,
            mode: s.mode.wire_name(),
            target_container: s.target_container.clone(),
        }
    }
}
