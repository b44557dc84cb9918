//! Start-up configuration.
//!
//! [`ControlSettings`] is the loose, partially-filled form read from the
//! optional TOML settings file and overlaid with environment variables.
//! [`ControlSettings::resolve`] turns it into the immutable [`ControlConfig`]
//! every component borrows for the lifetime of the process.

use crate::clienv::{self, EnvVar};
use crate::error::{ControlError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_STATUS_MS: u64 = 2_000;
const DEFAULT_PROCESS_SCAN_MS: u64 = 500;
const DEFAULT_CHECK_MS: u64 = 5_000;
const DEFAULT_RESTART_MS: u64 = 30_000;
const DEFAULT_RUNTIME_MS: u64 = 5_000;

const DEFAULT_SUPERVISOR: &str = "systemctl";
const DEFAULT_PROCESS_LOOKUP: &str = "pgrep";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeSetting {
    Host,
    #[serde(alias = "docker-remote", alias = "docker")]
    Container,
}

impl std::str::FromStr for ModeSetting {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(Self::Host),
            "container" | "docker" | "docker-remote" => Ok(Self::Container),
            other => Err(ControlError::Configuration(format!(
                "unknown deployment mode '{}' (expected 'host' or 'container')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub status_ms: Option<u64>,
    pub process_scan_ms: Option<u64>,
    pub check_ms: Option<u64>,
    pub restart_ms: Option<u64>,
    pub runtime_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Canonical dnsmasq configuration file
    pub config_path: Option<PathBuf>,
    /// Address the HTTP surface binds to
    pub listen: Option<String>,
    /// dnsmasq binary used for `--test` dry runs and pid lookup
    pub binary: Option<String>,
    /// systemd unit restarted in host mode
    pub service_unit: Option<String>,
    /// Container name or id; its presence selects container mode
    pub container: Option<String>,
    pub mode: Option<ModeSetting>,
    pub runtime_socket: Option<PathBuf>,
    pub lease_file: Option<PathBuf>,
    /// Privilege elevation prefix for host restarts, e.g. "sudo -n"
    pub elevate: Option<String>,
    /// Directory for validation scratch files (system temp dir if unset)
    pub scratch_dir: Option<PathBuf>,
    pub supervisor: Option<String>,
    pub process_lookup: Option<String>,
    pub timeouts: TimeoutSettings,
}

impl ControlSettings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        tracing::trace!(path = %path.display(), "Loading settings file");

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        tracing::trace!(?settings, "Settings file loaded");
        Ok(settings)
    }

    /// Settings file (if any) overlaid with the process environment.
    pub fn from_env(explicit_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .or_else(clienv::settings_path);

        let settings = match path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        settings.overlay_env()
    }

    fn overlay_env(mut self) -> anyhow::Result<Self> {
        if let Some(v) = clienv::env_opt(EnvVar::ConfigPath) {
            self.config_path = Some(PathBuf::from(v));
        }
        if let Some(v) = clienv::env_opt(EnvVar::Listen) {
            self.listen = Some(v);
        }
        if let Some(v) = clienv::env_opt(EnvVar::Binary) {
            self.binary = Some(v);
        }
        if let Some(v) = clienv::env_opt(EnvVar::ServiceUnit) {
            self.service_unit = Some(v);
        }
        if let Some(v) = clienv::env_opt(EnvVar::Container) {
            self.container = Some(v);
        }
        if let Some(v) = clienv::env_opt(EnvVar::Mode) {
            self.mode = Some(v.parse()?);
        }
        if let Some(v) = clienv::env_opt(EnvVar::RuntimeSocket) {
            self.runtime_socket = Some(PathBuf::from(v));
        }
        if let Some(v) = clienv::env_opt(EnvVar::LeaseFile) {
            self.lease_file = Some(PathBuf::from(v));
        }
        // An empty value is meaningful here: it disables elevation.
        if let Some(v) = clienv::env_raw(EnvVar::Elevate) {
            self.elevate = Some(v);
        }
        Ok(self)
    }

    pub fn resolve(self) -> Result<ControlConfig> {
        let container = self
            .container
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let mode = match (self.mode, container) {
            (Some(ModeSetting::Host), _) => DeploymentMode::HostManaged,
            (Some(ModeSetting::Container), None) => {
                return Err(ControlError::Configuration(
                    "container mode selected but no container identifier configured".into(),
                ))
            }
            (_, Some(id)) => DeploymentMode::ContainerManaged(ContainerId::parse(id)?),
            (None, None) => DeploymentMode::HostManaged,
        };

        let listen_raw = self.listen.unwrap_or_else(|| clienv::DEFAULT_LISTEN.to_string());
        let listen = parse_listen(&listen_raw)?;

        let binary = self
            .binary
            .unwrap_or_else(|| clienv::DEFAULT_BINARY.to_string());
        if binary.trim().is_empty() {
            return Err(ControlError::Configuration("daemon binary must not be empty".into()));
        }

        let elevate = match self.elevate {
            Some(prefix) => split_command(&prefix),
            None if clienv::running_as_root() => Vec::new(),
            None => split_command(clienv::DEFAULT_ELEVATE),
        };

        let t = self.timeouts;
        let timeouts = Timeouts {
            status: Duration::from_millis(t.status_ms.unwrap_or(DEFAULT_STATUS_MS)),
            process_scan: Duration::from_millis(
                t.process_scan_ms.unwrap_or(DEFAULT_PROCESS_SCAN_MS),
            ),
            check: Duration::from_millis(t.check_ms.unwrap_or(DEFAULT_CHECK_MS)),
            restart: Duration::from_millis(t.restart_ms.unwrap_or(DEFAULT_RESTART_MS)),
            runtime: Duration::from_millis(t.runtime_ms.unwrap_or(DEFAULT_RUNTIME_MS)),
        };

        let config = ControlConfig {
            config_path: self
                .config_path
                .unwrap_or_else(|| PathBuf::from(clienv::DEFAULT_CONFIG_PATH)),
            listen,
            binary,
            service_unit: self
                .service_unit
                .unwrap_or_else(|| clienv::DEFAULT_SERVICE_UNIT.to_string()),
            mode,
            runtime_socket: self
                .runtime_socket
                .unwrap_or_else(|| PathBuf::from(clienv::DEFAULT_RUNTIME_SOCKET)),
            lease_file: self
                .lease_file
                .unwrap_or_else(|| PathBuf::from(clienv::DEFAULT_LEASE_FILE)),
            elevate,
            scratch_dir: self.scratch_dir,
            supervisor: self
                .supervisor
                .unwrap_or_else(|| DEFAULT_SUPERVISOR.to_string()),
            process_lookup: self
                .process_lookup
                .unwrap_or_else(|| DEFAULT_PROCESS_LOOKUP.to_string()),
            timeouts,
        };

        tracing::debug!(mode = %config.mode, config_path = %config.config_path.display(), "Resolved control configuration");
        Ok(config)
    }
}

/// Listen address, accepting the `:port` shorthand.
pub fn parse_listen(raw: &str) -> Result<SocketAddr> {
    // Accept Go-style ":3000" shorthand.
    let normalized = if raw.starts_with(':') {
        format!("0.0.0.0{}", raw)
    } else {
        raw.to_string()
    };
    normalized
        .parse()
        .map_err(|e| ControlError::Configuration(format!("invalid listen address '{}': {}", raw, e)))
}

fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Container name or id, restricted to characters valid in a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim().trim_start_matches('/');
        if raw.is_empty() {
            return Err(ControlError::Configuration("container identifier is empty".into()));
        }
        let valid = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
        if !valid {
            return Err(ControlError::Configuration(format!(
                "invalid container identifier '{}'",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentMode {
    HostManaged,
    ContainerManaged(ContainerId),
}

impl DeploymentMode {
    /// Name reported on the status surface.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::HostManaged => "host",
            Self::ContainerManaged(_) => "docker-remote",
        }
    }

    pub fn container(&self) -> Option<&ContainerId> {
        match self {
            Self::HostManaged => None,
            Self::ContainerManaged(id) => Some(id),
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostManaged => f.write_str("host"),
            Self::ContainerManaged(id) => write!(f, "container:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub status: Duration,
    pub process_scan: Duration,
    pub check: Duration,
    pub restart: Duration,
    pub runtime: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            status: Duration::from_millis(DEFAULT_STATUS_MS),
            process_scan: Duration::from_millis(DEFAULT_PROCESS_SCAN_MS),
            check: Duration::from_millis(DEFAULT_CHECK_MS),
            restart: Duration::from_millis(DEFAULT_RESTART_MS),
            runtime: Duration::from_millis(DEFAULT_RUNTIME_MS),
        }
    }
}

/// Immutable configuration fixed at start-up.
#[derive(Debug, Clone)]
pub struct ControlConfig {
    pub config_path: PathBuf,
    pub listen: SocketAddr,
    pub binary: String,
    pub service_unit: String,
    pub mode: DeploymentMode,
    pub runtime_socket: PathBuf,
    pub lease_file: PathBuf,
    pub elevate: Vec<String>,
    pub scratch_dir: Option<PathBuf>,
    pub supervisor: String,
    pub process_lookup: String,
    pub timeouts: Timeouts,
}

impl ControlConfig {
    /// File name of the daemon binary, as it appears in the process table.
    pub fn binary_name(&self) -> &str {
        Path::new(&self.binary)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(self.binary.as_str())
    }
}
