use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvVar {
    AdminSettings,
    ConfigPath,
    Listen,
    Binary,
    ServiceUnit,
    Container,
    Mode,
    RuntimeSocket,
    LeaseFile,
    Elevate,
}

impl EnvVar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdminSettings => "DNSMASQ_ADMIN_SETTINGS",
            Self::ConfigPath => "DNSMASQ_CONFIG_PATH",
            Self::Listen => "DNSMASQ_ADMIN_LISTEN",
            Self::Binary => "DNSMASQ_BINARY",
            Self::ServiceUnit => "DNSMASQ_SERVICE_UNIT",
            Self::Container => "DNSMASQ_CONTAINER",
            Self::Mode => "DNSMASQ_ADMIN_MODE",
            Self::RuntimeSocket => "DNSMASQ_RUNTIME_SOCKET",
            Self::LeaseFile => "DNSMASQ_LEASE_FILE",
            Self::Elevate => "DNSMASQ_ADMIN_ELEVATE",
        }
    }
}

pub const DEFAULT_CONFIG_PATH: &str = "/etc/dnsmasq.conf";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:3000";
pub const DEFAULT_BINARY: &str = "dnsmasq";
pub const DEFAULT_SERVICE_UNIT: &str = "dnsmasq";
pub const DEFAULT_RUNTIME_SOCKET: &str = "/var/run/docker.sock";
pub const DEFAULT_LEASE_FILE: &str = "/var/lib/misc/dnsmasq.leases";
pub const DEFAULT_ELEVATE: &str = "sudo -n";

/// Non-empty value of an environment variable.
pub fn env_opt(var: EnvVar) -> Option<String> {
    let val = std::env::var(var.as_str())
        .ok()
        .filter(|v| !v.trim().is_empty());
    tracing::trace!(var = var.as_str(), value = ?val, "env lookup");
    val
}

/// Like [`env_opt`], but an explicitly empty value is kept.
pub fn env_raw(var: EnvVar) -> Option<String> {
    let val = std::env::var(var.as_str()).ok();
    tracing::trace!(var = var.as_str(), value = ?val, "env lookup (raw)");
    val
}

/// Settings file path ($DNSMASQ_ADMIN_SETTINGS)
pub fn settings_path() -> Option<PathBuf> {
    env_opt(EnvVar::AdminSettings).map(PathBuf::from)
}

/// Whether the current process already runs with root privileges.
pub fn running_as_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}
