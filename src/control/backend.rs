use super::executor::CommandExecutor;
use super::runtime::RuntimeClient;
use crate::error::{ControlError, Result};
use crate::settings::{ContainerId, ControlConfig, DeploymentMode};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

/// Supervisor/sudo output that means the caller lacks the right to restart.
const DENIED_MARKERS: &[&str] = &[
    "a password is required",
    "a terminal is required",
    "is not in the sudoers file",
    "not allowed to execute",
    "may not run sudo",
    "interactive authentication required",
    "access denied",
    "permission denied",
    "operation not permitted",
    "must be root",
];

#[async_trait]
pub trait Restarter: Send + Sync {
    /// A single restart attempt. `Ok` carries whatever log the backend produced.
    async fn restart(&self) -> Result<String>;

    /// Human-readable target, for logs.
    fn target(&self) -> String;
}

/// Restarts the systemd unit through the (elevated) supervisor.
pub struct HostProcessBackend {
    executor: CommandExecutor,
    supervisor: String,
    unit: String,
    timeout: Duration,
}

impl HostProcessBackend {
    pub fn new(
        executor: CommandExecutor,
        supervisor: impl Into<String>,
        unit: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            supervisor: supervisor.into(),
            unit: unit.into(),
            timeout,
        }
    }

    async fn restart(&self) -> Result<String> {
        let output = self
            .executor
            .sudo_run(&self.supervisor, &["restart", self.unit.as_str()], self.timeout)
            .await?;

        if output.success() {
            return Ok(output.combined);
        }

        let diagnostic = if output.combined.trim().is_empty() {
            format!(
                "{} restart {} exited with status {}",
                self.supervisor, self.unit, output.status
            )
        } else {
            output.combined
        };
        Err(classify_supervisor_failure(diagnostic))
    }
}

pub(crate) fn classify_supervisor_failure(diagnostic: String) -> ControlError {
    let lower = diagnostic.to_ascii_lowercase();
    if DENIED_MARKERS.iter().any(|marker| lower.contains(marker)) {
        ControlError::Permission(diagnostic)
    } else {
        ControlError::Execution(diagnostic)
    }
}

/// Restarts a container through the runtime's control socket.
pub struct RemoteContainerBackend {
    client: RuntimeClient,
    container: ContainerId,
}

impl RemoteContainerBackend {
    pub fn new(client: RuntimeClient, container: ContainerId) -> Self {
        Self { client, container }
    }

    async fn restart(&self) -> Result<String> {
        // The reply body is not inspected on success.
        self.client.restart_container(self.container.as_str()).await?;
        Ok(format!("Container {} restarted", self.container))
    }
}

/// The restart strategy, fixed for the life of the service.
pub enum RestartBackend {
    HostProcess(HostProcessBackend),
    RemoteContainer(RemoteContainerBackend),
}

impl RestartBackend {
    pub fn from_config(config: &ControlConfig) -> Self {
        match &config.mode {
            DeploymentMode::HostManaged => Self::HostProcess(HostProcessBackend::new(
                CommandExecutor::new(config.elevate.clone()),
                &config.supervisor,
                &config.service_unit,
                config.timeouts.restart,
            )),
            DeploymentMode::ContainerManaged(id) => {
                Self::RemoteContainer(RemoteContainerBackend::new(
                    RuntimeClient::new(&config.runtime_socket, config.timeouts.runtime),
                    id.clone(),
                ))
            }
        }
    }
}

#[async_trait]
impl Restarter for RestartBackend {
    async fn restart(&self) -> Result<String> {
        info!("Restarting {}", self.target());
        let result = match self {
            Self::HostProcess(backend) => backend.restart().await,
            Self::RemoteContainer(backend) => backend.restart().await,
        };
        if let Err(e) = &result {
            warn!("Restart of {} failed: {}", self.target(), e);
        }
        result
    }

    fn target(&self) -> String {
        match self {
            Self::HostProcess(b) => format!("unit {}", b.unit),
            Self::RemoteContainer(b) => format!("container {}", b.container),
        }
    }
}
