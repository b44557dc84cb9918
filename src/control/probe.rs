use super::executor::CommandExecutor;
use super::protocol::StatusSnapshot;
use super::runtime::RuntimeClient;
use crate::settings::{ContainerId, ControlConfig, DeploymentMode, Timeouts};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Never fails: anything that goes wrong degrades to `active = false`.
    async fn probe(&self) -> StatusSnapshot;
}

/// Liveness via `systemctl is-active`, pid via `pgrep -x`.
pub struct HostStatusProbe {
    executor: CommandExecutor,
    supervisor: String,
    unit: String,
    process_lookup: String,
    binary_name: String,
    supervisor_limit: Duration,
    timeouts: Timeouts,
}

impl HostStatusProbe {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            executor: CommandExecutor::default(),
            supervisor: config.supervisor.clone(),
            unit: config.service_unit.clone(),
            process_lookup: config.process_lookup.clone(),
            binary_name: config.binary_name().to_string(),
            supervisor_limit: supervisor_budget(&config.timeouts),
            timeouts: config.timeouts,
        }
    }

    async fn probe(&self) -> StatusSnapshot {
        let mut snapshot = StatusSnapshot::inactive(&DeploymentMode::HostManaged);

        match self
            .executor
            .run(&self.supervisor, &["is-active", self.unit.as_str()], self.supervisor_limit)
            .await
        {
            Ok(output) => {
                snapshot.reachable = true;
                snapshot.active = output.success();
            }
            Err(e) => {
                warn!("Supervisor query for {} failed: {}", self.unit, e);
                return snapshot;
            }
        }

        if snapshot.active {
            snapshot.pid = self.lookup_pid().await;
        }
        snapshot
    }

    async fn lookup_pid(&self) -> Option<u32> {
        let output = match self
            .executor
            .run(
                &self.process_lookup,
                &["-x", self.binary_name.as_str()],
                self.timeouts.process_scan,
            )
            .await
        {
            Ok(output) => output,
            Err(e) => {
                debug!("Process lookup for {} failed: {}", self.binary_name, e);
                return None;
            }
        };

        single_pid(&output.combined)
    }
}

/// Share of the status budget left for `is-active` once the process scan is
/// reserved, so both fit inside the outer probe limit.
fn supervisor_budget(timeouts: &Timeouts) -> Duration {
    timeouts
        .status
        .saturating_sub(timeouts.process_scan)
        .max(timeouts.status / 2)
}

/// Exactly one pid in `pgrep` output; zero or several yield `None`.
fn single_pid(output: &str) -> Option<u32> {
    let mut pids = output
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok());
    match (pids.next(), pids.next()) {
        (Some(pid), None) => Some(pid),
        _ => None,
    }
}

/// Liveness via the runtime's inspect endpoint.
pub struct ContainerStatusProbe {
    client: RuntimeClient,
    container: ContainerId,
}

impl ContainerStatusProbe {
    pub fn new(client: RuntimeClient, container: ContainerId) -> Self {
        Self { client, container }
    }

    async fn probe(&self) -> StatusSnapshot {
        let mode = DeploymentMode::ContainerManaged(self.container.clone());
        let mut snapshot = StatusSnapshot::inactive(&mode);

        match self.client.inspect_container(self.container.as_str()).await {
            Ok(inspect) => {
                let state = inspect.state;
                debug!(container = %self.container, status = %state.status, "Container inspected");
                snapshot.reachable = true;
                snapshot.active = state.running && !state.restarting;
                snapshot.pid = (state.running && state.pid > 0).then_some(state.pid);
            }
            Err(e) => {
                warn!("Inspect of container {} failed: {}", self.container, e);
            }
        }
        snapshot
    }
}

enum ProbeStrategy {
    Host(HostStatusProbe),
    Container(ContainerStatusProbe),
}

/// The probe for the configured deployment mode, bounded by a hard limit.
pub struct DaemonProbe {
    mode: DeploymentMode,
    strategy: ProbeStrategy,
    limit: Duration,
}

impl DaemonProbe {
    pub fn from_config(config: &ControlConfig) -> Self {
        let strategy = match &config.mode {
            DeploymentMode::HostManaged => ProbeStrategy::Host(HostStatusProbe::new(config)),
            DeploymentMode::ContainerManaged(id) => {
                ProbeStrategy::Container(ContainerStatusProbe::new(
                    RuntimeClient::new(&config.runtime_socket, config.timeouts.runtime),
                    id.clone(),
                ))
            }
        };
        Self {
            mode: config.mode.clone(),
            strategy,
            limit: config.timeouts.status,
        }
    }
}

#[async_trait]
impl StatusProbe for DaemonProbe {
    async fn probe(&self) -> StatusSnapshot {
        let inner = async {
            match &self.strategy {
                ProbeStrategy::Host(p) => p.probe().await,
                ProbeStrategy::Container(p) => p.probe().await,
            }
        };

        match tokio::time::timeout(self.limit, inner).await {
            Ok(snapshot) => snapshot,
            Err(_) => {
                warn!("Status probe exceeded {:?}; reporting inactive", self.limit);
                StatusSnapshot::inactive(&self.mode)
            }
        }
    }
}
