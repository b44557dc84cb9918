use super::activity::{ActivityEntry, ActivityLog};
use super::backend::{RestartBackend, Restarter};
use super::leases::{Lease, LeaseReader};
use super::probe::{DaemonProbe, StatusProbe};
use super::protocol::{OperationResult, StatusSnapshot, ValidationResult};
use super::store::ConfigStore;
use super::validator::{DaemonSyntaxValidator, SyntaxValidator};
use crate::error::{ErrorKind, Result};
use crate::settings::ControlConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The operations the transports expose.
///
/// Mutating operations never fail with an error; they always return an
/// [`OperationResult`] carrying a diagnostic and classification. Nothing
/// here retries.
pub struct ControlService {
    config: Arc<ControlConfig>,
    store: ConfigStore,
    validator: Arc<dyn SyntaxValidator>,
    restarter: Arc<dyn Restarter>,
    probe: Arc<dyn StatusProbe>,
    leases: LeaseReader,
    activity: ActivityLog,
}

impl ControlService {
    pub fn from_config(config: Arc<ControlConfig>) -> Self {
        let mut validator = DaemonSyntaxValidator::new(&config.binary, config.timeouts.check);
        if let Some(dir) = &config.scratch_dir {
            validator = validator.with_scratch_dir(dir);
        }

        let restarter = RestartBackend::from_config(&config);
        let probe = DaemonProbe::from_config(&config);

        info!(
            mode = %config.mode,
            restart = %restarter.target(),
            config_path = %config.config_path.display(),
            "Control service configured"
        );

        Self::with_parts(config, Arc::new(validator), Arc::new(restarter), Arc::new(probe))
    }

    /// Assemble from explicit collaborators.
    pub fn with_parts(
        config: Arc<ControlConfig>,
        validator: Arc<dyn SyntaxValidator>,
        restarter: Arc<dyn Restarter>,
        probe: Arc<dyn StatusProbe>,
    ) -> Self {
        Self {
            store: ConfigStore::new(&config.config_path),
            leases: LeaseReader::new(&config.lease_file),
            config,
            validator,
            restarter,
            probe,
            activity: ActivityLog::default(),
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub async fn get_status(&self) -> StatusSnapshot {
        self.probe.probe().await
    }

    pub async fn get_config(&self) -> Result<Vec<u8>> {
        self.store.read().await
    }

    /// Dry run only; the canonical file is never touched.
    pub async fn check_config(&self, candidate: &[u8]) -> ValidationResult {
        let result = self.validator.validate(candidate).await;
        debug!(valid = result.valid, "Candidate configuration checked");
        result
    }

    /// Validate, then atomically replace the canonical configuration.
    pub async fn apply_config(&self, blob: Vec<u8>) -> OperationResult {
        let result = self.apply(blob).await;
        self.record("apply", &result);
        result
    }

    pub async fn restart_daemon(&self) -> OperationResult {
        let result = self.restart().await;
        self.record("restart", &result);
        result
    }

    /// Apply, and restart only if the apply succeeded.
    pub async fn apply_and_restart(&self, blob: Vec<u8>) -> OperationResult {
        let applied = self.apply(blob).await;
        let result = if applied.success {
            self.restart().await
        } else {
            applied
        };
        self.record("apply-and-restart", &result);
        result
    }

    pub async fn leases(&self) -> Result<Vec<Lease>> {
        self.leases.read().await
    }

    pub fn activity(&self, limit: usize) -> Vec<ActivityEntry> {
        self.activity.recent(limit)
    }

    async fn apply(&self, blob: Vec<u8>) -> OperationResult {
        let check = self.validator.validate(&blob).await;
        if !check.valid {
            warn!("Refusing to apply configuration that failed the syntax check");
            return OperationResult::failed(ErrorKind::Validation, check.diagnostic);
        }

        match self.store.write(blob).await {
            Ok(()) => OperationResult::ok("Configuration saved"),
            Err(e) => {
                warn!("Failed to write configuration: {}", e);
                e.into()
            }
        }
    }

    async fn restart(&self) -> OperationResult {
        match self.restarter.restart().await {
            Ok(log) => OperationResult::ok(format!("Restarted {}", self.restarter.target()))
                .with_log(log),
            Err(e) => e.into(),
        }
    }

    fn record(&self, operation: &str, result: &OperationResult) {
        if result.success {
            info!("{} succeeded", operation);
        }
        self.activity.record(operation, result.success, result.detail());
    }
}
