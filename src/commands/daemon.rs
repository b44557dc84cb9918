use dnsmasq_admin::control::{OperationResult, StatusResponse};
use dnsmasq_admin::ControlService;

use super::print_json;

pub(crate) async fn cmd_status(service: &ControlService) -> anyhow::Result<bool> {
    let snapshot = service.get_status().await;
    print_json(&StatusResponse::from(&snapshot))?;
    Ok(true)
}

pub(crate) async fn cmd_restart(service: &ControlService) -> anyhow::Result<bool> {
    let result = service.restart_daemon().await;
    print_json(&result)?;
    Ok(result.success)
}

pub(crate) async fn cmd_leases(service: &ControlService) -> anyhow::Result<bool> {
    match service.leases().await {
        Ok(leases) => {
            print_json(&leases)?;
            Ok(true)
        }
        Err(e) => {
            print_json(&OperationResult::from(e))?;
            Ok(false)
        }
    }
}
