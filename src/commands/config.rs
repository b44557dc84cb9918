use dnsmasq_admin::control::OperationResult;
use dnsmasq_admin::ControlService;
use std::io::Write;
use std::path::Path;
use tokio::io::AsyncReadExt;

use super::print_json;

pub(crate) async fn cmd_show(service: &ControlService) -> anyhow::Result<bool> {
    match service.get_config().await {
        Ok(blob) => {
            std::io::stdout().write_all(&blob)?;
            Ok(true)
        }
        Err(e) => {
            print_json(&OperationResult::from(e))?;
            Ok(false)
        }
    }
}

pub(crate) async fn cmd_check(service: &ControlService, file: &Path) -> anyhow::Result<bool> {
    let candidate = read_candidate(file).await?;
    let result = service.check_config(&candidate).await;
    print_json(&result)?;
    Ok(result.valid)
}

pub(crate) async fn cmd_apply(
    service: &ControlService,
    file: &Path,
    restart: bool,
) -> anyhow::Result<bool> {
    let candidate = read_candidate(file).await?;
    let result = if restart {
        service.apply_and_restart(candidate).await
    } else {
        service.apply_config(candidate).await
    };
    print_json(&result)?;
    Ok(result.success)
}

/// Reads the candidate from `file`, or stdin when it is `-`.
async fn read_candidate(file: &Path) -> anyhow::Result<Vec<u8>> {
    if file == Path::new("-") {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        return Ok(buf);
    }
    tokio::fs::read(file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_candidate_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidate.conf");
        std::fs::write(&path, "port=5353\n").unwrap();
        assert_eq!(read_candidate(&path).await.unwrap(), b"port=5353\n");
    }

    #[tokio::test]
    async fn missing_candidate_names_the_file() {
        let err = read_candidate(Path::new("/nonexistent/candidate.conf"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/candidate.conf"));
    }
}
