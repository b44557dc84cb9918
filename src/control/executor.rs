use crate::error::{ControlError, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Captured result of one bounded subprocess run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// stdout followed by stderr, lossily decoded
    pub combined: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs external tools with a hard time limit, optionally behind a
/// privilege-elevation prefix such as `sudo -n`.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    elevate: Vec<String>,
}

impl CommandExecutor {
    pub fn new(elevate: Vec<String>) -> Self {
        Self { elevate }
    }

    /// Runs with the service's own privileges.
    pub async fn run(&self, cmd: &str, args: &[&str], limit: Duration) -> Result<CommandOutput> {
        debug!("Running command: {} {:?}", cmd, args);
        let mut command = Command::new(cmd);
        command.args(args);
        execute(command, &display(cmd, args), limit).await
    }

    /// Runs behind the elevation prefix. Without a prefix this is [`run`](Self::run).
    pub async fn sudo_run(&self, cmd: &str, args: &[&str], limit: Duration) -> Result<CommandOutput> {
        let Some((program, prefix_args)) = self.elevate.split_first() else {
            return self.run(cmd, args, limit).await;
        };

        info!("Running privileged command: {} {} {:?}", self.elevate.join(" "), cmd, args);
        let mut command = Command::new(program);
        command.args(prefix_args).arg(cmd).args(args);
        execute(command, &display(cmd, args), limit).await
    }
}

fn display(cmd: &str, args: &[&str]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

async fn execute(mut command: Command, label: &str, limit: Duration) -> Result<CommandOutput> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => {
            ControlError::Permission(format!("cannot execute {}: {}", label, e))
        }
        _ => ControlError::Execution(format!("failed to start {}: {}", label, e)),
    })?;

    // Dropping the future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(result) => {
            result.map_err(|e| ControlError::Execution(format!("{} failed: {}", label, e)))?
        }
        Err(_) => return Err(ControlError::timeout(label, limit)),
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    debug!(
        "Command '{}' finished with exit code: {:?}",
        label,
        output.status.code()
    );

    Ok(CommandOutput {
        status: output.status,
        combined,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Instant;

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let executor = CommandExecutor::default();
        let output = executor
            .run("sh", &["-c", "echo out; echo err >&2; exit 3"], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
        assert!(output.combined.contains("out"));
        assert!(output.combined.contains("err"));
    }

    #[tokio::test]
    async fn missing_binary_is_execution_error() {
        let executor = CommandExecutor::default();
        let err = executor
            .run("/nonexistent/dnsmasq-admin-tool", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution);
    }

    #[tokio::test]
    async fn hung_command_times_out() {
        let executor = CommandExecutor::default();
        let started = Instant::now();
        let err = executor
            .run("sleep", &["10"], Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn sudo_run_prepends_prefix() {
        let executor = CommandExecutor::new(vec!["env".into(), "ELEVATED=1".into()]);
        let output = executor
            .sudo_run("sh", &["-c", "echo $ELEVATED"], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.combined.trim(), "1");
    }
}
