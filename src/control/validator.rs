use super::executor::CommandExecutor;
use super::protocol::ValidationResult;
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait SyntaxValidator: Send + Sync {
    /// Dry-runs `candidate` without touching the live configuration.
    async fn validate(&self, candidate: &[u8]) -> ValidationResult;
}

/// Validates through the daemon's own `--test` mode.
///
/// Each call gets its own scratch file, so validations may run
/// concurrently. The scratch file is removed when its guard drops, on every
/// path out of [`validate`](SyntaxValidator::validate).
pub struct DaemonSyntaxValidator {
    binary: String,
    scratch_dir: Option<PathBuf>,
    timeout: Duration,
    executor: CommandExecutor,
}

impl DaemonSyntaxValidator {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            scratch_dir: None,
            timeout,
            executor: CommandExecutor::default(),
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    fn scratch_file(&self, candidate: &[u8]) -> std::io::Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("dnsmasq-check-").suffix(".conf");
        let mut file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(candidate)?;
        file.flush()?;
        Ok(file)
    }
}

#[async_trait]
impl SyntaxValidator for DaemonSyntaxValidator {
    async fn validate(&self, candidate: &[u8]) -> ValidationResult {
        let scratch = match self.scratch_file(candidate) {
            Ok(file) => file,
            Err(e) => {
                warn!("Could not stage candidate configuration: {}", e);
                return ValidationResult::invalid(format!(
                    "failed to write candidate configuration to scratch file: {}",
                    e
                ));
            }
        };

        let conf_arg = format!("--conf-file={}", scratch.path().display());
        debug!(scratch = %scratch.path().display(), "Checking candidate configuration");

        let result = self
            .executor
            .run(&self.binary, &["--test", conf_arg.as_str()], self.timeout)
            .await;

        // removes the scratch file
        drop(scratch);

        match result {
            Ok(output) if output.success() => ValidationResult::valid(output.combined),
            Ok(output) => {
                let mut diagnostic = output.combined;
                if diagnostic.trim().is_empty() {
                    diagnostic = format!(
                        "{} --test exited with status {}",
                        self.binary, output.status
                    );
                }
                ValidationResult::invalid(diagnostic)
            }
            Err(e) => {
                warn!("Syntax check could not run: {}", e);
                ValidationResult::invalid(e.to_string())
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::control::test_support::write_script;

    /// Accepts any file without the word "bogus", like a tiny dnsmasq --test.
    const FAKE_CHECKER: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --conf-file=*) conf="${arg#--conf-file=}" ;;
  esac
done
if grep -q bogus "$conf"; then
  echo "dnsmasq: bad option at line 1 of $conf" >&2
  exit 1
fi
echo "dnsmasq: syntax check OK."
"#;

    fn validator(dir: &tempfile::TempDir) -> DaemonSyntaxValidator {
        let checker = write_script(dir.path(), "dnsmasq", FAKE_CHECKER);
        let scratch = dir.path().join("scratch");
        std::fs::create_dir(&scratch).unwrap();
        DaemonSyntaxValidator::new(checker.display().to_string(), Duration::from_secs(5))
            .with_scratch_dir(scratch)
    }

    fn scratch_entries(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path().join("scratch")).unwrap().count()
    }

    #[tokio::test]
    async fn accepts_valid_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let result = validator(&dir).validate(b"port=53\n").await;
        assert!(result.valid);
        assert!(result.diagnostic.contains("syntax check OK"));
        assert_eq!(scratch_entries(&dir), 0);
    }

    #[tokio::test]
    async fn rejects_invalid_candidate_with_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let result = validator(&dir).validate(b"bogus-directive=1\n").await;
        assert!(!result.valid);
        assert!(result.diagnostic.contains("bad option"));
        assert_eq!(scratch_entries(&dir), 0);
    }

    #[tokio::test]
    async fn missing_checker_is_invalid_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        std::fs::create_dir(&scratch).unwrap();
        let validator =
            DaemonSyntaxValidator::new("/nonexistent/dnsmasq", Duration::from_secs(1))
                .with_scratch_dir(&scratch);

        let result = validator.validate(b"port=53\n").await;
        assert!(!result.valid);
        assert!(!result.diagnostic.is_empty());
        assert_eq!(scratch_entries(&dir), 0);
    }

    #[tokio::test]
    async fn unwritable_scratch_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let validator = DaemonSyntaxValidator::new("dnsmasq", Duration::from_secs(1))
            .with_scratch_dir(dir.path().join("does-not-exist"));

        let result = validator.validate(b"port=53\n").await;
        assert!(!result.valid);
        assert!(result.diagnostic.contains("scratch file"));
    }

    #[tokio::test]
    async fn hung_checker_times_out_as_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let checker = write_script(dir.path(), "dnsmasq", "#!/bin/sh\nsleep 10\n");
        let scratch = dir.path().join("scratch");
        std::fs::create_dir(&scratch).unwrap();
        let validator = DaemonSyntaxValidator::new(
            checker.display().to_string(),
            Duration::from_millis(200),
        )
        .with_scratch_dir(&scratch);

        let result = validator.validate(b"port=53\n").await;
        assert!(!result.valid);
        assert!(result.diagnostic.contains("timed out"));
        assert_eq!(scratch_entries(&dir), 0);
    }

    #[tokio::test]
    async fn repeated_checks_agree() {
        let dir = tempfile::tempdir().unwrap();
        let validator = validator(&dir);
        for _ in 0..3 {
            assert!(!validator.validate(b"bogus\n").await.valid);
            assert!(validator.validate(b"cache-size=150\n").await.valid);
        }
    }

    #[tokio::test]
    async fn concurrent_checks_do_not_clobber_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let validator = std::sync::Arc::new(validator(&dir));

        let mut tasks = Vec::new();
        for i in 0..8 {
            let validator = std::sync::Arc::clone(&validator);
            tasks.push(tokio::spawn(async move {
                let bad = i % 2 == 0;
                let candidate = if bad { "bogus=1\n" } else { "port=53\n" };
                (bad, validator.validate(candidate.as_bytes()).await.valid)
            }));
        }
        for task in tasks {
            let (bad, valid) = task.await.unwrap();
            assert_eq!(valid, !bad);
        }
    }
}
