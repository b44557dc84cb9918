//! Fakes shared by the control layer's unit tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// Writes an executable shell script and returns its path.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A container runtime socket answering every request with one canned reply.
pub(crate) struct FakeRuntime {
    dir: tempfile::TempDir,
    requests: Arc<Mutex<Vec<String>>>,
    task: tokio::task::JoinHandle<()>,
}

impl FakeRuntime {
    pub(crate) fn start(response: &str) -> Self {
        Self::spawn(Some(response.to_string()))
    }

    /// Accepts connections but never answers.
    pub(crate) fn silent() -> Self {
        Self::spawn(None)
    }

    fn spawn(response: Option<String>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let listener = tokio::net::UnixListener::bind(dir.path().join("docker.sock")).unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = stream.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                seen.lock()
                    .await
                    .push(String::from_utf8_lossy(&buf).into_owned());

                match &response {
                    Some(reply) => {
                        let _ = stream.write_all(reply.as_bytes()).await;
                        let _ = stream.shutdown().await;
                    }
                    None => held.push(stream),
                }
            }
        });

        Self {
            dir,
            requests,
            task,
        }
    }

    pub(crate) fn socket_path(&self) -> PathBuf {
        self.dir.path().join("docker.sock")
    }

    pub(crate) async fn last_request(&self) -> String {
        // The reply is written after the request is recorded; give the
        // accept loop a moment in case the client returned first.
        for _ in 0..50 {
            if let Some(last) = self.requests.lock().await.last() {
                return last.clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        String::new()
    }
}

impl Drop for FakeRuntime {
    fn drop(&mut self) {
        self.task.abort();
    }
}
