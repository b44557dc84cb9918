use crate::error::{ControlError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Owner of the canonical dnsmasq configuration file.
///
/// Every call goes to disk; edits made outside this service are always
/// visible on the next read.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        debug!(path = %self.path.display(), "Reading configuration");
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| ControlError::io(self.path.display(), e))
    }

    /// Replaces the whole file via write-to-temp and rename.
    ///
    /// Readers see either the old or the new content, never a mix. On any
    /// failure the previous file is left untouched. If the path is a symlink
    /// the link is kept and its target is replaced.
    pub async fn write(&self, blob: Vec<u8>) -> Result<()> {
        let path = self.path.clone();
        let len = blob.len();
        tokio::task::spawn_blocking(move || write_atomic(&path, &blob))
            .await
            .map_err(|e| ControlError::Io(format!("configuration writer panicked: {}", e)))??;

        info!(path = %self.path.display(), bytes = len, "Configuration replaced");
        Ok(())
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    // Rename onto the resolved target so a symlinked config stays a symlink.
    let resolved = std::fs::canonicalize(path).ok();
    let path = resolved.as_deref().unwrap_or(path);

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".dnsmasq-admin-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| ControlError::io(format!("create temp file in {}", parent.display()), e))?;

    // Keep whatever mode the operator gave the live file.
    let permissions = match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => new_file_permissions(),
    };
    if let Some(perms) = permissions {
        tmp.as_file()
            .set_permissions(perms)
            .map_err(|e| ControlError::io("set permissions on temp file", e))?;
    }

    tmp.write_all(content)
        .map_err(|e| ControlError::io("write temp file", e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ControlError::io("sync temp file", e))?;

    // A failed persist drops the temp file, which removes it.
    tmp.persist(path)
        .map_err(|e| ControlError::io(format!("replace {}", path.display()), e.error))?;

    Ok(())
}

#[cfg(unix)]
fn new_file_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<std::fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Arc;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("dnsmasq.conf"));

        let blob = b"domain-needed\nbogus-priv\nserver=1.1.1.1\n".to_vec();
        store.write(blob.clone()).await.unwrap();
        assert_eq!(store.read().await.unwrap(), blob);
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("absent.conf"));
        let err = store.read().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("missing-dir").join("dnsmasq.conf"));
        let err = store.write(b"port=53\n".to_vec()).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound | ErrorKind::Io));
        assert!(!store.path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_write_keeps_previous_content() {
        use std::os::unix::fs::PermissionsExt;

        if crate::clienv::running_as_root() {
            // root ignores directory write bits
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dnsmasq.conf");
        std::fs::write(&path, b"port=53\n").unwrap();
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o555)).unwrap();

        let store = ConfigStore::new(&path);
        let result = store.write(b"port=5353\n".to_vec()).await;

        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(result.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"port=53\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_preserves_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dnsmasq.conf");
        std::fs::write(&path, b"port=53\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        ConfigStore::new(&path).write(b"port=54\n".to_vec()).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_through_symlink_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("dnsmasq.real.conf");
        let link = dir.path().join("dnsmasq.conf");
        std::fs::write(&real, "port=53\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let store = ConfigStore::new(&link);
        store.write(b"port=5353\n".to_vec()).await.unwrap();

        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(&real).unwrap(), b"port=5353\n");
        assert_eq!(store.read().await.unwrap(), b"port=5353\n");
    }

    #[tokio::test]
    async fn write_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("dnsmasq.conf"));
        store.write(b"a\n".to_vec()).await.unwrap();
        store.write(b"b\n".to_vec()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_readers_never_see_torn_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConfigStore::new(dir.path().join("dnsmasq.conf")));

        let old = vec![b'a'; 256 * 1024];
        let new = vec![b'b'; 256 * 1024];
        store.write(old.clone()).await.unwrap();

        let mut readers = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let (old, new) = (old.clone(), new.clone());
            readers.push(tokio::spawn(async move {
                for _ in 0..20 {
                    let seen = store.read().await.unwrap();
                    assert!(seen == old || seen == new, "observed a partial write");
                }
            }));
        }

        store.write(new.clone()).await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.read().await.unwrap(), new);
    }
}
