use crate::error::{ControlError, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, trace};

/// One active DHCP lease from dnsmasq's lease database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lease {
    /// Unix time the lease expires; `None` for infinite leases
    pub expires_at: Option<u64>,
    pub mac: String,
    pub ip: String,
    pub hostname: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LeaseReader {
    path: PathBuf,
}

impl LeaseReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing lease file means no leases have been handed out yet.
    pub async fn read(&self) -> Result<Vec<Lease>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No lease file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(ControlError::io(self.path.display(), e)),
        };
        Ok(parse_leases(&content))
    }
}

/// Parses `<expiry> <mac> <ip> <hostname|*> <client-id|*>` lines.
///
/// dnsmasq writes its DHCPv6 leases after a `duid` marker line; parsing
/// stops there. Lines that do not have the expected shape are skipped.
pub fn parse_leases(content: &str) -> Vec<Lease> {
    content
        .lines()
        .take_while(|line| !line.starts_with("duid"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                trace!("Skipping lease line: {}", line);
                return None;
            }
            let expiry = fields[0].parse::<u64>().ok()?;
            Some(Lease {
                expires_at: (expiry != 0).then_some(expiry),
                mac: fields[1].to_string(),
                ip: fields[2].to_string(),
                hostname: optional_field(fields[3]),
                client_id: fields.get(4).and_then(|f| optional_field(f)),
            })
        })
        .collect()
}

fn optional_field(value: &str) -> Option<String> {
    (value != "*").then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASES: &str = "\
1718031600 00:1a:2b:3c:4d:5e 192.168.1.10 MacBook-Pro 01:00:1a:2b:3c:4d:5e
0 aa:bb:cc:dd:ee:ff 192.168.1.15 * *
duid 00:01:00:01:2c:5f:1e:0a:52:54:00:12:34:56
garbage
";

    #[test]
    fn parses_lease_lines() {
        let leases = parse_leases(LEASES);
        assert_eq!(leases.len(), 2);

        assert_eq!(leases[0].expires_at, Some(1718031600));
        assert_eq!(leases[0].hostname.as_deref(), Some("MacBook-Pro"));
        assert_eq!(leases[0].client_id.as_deref(), Some("01:00:1a:2b:3c:4d:5e"));

        assert_eq!(leases[1].expires_at, None);
        assert_eq!(leases[1].ip, "192.168.1.15");
        assert!(leases[1].hostname.is_none());
        assert!(leases[1].client_id.is_none());
    }

    #[test]
    fn ignores_v6_leases_after_duid() {
        let content = "\
1718031600 00:1a:2b:3c:4d:5e 192.168.1.10 laptop *
duid 00:01:00:01:2c:5f:1e:0a:52:54:00:12:34:56
1718031600 305419896 fd00::10 host6 00:01:00:01:2c:5f:1e:0a:aa:bb:cc:dd:ee:ff
";
        let leases = parse_leases(content);
        assert_eq!(leases.len(), 1);
        assert_eq!(leases[0].ip, "192.168.1.10");
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reader = LeaseReader::new(dir.path().join("dnsmasq.leases"));
        assert!(reader.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dnsmasq.leases");
        std::fs::write(&path, LEASES).unwrap();
        let leases = LeaseReader::new(&path).read().await.unwrap();
        assert_eq!(leases.len(), 2);
    }
}
