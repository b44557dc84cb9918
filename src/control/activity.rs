use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_MAX_ENTRIES: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub at_unix_secs: u64,
    pub operation: String,
    pub success: bool,
    pub detail: String,
}

/// Ring buffer of recent mutating operations. Lives only in memory.
pub struct ActivityLog {
    max_entries: usize,
    entries: RwLock<VecDeque<ActivityEntry>>,
}

impl ActivityLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: RwLock::new(VecDeque::with_capacity(max_entries)),
        }
    }

    /// Append an entry, evicting the oldest if over capacity.
    pub fn record(&self, operation: &str, success: bool, detail: impl Into<String>) {
        let entry = ActivityEntry {
            at_unix_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            operation: operation.to_string(),
            success,
            detail: detail.into(),
        };

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(entry);
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    /// The last `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<ActivityEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().rev().take(n).cloned().collect()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_returns_newest_first() {
        let log = ActivityLog::new(100);
        for i in 0..5 {
            log.record("restart", true, format!("attempt {i}"));
        }
        let recent: Vec<_> = log.recent(2).into_iter().map(|e| e.detail).collect();
        assert_eq!(recent, vec!["attempt 4", "attempt 3"]);
    }

    #[test]
    fn evicts_oldest() {
        let log = ActivityLog::new(3);
        for i in 0..10 {
            log.record("apply", i % 2 == 0, format!("{i}"));
        }
        let details: Vec<_> = log.recent(100).into_iter().map(|e| e.detail).collect();
        assert_eq!(details, vec!["9", "8", "7"]);
    }

    #[test]
    fn empty_log() {
        assert!(ActivityLog::default().recent(10).is_empty());
    }
}
