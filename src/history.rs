//! Bounded result history persisted as a JSON array.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::LogEntry;

pub struct ResultLog {
    path: PathBuf,
    max_sets: i64,
}

impl ResultLog {
    /// `max_sets` below 1 keeps every entry.
    pub fn new(path: impl Into<PathBuf>, max_sets: i64) -> Self {
        Self { path: path.into(), max_sets }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored history. A missing or unreadable store is empty.
    pub fn load(&self) -> Vec<LogEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(error = %e, path = %self.path.display(), "no readable history, starting empty");
                return Vec::new();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            debug!(error = %e, path = %self.path.display(), "discarding unparseable history");
            Vec::new()
        })
    }

    /// Append one tick's entry, evict the oldest entries past the limit and
    /// rewrite the store.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut entries = self.load();
        entries.push(entry.clone());
        evict_oldest(&mut entries, self.max_sets);
        self.write(&entries)
    }

    fn write(&self, entries: &[LogEntry]) -> Result<()> {
        let json = serde_json::to_string(entries).context("Failed to serialize result history")?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

fn evict_oldest(entries: &mut Vec<LogEntry>, max_sets: i64) {
    if max_sets < 1 {
        return;
    }
    let max = usize::try_from(max_sets).unwrap_or(usize::MAX);
    if entries.len() > max {
        let excess = entries.len() - max;
        entries.drain(..excess);
    }
}
