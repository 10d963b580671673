//! Offline diagnostic log for QA simulation runs.
//!
//! A bounded ring buffer persisted wholesale to a JSON file on every append,
//! reloaded on open. Owned by whoever opens it; there is no global instance
//! and no background flushing. This is test tooling, not part of the request
//! path.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

pub struct TestLog {
    path: PathBuf,
    capacity: usize,
    entries: VecDeque<LogEntry>,
}

impl TestLog {
    /// Opens the log at `path`, loading any previously persisted entries.
    /// Entries beyond capacity are discarded oldest-first.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_capacity(path, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let path = path.into();
        let mut entries = VecDeque::new();

        if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read log file {}", path.display()))?;
            if !raw.trim().is_empty() {
                let loaded: Vec<LogEntry> = serde_json::from_str(&raw)
                    .with_context(|| format!("malformed log file {}", path.display()))?;
                entries.extend(loaded);
            }
        }

        while entries.len() > capacity {
            entries.pop_front();
        }

        Ok(Self {
            path,
            capacity,
            entries,
        })
    }

    /// Appends an entry, evicting the oldest when full, and flushes the
    /// whole buffer to disk before returning.
    pub fn append(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<serde_json::Value>,
    ) -> Result<()> {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            context,
        });
        self.flush()
    }

    pub fn info(&mut self, message: impl Into<String>) -> Result<()> {
        self.append(LogLevel::Info, message, None)
    }

    pub fn success(&mut self, message: impl Into<String>) -> Result<()> {
        self.append(LogLevel::Success, message, None)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> Result<()> {
        self.append(LogLevel::Warning, message, None)
    }

    pub fn error(&mut self, message: impl Into<String>) -> Result<()> {
        self.append(LogLevel::Error, message, None)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        let entries: Vec<&LogEntry> = self.entries.iter().collect();
        let raw = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write log file {}", self.path.display()))
    }

    /// Final flush; dropping without closing simply loses nothing because
    /// every append already flushed.
    pub fn close(self) -> Result<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_persists_and_reload_restores() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qa_test.log.json");

        let mut log = TestLog::open(&path).unwrap();
        log.info("login attempt").unwrap();
        log.append(
            LogLevel::Success,
            "login succeeded",
            Some(serde_json::json!({"role": "agent"})),
        )
        .unwrap();
        log.close().unwrap();

        let reloaded = TestLog::open(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        let messages: Vec<_> = reloaded.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["login attempt", "login succeeded"]);
    }

    #[test]
    fn ring_buffer_evicts_oldest_at_capacity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ring.log.json");

        let mut log = TestLog::with_capacity(&path, 3).unwrap();
        for i in 0..5 {
            log.info(format!("entry {i}")).unwrap();
        }

        assert_eq!(log.len(), 3);
        let messages: Vec<_> = log.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["entry 2", "entry 3", "entry 4"]);
    }

    #[test]
    fn reload_truncates_to_capacity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trunc.log.json");

        {
            let mut log = TestLog::with_capacity(&path, 10).unwrap();
            for i in 0..6 {
                log.info(format!("entry {i}")).unwrap();
            }
        }

        let reloaded = TestLog::with_capacity(&path, 4).unwrap();
        assert_eq!(reloaded.len(), 4);
        assert_eq!(reloaded.entries().next().unwrap().message, "entry 2");
    }

    #[test]
    fn clear_empties_file_and_buffer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clear.log.json");

        let mut log = TestLog::open(&path).unwrap();
        log.warning("something odd").unwrap();
        log.clear().unwrap();
        assert!(log.is_empty());

        let reloaded = TestLog::open(&path).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn open_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.log.json");
        fs::write(&path, "not json at all").unwrap();
        assert!(TestLog::open(&path).is_err());
    }
}
