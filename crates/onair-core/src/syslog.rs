//! Operator-facing system log
//!
//! A capped, newest-first list of entries the UI renders. Each entry is also
//! mirrored to `tracing` at the matching level.

use std::collections::VecDeque;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Critical,
    Success,
}

impl LogLevel {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Success => "SUCCESS",
        }
    }
}

/// One log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLogEntry {
    /// Monotonically increasing id
    pub id: u64,
    pub timestamp: SystemTime,
    pub level: LogLevel,
    /// Emitting component (e.g. "SWITCHER", "MACRO")
    pub module: String,
    pub message: String,
}

/// Capped, newest-first log
#[derive(Debug, Clone)]
pub struct SystemLog {
    entries: VecDeque<SystemLogEntry>,
    retention: usize,
    next_id: u64,
}

impl SystemLog {
    /// Create an empty log keeping at most `retention` entries
    pub fn new(retention: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(retention),
            retention,
            next_id: 1,
        }
    }

    /// Append an entry, evicting the oldest past retention
    pub fn push(&mut self, level: LogLevel, module: &str, message: impl Into<String>) -> SystemLogEntry {
        let entry = SystemLogEntry {
            id: self.next_id,
            timestamp: SystemTime::now(),
            level,
            module: module.to_string(),
            message: message.into(),
        };
        self.next_id += 1;

        match level {
            LogLevel::Info | LogLevel::Success => info!(module = module, "{}", entry.message),
            LogLevel::Warning => warn!(module = module, "{}", entry.message),
            LogLevel::Critical => error!(module = module, "{}", entry.message),
        }

        self.entries.push_front(entry.clone());
        self.entries.truncate(self.retention);
        entry
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &SystemLogEntry> {
        self.entries.iter()
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<&SystemLogEntry> {
        self.entries.front()
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut log = SystemLog::new(10);
        log.push(LogLevel::Info, "TEST", "first");
        log.push(LogLevel::Warning, "TEST", "second");

        let messages: Vec<_> = log.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first"]);
        assert_eq!(log.latest().unwrap().level, LogLevel::Warning);
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let mut log = SystemLog::new(100);
        for i in 0..150 {
            log.push(LogLevel::Info, "TEST", format!("entry {}", i));
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.latest().unwrap().message, "entry 149");
        assert_eq!(log.entries().last().unwrap().message, "entry 50");
    }

    #[test]
    fn test_ids_increase() {
        let mut log = SystemLog::new(5);
        let a = log.push(LogLevel::Info, "TEST", "a");
        let b = log.push(LogLevel::Success, "TEST", "b");
        assert!(b.id > a.id);
    }
}
