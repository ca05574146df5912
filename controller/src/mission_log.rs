//! Mission event log
//!
//! Append-only record of link milestones, one JSON object per line. Entries
//! are written synchronously so a crash never loses an event that was
//! reported as recorded.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Kind of mission event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionEventKind {
    SystemInit,
    CommandSent,
    HandshakeSucceeded,
    HandshakeFailed,
    LinkStale,
    LinkResumed,
    StatusAlert,
    StatusNormal,
}

/// One line of the mission log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionEvent {
    /// Unix time in milliseconds
    pub timestamp_ms: u64,
    pub event: MissionEventKind,
    pub details: String,
}

/// Line-oriented mission event log
pub struct MissionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl MissionLog {
    /// Open or create the log, appending to existing entries
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event stamped with the current time
    pub fn record(&self, event: MissionEventKind, details: impl Into<String>) -> io::Result<()> {
        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        self.append(&MissionEvent {
            timestamp_ms,
            event,
            details: details.into(),
        })
    }

    /// Append a prepared entry
    pub fn append(&self, entry: &MissionEvent) -> io::Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock();
        file.write_all(&line)?;
        file.flush()
    }

    /// Read every entry back, oldest first
    pub fn read_all(&self) -> io::Result<Vec<MissionEvent>> {
        let reader = BufReader::new(File::open(&self.path)?);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}
