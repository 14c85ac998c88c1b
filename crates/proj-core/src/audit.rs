use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to write audit log: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize audit event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One mutating command, journaled as a JSONL line next to the state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub action: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub details: Value,
}

pub fn audit_log_path(state_path: &Path) -> PathBuf {
    match state_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join("audit.jsonl"),
        _ => PathBuf::from("audit.jsonl"),
    }
}

pub fn append_audit_event(state_path: &Path, event: &AuditEvent) -> Result<(), AuditError> {
    let path = audit_log_path(state_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(event)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// Last `limit` events, oldest first. Malformed lines (a torn append from a
/// killed process) are skipped.
pub fn read_recent_audit_events(state_path: &Path, limit: usize) -> Vec<AuditEvent> {
    let path = audit_log_path(state_path);
    let Ok(text) = fs::read_to_string(&path) else {
        return Vec::new();
    };
    let mut events: Vec<AuditEvent> = text
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return None;
            }
            serde_json::from_str(trimmed).ok()
        })
        .collect();
    if events.len() > limit {
        events.drain(..events.len() - limit);
    }
    events
}
