use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::registry::{InvariantViolation, Project, Registry};

/// Schema version written into every snapshot. `load` refuses anything
/// newer rather than guessing at an unknown layout.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("State IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse state file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("State file is corrupt: {0}")]
    Corrupt(#[from] InvariantViolation),
    #[error("State file version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Debug, Deserialize)]
struct StateFile {
    version: u32,
    #[allow(dead_code)]
    updated: DateTime<Utc>,
    projects: Vec<Project>,
}

#[derive(Serialize)]
struct StateSnapshot<'a> {
    version: u32,
    updated: DateTime<Utc>,
    projects: &'a [Project],
}

/// Reconstructs the registry from the state file. A missing file yields an
/// empty registry; a file that parses but violates the registry invariants
/// is corrupt and refused.
pub fn load(path: &Path) -> Result<Registry, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("no state file at {}, starting empty", path.display());
            return Ok(Registry::new());
        }
        Err(err) => return Err(err.into()),
    };
    let state: StateFile = serde_json::from_str(&text)?;
    if state.version > STATE_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: state.version,
            supported: STATE_VERSION,
        });
    }
    let registry = Registry::from_projects(state.projects);
    registry.validate()?;
    debug!("loaded {} projects from {}", registry.len(), path.display());
    Ok(registry)
}

/// Writes the full snapshot to a temporary sibling path and renames it over
/// the target, so a crash or a concurrent reader never observes a
/// half-written file.
pub fn save(path: &Path, registry: &Registry, now: DateTime<Utc>) -> Result<(), StoreError> {
    registry.validate()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let snapshot = StateSnapshot {
        version: STATE_VERSION,
        updated: now,
        projects: registry.projects(),
    };
    let mut body = serde_json::to_string_pretty(&snapshot)?;
    body.push('\n');
    let tmp = tmp_path(path);
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    debug!("saved {} projects to {}", registry.len(), path.display());
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

pub fn lock_path(path: &Path) -> PathBuf {
    path.with_extension("lock")
}

/// Advisory exclusive lock held around a load/mutate/save pair. Released on
/// drop; readers do not take it.
pub struct StateLock {
    file: File,
}

pub fn lock(path: &Path) -> Result<StateLock, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(lock_path(path))?;
    file.lock_exclusive()?;
    Ok(StateLock { file })
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
