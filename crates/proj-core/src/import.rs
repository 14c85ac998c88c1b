use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::registry::{Registry, RegistryError};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Conf file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read conf file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Fields of the legacy one-project-per-file conf format: plain
/// `key=value` lines with repeated `note=` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfData {
    pub name: Option<String>,
    pub color: Option<String>,
    pub task: Option<String>,
    pub notes: Vec<String>,
}

pub fn parse_conf(text: &str) -> ConfData {
    let mut data = ConfData::default();
    for line in text.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("name=") {
            data.name = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("color=") {
            data.color = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("task=") {
            data.task = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("note=") {
            data.notes.push(value.to_string());
        }
    }
    data
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub slug: String,
    pub name: String,
    pub notes: usize,
}

pub fn import_conf(
    registry: &mut Registry,
    slug: &str,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<ImportResult, ImportError> {
    if !path.is_file() {
        return Err(ImportError::NotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let data = parse_conf(&text);

    let name = data.name.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let color = data
        .color
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    registry.create_project(slug, name, color, now)?;
    if let Some(task) = data.task.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        registry.set_task(slug, task, now)?;
    }
    for note in &data.notes {
        registry.add_note(slug, note, now)?;
    }

    let project = registry.get(slug)?;
    Ok(ImportResult {
        slug: project.slug.clone(),
        name: project.name.clone(),
        notes: data.notes.len(),
    })
}
