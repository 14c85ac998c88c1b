use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::registry::{AiSessionRecord, Registry, RegistryError};

#[derive(Debug, Error)]
pub enum AiSessionError {
    #[error("An AI session is already active on project {slug}")]
    AlreadyActive { slug: String },
    #[error("No AI session is active on project {slug}")]
    NoActiveSession { slug: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Serialize)]
pub struct AiReceipt {
    pub slug: String,
    pub label: Option<String>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosedAiSession {
    pub slug: String,
    pub label: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub seconds: i64,
}

/// AI sessions are gated per project: each project has at most one open
/// session, and sessions on different projects are independent of each
/// other and of the global timer.
pub fn start_session(
    registry: &mut Registry,
    slug: &str,
    label: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AiReceipt, AiSessionError> {
    let project = registry.get_mut(slug)?;
    if project.open_ai_session().is_some() {
        return Err(AiSessionError::AlreadyActive {
            slug: project.slug.clone(),
        });
    }
    let label = label
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    project.ai_sessions.push(AiSessionRecord {
        start: now,
        end: None,
        label: label.clone(),
    });
    let receipt = AiReceipt {
        slug: project.slug.clone(),
        label,
        started_at: now,
    };
    project.touch(now);
    Ok(receipt)
}

pub fn stop_session(
    registry: &mut Registry,
    slug: &str,
    now: DateTime<Utc>,
) -> Result<ClosedAiSession, AiSessionError> {
    let project = registry.get_mut(slug)?;
    let project_slug = project.slug.clone();
    let record = project
        .ai_sessions
        .iter_mut()
        .rev()
        .find(|record| record.is_open())
        .ok_or(AiSessionError::NoActiveSession {
            slug: project_slug.clone(),
        })?;
    record.end = Some(now);
    let closed = ClosedAiSession {
        slug: project_slug,
        label: record.label.clone(),
        start: record.start,
        end: now,
        seconds: record.duration(now).num_seconds(),
    };
    project.touch(now);
    Ok(closed)
}
