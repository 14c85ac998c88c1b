use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::registry::{Registry, RegistryError, TimeEntry};

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("A timer is already running on project {slug}")]
    AlreadyActive { slug: String },
    #[error("No timer is running")]
    NoActiveTimer,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Registry-wide timer state: at most one open time entry exists across all
/// projects, so the machine is Idle or Running on exactly one of them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimerStatus {
    Idle,
    Running {
        slug: String,
        name: String,
        started_at: DateTime<Utc>,
        elapsed_seconds: i64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct TimerReceipt {
    pub slug: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoppedEntry {
    pub slug: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub seconds: i64,
    pub auto_closed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchReceipt {
    pub stopped: StoppedEntry,
    pub started: TimerReceipt,
}

pub fn start(
    registry: &mut Registry,
    slug: &str,
    now: DateTime<Utc>,
) -> Result<TimerReceipt, TimerError> {
    registry.get(slug)?;
    if let Some((running, _)) = registry.open_time_entry() {
        return Err(TimerError::AlreadyActive {
            slug: running.slug.clone(),
        });
    }
    let project = registry.get_mut(slug)?;
    project.time.push(TimeEntry::open(now));
    let receipt = TimerReceipt {
        slug: project.slug.clone(),
        started_at: now,
    };
    project.touch(now);
    Ok(receipt)
}

pub fn stop(registry: &mut Registry, now: DateTime<Utc>) -> Result<StoppedEntry, TimerError> {
    let slug = match registry.open_time_entry() {
        Some((project, _)) => project.slug.clone(),
        None => return Err(TimerError::NoActiveTimer),
    };
    let project = registry.get_mut(&slug)?;
    let entry = project
        .time
        .iter_mut()
        .rev()
        .find(|entry| entry.is_open())
        .ok_or(TimerError::NoActiveTimer)?;
    entry.end = Some(now);
    let stopped = StoppedEntry {
        slug: slug.clone(),
        start: entry.start,
        end: now,
        seconds: entry.duration(now).num_seconds(),
        auto_closed: false,
    };
    project.touch(now);
    Ok(stopped)
}

/// Compound stop-then-start; the closed entry's end and the new entry's
/// start share the same instant, so no time is lost or double-counted.
pub fn switch(
    registry: &mut Registry,
    slug: &str,
    now: DateTime<Utc>,
) -> Result<SwitchReceipt, TimerError> {
    registry.get(slug)?;
    if registry.open_time_entry().is_none() {
        return Err(TimerError::NoActiveTimer);
    }
    let stopped = stop(registry, now)?;
    let started = start(registry, slug, now)?;
    Ok(SwitchReceipt { stopped, started })
}

/// Read-only; never mutates the registry.
pub fn status(registry: &Registry, now: DateTime<Utc>) -> TimerStatus {
    match registry.open_time_entry() {
        None => TimerStatus::Idle,
        Some((project, entry)) => TimerStatus::Running {
            slug: project.slug.clone(),
            name: project.name.clone(),
            started_at: entry.start,
            elapsed_seconds: entry.duration(now).num_seconds(),
        },
    }
}

/// Explicit safety valve for a timer left running by a killed process: an
/// entry open longer than `threshold` is closed at `start + threshold` and
/// marked auto-closed. Entries younger than the threshold are left running.
pub fn reconcile_stale(
    registry: &mut Registry,
    threshold: Duration,
    now: DateTime<Utc>,
) -> Option<StoppedEntry> {
    let (slug, start) = {
        let (project, entry) = registry.open_time_entry()?;
        (project.slug.clone(), entry.start)
    };
    if now - start <= threshold {
        return None;
    }
    let end = start + threshold;
    let project = registry.get_mut(&slug).ok()?;
    let entry = project.time.iter_mut().rev().find(|entry| entry.is_open())?;
    entry.end = Some(end);
    entry.auto_closed = true;
    project.touch(now);
    Some(StoppedEntry {
        slug,
        start,
        end,
        seconds: (end - start).num_seconds(),
        auto_closed: true,
    })
}
