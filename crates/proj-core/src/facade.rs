use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use crate::ai::{self, AiReceipt, AiSessionError, ClosedAiSession};
use crate::audit::{append_audit_event, read_recent_audit_events, AuditEvent};
use crate::config::{self, ConfigError};
use crate::demo::{seed_demo, DemoResult};
use crate::import::{import_conf, ImportError, ImportResult};
use crate::registry::{AiSessionRecord, Link, Project, Registry, RegistryError};
use crate::report::{time_log, TimeLogReport};
use crate::store::{self, StoreError};
use crate::timer::{self, StoppedEntry, SwitchReceipt, TimerError, TimerReceipt, TimerStatus};

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Timer(#[from] TimerError),
    #[error(transparent)]
    AiSession(#[from] AiSessionError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub slug: String,
    pub name: String,
    pub color: Option<String>,
    pub task: Option<String>,
    pub links: usize,
    pub notes: usize,
    pub running: bool,
    pub ai_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            slug: project.slug.clone(),
            name: project.name.clone(),
            color: project.color.clone(),
            task: project.task.clone(),
            links: project.links.len(),
            notes: project.notes.len(),
            running: project.open_time_entry().is_some(),
            ai_active: project.open_ai_session().is_some(),
            created_at: project.created_at,
        }
    }
}

/// The command boundary the CLI drives. Every operation is one
/// load -> mutate -> save pass over the state file; mutating operations
/// hold the advisory lock for the whole pass, read-only operations work
/// from a single atomic snapshot read.
pub struct Hub {
    state_path: PathBuf,
}

impl Hub {
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    pub fn resolve(explicit: Option<&Path>) -> Result<Self, HubError> {
        Ok(Self::new(config::resolve_state_path(explicit)?))
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    fn mutate<T>(
        &self,
        now: DateTime<Utc>,
        action: &str,
        slug: Option<&str>,
        op: impl FnOnce(&mut Registry) -> Result<(T, Value), HubError>,
    ) -> Result<T, HubError> {
        let _lock = store::lock(&self.state_path)?;
        let mut registry = store::load(&self.state_path)?;
        let (result, details) = op(&mut registry)?;
        store::save(&self.state_path, &registry, now)?;
        self.journal(action, slug, details, now);
        Ok(result)
    }

    fn journal(&self, action: &str, slug: Option<&str>, details: Value, now: DateTime<Utc>) {
        let event = AuditEvent {
            timestamp: now.to_rfc3339(),
            action: action.to_string(),
            slug: slug.map(str::to_string),
            details,
        };
        if let Err(err) = append_audit_event(&self.state_path, &event) {
            warn!("failed to append audit event: {err}");
        }
    }

    // --- projects ---

    pub fn project_create(
        &self,
        slug: &str,
        name: Option<&str>,
        color: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ProjectSummary, HubError> {
        self.mutate(now, "project.create", Some(slug), |registry| {
            let project = registry.create_project(slug, name, color, now)?;
            let summary = ProjectSummary::from(project);
            let details = json!({ "name": summary.name.clone() });
            Ok((summary, details))
        })
    }

    pub fn project_delete(&self, slug: &str, now: DateTime<Utc>) -> Result<ProjectSummary, HubError> {
        self.mutate(now, "project.delete", Some(slug), |registry| {
            let removed = registry.delete_project(slug)?;
            let details = json!({
                "time_entries": removed.time.len(),
                "ai_sessions": removed.ai_sessions.len(),
            });
            Ok((ProjectSummary::from(&removed), details))
        })
    }

    pub fn project_list(&self) -> Result<Vec<ProjectSummary>, HubError> {
        let registry = store::load(&self.state_path)?;
        Ok(registry.projects().iter().map(ProjectSummary::from).collect())
    }

    // --- timer ---

    pub fn timer_start(&self, slug: &str, now: DateTime<Utc>) -> Result<TimerReceipt, HubError> {
        self.mutate(now, "timer.start", Some(slug), |registry| {
            let receipt = timer::start(registry, slug, now)?;
            let details = json!({ "started_at": receipt.started_at.to_rfc3339() });
            Ok((receipt, details))
        })
    }

    pub fn timer_stop(&self, now: DateTime<Utc>) -> Result<StoppedEntry, HubError> {
        self.mutate(now, "timer.stop", None, |registry| {
            let stopped = timer::stop(registry, now)?;
            let details = json!({ "seconds": stopped.seconds });
            Ok((stopped, details))
        })
    }

    pub fn timer_switch(&self, slug: &str, now: DateTime<Utc>) -> Result<SwitchReceipt, HubError> {
        self.mutate(now, "timer.switch", Some(slug), |registry| {
            let receipt = timer::switch(registry, slug, now)?;
            let details = json!({
                "from": receipt.stopped.slug.clone(),
                "seconds": receipt.stopped.seconds,
            });
            Ok((receipt, details))
        })
    }

    pub fn timer_status(&self, now: DateTime<Utc>) -> Result<TimerStatus, HubError> {
        let registry = store::load(&self.state_path)?;
        Ok(timer::status(&registry, now))
    }

    pub fn reconcile(
        &self,
        stale_after_hours: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<Option<StoppedEntry>, HubError> {
        let threshold = config::resolve_stale_after(stale_after_hours);
        self.mutate(now, "timer.reconcile", None, |registry| {
            let closed = timer::reconcile_stale(registry, threshold, now);
            let details = json!({
                "threshold_hours": threshold.num_hours(),
                "closed": closed.as_ref().map(|entry| entry.slug.clone()),
            });
            Ok((closed, details))
        })
    }

    // --- links ---

    pub fn link_add(
        &self,
        slug: &str,
        label: &str,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, HubError> {
        self.mutate(now, "link.add", Some(slug), |registry| {
            let position = registry.add_link(slug, label, url, now)?;
            let details = json!({ "label": label, "url": url, "position": position });
            Ok((position, details))
        })
    }

    pub fn link_remove(
        &self,
        slug: &str,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<Link, HubError> {
        self.mutate(now, "link.remove", Some(slug), |registry| {
            let removed = registry.remove_link(slug, index, now)?;
            let details = json!({ "label": removed.label.clone(), "index": index });
            Ok((removed, details))
        })
    }

    pub fn link_move(
        &self,
        slug: &str,
        from: usize,
        to: usize,
        now: DateTime<Utc>,
    ) -> Result<(), HubError> {
        self.mutate(now, "link.move", Some(slug), |registry| {
            registry.move_link(slug, from, to, now)?;
            Ok(((), json!({ "from": from, "to": to })))
        })
    }

    pub fn link_list(&self, slug: &str) -> Result<Vec<Link>, HubError> {
        let registry = store::load(&self.state_path)?;
        Ok(registry.get(slug)?.links.clone())
    }

    // --- AI sessions ---

    pub fn ai_start(
        &self,
        slug: &str,
        label: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AiReceipt, HubError> {
        self.mutate(now, "ai.start", Some(slug), |registry| {
            let receipt = ai::start_session(registry, slug, label, now)?;
            let details = json!({ "label": receipt.label.clone() });
            Ok((receipt, details))
        })
    }

    pub fn ai_stop(&self, slug: &str, now: DateTime<Utc>) -> Result<ClosedAiSession, HubError> {
        self.mutate(now, "ai.stop", Some(slug), |registry| {
            let closed = ai::stop_session(registry, slug, now)?;
            let details = json!({ "seconds": closed.seconds });
            Ok((closed, details))
        })
    }

    pub fn ai_list(&self, slug: &str) -> Result<Vec<AiSessionRecord>, HubError> {
        let registry = store::load(&self.state_path)?;
        Ok(registry.get(slug)?.ai_sessions.clone())
    }

    // --- notes and current task ---

    pub fn note_add(&self, slug: &str, text: &str, now: DateTime<Utc>) -> Result<usize, HubError> {
        self.mutate(now, "note.add", Some(slug), |registry| {
            let position = registry.add_note(slug, text, now)?;
            Ok((position, json!({ "position": position })))
        })
    }

    pub fn note_list(&self, slug: &str) -> Result<Vec<String>, HubError> {
        let registry = store::load(&self.state_path)?;
        Ok(registry.get(slug)?.notes.clone())
    }

    pub fn task_set(&self, slug: &str, text: &str, now: DateTime<Utc>) -> Result<(), HubError> {
        self.mutate(now, "task.set", Some(slug), |registry| {
            registry.set_task(slug, text, now)?;
            Ok(((), json!({ "task": text })))
        })
    }

    pub fn task_clear(
        &self,
        slug: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, HubError> {
        self.mutate(now, "task.clear", Some(slug), |registry| {
            let cleared = registry.clear_task(slug, now)?;
            let details = json!({ "cleared": cleared.clone() });
            Ok((cleared, details))
        })
    }

    // --- reporting, seeding, import ---

    pub fn time_log(
        &self,
        slug: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<TimeLogReport, HubError> {
        let registry = store::load(&self.state_path)?;
        Ok(time_log(registry.get(slug)?, days, now))
    }

    pub fn demo(&self, now: DateTime<Utc>) -> Result<DemoResult, HubError> {
        self.mutate(now, "demo", None, |registry| {
            let result = seed_demo(registry, now)?;
            let details = json!({ "created": result.created.clone() });
            Ok((result, details))
        })
    }

    pub fn import(
        &self,
        slug: &str,
        conf_path: &Path,
        now: DateTime<Utc>,
    ) -> Result<ImportResult, HubError> {
        self.mutate(now, "import", Some(slug), |registry| {
            let result = import_conf(registry, slug, conf_path, now)?;
            let details = json!({ "conf": conf_path.display().to_string() });
            Ok((result, details))
        })
    }

    pub fn recent_events(&self, limit: usize) -> Vec<AuditEvent> {
        read_recent_audit_events(&self.state_path, limit)
    }
}
