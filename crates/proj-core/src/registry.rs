use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Project slug is required")]
    MissingSlug,
    #[error("Invalid project slug '{0}': use lowercase letters, digits, '-' or '_'")]
    InvalidSlug(String),
    #[error("Project already exists: {0}")]
    DuplicateSlug(String),
    #[error("Project not found: {0}")]
    NotFound(String),
    #[error("{what} index {index} is out of range (0..{len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
}

/// A violation found while validating a loaded or about-to-be-saved snapshot.
#[derive(Debug, Error)]
pub enum InvariantViolation {
    #[error("duplicate project slug {0}")]
    DuplicateSlug(String),
    #[error("open time entries on both {0} and {1}; at most one timer may be open")]
    MultipleOpenTimers(String, String),
    #[error("multiple open AI sessions on project {0}")]
    MultipleOpenAiSessions(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_closed: bool,
}

impl TimeEntry {
    pub fn open(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: None,
            auto_closed: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Elapsed time; open entries are measured against `now`, clamped at zero.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        (self.end.unwrap_or(now) - self.start).max(Duration::zero())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSessionRecord {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub label: Option<String>,
}

impl AiSessionRecord {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        (self.end.unwrap_or(now) - self.start).max(Duration::zero())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub slug: String,
    pub name: String,
    pub color: Option<String>,
    pub task: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub time: Vec<TimeEntry>,
    #[serde(default)]
    pub ai_sessions: Vec<AiSessionRecord>,
}

impl Project {
    fn new(slug: &str, name: &str, color: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            color: color
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            task: None,
            created_at: now,
            updated_at: now,
            notes: Vec::new(),
            links: Vec::new(),
            time: Vec::new(),
            ai_sessions: Vec::new(),
        }
    }

    pub fn open_time_entry(&self) -> Option<&TimeEntry> {
        self.time.iter().find(|entry| entry.is_open())
    }

    pub fn open_ai_session(&self) -> Option<&AiSessionRecord> {
        self.ai_sessions.iter().find(|record| record.is_open())
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

pub fn validate_slug(slug: &str) -> Result<(), RegistryError> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(RegistryError::MissingSlug);
    }
    let pattern = Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("slug regex");
    if !pattern.is_match(slug) {
        return Err(RegistryError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// All known projects, in creation order. Loaded fresh from the store at the
/// start of every invocation; has no life between invocations.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    projects: Vec<Project>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_projects(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn contains(&self, slug: &str) -> bool {
        let slug = slug.trim();
        self.projects.iter().any(|project| project.slug == slug)
    }

    pub fn get(&self, slug: &str) -> Result<&Project, RegistryError> {
        let slug = slug.trim();
        self.projects
            .iter()
            .find(|project| project.slug == slug)
            .ok_or_else(|| RegistryError::NotFound(slug.to_string()))
    }

    pub fn get_mut(&mut self, slug: &str) -> Result<&mut Project, RegistryError> {
        let slug = slug.trim();
        self.projects
            .iter_mut()
            .find(|project| project.slug == slug)
            .ok_or_else(|| RegistryError::NotFound(slug.to_string()))
    }

    pub fn create_project(
        &mut self,
        slug: &str,
        name: Option<&str>,
        color: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<&Project, RegistryError> {
        validate_slug(slug)?;
        let slug = slug.trim();
        if self.contains(slug) {
            return Err(RegistryError::DuplicateSlug(slug.to_string()));
        }
        let display = name
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(slug);
        self.projects.push(Project::new(slug, display, color, now));
        Ok(self.projects.last().expect("just pushed"))
    }

    /// Removes the project and everything it owns: links, time entries and
    /// AI session records die with it.
    pub fn delete_project(&mut self, slug: &str) -> Result<Project, RegistryError> {
        let slug = slug.trim();
        let index = self
            .projects
            .iter()
            .position(|project| project.slug == slug)
            .ok_or_else(|| RegistryError::NotFound(slug.to_string()))?;
        Ok(self.projects.remove(index))
    }

    pub fn add_link(
        &mut self,
        slug: &str,
        label: &str,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, RegistryError> {
        let project = self.get_mut(slug)?;
        project.links.push(Link {
            label: label.trim().to_string(),
            url: url.trim().to_string(),
        });
        project.touch(now);
        Ok(project.links.len() - 1)
    }

    pub fn remove_link(
        &mut self,
        slug: &str,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<Link, RegistryError> {
        let project = self.get_mut(slug)?;
        if index >= project.links.len() {
            return Err(RegistryError::IndexOutOfRange {
                what: "link",
                index,
                len: project.links.len(),
            });
        }
        let link = project.links.remove(index);
        project.touch(now);
        Ok(link)
    }

    pub fn move_link(
        &mut self,
        slug: &str,
        from: usize,
        to: usize,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let project = self.get_mut(slug)?;
        let len = project.links.len();
        for index in [from, to] {
            if index >= len {
                return Err(RegistryError::IndexOutOfRange {
                    what: "link",
                    index,
                    len,
                });
            }
        }
        let link = project.links.remove(from);
        project.links.insert(to, link);
        project.touch(now);
        Ok(())
    }

    pub fn add_note(
        &mut self,
        slug: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, RegistryError> {
        let project = self.get_mut(slug)?;
        project.notes.push(text.trim().to_string());
        project.touch(now);
        Ok(project.notes.len() - 1)
    }

    pub fn set_task(
        &mut self,
        slug: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let project = self.get_mut(slug)?;
        project.task = Some(text.trim().to_string());
        project.touch(now);
        Ok(())
    }

    pub fn clear_task(
        &mut self,
        slug: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, RegistryError> {
        let project = self.get_mut(slug)?;
        let cleared = project.task.take();
        if cleared.is_some() {
            project.touch(now);
        }
        Ok(cleared)
    }

    /// The registry-wide open timer slot, if any.
    pub fn open_time_entry(&self) -> Option<(&Project, &TimeEntry)> {
        self.projects
            .iter()
            .find_map(|project| project.open_time_entry().map(|entry| (project, entry)))
    }

    /// Invariant check run by the store on load and before every save.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let mut seen = std::collections::HashSet::new();
        for project in &self.projects {
            if !seen.insert(project.slug.as_str()) {
                return Err(InvariantViolation::DuplicateSlug(project.slug.clone()));
            }
        }

        let mut open_on: Option<&str> = None;
        for project in &self.projects {
            for entry in &project.time {
                if !entry.is_open() {
                    continue;
                }
                match open_on {
                    None => open_on = Some(project.slug.as_str()),
                    Some(first) => {
                        return Err(InvariantViolation::MultipleOpenTimers(
                            first.to_string(),
                            project.slug.clone(),
                        ))
                    }
                }
            }
        }

        for project in &self.projects {
            let open = project
                .ai_sessions
                .iter()
                .filter(|record| record.is_open())
                .count();
            if open > 1 {
                return Err(InvariantViolation::MultipleOpenAiSessions(
                    project.slug.clone(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn create_project_rejects_bad_slugs() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.create_project("", None, None, at(0)),
            Err(RegistryError::MissingSlug)
        ));
        assert!(matches!(
            registry.create_project("Has Spaces", None, None, at(0)),
            Err(RegistryError::InvalidSlug(_))
        ));
        assert!(matches!(
            registry.create_project("-leading", None, None, at(0)),
            Err(RegistryError::InvalidSlug(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn create_project_defaults_name_to_slug() {
        let mut registry = Registry::new();
        let project = registry
            .create_project("api", None, None, at(0))
            .expect("create");
        assert_eq!(project.name, "api");
        assert_eq!(project.created_at, at(0));
    }

    #[test]
    fn duplicate_slug_is_rejected_and_registry_unchanged() {
        let mut registry = Registry::new();
        registry
            .create_project("api", Some("Backend"), None, at(0))
            .expect("create");
        let err = registry
            .create_project("api", Some("Other"), None, at(1))
            .expect_err("duplicate");
        assert!(matches!(err, RegistryError::DuplicateSlug(slug) if slug == "api"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("api").expect("get").name, "Backend");
    }

    #[test]
    fn links_keep_insertion_order_and_move() {
        let mut registry = Registry::new();
        registry
            .create_project("api", None, None, at(0))
            .expect("create");
        registry
            .add_link("api", "Repo", "https://example.com/repo", at(1))
            .expect("add");
        registry
            .add_link("api", "Docs", "https://example.com/docs", at(2))
            .expect("add");
        registry
            .add_link("api", "CI", "https://example.com/ci", at(3))
            .expect("add");

        registry.move_link("api", 2, 0, at(4)).expect("move");
        let labels: Vec<&str> = registry
            .get("api")
            .expect("get")
            .links
            .iter()
            .map(|link| link.label.as_str())
            .collect();
        assert_eq!(labels, vec!["CI", "Repo", "Docs"]);

        let removed = registry.remove_link("api", 1, at(5)).expect("remove");
        assert_eq!(removed.label, "Repo");

        let err = registry.remove_link("api", 5, at(6)).expect_err("range");
        assert!(matches!(
            err,
            RegistryError::IndexOutOfRange { index: 5, len: 2, .. }
        ));
    }

    #[test]
    fn delete_project_cascades() {
        let mut registry = Registry::new();
        registry
            .create_project("api", None, None, at(0))
            .expect("create");
        registry.get_mut("api").expect("get").time.push(TimeEntry {
            start: at(1),
            end: Some(at(2)),
            auto_closed: false,
        });
        let removed = registry.delete_project("api").expect("delete");
        assert_eq!(removed.time.len(), 1);
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get("api"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn validate_flags_two_open_timers() {
        let mut registry = Registry::new();
        registry
            .create_project("a", None, None, at(0))
            .expect("create");
        registry
            .create_project("b", None, None, at(0))
            .expect("create");
        registry
            .get_mut("a")
            .expect("get")
            .time
            .push(TimeEntry::open(at(1)));
        registry
            .get_mut("b")
            .expect("get")
            .time
            .push(TimeEntry::open(at(2)));
        assert!(matches!(
            registry.validate(),
            Err(InvariantViolation::MultipleOpenTimers(first, second))
                if first == "a" && second == "b"
        ));
    }

    #[test]
    fn open_entry_duration_clamps_at_zero() {
        let entry = TimeEntry::open(at(100));
        assert_eq!(entry.duration(at(40)).num_seconds(), 0);
        assert_eq!(entry.duration(at(190)).num_seconds(), 90);
    }
}
