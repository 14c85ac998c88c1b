use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registry::{Registry, RegistryError};

#[derive(Debug, Clone, Serialize)]
pub struct DemoResult {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

/// Seeds a few sample projects for a first look around. Slugs that already
/// exist are left untouched, so the command is safe to repeat.
pub fn seed_demo(registry: &mut Registry, now: DateTime<Utc>) -> Result<DemoResult, RegistryError> {
    let samples: [(&str, &str, &str, &[(&str, &str)]); 3] = [
        (
            "website",
            "Marketing Website",
            "cyan",
            &[
                ("Repo", "https://github.com/acme/website"),
                ("Staging", "https://staging.acme.example"),
            ],
        ),
        (
            "api",
            "Backend API",
            "green",
            &[
                ("Repo", "https://github.com/acme/api"),
                ("Docs", "https://api.acme.example/docs"),
            ],
        ),
        (
            "research",
            "Model Research",
            "magenta",
            &[("Notebook", "https://notebooks.acme.example/research")],
        ),
    ];

    let mut created = Vec::new();
    let mut skipped = Vec::new();
    for (slug, name, color, links) in samples {
        if registry.contains(slug) {
            skipped.push(slug.to_string());
            continue;
        }
        registry.create_project(slug, Some(name), Some(color), now)?;
        for (label, url) in links {
            registry.add_link(slug, label, url, now)?;
        }
        registry.add_note(slug, "Created by proj demo", now)?;
        created.push(slug.to_string());
    }

    Ok(DemoResult { created, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn seeding_twice_skips_existing_projects() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut registry = Registry::new();

        let first = seed_demo(&mut registry, now).expect("seed");
        assert_eq!(first.created.len(), 3);
        assert!(first.skipped.is_empty());
        assert!(!registry.get("website").expect("website").links.is_empty());

        let second = seed_demo(&mut registry, now).expect("seed again");
        assert!(second.created.is_empty());
        assert_eq!(second.skipped.len(), 3);
        assert_eq!(registry.len(), 3);
    }
}
