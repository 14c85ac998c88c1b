use chrono::{DateTime, Utc};

use crate::ai::{AiReceipt, ClosedAiSession};
use crate::audit::AuditEvent;
use crate::demo::DemoResult;
use crate::facade::ProjectSummary;
use crate::import::ImportResult;
use crate::registry::{AiSessionRecord, Link};
use crate::report::{format_duration, TimeLogReport};
use crate::timer::{StoppedEntry, SwitchReceipt, TimerReceipt, TimerStatus};

fn stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

pub fn render_status(status: &TimerStatus) -> String {
    match status {
        TimerStatus::Idle => "No timer running".to_string(),
        TimerStatus::Running {
            slug,
            name,
            started_at,
            elapsed_seconds,
        } => format!(
            "Running on {} ({}) since {} | {}",
            slug,
            name,
            stamp(*started_at),
            format_duration(*elapsed_seconds)
        ),
    }
}

pub fn render_started(receipt: &TimerReceipt) -> String {
    format!("Started timer on {} at {}", receipt.slug, stamp(receipt.started_at))
}

pub fn render_stopped(stopped: &StoppedEntry) -> String {
    let marker = if stopped.auto_closed {
        " (auto-closed)"
    } else {
        ""
    };
    format!(
        "Stopped timer on {}: {}{}",
        stopped.slug,
        format_duration(stopped.seconds),
        marker
    )
}

pub fn render_switch(receipt: &SwitchReceipt) -> String {
    format!(
        "Switched {} -> {}: logged {} on {}",
        receipt.stopped.slug,
        receipt.started.slug,
        format_duration(receipt.stopped.seconds),
        receipt.stopped.slug
    )
}

pub fn render_project_list(projects: &[ProjectSummary]) -> String {
    if projects.is_empty() {
        return "No projects yet. Create one with: proj project create <slug>".to_string();
    }
    let mut lines = Vec::new();
    for project in projects {
        let mut markers = Vec::new();
        if project.running {
            markers.push("timer");
        }
        if project.ai_active {
            markers.push("ai");
        }
        let marker = if markers.is_empty() {
            String::new()
        } else {
            format!(" [{}]", markers.join(", "))
        };
        lines.push(format!(
            "{} | {} | {} links, {} notes{}",
            project.slug, project.name, project.links, project.notes, marker
        ));
    }
    lines.join("\n")
}

pub fn render_links(slug: &str, links: &[Link]) -> String {
    let mut lines = vec![format!("Links for {}:", slug)];
    if links.is_empty() {
        lines.push("- None".to_string());
    } else {
        for (index, link) in links.iter().enumerate() {
            lines.push(format!("{}. {} | {}", index, link.label, link.url));
        }
    }
    lines.join("\n")
}

pub fn render_notes(slug: &str, notes: &[String]) -> String {
    let mut lines = vec![format!("Notes for {}:", slug)];
    if notes.is_empty() {
        lines.push("- None".to_string());
    } else {
        for note in notes {
            lines.push(format!("- {}", note));
        }
    }
    lines.join("\n")
}

pub fn render_ai_started(receipt: &AiReceipt) -> String {
    match receipt.label.as_deref() {
        Some(label) => format!(
            "Started AI session on {} ({}) at {}",
            receipt.slug,
            label,
            stamp(receipt.started_at)
        ),
        None => format!(
            "Started AI session on {} at {}",
            receipt.slug,
            stamp(receipt.started_at)
        ),
    }
}

pub fn render_ai_stopped(closed: &ClosedAiSession) -> String {
    format!(
        "Stopped AI session on {}: {}",
        closed.slug,
        format_duration(closed.seconds)
    )
}

pub fn render_ai_sessions(slug: &str, sessions: &[AiSessionRecord], now: DateTime<Utc>) -> String {
    let mut lines = vec![format!("AI sessions for {}:", slug)];
    if sessions.is_empty() {
        lines.push("- None".to_string());
    } else {
        for record in sessions {
            let label = record.label.as_deref().unwrap_or("(unlabeled)");
            let state = if record.is_open() {
                "running".to_string()
            } else {
                format_duration(record.duration(now).num_seconds())
            };
            lines.push(format!("- {} | {} | {}", stamp(record.start), label, state));
        }
    }
    lines.join("\n")
}

pub fn render_time_log(report: &TimeLogReport) -> String {
    let mut lines = Vec::new();
    for row in &report.rows {
        match (&row.end, row.seconds) {
            (Some(end), Some(seconds)) => {
                let marker = if row.auto_closed { " (auto-closed)" } else { "" };
                lines.push(format!(
                    "{} | {} | {} | {}{}",
                    row.date,
                    row.start,
                    end,
                    format_duration(seconds),
                    marker
                ));
            }
            _ => lines.push(format!("{} | {} | running | --", row.date, row.start)),
        }
    }
    lines.push(format!(
        "TOTAL | {} | {} entries",
        format_duration(report.total_seconds),
        report.entries
    ));
    lines.join("\n")
}

pub fn render_audit(events: &[AuditEvent]) -> String {
    if events.is_empty() {
        return "No recorded commands".to_string();
    }
    let mut lines = Vec::new();
    for event in events {
        let slug = event.slug.as_deref().unwrap_or("-");
        lines.push(format!("{} | {} | {}", event.timestamp, event.action, slug));
    }
    lines.join("\n")
}

pub fn render_demo(result: &DemoResult) -> String {
    let mut lines = Vec::new();
    if result.created.is_empty() {
        lines.push("Demo projects already present; nothing created".to_string());
    } else {
        lines.push(format!("Created demo projects: {}", result.created.join(", ")));
    }
    if !result.skipped.is_empty() {
        lines.push(format!("Skipped existing: {}", result.skipped.join(", ")));
    }
    lines.join("\n")
}

pub fn render_import(result: &ImportResult) -> String {
    format!(
        "Imported {} as {} ({} notes)",
        result.name, result.slug, result.notes
    )
}
