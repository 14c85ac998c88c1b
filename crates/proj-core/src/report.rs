use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::registry::Project;

pub const DEFAULT_LOG_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct TimeLogRow {
    pub date: String,
    pub start: String,
    /// None while the entry is still running.
    pub end: Option<String>,
    pub seconds: Option<i64>,
    pub auto_closed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeLogReport {
    pub slug: String,
    pub days: i64,
    pub rows: Vec<TimeLogRow>,
    /// Total over closed entries only; a running entry shows in its row but
    /// is not totaled until it stops.
    pub total_seconds: i64,
    pub entries: usize,
}

/// Entries starting within the last `days` days, midnight-aligned, oldest
/// first in entry order.
pub fn time_log(project: &Project, days: i64, now: DateTime<Utc>) -> TimeLogReport {
    let cutoff = midnight(now) - Duration::days(days);
    let mut rows = Vec::new();
    let mut total_seconds = 0;

    for entry in &project.time {
        if entry.start < cutoff {
            continue;
        }
        let (end, seconds) = match entry.end {
            Some(end) => {
                let seconds = entry.duration(now).num_seconds();
                total_seconds += seconds;
                (Some(end.format("%H:%M").to_string()), Some(seconds))
            }
            None => (None, None),
        };
        rows.push(TimeLogRow {
            date: entry.start.format("%Y-%m-%d").to_string(),
            start: entry.start.format("%H:%M").to_string(),
            end,
            seconds,
            auto_closed: entry.auto_closed,
        });
    }

    TimeLogReport {
        slug: project.slug.clone(),
        days,
        entries: rows.len(),
        rows,
        total_seconds,
    }
}

pub fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{}h {:02}m", hours, minutes)
}

fn midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_duration_pads_minutes() {
        assert_eq!(format_duration(0), "0h 00m");
        assert_eq!(format_duration(5400), "1h 30m");
        assert_eq!(format_duration(3660), "1h 01m");
        assert_eq!(format_duration(26 * 3600), "26h 00m");
    }
}
