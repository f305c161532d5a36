//! # Best-effort audit log writer.
//!
//! [`AuditWriter`] appends one line per attempt lifecycle event to a
//! date-stamped file (`audit-YYYY-MM-DD.log`) inside its directory. The file
//! rotates naturally at midnight because the name is derived from the
//! current date on every append.
//!
//! ## Output format
//! ```text
//! 2026-08-28T10:15:02Z START model=sonnet attempt=1
//! 2026-08-28T10:15:09Z ERROR model=sonnet attempt=1 duration_ms=7021 detail="exit code: 1"
//! 2026-08-28T10:15:11Z START model=sonnet attempt=2
//! 2026-08-28T10:15:20Z SUCCESS model=sonnet attempt=2 duration_ms=9210
//! ```
//!
//! ## Rules
//! - Every filesystem failure (directory creation, open, append) is caught
//!   and discarded. An audit loss never affects a task request's outcome.
//! - If the configured directory cannot be written, one append is retried
//!   against a temp-directory fallback, then the record is dropped.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Appends attempt lifecycle records to a rotating, date-stamped log file.
pub struct AuditWriter {
    dir: PathBuf,
}

impl AuditWriter {
    /// Creates a writer rooted at `dir`. The directory is created lazily on
    /// first append.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Fallback directory used when the configured one is not writable.
    pub fn fallback_dir() -> PathBuf {
        std::env::temp_dir().join("promptvisor")
    }

    /// Formats an event as one audit line, or `None` for event kinds the
    /// audit log does not record.
    fn format_line(event: &Event) -> Option<String> {
        let tag = match event.kind {
            EventKind::ExecStarting => "START",
            EventKind::ExecSucceeded => "SUCCESS",
            EventKind::ExecFailed => "ERROR",
            _ => return None,
        };

        let at = OffsetDateTime::from(event.at)
            .format(&Rfc3339)
            .unwrap_or_else(|_| "-".to_string());

        let mut line = format!("{at} {tag}");
        if let Some(model) = &event.model {
            line.push_str(&format!(" model={model}"));
        }
        if let Some(attempt) = event.attempt {
            line.push_str(&format!(" attempt={attempt}"));
        }
        if let Some(ms) = event.duration_ms {
            line.push_str(&format!(" duration_ms={ms}"));
        }
        if let Some(detail) = &event.detail {
            line.push_str(&format!(" detail={:?}", detail.as_ref()));
        }
        Some(line)
    }

    /// Appends a line to today's file, first in the configured directory,
    /// then in the temp fallback. All errors are swallowed.
    fn append(&self, line: &str) {
        let date = format_description!("[year]-[month]-[day]");
        let Ok(stamp) = OffsetDateTime::now_utc().format(&date) else {
            return;
        };
        let file = format!("audit-{stamp}.log");

        for dir in [&self.dir, &Self::fallback_dir()] {
            if try_append(&dir.join(&file), dir, line) {
                return;
            }
        }
    }
}

fn try_append(path: &std::path::Path, dir: &std::path::Path, line: &str) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) else {
        return false;
    };
    writeln!(f, "{line}").is_ok()
}

#[async_trait]
impl Subscribe for AuditWriter {
    async fn on_event(&self, event: &Event) {
        if let Some(line) = Self::format_line(event) {
            self.append(&line);
        }
    }
}
