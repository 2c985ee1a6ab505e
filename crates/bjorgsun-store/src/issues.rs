// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured issue log.
//!
//! Terminal persistence failures are never raised to callers; they land here
//! as newline-delimited JSON entries so an operator can grep by stable code
//! (`PHX-MEM-01x` for memory/store, `PHX-BOOT-5xx` for boot integration).
//! Writing an issue is itself best-effort: if the log cannot be written the
//! entry still goes out through `tracing`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use bjorgsun_core::now_iso;

/// Stable issue codes.
pub mod codes {
    /// Memory file could not be written after retries and direct overwrite.
    pub const MEM_WRITE_FAILED: &str = "PHX-MEM-010";
    /// Snapshot export could not be written.
    pub const MEM_EXPORT_FAILED: &str = "PHX-MEM-011";
    /// A JSON file failed to parse and was quarantined.
    pub const MEM_CORRUPT: &str = "PHX-MEM-012";
    /// A user profile could not be written.
    pub const PROFILE_WRITE_FAILED: &str = "PHX-MEM-013";
    /// The preference audit log could not be written.
    pub const AUDIT_WRITE_FAILED: &str = "PHX-MEM-014";
    /// Configuration failed to load at boot.
    pub const BOOT_CONFIG_FAILED: &str = "PHX-BOOT-500";
}

/// Rotate once the log grows past this many bytes. One `.1` backup is kept.
const MAX_LOG_BYTES: u64 = 1024 * 1024;

/// Severity of an issue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One entry of the issue log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// Stable grep-able code, see [`codes`].
    pub code: String,
    /// How bad it is.
    pub severity: Severity,
    /// Subsystem that raised the issue (`memory`, `profile`, `audit`, `boot`).
    pub source: String,
    /// Short human-readable message.
    pub message: String,
    /// Longer free-form detail (usually the underlying error).
    #[serde(default)]
    pub detail: String,
    /// Arbitrary structured payload (offending path, attempt count, ...).
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl Issue {
    /// Start an issue entry stamped with the current time.
    pub fn new(
        code: &str,
        severity: Severity,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            ts: now_iso(),
            code: code.to_string(),
            severity,
            source: source.into(),
            message: message.into(),
            detail: String::new(),
            extra: serde_json::Value::Null,
        }
    }

    /// Attach free-form detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Attach a structured payload.
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = extra;
        self
    }
}

/// Append-only, size-rotated issue log.
#[derive(Debug, Clone)]
pub struct IssueLog {
    path: PathBuf,
}

impl IssueLog {
    /// Create a handle for the log at the given path. Nothing is touched on
    /// disk until the first entry is recorded.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log file location.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Record an issue. Best-effort: a failure to persist the entry is
    /// reported via `tracing` and otherwise swallowed.
    pub fn record(&self, issue: Issue) {
        warn!(
            code = %issue.code,
            source = %issue.source,
            detail = %issue.detail,
            "{}",
            issue.message
        );

        if let Err(e) = self.append_line(&issue) {
            warn!(path = %self.path.display(), error = %e, "issue log write failed");
        }
    }

    fn append_line(&self, issue: &Issue) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.rotate_if_needed()?;

        let line = serde_json::to_string(issue)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }

    /// Keep the log bounded: past the size cap the current file becomes the
    /// single `.1` backup and a fresh file starts.
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        let len = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if len > MAX_LOG_BYTES {
            let mut backup = self.path.as_os_str().to_owned();
            backup.push(".1");
            std::fs::rename(&self.path, PathBuf::from(backup))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_appends_json_lines() {
        let dir = tempdir().unwrap();
        let log = IssueLog::new(dir.path().join("logs/Phoenix-15_FIXME_log.log"));

        log.record(
            Issue::new(codes::MEM_WRITE_FAILED, Severity::Error, "memory", "save failed")
                .with_detail("disk full")
                .with_extra(serde_json::json!({"path": "/tmp/memory.json"})),
        );
        log.record(Issue::new(
            codes::MEM_CORRUPT,
            Severity::Warning,
            "memory",
            "quarantined",
        ));

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Issue = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.code, codes::MEM_WRITE_FAILED);
        assert_eq!(first.severity, Severity::Error);
        assert_eq!(first.detail, "disk full");
        assert_eq!(first.extra["path"], "/tmp/memory.json");
        assert!(first.ts.ends_with('Z'));

        let second: Issue = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.code, codes::MEM_CORRUPT);
    }

    #[test]
    fn oversized_log_is_rotated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("issues.log");
        // Pre-fill past the cap.
        std::fs::write(&path, vec![b'x'; (MAX_LOG_BYTES + 1) as usize]).unwrap();

        let log = IssueLog::new(&path);
        log.record(Issue::new(codes::MEM_CORRUPT, Severity::Warning, "memory", "hi"));

        let backup = path.with_extension("log.1");
        assert!(backup.exists(), "old log should rotate to .1");
        let fresh = std::fs::read_to_string(&path).unwrap();
        assert_eq!(fresh.lines().count(), 1, "fresh log holds only the new entry");
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
