// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic write-then-replace JSON persistence with quarantine on read.
//!
//! Writes go to a sibling temp file first and are renamed over the target,
//! so the target only ever holds the full previous bytes or the full new
//! bytes. Reads that hit unparseable JSON quarantine the file (rename plus
//! an archived copy under the exports folder) and return `None`; callers
//! rebuild defaults and the system keeps going.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use bjorgsun_core::file_stamp;

use crate::issues::{Issue, IssueLog, Severity, codes};

/// Write attempts before falling back to a direct overwrite.
const WRITE_ATTEMPTS: u32 = 3;
/// Linear backoff unit between attempts (200/400/600 ms).
const RETRY_DELAY: Duration = Duration::from_millis(200);

/// JSON file store shared by every subsystem that persists state.
#[derive(Debug, Clone)]
pub struct JsonStore {
    issues: IssueLog,
    exports_dir: PathBuf,
}

impl JsonStore {
    /// Create a store that archives quarantined files under `exports_dir`
    /// and records terminal failures in `issues`.
    pub fn new(issues: IssueLog, exports_dir: impl Into<PathBuf>) -> Self {
        Self {
            issues,
            exports_dir: exports_dir.into(),
        }
    }

    /// The issue log this store reports to.
    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    /// Persist `value` at `path`, pretty-printed, atomically.
    ///
    /// Returns `true` on success. On terminal failure an issue is recorded
    /// under `issue_code` and `false` is returned; the caller's in-memory
    /// state is unaffected.
    pub fn write_pretty(&self, path: &Path, value: &serde_json::Value, issue_code: &str) -> bool {
        let payload = match serde_json::to_string_pretty(value) {
            Ok(p) => p,
            Err(e) => {
                self.issues.record(
                    Issue::new(issue_code, Severity::Error, "store", "serialization failed")
                        .with_detail(e.to_string())
                        .with_extra(serde_json::json!({"path": path.display().to_string()})),
                );
                return false;
            }
        };

        let parent = path.parent().unwrap_or(Path::new("."));
        if let Err(e) = std::fs::create_dir_all(parent) {
            self.record_write_failure(path, issue_code, &e.to_string(), 0);
            return false;
        }

        let mut last_error = String::new();
        for attempt in 1..=WRITE_ATTEMPTS {
            match replace_file(parent, path, &payload) {
                Ok(()) => return true,
                Err(e) => {
                    last_error = e.to_string();
                    debug!(
                        path = %path.display(),
                        attempt,
                        error = %last_error,
                        "atomic replace failed, backing off"
                    );
                    std::thread::sleep(RETRY_DELAY * attempt);
                }
            }
        }

        // Last resort: a plain overwrite. Not atomic, but better than losing
        // the payload entirely when rename keeps failing.
        match std::fs::write(path, &payload) {
            Ok(()) => {
                warn!(path = %path.display(), "atomic replace exhausted, direct overwrite succeeded");
                true
            }
            Err(e) => {
                self.record_write_failure(
                    path,
                    issue_code,
                    &format!("replace: {last_error}; overwrite: {e}"),
                    WRITE_ATTEMPTS,
                );
                false
            }
        }
    }

    /// Read and parse the JSON file at `path`.
    ///
    /// Missing file → `None`. Present but empty or unparseable → the file is
    /// quarantined (renamed to `<path>.corrupt.<ts>.json`, a copy archived
    /// under the exports folder), an issue is recorded, and `None` is
    /// returned. This function never raises.
    pub fn read_or_quarantine(&self, path: &Path) -> Option<serde_json::Value> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable file treated as absent");
                return None;
            }
        };

        if raw.trim().is_empty() {
            self.quarantine(path, "empty file");
            return None;
        }

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                self.quarantine(path, &e.to_string());
                None
            }
        }
    }

    /// Move a bad file out of the way and archive a copy for post-mortem.
    fn quarantine(&self, path: &Path, reason: &str) {
        let stamp = file_stamp();
        let mut quarantine_name = path.as_os_str().to_owned();
        quarantine_name.push(format!(".corrupt.{stamp}.json"));
        let quarantine_path = PathBuf::from(quarantine_name);

        if let Err(e) = std::fs::rename(path, &quarantine_path) {
            warn!(path = %path.display(), error = %e, "quarantine rename failed");
        } else {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            let backup = self.exports_dir.join(format!("{stem}_corrupt_{stamp}.json"));
            let archived = std::fs::create_dir_all(&self.exports_dir)
                .and_then(|()| std::fs::copy(&quarantine_path, &backup))
                .is_ok();
            if !archived {
                warn!(path = %backup.display(), "quarantine archive copy failed");
            }
        }

        self.issues.record(
            Issue::new(
                codes::MEM_CORRUPT,
                Severity::Error,
                "store",
                "corrupt JSON file quarantined",
            )
            .with_detail(reason)
            .with_extra(serde_json::json!({
                "path": path.display().to_string(),
                "quarantine": quarantine_path.display().to_string(),
            })),
        );
    }

    fn record_write_failure(&self, path: &Path, issue_code: &str, error: &str, attempts: u32) {
        self.issues.record(
            Issue::new(issue_code, Severity::Error, "store", "file write failed")
                .with_detail(error)
                .with_extra(serde_json::json!({
                    "path": path.display().to_string(),
                    "attempts": attempts,
                })),
        );
    }
}

/// One atomic replace: temp sibling with a random suffix, full write, rename.
/// The temp file is removed on every failure path (`NamedTempFile` deletes
/// itself on drop unless persisted).
fn replace_file(parent: &Path, path: &Path, payload: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(payload.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &Path) -> JsonStore {
        JsonStore::new(
            IssueLog::new(dir.join("logs/Phoenix-15_FIXME_log.log")),
            dir.join("memory_exports"),
        )
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let path = dir.path().join("nested/deeper/memory.json");

        let value = serde_json::json!({"version": 2, "conversation": [], "nött": "påverka"});
        assert!(store.write_pretty(&path, &value, codes::MEM_WRITE_FAILED));

        let read = store.read_or_quarantine(&path).unwrap();
        assert_eq!(read, value);

        // Pretty-printed, non-ASCII preserved.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains('\n'));
        assert!(raw.contains("påverka"));
    }

    #[test]
    fn missing_file_reads_as_none_without_issue() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        assert!(store.read_or_quarantine(&dir.path().join("absent.json")).is_none());
        assert!(
            !store.issues().path().exists(),
            "a missing file is not an issue"
        );
    }

    #[test]
    fn corrupt_file_is_quarantined_with_backup_and_issue() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(store.read_or_quarantine(&path).is_none());
        assert!(!path.exists(), "bad file must be renamed away");

        let siblings: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(
            siblings
                .iter()
                .any(|n| n.starts_with("memory.json.corrupt.") && n.ends_with(".json")),
            "expected quarantine rename, got {siblings:?}"
        );

        let exports: Vec<String> = std::fs::read_dir(dir.path().join("memory_exports"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(
            exports
                .iter()
                .any(|n| n.starts_with("memory_corrupt_") && n.ends_with(".json")),
            "expected archived copy, got {exports:?}"
        );

        let issues = std::fs::read_to_string(store.issues().path()).unwrap();
        assert!(issues.contains(codes::MEM_CORRUPT));
    }

    #[test]
    fn empty_file_counts_as_corrupt() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "   \n").unwrap();

        assert!(store.read_or_quarantine(&path).is_none());
        assert!(!path.exists());
    }

    #[test]
    fn replace_leaves_no_temp_files_behind() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let path = dir.path().join("memory.json");

        for i in 0..5 {
            let value = serde_json::json!({"i": i});
            assert!(store.write_pretty(&path, &value, codes::MEM_WRITE_FAILED));
        }

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(
            names.iter().all(|n| n == "memory.json"),
            "no temp litter expected, got {names:?}"
        );
    }

    #[test]
    fn write_failure_is_reported_not_raised() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        // Parent "directory" is a file, so create_dir_all and every replace fail.
        std::fs::write(dir.path().join("blocked"), "x").unwrap();
        let path = dir.path().join("blocked/memory.json");

        let ok = store.write_pretty(&path, &serde_json::json!({}), codes::MEM_WRITE_FAILED);
        assert!(!ok);

        let issues = std::fs::read_to_string(store.issues().path()).unwrap();
        assert!(issues.contains(codes::MEM_WRITE_FAILED));
    }

    #[test]
    fn previous_contents_survive_until_replace_completes() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let path = dir.path().join("memory.json");

        assert!(store.write_pretty(&path, &serde_json::json!({"gen": 1}), codes::MEM_WRITE_FAILED));
        assert!(store.write_pretty(&path, &serde_json::json!({"gen": 2}), codes::MEM_WRITE_FAILED));

        let read = store.read_or_quarantine(&path).unwrap();
        assert_eq!(read["gen"], 2);
    }
}
