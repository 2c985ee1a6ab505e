// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk layout of the data directory.
//!
//! Everything the core persists lives under one configurable root:
//!
//! ```text
//! data/
//!   memory.json                  conversation + storytime + migrations
//!   memory_legacy.json           pre-rewrite flat list, merged once
//!   memory_exports/              snapshots and corrupt-file backups
//!   users/<safe-handle>/profile.json
//!   preferences_log.json         cross-user preference audit log
//!   logs/Phoenix-15_FIXME_log.log structured issue entries
//! ```

use std::path::{Path, PathBuf};

use bjorgsun_config::model::StorageConfig;

/// File name of the memory file under the data root.
pub const MEMORY_FILE: &str = "memory.json";
/// File name of the legacy flat-list memory file, merged exactly once.
pub const LEGACY_MEMORY_FILE: &str = "memory_legacy.json";
/// Directory holding snapshots and corrupt-file backups.
pub const EXPORTS_DIR: &str = "memory_exports";
/// Directory holding per-user profile directories.
pub const USERS_DIR: &str = "users";
/// File name of the cross-user preference audit log.
pub const PREFERENCES_LOG_FILE: &str = "preferences_log.json";
/// Directory holding the issue log.
pub const LOGS_DIR: &str = "logs";
/// File name of the structured issue log.
pub const ISSUE_LOG_FILE: &str = "Phoenix-15_FIXME_log.log";

/// Resolved locations of every file the core owns.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
    memory_file: PathBuf,
}

impl DataPaths {
    /// Resolve the layout from the storage configuration.
    ///
    /// `storage.memory_path` relocates only the memory file; everything else
    /// stays under the data root.
    pub fn from_config(storage: &StorageConfig) -> Self {
        let root = PathBuf::from(&storage.data_dir);
        let memory_file = storage
            .memory_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join(MEMORY_FILE));
        Self { root, memory_file }
    }

    /// Build a layout rooted at an explicit directory (test harnesses).
    pub fn at_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let memory_file = root.join(MEMORY_FILE);
        Self { root, memory_file }
    }

    /// The data root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the memory file.
    pub fn memory_file(&self) -> &Path {
        &self.memory_file
    }

    /// Location of the legacy flat-list memory file. Always a sibling of the
    /// memory file so a relocated memory file keeps its legacy companion.
    pub fn legacy_memory_file(&self) -> PathBuf {
        self.memory_file
            .parent()
            .unwrap_or(Path::new("."))
            .join(LEGACY_MEMORY_FILE)
    }

    /// Directory for snapshots and corrupt-file backups.
    pub fn exports_dir(&self) -> PathBuf {
        self.root.join(EXPORTS_DIR)
    }

    /// Directory holding all user profile directories.
    pub fn users_dir(&self) -> PathBuf {
        self.root.join(USERS_DIR)
    }

    /// Profile file for an already-sanitized user key.
    pub fn profile_file(&self, safe_key: &str) -> PathBuf {
        self.users_dir().join(safe_key).join("profile.json")
    }

    /// Location of the preference audit log.
    pub fn preferences_log(&self) -> PathBuf {
        self.root.join(PREFERENCES_LOG_FILE)
    }

    /// Location of the structured issue log.
    pub fn issue_log(&self) -> PathBuf {
        self.root.join(LOGS_DIR).join(ISSUE_LOG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_hangs_off_data_dir() {
        let paths = DataPaths::from_config(&StorageConfig {
            data_dir: "data".to_string(),
            memory_path: None,
        });
        assert_eq!(paths.memory_file(), Path::new("data/memory.json"));
        assert_eq!(paths.exports_dir(), Path::new("data/memory_exports"));
        assert_eq!(
            paths.profile_file("kira_2994"),
            Path::new("data/users/kira_2994/profile.json")
        );
        assert_eq!(
            paths.issue_log(),
            Path::new("data/logs/Phoenix-15_FIXME_log.log")
        );
    }

    #[test]
    fn memory_path_override_relocates_only_memory() {
        let paths = DataPaths::from_config(&StorageConfig {
            data_dir: "data".to_string(),
            memory_path: Some("/mnt/vault/memory.json".to_string()),
        });
        assert_eq!(paths.memory_file(), Path::new("/mnt/vault/memory.json"));
        assert_eq!(
            paths.legacy_memory_file(),
            Path::new("/mnt/vault/memory_legacy.json")
        );
        // Everything else stays under the root.
        assert_eq!(paths.preferences_log(), Path::new("data/preferences_log.json"));
    }
}
