// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The preference audit log.
//!
//! A single cross-user file tracking every fact the companion has recorded:
//! who it belongs to, which category, when it was first seen and last
//! confirmed. The log survived one format change — early builds kept a flat
//! list of records — and migrates the old shape in place on first load.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use bjorgsun_core::{now_iso, privacy};
use bjorgsun_store::{JsonStore, codes};

/// Current audit log format version.
pub const AUDIT_VERSION: u64 = 2;

/// One audited value under a `(user, category)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The recorded value, verbatim.
    pub value: String,
    /// When this value was first recorded.
    pub first_recorded: String,
    /// When this value was last re-recorded.
    pub last_updated: String,
}

/// Root object of the audit file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct AuditFile {
    version: u64,
    users: BTreeMap<String, BTreeMap<String, Vec<AuditEntry>>>,
}

impl Default for AuditFile {
    fn default() -> Self {
        Self {
            version: AUDIT_VERSION,
            users: BTreeMap::new(),
        }
    }
}

/// Legacy flat record shape, one per line of the old list.
#[derive(Debug, Deserialize)]
struct LegacyRecord {
    #[serde(default)]
    user: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    first_recorded: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
}

/// Versioned, migratable preference audit log.
pub struct PreferenceAuditLog {
    store: JsonStore,
    path: PathBuf,
    state: Mutex<AuditFile>,
}

impl PreferenceAuditLog {
    /// Open the audit log, migrating a legacy flat-list file in place before
    /// anything else touches it.
    pub fn open(store: JsonStore, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (file, migrated) = match store.read_or_quarantine(&path) {
            Some(serde_json::Value::Array(records)) => (migrate_flat(records), true),
            Some(root @ serde_json::Value::Object(_)) => (parse_current(root), false),
            Some(_) | None => (AuditFile::default(), false),
        };

        let log = Self {
            store,
            path,
            state: Mutex::new(file),
        };
        if migrated {
            info!("preference audit log migrated from flat list");
            log.flush();
        }
        log
    }

    /// Record a value under `(user, category)`.
    ///
    /// A case-insensitive match on an existing value refreshes its
    /// `last_updated` stamp; otherwise a new entry is appended with
    /// `first_recorded = last_updated = now`. The log is flushed either way.
    pub fn record(&self, category: &str, value: &str, user: &str) {
        let now = now_iso();
        {
            let mut state = self.state.lock().expect("audit lock poisoned");
            let entries = state
                .users
                .entry(user.to_string())
                .or_default()
                .entry(category.to_string())
                .or_default();

            match entries
                .iter_mut()
                .find(|e| e.value.eq_ignore_ascii_case(value))
            {
                Some(existing) => existing.last_updated = now,
                None => entries.push(AuditEntry {
                    value: value.to_string(),
                    first_recorded: now.clone(),
                    last_updated: now,
                }),
            }
        }
        self.flush();
    }

    /// Clone of the entries under `(user, category)`.
    pub fn entries(&self, user: &str, category: &str) -> Vec<AuditEntry> {
        let state = self.state.lock().expect("audit lock poisoned");
        state
            .users
            .get(user)
            .and_then(|categories| categories.get(category))
            .cloned()
            .unwrap_or_default()
    }

    /// The audit file location.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Persist the current state. Failures are logged as issues, not raised.
    fn flush(&self) {
        let payload = {
            let state = self.state.lock().expect("audit lock poisoned");
            serde_json::to_value(&*state).unwrap_or_default()
        };
        let _ = self
            .store
            .write_pretty(&self.path, &payload, codes::AUDIT_WRITE_FAILED);
    }
}

/// Parse the current nested shape, dropping disallowed contact entries.
fn parse_current(root: serde_json::Value) -> AuditFile {
    let mut file: AuditFile = serde_json::from_value(root).unwrap_or_default();
    file.version = file.version.max(AUDIT_VERSION);
    sanitize(&mut file);
    file
}

/// Rewrite the legacy flat record list into the nested shape.
fn migrate_flat(records: Vec<serde_json::Value>) -> AuditFile {
    let mut file = AuditFile::default();
    for raw in records {
        let Ok(record) = serde_json::from_value::<LegacyRecord>(raw) else {
            continue;
        };
        if record.user.is_empty() || record.category.is_empty() || record.value.is_empty() {
            continue;
        }
        let first = record.first_recorded.unwrap_or_else(now_iso);
        let last = record.last_updated.unwrap_or_else(|| first.clone());
        file.users
            .entry(record.user)
            .or_default()
            .entry(record.category)
            .or_default()
            .push(AuditEntry {
                value: record.value,
                first_recorded: first,
                last_updated: last,
            });
    }
    sanitize(&mut file);
    file
}

/// Drop contact entries whose phone digit count falls outside the window.
fn sanitize(file: &mut AuditFile) {
    for categories in file.users.values_mut() {
        if let Some(contacts) = categories.get_mut("contacts") {
            contacts.retain(|e| privacy::contact_entry_ok(&e.value));
        }
    }
}
