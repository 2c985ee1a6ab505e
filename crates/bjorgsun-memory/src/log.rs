// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bounded, durable conversation log.
//!
//! Appends are deduplicated against the immediately prior turn, the
//! in-memory window holds up to three times the at-rest retention to absorb
//! bursts between saves, and every save goes through the atomic store.
//!
//! Persistence starts ON regardless of any privacy flag — the owner wants
//! the companion to always remember. Only an explicit
//! [`ConversationLog::set_persistence`] call turns it off, and while it is
//! off `save` is a silent no-op.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use bjorgsun_core::{ConversationTurn, Role, file_stamp, fs_safe_key, now_iso};
use bjorgsun_store::{DataPaths, JsonStore, codes};

use crate::search;
use crate::types::{LEGACY_MERGE_MIGRATION, MemoryFile, cap_storytime, normalize_turns};

/// Maximum length of a sanitized snapshot label.
const SNAPSHOT_LABEL_MAX: usize = 40;

/// The conversation log and storytime buffer, backed by the memory file.
pub struct ConversationLog {
    store: JsonStore,
    memory_path: PathBuf,
    legacy_path: PathBuf,
    exports_dir: PathBuf,
    cache_history: usize,
    state: Mutex<MemoryFile>,
    persist: AtomicBool,
}

impl ConversationLog {
    /// Open the log: read the memory file (rebuilding from defaults if it is
    /// missing or quarantined), normalize it, and run the one-time legacy
    /// merge if a legacy file is present.
    pub fn open(store: JsonStore, paths: &DataPaths, cache_history: usize) -> Self {
        let log = Self {
            store,
            memory_path: paths.memory_file().to_path_buf(),
            legacy_path: paths.legacy_memory_file(),
            exports_dir: paths.exports_dir(),
            cache_history: cache_history.max(1),
            state: Mutex::new(MemoryFile::default()),
            persist: AtomicBool::new(true),
        };
        log.load();
        log
    }

    /// Rebuild the in-memory state from disk. Called once at open; safe to
    /// call again (the legacy merge is guarded by its migration marker).
    pub fn load(&self) {
        let mut file = self
            .store
            .read_or_quarantine(&self.memory_path)
            .map(MemoryFile::from_disk)
            .unwrap_or_default();

        let mut dirty = false;
        if !file.migrations.contains_key(LEGACY_MERGE_MIGRATION)
            && let Some(legacy_root) = self.store.read_or_quarantine(&self.legacy_path)
        {
            let legacy_turns = match legacy_root {
                serde_json::Value::Array(entries) => normalize_turns(entries),
                serde_json::Value::Object(mut map) => match map.remove("conversation") {
                    Some(serde_json::Value::Array(entries)) => normalize_turns(entries),
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            };
            let merged_from = legacy_turns.len();
            file.conversation = merge_unique(legacy_turns, std::mem::take(&mut file.conversation));
            let _ = file
                .migrations
                .insert(LEGACY_MERGE_MIGRATION.to_string(), now_iso());
            dirty = true;
            info!(turns = merged_from, "legacy memory merged");
        }

        trim_front(&mut file.conversation, self.cache_history * 3);

        *self.state.lock().expect("memory lock poisoned") = file;
        if dirty {
            let _ = self.save();
        }
    }

    /// Append a turn. Rejects content that is empty after trimming and exact
    /// `(role, content)` repeats of the immediately prior turn. Returns
    /// whether the turn was appended.
    pub fn append(&self, role: Role, content: &str) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }

        let mut state = self.state.lock().expect("memory lock poisoned");
        if state
            .conversation
            .last()
            .is_some_and(|prev| prev.role == role && prev.content == content)
        {
            debug!(role = role.as_str(), "adjacent duplicate turn dropped");
            return false;
        }

        state.conversation.push(ConversationTurn::now(role, content));
        trim_front(&mut state.conversation, self.cache_history * 3);
        true
    }

    /// Persist the newest `cache_history` turns. No-op while persistence is
    /// off. Returns whether the state is durable (a no-op counts).
    pub fn save(&self) -> bool {
        if !self.persist.load(Ordering::Relaxed) {
            return true;
        }

        // Snapshot under the lock, write with the lock released.
        let payload = {
            let state = self.state.lock().expect("memory lock poisoned");
            let mut persisted = state.clone();
            trim_front(&mut persisted.conversation, self.cache_history);
            persisted.to_value()
        };
        self.store
            .write_pretty(&self.memory_path, &payload, codes::MEM_WRITE_FAILED)
    }

    /// Append then save.
    pub fn append_and_save(&self, role: Role, content: &str) -> bool {
        let appended = self.append(role, content);
        if appended {
            let _ = self.save();
        }
        appended
    }

    /// JSON-encode an object and append it as a system turn.
    pub fn append_system(&self, object: &serde_json::Value) -> bool {
        let encoded = match object {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.append_and_save(Role::System, &encoded)
    }

    /// Append a story fragment, keeping only the newest 200, and flush if
    /// persistence is on.
    pub fn append_story(&self, object: serde_json::Value) {
        {
            let mut state = self.state.lock().expect("memory lock poisoned");
            state.storytime.push(object);
            cap_storytime(&mut state.storytime);
        }
        let _ = self.save();
    }

    /// Write a timestamped copy of the current memory into the exports
    /// folder. Returns the snapshot path, or `None` on failure (the failure
    /// is logged as an issue, never raised).
    pub fn export_snapshot(&self, label: Option<&str>) -> Option<PathBuf> {
        let stamp = file_stamp();
        let suffix = label
            .map(fs_safe_key)
            .filter(|l| !l.is_empty())
            .map(|mut l| {
                l.truncate(SNAPSHOT_LABEL_MAX);
                format!("_{l}")
            })
            .unwrap_or_default();
        let target = self
            .exports_dir
            .join(format!("memory_export_{stamp}{suffix}.json"));

        let payload = self.state.lock().expect("memory lock poisoned").to_value();
        if self
            .store
            .write_pretty(&target, &payload, codes::MEM_EXPORT_FAILED)
        {
            Some(target)
        } else {
            None
        }
    }

    /// Turn the persistence toggle on or off.
    pub fn set_persistence(&self, enabled: bool) {
        info!(enabled, "conversation persistence toggled");
        self.persist.store(enabled, Ordering::Relaxed);
    }

    /// Current state of the persistence toggle.
    pub fn persistence(&self) -> bool {
        self.persist.load(Ordering::Relaxed)
    }

    /// Pop up to `n` newest turns and save. Used to keep synthetic prompts
    /// out of the visible history. Returns how many turns were removed.
    pub fn prune_recent(&self, n: usize) -> usize {
        let removed = {
            let mut state = self.state.lock().expect("memory lock poisoned");
            let keep = state.conversation.len().saturating_sub(n);
            let removed = state.conversation.len() - keep;
            state.conversation.truncate(keep);
            removed
        };
        if removed > 0 {
            let _ = self.save();
        }
        removed
    }

    /// Term-AND retrieval over the log; see [`crate::search`].
    pub fn search(&self, query: &str, max_hits: usize) -> Vec<ConversationTurn> {
        let state = self.state.lock().expect("memory lock poisoned");
        search::search(&state.conversation, query, max_hits)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Number of turns currently held in memory.
    pub fn len(&self) -> usize {
        self.state.lock().expect("memory lock poisoned").conversation.len()
    }

    /// Whether the log holds no turns.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the current in-memory turns, oldest first.
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.state.lock().expect("memory lock poisoned").conversation.clone()
    }

    /// Number of storytime entries currently held.
    pub fn story_len(&self) -> usize {
        self.state.lock().expect("memory lock poisoned").storytime.len()
    }
}

/// Drop the oldest entries until at most `cap` remain.
fn trim_front(turns: &mut Vec<ConversationTurn>, cap: usize) {
    if turns.len() > cap {
        let excess = turns.len() - cap;
        turns.drain(..excess);
    }
}

/// Concatenate two turn sequences keeping the first occurrence of every
/// `(role, content)` pair. Used by the one-time legacy merge.
fn merge_unique(
    first: Vec<ConversationTurn>,
    second: Vec<ConversationTurn>,
) -> Vec<ConversationTurn> {
    let mut seen: std::collections::HashSet<(Role, String)> = std::collections::HashSet::new();
    let mut merged = Vec::with_capacity(first.len() + second.len());
    for turn in first.into_iter().chain(second) {
        if seen.insert((turn.role, turn.content.clone())) {
            merged.push(turn);
        }
    }
    merged
}
