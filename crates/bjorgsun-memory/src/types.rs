// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory file model and the load-time normalization boundary.
//!
//! On disk the memory file has grown through several shapes: a bare array of
//! turns, turns carrying `text` instead of `content`, entries without roles
//! or timestamps. All of that ambiguity is resolved here, at parse time;
//! past this module only well-formed [`MemoryFile`] values exist.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bjorgsun_core::{ConversationTurn, Role, now_iso};

/// Current memory file format version.
pub const MEMORY_VERSION: u64 = 2;
/// Maximum number of storytime entries kept.
pub const STORYTIME_CAP: usize = 200;
/// Migration marker recorded after the one-time legacy merge.
pub const LEGACY_MERGE_MIGRATION: &str = "legacy_merge_done";

/// Root object of the memory file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryFile {
    /// Format version, monotonically non-decreasing across loads.
    pub version: u64,
    /// The conversation log, oldest first.
    pub conversation: Vec<ConversationTurn>,
    /// Opaque story fragments, capped at [`STORYTIME_CAP`].
    pub storytime: Vec<serde_json::Value>,
    /// Completed migrations, name → completion timestamp.
    pub migrations: BTreeMap<String, String>,
}

impl Default for MemoryFile {
    fn default() -> Self {
        Self {
            version: MEMORY_VERSION,
            conversation: Vec::new(),
            storytime: Vec::new(),
            migrations: BTreeMap::new(),
        }
    }
}

impl MemoryFile {
    /// Normalize an on-disk JSON root into a well-formed memory file.
    ///
    /// A bare array root is wrapped as `{conversation: <seq>}`. The version
    /// is lifted to at least [`MEMORY_VERSION`] but never lowered. Turns are
    /// normalized individually and adjacent duplicates collapse.
    pub fn from_disk(root: serde_json::Value) -> Self {
        let mut file = MemoryFile::default();

        match root {
            serde_json::Value::Array(entries) => {
                file.conversation = normalize_turns(entries);
            }
            serde_json::Value::Object(mut map) => {
                if let Some(version) = map.get("version").and_then(serde_json::Value::as_u64) {
                    file.version = version.max(MEMORY_VERSION);
                }
                if let Some(serde_json::Value::Array(entries)) = map.remove("conversation") {
                    file.conversation = normalize_turns(entries);
                }
                if let Some(serde_json::Value::Array(stories)) = map.remove("storytime") {
                    file.storytime = stories;
                    cap_storytime(&mut file.storytime);
                }
                if let Some(serde_json::Value::Object(migrations)) = map.remove("migrations") {
                    for (name, stamp) in migrations {
                        if let serde_json::Value::String(stamp) = stamp {
                            let _ = file.migrations.insert(name, stamp);
                        }
                    }
                }
            }
            _ => {}
        }

        file
    }

    /// Serialize for persistence. Infallible for this shape.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"version": self.version}))
    }
}

/// Trim the storytime sequence to its newest [`STORYTIME_CAP`] entries.
pub fn cap_storytime(storytime: &mut Vec<serde_json::Value>) {
    if storytime.len() > STORYTIME_CAP {
        let excess = storytime.len() - STORYTIME_CAP;
        storytime.drain(..excess);
    }
}

/// Normalize raw turn entries and collapse adjacent duplicates.
pub fn normalize_turns(entries: Vec<serde_json::Value>) -> Vec<ConversationTurn> {
    let mut turns: Vec<ConversationTurn> = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(turn) = normalize_turn(entry)
            && turns
                .last()
                .is_none_or(|prev| prev.role != turn.role || prev.content != turn.content)
        {
            turns.push(turn);
        }
    }
    turns
}

/// Normalize a single raw entry.
///
/// Accepts `content` or `text`; a non-string content value is kept as its
/// JSON encoding. A missing role becomes `system`, a missing timestamp
/// becomes now. Entries whose content is empty after trimming are dropped.
fn normalize_turn(entry: serde_json::Value) -> Option<ConversationTurn> {
    let map = entry.as_object()?;

    let raw_content = map.get("content").or_else(|| map.get("text"))?;
    let content = match raw_content {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => return None,
        other => other.to_string(),
    };
    if content.is_empty() {
        return None;
    }

    let role = map
        .get("role")
        .and_then(serde_json::Value::as_str)
        .map_or(Role::System, Role::from_str_value);

    let timestamp = map
        .get("timestamp")
        .and_then(serde_json::Value::as_str)
        .map_or_else(now_iso, str::to_string);

    Some(ConversationTurn {
        role,
        content,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_root_is_wrapped() {
        let root = serde_json::json!([
            {"role": "user", "content": "hi", "timestamp": "2026-01-01T00:00:00.000Z"},
            {"role": "assistant", "content": "hello"},
        ]);
        let file = MemoryFile::from_disk(root);
        assert_eq!(file.version, MEMORY_VERSION);
        assert_eq!(file.conversation.len(), 2);
        assert_eq!(file.conversation[0].content, "hi");
    }

    #[test]
    fn text_key_and_missing_role_are_normalized() {
        let root = serde_json::json!({"conversation": [
            {"text": "  legacy note  "},
        ]});
        let file = MemoryFile::from_disk(root);
        assert_eq!(file.conversation.len(), 1);
        assert_eq!(file.conversation[0].role, Role::System);
        assert_eq!(file.conversation[0].content, "legacy note");
        assert!(file.conversation[0].timestamp.ends_with('Z'));
    }

    #[test]
    fn non_string_content_keeps_its_json_encoding() {
        let root = serde_json::json!({"conversation": [
            {"role": "system", "content": {"mood": "stormy"}},
        ]});
        let file = MemoryFile::from_disk(root);
        assert_eq!(file.conversation.len(), 1);
        assert!(file.conversation[0].content.contains("stormy"));
    }

    #[test]
    fn empty_content_entries_are_dropped() {
        let root = serde_json::json!({"conversation": [
            {"role": "user", "content": "   "},
            {"role": "user"},
            {"role": "user", "content": "kept"},
        ]});
        let file = MemoryFile::from_disk(root);
        assert_eq!(file.conversation.len(), 1);
        assert_eq!(file.conversation[0].content, "kept");
    }

    #[test]
    fn adjacent_duplicates_collapse_on_load() {
        let root = serde_json::json!({"conversation": [
            {"role": "user", "content": "hi"},
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hi"},
        ]});
        let file = MemoryFile::from_disk(root);
        assert_eq!(file.conversation.len(), 2, "same content, different role survives");
    }

    #[test]
    fn version_is_lifted_never_lowered() {
        let old = MemoryFile::from_disk(serde_json::json!({"version": 1, "conversation": []}));
        assert_eq!(old.version, 2);
        let newer = MemoryFile::from_disk(serde_json::json!({"version": 3, "conversation": []}));
        assert_eq!(newer.version, 3);
    }

    #[test]
    fn storytime_is_capped_on_load() {
        let stories: Vec<serde_json::Value> =
            (0..STORYTIME_CAP + 25).map(|i| serde_json::json!({"i": i})).collect();
        let file = MemoryFile::from_disk(serde_json::json!({"storytime": stories}));
        assert_eq!(file.storytime.len(), STORYTIME_CAP);
        // Oldest entries were dropped.
        assert_eq!(file.storytime[0]["i"], 25);
    }

    #[test]
    fn migrations_roundtrip() {
        let root = serde_json::json!({
            "migrations": {"legacy_merge_done": "2026-01-01T00:00:00.000Z"},
        });
        let file = MemoryFile::from_disk(root);
        assert!(file.migrations.contains_key(LEGACY_MERGE_MIGRATION));

        let back = file.to_value();
        assert_eq!(
            back["migrations"][LEGACY_MERGE_MIGRATION],
            "2026-01-01T00:00:00.000Z"
        );
    }
}
