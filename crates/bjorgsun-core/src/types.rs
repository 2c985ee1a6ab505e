// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Bjorgsun memory core.

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human user of the companion.
    User,
    /// The companion itself.
    Assistant,
    /// Internal bookkeeping turns (mood notes, scheduler pings, migrations).
    System,
}

impl Role {
    /// Convert to the on-disk string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Parse from the on-disk string form. Unknown roles fall back to `system`,
    /// matching the load-time normalization contract.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::System,
        }
    }
}

/// One entry of the conversation log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who spoke.
    pub role: Role,
    /// Non-empty utterance text.
    pub content: String,
    /// ISO 8601 UTC timestamp with a trailing `Z`.
    pub timestamp: String,
}

impl ConversationTurn {
    /// Create a turn stamped with the current UTC time.
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: now_iso(),
        }
    }
}

/// Current UTC time in ISO 8601 with millisecond precision and a `Z` suffix.
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Current UTC time in the human-readable form used for profile bookkeeping.
pub fn now_human() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Current UTC time in the compact form embedded in file names
/// (snapshots, quarantine renames).
pub fn file_stamp() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Reduce a user handle (or snapshot label) to a filesystem-safe key.
///
/// Every character outside `[A-Za-z0-9_-]` becomes `_`. The empty string is
/// returned as-is; callers decide their own fallback (the profile store
/// substitutes the owner handle).
pub fn fs_safe_key(handle: &str) -> String {
    handle
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
