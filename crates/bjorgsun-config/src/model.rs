// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Bjorgsun memory core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Bjorgsun configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BjorgsunConfig {
    /// Companion identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Owner identity settings.
    #[serde(default)]
    pub owner: OwnerConfig,

    /// On-disk data layout settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Privacy toggles.
    #[serde(default)]
    pub privacy: PrivacyConfig,

    /// Conversation memory retention settings.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Companion identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the companion.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "Bjorgsun-26".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Owner identity configuration.
///
/// The owner is the single human the companion belongs to. Several keys may
/// refer to them (chat handle, display name, an external service's numeric
/// id, nicknames); everything listed here is folded into one identity so the
/// core can answer "is this user the owner?" without prompting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OwnerConfig {
    /// Primary user handle of the owner. Also the fallback profile key when
    /// a caller passes an empty user.
    #[serde(default = "default_owner_handle")]
    pub handle: String,

    /// Human display name of the owner.
    #[serde(default = "default_owner_name")]
    pub name: String,

    /// Secret answer for the father-override challenge. `None` disables the
    /// override entirely (every request is denied).
    #[serde(default)]
    pub last_code: Option<String>,

    /// Additional handles that safely identify the owner (nicknames,
    /// per-service usernames). May, but need not, repeat `handle`.
    #[serde(default)]
    pub safe_aliases: Vec<String>,

    /// Numeric id of the owner on the external chat service, if known.
    #[serde(default)]
    pub discord_id: Option<u64>,
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            handle: default_owner_handle(),
            name: default_owner_name(),
            last_code: None,
            safe_aliases: Vec::new(),
            discord_id: None,
        }
    }
}

fn default_owner_handle() -> String {
    "bjorn".to_string()
}

fn default_owner_name() -> String {
    "Bjorn".to_string()
}

/// On-disk data layout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory for all persisted data (memory file, user profiles,
    /// preference audit log, exports, issue log).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Explicit override for the memory file location. When unset, the
    /// memory file lives at `<data_dir>/memory.json`.
    #[serde(default)]
    pub memory_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            memory_path: None,
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

/// Privacy configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrivacyConfig {
    /// Informational flag only. The owner wants the companion to always
    /// remember, so conversation persistence starts ON no matter what this
    /// is set to; only an explicit runtime `set_persistence(false)` turns
    /// persistence off. Surfaces (HUD, chat bridges) may still consult this
    /// flag to mute what they display.
    #[serde(default)]
    pub private_mode: bool,
}

/// Conversation memory retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Number of conversation turns kept at rest. The in-memory window is
    /// three times this, to absorb bursts between saves.
    #[serde(default = "default_cache_history")]
    pub cache_history: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            cache_history: default_cache_history(),
        }
    }
}

fn default_cache_history() -> usize {
    26_000
}
