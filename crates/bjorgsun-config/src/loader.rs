// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./bjorgsun.toml` > `~/.config/bjorgsun/bjorgsun.toml`
//! > `/etc/bjorgsun/bjorgsun.toml` with environment variable overrides via the
//! `BJORGSUN_` prefix, plus a handful of bare legacy names (`MEMORY_PATH`,
//! `OWNER_HANDLE`, ...) that predate the prefixed scheme.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BjorgsunConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/bjorgsun/bjorgsun.toml` (system-wide)
/// 3. `~/.config/bjorgsun/bjorgsun.toml` (user XDG config)
/// 4. `./bjorgsun.toml` (local directory)
/// 5. `BJORGSUN_*` environment variables
/// 6. Bare legacy environment names (`MEMORY_PATH`, `OWNER_*`, `PRIVATE_MODE`)
pub fn load_config() -> Result<BjorgsunConfig, figment::Error> {
    let config: BjorgsunConfig = Figment::new()
        .merge(Serialized::defaults(BjorgsunConfig::default()))
        .merge(Toml::file("/etc/bjorgsun/bjorgsun.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("bjorgsun/bjorgsun.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("bjorgsun.toml"))
        .merge(env_provider())
        .extract()?;
    Ok(apply_legacy_env(config))
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<BjorgsunConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BjorgsunConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BjorgsunConfig, figment::Error> {
    let config: BjorgsunConfig = Figment::new()
        .merge(Serialized::defaults(BjorgsunConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()?;
    Ok(apply_legacy_env(config))
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `BJORGSUN_OWNER_LAST_CODE`
/// must map to `owner.last_code`, not `owner.last.code`.
fn env_provider() -> Env {
    Env::prefixed("BJORGSUN_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: BJORGSUN_OWNER_LAST_CODE -> "owner_last_code"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("owner_", "owner.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("privacy_", "privacy.", 1)
            .replacen("memory_", "memory.", 1);
        mapped.into()
    })
}

/// Fold the bare legacy environment names into an extracted config.
///
/// These names predate the `BJORGSUN_` prefix and are still what the
/// desktop launcher exports, so they win over every file layer. Note that
/// `PRIVATE_MODE` only sets the informational flag; it does not and must
/// not disable conversation persistence.
fn apply_legacy_env(mut config: BjorgsunConfig) -> BjorgsunConfig {
    if let Ok(path) = std::env::var("MEMORY_PATH")
        && !path.trim().is_empty()
    {
        config.storage.memory_path = Some(path);
    }
    if let Ok(handle) = std::env::var("OWNER_HANDLE")
        && !handle.trim().is_empty()
    {
        config.owner.handle = handle;
    }
    if let Ok(name) = std::env::var("OWNER_NAME")
        && !name.trim().is_empty()
    {
        config.owner.name = name;
    }
    if let Ok(code) = std::env::var("OWNER_LAST_CODE")
        && !code.is_empty()
    {
        config.owner.last_code = Some(code);
    }
    if let Ok(aliases) = std::env::var("OWNER_SAFE_ALIASES") {
        let parsed: Vec<String> = aliases
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if !parsed.is_empty() {
            config.owner.safe_aliases = parsed;
        }
    }
    if let Ok(id) = std::env::var("OWNER_DISCORD_ID")
        && let Ok(id) = id.trim().parse::<u64>()
    {
        config.owner.discord_id = Some(id);
    }
    if let Ok(flag) = std::env::var("PRIVATE_MODE") {
        config.privacy.private_mode = env_flag(&flag);
    }
    config
}

/// Interpret a legacy env flag string as a boolean.
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use). Returns the Figment before extraction so callers can
/// inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BjorgsunConfig::default()))
        .merge(Toml::file("/etc/bjorgsun/bjorgsun.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("bjorgsun/bjorgsun.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("bjorgsun.toml"))
        .merge(env_provider())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn toml_string_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [owner]
            handle = "bjorn"
            last_code = "octopus"
            safe_aliases = ["bjorn#2994", "Bjorn"]

            [memory]
            cache_history = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.owner.last_code.as_deref(), Some("octopus"));
        assert_eq!(config.owner.safe_aliases.len(), 2);
        assert_eq!(config.memory.cache_history, 50);
        // Untouched sections keep their defaults.
        assert_eq!(config.agent.name, "Bjorgsun-26");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str(
            r#"
            [owner]
            handel = "bjorn"
            "#,
        );
        assert!(result.is_err(), "typo'd key must be rejected");
    }

    #[test]
    #[serial]
    fn legacy_env_names_override_files() {
        // SAFETY: test is serialized; no other thread reads the environment.
        unsafe {
            std::env::set_var("MEMORY_PATH", "/tmp/elsewhere/memory.json");
            std::env::set_var("OWNER_HANDLE", "bjorn_prime");
            std::env::set_var("OWNER_SAFE_ALIASES", "b1, b2 ,,");
            std::env::set_var("PRIVATE_MODE", "1");
        }

        let config = apply_legacy_env(BjorgsunConfig::default());

        unsafe {
            std::env::remove_var("MEMORY_PATH");
            std::env::remove_var("OWNER_HANDLE");
            std::env::remove_var("OWNER_SAFE_ALIASES");
            std::env::remove_var("PRIVATE_MODE");
        }

        assert_eq!(
            config.storage.memory_path.as_deref(),
            Some("/tmp/elsewhere/memory.json")
        );
        assert_eq!(config.owner.handle, "bjorn_prime");
        assert_eq!(config.owner.safe_aliases, vec!["b1", "b2"]);
        assert!(config.privacy.private_mode);
    }

    #[test]
    #[serial]
    fn private_mode_flag_parsing() {
        assert!(env_flag("1"));
        assert!(env_flag("TRUE"));
        assert!(env_flag(" yes "));
        assert!(!env_flag("0"));
        assert!(!env_flag(""));
        assert!(!env_flag("nope"));
    }
}
