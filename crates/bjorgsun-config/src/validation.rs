// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty handles and a sane retention window.

use crate::diagnostic::ConfigError;
use crate::model::BjorgsunConfig;

/// Log levels accepted by `agent.log_level`.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BjorgsunConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.agent.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "agent.name must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.agent.log_level.trim()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.agent.log_level
            ),
        });
    }

    if config.owner.handle.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "owner.handle must not be empty".to_string(),
        });
    }

    if let Some(code) = &config.owner.last_code
        && code.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "owner.last_code must not be blank when set".to_string(),
        });
    }

    if config.storage.data_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.data_dir must not be empty".to_string(),
        });
    }

    if let Some(path) = &config.storage.memory_path
        && path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "storage.memory_path must not be blank when set".to_string(),
        });
    }

    if config.memory.cache_history == 0 {
        errors.push(ConfigError::Validation {
            message: "memory.cache_history must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
