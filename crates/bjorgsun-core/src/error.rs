// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Bjorgsun memory core.

use thiserror::Error;

/// The primary error type used across the Bjorgsun core crates.
///
/// Most runtime operations are fail-silent per the persistence contract
/// (a failed save is logged and the data stays in memory); this type is
/// reserved for the places that legitimately return `Result`, chiefly
/// configuration loading and core initialization.
#[derive(Debug, Error)]
pub enum BjorgsunError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage errors (directory creation, file replace, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A caller handed the core an argument it cannot use.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BjorgsunError {
    /// Wrap an I/O error as a storage error.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        BjorgsunError::Storage {
            source: Box::new(source),
        }
    }
}
