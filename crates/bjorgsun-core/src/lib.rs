// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Bjorgsun companion memory core.
//!
//! This crate provides the error type, the conversation turn model, and the
//! small shared helpers (timestamps, filesystem-safe keys) used throughout
//! the Bjorgsun workspace.

pub mod error;
pub mod privacy;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BjorgsunError;
pub use types::{ConversationTurn, Role, file_stamp, fs_safe_key, now_human, now_iso};
