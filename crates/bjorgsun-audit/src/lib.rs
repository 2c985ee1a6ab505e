// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Preference audit trail for the Bjorgsun memory core.
//!
//! Every fact the profile store records is mirrored here, grouped by user
//! and category with first/last-seen timestamps, so the owner can always
//! answer "what does the companion know, and since when?".

pub mod log;

pub use log::{AUDIT_VERSION, AuditEntry, PreferenceAuditLog};
