// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user profiles for the Bjorgsun companion.
//!
//! A profile holds the small facts the companion has learned about a user,
//! bucketed under a strict six-category allow-list, plus the relationship
//! status and guardian bookkeeping the relationship engine operates on.
//! Facts arrive either explicitly or through the regex [`extractor`], and
//! every recorded fact is mirrored into the preference audit log.

pub mod extractor;
pub mod store;
pub mod types;

pub use extractor::FactExtractor;
pub use store::ProfileStore;
pub use types::{FactCategory, GuardianState, Relationship, UserProfile};
