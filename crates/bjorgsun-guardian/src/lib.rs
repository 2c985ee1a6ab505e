// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relationship and guardian engine for the Bjorgsun companion.
//!
//! Drives auto-promotion, explicit relationship assignment (with the
//! owner-gated `father` status), incident registration, and the per-user
//! forgiveness budget.

pub mod fsm;
pub mod gate;

pub use fsm::{ApologyOutcome, ApologyStatus, RelationshipEngine};
pub use gate::{OverrideGate, SecretPrompt, TtyPrompt};
