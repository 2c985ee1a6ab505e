// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test utilities for the Bjorgsun workspace.
//!
//! Provides [`CoreHarness`] for end-to-end tests against a complete core
//! over a temp data directory, and [`ScriptedPrompt`] for driving the
//! father-override challenge without a terminal.

pub mod harness;

pub use harness::{CoreHarness, CoreHarnessBuilder, ScriptedPrompt};
