// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crash-safe JSON persistence for the Bjorgsun memory core.
//!
//! Single-writer discipline: every persisted file is owned by exactly one
//! subsystem, which snapshots its payload under its own lock and hands it to
//! [`JsonStore`] with the lock released. Files are opened, written, and
//! closed within a single operation; nothing holds a long-lived handle.
//!
//! **Do NOT write any of the data files from outside the owning subsystem.**

pub mod atomic;
pub mod issues;
pub mod paths;

pub use atomic::JsonStore;
pub use issues::{Issue, IssueLog, Severity, codes};
pub use paths::DataPaths;
