// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bjorgsun — the persistent memory core of a single-owner AI companion.
//!
//! This crate assembles the conversation log, profile store, fact extractor,
//! preference audit log and relationship engine behind one [`Core`] facade.
//! Host processes (HUD, speech loop, chat bridges) construct a `Core` at
//! startup and route every memory operation through it.
//!
//! ```no_run
//! use bjorgsun::Core;
//! use bjorgsun_core::Role;
//!
//! let core = Core::boot().expect("boot");
//! let _ = core.log_turn(Role::User, "good morning");
//! let hits = core.search_memories("morning", 5);
//! println!("{} earlier mentions", hits.len());
//! core.shutdown();
//! ```

pub mod core;
pub mod logging;

pub use crate::core::{Core, DEFAULT_SEARCH_HITS};
pub use logging::init_tracing;
