// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end core testing.
//!
//! `CoreHarness` assembles a complete memory core over a temp data
//! directory with a scripted override prompt, so integration tests can
//! drive the whole caller-facing surface without a terminal or a fixed
//! on-disk location. Tests are independent and order-insensitive.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bjorgsun::Core;
use bjorgsun_config::BjorgsunConfig;
use bjorgsun_core::BjorgsunError;
use bjorgsun_guardian::SecretPrompt;
use bjorgsun_store::DataPaths;

/// Scripted answers for the override challenge, consumed front to back.
/// When the script runs out, the prompt behaves like a failed read.
pub struct ScriptedPrompt {
    answers: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    /// A prompt that answers the given strings in order.
    pub fn answering<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
        }
    }

    /// A prompt that always fails to read (no TTY).
    pub fn silent() -> Self {
        Self::answering(Vec::<String>::new())
    }
}

impl SecretPrompt for ScriptedPrompt {
    fn ask(&self, _prompt: &str) -> Option<String> {
        let mut answers = self.answers.lock().expect("prompt script poisoned");
        if answers.is_empty() {
            None
        } else {
            Some(answers.remove(0))
        }
    }
}

/// Builder for creating test cores with configurable options.
pub struct CoreHarnessBuilder {
    owner_handle: String,
    last_code: Option<String>,
    cache_history: usize,
    prompt_answers: Vec<String>,
}

impl CoreHarnessBuilder {
    fn new() -> Self {
        Self {
            owner_handle: "bjorn".to_string(),
            last_code: Some("octopus".to_string()),
            cache_history: 100,
            prompt_answers: Vec::new(),
        }
    }

    /// Set the owner handle.
    pub fn with_owner(mut self, handle: impl Into<String>) -> Self {
        self.owner_handle = handle.into();
        self
    }

    /// Set (or clear) the override code.
    pub fn with_last_code(mut self, code: Option<&str>) -> Self {
        self.last_code = code.map(str::to_string);
        self
    }

    /// Set the at-rest retention window.
    pub fn with_cache_history(mut self, cache_history: usize) -> Self {
        self.cache_history = cache_history;
        self
    }

    /// Script answers for the override challenge.
    pub fn with_prompt_answers<S: Into<String>>(
        mut self,
        answers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.prompt_answers = answers.into_iter().map(Into::into).collect();
        self
    }

    /// Build the harness: temp dir, config, scripted prompt, core.
    pub fn build(self) -> Result<CoreHarness, BjorgsunError> {
        let temp_dir = tempfile::TempDir::new().map_err(BjorgsunError::storage)?;

        let mut config = BjorgsunConfig::default();
        config.owner.handle = self.owner_handle;
        config.owner.last_code = self.last_code;
        config.storage.data_dir = temp_dir.path().to_string_lossy().into_owned();
        config.memory.cache_history = self.cache_history;

        let prompt = ScriptedPrompt::answering(self.prompt_answers);
        let core = Core::init_with_prompt(config.clone(), Box::new(prompt))?;

        Ok(CoreHarness {
            core,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete core over a temp data directory.
pub struct CoreHarness {
    /// The assembled core under test.
    pub core: Core,
    /// The configuration the core was built from.
    pub config: BjorgsunConfig,
    _temp_dir: tempfile::TempDir,
}

impl CoreHarness {
    /// Start building a harness.
    pub fn builder() -> CoreHarnessBuilder {
        CoreHarnessBuilder::new()
    }

    /// A harness with defaults: owner `bjorn`, code `octopus`, no scripted
    /// prompt answers.
    pub fn new() -> Result<Self, BjorgsunError> {
        Self::builder().build()
    }

    /// The data root this core persists under.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.storage.data_dir)
    }

    /// Resolved data paths for direct file assertions.
    pub fn paths(&self) -> DataPaths {
        DataPaths::from_config(&self.config.storage)
    }

    /// Rebuild a second core over the same data directory (reload tests).
    /// The scripted prompt starts fresh with the given answers.
    pub fn reopen_with_answers<S: Into<String>>(
        &self,
        answers: impl IntoIterator<Item = S>,
    ) -> Result<Core, BjorgsunError> {
        Core::init_with_prompt(
            self.config.clone(),
            Box::new(ScriptedPrompt::answering(answers)),
        )
    }

    /// Read a persisted file under the data root as JSON.
    pub fn read_json(&self, relative: impl AsRef<Path>) -> Option<serde_json::Value> {
        let raw = std::fs::read_to_string(self.data_dir().join(relative)).ok()?;
        serde_json::from_str(&raw).ok()
    }
}
