// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `Core` facade: the only surface external collaborators see.
//!
//! The HUD, speech I/O, chat bridges and the prompt builder all hold a
//! shared `Core` and call the operations below; none of them ever touch the
//! data files directly. Construction is explicit (`init`/`shutdown`), so
//! tests can run any number of cores over separate data directories.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use bjorgsun_audit::PreferenceAuditLog;
use bjorgsun_config::model::StorageConfig;
use bjorgsun_config::{BjorgsunConfig, OwnerIdentity};
use bjorgsun_core::{BjorgsunError, ConversationTurn, Role};
use bjorgsun_guardian::{ApologyOutcome, RelationshipEngine, SecretPrompt, TtyPrompt};
use bjorgsun_memory::ConversationLog;
use bjorgsun_profile::{FactCategory, FactExtractor, ProfileStore, Relationship, UserProfile};
use bjorgsun_store::{DataPaths, Issue, IssueLog, JsonStore, Severity, codes};

/// Default number of hits returned by memory search.
pub const DEFAULT_SEARCH_HITS: usize = 5;

/// The assembled memory core.
pub struct Core {
    owner: OwnerIdentity,
    log: ConversationLog,
    profiles: Arc<ProfileStore>,
    extractor: FactExtractor,
    engine: RelationshipEngine,
    issues: IssueLog,
}

impl Core {
    /// Boot from the standard configuration hierarchy. Configuration
    /// failures are rendered to stderr, recorded in the issue log at the
    /// default location, and returned as an error.
    pub fn boot() -> Result<Self, BjorgsunError> {
        match bjorgsun_config::load_and_validate() {
            Ok(config) => Self::init(config),
            Err(errors) => {
                bjorgsun_config::render_errors(&errors);
                let paths = DataPaths::from_config(&StorageConfig::default());
                IssueLog::new(paths.issue_log()).record(
                    Issue::new(
                        codes::BOOT_CONFIG_FAILED,
                        Severity::Error,
                        "boot",
                        "configuration failed to load",
                    )
                    .with_detail(
                        errors
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join("; "),
                    ),
                );
                Err(BjorgsunError::Config(format!(
                    "{} configuration error(s)",
                    errors.len()
                )))
            }
        }
    }

    /// Assemble the core from an explicit configuration, prompting on the
    /// terminal for the father-override challenge.
    pub fn init(config: BjorgsunConfig) -> Result<Self, BjorgsunError> {
        Self::init_with_prompt(config, Box::new(TtyPrompt))
    }

    /// Assemble the core with an injected override prompt (test harnesses).
    pub fn init_with_prompt(
        config: BjorgsunConfig,
        prompt: Box<dyn SecretPrompt>,
    ) -> Result<Self, BjorgsunError> {
        let paths = DataPaths::from_config(&config.storage);
        std::fs::create_dir_all(paths.root()).map_err(BjorgsunError::storage)?;

        let issues = IssueLog::new(paths.issue_log());
        let store = JsonStore::new(issues.clone(), paths.exports_dir());
        let owner = OwnerIdentity::from_config(&config.owner);

        let log = ConversationLog::open(store.clone(), &paths, config.memory.cache_history);
        let audit = PreferenceAuditLog::open(store.clone(), paths.preferences_log());
        let profiles = Arc::new(ProfileStore::open(
            store,
            paths,
            audit,
            owner.handle().to_string(),
        ));
        let extractor = FactExtractor::new(Arc::clone(&profiles));
        let engine = RelationshipEngine::new(
            Arc::clone(&profiles),
            owner.clone(),
            config.owner.last_code.clone(),
            prompt,
        );

        info!(
            agent = %config.agent.name,
            owner = %owner.handle(),
            turns = log.len(),
            "memory core initialized"
        );

        Ok(Self {
            owner,
            log,
            profiles,
            extractor,
            engine,
            issues,
        })
    }

    /// Flush outstanding state before the process exits.
    pub fn shutdown(&self) {
        let _ = self.log.save();
        info!("memory core shut down");
    }

    // ---- Conversation surface ----

    /// Append a turn and persist it.
    pub fn log_turn(&self, role: Role, content: &str) -> bool {
        self.log.append_and_save(role, content)
    }

    /// JSON-encode an object and log it as a system turn.
    pub fn log_system_object(&self, object: &serde_json::Value) -> bool {
        self.log.append_system(object)
    }

    /// Append a story fragment to the storytime buffer.
    pub fn log_story(&self, object: serde_json::Value) {
        self.log.append_story(object);
    }

    /// Up to `max_hits` historical turns containing every query term, in
    /// chronological order.
    pub fn search_memories(&self, query: &str, max_hits: usize) -> Vec<ConversationTurn> {
        self.log.search(query, max_hits)
    }

    /// Pop up to `n` newest turns (suppressing synthetic prompts) and save.
    pub fn prune_recent(&self, n: usize) -> usize {
        self.log.prune_recent(n)
    }

    /// Toggle conversation persistence.
    pub fn set_persistence(&self, enabled: bool) {
        self.log.set_persistence(enabled);
    }

    /// Current persistence toggle state.
    pub fn get_persistence(&self) -> bool {
        self.log.persistence()
    }

    /// Write a timestamped snapshot of the memory into the exports folder.
    pub fn export_snapshot(&self, label: Option<&str>) -> Option<PathBuf> {
        self.log.export_snapshot(label)
    }

    // ---- Profile surface ----

    /// Read-or-create a profile. `None` means the owner.
    pub fn get_profile(&self, user: Option<&str>) -> UserProfile {
        self.profiles.get(self.user_or_owner(user))
    }

    /// Create the profile if needed and upsert the display name.
    pub fn ensure_profile(&self, user: Option<&str>, display_name: Option<&str>) {
        self.profiles
            .ensure_profile(self.user_or_owner(user), display_name);
    }

    /// Run the fact extractor over one utterance. Returns whether anything
    /// new was learned.
    pub fn learn_from_text(&self, text: &str, user: Option<&str>) -> bool {
        self.extractor
            .learn_from_text(text, self.user_or_owner(user))
    }

    /// Record a fact under a category name. Unknown categories and empty
    /// values are rejected with `false`, never raised.
    pub fn record_fact(&self, category: &str, value: &str, user: Option<&str>) -> bool {
        match FactCategory::parse(category) {
            Some(category) => {
                self.profiles
                    .record_fact(category, value, self.user_or_owner(user))
            }
            None => false,
        }
    }

    /// A short human line describing what is known about a user.
    pub fn summarize_user(&self, user: Option<&str>, per_category: usize) -> String {
        self.profiles
            .summarize(self.user_or_owner(user), per_category)
    }

    // ---- Relationship & guardian surface ----

    /// Explicitly assign a relationship status by name.
    pub fn set_relationship(&self, user: &str, status: &str) -> bool {
        self.engine.set_relationship(user, status)
    }

    /// Current relationship status.
    pub fn get_relationship(&self, user: Option<&str>) -> Relationship {
        self.engine.relationship(self.user_or_owner(user))
    }

    /// Count an interaction (with optional auto-promotion on mention) and
    /// return the new total.
    pub fn record_interaction(&self, user: Option<&str>, weight: u64, mentioned: bool) -> u64 {
        self.engine
            .record_interaction(self.user_or_owner(user), weight, mentioned)
    }

    /// Register an incident against a user.
    pub fn guardian_register_incident(
        &self,
        user: Option<&str>,
        reason: Option<&str>,
        severity: Option<&str>,
    ) {
        self.engine.register_incident(
            self.user_or_owner(user),
            reason.unwrap_or("unspecified"),
            severity.unwrap_or("unspecified"),
        );
    }

    /// Whether an incident is pending for a user.
    pub fn guardian_pending(&self, user: Option<&str>) -> bool {
        self.engine.pending(self.user_or_owner(user))
    }

    /// Process an apology. An explicit relationship name overrides the
    /// stored one for budget purposes; unknown names fall back to stored.
    pub fn process_apology(&self, user: Option<&str>, relationship: Option<&str>) -> ApologyOutcome {
        let explicit = relationship.and_then(Relationship::parse);
        self.engine
            .process_apology(self.user_or_owner(user), explicit)
    }

    /// Administrative reset of the pending incident.
    pub fn clear_pending_incident(&self, user: Option<&str>) {
        self.engine.clear_pending_incident(self.user_or_owner(user));
    }

    /// Run the one-shot owner challenge authorizing a `father` assignment.
    pub fn verify_father_override(&self, reason: Option<&str>) -> bool {
        self.engine.verify_father_override(reason.unwrap_or(""))
    }

    // ---- Introspection ----

    /// The resolved owner identity.
    pub fn owner(&self) -> &OwnerIdentity {
        &self.owner
    }

    /// The issue log the core reports to.
    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    /// Number of turns currently held in memory.
    pub fn conversation_len(&self) -> usize {
        self.log.len()
    }

    fn user_or_owner<'a>(&'a self, user: Option<&'a str>) -> &'a str {
        match user {
            Some(user) if !user.trim().is_empty() => user,
            _ => self.owner.handle(),
        }
    }
}
