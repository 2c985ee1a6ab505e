// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazy, cached per-user profile store.
//!
//! Profiles are keyed by a filesystem-safe derivation of the user handle and
//! created on first access. Every mutation flushes the owning profile file;
//! recorded facts are mirrored into the preference audit log.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use bjorgsun_audit::PreferenceAuditLog;
use bjorgsun_core::{fs_safe_key, now_human, privacy};
use bjorgsun_store::{DataPaths, JsonStore, codes};

use crate::types::{FACT_MAX_CHARS, FactCategory, Relationship, UserProfile};

/// The per-user profile store.
pub struct ProfileStore {
    store: JsonStore,
    paths: DataPaths,
    audit: PreferenceAuditLog,
    owner_handle: String,
    cache: Mutex<HashMap<String, UserProfile>>,
}

impl ProfileStore {
    /// Create the store. Nothing is read until a profile is first accessed.
    pub fn open(
        store: JsonStore,
        paths: DataPaths,
        audit: PreferenceAuditLog,
        owner_handle: impl Into<String>,
    ) -> Self {
        Self {
            store,
            paths,
            audit,
            owner_handle: owner_handle.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Filesystem-safe profile key for a user handle. Empty handles fall
    /// back to the configured owner.
    pub fn safe_key(&self, user: &str) -> String {
        let key = fs_safe_key(user.trim());
        if key.is_empty() {
            fs_safe_key(&self.owner_handle)
        } else {
            key
        }
    }

    /// Read-or-create the profile for `user` and return a clone.
    pub fn get(&self, user: &str) -> UserProfile {
        let key = self.safe_key(user);
        self.ensure_loaded(&key, user);
        let cache = self.cache.lock().expect("profile cache poisoned");
        cache.get(&key).expect("profile just loaded").clone()
    }

    /// Upsert the display name; creates the profile on first access.
    pub fn ensure_profile(&self, user: &str, display_name: Option<&str>) {
        let current = self.get(user);
        if let Some(name) = display_name
            && !name.is_empty()
            && current.display_name != name
        {
            self.modify(user, |profile| {
                profile.display_name = name.to_string();
            });
        }
    }

    /// Record a fact under a category. Returns whether the value was new.
    ///
    /// The value is whitespace-collapsed, truncated to 240 characters, and
    /// deduplicated case-insensitively against the existing bucket. Contact
    /// entries outside the phone-digit window are rejected outright. New
    /// values flush the profile and are mirrored into the audit log.
    pub fn record_fact(&self, category: FactCategory, value: &str, user: &str) -> bool {
        let value = clean_fact(value);
        if value.is_empty() {
            return false;
        }
        if category == FactCategory::Contacts && !privacy::contact_entry_ok(&value) {
            debug!(user, "contact entry outside the allowed window, dropped");
            return false;
        }

        let key = self.safe_key(user);
        let was_new = self.modify(user, |profile| {
            let bucket = profile.facts.entry(category).or_default();
            if bucket.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
                false
            } else {
                bucket.push(value.clone());
                true
            }
        });

        if was_new {
            self.audit.record(&category.to_string(), &value, &key);
        }
        was_new
    }

    /// A short human line summarizing what is known about a user: up to
    /// `per_category` values each from preferences, habits, appearance and
    /// location, plus the relationship unless it is still the default.
    pub fn summarize(&self, user: &str, per_category: usize) -> String {
        let profile = self.get(user);
        let mut parts: Vec<String> = Vec::new();

        for category in [
            FactCategory::Preferences,
            FactCategory::Habits,
            FactCategory::Appearance,
            FactCategory::Location,
        ] {
            if let Some(values) = profile.facts.get(&category)
                && !values.is_empty()
            {
                let sample: Vec<&str> = values
                    .iter()
                    .take(per_category)
                    .map(String::as_str)
                    .collect();
                parts.push(format!("{category}: {}", sample.join(", ")));
            }
        }

        if profile.relationship != Relationship::DEFAULT {
            parts.push(format!("Relationship: {}", profile.relationship.as_str()));
        }

        if parts.is_empty() {
            format!("Nothing learned about {} yet.", profile.display_name)
        } else {
            parts.join("; ")
        }
    }

    /// Run a mutation against a profile, stamp `updated`, flush, and return
    /// the closure's result. This is the single write path every profile
    /// mutation funnels through.
    pub fn modify<R>(&self, user: &str, mutate: impl FnOnce(&mut UserProfile) -> R) -> R {
        let key = self.safe_key(user);
        self.ensure_loaded(&key, user);
        let (result, snapshot) = {
            let mut cache = self.cache.lock().expect("profile cache poisoned");
            let profile = cache.get_mut(&key).expect("profile just loaded");
            let result = mutate(profile);
            profile.updated = now_human();
            (result, profile.to_value())
        };
        // Lock released before the atomic write.
        let _ = self.store.write_pretty(
            &self.paths.profile_file(&key),
            &snapshot,
            codes::PROFILE_WRITE_FAILED,
        );
        result
    }

    /// Load a profile into the cache if absent, creating the file on first
    /// access (or rewriting it after a sanitize fix). Reads and writes run
    /// with the cache lock released.
    fn ensure_loaded(&self, key: &str, user: &str) {
        {
            let cache = self.cache.lock().expect("profile cache poisoned");
            if cache.contains_key(key) {
                return;
            }
        }

        let path = self.paths.profile_file(key);
        let (profile, needs_flush) = match self.store.read_or_quarantine(&path) {
            Some(root) => UserProfile::from_disk(&root, key),
            None => (UserProfile::new(key, user.trim()), true),
        };
        if needs_flush {
            let _ = self
                .store
                .write_pretty(&path, &profile.to_value(), codes::PROFILE_WRITE_FAILED);
        }

        let mut cache = self.cache.lock().expect("profile cache poisoned");
        let _ = cache.entry(key.to_string()).or_insert(profile);
    }
}

/// Collapse inner whitespace, trim, and cap the length of a fact value.
fn clean_fact(value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(FACT_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bjorgsun_store::IssueLog;
    use tempfile::tempdir;

    fn open_store(root: &std::path::Path) -> ProfileStore {
        let paths = DataPaths::at_root(root);
        let store = JsonStore::new(IssueLog::new(paths.issue_log()), paths.exports_dir());
        let audit = PreferenceAuditLog::open(store.clone(), paths.preferences_log());
        ProfileStore::open(store, paths, audit, "bjorn")
    }

    #[test]
    fn safe_key_derivation() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        assert_eq!(store.safe_key("Kira"), "Kira");
        assert_eq!(store.safe_key("kira#2994"), "kira_2994");
        assert_eq!(store.safe_key(""), "bjorn", "empty falls back to the owner");
        assert_eq!(store.safe_key("  "), "bjorn");
    }

    #[test]
    fn profile_file_is_created_on_first_access() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let _ = store.get("Kira");
        let path = DataPaths::at_root(dir.path()).profile_file("Kira");
        assert!(path.exists());

        let raw = std::fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["user"], "Kira");
        assert_eq!(value["relationship"], "don't know yet");
        assert!(value["facts"]["notes"].is_array());
    }

    #[test]
    fn record_fact_dedupes_case_insensitively() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        assert!(store.record_fact(FactCategory::Preferences, "Rainy  nights", "kira"));
        assert!(!store.record_fact(FactCategory::Preferences, "rainy nights", "kira"));

        let profile = store.get("kira");
        assert_eq!(profile.facts[&FactCategory::Preferences], vec!["Rainy nights"]);
    }

    #[test]
    fn record_fact_rejects_empty_values() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        assert!(!store.record_fact(FactCategory::Notes, "   ", "kira"));
    }

    #[test]
    fn record_fact_truncates_long_values() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let long = "x".repeat(500);
        assert!(store.record_fact(FactCategory::Notes, &long, "kira"));
        let profile = store.get("kira");
        assert_eq!(profile.facts[&FactCategory::Notes][0].chars().count(), 240);
    }

    #[test]
    fn record_fact_enforces_phone_window() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        assert!(!store.record_fact(FactCategory::Contacts, "phone: 12345", "kira"));
        assert!(store.record_fact(FactCategory::Contacts, "phone: 555-123-4567", "kira"));
        let profile = store.get("kira");
        assert_eq!(
            profile.facts[&FactCategory::Contacts],
            vec!["phone: 555-123-4567"]
        );
    }

    #[test]
    fn record_fact_mirrors_into_audit_log() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        assert!(store.record_fact(FactCategory::Preferences, "storms", "kira"));
        assert!(!store.record_fact(FactCategory::Preferences, "STORMS", "kira"));

        let raw =
            std::fs::read_to_string(DataPaths::at_root(dir.path()).preferences_log()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entries = value["users"]["kira"]["preferences"].as_array().unwrap();
        assert_eq!(entries.len(), 1, "exactly one audit entry per unique value");
        assert_eq!(entries[0]["value"], "storms");
        assert_eq!(entries[0]["first_recorded"], entries[0]["last_updated"]);
    }

    #[test]
    fn mutations_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = open_store(dir.path());
            let _ = store.record_fact(FactCategory::Habits, "tea at midnight", "kira");
            store.modify("kira", |p| p.interactions += 5);
        }
        let reopened = open_store(dir.path());
        let profile = reopened.get("kira");
        assert_eq!(profile.facts[&FactCategory::Habits], vec!["tea at midnight"]);
        assert_eq!(profile.interactions, 5);
    }

    #[test]
    fn ensure_profile_upserts_display_name() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        store.ensure_profile("kira#2994", None);
        assert_eq!(store.get("kira#2994").display_name, "kira#2994");

        store.ensure_profile("kira#2994", Some("Kira"));
        assert_eq!(store.get("kira#2994").display_name, "Kira");

        // Unchanged name is not rewritten.
        store.ensure_profile("kira#2994", Some("Kira"));
        assert_eq!(store.get("kira#2994").display_name, "Kira");
    }

    #[test]
    fn summarize_reflects_stored_facts() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let _ = store.record_fact(FactCategory::Preferences, "storms", "kira");
        let _ = store.record_fact(FactCategory::Preferences, "tea", "kira");
        let _ = store.record_fact(FactCategory::Location, "Bergen", "kira");
        store.modify("kira", |p| p.relationship = Relationship::Friend);

        let line = store.summarize("kira", 3);
        assert!(line.contains("preferences: storms, tea"), "got: {line}");
        assert!(line.contains("location: Bergen"));
        assert!(line.contains("Relationship: friend"));
    }

    #[test]
    fn summarize_hides_default_relationship() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let _ = store.record_fact(FactCategory::Habits, "early walks", "noa");
        let line = store.summarize("noa", 3);
        assert!(!line.contains("Relationship:"));
    }

    #[test]
    fn summarize_with_nothing_known() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let line = store.summarize("stranger", 3);
        assert!(line.contains("stranger"));
    }

    #[test]
    fn corrupt_profile_recovers_to_defaults() {
        let dir = tempdir().unwrap();
        let paths = DataPaths::at_root(dir.path());
        let path = paths.profile_file("kira");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{{{{").unwrap();

        let store = open_store(dir.path());
        let profile = store.get("kira");
        assert_eq!(profile.relationship, Relationship::DEFAULT);
        assert!(profile.facts.values().all(Vec::is_empty));
    }

    #[test]
    fn aliased_handles_share_one_profile() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let _ = store.record_fact(FactCategory::Notes, "pronouns: she/her", "kira#2994");
        let profile = store.get("kira_2994");
        assert_eq!(profile.facts[&FactCategory::Notes], vec!["pronouns: she/her"]);
    }
}
