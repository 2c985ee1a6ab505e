// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owner identity derived from configuration.
//!
//! The companion serves exactly one owner, who may show up under several
//! keys: chat handle, display name, a numeric id from an external service,
//! and nicknames. This module folds all of them into one set so the rest of
//! the core can decide "is this key the owner?" without prompting anyone.

use std::collections::HashSet;

use bjorgsun_core::fs_safe_key;

use crate::model::OwnerConfig;

/// Resolved owner identity.
///
/// The match set is always the union of the configured handle, the
/// configured name, the empty-key fallback, the external-service numeric id,
/// and every safe alias. Comparison is case-insensitive over the
/// filesystem-safe form of each key, so `Kira#2994` and `kira_2994` resolve
/// the same way profile files do.
#[derive(Debug, Clone)]
pub struct OwnerIdentity {
    handle: String,
    display_name: String,
    keys: HashSet<String>,
}

impl OwnerIdentity {
    /// Derive the identity from the owner section of the configuration.
    pub fn from_config(owner: &OwnerConfig) -> Self {
        let mut keys = HashSet::new();
        keys.insert(normalize(&owner.handle));
        keys.insert(normalize(&owner.name));
        if let Some(id) = owner.discord_id {
            keys.insert(id.to_string());
        }
        for alias in &owner.safe_aliases {
            let key = normalize(alias);
            if !key.is_empty() {
                keys.insert(key);
            }
        }
        keys.remove("");

        Self {
            handle: owner.handle.clone(),
            display_name: owner.name.clone(),
            keys,
        }
    }

    /// Whether the given user key refers to the owner.
    ///
    /// The empty key always does: callers that omit the user parameter mean
    /// "the owner".
    pub fn is_owner(&self, user: &str) -> bool {
        let key = normalize(user);
        key.is_empty() || self.keys.contains(&key)
    }

    /// The owner's primary handle, used as the default profile key.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The owner's display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Case-insensitive, filesystem-safe form used for owner matching.
fn normalize(key: &str) -> String {
    fs_safe_key(key.trim()).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner_config() -> OwnerConfig {
        OwnerConfig {
            handle: "bjorn".to_string(),
            name: "Bjorn".to_string(),
            last_code: Some("octopus".to_string()),
            safe_aliases: vec!["bjorn#2994".to_string(), "the boss".to_string()],
            discord_id: Some(422_000_111),
        }
    }

    #[test]
    fn handle_name_and_aliases_match() {
        let owner = OwnerIdentity::from_config(&owner_config());
        assert!(owner.is_owner("bjorn"));
        assert!(owner.is_owner("Bjorn"));
        assert!(owner.is_owner("BJORN#2994"));
        assert!(owner.is_owner("bjorn_2994"));
        assert!(owner.is_owner("the boss"));
        assert!(owner.is_owner("422000111"));
    }

    #[test]
    fn empty_key_is_the_owner_fallback() {
        let owner = OwnerIdentity::from_config(&owner_config());
        assert!(owner.is_owner(""));
        assert!(owner.is_owner("   "));
    }

    #[test]
    fn strangers_do_not_match() {
        let owner = OwnerIdentity::from_config(&owner_config());
        assert!(!owner.is_owner("Kira"));
        assert!(!owner.is_owner("bjorn2"));
        assert!(!owner.is_owner("422000112"));
    }

    #[test]
    fn aliases_need_not_repeat_the_handle() {
        let mut config = owner_config();
        config.safe_aliases = Vec::new();
        let owner = OwnerIdentity::from_config(&config);
        assert!(owner.is_owner("bjorn"), "handle matches without aliases");
    }
}
