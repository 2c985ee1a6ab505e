// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile domain types: fact categories, relationship statuses, guardian
//! state, and the per-user profile with its load-time sanitize pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use bjorgsun_core::{now_human, privacy};

/// Maximum stored length of a single fact value, in characters.
pub const FACT_MAX_CHARS: usize = 240;

/// The six categories a fact may be stored under. Nothing outside this
/// allow-list is ever persisted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FactCategory {
    Preferences,
    Habits,
    Appearance,
    Contacts,
    Location,
    Notes,
}

impl FactCategory {
    /// All categories, in their canonical order.
    pub const ALL: [FactCategory; 6] = [
        FactCategory::Preferences,
        FactCategory::Habits,
        FactCategory::Appearance,
        FactCategory::Contacts,
        FactCategory::Location,
        FactCategory::Notes,
    ];

    /// Parse a category name. Unknown names are rejected, not coerced.
    pub fn parse(name: &str) -> Option<Self> {
        name.trim().to_ascii_lowercase().parse().ok()
    }
}

/// Relationship status the companion assigns to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Father,
    Family,
    BestFriend,
    Friend,
    Acquaintance,
    DontKnowYet,
    Dislike,
    Ignore,
    Block,
}

impl Relationship {
    /// The status every new profile starts with.
    pub const DEFAULT: Relationship = Relationship::DontKnowYet;

    /// Convert to the on-disk string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Father => "father",
            Relationship::Family => "family",
            Relationship::BestFriend => "best friend",
            Relationship::Friend => "friend",
            Relationship::Acquaintance => "acquaintance",
            Relationship::DontKnowYet => "don't know yet",
            Relationship::Dislike => "dislike",
            Relationship::Ignore => "ignore",
            Relationship::Block => "block",
        }
    }

    /// Parse from the on-disk string form, falling back to the default for
    /// anything outside the enumerated set.
    pub fn from_str_value(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::DEFAULT)
    }

    /// Strict parse: `None` for unknown statuses.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "father" => Some(Relationship::Father),
            "family" => Some(Relationship::Family),
            "best friend" => Some(Relationship::BestFriend),
            "friend" => Some(Relationship::Friend),
            "acquaintance" => Some(Relationship::Acquaintance),
            "don't know yet" => Some(Relationship::DontKnowYet),
            "dislike" => Some(Relationship::Dislike),
            "ignore" => Some(Relationship::Ignore),
            "block" => Some(Relationship::Block),
            _ => None,
        }
    }

    /// Protected statuses are never changed by auto-promotion.
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Relationship::Father
                | Relationship::Family
                | Relationship::BestFriend
                | Relationship::Dislike
                | Relationship::Ignore
                | Relationship::Block
        )
    }

    /// How many apologies clear an incident for this relationship.
    /// `None` means unlimited.
    pub fn forgiveness_limit(&self) -> Option<u32> {
        match self {
            Relationship::Father => None,
            Relationship::Family => Some(26),
            _ => Some(3),
        }
    }
}

impl Serialize for Relationship {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Relationship {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Relationship::from_str_value(&s))
    }
}

/// Per-user guardian bookkeeping: incidents and the forgiveness budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianState {
    /// Total incidents ever registered.
    pub incidents: u64,
    /// Whether an incident is waiting for an apology.
    pub pending: bool,
    /// Why the pending incident was registered.
    pub pending_reason: String,
    /// How severe the pending incident is.
    pub pending_severity: String,
    /// When the pending incident was registered.
    pub pending_ts: String,
    /// Forgiveness credits consumed so far.
    pub forgiveness_used: u32,
}

/// One user's profile, persisted at `users/<safe-handle>/profile.json`.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    /// The safe-handle key this profile is stored under.
    pub user: String,
    /// Human display name; may be updated later.
    pub display_name: String,
    /// Facts bucketed by category. All six categories always present.
    pub facts: BTreeMap<FactCategory, Vec<String>>,
    /// Informational privacy-rule strings, rewritten on load if missing.
    pub rules: Vec<String>,
    /// Current relationship status.
    pub relationship: Relationship,
    /// Interaction counter.
    pub interactions: u64,
    /// Guardian bookkeeping.
    pub guardian: GuardianState,
    /// Creation timestamp (human-readable UTC).
    pub created: String,
    /// Last-mutation timestamp (human-readable UTC).
    pub updated: String,
}

impl UserProfile {
    /// Fresh profile for a user key.
    pub fn new(user: impl Into<String>, display_name: impl Into<String>) -> Self {
        let user = user.into();
        let display_name = display_name.into();
        let now = now_human();
        Self {
            display_name: if display_name.is_empty() {
                user.clone()
            } else {
                display_name
            },
            user,
            facts: empty_facts(),
            rules: default_rules(),
            relationship: Relationship::DEFAULT,
            interactions: 0,
            guardian: GuardianState::default(),
            created: now.clone(),
            updated: now,
        }
    }

    /// Rebuild a profile from its on-disk JSON, running the idempotent
    /// sanitize pass. Returns the profile and whether sanitizing changed
    /// anything (in which case the caller should re-save).
    pub fn from_disk(root: &serde_json::Value, fallback_user: &str) -> (Self, bool) {
        let map = match root.as_object() {
            Some(map) => map,
            None => return (UserProfile::new(fallback_user, ""), true),
        };

        let get_str = |key: &str| -> Option<String> {
            map.get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };

        let user = get_str("user")
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| fallback_user.to_string());
        let mut profile = UserProfile::new(user, get_str("display_name").unwrap_or_default());

        if let Some(created) = get_str("created").filter(|c| !c.is_empty()) {
            profile.created = created;
        }
        if let Some(updated) = get_str("updated").filter(|u| !u.is_empty()) {
            profile.updated = updated;
        }
        if let Some(relationship) = get_str("relationship") {
            profile.relationship = Relationship::from_str_value(&relationship);
        }
        profile.interactions = map
            .get("interactions")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        if let Some(guardian) = map.get("guardian") {
            profile.guardian = serde_json::from_value(guardian.clone()).unwrap_or_default();
        }
        if let Some(rules) = map.get("rules").and_then(serde_json::Value::as_array)
            && !rules.is_empty()
        {
            profile.rules = rules
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect();
        }

        if let Some(facts) = map.get("facts").and_then(serde_json::Value::as_object) {
            for (name, values) in facts {
                let Some(category) = FactCategory::parse(name) else {
                    continue; // outside the allow-list, dropped
                };
                let Some(values) = values.as_array() else {
                    continue;
                };
                let bucket = profile.facts.entry(category).or_default();
                for value in values {
                    if let Some(value) = value.as_str() {
                        let value = value.trim();
                        if value.is_empty() {
                            continue;
                        }
                        if category == FactCategory::Contacts && !privacy::contact_entry_ok(value)
                        {
                            continue;
                        }
                        if !bucket.iter().any(|v| v.eq_ignore_ascii_case(value)) {
                            bucket.push(value.to_string());
                        }
                    }
                }
            }
        }

        // The sanitize pass changed something iff the normalized form no
        // longer matches what was on disk.
        let changed = serde_json::to_value(&profile)
            .map(|normalized| &normalized != root)
            .unwrap_or(true);
        (profile, changed)
    }

    /// Serialize for persistence.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"user": self.user}))
    }
}

/// One empty bucket per category.
pub fn empty_facts() -> BTreeMap<FactCategory, Vec<String>> {
    FactCategory::ALL.iter().map(|c| (*c, Vec::new())).collect()
}

/// The informational privacy-rule strings written into every profile.
pub fn default_rules() -> Vec<String> {
    vec![
        "Facts are stored only under: preferences, habits, appearance, contacts, location, notes."
            .to_string(),
        "Locations stay coarse: no street addresses, coordinates, postal codes or IPs.".to_string(),
        "Phone numbers are kept only with 7 to 14 digits.".to_string(),
        "Entries are short (240 characters), deduplicated, and auditable.".to_string(),
    ]
}
