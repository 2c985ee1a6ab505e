// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The relationship and guardian state machine.
//!
//! Relationships drift upward slowly (mention → acquaintance, three
//! interactions → friend) and never drift across a protected status. The
//! guardian tracks incidents and spends forgiveness credits on apologies:
//! family gets 26, everyone else 3, father never runs out. Every mutation
//! flushes the owning profile.

use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

use bjorgsun_config::OwnerIdentity;
use bjorgsun_core::now_iso;
use bjorgsun_profile::{ProfileStore, Relationship};

use crate::gate::{OverrideGate, SecretPrompt};

/// Interactions needed before an acquaintance is promoted to friend.
const FRIEND_THRESHOLD: u64 = 3;

/// Result of processing an apology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApologyStatus {
    /// The pending incident was cleared.
    Forgiven,
    /// The forgiveness budget is exhausted; the incident stays pending.
    LimitReached,
    /// There was nothing to forgive.
    NoPending,
}

/// Full apology outcome handed back to the surrounding assistant, which
/// speaks a soft status line from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApologyOutcome {
    /// What happened.
    pub status: ApologyStatus,
    /// Credits left after this apology; `None` means unlimited.
    pub remaining: Option<u32>,
    /// The budget for the relationship; `None` means unlimited.
    pub limit: Option<u32>,
    /// Credits consumed so far.
    pub used: u32,
}

/// Drives relationship transitions and the guardian bookkeeping.
pub struct RelationshipEngine {
    profiles: std::sync::Arc<ProfileStore>,
    owner: OwnerIdentity,
    gate: Mutex<OverrideGate>,
    prompt: Box<dyn SecretPrompt>,
}

impl RelationshipEngine {
    /// Create the engine. `secret` is the configured override code;
    /// `prompt` performs the interactive challenge.
    pub fn new(
        profiles: std::sync::Arc<ProfileStore>,
        owner: OwnerIdentity,
        secret: Option<String>,
        prompt: Box<dyn SecretPrompt>,
    ) -> Self {
        Self {
            profiles,
            owner,
            gate: Mutex::new(OverrideGate::new(secret)),
            prompt,
        }
    }

    /// Current relationship for a user.
    pub fn relationship(&self, user: &str) -> Relationship {
        self.profiles.get(user).relationship
    }

    /// Count an interaction and run auto-promotion. Returns the new
    /// interaction total.
    ///
    /// Promotion never touches a protected status: `don't know yet` plus a
    /// direct mention becomes `acquaintance`, and an acquaintance with
    /// enough interactions becomes `friend`.
    pub fn record_interaction(&self, user: &str, weight: u64, mentioned: bool) -> u64 {
        self.profiles.modify(user, |profile| {
            profile.interactions += weight;
            if !profile.relationship.is_protected() {
                if profile.relationship == Relationship::DontKnowYet && mentioned {
                    profile.relationship = Relationship::Acquaintance;
                } else if profile.relationship == Relationship::Acquaintance
                    && profile.interactions >= FRIEND_THRESHOLD
                {
                    profile.relationship = Relationship::Friend;
                }
            }
            profile.interactions
        })
    }

    /// Explicitly assign a relationship status by name.
    ///
    /// Unknown statuses are rejected without touching the profile. Assigning
    /// `father` to a non-owner key silently requires a live override grant
    /// (see [`Self::verify_father_override`]); the grant is consumed by the
    /// assignment. Returns whether the status was stored.
    pub fn set_relationship(&self, user: &str, status: &str) -> bool {
        let Some(relationship) = Relationship::parse(status) else {
            debug!(user, status, "unknown relationship status rejected");
            return false;
        };

        if relationship == Relationship::Father && !self.owner.is_owner(user) {
            let consumed = self.gate.lock().expect("gate lock poisoned").consume();
            if !consumed {
                debug!(user, "father assignment rejected without an override grant");
                return false;
            }
        }

        self.profiles.modify(user, |profile| {
            profile.relationship = relationship;
        });
        true
    }

    /// Register an incident: bump the counter and flag it pending with its
    /// reason, severity, and timestamp.
    pub fn register_incident(&self, user: &str, reason: &str, severity: &str) {
        self.profiles.modify(user, |profile| {
            profile.guardian.incidents += 1;
            profile.guardian.pending = true;
            profile.guardian.pending_reason = reason.to_string();
            profile.guardian.pending_severity = severity.to_string();
            profile.guardian.pending_ts = now_iso();
        });
    }

    /// Whether an incident is waiting for an apology.
    pub fn pending(&self, user: &str) -> bool {
        self.profiles.get(user).guardian.pending
    }

    /// Administrative reset of the pending flag without consuming a credit.
    pub fn clear_pending_incident(&self, user: &str) {
        self.profiles.modify(user, |profile| {
            profile.guardian.pending = false;
            profile.guardian.pending_reason.clear();
            profile.guardian.pending_severity.clear();
            profile.guardian.pending_ts.clear();
        });
    }

    /// Process an apology against the pending incident.
    ///
    /// The budget comes from the user's relationship unless the caller
    /// supplies an explicit one. Father forgives without counting; everyone
    /// else spends a credit until the budget runs dry.
    pub fn process_apology(
        &self,
        user: &str,
        relationship: Option<Relationship>,
    ) -> ApologyOutcome {
        self.profiles.modify(user, |profile| {
            let effective = relationship.unwrap_or(profile.relationship);
            let limit = effective.forgiveness_limit();
            let used = profile.guardian.forgiveness_used;

            if !profile.guardian.pending {
                return ApologyOutcome {
                    status: ApologyStatus::NoPending,
                    remaining: remaining(limit, used),
                    limit,
                    used,
                };
            }

            match limit {
                None => {
                    clear_pending(profile);
                    ApologyOutcome {
                        status: ApologyStatus::Forgiven,
                        remaining: None,
                        limit: None,
                        used,
                    }
                }
                Some(cap) if used < cap => {
                    clear_pending(profile);
                    profile.guardian.forgiveness_used = used + 1;
                    ApologyOutcome {
                        status: ApologyStatus::Forgiven,
                        remaining: Some(cap - (used + 1)),
                        limit,
                        used: used + 1,
                    }
                }
                Some(_) => ApologyOutcome {
                    status: ApologyStatus::LimitReached,
                    remaining: Some(0),
                    limit,
                    used,
                },
            }
        })
    }

    /// Run the one-shot owner challenge that authorizes a `father`
    /// assignment to a non-owner key.
    pub fn verify_father_override(&self, reason: &str) -> bool {
        self.gate
            .lock()
            .expect("gate lock poisoned")
            .request(reason, self.prompt.as_ref())
    }
}

fn clear_pending(profile: &mut bjorgsun_profile::UserProfile) {
    profile.guardian.pending = false;
    profile.guardian.pending_reason.clear();
    profile.guardian.pending_severity.clear();
    profile.guardian.pending_ts.clear();
}

fn remaining(limit: Option<u32>, used: u32) -> Option<u32> {
    limit.map(|cap| cap.saturating_sub(used))
}
