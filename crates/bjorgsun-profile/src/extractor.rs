// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Regex-based fact learner.
//!
//! Runs an ordered, case-insensitive pattern set over a single user
//! utterance and writes whatever survives the privacy allow-list through the
//! profile store. The pattern order is part of the contract — contacts are
//! matched email-before-phone, and location candidates go through the
//! coarse-location redaction before anything is stored.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::store::ProfileStore;
use crate::types::FactCategory;

use bjorgsun_core::privacy;

static PREF_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:i|me)\s+(?:like|love)\s+([^.!?,;\n]+)").expect("pattern")
});
static PREF_FAVORITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmy\s+favou?rite\s+([^.!?,;\n]+)").expect("pattern"));
static HABIT_ADVERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bi\s+(?:usually|often|tend\s+to|always)\s+([^.!?,;\n]+)").expect("pattern")
});
static HABIT_NOUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmy\s+habit\s+(?:is|tends\s+to\s+be)\s+([^.!?,;\n]+)").expect("pattern")
});
static LOCATION_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bi\s+(?:live|am)\s+in\s+([^.!?,;\n]+)").expect("pattern")
});
static LOCATION_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bi(?:'m|\s+am)\s+from\s+([^.!?,;\n]+)").expect("pattern")
});
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("pattern")
});
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?[0-9][0-9 \-]{5,}[0-9]").expect("pattern"));
static HAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmy\s+hair\s+(?:is|color\s+is)\s+([^.!?,;\n]+)").expect("pattern")
});
static EYES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmy\s+eyes\s+(?:are|color\s+is)\s+([^.!?,;\n]+)").expect("pattern")
});
static BODY_MARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bi\s+have\s+an?\s+([^.!?,;\n]+?)\s+(tattoo|scar|style)\b").expect("pattern")
});
static PRONOUNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmy\s+pronouns?\s+(?:are|is)\s+([^.!?,;\n]+)").expect("pattern")
});

/// Learns small facts from free-text utterances.
pub struct FactExtractor {
    profiles: Arc<ProfileStore>,
}

impl FactExtractor {
    /// Create an extractor writing through the given profile store.
    pub fn new(profiles: Arc<ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Run the pattern set over one utterance and store the results for
    /// `user`. Returns whether anything new was learned, so callers can
    /// decide whether to acknowledge.
    pub fn learn_from_text(&self, text: &str, user: &str) -> bool {
        let mut learned = false;
        for (category, value) in extract_candidates(text) {
            if self.profiles.record_fact(category, &value, user) {
                debug!(user, category = %category, "fact learned");
                learned = true;
            }
        }
        learned
    }
}

/// Apply the ordered pattern set to an utterance.
///
/// Pure so the pattern behavior is testable without touching disk.
pub fn extract_candidates(text: &str) -> Vec<(FactCategory, String)> {
    let mut candidates: Vec<(FactCategory, String)> = Vec::new();

    for captures in PREF_LIKE.captures_iter(text) {
        push(&mut candidates, FactCategory::Preferences, &captures[1]);
    }
    for captures in PREF_FAVORITE.captures_iter(text) {
        push(&mut candidates, FactCategory::Preferences, &captures[1]);
    }

    for captures in HABIT_ADVERB.captures_iter(text) {
        push(&mut candidates, FactCategory::Habits, &captures[1]);
    }
    for captures in HABIT_NOUN.captures_iter(text) {
        push(&mut candidates, FactCategory::Habits, &captures[1]);
    }

    for captures in LOCATION_IN
        .captures_iter(text)
        .chain(LOCATION_FROM.captures_iter(text))
    {
        if let Some(coarse) = coarse_location(&captures[1]) {
            candidates.push((FactCategory::Location, coarse));
        }
    }

    for m in EMAIL.find_iter(text) {
        push(
            &mut candidates,
            FactCategory::Contacts,
            &format!("email: {}", m.as_str()),
        );
    }
    for m in PHONE.find_iter(text) {
        let number = m.as_str().trim();
        if privacy::phone_digit_count_ok(privacy::phone_digit_count(number)) {
            push(
                &mut candidates,
                FactCategory::Contacts,
                &format!("phone: {number}"),
            );
        }
    }

    for captures in HAIR.captures_iter(text).chain(EYES.captures_iter(text)) {
        push(&mut candidates, FactCategory::Appearance, &captures[1]);
    }
    for captures in BODY_MARK.captures_iter(text) {
        // The descriptor alone is useless without its noun.
        push(
            &mut candidates,
            FactCategory::Appearance,
            &format!("{} {}", &captures[1], &captures[2]),
        );
    }

    for captures in PRONOUNS.captures_iter(text) {
        push(
            &mut candidates,
            FactCategory::Notes,
            &format!("pronouns: {}", &captures[1]),
        );
    }

    candidates
}

fn push(candidates: &mut Vec<(FactCategory, String)>, category: FactCategory, raw: &str) {
    let cleaned = clean_capture(raw);
    if !cleaned.is_empty() {
        candidates.push((category, cleaned));
    }
}

/// Trim, collapse inner whitespace, and cap a captured fragment.
fn clean_capture(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(crate::types::FACT_MAX_CHARS).collect()
}

/// Redact a self-reported location down to its coarse form.
///
/// Never stores street addresses, coordinates, postal codes, or IPs: only
/// alphabetic tokens survive, so the result cannot contain a digit. With the
/// word `near` present the result is `<Region> near <City>` built from the
/// capitalized first ≤2 tokens on either side; otherwise the capitalized
/// first ≤3 alphabetic tokens. Anything that leaves no tokens is rejected.
pub fn coarse_location(raw: &str) -> Option<String> {
    let lowered = raw.to_lowercase();
    if let Some(split) = split_on_near(&lowered) {
        let (before, after) = split;
        let region = capitalized_tokens(before, 2)?;
        let city = capitalized_tokens(after, 2)?;
        Some(format!("{region} near {city}"))
    } else {
        capitalized_tokens(&lowered, 3)
    }
}

/// Split on the standalone word `near`, if present.
fn split_on_near(text: &str) -> Option<(&str, &str)> {
    static NEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bnear\b").expect("pattern"));
    let m = NEAR.find(text)?;
    Some((&text[..m.start()], &text[m.end()..]))
}

/// Take the first `max` purely-alphabetic tokens, capitalized. `None` when
/// no token survives.
fn capitalized_tokens(text: &str, max: usize) -> Option<String> {
    let tokens: Vec<String> = text
        .split_whitespace()
        .filter(|t| !t.is_empty() && t.chars().all(char::is_alphabetic))
        .take(max)
        .map(capitalize)
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Uppercase the first letter, lowercase the rest.
fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates_for(text: &str) -> Vec<(FactCategory, String)> {
        extract_candidates(text)
    }

    #[test]
    fn likes_and_favorites_become_preferences() {
        let found = candidates_for("I like rainy nights, honestly.");
        assert_eq!(found, vec![(FactCategory::Preferences, "rainy nights".into())]);

        let found = candidates_for("my favorite game is Titanfall");
        assert_eq!(
            found,
            vec![(FactCategory::Preferences, "game is Titanfall".into())]
        );
    }

    #[test]
    fn habit_phrases_become_habits() {
        let found = candidates_for("I usually stay up past midnight.");
        assert_eq!(
            found,
            vec![(FactCategory::Habits, "stay up past midnight".into())]
        );

        let found = candidates_for("My habit is doodling mechs");
        assert_eq!(found, vec![(FactCategory::Habits, "doodling mechs".into())]);
    }

    #[test]
    fn location_is_coarsened() {
        let found = candidates_for("I live in the misty fjords of western Norway");
        assert_eq!(
            found,
            vec![(FactCategory::Location, "The Misty Fjords".into())]
        );
    }

    #[test]
    fn location_with_near_keeps_region_and_city() {
        let found = candidates_for("I live in a small village near Bergen");
        assert_eq!(
            found,
            vec![(FactCategory::Location, "A Small near Bergen".into())]
        );
    }

    #[test]
    fn location_with_digits_is_rejected() {
        assert!(candidates_for("I live in 12345").is_empty());
        assert!(coarse_location("42").is_none());
        assert!(coarse_location("  ").is_none());
    }

    #[test]
    fn coarse_location_never_contains_digits() {
        for raw in ["Oslo 0150", "sector 7 near zone 9", "route 66"] {
            if let Some(coarse) = coarse_location(raw) {
                assert!(
                    !coarse.chars().any(|c| c.is_ascii_digit()),
                    "digit leaked from {raw:?}: {coarse}"
                );
            }
        }
    }

    #[test]
    fn email_is_captured_with_prefix() {
        let found = candidates_for("reach me at kira.h@example.com anytime");
        assert!(
            found
                .iter()
                .any(|(c, v)| *c == FactCategory::Contacts && v == "email: kira.h@example.com"),
            "got {found:?}"
        );
    }

    #[test]
    fn short_phone_is_dropped_long_phone_is_kept() {
        assert!(candidates_for("call me at 12345").is_empty());

        let found = candidates_for("call me at 555-123-4567");
        assert_eq!(
            found,
            vec![(FactCategory::Contacts, "phone: 555-123-4567".into())]
        );
    }

    #[test]
    fn overlong_phone_is_dropped() {
        assert!(candidates_for("my card is 1111 2222 3333 4444 555").is_empty());
    }

    #[test]
    fn appearance_phrases() {
        let found = candidates_for("my hair is copper red");
        assert_eq!(found, vec![(FactCategory::Appearance, "copper red".into())]);

        let found = candidates_for("my eyes are grey");
        assert_eq!(found, vec![(FactCategory::Appearance, "grey".into())]);

        let found = candidates_for("I have a dragon tattoo");
        assert_eq!(found, vec![(FactCategory::Appearance, "dragon tattoo".into())]);
    }

    #[test]
    fn pronouns_become_notes() {
        let found = candidates_for("my pronouns are she/her");
        assert_eq!(found, vec![(FactCategory::Notes, "pronouns: she/her".into())]);
    }

    #[test]
    fn one_utterance_can_yield_several_facts() {
        let found =
            candidates_for("I love thunderstorms. I usually read at night. My pronouns are they/them.");
        let categories: Vec<FactCategory> = found.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            categories,
            vec![FactCategory::Preferences, FactCategory::Habits, FactCategory::Notes]
        );
    }

    #[test]
    fn plain_chatter_yields_nothing() {
        assert!(candidates_for("how is the weather today?").is_empty());
        assert!(candidates_for("").is_empty());
    }

    #[test]
    fn capitalize_handles_unicode() {
        assert_eq!(capitalize("bergen"), "Bergen");
        assert_eq!(capitalize("ÅLESUND"), "Ålesund");
        assert_eq!(capitalize(""), "");
    }
}
