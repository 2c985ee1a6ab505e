// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Term-AND retrieval over the conversation log.
//!
//! Assistant and system turns are more likely to be prior summaries, so they
//! win ties over user turns. The newest turn is skipped when it is the very
//! user utterance that triggered the search, which would otherwise always be
//! its own best hit.

use bjorgsun_core::{ConversationTurn, Role};

/// Lowercase the text and collapse every non-word run into a single space.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Split a query into lowercase search terms, dropping empties.
pub fn terms(query: &str) -> Vec<String> {
    normalize(query)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Find up to `max_hits` turns containing every term of `query`, returned in
/// chronological order.
///
/// The walk runs newest→oldest and skips at most one leading user turn whose
/// normalized content equals the normalized whole query (echo suppression).
/// A query with no usable terms returns nothing.
pub fn search<'a>(
    turns: &'a [ConversationTurn],
    query: &str,
    max_hits: usize,
) -> Vec<&'a ConversationTurn> {
    let query_terms = terms(query);
    if query_terms.is_empty() || max_hits == 0 {
        return Vec::new();
    }
    let query_norm = normalize(query);

    let mut prioritized: Vec<(usize, &ConversationTurn)> = Vec::new();
    let mut ordinary: Vec<(usize, &ConversationTurn)> = Vec::new();

    for (idx, turn) in turns.iter().enumerate().rev() {
        let leading = idx + 1 == turns.len();
        let norm = normalize(&turn.content);
        if leading && turn.role == Role::User && norm == query_norm {
            continue;
        }
        if query_terms.iter().all(|t| norm.contains(t.as_str())) {
            match turn.role {
                Role::Assistant | Role::System => prioritized.push((idx, turn)),
                Role::User => ordinary.push((idx, turn)),
            }
            if prioritized.len() + ordinary.len() >= max_hits {
                break;
            }
        }
    }

    let mut hits = prioritized;
    hits.append(&mut ordinary);
    hits.truncate(max_hits);
    hits.sort_by_key(|(idx, _)| *idx);
    hits.into_iter().map(|(_, turn)| turn).collect()
}
