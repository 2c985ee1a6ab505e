// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared privacy policy for stored contact entries.
//!
//! The same window is enforced at every layer that can persist a contact:
//! the fact extractor, the profile sanitize pass, and the preference audit
//! log migration. A phone entry outside the window is dropped, never stored.

/// Minimum number of digits for a stored phone number.
pub const PHONE_MIN_DIGITS: usize = 7;
/// Maximum number of digits for a stored phone number.
pub const PHONE_MAX_DIGITS: usize = 14;

/// Count the decimal digits in a string.
pub fn phone_digit_count(s: &str) -> usize {
    s.chars().filter(char::is_ascii_digit).count()
}

/// Whether a digit count falls inside the allowed phone window.
pub fn phone_digit_count_ok(count: usize) -> bool {
    (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&count)
}

/// Whether a stored contact entry is allowed to persist.
///
/// `phone: ...` entries must carry an in-window digit count; other entries
/// (`email: ...`) pass through.
pub fn contact_entry_ok(entry: &str) -> bool {
    match entry.strip_prefix("phone:") {
        Some(number) => phone_digit_count_ok(phone_digit_count(number)),
        None => true,
    }
}
