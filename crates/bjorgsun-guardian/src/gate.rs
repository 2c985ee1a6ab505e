// SPDX-FileCopyrightText: 2026 Bjorgsun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The owner override gate.
//!
//! Guards exactly one transition: assigning the `father` status to a
//! non-owner key. A session gets one interactive challenge; a wrong answer
//! locks the gate for the rest of the process, and a right answer produces a
//! grant that the first successful protected assignment consumes. Restarting
//! the process is the only way to try again.

use tracing::{info, warn};

/// Interactive secret entry, abstracted so tests can script answers.
pub trait SecretPrompt: Send + Sync {
    /// Ask the owner the given question and return their answer, or `None`
    /// when no interactive read is possible.
    fn ask(&self, prompt: &str) -> Option<String>;
}

/// Terminal prompt without echo.
pub struct TtyPrompt;

impl SecretPrompt for TtyPrompt {
    fn ask(&self, prompt: &str) -> Option<String> {
        rpassword::prompt_password(prompt).ok()
    }
}

/// Session-scoped override state.
#[derive(Debug)]
pub struct OverrideGate {
    secret: Option<String>,
    prompted: bool,
    granted: bool,
}

impl OverrideGate {
    /// Create a gate checking against the configured secret. `None` means no
    /// code is configured and every request is denied.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret,
            prompted: false,
            granted: false,
        }
    }

    /// Request the override. The first call issues the challenge; afterwards
    /// the stored outcome is returned without re-prompting, which blocks
    /// both brute-force and social-engineered retries within one session.
    pub fn request(&mut self, reason: &str, prompt: &dyn SecretPrompt) -> bool {
        if self.granted {
            return true;
        }
        if self.prompted {
            return false;
        }
        self.prompted = true;

        let Some(secret) = self.secret.as_deref() else {
            warn!("father override requested but no code is configured");
            return false;
        };

        let reason = if reason.trim().is_empty() {
            "unspecified"
        } else {
            reason.trim()
        };
        let question = format!("Father override requested ({reason}). What is my last code?");
        match prompt.ask(&question) {
            Some(answer) if answer.trim() == secret => {
                info!("father override granted");
                self.granted = true;
                true
            }
            Some(_) => {
                warn!("father override denied: wrong code");
                false
            }
            None => {
                warn!("father override denied: no interactive input");
                false
            }
        }
    }

    /// Consume the grant for one protected assignment. Returns whether a
    /// grant was available.
    pub fn consume(&mut self) -> bool {
        if self.granted {
            self.granted = false;
            true
        } else {
            false
        }
    }

    /// Whether an unconsumed grant is live.
    pub fn is_granted(&self) -> bool {
        self.granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted answers, popped front to back; `None` simulates a failed read.
    struct Scripted(Mutex<Vec<Option<String>>>);

    impl Scripted {
        fn answering(answers: &[Option<&str>]) -> Self {
            Self(Mutex::new(
                answers.iter().map(|a| a.map(str::to_string)).collect(),
            ))
        }
    }

    impl SecretPrompt for Scripted {
        fn ask(&self, _prompt: &str) -> Option<String> {
            let mut answers = self.0.lock().unwrap();
            if answers.is_empty() {
                None
            } else {
                answers.remove(0)
            }
        }
    }

    #[test]
    fn correct_code_grants_once() {
        let prompt = Scripted::answering(&[Some("octopus")]);
        let mut gate = OverrideGate::new(Some("octopus".to_string()));

        assert!(gate.request("assign", &prompt));
        assert!(gate.is_granted());
        assert!(gate.consume());
        assert!(!gate.is_granted());
        assert!(!gate.consume(), "the grant is one-shot");
    }

    #[test]
    fn wrong_code_locks_the_session() {
        let prompt = Scripted::answering(&[Some("squid"), Some("octopus")]);
        let mut gate = OverrideGate::new(Some("octopus".to_string()));

        assert!(!gate.request("assign", &prompt));
        // The second, correct answer is never even asked for.
        assert!(!gate.request("assign", &prompt));
        assert!(!gate.is_granted());
    }

    #[test]
    fn granted_state_survives_repeat_requests_until_consumed() {
        let prompt = Scripted::answering(&[Some("octopus")]);
        let mut gate = OverrideGate::new(Some("octopus".to_string()));

        assert!(gate.request("assign", &prompt));
        assert!(gate.request("assign again", &prompt), "no second challenge");
        assert!(gate.consume());
        assert!(!gate.request("after consume", &prompt));
    }

    #[test]
    fn missing_code_denies_without_prompting() {
        let prompt = Scripted::answering(&[Some("octopus")]);
        let mut gate = OverrideGate::new(None);
        assert!(!gate.request("assign", &prompt));
        // The scripted answer is still unread.
        assert_eq!(prompt.ask("leftover").as_deref(), Some("octopus"));
    }

    #[test]
    fn failed_read_denies() {
        let prompt = Scripted::answering(&[None]);
        let mut gate = OverrideGate::new(Some("octopus".to_string()));
        assert!(!gate.request("assign", &prompt));
        assert!(!gate.request("assign", &prompt));
    }

    #[test]
    fn answer_is_trimmed_before_comparison() {
        let prompt = Scripted::answering(&[Some("  octopus\n")]);
        let mut gate = OverrideGate::new(Some("octopus".to_string()));
        assert!(gate.request("assign", &prompt));
    }
}
