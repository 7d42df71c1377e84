//! Conversation completion classification
//!
//! Decides what the caller hears when the LLM conversation ends, and whether
//! the call ends with it. Never fails: payloads that cannot be read degrade
//! to the generic failure branch.

use crate::verbs::Verb;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

/// Completion reasons that indicate the LLM vendor failed
const FAILURE_REASONS: &[&str] = &["server failure", "server error"];

const RATE_LIMIT_CODE: &str = "rate_limit_exceeded";

const RATE_LIMIT_APOLOGY: &str = "Sorry, you have exceeded your rate limits. ";
const GENERIC_APOLOGY: &str = "Sorry, there was an error processing your request.";

static RETRY_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"try again in (\d+)").expect("retry-after pattern is valid"));

/// Payload of the completion hook
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionEvent {
    #[serde(default)]
    pub completion_reason: Option<String>,
    /// Vendor error, expected as `{code, message}` but not trusted to be
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Continue,
    RateLimited { retry_after_secs: Option<u64> },
    GenericFailure,
}

/// What to do about a completed conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: CompletionOutcome,
    /// Text to speak to the caller, if any
    pub speech: Option<String>,
    pub end_call: bool,
}

impl Classification {
    /// Verbs replying to the completion hook
    pub fn reply_verbs(&self) -> Vec<Verb> {
        let mut verbs = Vec::new();
        if let Some(text) = &self.speech {
            verbs.push(Verb::say(text.clone()));
        }
        if self.end_call {
            verbs.push(Verb::Hangup);
        }
        verbs
    }
}

pub fn classify(event: &CompletionEvent) -> Classification {
    let failed = event
        .completion_reason
        .as_deref()
        .is_some_and(|reason| FAILURE_REASONS.contains(&reason));

    if !failed {
        return Classification {
            outcome: CompletionOutcome::Continue,
            speech: None,
            end_call: false,
        };
    }

    let error = event.error.as_ref();
    let code = error.and_then(|e| e.get("code")).and_then(Value::as_str);

    if code == Some(RATE_LIMIT_CODE) {
        let message = error.and_then(|e| e.get("message")).and_then(Value::as_str);
        let digits = message.and_then(retry_after_digits);

        // Spoken as written, even when too large for the numeric hint
        let mut text = RATE_LIMIT_APOLOGY.to_string();
        if let Some(digits) = digits {
            text.push_str(&format!("Please try again in {digits} seconds."));
        }

        Classification {
            outcome: CompletionOutcome::RateLimited {
                retry_after_secs: message.and_then(retry_after_secs),
            },
            speech: Some(text),
            end_call: true,
        }
    } else {
        Classification {
            outcome: CompletionOutcome::GenericFailure,
            speech: Some(GENERIC_APOLOGY.to_string()),
            end_call: true,
        }
    }
}

/// Seconds named after "try again in" in a vendor error message.
/// Values past `u64::MAX` saturate.
pub fn retry_after_secs(message: &str) -> Option<u64> {
    retry_after_digits(message).map(saturating_secs)
}

fn retry_after_digits(message: &str) -> Option<&str> {
    RETRY_AFTER
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `digits` is a non-empty run of ASCII digits, so parsing only fails on overflow
fn saturating_secs(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}
