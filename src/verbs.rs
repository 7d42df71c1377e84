//! Call-control verbs
//!
//! Typed versions of the JSON verbs the control layer executes on a call.
//! A call script, a hook reply and a redirect command are all lists of verbs.

use crate::config::FirstSpeaker;
use crate::tools::SelectedTool;
use serde::Serialize;
use std::fmt;

/// Ring-back media played to the caller while a transfer leg is dialed
pub const RINGBACK_MEDIA: &str = "https://jambonz.app/us_ringback.mp3";

pub const LLM_VENDOR: &str = "ultravox";
pub const LLM_MODEL: &str = "fixie-ai/ultravox";

/// A single call-control instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verb")]
pub enum Verb {
    #[serde(rename = "answer")]
    Answer,
    #[serde(rename = "pause")]
    Pause { length: f64 },
    #[serde(rename = "llm")]
    Llm(Box<LlmVerb>),
    #[serde(rename = "say")]
    Say { text: String },
    #[serde(rename = "hangup")]
    Hangup,
    #[serde(rename = "dial")]
    Dial(DialVerb),
    #[serde(rename = "sip:refer")]
    SipRefer {
        #[serde(rename = "referTo")]
        refer_to: String,
    },
}

impl Verb {
    pub fn say(text: impl Into<String>) -> Self {
        Verb::Say { text: text.into() }
    }

    pub fn pause(seconds: f64) -> Self {
        Verb::Pause { length: seconds }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Verb::Answer => "answer",
            Verb::Pause { .. } => "pause",
            Verb::Llm(_) => "llm",
            Verb::Say { .. } => "say",
            Verb::Hangup => "hangup",
            Verb::Dial(_) => "dial",
            Verb::SipRefer { .. } => "sip:refer",
        }
    }
}

// ============================================================================
// LLM Verb
// ============================================================================

/// Starts a speech-to-speech LLM conversation on the call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmVerb {
    pub vendor: String,
    pub model: String,
    pub auth: LlmAuth,
    /// Hook invoked when the conversation completes
    pub action_hook: String,
    /// Hook receiving mid-conversation events
    pub event_hook: String,
    /// Hook receiving tool invocations
    pub tool_hook: String,
    pub llm_options: LlmOptions,
}

/// Vendor credential. Redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LlmAuth {
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

impl fmt::Debug for LlmAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmAuth")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmOptions {
    pub system_prompt: String,
    pub first_speaker: FirstSpeaker,
    pub initial_messages: Vec<InitialMessage>,
    pub model: String,
    pub voice: String,
    pub transcript_optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_tools: Option<Vec<SelectedTool>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitialMessage {
    pub medium: String,
    pub role: String,
}

impl InitialMessage {
    /// Empty voice turn from the user, which opens the conversation
    pub fn user_voice() -> Self {
        Self {
            medium: "MESSAGE_MEDIUM_VOICE".to_string(),
            role: "MESSAGE_ROLE_USER".to_string(),
        }
    }
}

// ============================================================================
// Dial Verb
// ============================================================================

/// Places an outbound leg and bridges it to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialVerb {
    /// Hook invoked when the dialed leg ends
    pub action_hook: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_id: Option<String>,
    pub dial_music: String,
    pub target: Vec<DialTarget>,
    /// Hook run on the answered leg before bridging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_hook: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DialTarget {
    Phone {
        number: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        trunk: Option<String>,
    },
}

// ============================================================================
// Redirect Commands
// ============================================================================

/// Instruction replacing the call's current verb stack with a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectCommand {
    Dial(DialVerb),
    Refer { refer_to: String },
}

impl RedirectCommand {
    /// The confirmation hook armed on this command, if any
    pub fn confirm_hook(&self) -> Option<&str> {
        match self {
            RedirectCommand::Dial(dial) => dial.confirm_hook.as_deref(),
            RedirectCommand::Refer { .. } => None,
        }
    }

    pub fn into_verbs(self) -> Vec<Verb> {
        match self {
            RedirectCommand::Dial(dial) => vec![Verb::Dial(dial)],
            RedirectCommand::Refer { refer_to } => vec![Verb::SipRefer { refer_to }],
        }
    }
}
