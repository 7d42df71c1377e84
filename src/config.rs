//! Service and per-call configuration
//!
//! Process settings are read from the environment once at startup. Each call
//! gets its own immutable [`CallConfig`] snapshot built from the `env_vars`
//! object carried by `session:new`, falling back to process-level defaults
//! and then to built-in defaults.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default path of the call-control WebSocket endpoint
pub const DEFAULT_WS_PATH: &str = "/";

const DEFAULT_PROMPT: &str = "You are a helpful conversational AI voice bot.";
const DEFAULT_VOICE: &str = "Mark";

/// Per-call setting names, as they appear in `env_vars` and in the process
/// environment.
pub mod keys {
    pub const CALL_TRANSFER: &str = "CALL_TRANSFER";
    pub const TRANSFER_TYPE: &str = "TRANSFER_TYPE";
    pub const PROMPT: &str = "ULTRAVOX_PROMPT";
    pub const API_KEY: &str = "ULTRAVOX_APIKEY";
    pub const VOICE: &str = "VOICE";
    pub const FIRST_SPEAKER: &str = "FIRST_SPEAKER";
    pub const TRANSFER_FROM: &str = "TRANSFER_FROM";
    pub const TRANSFER_TO: &str = "TRANSFER_TO";
    pub const TRANSFER_CARRIER: &str = "TRANSFER_CARRIER";

    pub const ALL: &[&str] = &[
        CALL_TRANSFER,
        TRANSFER_TYPE,
        PROMPT,
        API_KEY,
        VOICE,
        FIRST_SPEAKER,
        TRANSFER_FROM,
        TRANSFER_TO,
        TRANSFER_CARRIER,
    ];
}

/// Invalid per-call configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unrecognized {key} value {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("missing required setting {0}")]
    Missing(&'static str),
}

// ============================================================================
// Enumerations
// ============================================================================

/// Whether, and how, the LLM may hand the caller off to a human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// No transfer capability offered
    #[default]
    None,
    /// Transfer with a terse caller-facing notice
    Cold,
    /// Transfer with a notice plus a spoken summary to the receiving party
    Warm,
}

impl TransferMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "None" => Some(Self::None),
            "Cold" => Some(Self::Cold),
            "Warm" => Some(Self::Warm),
            _ => None,
        }
    }

    pub fn offers_transfer(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// How a transfer is carried out on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMechanism {
    /// Place an outbound leg and bridge it
    #[default]
    Dial,
    /// Hand off with a SIP REFER
    Refer,
}

impl TransferMechanism {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Dial" => Some(Self::Dial),
            "Refer" => Some(Self::Refer),
            _ => None,
        }
    }
}

/// Who speaks first once the LLM conversation starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FirstSpeaker {
    #[default]
    #[serde(rename = "FIRST_SPEAKER_AGENT")]
    Agent,
    #[serde(rename = "FIRST_SPEAKER_USER")]
    User,
}

impl FirstSpeaker {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Agent" => Some(Self::Agent),
            "User" => Some(Self::User),
            _ => None,
        }
    }
}

/// Where a transfer goes, shaped by the mechanism
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferTarget {
    Dial {
        number: String,
        caller_id: Option<String>,
        carrier: Option<String>,
    },
    Refer {
        address: String,
    },
}

// ============================================================================
// Service Configuration
// ============================================================================

/// Process-level configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub ws_path: String,
    /// Fallback values for per-call settings
    pub call_defaults: HashMap<String, String>,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("VOICE_AGENT_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let ws_path = lookup("VOICE_AGENT_WS_PATH").map_or_else(
            || DEFAULT_WS_PATH.to_string(),
            |p| {
                if p.starts_with('/') {
                    p
                } else {
                    format!("/{p}")
                }
            },
        );

        let call_defaults = keys::ALL
            .iter()
            .filter_map(|key| lookup(key).map(|v| ((*key).to_string(), v)))
            .collect();

        Self {
            port,
            ws_path,
            call_defaults,
        }
    }
}

// ============================================================================
// Per-call Configuration
// ============================================================================

/// Immutable configuration snapshot for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallConfig {
    pub transfer_mode: TransferMode,
    pub transfer_mechanism: TransferMechanism,
    /// Present whenever `transfer_mode` offers a transfer
    pub transfer_target: Option<TransferTarget>,
    pub prompt: String,
    pub api_key: String,
    pub voice: String,
    pub first_speaker: FirstSpeaker,
}

impl CallConfig {
    /// Resolve settings from the call's `env_vars`, then `defaults`, then
    /// built-in values.
    pub fn from_settings(
        env_vars: &Map<String, Value>,
        defaults: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| setting(env_vars, defaults, key);

        let transfer_mode = parse_or_default(
            keys::CALL_TRANSFER,
            get(keys::CALL_TRANSFER),
            TransferMode::parse,
        )?;
        let transfer_mechanism = parse_or_default(
            keys::TRANSFER_TYPE,
            get(keys::TRANSFER_TYPE),
            TransferMechanism::parse,
        )?;
        let first_speaker = parse_or_default(
            keys::FIRST_SPEAKER,
            get(keys::FIRST_SPEAKER),
            FirstSpeaker::parse,
        )?;

        let api_key = get(keys::API_KEY).ok_or(ConfigError::Missing(keys::API_KEY))?;

        let transfer_target = if transfer_mode.offers_transfer() {
            let to = get(keys::TRANSFER_TO).ok_or(ConfigError::Missing(keys::TRANSFER_TO))?;
            Some(match transfer_mechanism {
                TransferMechanism::Dial => TransferTarget::Dial {
                    number: to,
                    caller_id: get(keys::TRANSFER_FROM),
                    carrier: get(keys::TRANSFER_CARRIER),
                },
                TransferMechanism::Refer => TransferTarget::Refer { address: to },
            })
        } else {
            None
        };

        Ok(Self {
            transfer_mode,
            transfer_mechanism,
            transfer_target,
            prompt: get(keys::PROMPT).unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            api_key,
            voice: get(keys::VOICE).unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            first_speaker,
        })
    }
}

/// Look a setting up, treating blank values as unset
fn setting(
    env_vars: &Map<String, Value>,
    defaults: &HashMap<String, String>,
    key: &str,
) -> Option<String> {
    let from_call = env_vars.get(key).and_then(|v| match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    });

    from_call
        .filter(|s| !s.is_empty())
        .or_else(|| {
            defaults
                .get(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

fn parse_or_default<T: Default>(
    key: &'static str,
    value: Option<String>,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(T::default()),
        Some(v) => parse(&v).ok_or(ConfigError::InvalidValue { key, value: v }),
    }
}
