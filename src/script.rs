//! Initial call script
//!
//! Answer, pause briefly, run the LLM conversation, hang up. The pause keeps
//! the LLM's first words from racing the caller's media path.

use crate::config::{CallConfig, ConfigError};
use crate::policy::transfer_policy;
use crate::routes::Route;
use crate::runtime::TransportError;
use crate::verbs::{InitialMessage, LlmAuth, LlmOptions, LlmVerb, Verb, LLM_MODEL, LLM_VENDOR};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Pause between answering and starting the conversation, in seconds
pub const ANSWER_PAUSE_SECS: f64 = 0.5;

/// Script assembly failure. Fatal for the call.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid call configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to deliver call script: {0}")]
    Delivery(#[from] TransportError),
}

/// Resolve the call's configuration and build its opening script
pub fn configure_call(
    env_vars: &Map<String, Value>,
    defaults: &HashMap<String, String>,
) -> Result<(CallConfig, Vec<Verb>), SetupError> {
    let config = CallConfig::from_settings(env_vars, defaults)?;
    let script = build_call_script(&config);
    Ok((config, script))
}

pub fn build_call_script(config: &CallConfig) -> Vec<Verb> {
    vec![
        Verb::Answer,
        Verb::pause(ANSWER_PAUSE_SECS),
        Verb::Llm(Box::new(build_llm_verb(config))),
        Verb::Hangup,
    ]
}

fn build_llm_verb(config: &CallConfig) -> LlmVerb {
    let policy = transfer_policy(config.transfer_mode, &config.prompt);

    LlmVerb {
        vendor: LLM_VENDOR.to_string(),
        model: LLM_MODEL.to_string(),
        auth: LlmAuth {
            api_key: config.api_key.clone(),
        },
        action_hook: Route::Completion.path().to_string(),
        event_hook: Route::ConversationEvent.path().to_string(),
        tool_hook: Route::ToolInvocation.path().to_string(),
        llm_options: LlmOptions {
            system_prompt: policy.system_prompt,
            first_speaker: config.first_speaker,
            initial_messages: vec![InitialMessage::user_voice()],
            model: LLM_MODEL.to_string(),
            voice: config.voice.clone(),
            transcript_optional: true,
            selected_tools: policy
                .tools
                .map(|tools| tools.iter().map(|t| t.to_selected_tool()).collect()),
        },
    }
}
