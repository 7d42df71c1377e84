//! Transfer policy: what the LLM is told and which tools it gets
//!
//! A pure mapping from transfer mode to system prompt and tool set. The mode
//! is a closed enumeration, so the mapping is total.

use crate::config::TransferMode;
use crate::tools::ToolDefinition;

/// Appended to the base prompt for cold transfers
const COLD_TRANSFER_INSTRUCTIONS: &str = " When you call the tool to transfer the call let the caller know you are going to transfer them and then immediately call the call-transfer tool.";

/// Appended to the base prompt for warm transfers
const WARM_TRANSFER_INSTRUCTIONS: &str = " When you call the tool to transfer the call provide a brief summary of the call with the user so far. Let the caller know you are going to transfer them and then immediately call the call-transfer tool.";

/// Conversational contract offered to the LLM
#[derive(Debug, Clone, PartialEq)]
pub struct LlmPolicy {
    pub system_prompt: String,
    /// `None` means no tools are offered at all
    pub tools: Option<Vec<ToolDefinition>>,
}

pub fn transfer_policy(mode: TransferMode, base_prompt: &str) -> LlmPolicy {
    match mode {
        TransferMode::None => LlmPolicy {
            system_prompt: base_prompt.to_string(),
            tools: None,
        },
        TransferMode::Cold => LlmPolicy {
            system_prompt: format!("{base_prompt}{COLD_TRANSFER_INSTRUCTIONS}"),
            tools: Some(vec![ToolDefinition::call_transfer()]),
        },
        TransferMode::Warm => LlmPolicy {
            system_prompt: format!("{base_prompt}{WARM_TRANSFER_INSTRUCTIONS}"),
            tools: Some(vec![ToolDefinition::call_transfer()]),
        },
    }
}
