// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::OAIPromptFormatter;
use crate::config::TranscoderConfig;
use crate::protocols::openai::tools::{
    function_call_to_tool_choice, functions_to_tools, normalize_messages,
};
use crate::protocols::openai::{
    ChatCompletionMessage, ChatCompletionRequest, ChatCompletionTool,
    ChatCompletionToolChoiceOption,
};

pub const INSTRUCTION_HEADER: &str = "### Instruction:\n";
pub const RESPONSE_HEADER: &str = "\n\n### Response:\n";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("unsupported pipeline version {0}; expected 1 or 2")]
    UnsupportedPipeline(u8),
    #[error("failed to encode prompt body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Prompt layout generation. Serialized as the bare integer.
///
/// - `V1`: the body is the JSON array of messages; function declarations are dropped.
/// - `V2`: the body is `{"messages":[...],"functions":[...]}` with the eligible names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PipelineVersion {
    V1 = 1,
    V2 = 2,
}

impl TryFrom<u8> for PipelineVersion {
    type Error = PromptError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PipelineVersion::V1),
            2 => Ok(PipelineVersion::V2),
            other => Err(PromptError::UnsupportedPipeline(other)),
        }
    }
}

impl From<PipelineVersion> for u8 {
    fn from(version: PipelineVersion) -> Self {
        version as u8
    }
}

impl fmt::Display for PipelineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Function names the model may call, in declaration order.
///
/// A forced name is returned even when no tool declares it, so the prompt does not
/// depend on the tool list.
pub fn eligible_function_names(
    tools: Option<&[ChatCompletionTool]>,
    tool_choice: Option<&ChatCompletionToolChoiceOption>,
) -> Vec<String> {
    let declared = || -> Vec<String> {
        tools
            .unwrap_or_default()
            .iter()
            .map(|tool| tool.function.name.clone())
            .collect()
    };

    match tool_choice {
        Some(ChatCompletionToolChoiceOption::None) => Vec::new(),
        Some(ChatCompletionToolChoiceOption::Named(named)) => {
            let name = &named.function.name;
            if !declared().contains(name) {
                tracing::warn!(
                    name = name.as_str(),
                    "forced function is not among the declared tools"
                );
            }
            vec![name.clone()]
        }
        Some(ChatCompletionToolChoiceOption::Auto)
        | Some(ChatCompletionToolChoiceOption::Required)
        | None => declared(),
    }
}

/// Remove every prune rule from JSON-encoded text.
///
/// Each rule is matched in its JSON-escaped form so quotes, backslashes and newlines in a
/// rule still match the encoded messages.
pub fn prune_encoded(mut encoded: String, prune_rules: &[String]) -> Result<String, PromptError> {
    for rule in prune_rules.iter().filter(|rule| !rule.is_empty()) {
        let escaped = serde_json::to_string(rule)?;
        let needle = &escaped[1..escaped.len() - 1];
        if encoded.contains(needle) {
            tracing::trace!(rule = rule.as_str(), "pruning");
            encoded = encoded.replace(needle, "");
        }
    }
    Ok(encoded)
}

/// Flatten messages, tools and tool choice into one prompt string.
pub fn serialize_request(
    messages: &[ChatCompletionMessage],
    tools: Option<&[ChatCompletionTool]>,
    tool_choice: Option<&ChatCompletionToolChoiceOption>,
    version: PipelineVersion,
    prune_rules: &[String],
) -> Result<String, PromptError> {
    let normalized = normalize_messages(messages);
    let encoded = prune_encoded(serde_json::to_string(&normalized)?, prune_rules)?;

    let body = match version {
        PipelineVersion::V1 => encoded,
        PipelineVersion::V2 => {
            let names = eligible_function_names(tools, tool_choice);
            if names.is_empty() {
                format!("{{\"messages\":{encoded}}}")
            } else {
                format!(
                    "{{\"messages\":{encoded},\"functions\":{}}}",
                    serde_json::to_string(&names)?
                )
            }
        }
    };

    tracing::debug!(
        %version,
        messages = messages.len(),
        body_len = body.len(),
        "serialized flat prompt"
    );
    Ok(format!("{INSTRUCTION_HEADER}{body}{RESPONSE_HEADER}"))
}

/// Renders OpenAI chat requests with the flat instruction template.
#[derive(Debug, Clone)]
pub struct FlatPromptFormatter {
    version: PipelineVersion,
    prune_rules: Vec<String>,
}

impl FlatPromptFormatter {
    pub fn new(version: PipelineVersion, prune_rules: Vec<String>) -> Self {
        Self {
            version,
            prune_rules,
        }
    }

    pub fn from_config(version: PipelineVersion, config: &TranscoderConfig) -> Self {
        Self::new(version, config.prune_rules.clone())
    }

    pub fn version(&self) -> PipelineVersion {
        self.version
    }
}

impl OAIPromptFormatter for FlatPromptFormatter {
    /// Legacy `functions` / `function_call` stand in for `tools` / `tool_choice` when
    /// those are absent.
    fn render(&self, req: &ChatCompletionRequest) -> anyhow::Result<String> {
        let tools = match &req.tools {
            Some(tools) => Some(tools.clone()),
            None => functions_to_tools(req.functions.as_deref()),
        };
        let tool_choice = match &req.tool_choice {
            Some(choice) => Some(choice.clone()),
            None => req
                .function_call
                .as_ref()
                .map(|call| function_call_to_tool_choice(Some(call))),
        };

        Ok(serialize_request(
            &req.messages,
            tools.as_deref(),
            tool_choice.as_ref(),
            self.version,
            &self.prune_rules,
        )?)
    }
}
