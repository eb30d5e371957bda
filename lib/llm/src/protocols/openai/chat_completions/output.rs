// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! One-shot conversion between a complete flat completion and an assistant message.

use flatchat_parsers::{
    CalledFunction, TagParserConfig, ToolCallResponse, ToolCallType, emit_tool_calls_tags,
    try_tool_call_parse_tags,
};

use super::delta::unix_timestamp;
use super::{ChatChoice, ChatCompletionResponse};
use crate::protocols::openai::{
    ChatCompletionMessage, ChatCompletionMessageToolCall, ChatCompletionToolType,
    CompletionUsage, FinishReason, FunctionCall, Role,
};

/// Flatten an assistant message into the tag grammar.
///
/// Tool calls take precedence, then the legacy `function_call`, then the content.
pub fn serialize_chat_output(message: &ChatCompletionMessage) -> String {
    let config = TagParserConfig::default();

    if !message.tool_calls.is_empty() {
        let calls: Vec<CalledFunction> = message
            .tool_calls
            .iter()
            .map(|call| CalledFunction {
                name: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
            })
            .collect();
        return emit_tool_calls_tags(&calls, &config);
    }

    if let Some(function) = &message.function_call {
        let call = CalledFunction {
            name: function.name.clone(),
            arguments: function.arguments.clone(),
        };
        return emit_tool_calls_tags([&call], &config);
    }

    message.content.clone().unwrap_or_default()
}

/// Parse a complete flat completion into an assistant message.
///
/// Every parsed call gets a fresh id; content is `null` whenever calls are present.
pub fn deserialize_chat_output(text: &str) -> ChatCompletionMessage {
    let (calls, content) = try_tool_call_parse_tags(text, &TagParserConfig::default());
    if calls.is_empty() {
        return ChatCompletionMessage::new(Role::Assistant, content.unwrap_or_default());
    }
    ChatCompletionMessage::assistant_tool_calls(calls.into_iter().map(message_tool_call).collect())
}

fn message_tool_call(call: ToolCallResponse) -> ChatCompletionMessageToolCall {
    ChatCompletionMessageToolCall {
        id: call.id,
        r#type: match call.tp {
            ToolCallType::Function => ChatCompletionToolType::Function,
        },
        function: FunctionCall {
            name: call.function.name,
            arguments: call.function.arguments,
        },
    }
}

/// Wrap a complete backend completion into a `chat.completion` response.
pub fn build_chat_completion(
    model: impl Into<String>,
    request_id: impl AsRef<str>,
    text: &str,
    usage: Option<CompletionUsage>,
) -> ChatCompletionResponse {
    let message = deserialize_chat_output(text);
    let finish_reason = if message.tool_calls.is_empty() {
        FinishReason::Stop
    } else {
        FinishReason::ToolCalls
    };

    tracing::debug!(
        calls = message.tool_calls.len(),
        ?finish_reason,
        "decoded flat completion"
    );

    ChatCompletionResponse {
        id: format!("chatcmpl-{}", request_id.as_ref()),
        object: "chat.completion".to_string(),
        created: unix_timestamp(),
        model: model.into(),
        choices: vec![ChatChoice {
            index: 0,
            message,
            finish_reason: Some(finish_reason),
        }],
        usage,
    }
}
