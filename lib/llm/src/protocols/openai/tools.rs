// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Conversions between the legacy single `function_call` shape and the `tool_calls` shape.

use super::{
    ChatCompletionFunctionCall, ChatCompletionMessage, ChatCompletionMessageToolCall,
    ChatCompletionNamedToolChoice, ChatCompletionTool, ChatCompletionToolChoiceOption,
    ChatCompletionToolType, FunctionName, FunctionObject,
};

/// Calls that could not be carried over when downgrading to `function_call`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LossyConversion {
    /// Names of the dropped calls, in their original order
    pub dropped: Vec<String>,
}

/// A message converted to the legacy shape, plus what was lost doing so.
#[derive(Debug, Clone, PartialEq)]
pub struct Downgrade {
    pub message: ChatCompletionMessage,
    pub lossy: Option<LossyConversion>,
}

/// Wrap each legacy function declaration as a `function` tool.
pub fn functions_to_tools(functions: Option<&[FunctionObject]>) -> Option<Vec<ChatCompletionTool>> {
    functions.map(|functions| {
        functions
            .iter()
            .map(|function| ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: function.clone(),
            })
            .collect()
    })
}

/// Tool choice forcing a single function by name.
pub fn named_tool_choice(name: impl Into<String>) -> ChatCompletionToolChoiceOption {
    ChatCompletionToolChoiceOption::Named(ChatCompletionNamedToolChoice {
        r#type: ChatCompletionToolType::Function,
        function: FunctionName { name: name.into() },
    })
}

/// Map the legacy selector onto a tool choice. An absent selector means `auto`.
pub fn function_call_to_tool_choice(
    function_call: Option<&ChatCompletionFunctionCall>,
) -> ChatCompletionToolChoiceOption {
    match function_call {
        Some(ChatCompletionFunctionCall::None) => ChatCompletionToolChoiceOption::None,
        Some(ChatCompletionFunctionCall::Function { name }) => {
            named_tool_choice(name.clone())
        }
        Some(ChatCompletionFunctionCall::Auto) | None => ChatCompletionToolChoiceOption::Auto,
    }
}

/// Map a tool choice onto the legacy selector. `required` has no legacy form and maps to `auto`.
pub fn tool_choice_to_function_call(
    tool_choice: &ChatCompletionToolChoiceOption,
) -> ChatCompletionFunctionCall {
    match tool_choice {
        ChatCompletionToolChoiceOption::None => ChatCompletionFunctionCall::None,
        ChatCompletionToolChoiceOption::Auto | ChatCompletionToolChoiceOption::Required => {
            ChatCompletionFunctionCall::Auto
        }
        ChatCompletionToolChoiceOption::Named(named) => ChatCompletionFunctionCall::Function {
            name: named.function.name.clone(),
        },
    }
}

/// Move a legacy `function_call` into `tool_calls` under the given call id.
///
/// Messages without a `function_call` are returned unchanged.
pub fn function_message_to_tool_call_message(
    mut message: ChatCompletionMessage,
    id: impl Into<String>,
) -> ChatCompletionMessage {
    if let Some(function) = message.function_call.take() {
        message.tool_calls = vec![ChatCompletionMessageToolCall {
            id: id.into(),
            r#type: ChatCompletionToolType::Function,
            function,
        }];
    }
    message
}

/// Expose the first tool call through the legacy `function_call` field.
///
/// The legacy shape holds a single call; any further calls are reported in
/// [`Downgrade::lossy`] and logged.
pub fn tool_call_message_to_function_message(mut message: ChatCompletionMessage) -> Downgrade {
    let mut calls = std::mem::take(&mut message.tool_calls).into_iter();
    let Some(first) = calls.next() else {
        return Downgrade {
            message,
            lossy: None,
        };
    };

    message.function_call = Some(first.function);

    let dropped: Vec<String> = calls.map(|call| call.function.name).collect();
    let lossy = if dropped.is_empty() {
        None
    } else {
        tracing::warn!(
            kept = message.function_call.as_ref().map(|f| f.name.as_str()),
            ?dropped,
            "function_call holds a single call; dropping the remaining tool calls"
        );
        Some(LossyConversion { dropped })
    };

    Downgrade { message, lossy }
}

/// Bring every message to the `tool_calls` shape.
///
/// Legacy calls get the positional id `call-{index}` so the flattened prompt is the same
/// for the same request.
pub fn normalize_messages(messages: &[ChatCompletionMessage]) -> Vec<ChatCompletionMessage> {
    messages
        .iter()
        .enumerate()
        .map(|(idx, message)| {
            function_message_to_tool_call_message(message.clone(), format!("call-{idx}"))
        })
        .collect()
}
