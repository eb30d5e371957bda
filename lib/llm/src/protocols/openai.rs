// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! OpenAI-compatible chat request and message types.
//!
//! Field names and JSON shapes follow the public chat completions API so requests can be
//! deserialized straight from client payloads and messages serialized straight into prompts.

use serde::{Deserialize, Serialize};

pub mod chat_completions;
pub mod tools;

pub use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionNamedToolChoice, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionToolType, FinishReason, FunctionCall,
    FunctionName, FunctionObject,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    #[default]
    Assistant,
    Tool,
    /// Result of a legacy `function_call`
    Function,
}

/// One chat turn.
///
/// `content` is always serialized, as `null` when absent. The remaining optional fields are
/// left out of the JSON entirely so flattened prompts stay minimal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ChatCompletionMessageToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatCompletionMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// An assistant turn carrying calls and no content.
    pub fn assistant_tool_calls(tool_calls: Vec<ChatCompletionMessageToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls,
            ..Default::default()
        }
    }
}

/// Legacy selector paired with `functions`: `"none"`, `"auto"` or `{"name":...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatCompletionFunctionCall {
    None,
    Auto,
    #[serde(untagged)]
    Function { name: String },
}

/// Token accounting reported by the backend, forwarded verbatim.
///
/// Every count is optional and fields not named here are kept as they arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CompletionUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            total_tokens: Some(prompt_tokens.saturating_add(completion_tokens)),
            extra: serde_json::Map::new(),
        }
    }
}

/// Chat request as received from a client.
///
/// Only the fields that take part in prompt flattening are modelled; unknown fields are
/// accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatCompletionMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatCompletionTool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ChatCompletionToolChoiceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<ChatCompletionFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_field_order_and_null_content() {
        let msg = ChatCompletionMessage::assistant_tool_calls(vec![ChatCompletionMessageToolCall {
            id: "call-1".to_string(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: "f".to_string(),
                arguments: "{}".to_string(),
            },
        }]);
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"assistant","content":null,"tool_calls":[{"id":"call-1","type":"function","function":{"name":"f","arguments":"{}"}}]}"#
        );
    }

    #[test]
    fn test_plain_message_is_minimal() {
        let msg = ChatCompletionMessage::user("hi");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"user","content":"hi"}"#
        );
    }

    #[test]
    fn test_tool_choice_wire_forms() {
        let none: ChatCompletionToolChoiceOption = serde_json::from_value(json!("none")).unwrap();
        assert_eq!(none, ChatCompletionToolChoiceOption::None);

        let required: ChatCompletionToolChoiceOption =
            serde_json::from_value(json!("required")).unwrap();
        assert_eq!(required, ChatCompletionToolChoiceOption::Required);

        let named: ChatCompletionToolChoiceOption = serde_json::from_value(
            json!({"type": "function", "function": {"name": "get_weather"}}),
        )
        .unwrap();
        assert_eq!(named, tools::named_tool_choice("get_weather"));
        assert_eq!(
            serde_json::to_value(&named).unwrap(),
            json!({"type": "function", "function": {"name": "get_weather"}})
        );
    }

    #[test]
    fn test_legacy_function_call_wire_forms() {
        let auto: ChatCompletionFunctionCall = serde_json::from_value(json!("auto")).unwrap();
        assert_eq!(auto, ChatCompletionFunctionCall::Auto);

        let named: ChatCompletionFunctionCall =
            serde_json::from_value(json!({"name": "lookup"})).unwrap();
        assert_eq!(
            named,
            ChatCompletionFunctionCall::Function {
                name: "lookup".to_string()
            }
        );
    }

    #[test]
    fn test_usage_keeps_unknown_fields() {
        let raw = json!({
            "prompt_tokens": 7,
            "completion_tokens": 3,
            "prompt_tokens_details": {"cached_tokens": 4}
        });
        let usage: CompletionUsage = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(usage.prompt_tokens, Some(7));
        assert_eq!(usage.total_tokens, None);
        assert_eq!(usage.extra["prompt_tokens_details"], json!({"cached_tokens": 4}));
        assert_eq!(serde_json::to_value(&usage).unwrap(), raw);
    }

    #[test]
    fn test_usage_from_counts() {
        let usage = CompletionUsage::new(12, 9);
        assert_eq!(
            serde_json::to_value(&usage).unwrap(),
            json!({"prompt_tokens": 12, "completion_tokens": 9, "total_tokens": 21})
        );
    }

    #[test]
    fn test_request_ignores_unknown_fields() {
        let req: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "m",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.2
        }))
        .unwrap();
        assert_eq!(req.messages, vec![ChatCompletionMessage::user("hi")]);
        assert!(req.tools.is_none());
    }
}
