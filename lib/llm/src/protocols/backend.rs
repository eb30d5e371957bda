// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Typed view of what text-completion backends send back.
//!
//! Backends answer either with chat-style deltas or with completions-style text. Both are
//! decoded here once, so the serializers and the stream transducer only see [`BackendEvent`]s.

use serde::{Deserialize, Serialize};

use super::openai::{CompletionUsage, Role};

/// What the transducer consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// The backend announced the assistant role
    Role(Role),
    /// A fragment of generated text
    Text(String),
    /// The backend reported a `finish_reason`. A usage-only chunk may still follow.
    Stopped(String),
    /// Terminal marker, with the backend's usage accounting when it sent one
    Finish(Option<CompletionUsage>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendChatChoice {
    #[serde(default)]
    pub index: u32,
    pub delta: BackendDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendTextChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// One streamed backend chunk.
///
/// A chunk that carries `usage` is the terminal one. A choice's `finish_reason` marks the
/// end of generation; backends streaming usage send it in a later chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendStreamChunk {
    Chat {
        choices: Vec<BackendChatChoice>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<CompletionUsage>,
    },
    Completion {
        #[serde(default)]
        choices: Vec<BackendTextChoice>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<CompletionUsage>,
    },
}

impl BackendStreamChunk {
    /// A completions-style chunk carrying one text fragment.
    pub fn text(text: impl Into<String>) -> Self {
        BackendStreamChunk::Completion {
            choices: vec![BackendTextChoice {
                index: 0,
                text: text.into(),
                finish_reason: None,
            }],
            usage: None,
        }
    }

    /// A completions-style chunk reporting the end of generation, without usage.
    pub fn stopped(reason: impl Into<String>) -> Self {
        BackendStreamChunk::Completion {
            choices: vec![BackendTextChoice {
                index: 0,
                text: String::new(),
                finish_reason: Some(reason.into()),
            }],
            usage: None,
        }
    }

    /// A terminal chunk with no choices.
    pub fn finish(usage: CompletionUsage) -> Self {
        BackendStreamChunk::Completion {
            choices: Vec::new(),
            usage: Some(usage),
        }
    }

    /// Split into events, in order: role, text, the finish reason, then the terminal marker.
    ///
    /// Empty text fragments are dropped.
    pub fn into_events(self) -> Vec<BackendEvent> {
        let mut events = Vec::new();
        let mut stopped = None;
        let usage = match self {
            BackendStreamChunk::Chat { choices, usage } => {
                for choice in choices {
                    if let Some(role) = choice.delta.role {
                        events.push(BackendEvent::Role(role));
                    }
                    if let Some(content) = choice.delta.content
                        && !content.is_empty()
                    {
                        events.push(BackendEvent::Text(content));
                    }
                    stopped = stopped.or(choice.finish_reason);
                }
                usage
            }
            BackendStreamChunk::Completion { choices, usage } => {
                for choice in choices {
                    if !choice.text.is_empty() {
                        events.push(BackendEvent::Text(choice.text));
                    }
                    stopped = stopped.or(choice.finish_reason);
                }
                usage
            }
        };

        if let Some(reason) = stopped {
            events.push(BackendEvent::Stopped(reason));
        }
        if usage.is_some() {
            events.push(BackendEvent::Finish(usage));
        }
        events
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCompletionChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<BackendMessage>,
}

/// Body of a non-streamed backend response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendCompletion {
    #[serde(default)]
    pub choices: Vec<BackendCompletionChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionUsage>,
}

impl BackendCompletion {
    /// Generated text of the first choice, and the usage accounting.
    pub fn into_text(self) -> (String, Option<CompletionUsage>) {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| {
                choice
                    .text
                    .or_else(|| choice.message.and_then(|message| message.content))
            })
            .unwrap_or_default();
        (text, self.usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn usage() -> CompletionUsage {
        CompletionUsage::new(10, 4)
    }

    #[test]
    fn test_decode_chat_delta() {
        let chunk: BackendStreamChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hi"}}]
        }))
        .unwrap();
        assert_eq!(
            chunk.into_events(),
            vec![
                BackendEvent::Role(Role::Assistant),
                BackendEvent::Text("Hi".to_string())
            ]
        );
    }

    #[test]
    fn test_decode_completion_text() {
        let chunk: BackendStreamChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "text": "<func"}]
        }))
        .unwrap();
        assert_eq!(
            chunk.into_events(),
            vec![BackendEvent::Text("<func".to_string())]
        );
    }

    #[test]
    fn test_usage_only_chunk_is_terminal() {
        let chunk: BackendStreamChunk = serde_json::from_value(json!({
            "choices": [],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }))
        .unwrap();
        assert_eq!(chunk.into_events(), vec![BackendEvent::Finish(Some(usage()))]);

        let chunk: BackendStreamChunk = serde_json::from_value(json!({
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }))
        .unwrap();
        assert_eq!(chunk.into_events(), vec![BackendEvent::Finish(Some(usage()))]);
    }

    #[test]
    fn test_text_and_usage_in_one_chunk() {
        let chunk: BackendStreamChunk = serde_json::from_value(json!({
            "choices": [{"delta": {"content": "}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }))
        .unwrap();
        assert_eq!(
            chunk.into_events(),
            vec![
                BackendEvent::Text("}".to_string()),
                BackendEvent::Finish(Some(usage()))
            ]
        );
    }

    #[test]
    fn test_finish_reason_without_usage() {
        let chunk: BackendStreamChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
        }))
        .unwrap();
        assert_eq!(
            chunk.into_events(),
            vec![BackendEvent::Stopped("stop".to_string())]
        );

        let chunk: BackendStreamChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "text": "!", "finish_reason": "length"}]
        }))
        .unwrap();
        assert_eq!(
            chunk.into_events(),
            vec![
                BackendEvent::Text("!".to_string()),
                BackendEvent::Stopped("length".to_string())
            ]
        );

        let chunk: BackendStreamChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "finish_reason": "stop"}]
        }))
        .unwrap();
        assert_eq!(chunk, BackendStreamChunk::stopped("stop"));
    }

    #[test]
    fn test_usage_is_kept_verbatim() {
        let chunk: BackendStreamChunk = serde_json::from_value(json!({
            "choices": [],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 4,
                "completion_tokens_details": {"reasoning_tokens": 0}
            }
        }))
        .unwrap();
        let events = chunk.into_events();
        let [BackendEvent::Finish(Some(usage))] = events.as_slice() else {
            panic!("expected a single finish event, got {events:?}");
        };
        assert_eq!(usage.total_tokens, None);
        assert_eq!(
            serde_json::to_value(usage).unwrap(),
            json!({
                "prompt_tokens": 10,
                "completion_tokens": 4,
                "completion_tokens_details": {"reasoning_tokens": 0}
            })
        );
    }

    #[test]
    fn test_empty_fragments_are_dropped() {
        assert!(BackendStreamChunk::text("").into_events().is_empty());
    }

    #[test]
    fn test_completion_body() {
        let body: BackendCompletion = serde_json::from_value(json!({
            "choices": [{"text": "<function>f"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }))
        .unwrap();
        assert_eq!(body.into_text(), ("<function>f".to_string(), Some(usage())));

        let body: BackendCompletion = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}]
        }))
        .unwrap();
        assert_eq!(body.into_text(), ("hello".to_string(), None));
    }
}
