// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{
    ChatChoiceStream, ChatCompletionMessageToolCallChunk, ChatCompletionStreamResponse,
    ChatCompletionStreamResponseDelta,
};
use crate::protocols::openai::{CompletionUsage, FinishReason, Role};

/// Generates the `chat.completion.chunk` envelopes of one streamed response.
///
/// Every chunk of a stream shares the same `id`, `created` and `model`.
#[derive(Debug, Clone)]
pub struct DeltaGenerator {
    /// Unique identifier for the chat completion session.
    id: String,
    /// Object type, representing a streamed chat completion response.
    object: String,
    /// Timestamp (Unix epoch) when the response was created.
    created: u32,
    model: String,
    /// Counter tracking the number of chunks issued.
    msg_counter: u64,
}

impl DeltaGenerator {
    /// Creates a new [`DeltaGenerator`] for `model`.
    ///
    /// # Arguments
    /// * `model` - The model name reported in every chunk.
    /// * `request_id` - The request ID the response `id` is derived from.
    pub fn new(model: impl Into<String>, request_id: impl AsRef<str>) -> Self {
        Self {
            id: format!("chatcmpl-{}", request_id.as_ref()),
            object: "chat.completion.chunk".to_string(),
            created: unix_timestamp(),
            model: model.into(),
            msg_counter: 0,
        }
    }

    /// Number of chunks produced so far.
    pub fn chunks_issued(&self) -> u64 {
        self.msg_counter
    }

    fn create_choice(
        &mut self,
        delta: ChatCompletionStreamResponseDelta,
        finish_reason: Option<FinishReason>,
        usage: Option<CompletionUsage>,
    ) -> ChatCompletionStreamResponse {
        self.msg_counter += 1;
        ChatCompletionStreamResponse {
            id: self.id.clone(),
            object: self.object.clone(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChatChoiceStream {
                index: 0,
                delta,
                finish_reason,
            }],
            usage,
        }
    }

    /// Announces the assistant role with empty content.
    pub fn role_chunk(&mut self) -> ChatCompletionStreamResponse {
        self.create_choice(
            ChatCompletionStreamResponseDelta {
                role: Some(Role::Assistant),
                content: Some(String::new()),
                tool_calls: None,
            },
            None,
            None,
        )
    }

    pub fn content_chunk(&mut self, text: impl Into<String>) -> ChatCompletionStreamResponse {
        self.create_choice(
            ChatCompletionStreamResponseDelta {
                content: Some(text.into()),
                ..Default::default()
            },
            None,
            None,
        )
    }

    pub fn tool_call_chunk(
        &mut self,
        call: ChatCompletionMessageToolCallChunk,
    ) -> ChatCompletionStreamResponse {
        self.create_choice(
            ChatCompletionStreamResponseDelta {
                tool_calls: Some(vec![call]),
                ..Default::default()
            },
            None,
            None,
        )
    }

    /// Final chunk: empty delta, the finish reason, and upstream usage verbatim.
    pub fn finish_chunk(
        &mut self,
        finish_reason: FinishReason,
        usage: Option<CompletionUsage>,
    ) -> ChatCompletionStreamResponse {
        self.create_choice(
            ChatCompletionStreamResponseDelta::default(),
            Some(finish_reason),
            usage,
        )
    }
}

/// Seconds since the Unix epoch. Saturates instead of failing past `u32::MAX` (year 2106).
pub(crate) fn unix_timestamp() -> u32 {
    u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX)
}
