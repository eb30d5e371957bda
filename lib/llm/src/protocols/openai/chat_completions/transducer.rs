// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental transcoding of a flat completion stream into `chat.completion.chunk`s.
//!
//! The first few characters decide, once, whether the completion is plain text or a
//! sequence of `<function>name<arguments>{...}` calls. Plain text is forwarded as content.
//! Calls are emitted as a name chunk followed by argument chunks, with a new call starting
//! only at a complete `<function>` marker. A marker split across fragments is held back
//! until it either completes or is disproved.
//!
//! Whitespace around the whole completion is dropped, as in one-shot decoding: leading
//! whitespace never reaches a chunk, and trailing whitespace is held until more text follows
//! it or discarded at the end.

use async_stream::stream;
use futures::{Stream, StreamExt};
use validator::Validate;

use flatchat_parsers::{TagParserConfig, new_call_id};

use super::{
    ChatCompletionMessageToolCallChunk, ChatCompletionStreamResponse, DeltaGenerator,
    FunctionCallStream,
};
use crate::config::TranscoderConfig;
use crate::protocols::Annotated;
use crate::protocols::backend::{BackendEvent, BackendStreamChunk};
use crate::protocols::openai::{ChatCompletionToolType, CompletionUsage, FinishReason};
use crate::utils::{MarkerMatcher, MatchResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Not enough text seen yet to tell plain text from calls
    Undetermined,
    PlainText,
    ToolCalls,
}

#[derive(Debug)]
struct ParserState {
    mode: StreamMode,
    /// Text received but not emitted yet
    buffer: String,
    /// Trailing whitespace of the last content or arguments emitted
    held_whitespace: String,
    in_arguments: bool,
    call_index: u32,
    call_id: String,
    role_observed: bool,
    role_announced: bool,
    calls_emitted: bool,
    /// The backend reported a finish reason; the response ends at usage or at close
    stopped: bool,
    finished: bool,
}

impl ParserState {
    fn new() -> Self {
        Self {
            mode: StreamMode::Undetermined,
            buffer: String::new(),
            held_whitespace: String::new(),
            in_arguments: false,
            call_index: 0,
            call_id: new_call_id(),
            role_observed: false,
            role_announced: false,
            calls_emitted: false,
            stopped: false,
            finished: false,
        }
    }
}

/// What name detection found in the buffer.
enum CallHead {
    /// Name and the text after the arguments marker
    WithArguments { name: String, remainder: String },
    /// Name of a call cut short by the next call marker, and the text from that marker on
    Empty { name: String, remainder: String },
}

/// Push-based transducer for one streamed completion.
///
/// Owns the parse state of exactly one stream; create one per response.
pub struct FlatStreamParser {
    tags: TagParserConfig,
    sniff_length: usize,
    boundary: MarkerMatcher,
    generator: DeltaGenerator,
    state: ParserState,
}

impl FlatStreamParser {
    pub fn new(config: &TranscoderConfig, generator: DeltaGenerator) -> anyhow::Result<Self> {
        config.validate()?;
        let tags = TagParserConfig::default();
        let boundary = MarkerMatcher::new(vec![tags.call_marker.clone()])?;

        Ok(Self {
            tags,
            sniff_length: config.sniff_length,
            boundary,
            generator,
            state: ParserState::new(),
        })
    }

    pub fn mode(&self) -> StreamMode {
        self.state.mode
    }

    /// True once the terminal marker has been handled.
    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Feed one backend event and collect the chunks it completes.
    pub fn push(&mut self, event: BackendEvent) -> Vec<ChatCompletionStreamResponse> {
        if self.state.finished {
            tracing::trace!(?event, "ignoring backend event after finish");
            return Vec::new();
        }

        match event {
            BackendEvent::Role(_) => {
                self.state.role_observed = true;
                Vec::new()
            }
            BackendEvent::Text(text) => self.on_text(&text),
            BackendEvent::Stopped(reason) => {
                tracing::debug!(reason, "backend stopped generating");
                self.state.stopped = true;
                Vec::new()
            }
            BackendEvent::Finish(usage) => self.on_finish(usage),
        }
    }

    /// The backend stream closed.
    ///
    /// Finishes the response without usage when a finish reason was reported. A close
    /// without one is abrupt and emits nothing.
    pub fn close(&mut self) -> Vec<ChatCompletionStreamResponse> {
        if self.state.finished {
            return Vec::new();
        }
        if !self.state.stopped {
            tracing::debug!(
                buffered = self.state.buffer.len(),
                "backend stream closed without a finish marker"
            );
            return Vec::new();
        }
        self.on_finish(None)
    }

    fn on_text(&mut self, text: &str) -> Vec<ChatCompletionStreamResponse> {
        let mut out = Vec::new();
        tracing::trace!(mode = ?self.state.mode, fragment = text, "fragment");

        match self.state.mode {
            StreamMode::PlainText => self.emit_content(&mut out, text.to_string()),
            StreamMode::ToolCalls => {
                self.state.buffer.push_str(text);
                self.drain_tool_calls(&mut out);
            }
            StreamMode::Undetermined => {
                self.state.buffer.push_str(text);
                match self.sniff() {
                    None => {}
                    Some(true) => {
                        tracing::debug!("completion opens with a tool call");
                        self.state.mode = StreamMode::ToolCalls;
                        self.drain_tool_calls(&mut out);
                    }
                    Some(false) => {
                        tracing::debug!("completion is plain text");
                        self.state.mode = StreamMode::PlainText;
                        let buffered = std::mem::take(&mut self.state.buffer);
                        self.emit_content(&mut out, buffered.trim_start().to_string());
                    }
                }
            }
        }
        out
    }

    /// Compare the first `sniff_length` characters after leading whitespace with the call
    /// marker. `None` until that many characters are buffered.
    fn sniff(&self) -> Option<bool> {
        let trimmed = self.state.buffer.trim_start();
        if trimmed.chars().count() < self.sniff_length {
            return None;
        }
        Some(
            trimmed
                .chars()
                .take(self.sniff_length)
                .eq(self.tags.call_marker.chars().take(self.sniff_length)),
        )
    }

    fn drain_tool_calls(&mut self, out: &mut Vec<ChatCompletionStreamResponse>) {
        loop {
            if self.state.in_arguments {
                let pending = std::mem::take(&mut self.state.buffer);
                match self.boundary.process(&pending) {
                    MatchResult::Complete {
                        prefix,
                        marker,
                        suffix,
                    } => {
                        // whitespace before an inner call marker belongs to the arguments
                        let held = std::mem::take(&mut self.state.held_whitespace);
                        self.push_arguments(out, held + &prefix);
                        self.start_next_call();
                        self.state.buffer = marker + &suffix;
                    }
                    MatchResult::Partial { prefix, partial } => {
                        self.emit_arguments(out, prefix);
                        self.state.buffer = partial;
                        return;
                    }
                    MatchResult::None { content } => {
                        self.emit_arguments(out, content);
                        return;
                    }
                }
            } else {
                if !self.state.calls_emitted && !self.opens_with_call_marker() {
                    self.degrade_to_content(out);
                    return;
                }
                match self.detect_call_head() {
                    Some(CallHead::WithArguments { name, remainder }) => {
                        self.emit_call_start(out, name);
                        self.state.in_arguments = true;
                        self.state.buffer = remainder;
                    }
                    Some(CallHead::Empty { name, remainder }) => {
                        self.emit_call_start(out, name);
                        self.start_next_call();
                        self.state.buffer = remainder;
                    }
                    None => return,
                }
            }
        }
    }

    /// Buffered text after leading whitespace is the call marker, or could still become it.
    fn opens_with_call_marker(&self) -> bool {
        let trimmed = self.state.buffer.trim_start();
        let marker = self.tags.call_marker.as_str();
        trimmed.starts_with(marker) || marker.starts_with(trimmed)
    }

    fn detect_call_head(&self) -> Option<CallHead> {
        let call_marker = self.tags.call_marker.as_str();
        let args_marker = self.tags.arguments_marker.as_str();

        let start = self.state.buffer.find(call_marker)?;
        let rest = &self.state.buffer[start + call_marker.len()..];

        match (rest.find(args_marker), rest.find(call_marker)) {
            (Some(args_at), next) if next.is_none_or(|next_at| args_at < next_at) => {
                Some(CallHead::WithArguments {
                    name: rest[..args_at].to_string(),
                    remainder: rest[args_at + args_marker.len()..].to_string(),
                })
            }
            (_, Some(next_at)) => Some(CallHead::Empty {
                name: rest[..next_at].to_string(),
                remainder: rest[next_at..].to_string(),
            }),
            _ => None,
        }
    }

    fn degrade_to_content(&mut self, out: &mut Vec<ChatCompletionStreamResponse>) {
        tracing::warn!(
            buffered = self.state.buffer.as_str(),
            "completion looked like a tool call but is not one; forwarding it as content"
        );
        self.state.mode = StreamMode::PlainText;
        let buffered = std::mem::take(&mut self.state.buffer);
        self.emit_content(out, buffered.trim_start().to_string());
    }

    fn start_next_call(&mut self) {
        self.state.in_arguments = false;
        self.state.call_index += 1;
        self.state.call_id = new_call_id();
        tracing::debug!(index = self.state.call_index, "call boundary");
    }

    fn announce_role(&mut self, out: &mut Vec<ChatCompletionStreamResponse>) {
        if self.state.role_observed && !self.state.role_announced {
            self.state.role_announced = true;
            out.push(self.generator.role_chunk());
        }
    }

    /// Prepend the held whitespace and hold back this text's own trailing whitespace.
    fn hold_trailing_whitespace(&mut self, text: String) -> String {
        let mut text = std::mem::take(&mut self.state.held_whitespace) + &text;
        let body_len = text.trim_end().len();
        self.state.held_whitespace = text.split_off(body_len);
        text
    }

    fn emit_content(&mut self, out: &mut Vec<ChatCompletionStreamResponse>, text: String) {
        let text = self.hold_trailing_whitespace(text);
        if text.is_empty() {
            return;
        }
        self.announce_role(out);
        out.push(self.generator.content_chunk(text));
    }

    fn emit_call_start(&mut self, out: &mut Vec<ChatCompletionStreamResponse>, name: String) {
        self.announce_role(out);
        self.state.calls_emitted = true;
        tracing::debug!(
            index = self.state.call_index,
            id = self.state.call_id.as_str(),
            name = name.as_str(),
            "tool call started"
        );
        let call = ChatCompletionMessageToolCallChunk {
            index: self.state.call_index,
            id: Some(self.state.call_id.clone()),
            r#type: Some(ChatCompletionToolType::Function),
            function: Some(FunctionCallStream {
                name: Some(name),
                arguments: Some(String::new()),
            }),
        };
        out.push(self.generator.tool_call_chunk(call));
    }

    fn emit_arguments(&mut self, out: &mut Vec<ChatCompletionStreamResponse>, arguments: String) {
        let arguments = self.hold_trailing_whitespace(arguments);
        self.push_arguments(out, arguments);
    }

    fn push_arguments(&mut self, out: &mut Vec<ChatCompletionStreamResponse>, arguments: String) {
        if arguments.is_empty() {
            return;
        }
        self.announce_role(out);
        let call = ChatCompletionMessageToolCallChunk {
            index: self.state.call_index,
            function: Some(FunctionCallStream {
                name: None,
                arguments: Some(arguments),
            }),
            ..Default::default()
        };
        out.push(self.generator.tool_call_chunk(call));
    }

    fn on_finish(&mut self, usage: Option<CompletionUsage>) -> Vec<ChatCompletionStreamResponse> {
        let mut out = Vec::new();
        self.flush(&mut out);
        if !self.state.held_whitespace.is_empty() {
            tracing::trace!(
                len = self.state.held_whitespace.len(),
                "dropping trailing whitespace"
            );
            self.state.held_whitespace.clear();
        }

        let finish_reason = if self.state.calls_emitted {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };
        out.push(self.generator.finish_chunk(finish_reason, usage));
        self.state.finished = true;

        tracing::debug!(
            ?finish_reason,
            chunks = self.generator.chunks_issued(),
            "stream finished"
        );
        out
    }

    /// Emit whatever is still buffered when the backend signals the end.
    fn flush(&mut self, out: &mut Vec<ChatCompletionStreamResponse>) {
        let pending = std::mem::take(&mut self.state.buffer);
        if pending.is_empty() {
            return;
        }

        match self.state.mode {
            StreamMode::Undetermined | StreamMode::PlainText => {
                self.emit_content(out, pending.trim_start().to_string())
            }
            StreamMode::ToolCalls if self.state.in_arguments => self.emit_arguments(out, pending),
            StreamMode::ToolCalls => {
                let pending = pending.trim();
                match pending.strip_prefix(self.tags.call_marker.as_str()) {
                    // the arguments marker never arrived
                    Some(name) => self.emit_call_start(out, name.to_string()),
                    None => self.emit_content(out, pending.to_string()),
                }
            }
        }
    }
}

/// Pull-based wrapper applying a [`FlatStreamParser`] to a stream of backend chunks.
pub struct FlatStreamTranscoder {
    parser: FlatStreamParser,
}

impl FlatStreamTranscoder {
    pub fn new(
        config: &TranscoderConfig,
        model: impl Into<String>,
        request_id: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let generator = DeltaGenerator::new(model, request_id);
        Ok(Self {
            parser: FlatStreamParser::new(config, generator)?,
        })
    }

    /// Transcode `stream` until the backend finishes or fails.
    ///
    /// An upstream error item is forwarded as the last item. A stream that closes after a
    /// finish reason but before any usage is finished without usage; one that closes without
    /// either ends without a finish chunk.
    pub fn apply<S>(
        self,
        stream: S,
    ) -> impl Stream<Item = Annotated<ChatCompletionStreamResponse>> + Send
    where
        S: Stream<Item = Annotated<BackendStreamChunk>> + Send + 'static,
    {
        let mut parser = self.parser;

        stream! {
            tokio::pin!(stream);
            let mut failed = false;

            while let Some(item) = stream.next().await {
                if item.is_error() {
                    tracing::debug!(comment = ?item.comment, "upstream failed; ending stream");
                    yield item.transfer::<ChatCompletionStreamResponse>(None);
                    failed = true;
                    break;
                }

                let Some(chunk) = item.data else {
                    continue;
                };

                for event in chunk.into_events() {
                    for response in parser.push(event) {
                        yield Annotated::from_data(response);
                    }
                }

                if parser.is_finished() {
                    break;
                }
            }

            if !failed {
                for response in parser.close() {
                    yield Annotated::from_data(response);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> FlatStreamParser {
        FlatStreamParser::new(&TranscoderConfig::default(), DeltaGenerator::new("m", "r"))
            .unwrap()
    }

    fn text(fragment: &str) -> BackendEvent {
        BackendEvent::Text(fragment.to_string())
    }

    #[test]
    fn test_short_text_stays_undetermined() {
        let mut parser = parser();
        assert!(parser.push(text("Hi")).is_empty());
        assert_eq!(parser.mode(), StreamMode::Undetermined);
    }

    #[test]
    fn test_leading_whitespace_does_not_count_towards_sniff() {
        let mut parser = parser();
        assert!(parser.push(text("\n\n  <fu")).is_empty());
        assert_eq!(parser.mode(), StreamMode::Undetermined);
        assert!(parser.push(text("nc")).is_empty());
        assert_eq!(parser.mode(), StreamMode::ToolCalls);
    }

    #[test]
    fn test_plain_text_mode_is_final() {
        let mut parser = parser();
        let chunks = parser.push(text("Hello there"));
        assert_eq!(parser.mode(), StreamMode::PlainText);
        assert_eq!(chunks.len(), 1);

        let chunks = parser.push(text("<function>x<arguments>{}"));
        assert_eq!(
            chunks[0].delta().and_then(|d| d.content.as_deref()),
            Some("<function>x<arguments>{}")
        );
    }

    #[test]
    fn test_lookalike_marker_degrades_to_content() {
        let mut parser = parser();
        assert!(parser.push(text("<func")).is_empty());
        let chunks = parser.push(text("tor> is a C++ idiom"));
        assert_eq!(parser.mode(), StreamMode::PlainText);
        assert_eq!(
            chunks[0].delta().and_then(|d| d.content.as_deref()),
            Some("<functor> is a C++ idiom")
        );
    }

    #[test]
    fn test_events_after_finish_are_ignored() {
        let mut parser = parser();
        parser.push(text("Hello there"));
        let chunks = parser.push(BackendEvent::Finish(None));
        assert_eq!(chunks.len(), 1);
        assert!(parser.is_finished());
        assert!(parser.push(text("late")).is_empty());
        assert!(parser.push(BackendEvent::Finish(None)).is_empty());
    }

    #[test]
    fn test_finish_reason_waits_for_usage() {
        let mut parser = parser();
        assert!(parser.push(text("Ok")).is_empty());
        assert!(parser.push(BackendEvent::Stopped("stop".to_string())).is_empty());
        assert!(!parser.is_finished());

        let usage = CompletionUsage::new(4, 1);
        let chunks = parser.push(BackendEvent::Finish(Some(usage.clone())));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].usage, Some(usage));
        assert!(parser.close().is_empty());
    }

    #[test]
    fn test_close_after_finish_reason_finishes() {
        let mut parser = parser();
        parser.push(text("Ok"));
        parser.push(BackendEvent::Stopped("stop".to_string()));

        let chunks = parser.close();
        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].delta().and_then(|d| d.content.as_deref()),
            Some("Ok")
        );
        assert_eq!(chunks[1].finish_reason(), Some(FinishReason::Stop));
        assert_eq!(chunks[1].usage, None);
        assert!(parser.is_finished());
    }

    #[test]
    fn test_close_without_finish_reason_is_abrupt() {
        let mut parser = parser();
        parser.push(text("Ok"));
        assert!(parser.close().is_empty());
        assert!(!parser.is_finished());
    }

    #[test]
    fn test_trailing_whitespace_is_held_until_text_follows() {
        let mut parser = parser();
        let chunks = parser.push(text("Hello \n"));
        assert_eq!(
            chunks[0].delta().and_then(|d| d.content.as_deref()),
            Some("Hello")
        );
        assert!(parser.push(text("  ")).is_empty());

        let chunks = parser.push(text("world"));
        assert_eq!(
            chunks[0].delta().and_then(|d| d.content.as_deref()),
            Some(" \n  world")
        );

        parser.push(text("\n"));
        let chunks = parser.push(BackendEvent::Finish(None));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].finish_reason(), Some(FinishReason::Stop));
    }

    #[test]
    fn test_rejects_invalid_sniff_length() {
        let config = TranscoderConfig {
            sniff_length: 1,
            ..Default::default()
        };
        assert!(FlatStreamParser::new(&config, DeltaGenerator::new("m", "r")).is_err());
    }
}
