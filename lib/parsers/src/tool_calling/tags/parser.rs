// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::super::config::TagParserConfig;
use super::response::{CalledFunction, ToolCallResponse};

/// Check if a completion opens with a tag-style tool call.
/// Format: <function>name<arguments>{...}
pub fn detect_tool_call_start_tags(chunk: &str, config: &TagParserConfig) -> bool {
    chunk.trim_start().starts_with(config.call_marker.as_str())
}

/// Split one call segment (the text between two call markers) into name and arguments.
///
/// The arguments marker is only searched inside the segment, so a missing separator
/// yields the whole segment as the name and empty arguments.
pub fn split_call_segment<'a>(segment: &'a str, config: &TagParserConfig) -> (&'a str, &'a str) {
    match segment.find(config.arguments_marker.as_str()) {
        Some(pos) => (
            &segment[..pos],
            &segment[pos + config.arguments_marker.len()..],
        ),
        None => (segment, ""),
    }
}

/// Parse a complete flat completion.
/// Format: <function>name<arguments>{...}<function>name<arguments>{...}
/// Returns (parsed_tool_calls, normal_text_content)
///
/// The text is trimmed first. When it does not open with the call marker the whole
/// trimmed text is content and no calls are returned. Otherwise there is no content.
pub fn try_tool_call_parse_tags(
    message: &str,
    config: &TagParserConfig,
) -> (Vec<ToolCallResponse>, Option<String>) {
    let text = message.trim();
    let call_marker = config.call_marker.as_str();

    let Some(mut rest) = text.strip_prefix(call_marker) else {
        return (Vec::new(), Some(text.to_string()));
    };

    let mut calls = Vec::new();
    loop {
        let end = rest.find(call_marker).unwrap_or(rest.len());
        let (name, arguments) = split_call_segment(&rest[..end], config);

        calls.push(ToolCallResponse::new(CalledFunction {
            name: name.to_string(),
            arguments: arguments.to_string(),
        }));

        if end == rest.len() {
            break;
        }
        rest = &rest[end + call_marker.len()..];
    }

    tracing::trace!(count = calls.len(), "parsed tag-style tool calls");
    (calls, None)
}

/// Render calls back into the flat tag grammar.
///
/// The arguments marker is left out when a call has empty arguments.
pub fn emit_tool_calls_tags<'a>(
    calls: impl IntoIterator<Item = &'a CalledFunction>,
    config: &TagParserConfig,
) -> String {
    let mut out = String::new();
    for call in calls {
        out.push_str(&config.call_marker);
        out.push_str(&call.name);
        if !call.arguments.is_empty() {
            out.push_str(&config.arguments_marker);
            out.push_str(&call.arguments);
        }
    }
    out
}
