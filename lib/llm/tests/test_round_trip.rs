// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! One-shot and streamed decoding of the same completion must agree.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rstest::rstest;

use flatchat_llm::TranscoderConfig;
use flatchat_llm::protocols::backend::BackendEvent;
use flatchat_llm::protocols::openai::chat_completions::{
    ChatCompletionStreamResponse, DeltaGenerator, FlatStreamParser, deserialize_chat_output,
    serialize_chat_output,
};
use flatchat_llm::protocols::openai::{
    ChatCompletionMessage, ChatCompletionMessageToolCall, ChatCompletionToolType, FunctionCall,
};

/// What a client reassembles from a chunk stream: content and `{name, arguments}` per index
#[derive(Debug, Default, PartialEq)]
struct Assembled {
    content: String,
    calls: Vec<(String, String)>,
}

fn stream_one_char_at_a_time(text: &str) -> Vec<ChatCompletionStreamResponse> {
    let mut parser = FlatStreamParser::new(
        &TranscoderConfig::default(),
        DeltaGenerator::new("flat-model", "round-trip"),
    )
    .unwrap();

    let mut chunks: Vec<_> = text
        .chars()
        .flat_map(|c| parser.push(BackendEvent::Text(c.to_string())))
        .collect();
    chunks.extend(parser.push(BackendEvent::Finish(None)));
    chunks
}

fn assemble(chunks: &[ChatCompletionStreamResponse]) -> Assembled {
    let mut content = String::new();
    let mut calls: BTreeMap<u32, (String, String)> = BTreeMap::new();

    for delta in chunks.iter().filter_map(|chunk| chunk.delta()) {
        if let Some(text) = &delta.content {
            content.push_str(text);
        }
        for call in delta.tool_calls.iter().flatten() {
            let entry = calls.entry(call.index).or_default();
            if let Some(function) = &call.function {
                if let Some(name) = &function.name {
                    entry.0.push_str(name);
                }
                if let Some(arguments) = &function.arguments {
                    entry.1.push_str(arguments);
                }
            }
        }
    }

    Assembled {
        content,
        calls: calls.into_values().collect(),
    }
}

fn one_shot(text: &str) -> Assembled {
    let message = deserialize_chat_output(text);
    Assembled {
        content: message.content.unwrap_or_default(),
        calls: message
            .tool_calls
            .into_iter()
            .map(|call| (call.function.name, call.function.arguments))
            .collect(),
    }
}

fn message_with_calls(calls: &[(String, String)]) -> ChatCompletionMessage {
    ChatCompletionMessage::assistant_tool_calls(
        calls
            .iter()
            .enumerate()
            .map(|(i, (name, arguments))| ChatCompletionMessageToolCall {
                id: format!("call-{i}"),
                r#type: ChatCompletionToolType::Function,
                function: FunctionCall {
                    name: name.clone(),
                    arguments: arguments.clone(),
                },
            })
            .collect(),
    )
}

#[rstest]
#[case("")]
#[case("Hi")]
#[case("The weather in SF is sunny.")]
#[case("<functor> is not a call")]
#[case("<function>get_weather<arguments>{\"city\":\"SF\"}")]
#[case("<function>a<arguments>{}<function>b<arguments>{}")]
#[case("<function>now")]
#[case("<function>now<function>then<arguments>[1,2]")]
#[case("<function>cmp<arguments>{\"op\":\"<fun\"}")]
#[case("<function>f<arguments>{\"html\":\"<b>x</b>\"}")]
#[case("<functi")]
#[case("  Hello there\n")]
#[case("\n\n")]
#[case(" Ok ")]
#[case("\n<function>f<arguments>{\"a\":1}\n")]
#[case("<function>ping \n")]
#[case("<function>now<arguments>\n")]
#[case("<function>a<arguments>{} <function>b<arguments>{}\t")]
#[case("<function>cmp<arguments>{\"op\":1} <fun\n")]
#[case("  <functor> is not a call\n")]
#[case("Two  spaces  inside, newline after\n")]
fn test_streaming_matches_one_shot(#[case] text: &str) {
    assert_eq!(assemble(&stream_one_char_at_a_time(text)), one_shot(text));
}

#[test]
fn test_stream_finish_reason_matches_one_shot() {
    use flatchat_llm::protocols::openai::FinishReason;

    let chunks = stream_one_char_at_a_time("<function>f<arguments>{}");
    assert_eq!(
        chunks.last().and_then(|c| c.finish_reason()),
        Some(FinishReason::ToolCalls)
    );

    let chunks = stream_one_char_at_a_time("plain answer");
    assert_eq!(
        chunks.last().and_then(|c| c.finish_reason()),
        Some(FinishReason::Stop)
    );
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,11}"
}

fn arguments_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "\\{\"[a-z]{1,6}\":(\"[a-zA-Z0-9 <>/]{0,10}\"|[0-9]{1,4}|true|null)\\}",
    ]
}

fn content_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9.,!?<>/]([a-zA-Z0-9 .,!?<>/]{0,40}[a-zA-Z0-9.,!?<>/])?"
        .prop_filter("content must not open with the call marker", |s| {
            !s.starts_with("<function>")
        })
}

fn whitespace_strategy() -> impl Strategy<Value = String> {
    "[ \t\n]{0,3}"
}

/// Plain content or a flattened call sequence
fn completion_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        content_strategy(),
        prop::collection::vec((name_strategy(), arguments_strategy()), 1..4)
            .prop_map(|calls| serialize_chat_output(&message_with_calls(&calls))),
    ]
}

proptest! {
    #[test]
    fn prop_content_round_trip(content in content_strategy()) {
        let message = ChatCompletionMessage::assistant(content.clone());
        let decoded = deserialize_chat_output(&serialize_chat_output(&message));
        prop_assert_eq!(decoded.content, Some(content));
        prop_assert!(decoded.tool_calls.is_empty());
    }

    #[test]
    fn prop_calls_round_trip(
        calls in prop::collection::vec((name_strategy(), arguments_strategy()), 1..4)
    ) {
        let flat = serialize_chat_output(&message_with_calls(&calls));
        let decoded = deserialize_chat_output(&flat);

        prop_assert_eq!(decoded.content, None);
        let pairs: Vec<(String, String)> = decoded
            .tool_calls
            .into_iter()
            .map(|call| (call.function.name, call.function.arguments))
            .collect();
        prop_assert_eq!(pairs, calls.clone());
        prop_assert_eq!(serialize_chat_output(&deserialize_chat_output(&flat)), flat);
    }

    #[test]
    fn prop_streaming_content_matches_one_shot(content in content_strategy()) {
        prop_assert_eq!(assemble(&stream_one_char_at_a_time(&content)), one_shot(&content));
    }

    #[test]
    fn prop_surrounding_whitespace_is_dropped_like_one_shot(
        leading in whitespace_strategy(),
        body in completion_strategy(),
        trailing in whitespace_strategy(),
    ) {
        let text = format!("{leading}{body}{trailing}");
        let streamed = assemble(&stream_one_char_at_a_time(&text));
        prop_assert_eq!(&streamed, &one_shot(&text));
        prop_assert_eq!(streamed, one_shot(&body));
    }

    #[test]
    fn prop_streaming_calls_match_one_shot(
        calls in prop::collection::vec((name_strategy(), arguments_strategy()), 1..4)
    ) {
        let flat = serialize_chat_output(&message_with_calls(&calls));
        let streamed = assemble(&stream_one_char_at_a_time(&flat));
        prop_assert_eq!(&streamed, &one_shot(&flat));
        prop_assert_eq!(streamed.calls, calls);
    }
}
