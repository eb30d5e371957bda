// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context as _;
use futures::StreamExt;

use flatchat_llm::preprocessor::prompt::{FlatPromptFormatter, OAIPromptFormatter, PipelineVersion};
use flatchat_llm::protocols::Annotated;
use flatchat_llm::protocols::backend::{BackendCompletion, BackendStreamChunk};
use flatchat_llm::protocols::openai::ChatCompletionRequest;
use flatchat_llm::protocols::openai::chat_completions::{
    ChatCompletionResponse, FlatStreamTranscoder, build_chat_completion,
};
use flatchat_llm::{ModelEndpoints, TranscoderConfig};
use flatchat_runtime::protocols::maybe_error::MaybeError;

mod flags;
pub use flags::{Command, Flags};

/// SSE framing some backends keep when their output is captured to a file
const SSE_DATA_PREFIX: &str = "data:";
const SSE_DONE: &str = "[DONE]";

pub async fn run(flags: Flags) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();

    match flags.command {
        Command::Prompt {
            input,
            pipeline_version,
            endpoints,
            prune_rules,
        } => {
            let request: ChatCompletionRequest = serde_json::from_str(&read_input(&input)?)
                .with_context(|| format!("parsing chat request from {}", input.display()))?;
            let version =
                resolve_pipeline_version(pipeline_version, endpoints.as_deref(), &request.model)?;

            let mut config = TranscoderConfig::from_settings()?;
            config.prune_rules.extend(prune_rules);

            let prompt = FlatPromptFormatter::from_config(version, &config).render(&request)?;
            write!(stdout, "{prompt}")?;
        }
        Command::Decode { input, model, raw } => {
            let response = decode(&read_input(&input)?, &model, raw)?;
            serde_json::to_writer_pretty(&mut stdout, &response)?;
            writeln!(stdout)?;
        }
        Command::Stream {
            input,
            model,
            sniff_length,
        } => {
            let config = stream_config(sniff_length)?;
            let input = read_input(&input)?;
            let written = transcode_jsonl(&input, &config, &model, &mut stdout).await?;
            tracing::debug!(chunks = written, "stream transcoded");
        }
    }

    stdout.flush()?;
    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// An explicit version wins; otherwise the model's entry in the endpoint table decides.
pub fn resolve_pipeline_version(
    explicit: Option<u8>,
    endpoints: Option<&Path>,
    model: &str,
) -> anyhow::Result<PipelineVersion> {
    if let Some(version) = explicit {
        return Ok(PipelineVersion::try_from(version)?);
    }

    let table = match endpoints {
        Some(path) => ModelEndpoints::from_file(path)?,
        None => ModelEndpoints::from_settings()?,
    };
    let endpoint = table
        .get(model)
        .context("pass --pipeline-version or configure the model's endpoint")?;
    tracing::debug!(
        model,
        url = %endpoint.url,
        version = %endpoint.pipeline_version,
        "resolved endpoint"
    );
    Ok(endpoint.pipeline_version)
}

fn stream_config(sniff_length: Option<usize>) -> anyhow::Result<TranscoderConfig> {
    let config = TranscoderConfig::from_settings()?;
    match sniff_length {
        None => Ok(config),
        Some(sniff_length) => TranscoderConfig::builder()
            .sniff_length(sniff_length)
            .prune_rules(config.prune_rules)
            .build(),
    }
}

/// Decode a backend completion body, or raw completion text, into a chat response.
///
/// Input is treated as a backend body only when it is a JSON object with `choices`.
pub fn decode(input: &str, model: &str, raw: bool) -> anyhow::Result<ChatCompletionResponse> {
    let request_id = uuid::Uuid::new_v4().simple().to_string();

    let backend_body = (!raw)
        .then(|| serde_json::from_str::<serde_json::Value>(input).ok())
        .flatten()
        .filter(|value| value.get("choices").is_some());

    let (text, usage) = match backend_body {
        Some(value) => serde_json::from_value::<BackendCompletion>(value)
            .context("parsing backend completion")?
            .into_text(),
        None => (input.to_string(), None),
    };

    Ok(build_chat_completion(model, request_id, &text, usage))
}

/// One line of captured backend output
#[derive(Debug)]
enum StreamLine {
    Chunk(Annotated<BackendStreamChunk>),
    /// The SSE end marker
    Done,
}

/// Parse one line of backend output. `None` for blank lines.
fn parse_stream_line(line: &str) -> Option<StreamLine> {
    let line = line.trim();
    let payload = line
        .strip_prefix(SSE_DATA_PREFIX)
        .map(str::trim_start)
        .unwrap_or(line);
    if payload.is_empty() {
        return None;
    }
    if payload == SSE_DONE {
        return Some(StreamLine::Done);
    }

    Some(StreamLine::Chunk(
        match serde_json::from_str::<BackendStreamChunk>(payload) {
            Ok(chunk) => Annotated::from_data(chunk),
            Err(err) => Annotated::from_error(format!("invalid backend chunk: {err}")),
        },
    ))
}

/// Backend chunks up to the end of input or the SSE end marker.
///
/// The end marker is a clean end: it reads as a `stop` finish reason, so a stream that
/// never sent usage still gets its finish chunk.
fn read_stream_items(input: &str) -> Vec<Annotated<BackendStreamChunk>> {
    let mut items = Vec::new();
    for line in input.lines().filter_map(parse_stream_line) {
        match line {
            StreamLine::Chunk(item) => items.push(item),
            StreamLine::Done => {
                items.push(Annotated::from_data(BackendStreamChunk::stopped("stop")));
                break;
            }
        }
    }
    items
}

/// Transcode JSONL backend chunks and write one JSON chat chunk per line.
///
/// A malformed line ends the stream with an error item. Returns the number of lines written.
pub async fn transcode_jsonl<W: Write>(
    input: &str,
    config: &TranscoderConfig,
    model: &str,
    out: &mut W,
) -> anyhow::Result<usize> {
    let request_id = uuid::Uuid::new_v4().simple().to_string();
    let items = read_stream_items(input);

    let transcoder = FlatStreamTranscoder::new(config, model, request_id)?;
    let stream = transcoder.apply(futures::stream::iter(items));
    tokio::pin!(stream);

    let mut written = 0;
    while let Some(item) = stream.next().await {
        match &item.data {
            Some(chunk) => serde_json::to_writer(&mut *out, chunk)?,
            None => serde_json::to_writer(&mut *out, &item)?,
        }
        if let Some(err) = item.err() {
            tracing::warn!(%err, "backend stream failed");
        }
        writeln!(out)?;
        written += 1;
    }
    Ok(written)
}
