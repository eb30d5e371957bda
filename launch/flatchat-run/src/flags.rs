// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Flatten chat requests into prompts and transcode flat completions back into chat responses",
    long_about = None,
    disable_help_subcommand = true,
)]
pub struct Flags {
    /// Verbose output (-v for debug, -vv for trace). Overrides FLAT_LOG.
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render an OpenAI chat completion request as a flat prompt
    Prompt {
        /// Request JSON file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Prompt layout generation (1 or 2). Looked up in the model endpoint table when
        /// not given.
        #[arg(long, env = "FLAT_PIPELINE_VERSION")]
        pipeline_version: Option<u8>,

        /// Model endpoint table (TOML). Defaults to FLAT_MODEL_ENDPOINTS_PATH.
        #[arg(long)]
        endpoints: Option<PathBuf>,

        /// Extra substring to remove from the serialized messages. Repeatable.
        #[arg(long = "prune")]
        prune_rules: Vec<String>,
    },

    /// Decode one complete backend completion into a chat completion response
    Decode {
        /// Backend response JSON or raw completion text, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Model name reported in the response
        #[arg(long, default_value = "flat")]
        model: String,

        /// Treat the input as raw completion text even if it parses as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Transcode a JSONL stream of backend chunks into JSONL chat completion chunks
    Stream {
        /// JSONL file of backend stream chunks, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Model name reported in every chunk
        #[arg(long, default_value = "flat")]
        model: String,

        /// Characters buffered before deciding between plain text and tool calls
        #[arg(long)]
        sniff_length: Option<usize>,
    },
}

impl Flags {
    /// Filter directive implied by `-v` / `-vv`, if any
    pub fn log_directive(&self) -> Option<&'static str> {
        match self.verbosity {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
