// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # Flatchat LLM
//!
//! Transcoding between the structured OpenAI chat protocol and the flat, tag-delimited
//! text used by fine-tuned text-completion backends:
//! - requests are flattened into a single versioned prompt ([`preprocessor::prompt`]),
//! - complete completions are parsed back into assistant messages
//!   ([`protocols::openai::chat_completions::output`]),
//! - streamed completions are transcoded chunk by chunk
//!   ([`protocols::openai::chat_completions::transducer`]).

pub mod config;
pub mod model_endpoints;
pub mod preprocessor;
pub mod protocols;
pub mod utils;

pub use config::TranscoderConfig;
pub use model_endpoints::{EndpointError, ModelEndpoint, ModelEndpoints};
