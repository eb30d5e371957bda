// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Prompt Formatting Module
//!
//! Flattens a structured chat request into the single prompt string a text-completion
//! backend expects:
//! - message normalization to the `tool_calls` shape
//! - function eligibility from the tool choice
//! - the versioned instruction/response template
//!
//! The module supports different prompt formatting strategies through the
//! [`OAIPromptFormatter`] trait.

use anyhow::Result;
use std::sync::Arc;

mod flat;

pub use flat::{
    FlatPromptFormatter, INSTRUCTION_HEADER, PipelineVersion, PromptError, RESPONSE_HEADER,
    eligible_function_names, prune_encoded, serialize_request,
};

use crate::protocols::openai::ChatCompletionRequest;

pub trait OAIPromptFormatter: Send + Sync + 'static {
    fn render(&self, req: &ChatCompletionRequest) -> Result<String>;
}

pub enum PromptFormatter {
    OAI(Arc<dyn OAIPromptFormatter>),
}

impl PromptFormatter {
    /// Formatter for the given pipeline version and prune rules.
    pub fn flat(version: PipelineVersion, prune_rules: Vec<String>) -> Self {
        Self::OAI(Arc::new(FlatPromptFormatter::new(version, prune_rules)))
    }

    pub fn render(&self, req: &ChatCompletionRequest) -> Result<String> {
        match self {
            PromptFormatter::OAI(formatter) => formatter.render(req),
        }
    }
}
