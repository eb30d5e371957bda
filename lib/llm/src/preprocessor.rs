// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The Preprocessor turns a structured chat request into what a text-completion backend
//! accepts.
//!
//! - `prompt`: flattens messages and function declarations into a single prompt string,
//!   per pipeline version.

pub mod prompt;

pub use prompt::{FlatPromptFormatter, OAIPromptFormatter, PipelineVersion, PromptError};
