// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # Flatchat LLM Protocols
//!
//! Message formats on both sides of the transcoder: the OpenAI-compatible chat shapes
//! exposed to callers and the completion chunks read from inference backends.

pub mod backend;
pub mod openai;

pub use flatchat_runtime::protocols::annotated::Annotated;
