// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod response;
pub mod tags;

// Re-export main types and functions for convenience
pub use config::{ARGUMENTS_MARKER, CALL_MARKER, TagParserConfig};
pub use response::{CalledFunction, ToolCallResponse, ToolCallType, new_call_id};
pub use tags::{
    detect_tool_call_start_tags, emit_tool_calls_tags, split_call_segment,
    try_tool_call_parse_tags,
};
