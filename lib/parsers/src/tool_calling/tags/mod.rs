// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

mod parser;

pub use super::response;
pub use parser::{
    detect_tool_call_start_tags, emit_tool_calls_tags, split_call_segment,
    try_tool_call_parse_tags,
};
