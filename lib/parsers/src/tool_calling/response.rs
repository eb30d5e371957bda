// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalledFunction {
    pub name: String,
    /// JSON-encoded arguments, kept as the raw string the model produced
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallType {
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub tp: ToolCallType,
    pub function: CalledFunction,
}

impl ToolCallResponse {
    /// Wrap a parsed function with a freshly generated call id.
    pub fn new(function: CalledFunction) -> Self {
        Self {
            id: new_call_id(),
            tp: ToolCallType::Function,
            function,
        }
    }
}

/// Opaque call identifier, generated once per call.
pub fn new_call_id() -> String {
    format!("call-{}", Uuid::new_v4())
}
