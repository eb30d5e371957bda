// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod tool_calling;

// Re-export everything from tool_calling for convenience
pub use tool_calling::*;
