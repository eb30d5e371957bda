// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod prefix_matcher;

pub use prefix_matcher::{MarkerMatcher, MarkerMatcherError, MatchResult};
