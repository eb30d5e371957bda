// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

/// Marker opening every call segment in a flat completion.
pub const CALL_MARKER: &str = "<function>";

/// Marker separating the function name from its JSON-encoded arguments.
pub const ARGUMENTS_MARKER: &str = "<arguments>";

/// Delimiters of the flat tag grammar
///
/// `<function>{name}<arguments>{args}` repeated with no separator for multiple calls.
/// Text that does not open with the call marker is plain content.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TagParserConfig {
    /// Start token for each tool call (e.g., "<function>")
    pub call_marker: String,
    /// Separator between the function name and its arguments (e.g., "<arguments>")
    pub arguments_marker: String,
}

impl Default for TagParserConfig {
    fn default() -> Self {
        Self {
            call_marker: CALL_MARKER.to_string(),
            arguments_marker: ARGUMENTS_MARKER.to_string(),
        }
    }
}

impl TagParserConfig {
    /// Number of leading characters both markers have in common.
    pub fn shared_prefix_len(&self) -> usize {
        self.call_marker
            .chars()
            .zip(self.arguments_marker.chars())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Shortest lookahead, in characters, that tells the call marker apart from the
    /// arguments marker.
    pub fn min_sniff_length(&self) -> usize {
        self.shared_prefix_len() + 1
    }

    /// Longest lookahead that still compares against the call marker only.
    pub fn max_sniff_length(&self) -> usize {
        self.call_marker.chars().count()
    }
}
