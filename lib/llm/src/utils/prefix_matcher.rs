// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Marker detection over streamed text
//!
//! Finds complete markers with Aho-Corasick and, when none is present, the earliest
//! suffix of the text that could still grow into a marker once more text arrives.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

/// Outcome of scanning buffered text for markers
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// A complete marker was found
    Complete {
        /// Text before the marker
        prefix: String,
        /// The marker itself
        marker: String,
        /// Text after the marker
        suffix: String,
    },
    /// The text ends with the beginning of a marker
    Partial {
        /// Text before the partial marker, safe to emit
        prefix: String,
        /// Held back until it completes or is disproved
        partial: String,
    },
    /// No marker, not even a partial one
    None { content: String },
}

#[derive(Debug, thiserror::Error)]
pub enum MarkerMatcherError {
    #[error("cannot build a marker matcher without markers")]
    NoMarkers,
    #[error("failed to build marker automaton: {0}")]
    Build(#[from] aho_corasick::BuildError),
}

pub struct MarkerMatcher {
    markers: Vec<String>,
    automaton: AhoCorasick,
}

impl MarkerMatcher {
    pub fn new(markers: Vec<String>) -> Result<Self, MarkerMatcherError> {
        if markers.is_empty() || markers.iter().any(|m| m.is_empty()) {
            return Err(MarkerMatcherError::NoMarkers);
        }

        let automaton = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .build(&markers)?;

        Ok(Self { markers, automaton })
    }

    /// Scan `text` for the leftmost complete marker, or a trailing partial one.
    pub fn process(&self, text: &str) -> MatchResult {
        if let Some(found) = self.automaton.find(text) {
            return MatchResult::Complete {
                prefix: text[..found.start()].to_string(),
                marker: self.markers[found.pattern().as_usize()].clone(),
                suffix: text[found.end()..].to_string(),
            };
        }

        match self.partial_start(text) {
            Some(start) => MatchResult::Partial {
                prefix: text[..start].to_string(),
                partial: text[start..].to_string(),
            },
            None => MatchResult::None {
                content: text.to_string(),
            },
        }
    }

    /// Byte offset of the earliest suffix that is a proper prefix of some marker.
    ///
    /// Scanning left to right keeps the held part as short as the markers allow while
    /// releasing everything before it.
    fn partial_start(&self, text: &str) -> Option<usize> {
        text.char_indices().map(|(i, _)| i).find(|&i| {
            let tail = &text[i..];
            self.markers
                .iter()
                .any(|m| m.len() > tail.len() && m.starts_with(tail))
        })
    }
}
