// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::*;
use maybe_error::MaybeError;

/// Envelope for every item of a transcoded stream.
///
/// A data item carries one chunk in `data`. An upstream failure travels as an item with
/// `event == "error"` and the message(s) in `comment`; it is always the last item a
/// stream yields.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Annotated<R> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Vec<String>>,
}

impl<R> Annotated<R> {
    /// Create a new annotated item from the given error
    pub fn from_error(error: String) -> Self {
        Self {
            data: None,
            id: None,
            event: Some("error".to_string()),
            comment: Some(vec![error]),
        }
    }

    /// Create a new annotated item from the given data
    pub fn from_data(data: R) -> Self {
        Self {
            data: Some(data),
            id: None,
            event: None,
            comment: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.event.as_deref() == Some("error")
    }

    /// Move the envelope metadata onto a different payload.
    pub fn transfer<U>(self, data: Option<U>) -> Annotated<U> {
        Annotated::<U> {
            data,
            id: self.id,
            event: self.event,
            comment: self.comment,
        }
    }
}

impl<R> MaybeError for Annotated<R>
where
    R: for<'de> Deserialize<'de> + Serialize,
{
    fn from_err(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Annotated::from_error(err.to_string())
    }

    fn err(&self) -> Option<anyhow::Error> {
        if self.is_error() {
            if let Some(comment) = &self.comment
                && !comment.is_empty()
            {
                return Some(anyhow::Error::msg(comment.join("; ")));
            }
            Some(anyhow::Error::msg("unknown error"))
        } else {
            None
        }
    }
}
