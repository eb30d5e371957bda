// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

/// Items of a stream that may stand for a failure instead of a value.
pub trait MaybeError {
    /// Construct an instance from an error.
    fn from_err(err: Box<dyn Error + Send + Sync>) -> Self;

    /// Construct into an error instance.
    fn err(&self) -> Option<anyhow::Error>;

    fn is_ok(&self) -> bool {
        !self.is_err()
    }

    fn is_err(&self) -> bool {
        self.err().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Frame {
        failure: Option<String>,
    }

    impl MaybeError for Frame {
        fn from_err(err: Box<dyn Error + Send + Sync>) -> Self {
            Frame {
                failure: Some(err.to_string()),
            }
        }
        fn err(&self) -> Option<anyhow::Error> {
            self.failure.clone().map(anyhow::Error::msg)
        }
    }

    #[test]
    fn test_default_implementations() {
        let frame = Frame::from_err(anyhow::Error::msg("stream reset").into());
        assert_eq!(format!("{}", frame.err().unwrap()), "stream reset");
        assert!(!frame.is_ok());
        assert!(frame.is_err());

        let frame = Frame { failure: None };
        assert!(frame.is_ok());
    }
}
