// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Environment variable name constants for centralized management across the codebase
//!
//! ## Organization
//!
//! - **Logging**: Log level, configuration file and output format
//! - **Transcoder**: Sniff length and prune rules for the prompt/stream transcoder
//! - **Model**: Model id to backend endpoint table

/// Logging environment variables
pub mod logging {
    /// Log level / filter directives (e.g., "debug", "flatchat_llm=trace")
    pub const FLAT_LOG: &str = "FLAT_LOG";

    /// Path to logging configuration file
    pub const FLAT_LOGGING_CONFIG_PATH: &str = "FLAT_LOGGING_CONFIG_PATH";

    /// Enable JSONL logging format
    pub const FLAT_LOGGING_JSONL: &str = "FLAT_LOGGING_JSONL";

    /// Disable ANSI terminal colors in logs
    pub const FLAT_SDK_DISABLE_ANSI_LOGGING: &str = "FLAT_SDK_DISABLE_ANSI_LOGGING";

    /// Use local timezone for logging timestamps (default is UTC)
    pub const FLAT_LOG_USE_LOCAL_TZ: &str = "FLAT_LOG_USE_LOCAL_TZ";
}

/// Transcoder configuration environment variables
pub mod transcoder {
    /// Prefix for transcoder settings, e.g. `FLAT_TRANSCODER_SNIFF_LENGTH`
    pub const PREFIX: &str = "FLAT_TRANSCODER_";

    /// Characters buffered before deciding between plain text and tool calls
    pub const FLAT_TRANSCODER_SNIFF_LENGTH: &str = "FLAT_TRANSCODER_SNIFF_LENGTH";

    /// Literal substrings removed from serialized messages
    pub const FLAT_TRANSCODER_PRUNE_RULES: &str = "FLAT_TRANSCODER_PRUNE_RULES";

    /// Path to a TOML file with transcoder settings
    pub const FLAT_TRANSCODER_CONFIG_PATH: &str = "FLAT_TRANSCODER_CONFIG_PATH";
}

/// Model endpoint table environment variables
pub mod model {
    /// Path to a TOML file mapping model ids to backend endpoints
    pub const FLAT_MODEL_ENDPOINTS_PATH: &str = "FLAT_MODEL_ENDPOINTS_PATH";
}
