// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use derive_builder::Builder;
use figment::{Figment, providers::Serialized};
use serde::{Deserialize, Serialize};
use validator::Validate;

use flatchat_runtime::config::environment_names::transcoder as env_transcoder;
use flatchat_runtime::config::{merge_toml_from_env, non_empty_env};

/// Characters inspected before committing to plain text or tool calls.
pub const DEFAULT_SNIFF_LENGTH: usize = 5;

/// Transcoder configuration
///
/// Loaded from, in increasing priority: defaults, the TOML file named by
/// `FLAT_TRANSCODER_CONFIG_PATH`, and `FLAT_TRANSCODER_*` environment variables.
#[derive(Serialize, Deserialize, Validate, Debug, Builder, Clone, PartialEq)]
#[builder(build_fn(private, name = "build_internal"), derive(Debug))]
pub struct TranscoderConfig {
    /// Lookahead, in characters after leading whitespace, used to tell a completion that
    /// opens with `<function>` from plain text.
    ///
    /// At least 2, the shortest prefix telling `<function>` from `<arguments>`, and at most
    /// 10, the length of `<function>`.
    /// Set this at runtime with environment variable FLAT_TRANSCODER_SNIFF_LENGTH.
    #[validate(range(min = 2, max = 10))]
    #[builder(default = "DEFAULT_SNIFF_LENGTH")]
    pub sniff_length: usize,

    /// Literal substrings removed from the serialized messages of every prompt.
    /// Set this at runtime with environment variable FLAT_TRANSCODER_PRUNE_RULES,
    /// e.g. `FLAT_TRANSCODER_PRUNE_RULES='["[internal]"]'`.
    #[serde(default)]
    #[builder(default = "vec![]", setter(into))]
    pub prune_rules: Vec<String>,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            sniff_length: DEFAULT_SNIFF_LENGTH,
            prune_rules: Vec::new(),
        }
    }
}

impl TranscoderConfig {
    pub fn builder() -> TranscoderConfigBuilder {
        TranscoderConfigBuilder::default()
    }

    /// Load and validate the layered configuration.
    pub fn from_settings() -> Result<TranscoderConfig> {
        let figment = merge_toml_from_env(
            Figment::new().merge(Serialized::defaults(Self::default())),
            env_transcoder::FLAT_TRANSCODER_CONFIG_PATH,
        );

        let config: TranscoderConfig = figment
            .merge(non_empty_env(env_transcoder::PREFIX))
            .extract()?;
        config.validate()?;

        tracing::debug!(
            sniff_length = config.sniff_length,
            prune_rules = config.prune_rules.len(),
            "loaded transcoder config"
        );
        Ok(config)
    }
}

impl TranscoderConfigBuilder {
    /// Build and validate the transcoder configuration
    pub fn build(&self) -> Result<TranscoderConfig> {
        let config = self.build_internal()?;
        config.validate()?;
        Ok(config)
    }
}
