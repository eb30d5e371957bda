// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use figment::{Figment, providers::Env};

pub mod environment_names;

/// Environment provider for `prefix`, skipping variables that are set but empty.
///
/// An empty variable would otherwise override a value coming from a file or the defaults.
pub fn non_empty_env(prefix: &'static str) -> Env {
    Env::prefixed(prefix).filter_map(move |k| {
        let full_key = format!("{prefix}{}", k.as_str());
        match std::env::var(&full_key) {
            Ok(v) if !v.is_empty() => Some(k.into()),
            _ => None,
        }
    })
}

/// Merge the TOML file named by the `path_env` environment variable, if it is set.
pub fn merge_toml_from_env(figment: Figment, path_env: &str) -> Figment {
    use figment::providers::{Format, Toml};
    match std::env::var(path_env) {
        Ok(path) if !path.is_empty() => figment.merge(Toml::file(path)),
        _ => figment,
    }
}

/// Check if a string is truthy
/// This will be used to evaluate environment variables or any other subjective
/// configuration parameters that can be set by the user that should be evaluated
/// as a boolean value.
pub fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

/// Check if an environment variable is truthy
pub fn env_is_truthy(env: &str) -> bool {
    match std::env::var(env) {
        Ok(val) => is_truthy(val.as_str()),
        Err(_) => false,
    }
}

/// Check whether JSONL logging enabled
/// Set the `FLAT_LOGGING_JSONL` environment variable a [`is_truthy`] value
pub fn jsonl_logging_enabled() -> bool {
    env_is_truthy(environment_names::logging::FLAT_LOGGING_JSONL)
}

/// Check whether logging with ANSI terminal escape codes and colors is disabled.
/// Set the `FLAT_SDK_DISABLE_ANSI_LOGGING` environment variable a [`is_truthy`] value
pub fn disable_ansi_logging() -> bool {
    env_is_truthy(environment_names::logging::FLAT_SDK_DISABLE_ANSI_LOGGING)
}

/// Check whether to use local timezone for logging timestamps (default is UTC)
/// Set the `FLAT_LOG_USE_LOCAL_TZ` environment variable to a [`is_truthy`] value
pub fn use_local_timezone() -> bool {
    env_is_truthy(environment_names::logging::FLAT_LOG_USE_LOCAL_TZ)
}
