// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Flatchat Logging Module.
//!
//! - Configuration loaded from:
//!   1. Environment variables (highest priority).
//!   2. Optional TOML file pointed to by the `FLAT_LOGGING_CONFIG_PATH` environment variable.
//!
//! Logging can take two forms: `READABLE` or `JSONL`. The default is `READABLE`. `JSONL`
//! can be enabled by setting the `FLAT_LOGGING_JSONL` environment variable to `1`.
//!
//! To use local timezone for logging timestamps, set the `FLAT_LOG_USE_LOCAL_TZ` environment
//! variable to `1`.
//!
//! Filters can be configured using the `FLAT_LOG` environment variable or by setting the
//! `log_filters` key in the TOML configuration file. Filters are comma-separated key-value
//! pairs where the key is the crate or module name and the value is the log level. The default
//! log level is `info`. [`init_with_filter`] takes the directives from the caller instead of
//! `FLAT_LOG`.
//!
//! Example:
//! ```toml
//! log_level = "error"
//!
//! [log_filters]
//! "flatchat_llm" = "info"
//! "flatchat_llm::protocols::openai::chat_completions::transducer" = "trace"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Once;

use figment::{Figment, providers::Serialized};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::level_filters::LevelFilter;
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{self, FmtContext, FormatFields, FormattedFields, format::Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

use crate::config::environment_names::logging as env_logging;
use crate::config::{disable_ansi_logging, jsonl_logging_enabled, merge_toml_from_env};

/// Default log level
const DEFAULT_FILTER_LEVEL: &str = "info";

/// Once instance to ensure the logger is only initialized once
static INIT: Once = Once::new();

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct LoggingConfig {
    log_level: String,
    log_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: DEFAULT_FILTER_LEVEL.to_string(),
            log_filters: HashMap::new(),
        }
    }
}

/// Initialize the logger. Safe to call more than once; only the first call installs it.
pub fn init() {
    INIT.call_once(|| setup_logging(None));
}

/// Initialize the logger with `directive` in place of `FLAT_LOG`, e.g. from a `-v` flag.
pub fn init_with_filter(directive: &str) {
    INIT.call_once(|| setup_logging(Some(directive)));
}

fn setup_logging(directive: Option<&str>) {
    let filter_layer = filters(load_config(), directive);

    if jsonl_logging_enabled() {
        let l = fmt::layer()
            .with_ansi(false)
            .event_format(CustomJsonFormatter::new())
            .with_writer(std::io::stderr)
            .with_filter(filter_layer);
        tracing_subscriber::registry().with(l).init();
    } else {
        let l = fmt::layer()
            .with_ansi(!disable_ansi_logging())
            .event_format(fmt::format().compact().with_timer(TimeFormatter::new()))
            .with_writer(std::io::stderr)
            .with_filter(filter_layer);
        tracing_subscriber::registry().with(l).init();
    }
}

fn filters(config: LoggingConfig, directive: Option<&str>) -> EnvFilter {
    let default_directive = config
        .log_level
        .parse::<Directive>()
        .unwrap_or_else(|e| {
            eprintln!(
                "Failed parsing log level '{}': {e}; using {DEFAULT_FILTER_LEVEL}",
                config.log_level
            );
            LevelFilter::INFO.into()
        });

    let builder = EnvFilter::builder().with_default_directive(default_directive);
    let mut filter_layer = match directive {
        Some(directive) => builder.parse_lossy(directive),
        None => builder.with_env_var(env_logging::FLAT_LOG).from_env_lossy(),
    };

    for (module, level) in config.log_filters {
        match format!("{module}={level}").parse::<Directive>() {
            Ok(d) => {
                filter_layer = filter_layer.add_directive(d);
            }
            Err(e) => {
                eprintln!("Failed parsing filter '{level}' for module '{module}': {e}");
            }
        }
    }
    filter_layer
}

fn load_config() -> LoggingConfig {
    let figment = merge_toml_from_env(
        Figment::new().merge(Serialized::defaults(LoggingConfig::default())),
        env_logging::FLAT_LOGGING_CONFIG_PATH,
    );

    figment.extract().unwrap_or_else(|e| {
        eprintln!("Invalid logging configuration, using defaults: {e}");
        LoggingConfig::default()
    })
}

#[derive(Serialize)]
struct JsonLog<'a> {
    time: String,
    level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    target: &'a str,
    message: serde_json::Value,
    #[serde(flatten)]
    fields: BTreeMap<String, serde_json::Value>,
}

struct TimeFormatter {
    use_local_tz: bool,
}

impl TimeFormatter {
    fn new() -> Self {
        Self {
            use_local_tz: crate::config::use_local_timezone(),
        }
    }

    fn format_now(&self) -> String {
        if self.use_local_tz {
            chrono::Local::now()
                .format("%Y-%m-%dT%H:%M:%S%.6f%:z")
                .to_string()
        } else {
            chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.6fZ")
                .to_string()
        }
    }
}

impl FormatTime for TimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", self.format_now())
    }
}

struct CustomJsonFormatter {
    time_formatter: TimeFormatter,
}

impl CustomJsonFormatter {
    fn new() -> Self {
        Self {
            time_formatter: TimeFormatter::new(),
        }
    }
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for CustomJsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = JsonVisitor::default();
        let time = self.time_formatter.format_now();
        event.record(&mut visitor);
        let message = visitor
            .fields
            .remove("message")
            .unwrap_or(serde_json::Value::String("".to_string()));

        let current_span = event
            .parent()
            .and_then(|id| ctx.span(id))
            .or_else(|| ctx.lookup_current());
        if let Some(span) = current_span {
            let ext = span.extensions();
            if let Some(data) = ext.get::<FormattedFields<N>>() {
                for (name, value) in data
                    .fields
                    .split(' ')
                    .filter_map(|entry| entry.split_once('='))
                {
                    visitor.fields.insert(
                        name.to_string(),
                        serde_json::Value::String(value.trim_matches('"').to_string()),
                    );
                }
            }
            visitor.fields.insert(
                "span_name".to_string(),
                serde_json::Value::String(span.name().to_string()),
            );
        }

        let metadata = event.metadata();
        let log = JsonLog {
            level: metadata.level().to_string(),
            time,
            file: metadata.file(),
            line: metadata.line(),
            target: metadata.target(),
            message,
            fields: visitor.fields,
        };
        let json = serde_json::to_string(&log).map_err(|_| std::fmt::Error)?;
        writeln!(writer, "{json}")
    }
}

#[derive(Default)]
struct JsonVisitor {
    fields: BTreeMap<String, serde_json::Value>,
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.fields.insert(
            field.name().to_string(),
            serde_json::Value::String(format!("{value:?}")),
        );
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() != "message" {
            match serde_json::from_str::<Value>(value) {
                Ok(json_val) => self.fields.insert(field.name().to_string(), json_val),
                Err(_) => self.fields.insert(field.name().to_string(), value.into()),
            };
        } else {
            self.fields.insert(field.name().to_string(), value.into());
        }
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(
            field.name().to_string(),
            serde_json::Value::Number(value.into()),
        );
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(
            field.name().to_string(),
            serde_json::Value::Number(value.into()),
        );
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        use serde_json::value::Number;
        self.fields.insert(
            field.name().to_string(),
            serde_json::Value::Number(Number::from_f64(value).unwrap_or(0.into())),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_defaults() {
        temp_env::with_vars(
            vec![(env_logging::FLAT_LOGGING_CONFIG_PATH, None::<&str>)],
            || {
                assert_eq!(load_config(), LoggingConfig::default());
            },
        );
    }

    #[test]
    fn test_load_config_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "log_level = \"warn\"\n\n[log_filters]\n\"flatchat_llm\" = \"trace\""
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        temp_env::with_vars(
            vec![(env_logging::FLAT_LOGGING_CONFIG_PATH, Some(path.as_str()))],
            || {
                let config = load_config();
                assert_eq!(config.log_level, "warn");
                assert_eq!(
                    config.log_filters.get("flatchat_llm").map(String::as_str),
                    Some("trace")
                );
            },
        );
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = [1, 2]").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        temp_env::with_vars(
            vec![(env_logging::FLAT_LOGGING_CONFIG_PATH, Some(path.as_str()))],
            || {
                assert_eq!(load_config(), LoggingConfig::default());
            },
        );
    }

    #[test]
    fn test_filters_accept_module_directives() {
        temp_env::with_vars(vec![(env_logging::FLAT_LOG, None::<&str>)], || {
            let config = LoggingConfig {
                log_level: "debug".to_string(),
                log_filters: HashMap::from([("flatchat_llm".to_string(), "trace".to_string())]),
            };
            let filter = filters(config, None).to_string();
            assert!(filter.contains("flatchat_llm=trace"));
            assert!(filter.contains("debug"));
        });
    }

    #[test]
    fn test_explicit_directive_replaces_env() {
        temp_env::with_vars(vec![(env_logging::FLAT_LOG, Some("warn"))], || {
            let filter = filters(LoggingConfig::default(), None).to_string();
            assert!(filter.contains("warn"));

            let filter = filters(LoggingConfig::default(), Some("trace")).to_string();
            assert!(filter.contains("trace"));
            assert!(!filter.contains("warn"));
        });
    }

    #[test]
    fn test_utc_timestamp_shape() {
        let formatter = TimeFormatter {
            use_local_tz: false,
        };
        let now = formatter.format_now();
        assert!(now.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }
}
