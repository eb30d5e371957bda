// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Model id to backend endpoint table.
//!
//! ```toml
//! [models."acme/flat-7b"]
//! url = "http://10.0.0.5:8000/v1/completions"
//! pipeline_version = 2
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use flatchat_runtime::config::environment_names::model as env_model;
use flatchat_runtime::config::merge_toml_from_env;

use crate::preprocessor::PipelineVersion;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("model `{0}` has no configured endpoint")]
    NotConfigured(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEndpoint {
    pub url: Url,
    pub pipeline_version: PipelineVersion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelEndpoints {
    #[serde(default)]
    models: HashMap<String, ModelEndpoint>,
}

impl ModelEndpoints {
    /// Load the table from the TOML file named by `FLAT_MODEL_ENDPOINTS_PATH`.
    ///
    /// An unset variable yields an empty table.
    pub fn from_settings() -> Result<Self> {
        let figment = merge_toml_from_env(
            Figment::new().merge(Serialized::defaults(Self::default())),
            env_model::FLAT_MODEL_ENDPOINTS_PATH,
        );
        let endpoints: Self = figment.extract()?;
        tracing::debug!(models = endpoints.models.len(), "loaded model endpoints");
        Ok(endpoints)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("model endpoint table {} does not exist", path.display());
        }
        Ok(Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .extract()?)
    }

    pub fn insert(&mut self, model: impl Into<String>, endpoint: ModelEndpoint) {
        self.models.insert(model.into(), endpoint);
    }

    pub fn get(&self, model: &str) -> Result<&ModelEndpoint, EndpointError> {
        self.models
            .get(model)
            .ok_or_else(|| EndpointError::NotConfigured(model.to_string()))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
