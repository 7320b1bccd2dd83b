// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://cadence.db".to_string(),
            pool_max_size: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Emit log lines as JSON objects instead of the human-readable format.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// Tuning knobs for the two-stage resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Candidates kept per entity kind when resolving a free-text query.
    pub full_text_candidate_limit: usize,
    /// Optional cap on candidates per kind for field queries. Unset means unbounded.
    pub exact_candidate_limit: Option<usize>,
    /// Candidates scoring below this similarity are dropped by the search stage.
    pub min_score: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            full_text_candidate_limit: 20,
            exact_candidate_limit: None,
            min_score: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub max_concurrent_commands: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_commands: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
    pub resolver: ResolverConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.resolver.min_score) {
            bail!(
                "resolver.min_score must be within 0.0..=1.0, got {}",
                self.resolver.min_score
            );
        }
        if self.resolver.full_text_candidate_limit == 0 {
            bail!("resolver.full_text_candidate_limit must be greater than zero");
        }
        if self.pipeline.max_concurrent_commands == 0 {
            bail!("pipeline.max_concurrent_commands must be greater than zero");
        }
        Ok(())
    }
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: CADENCE_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("CADENCE_").split("__"));

    let config: AppConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}
