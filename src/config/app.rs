//! Main application configuration
//!
//! This module defines the top-level configuration for the margin-ratings
//! binary, including environment variable loading, TOML files and validation.

use crate::config::rating::RatingConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "margin-ratings".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Rating settings
        if let Ok(cap) = env::var("RATING_MARGIN_CAP") {
            self.rating.margin_cap = cap
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_MARGIN_CAP value: {}", cap))?;
        }
        if let Ok(ratio) = env::var("RATING_MIXING_RATIO") {
            self.rating.mixing_ratio = ratio
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_MIXING_RATIO value: {}", ratio))?;
        }
        if let Ok(selection) = env::var("RATING_SELECTION") {
            self.rating.selection = selection.parse()?;
        }
        if let Ok(length) = env::var("RATING_PATH_LENGTH") {
            self.rating.path_length = length
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_PATH_LENGTH value: {}", length))?;
        }
        if let Ok(ratio) = env::var("RATING_PATH_RATIO") {
            self.rating.path_ratio = ratio
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_PATH_RATIO value: {}", ratio))?;
        }
        if let Ok(iterations) = env::var("RATING_MAX_ITERATIONS") {
            self.rating.max_iterations = iterations
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_MAX_ITERATIONS value: {}", iterations))?;
        }
        if let Ok(tolerance) = env::var("RATING_TOLERANCE") {
            self.rating.tolerance = tolerance
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_TOLERANCE value: {}", tolerance))?;
        }
        if let Ok(seed) = env::var("RATING_FOLD_SEED") {
            self.rating.fold_seed = seed
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_FOLD_SEED value: {}", seed))?;
        }
        if let Ok(parallel) = env::var("RATING_PARALLEL_FOLDS") {
            self.rating.parallel_folds = parallel
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_PARALLEL_FOLDS value: {}", parallel))?;
        }
        if let Ok(precision) = env::var("RATING_DISPLAY_PRECISION") {
            self.rating.display_precision = precision
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_DISPLAY_PRECISION value: {}", precision))?;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    config.rating.validate()
}
