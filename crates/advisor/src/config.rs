//! Advisor configuration

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use engine_lib::{DurationPolicy, EngineConfig, EngineKind};
use serde::Deserialize;

/// Optional configuration file, `advisor.toml` / `advisor.yaml` in the working directory
const CONFIG_FILE: &str = "advisor";
const ENV_PREFIX: &str = "ADVISOR";

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    /// Name attached to every structured log record
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// HTTP port for the API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Engine key, e.g. `duration_based`
    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default)]
    pub engine_config: EngineConfig,

    #[serde(default)]
    pub policy: DurationPolicy,
}

fn default_service_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "rightsize-advisor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_engine() -> String {
    EngineKind::DURATION_BASED_KEY.to_string()
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api_port: default_api_port(),
            engine: default_engine(),
            engine_config: EngineConfig::default(),
            policy: DurationPolicy::default(),
        }
    }
}

impl AdvisorConfig {
    /// Load configuration from the optional config file, then `ADVISOR_*`
    /// environment variables (`__` separates nested keys)
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    pub(crate) fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: AdvisorConfig = builder
            .build()
            .context("Failed to read advisor configuration")?
            .try_deserialize()
            .context("Invalid advisor configuration")?;

        config.engine_kind()?;
        config
            .engine_config
            .validate()
            .context("Invalid engine_config")?;
        config.policy.validate().context("Invalid policy")?;

        Ok(config)
    }

    pub fn engine_kind(&self) -> Result<EngineKind> {
        EngineKind::from_key(&self.engine).context("Invalid engine")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<AdvisorConfig> {
        AdvisorConfig::from_builder(
            config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    fn test_defaults_from_empty_source() {
        let config = from_toml("").unwrap();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.engine_kind().unwrap(), EngineKind::DurationBased);
        assert_eq!(config.policy, DurationPolicy::default());
        assert_eq!(config.engine_config, EngineConfig::default());
    }

    #[test]
    fn test_nested_overrides() {
        let config = from_toml(
            r#"
            api_port = 9100
            engine = "capacity_based"

            [engine_config]
            memory_spike_buffer = 0.1

            [[policy.sub_categories]]
            label = "short_term"
            duration_days = 1
            lower_bound_minutes = 60.0
            "#,
        )
        .unwrap();

        assert_eq!(config.api_port, 9100);
        assert_eq!(config.engine_kind().unwrap(), EngineKind::CapacityBased);
        assert_eq!(config.engine_config.memory_spike_buffer, 0.1);
        assert_eq!(config.engine_config.memory_usage_buffer, 0.2);
        assert_eq!(config.policy.sub_categories.len(), 1);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(from_toml(r#"engine = "ml_based""#).is_err());
        assert!(from_toml("[engine_config]\ncapacity_percentile = 150.0").is_err());
        assert!(from_toml(
            r#"
            [[policy.sub_categories]]
            label = "short_term"
            duration_days = 1
            lower_bound_minutes = 0.0
            "#
        )
        .is_err());
    }
}
