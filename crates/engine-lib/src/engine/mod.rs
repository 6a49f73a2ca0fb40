//! Recommendation engines
//!
//! Engines form a closed set selected by configuration key. Each one
//! implements [`RecommendationEngine`] and evaluates every sub-category of a
//! caller-supplied [`DurationPolicy`] independently.

mod capacity;
mod duration;
mod stats;
mod window;


pub use capacity::CapacityBasedEngine;
pub use duration::DurationBasedEngine;
pub use stats::{percentile, pods_from_ratio};
pub use window::{monitoring_start_time, MonitoringWindow};

use crate::error::PolicyError;
use crate::models::ContainerSeries;
use crate::policy::DurationPolicy;
use crate::recommendation::Recommendation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default CPU amount treated as one full core
pub const CPU_ONE_CORE: f64 = 1.0;
/// Default CPU floor below which usage is considered idle
pub const CPU_ONE_MILLICORE: f64 = 0.001;
pub const CPU_ZERO: f64 = 0.0;
pub const NINETY_EIGHTH_PERCENTILE: f64 = 98.0;
pub const NINETIETH_PERCENTILE: f64 = 90.0;
pub const HUNDREDTH_PERCENTILE: f64 = 100.0;
/// Headroom added on top of peak memory usage (20%)
pub const MEM_USAGE_BUFFER_DECIMAL: f64 = 0.20;
/// Headroom added on top of the largest memory spike (5%)
pub const MEM_SPIKE_BUFFER_DECIMAL: f64 = 0.05;

/// Recommendations keyed by sub-category label
pub type RecommendationSet = BTreeMap<String, Recommendation>;

/// Capability set shared by every engine
pub trait RecommendationEngine: Send + Sync {
    fn engine_name(&self) -> &str;

    fn engine_key(&self) -> &str;

    fn engine_category(&self) -> RecommendationCategory;

    /// True when the series holds enough data for the smallest sub-category.
    /// An empty series is never sufficient.
    fn check_min_data_available(&self, series: &ContainerSeries) -> bool;

    /// One recommendation per sub-category.
    ///
    /// Business-rule failures (not enough data, zero usage, unset current
    /// values) and per-sub-category computation faults are reported as
    /// notifications inside the returned map, never as errors.
    fn generate_recommendation(
        &self,
        series: &ContainerSeries,
        end_time: DateTime<Utc>,
    ) -> RecommendationSet;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    DurationBased,
    CapacityBased,
}

impl fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecommendationCategory::DurationBased => "duration_based",
            RecommendationCategory::CapacityBased => "capacity_based",
        })
    }
}

/// Closed set of available engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    DurationBased,
    CapacityBased,
}

impl EngineKind {
    pub const DURATION_BASED_KEY: &'static str = "duration_based";
    pub const CAPACITY_BASED_KEY: &'static str = "capacity_based";

    pub fn from_key(key: &str) -> Result<Self, PolicyError> {
        match key.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            Self::DURATION_BASED_KEY => Ok(EngineKind::DurationBased),
            Self::CAPACITY_BASED_KEY => Ok(EngineKind::CapacityBased),
            _ => Err(PolicyError::UnknownEngine(key.to_string())),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            EngineKind::DurationBased => Self::DURATION_BASED_KEY,
            EngineKind::CapacityBased => Self::CAPACITY_BASED_KEY,
        }
    }
}

impl std::str::FromStr for EngineKind {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s)
    }
}

/// Tunable thresholds and buffers, passed explicitly to every engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Total CPU below which an interval is trusted directly (cores)
    pub cpu_one_core: f64,
    /// At or below this a CPU recommendation is reported as idle (cores)
    pub cpu_one_millicore: f64,
    pub cpu_zero: f64,
    pub cpu_request_percentile: f64,
    pub memory_percentile: f64,
    /// Fractional headroom over peak memory usage
    pub memory_usage_buffer: f64,
    /// Fractional headroom over the largest memory spike
    pub memory_spike_buffer: f64,
    pub capacity_percentile: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cpu_one_core: CPU_ONE_CORE,
            cpu_one_millicore: CPU_ONE_MILLICORE,
            cpu_zero: CPU_ZERO,
            cpu_request_percentile: NINETY_EIGHTH_PERCENTILE,
            memory_percentile: HUNDREDTH_PERCENTILE,
            memory_usage_buffer: MEM_USAGE_BUFFER_DECIMAL,
            memory_spike_buffer: MEM_SPIKE_BUFFER_DECIMAL,
            capacity_percentile: NINETIETH_PERCENTILE,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (name, value) in [
            ("cpu_request_percentile", self.cpu_request_percentile),
            ("memory_percentile", self.memory_percentile),
            ("capacity_percentile", self.capacity_percentile),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(PolicyError::InvalidPercentile { name, value });
            }
        }

        for (name, value) in [
            ("cpu_one_core", self.cpu_one_core),
            ("cpu_one_millicore", self.cpu_one_millicore),
            ("cpu_zero", self.cpu_zero),
            ("memory_usage_buffer", self.memory_usage_buffer),
            ("memory_spike_buffer", self.memory_spike_buffer),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::InvalidThreshold { name, value });
            }
        }

        Ok(())
    }
}

/// Construct the engine selected by `kind`
pub fn build_engine(
    kind: EngineKind,
    config: EngineConfig,
    policy: DurationPolicy,
) -> Result<Box<dyn RecommendationEngine>, PolicyError> {
    config.validate()?;
    policy.validate()?;

    Ok(match kind {
        EngineKind::DurationBased => Box::new(DurationBasedEngine::new(config, policy)),
        EngineKind::CapacityBased => Box::new(CapacityBasedEngine::new(config, policy)),
    })
}

/// Shared minimum-data rule: the summed interval durations must reach the
/// smallest lower bound in the policy. Stops walking once the bound is met.
/// Non-finite or negative durations are skipped.
pub(crate) fn min_data_available(series: &ContainerSeries, policy: &DurationPolicy) -> bool {
    let Some(lower_bound) = policy.smallest_lower_bound() else {
        return false;
    };

    let mut sum = 0.0;
    for (_, interval) in series.iter() {
        let minutes = interval.duration_in_minutes;
        if !minutes.is_finite() || minutes < 0.0 {
            continue;
        }
        sum += minutes;
        if sum >= lower_bound {
            return true;
        }
    }
    false
}
