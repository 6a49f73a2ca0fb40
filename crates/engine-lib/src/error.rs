//! Error types for the recommendation engine

use crate::models::{AggregateField, MetricName};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Faults raised while evaluating a single sub-category.
///
/// These never escape `generate_recommendation`; they are turned into a
/// `CALCULATION_FAILED` notification for the affected sub-category.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("no intervals fall inside the monitoring window {start} .. {end}")]
    EmptyWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("invalid {metric}.{field} value {value} in interval ending at {timestamp}")]
    InvalidAggregate {
        timestamp: DateTime<Utc>,
        metric: MetricName,
        field: AggregateField,
        value: f64,
    },

    #[error("invalid interval duration of {minutes} minutes in interval ending at {timestamp}")]
    InvalidDuration {
        timestamp: DateTime<Utc>,
        minutes: f64,
    },

    #[error("a window of {minutes} minutes before {end} leaves the supported date range")]
    WindowOutOfRange { end: DateTime<Utc>, minutes: f64 },

    #[error("cannot compute a percentile of an empty list")]
    EmptyPercentileInput,
}

/// Invalid engine configuration or sub-category policy
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("sub-category policy must define at least one sub-category")]
    EmptyPolicy,

    #[error("sub-category '{0}' is defined more than once")]
    DuplicateLabel(String),

    #[error("sub-category '{label}' has a non-positive lower bound of {value} minutes")]
    NonPositiveLowerBound { label: String, value: f64 },

    #[error("sub-category '{0}' has a duration of zero days")]
    ZeroDuration(String),

    #[error("unknown recommendation engine key '{0}'")]
    UnknownEngine(String),

    #[error("{name} must be within 0..=100, got {value}")]
    InvalidPercentile { name: &'static str, value: f64 },

    #[error("{name} must be a non-negative finite number, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}
