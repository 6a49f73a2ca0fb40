//! Core data models for the recommendation engine

use crate::error::EngineError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metric kinds reported for every interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricName {
    CpuUsage,
    CpuThrottle,
    MemoryUsage,
    #[serde(rename = "memoryRSS")]
    MemoryRss,
    CpuRequest,
    MemoryRequest,
    CpuLimit,
    MemoryLimit,
}

impl MetricName {
    pub const ALL: [MetricName; 8] = [
        MetricName::CpuUsage,
        MetricName::CpuThrottle,
        MetricName::MemoryUsage,
        MetricName::MemoryRss,
        MetricName::CpuRequest,
        MetricName::MemoryRequest,
        MetricName::CpuLimit,
        MetricName::MemoryLimit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::CpuUsage => "cpuUsage",
            MetricName::CpuThrottle => "cpuThrottle",
            MetricName::MemoryUsage => "memoryUsage",
            MetricName::MemoryRss => "memoryRSS",
            MetricName::CpuRequest => "cpuRequest",
            MetricName::MemoryRequest => "memoryRequest",
            MetricName::CpuLimit => "cpuLimit",
            MetricName::MemoryLimit => "memoryLimit",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field selector for a `MetricAggregate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateField {
    Avg,
    Max,
    Min,
    Sum,
}

impl fmt::Display for AggregateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregateField::Avg => "avg",
            AggregateField::Max => "max",
            AggregateField::Min => "min",
            AggregateField::Sum => "sum",
        })
    }
}

/// Summary of one metric over one interval.
///
/// Fields missing from the input deserialize as `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregate {
    #[serde(default)]
    pub avg: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub sum: f64,
    #[serde(default)]
    pub format: String,
}

impl MetricAggregate {
    pub fn new(avg: f64, max: f64, min: f64, sum: f64, format: impl Into<String>) -> Self {
        Self {
            avg,
            max,
            min,
            sum,
            format: format.into(),
        }
    }

    pub fn field(&self, field: AggregateField) -> f64 {
        match field {
            AggregateField::Avg => self.avg,
            AggregateField::Max => self.max,
            AggregateField::Min => self.min,
            AggregateField::Sum => self.sum,
        }
    }
}

/// Aggregated metrics for one interval, keyed in a series by its end time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalResult {
    pub duration_in_minutes: f64,
    #[serde(default)]
    pub metrics: BTreeMap<MetricName, MetricAggregate>,
}

impl IntervalResult {
    pub fn new(duration_in_minutes: f64) -> Self {
        Self {
            duration_in_minutes,
            metrics: BTreeMap::new(),
        }
    }

    /// Builder-style helper to attach a metric aggregate
    pub fn with_metric(mut self, name: MetricName, aggregate: MetricAggregate) -> Self {
        self.metrics.insert(name, aggregate);
        self
    }

    pub fn metric(&self, name: MetricName) -> Option<&MetricAggregate> {
        self.metrics.get(&name)
    }

    /// Value of one aggregate field, `0.0` when the metric is absent
    pub fn value(&self, name: MetricName, field: AggregateField) -> f64 {
        self.metrics.get(&name).map(|m| m.field(field)).unwrap_or(0.0)
    }

    /// Start of the interval given the timestamp it is keyed by
    pub fn start_time(&self, end_time: DateTime<Utc>) -> Result<DateTime<Utc>, EngineError> {
        minutes_before(end_time, self.duration_in_minutes)
    }

    /// Reject intervals the algorithm cannot reason about
    pub fn validate(&self, timestamp: DateTime<Utc>) -> Result<(), EngineError> {
        if !self.duration_in_minutes.is_finite() || self.duration_in_minutes < 0.0 {
            return Err(EngineError::InvalidDuration {
                timestamp,
                minutes: self.duration_in_minutes,
            });
        }

        for (metric, aggregate) in &self.metrics {
            for field in [
                AggregateField::Avg,
                AggregateField::Max,
                AggregateField::Min,
                AggregateField::Sum,
            ] {
                let value = aggregate.field(field);
                if !value.is_finite() || value < 0.0 {
                    return Err(EngineError::InvalidAggregate {
                        timestamp,
                        metric: *metric,
                        field,
                        value,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Time-indexed interval results for a single container.
///
/// Backed by a `BTreeMap`, so iteration is always chronological no matter
/// the order intervals were inserted in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerSeries {
    results: BTreeMap<DateTime<Utc>, IntervalResult>,
}

impl ContainerSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an interval; a repeated timestamp replaces the earlier entry
    pub fn insert(&mut self, end_time: DateTime<Utc>, result: IntervalResult) {
        self.results.insert(end_time, result);
    }

    pub fn get(&self, end_time: &DateTime<Utc>) -> Option<&IntervalResult> {
        self.results.get(end_time)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Intervals in ascending timestamp order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&DateTime<Utc>, &IntervalResult)> {
        self.results.iter()
    }

    /// Intervals ending at or before `end_time`, latest first
    pub fn iter_until_desc(
        &self,
        end_time: DateTime<Utc>,
    ) -> impl Iterator<Item = (&DateTime<Utc>, &IntervalResult)> {
        self.results.range(..=end_time).rev()
    }

    /// Intervals whose timestamp lies in `[start, end]`
    pub fn range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = (&DateTime<Utc>, &IntervalResult)> {
        // BTreeMap::range panics on an inverted range
        let end = end.max(start);
        self.results.range(start..=end)
    }

    pub fn earliest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.results.keys().next().copied()
    }

    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.results.keys().next_back().copied()
    }

    pub fn total_duration_minutes(&self) -> f64 {
        self.results.values().map(|r| r.duration_in_minutes).sum()
    }
}

impl FromIterator<(DateTime<Utc>, IntervalResult)> for ContainerSeries {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, IntervalResult)>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

/// Convert fractional minutes into a chrono duration (millisecond precision).
/// `None` when the span does not fit a `Duration`.
pub fn minutes_to_duration(minutes: f64) -> Option<Duration> {
    let millis = (minutes * 60_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// `end - minutes`, failing instead of overflowing chrono's date range
pub fn minutes_before(end: DateTime<Utc>, minutes: f64) -> Result<DateTime<Utc>, EngineError> {
    minutes_to_duration(minutes)
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or(EngineError::WindowOutOfRange { end, minutes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_absent_metric_reads_as_zero() {
        let interval = IntervalResult::new(15.0);
        assert_eq!(interval.value(MetricName::CpuUsage, AggregateField::Avg), 0.0);
        assert!(interval.metric(MetricName::CpuUsage).is_none());
    }

    #[test]
    fn test_interval_start_time() {
        let interval = IntervalResult::new(90.0);
        assert_eq!(
            interval.start_time(ts(12)),
            Ok(Utc.with_ymd_and_hms(2024, 1, 10, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_start_time_outside_date_range() {
        let interval = IntervalResult::new(1.0e12);
        assert!(interval.validate(ts(12)).is_ok());
        assert_eq!(
            interval.start_time(ts(12)),
            Err(EngineError::WindowOutOfRange { end: ts(12), minutes: 1.0e12 })
        );
        assert!(minutes_to_duration(1.0e300).is_none());
    }

    #[test]
    fn test_series_iterates_chronologically() {
        let mut series = ContainerSeries::new();
        series.insert(ts(3), IntervalResult::new(60.0));
        series.insert(ts(1), IntervalResult::new(60.0));
        series.insert(ts(2), IntervalResult::new(60.0));

        let keys: Vec<_> = series.iter().map(|(t, _)| *t).collect();
        assert_eq!(keys, vec![ts(1), ts(2), ts(3)]);

        let desc: Vec<_> = series.iter_until_desc(ts(2)).map(|(t, _)| *t).collect();
        assert_eq!(desc, vec![ts(2), ts(1)]);

        assert_eq!(series.earliest_timestamp(), Some(ts(1)));
        assert_eq!(series.latest_timestamp(), Some(ts(3)));
        assert_eq!(series.total_duration_minutes(), 180.0);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let mut series = ContainerSeries::new();
        series.insert(ts(1), IntervalResult::new(60.0));
        assert_eq!(series.range(ts(5), ts(1)).count(), 0);
    }

    #[test]
    fn test_validate_rejects_nan_and_negative() {
        let nan = IntervalResult::new(15.0).with_metric(
            MetricName::CpuUsage,
            MetricAggregate::new(f64::NAN, 0.0, 0.0, 0.0, "cores"),
        );
        assert!(matches!(
            nan.validate(ts(1)),
            Err(EngineError::InvalidAggregate { metric: MetricName::CpuUsage, field: AggregateField::Avg, .. })
        ));

        let negative = IntervalResult::new(-1.0);
        assert!(matches!(negative.validate(ts(1)), Err(EngineError::InvalidDuration { .. })));

        assert!(IntervalResult::new(15.0).validate(ts(1)).is_ok());
    }

    #[test]
    fn test_series_json_shape() {
        let mut series = ContainerSeries::new();
        series.insert(
            ts(1),
            IntervalResult::new(15.0).with_metric(
                MetricName::MemoryRss,
                MetricAggregate::new(1.0, 2.0, 0.5, 3.0, "MiB"),
            ),
        );

        let json = serde_json::to_value(&series).unwrap();
        let interval = &json["2024-01-10T01:00:00Z"];
        assert_eq!(interval["duration_in_minutes"], 15.0);
        assert_eq!(interval["metrics"]["memoryRSS"]["max"], 2.0);

        let parsed: ContainerSeries = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, series);
    }

    #[test]
    fn test_missing_aggregate_fields_default_to_zero() {
        let json = r#"{"duration_in_minutes": 15, "metrics": {"cpuUsage": {"avg": 0.5}}}"#;
        let interval: IntervalResult = serde_json::from_str(json).unwrap();
        let cpu = interval.metric(MetricName::CpuUsage).unwrap();
        assert_eq!(cpu.avg, 0.5);
        assert_eq!(cpu.max, 0.0);
        assert!(cpu.format.is_empty());
    }
}
