//! Monitoring window selection and filtering

use super::stats::pods_from_ratio;
use crate::error::EngineError;
use crate::models::{AggregateField, ContainerSeries, IntervalResult, MetricName};
use crate::policy::SubCategory;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Find where the monitoring window for `sub_category` starts.
///
/// Walks intervals ending at or before `end_time`, latest first, summing
/// their durations. The window starts at the start of the interval at which
/// the running sum first reaches the lower bound. `None` means the bound was
/// never reached.
pub fn monitoring_start_time(
    series: &ContainerSeries,
    sub_category: &SubCategory,
    end_time: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, EngineError> {
    let mut sum = 0.0;
    for (timestamp, interval) in series.iter_until_desc(end_time) {
        if !interval.duration_in_minutes.is_finite() || interval.duration_in_minutes < 0.0 {
            return Err(EngineError::InvalidDuration {
                timestamp: *timestamp,
                minutes: interval.duration_in_minutes,
            });
        }
        sum += interval.duration_in_minutes;
        if sum >= sub_category.lower_bound_minutes {
            let start = interval.start_time(*timestamp)?;
            debug!(
                sub_category = %sub_category.label,
                start = %start,
                end = %end_time,
                accumulated_minutes = sum,
                "Monitoring window selected"
            );
            return Ok(Some(start));
        }
    }

    debug!(
        sub_category = %sub_category.label,
        accumulated_minutes = sum,
        required_minutes = sub_category.lower_bound_minutes,
        "Lower bound not reached, no monitoring window"
    );
    Ok(None)
}

/// The validated set of intervals whose timestamps lie in `[start, end]`
#[derive(Debug, Clone)]
pub struct MonitoringWindow<'a> {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    intervals: Vec<(DateTime<Utc>, &'a IntervalResult)>,
}

impl<'a> MonitoringWindow<'a> {
    /// Filter the series to `[start, end]` inclusive. Fails if the window is
    /// empty or any interval in it is malformed.
    pub fn filter(
        series: &'a ContainerSeries,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        let mut intervals = Vec::new();
        for (timestamp, interval) in series.range(start, end) {
            interval.validate(*timestamp)?;
            intervals.push((*timestamp, interval));
        }

        if intervals.is_empty() {
            return Err(EngineError::EmptyWindow { start, end });
        }

        Ok(Self {
            start,
            end,
            intervals,
        })
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Intervals in ascending timestamp order
    pub fn intervals(&self) -> impl Iterator<Item = &'a IntervalResult> + '_ {
        self.intervals.iter().map(|(_, interval)| *interval)
    }

    pub fn get(&self, timestamp: DateTime<Utc>) -> Option<&'a IntervalResult> {
        self.intervals
            .iter()
            .find(|(t, _)| *t == timestamp)
            .map(|(_, interval)| *interval)
    }

    /// Collect one value per interval
    pub fn values<F>(&self, f: F) -> Vec<f64>
    where
        F: Fn(&IntervalResult) -> f64,
    {
        self.intervals().map(f).collect()
    }

    /// Replica count: ceiling of the largest cpu sum/avg ratio in the window
    pub fn pod_count(&self) -> u32 {
        self.intervals()
            .map(|interval| {
                pods_from_ratio(
                    interval.value(MetricName::CpuUsage, AggregateField::Sum),
                    interval.value(MetricName::CpuUsage, AggregateField::Avg),
                )
            })
            .max()
            .unwrap_or(0)
    }

    /// Format string of the first interval, chronologically, carrying a
    /// non-empty format for one of `metrics` (tried in order)
    pub fn first_format(&self, metrics: &[MetricName]) -> String {
        metrics
            .iter()
            .find_map(|metric| {
                self.intervals()
                    .filter_map(|interval| interval.metric(*metric))
                    .map(|aggregate| aggregate.format.as_str())
                    .find(|format| !format.is_empty())
            })
            .unwrap_or_default()
            .to_string()
    }

    pub fn total_duration_minutes(&self) -> f64 {
        self.intervals().map(|i| i.duration_in_minutes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricAggregate;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    /// `count` contiguous intervals of `minutes` each, the last ending at the returned time
    fn contiguous(count: i64, minutes: f64) -> (ContainerSeries, DateTime<Utc>) {
        let mut series = ContainerSeries::new();
        let mut end = base();
        for i in 1..=count {
            end = base() + Duration::minutes(i * minutes as i64);
            series.insert(end, IntervalResult::new(minutes));
        }
        (series, end)
    }

    #[test]
    fn test_window_starts_at_interval_where_bound_is_met() {
        let (series, end) = contiguous(3, 480.0);
        let sub_category = SubCategory::new("short_term", 1, 1440.0);

        let start = monitoring_start_time(&series, &sub_category, end).unwrap();
        assert_eq!(start, Some(base()));
    }

    #[test]
    fn test_no_window_when_bound_not_reached() {
        let (series, end) = contiguous(2, 480.0);
        let sub_category = SubCategory::new("short_term", 1, 1440.0);
        assert_eq!(monitoring_start_time(&series, &sub_category, end).unwrap(), None);

        let empty = ContainerSeries::new();
        assert_eq!(monitoring_start_time(&empty, &sub_category, end).unwrap(), None);
    }

    #[test]
    fn test_intervals_after_end_time_are_skipped() {
        let (series, _) = contiguous(4, 60.0);
        let sub_category = SubCategory::new("s", 1, 180.0);
        let end = base() + Duration::minutes(180);

        // only three intervals end at or before `end`
        let start = monitoring_start_time(&series, &sub_category, end).unwrap();
        assert_eq!(start, Some(base()));

        let sub_category = SubCategory::new("s", 1, 181.0);
        assert_eq!(monitoring_start_time(&series, &sub_category, end).unwrap(), None);
    }

    #[test]
    fn test_filter_is_inclusive_and_rejects_empty() {
        let (series, end) = contiguous(3, 60.0);
        let start = base() + Duration::minutes(60);

        let window = MonitoringWindow::filter(&series, start, end).unwrap();
        assert_eq!(window.len(), 3);

        let later = end + Duration::minutes(1);
        let err = MonitoringWindow::filter(&series, later, later + Duration::minutes(5)).unwrap_err();
        assert!(matches!(err, EngineError::EmptyWindow { .. }));
    }

    #[test]
    fn test_first_format_and_pod_count() {
        let mut series = ContainerSeries::new();
        series.insert(
            base(),
            IntervalResult::new(15.0).with_metric(
                MetricName::CpuUsage,
                MetricAggregate::new(0.5, 0.6, 0.1, 1.5, ""),
            ),
        );
        series.insert(
            base() + Duration::minutes(15),
            IntervalResult::new(15.0).with_metric(
                MetricName::CpuUsage,
                MetricAggregate::new(0.5, 0.6, 0.1, 1.0, "cores"),
            ),
        );

        let window = MonitoringWindow::filter(&series, base(), base() + Duration::minutes(15)).unwrap();
        assert_eq!(window.first_format(&[MetricName::CpuUsage]), "cores");
        assert_eq!(window.first_format(&[MetricName::MemoryUsage]), "");
        assert_eq!(window.pod_count(), 3);
    }
}
