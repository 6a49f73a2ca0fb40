//! Duration-based recommendation engine
//!
//! For every sub-category, selects the most recent window holding at least
//! the sub-category's lower bound of data and derives CPU/memory requests
//! and limits from it:
//!
//! - CPU: per-interval usage plus throttle, normalized per pod above one
//!   core, then the maximum (sub-core workloads) or the 98th percentile.
//! - Memory: the tighter of "peak usage plus a buffer" and "peak usage plus
//!   the largest buffered spike".
//! - Limits currently mirror requests through their own code path.
//! - Variation is `recommended - current` for each value set at `end_time`.

use super::stats::{max_of, percentile, pods_from_ratio};
use super::window::{monitoring_start_time, MonitoringWindow};
use super::{
    min_data_available, EngineConfig, RecommendationCategory, RecommendationEngine,
    RecommendationSet,
};
use crate::error::EngineError;
use crate::models::{AggregateField, ContainerSeries, IntervalResult, MetricName};
use crate::policy::{DurationPolicy, SubCategory};
use crate::recommendation::{
    NotificationKind, Recommendation, RecommendationConfigItem, RecommendationNotification,
    ResourceItem, ResourceSetting,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

pub const DURATION_BASED_NAME: &str = "Duration Based";

pub struct DurationBasedEngine {
    config: EngineConfig,
    policy: DurationPolicy,
}

impl DurationBasedEngine {
    pub fn new(config: EngineConfig, policy: DurationPolicy) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> &DurationPolicy {
        &self.policy
    }

    /// Evaluate one sub-category. Errors are recovered by the caller.
    fn evaluate(
        &self,
        series: &ContainerSeries,
        sub_category: &SubCategory,
        end_time: DateTime<Utc>,
    ) -> Result<Recommendation, EngineError> {
        let Some(start_time) = monitoring_start_time(series, sub_category, end_time)? else {
            return Ok(Recommendation::not_enough_data());
        };
        let window = MonitoringWindow::filter(series, start_time, end_time)?;

        let mut recommendation = Recommendation::new(start_time, end_time);
        let mut notifications = Vec::new();

        let cpu_request = cpu_request_recommendation(&window, &self.config, &mut notifications)?;
        let memory_request =
            memory_request_recommendation(&window, &self.config, &mut notifications)?;
        let cpu_limit = cpu_limit_recommendation(cpu_request.as_ref());
        let memory_limit = memory_limit_recommendation(memory_request.as_ref());

        let generated = [
            (ResourceSetting::Requests, ResourceItem::Cpu, cpu_request),
            (ResourceSetting::Requests, ResourceItem::Memory, memory_request),
            (ResourceSetting::Limits, ResourceItem::Cpu, cpu_limit),
            (ResourceSetting::Limits, ResourceItem::Memory, memory_limit),
        ];

        for (setting, item, value) in &generated {
            if let Some(value) = value.as_ref().filter(|v| v.amount > 0.0) {
                recommendation.set_config_item(*setting, *item, value.clone());
            }
        }

        recommendation.pods_count = window.pod_count();
        recommendation.duration_in_hours = sub_category.duration_hours();

        for (setting, item, value) in generated {
            let current = current_value(&window, end_time, setting, item, &mut notifications);
            let Some(recommended) = value.filter(|v| v.amount > 0.0) else {
                continue;
            };
            if let Some(current) = current {
                // positive means the container is currently under-provisioned
                recommendation.set_variation_item(
                    setting,
                    item,
                    RecommendationConfigItem::new(recommended.amount - current, recommended.format),
                );
            }
        }

        recommendation.notifications = notifications;

        debug!(
            sub_category = %sub_category.label,
            intervals = window.len(),
            pods = recommendation.pods_count,
            notifications = recommendation.notifications.len(),
            "Sub-category evaluated"
        );

        Ok(recommendation)
    }
}

impl Default for DurationBasedEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), DurationPolicy::default())
    }
}

impl RecommendationEngine for DurationBasedEngine {
    fn engine_name(&self) -> &str {
        DURATION_BASED_NAME
    }

    fn engine_key(&self) -> &str {
        super::EngineKind::DURATION_BASED_KEY
    }

    fn engine_category(&self) -> RecommendationCategory {
        RecommendationCategory::DurationBased
    }

    fn check_min_data_available(&self, series: &ContainerSeries) -> bool {
        min_data_available(series, &self.policy)
    }

    fn generate_recommendation(
        &self,
        series: &ContainerSeries,
        end_time: DateTime<Utc>,
    ) -> RecommendationSet {
        let mut recommendations = RecommendationSet::new();

        for sub_category in self.policy.iter() {
            let recommendation = match self.evaluate(series, sub_category, end_time) {
                Ok(recommendation) => recommendation,
                Err(err) => {
                    warn!(
                        engine = DURATION_BASED_NAME,
                        sub_category = %sub_category.label,
                        error = %err,
                        "Failed to evaluate sub-category"
                    );
                    Recommendation::calculation_failed(&err)
                }
            };
            recommendations.insert(sub_category.label.clone(), recommendation);
        }

        info!(
            engine = DURATION_BASED_NAME,
            end_time = %end_time,
            intervals = series.len(),
            sub_categories = recommendations.len(),
            "Generated recommendations"
        );

        recommendations
    }
}

/// Max when positive, otherwise the average
fn peak_or_avg(interval: &IntervalResult, metric: MetricName) -> f64 {
    let avg = interval.value(metric, AggregateField::Avg);
    let max = interval.value(metric, AggregateField::Max);
    if max > 0.0 {
        max.max(avg)
    } else {
        avg
    }
}

/// Candidate CPU request for one interval
fn cpu_interval_candidate(interval: &IntervalResult, config: &EngineConfig) -> f64 {
    let usage = peak_or_avg(interval, MetricName::CpuUsage);
    let throttle = peak_or_avg(interval, MetricName::CpuThrottle);
    let total = usage + throttle;

    // Sub-core usage is trusted as observed
    if total < config.cpu_one_core {
        return total;
    }

    let usage_sum = interval.value(MetricName::CpuUsage, AggregateField::Sum);
    let throttle_sum = interval.value(MetricName::CpuThrottle, AggregateField::Sum);
    let pods = pods_from_ratio(
        usage_sum,
        interval.value(MetricName::CpuUsage, AggregateField::Avg),
    );
    let per_pod = if pods > 0 {
        (usage_sum + throttle_sum) / pods as f64
    } else {
        0.0
    };

    per_pod.max(total)
}

/// CPU request over the window. `None` (with a notification) when usage is
/// zero or idle.
pub(crate) fn cpu_request_recommendation(
    window: &MonitoringWindow<'_>,
    config: &EngineConfig,
    notifications: &mut Vec<RecommendationNotification>,
) -> Result<Option<RecommendationConfigItem>, EngineError> {
    let candidates = window.values(|interval| cpu_interval_candidate(interval, config));

    let candidate_max = max_of(&candidates)?;
    let cpu_request = if candidate_max < config.cpu_one_core {
        candidate_max
    } else {
        percentile(config.cpu_request_percentile, &candidates)?
    };

    if cpu_request == config.cpu_zero {
        notifications.push(RecommendationNotification::new(
            NotificationKind::CpuRecordsAreZero,
        ));
        return Ok(None);
    }
    if cpu_request <= config.cpu_one_millicore {
        notifications.push(RecommendationNotification::new(
            NotificationKind::CpuRecordsAreIdle,
        ));
        return Ok(None);
    }

    let format = window.first_format(&[MetricName::CpuUsage]);
    Ok(Some(RecommendationConfigItem::new(cpu_request, format)))
}

/// Per-interval memory usage signal, normalized per pod
fn memory_usage_signal(interval: &IntervalResult) -> f64 {
    let mem_sum = interval.value(MetricName::MemoryUsage, AggregateField::Sum);
    let mem_max = interval.value(MetricName::MemoryUsage, AggregateField::Max);

    let mut pods = pods_from_ratio(
        interval.value(MetricName::CpuUsage, AggregateField::Sum),
        interval.value(MetricName::CpuUsage, AggregateField::Avg),
    );
    // No CPU info; memory is a weaker signal for the pod count but still usable
    if pods == 0 {
        pods = pods_from_ratio(
            mem_sum,
            interval.value(MetricName::MemoryUsage, AggregateField::Avg),
        );
    }

    let per_pod = if pods > 0 { mem_sum / pods as f64 } else { 0.0 };
    per_pod.max(mem_max)
}

/// Largest single-interval swing in memory usage or RSS
fn memory_spike_signal(interval: &IntervalResult) -> f64 {
    let usage_swing = (interval.value(MetricName::MemoryUsage, AggregateField::Max)
        - interval.value(MetricName::MemoryUsage, AggregateField::Min))
    .ceil();
    let rss_swing = (interval.value(MetricName::MemoryRss, AggregateField::Max)
        - interval.value(MetricName::MemoryRss, AggregateField::Min))
    .ceil();
    usage_swing.max(rss_swing).max(0.0)
}

/// Memory request over the window. `None` (with a notification) when usage
/// is zero.
pub(crate) fn memory_request_recommendation(
    window: &MonitoringWindow<'_>,
    config: &EngineConfig,
    notifications: &mut Vec<RecommendationNotification>,
) -> Result<Option<RecommendationConfigItem>, EngineError> {
    let usage = percentile(config.memory_percentile, &window.values(memory_usage_signal))?;
    let spike = percentile(config.memory_percentile, &window.values(memory_spike_signal))?;

    let usage_buffered = usage * (1.0 + config.memory_usage_buffer);
    let spike_candidate = usage + spike * (1.0 + config.memory_spike_buffer);
    let memory_request = usage_buffered.min(spike_candidate);

    debug!(
        usage,
        spike,
        usage_buffered,
        spike_candidate,
        "Memory request candidates"
    );

    if memory_request == 0.0 {
        notifications.push(RecommendationNotification::new(
            NotificationKind::MemoryRecordsAreZero,
        ));
        return Ok(None);
    }

    let format = window.first_format(&[MetricName::MemoryUsage]);
    Ok(Some(RecommendationConfigItem::new(memory_request, format)))
}

/// CPU limit; mirrors the request for now
fn cpu_limit_recommendation(
    cpu_request: Option<&RecommendationConfigItem>,
) -> Option<RecommendationConfigItem> {
    cpu_request.cloned()
}

/// Memory limit; mirrors the request for now
fn memory_limit_recommendation(
    memory_request: Option<&RecommendationConfigItem>,
) -> Option<RecommendationConfigItem> {
    memory_request.cloned()
}

fn current_setting_metric(setting: ResourceSetting, item: ResourceItem) -> MetricName {
    match (setting, item) {
        (ResourceSetting::Requests, ResourceItem::Cpu) => MetricName::CpuRequest,
        (ResourceSetting::Requests, ResourceItem::Memory) => MetricName::MemoryRequest,
        (ResourceSetting::Limits, ResourceItem::Cpu) => MetricName::CpuLimit,
        (ResourceSetting::Limits, ResourceItem::Memory) => MetricName::MemoryLimit,
    }
}

/// Currently configured value (the average of the matching setting metric)
/// at exactly `timestamp`. Raises the matching NOT_SET notification when the
/// interval or metric is missing.
pub(crate) fn current_value(
    window: &MonitoringWindow<'_>,
    timestamp: DateTime<Utc>,
    setting: ResourceSetting,
    item: ResourceItem,
    notifications: &mut Vec<RecommendationNotification>,
) -> Option<f64> {
    let metric = current_setting_metric(setting, item);
    let current = window
        .get(timestamp)
        .and_then(|interval| interval.metric(metric))
        .map(|aggregate| aggregate.avg);

    if current.is_none() {
        notifications.push(RecommendationNotification::new(NotificationKind::not_set(
            setting, item,
        )));
    }
    current
}
