//! Capacity-based recommendation engine
//!
//! Sizes containers for their aggregate footprint: requests come from a
//! percentile of summed usage across pods, limits from the largest per-pod
//! peak scaled by the largest observed pod count. Windows are calendar
//! based (`end_time - duration_days`) instead of data based.

use super::stats::{max_of, percentile, ratio};
use super::window::MonitoringWindow;
use super::{
    min_data_available, EngineConfig, EngineKind, RecommendationCategory, RecommendationEngine,
    RecommendationSet,
};
use crate::error::EngineError;
use crate::models::{minutes_before, AggregateField, ContainerSeries, MetricName};
use crate::policy::{DurationPolicy, SubCategory, MINUTES_PER_DAY, MINUTES_PER_HOUR};
use crate::recommendation::{
    NotificationKind, Recommendation, RecommendationConfigItem, RecommendationNotification,
    ResourceItem, ResourceSetting,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

pub const CAPACITY_BASED_NAME: &str = "Capacity Based";

pub struct CapacityBasedEngine {
    config: EngineConfig,
    policy: DurationPolicy,
}

impl CapacityBasedEngine {
    pub fn new(config: EngineConfig, policy: DurationPolicy) -> Self {
        Self { config, policy }
    }

    fn evaluate(
        &self,
        series: &ContainerSeries,
        sub_category: &SubCategory,
        end_time: DateTime<Utc>,
    ) -> Result<Recommendation, EngineError> {
        let Some(earliest) = series.earliest_timestamp() else {
            return Ok(Recommendation::not_enough_data());
        };

        let start_time = minutes_before(
            end_time,
            f64::from(sub_category.duration_days) * MINUTES_PER_DAY,
        )?;
        // A single-day window is always attempted, even on a young series
        if start_time < earliest && sub_category.duration_days != 1 {
            return Ok(Recommendation::not_enough_data());
        }

        let window = match MonitoringWindow::filter(series, start_time, end_time) {
            Ok(window) => window,
            Err(EngineError::EmptyWindow { .. }) => return Ok(Recommendation::not_enough_data()),
            Err(err) => return Err(err),
        };

        let mut recommendation = Recommendation::new(start_time, end_time);
        let mut notifications = Vec::new();

        let cpu_capacity = percentile(
            self.config.capacity_percentile,
            &window.values(|i| {
                i.value(MetricName::CpuUsage, AggregateField::Sum)
                    + i.value(MetricName::CpuThrottle, AggregateField::Sum)
            }),
        )?;
        let cpu_peak = max_of(&window.values(|i| {
            i.value(MetricName::CpuUsage, AggregateField::Max)
                + i.value(MetricName::CpuThrottle, AggregateField::Max)
        }))?;
        let cpu_pods = max_of(&window.values(|i| {
            ratio(
                i.value(MetricName::CpuUsage, AggregateField::Sum),
                i.value(MetricName::CpuUsage, AggregateField::Avg),
            )
        }))?;
        let cpu_max = cpu_peak * cpu_pods;

        let memory_capacity = percentile(
            self.config.capacity_percentile,
            &window.values(|i| i.value(MetricName::MemoryRss, AggregateField::Sum)),
        )?;
        let memory_peak =
            max_of(&window.values(|i| i.value(MetricName::MemoryUsage, AggregateField::Max)))?;
        let memory_pods = max_of(&window.values(|i| {
            ratio(
                i.value(MetricName::MemoryUsage, AggregateField::Sum),
                i.value(MetricName::MemoryUsage, AggregateField::Avg),
            )
        }))?;
        let memory_max = memory_peak * memory_pods;

        debug!(
            sub_category = %sub_category.label,
            cpu_capacity,
            cpu_max,
            memory_capacity,
            memory_max,
            "Capacity candidates"
        );

        let cpu_format = window.first_format(&[MetricName::CpuUsage]);
        if cpu_capacity <= self.config.cpu_zero && cpu_max <= self.config.cpu_zero {
            notifications.push(RecommendationNotification::new(
                NotificationKind::CpuRecordsAreZero,
            ));
        } else {
            insert_positive(&mut recommendation, ResourceSetting::Requests, ResourceItem::Cpu, cpu_capacity, &cpu_format);
            insert_positive(&mut recommendation, ResourceSetting::Limits, ResourceItem::Cpu, cpu_max, &cpu_format);
        }

        let memory_format = window.first_format(&[MetricName::MemoryUsage, MetricName::MemoryRss]);
        if memory_capacity <= 0.0 && memory_max <= 0.0 {
            notifications.push(RecommendationNotification::new(
                NotificationKind::MemoryRecordsAreZero,
            ));
        } else {
            insert_positive(&mut recommendation, ResourceSetting::Requests, ResourceItem::Memory, memory_capacity, &memory_format);
            insert_positive(&mut recommendation, ResourceSetting::Limits, ResourceItem::Memory, memory_max, &memory_format);
        }

        recommendation.pods_count = window.pod_count();
        recommendation.duration_in_hours = window.total_duration_minutes() / MINUTES_PER_HOUR;
        recommendation.notifications = notifications;

        Ok(recommendation)
    }
}

fn insert_positive(
    recommendation: &mut Recommendation,
    setting: ResourceSetting,
    item: ResourceItem,
    amount: f64,
    format: &str,
) {
    if amount > 0.0 {
        recommendation.set_config_item(setting, item, RecommendationConfigItem::new(amount, format));
    }
}

impl Default for CapacityBasedEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), DurationPolicy::default())
    }
}

impl RecommendationEngine for CapacityBasedEngine {
    fn engine_name(&self) -> &str {
        CAPACITY_BASED_NAME
    }

    fn engine_key(&self) -> &str {
        EngineKind::CAPACITY_BASED_KEY
    }

    fn engine_category(&self) -> RecommendationCategory {
        RecommendationCategory::CapacityBased
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
            let recommendation = self
                .evaluate(series, sub_category, end_time)
                .unwrap_or_else(|err| {
                    warn!(
                        engine = CAPACITY_BASED_NAME,
                        sub_category = %sub_category.label,
                        error = %err,
                        "Failed to evaluate sub-category"
                    );
                    Recommendation::calculation_failed(&err)
                });
            recommendations.insert(sub_category.label.clone(), recommendation);
        }

        info!(
            engine = CAPACITY_BASED_NAME,
            end_time = %end_time,
            intervals = series.len(),
            "Generated recommendations"
        );

        recommendations
    }
}
