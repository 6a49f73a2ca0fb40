//! Observability infrastructure for recommendation evaluation
//!
//! Provides:
//! - Prometheus metrics (evaluation latency, recommendations and notifications emitted)
//! - Structured JSON logging with tracing

use crate::engine::RecommendationSet;
use crate::recommendation::NotificationType;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for evaluation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    evaluation_latency_seconds: Histogram,
    recommendations_total: IntCounterVec,
    notifications_total: IntCounterVec,
    evaluation_failures_total: IntCounter,
    insufficient_data_total: IntCounter,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            evaluation_latency_seconds: register_histogram!(
                "rightsize_evaluation_latency_seconds",
                "Time spent generating recommendations for one series",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register evaluation_latency_seconds"),

            recommendations_total: register_int_counter_vec!(
                "rightsize_recommendations_total",
                "Recommendations generated, by engine and sub-category",
                &["engine", "sub_category"]
            )
            .expect("Failed to register recommendations_total"),

            notifications_total: register_int_counter_vec!(
                "rightsize_notifications_total",
                "Notifications attached to generated recommendations",
                &["kind"]
            )
            .expect("Failed to register notifications_total"),

            evaluation_failures_total: register_int_counter!(
                "rightsize_evaluation_failures_total",
                "Sub-category evaluations that ended in a calculation failure"
            )
            .expect("Failed to register evaluation_failures_total"),

            insufficient_data_total: register_int_counter!(
                "rightsize_insufficient_data_total",
                "Requests whose series held too little data"
            )
            .expect("Failed to register insufficient_data_total"),
        }
    }
}

/// Handle to the process-wide engine metrics. Clones share the same
/// underlying collectors.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_evaluation_latency(&self, duration_secs: f64) {
        self.inner().evaluation_latency_seconds.observe(duration_secs);
    }

    /// Count every sub-category result and notification in `recommendations`
    pub fn record_recommendations(&self, engine: &str, recommendations: &RecommendationSet) {
        let inner = self.inner();
        for (label, recommendation) in recommendations {
            inner
                .recommendations_total
                .with_label_values(&[engine, label])
                .inc();

            for notification in &recommendation.notifications {
                inner
                    .notifications_total
                    .with_label_values(&[notification.kind.as_str()])
                    .inc();

                if notification.notification_type == NotificationType::Error {
                    inner.evaluation_failures_total.inc();
                }
            }
        }
    }

    pub fn inc_insufficient_data(&self) {
        self.inner().insufficient_data_total.inc();
    }
}

/// Structured logger for service-level events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log a finished evaluation, one line per sub-category
    pub fn log_recommendation(
        &self,
        container_name: &str,
        engine: &str,
        recommendations: &RecommendationSet,
        elapsed_secs: f64,
    ) {
        for (label, recommendation) in recommendations {
            let notifications: Vec<u32> =
                recommendation.notifications.iter().map(|n| n.code).collect();
            info!(
                event = "recommendation_generated",
                instance = %self.instance,
                container = %container_name,
                engine = %engine,
                sub_category = %label,
                pods_count = recommendation.pods_count,
                duration_in_hours = recommendation.duration_in_hours,
                notification_codes = ?notifications,
                elapsed_secs = elapsed_secs,
                "Generated recommendation"
            );
        }
    }

    pub fn log_insufficient_data(&self, container_name: &str, intervals: usize, minutes: f64) {
        info!(
            event = "insufficient_data",
            instance = %self.instance,
            container = %container_name,
            intervals = intervals,
            observed_minutes = minutes,
            "Not enough data to generate recommendations"
        );
    }

    pub fn log_recommendation_failed(&self, container_name: &str, sub_category: &str, reason: &str) {
        warn!(
            event = "recommendation_failed",
            instance = %self.instance,
            container = %container_name,
            sub_category = %sub_category,
            reason = %reason,
            "Recommendation calculation failed"
        );
    }

    pub fn log_startup(&self, version: &str, engine: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            engine = %engine,
            "Rightsize advisor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Rightsize advisor shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendation::{NotificationKind, Recommendation};

    #[test]
    fn test_engine_metrics_record() {
        let metrics = EngineMetrics::new();
        metrics.observe_evaluation_latency(0.002);
        metrics.inc_insufficient_data();

        let mut set = RecommendationSet::new();
        set.insert("short_term".to_string(), Recommendation::not_enough_data());
        metrics.record_recommendations("duration_based", &set);

        let families = prometheus::gather();
        let notifications = families
            .iter()
            .find(|f| f.get_name() == "rightsize_notifications_total")
            .expect("notifications counter registered");
        assert!(notifications
            .get_metric()
            .iter()
            .any(|m| m.get_label().iter().any(|l| l.get_value() == "NOT_ENOUGH_DATA")));
        assert!(!set["short_term"].has_notification(NotificationKind::CalculationFailed));
    }

    #[test]
    fn test_insufficient_data_counter() {
        let metrics = EngineMetrics::new();
        metrics.inc_insufficient_data();

        let families = prometheus::gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "rightsize_insufficient_data_total")
            .expect("insufficient data counter registered");
        assert_eq!(family.get_help(), "Requests whose series held too little data");
        assert!(family.get_metric()[0].get_counter().get_value() >= 1.0);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("advisor-0");
        assert_eq!(logger.instance(), "advisor-0");
    }
}
