//! Recommendation output model
//!
//! A `Recommendation` is created fresh for every sub-category evaluation and
//! handed to the caller. Missing values are expressed by omitting the map
//! entry and attaching a notification, never by a sentinel zero.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceSetting {
    Requests,
    Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceItem {
    Cpu,
    Memory,
}

impl fmt::Display for ResourceSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceSetting::Requests => "requests",
            ResourceSetting::Limits => "limits",
        })
    }
}

impl fmt::Display for ResourceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceItem::Cpu => "cpu",
            ResourceItem::Memory => "memory",
        })
    }
}

/// One resource value, e.g. 1.5 cores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationConfigItem {
    pub amount: f64,
    pub format: String,
}

impl RecommendationConfigItem {
    pub fn new(amount: f64, format: impl Into<String>) -> Self {
        Self {
            amount,
            format: format.into(),
        }
    }
}

/// Values grouped by setting (requests/limits) then item (cpu/memory)
pub type ResourceConfig =
    BTreeMap<ResourceSetting, BTreeMap<ResourceItem, RecommendationConfigItem>>;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Info => "info",
            NotificationType::Notice => "notice",
            NotificationType::Warning => "warning",
            NotificationType::Error => "error",
            NotificationType::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NotEnoughData,
    CpuRecordsAreIdle,
    CpuRecordsAreZero,
    MemoryRecordsAreZero,
    CpuRequestNotSet,
    CpuLimitNotSet,
    MemoryRequestNotSet,
    MemoryLimitNotSet,
    CalculationFailed,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NotEnoughData => "NOT_ENOUGH_DATA",
            NotificationKind::CpuRecordsAreIdle => "CPU_RECORDS_ARE_IDLE",
            NotificationKind::CpuRecordsAreZero => "CPU_RECORDS_ARE_ZERO",
            NotificationKind::MemoryRecordsAreZero => "MEMORY_RECORDS_ARE_ZERO",
            NotificationKind::CpuRequestNotSet => "CPU_REQUEST_NOT_SET",
            NotificationKind::CpuLimitNotSet => "CPU_LIMIT_NOT_SET",
            NotificationKind::MemoryRequestNotSet => "MEMORY_REQUEST_NOT_SET",
            NotificationKind::MemoryLimitNotSet => "MEMORY_LIMIT_NOT_SET",
            NotificationKind::CalculationFailed => "CALCULATION_FAILED",
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            NotificationKind::NotEnoughData => 120001,
            NotificationKind::CalculationFailed => 221001,
            NotificationKind::CpuRecordsAreIdle => 323001,
            NotificationKind::CpuRecordsAreZero => 323002,
            NotificationKind::MemoryRecordsAreZero => 324001,
            NotificationKind::CpuLimitNotSet => 423001,
            NotificationKind::CpuRequestNotSet => 523001,
            NotificationKind::MemoryRequestNotSet => 524001,
            NotificationKind::MemoryLimitNotSet => 524002,
        }
    }

    pub fn notification_type(&self) -> NotificationType {
        match self {
            NotificationKind::NotEnoughData => NotificationType::Info,
            NotificationKind::CpuRecordsAreIdle
            | NotificationKind::CpuRecordsAreZero
            | NotificationKind::MemoryRecordsAreZero => NotificationType::Notice,
            NotificationKind::CpuLimitNotSet => NotificationType::Warning,
            NotificationKind::CalculationFailed => NotificationType::Error,
            NotificationKind::CpuRequestNotSet
            | NotificationKind::MemoryRequestNotSet
            | NotificationKind::MemoryLimitNotSet => NotificationType::Critical,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            NotificationKind::NotEnoughData => {
                "There is not enough data available to generate a recommendation."
            }
            NotificationKind::CpuRecordsAreIdle => {
                "CPU usage is less than a millicore, no CPU recommendations can be generated"
            }
            NotificationKind::CpuRecordsAreZero => {
                "CPU usage is zero, no CPU recommendations can be generated"
            }
            NotificationKind::MemoryRecordsAreZero => {
                "Memory usage is zero, no memory recommendations can be generated"
            }
            NotificationKind::CpuRequestNotSet => "CPU request not set",
            NotificationKind::CpuLimitNotSet => "CPU limit not set",
            NotificationKind::MemoryRequestNotSet => "Memory request not set",
            NotificationKind::MemoryLimitNotSet => "Memory limit not set",
            NotificationKind::CalculationFailed => "Recommendation calculation failed",
        }
    }

    /// The "not set" kind for a current resource setting
    pub fn not_set(setting: ResourceSetting, item: ResourceItem) -> Self {
        match (setting, item) {
            (ResourceSetting::Requests, ResourceItem::Cpu) => NotificationKind::CpuRequestNotSet,
            (ResourceSetting::Limits, ResourceItem::Cpu) => NotificationKind::CpuLimitNotSet,
            (ResourceSetting::Requests, ResourceItem::Memory) => {
                NotificationKind::MemoryRequestNotSet
            }
            (ResourceSetting::Limits, ResourceItem::Memory) => NotificationKind::MemoryLimitNotSet,
        }
    }
}

/// User-facing annotation explaining a missing or degenerate value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationNotification {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub code: u32,
    pub kind: NotificationKind,
    pub message: String,
}

impl RecommendationNotification {
    pub fn new(kind: NotificationKind) -> Self {
        Self::with_message(kind, kind.default_message())
    }

    pub fn with_message(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            notification_type: kind.notification_type(),
            code: kind.code(),
            kind,
            message: message.into(),
        }
    }
}

/// Sizing decision for one sub-category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_in_hours: f64,
    #[serde(default)]
    pub pods_count: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: ResourceConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variation: ResourceConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<RecommendationNotification>,
}

impl Recommendation {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            monitoring_start_time: Some(start),
            monitoring_end_time: Some(end),
            ..Default::default()
        }
    }

    /// Recommendation carrying only a NOT_ENOUGH_DATA notification
    pub fn not_enough_data() -> Self {
        Self {
            notifications: vec![RecommendationNotification::new(NotificationKind::NotEnoughData)],
            ..Default::default()
        }
    }

    /// Recommendation for a sub-category whose evaluation failed
    pub fn calculation_failed(err: &EngineError) -> Self {
        let message = format!(
            "{}: {}",
            NotificationKind::CalculationFailed.default_message(),
            err
        );
        Self {
            notifications: vec![RecommendationNotification::with_message(
                NotificationKind::CalculationFailed,
                message,
            )],
            ..Default::default()
        }
    }

    pub fn set_config_item(
        &mut self,
        setting: ResourceSetting,
        item: ResourceItem,
        value: RecommendationConfigItem,
    ) {
        self.config.entry(setting).or_default().insert(item, value);
    }

    pub fn set_variation_item(
        &mut self,
        setting: ResourceSetting,
        item: ResourceItem,
        value: RecommendationConfigItem,
    ) {
        self.variation.entry(setting).or_default().insert(item, value);
    }

    pub fn config_item(
        &self,
        setting: ResourceSetting,
        item: ResourceItem,
    ) -> Option<&RecommendationConfigItem> {
        self.config.get(&setting).and_then(|m| m.get(&item))
    }

    pub fn variation_item(
        &self,
        setting: ResourceSetting,
        item: ResourceItem,
    ) -> Option<&RecommendationConfigItem> {
        self.variation.get(&setting).and_then(|m| m.get(&item))
    }

    pub fn has_notification(&self, kind: NotificationKind) -> bool {
        self.notifications.iter().any(|n| n.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_not_enough_data_shape() {
        let rec = Recommendation::not_enough_data();
        assert!(rec.config.is_empty());
        assert!(rec.variation.is_empty());
        assert!(rec.has_notification(NotificationKind::NotEnoughData));

        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("config").is_none());
        assert!(json.get("monitoring_start_time").is_none());
        assert_eq!(json["notifications"][0]["kind"], "NOT_ENOUGH_DATA");
        assert_eq!(json["notifications"][0]["code"], 120001);
        assert_eq!(json["notifications"][0]["type"], "info");
    }

    #[test]
    fn test_serialized_field_names() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut rec = Recommendation::new(start, end);
        rec.duration_in_hours = 24.0;
        rec.pods_count = 2;
        rec.set_config_item(
            ResourceSetting::Requests,
            ResourceItem::Cpu,
            RecommendationConfigItem::new(1.5, "cores"),
        );
        rec.set_variation_item(
            ResourceSetting::Limits,
            ResourceItem::Memory,
            RecommendationConfigItem::new(-10.0, "MiB"),
        );

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["config"]["requests"]["cpu"]["amount"], 1.5);
        assert_eq!(json["config"]["requests"]["cpu"]["format"], "cores");
        assert_eq!(json["variation"]["limits"]["memory"]["amount"], -10.0);
        assert_eq!(json["duration_in_hours"], 24.0);
        assert_eq!(json["pods_count"], 2);
        assert_eq!(json["monitoring_end_time"], "2024-01-02T00:00:00Z");

        let parsed: Recommendation = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, rec);
    }

    #[test]
    fn test_not_set_mapping() {
        assert_eq!(
            NotificationKind::not_set(ResourceSetting::Requests, ResourceItem::Cpu),
            NotificationKind::CpuRequestNotSet
        );
        assert_eq!(
            NotificationKind::not_set(ResourceSetting::Limits, ResourceItem::Memory),
            NotificationKind::MemoryLimitNotSet
        );
    }

    #[test]
    fn test_calculation_failed_carries_error_text() {
        let rec = Recommendation::calculation_failed(&EngineError::EmptyPercentileInput);
        let notification = &rec.notifications[0];
        assert_eq!(notification.kind, NotificationKind::CalculationFailed);
        assert_eq!(notification.notification_type, NotificationType::Error);
        assert!(notification.message.contains("empty list"));
    }
}
