//! Duration-based sub-category policy
//!
//! A sub-category is a named duration class (short/medium/long term). Its
//! lower bound is the minimum amount of observed data, in minutes, needed
//! before a recommendation for that class is generated. Lower bounds are a
//! fraction of the full duration so early recommendations are possible.

use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const MINUTES_PER_HOUR: f64 = 60.0;
pub const HOURS_PER_DAY: f64 = 24.0;
pub const MINUTES_PER_DAY: f64 = MINUTES_PER_HOUR * HOURS_PER_DAY;

pub const SHORT_TERM: &str = "short_term";
pub const MEDIUM_TERM: &str = "medium_term";
pub const LONG_TERM: &str = "long_term";

/// Minimum data for a short-term recommendation (30 minutes)
pub const SHORT_TERM_LOWER_BOUND_MINUTES: f64 = 30.0;
/// Minimum data for a medium-term recommendation (2 days)
pub const MEDIUM_TERM_LOWER_BOUND_MINUTES: f64 = 2.0 * MINUTES_PER_DAY;
/// Minimum data for a long-term recommendation (8 days)
pub const LONG_TERM_LOWER_BOUND_MINUTES: f64 = 8.0 * MINUTES_PER_DAY;

/// One duration class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCategory {
    pub label: String,
    pub duration_days: u32,
    pub lower_bound_minutes: f64,
}

impl SubCategory {
    pub fn new(label: impl Into<String>, duration_days: u32, lower_bound_minutes: f64) -> Self {
        Self {
            label: label.into(),
            duration_days,
            lower_bound_minutes,
        }
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_days as f64 * HOURS_PER_DAY
    }
}

/// The set of sub-categories an engine evaluates, passed in by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationPolicy {
    pub sub_categories: Vec<SubCategory>,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            sub_categories: vec![
                SubCategory::new(SHORT_TERM, 1, SHORT_TERM_LOWER_BOUND_MINUTES),
                SubCategory::new(MEDIUM_TERM, 7, MEDIUM_TERM_LOWER_BOUND_MINUTES),
                SubCategory::new(LONG_TERM, 15, LONG_TERM_LOWER_BOUND_MINUTES),
            ],
        }
    }
}

impl DurationPolicy {
    pub fn new(sub_categories: Vec<SubCategory>) -> Result<Self, PolicyError> {
        let policy = Self { sub_categories };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.sub_categories.is_empty() {
            return Err(PolicyError::EmptyPolicy);
        }

        let mut seen = HashSet::new();
        for sub_category in &self.sub_categories {
            if !seen.insert(sub_category.label.as_str()) {
                return Err(PolicyError::DuplicateLabel(sub_category.label.clone()));
            }
            if sub_category.duration_days == 0 {
                return Err(PolicyError::ZeroDuration(sub_category.label.clone()));
            }
            let bound = sub_category.lower_bound_minutes;
            if bound.is_nan() || bound <= 0.0 {
                return Err(PolicyError::NonPositiveLowerBound {
                    label: sub_category.label.clone(),
                    value: sub_category.lower_bound_minutes,
                });
            }
        }

        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubCategory> {
        self.sub_categories.iter()
    }

    pub fn get(&self, label: &str) -> Option<&SubCategory> {
        self.sub_categories.iter().find(|s| s.label == label)
    }

    /// Smallest lower bound across all sub-categories
    pub fn smallest_lower_bound(&self) -> Option<f64> {
        self.sub_categories
            .iter()
            .map(|s| s.lower_bound_minutes)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}
