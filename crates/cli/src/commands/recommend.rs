//! Recommendation and minimum-data commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use engine_lib::{
    build_engine, ContainerSeries, DurationPolicy, EngineConfig, EngineKind, Recommendation,
    RecommendationSet, ResourceItem, ResourceSetting,
};
use std::path::Path;
use tabled::Tabled;
use tracing::debug;

use super::load_series;
use crate::client::{ApiClient, RecommendationRequest};
use crate::output::{
    color_notification, format_cpu_item, format_memory_item, print_info, print_success,
    print_warning, OutputFormat,
};

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Pods")]
    pods: String,
    #[tabled(rename = "CPU Req")]
    cpu_request: String,
    #[tabled(rename = "CPU Lim")]
    cpu_limit: String,
    #[tabled(rename = "Mem Req")]
    memory_request: String,
    #[tabled(rename = "Mem Lim")]
    memory_limit: String,
    #[tabled(rename = "Notifications")]
    notifications: String,
}

/// Where recommendations are computed
pub enum Backend<'a> {
    Local(EngineKind),
    Remote(&'a ApiClient),
}

pub struct RecommendArgs<'a> {
    pub input: &'a Path,
    pub container_name: Option<&'a str>,
    pub end_time: Option<DateTime<Utc>>,
}

fn format_window(recommendation: &Recommendation) -> String {
    match (
        recommendation.monitoring_start_time,
        recommendation.monitoring_end_time,
    ) {
        (Some(start), Some(end)) => format!(
            "{} → {}",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M")
        ),
        _ => "-".to_string(),
    }
}

fn to_row(term: &str, recommendation: &Recommendation) -> RecommendationRow {
    let notifications = recommendation
        .notifications
        .iter()
        .map(color_notification)
        .collect::<Vec<_>>()
        .join("\n");

    RecommendationRow {
        term: term.to_string(),
        window: format_window(recommendation),
        pods: if recommendation.pods_count > 0 {
            recommendation.pods_count.to_string()
        } else {
            "-".to_string()
        },
        cpu_request: format_cpu_item(
            recommendation.config_item(ResourceSetting::Requests, ResourceItem::Cpu),
        ),
        cpu_limit: format_cpu_item(
            recommendation.config_item(ResourceSetting::Limits, ResourceItem::Cpu),
        ),
        memory_request: format_memory_item(
            recommendation.config_item(ResourceSetting::Requests, ResourceItem::Memory),
        ),
        memory_limit: format_memory_item(
            recommendation.config_item(ResourceSetting::Limits, ResourceItem::Memory),
        ),
        notifications,
    }
}

fn local_engine(kind: EngineKind) -> Result<Box<dyn engine_lib::RecommendationEngine>> {
    build_engine(kind, EngineConfig::default(), DurationPolicy::default())
        .context("Failed to build recommendation engine")
}

fn default_end_time(series: &ContainerSeries) -> DateTime<Utc> {
    series.latest_timestamp().unwrap_or_else(Utc::now)
}

/// Generate recommendations for a series file
pub async fn recommend(
    backend: Backend<'_>,
    args: RecommendArgs<'_>,
    format: OutputFormat,
) -> Result<()> {
    let series = load_series(args.input)?;
    debug!(intervals = series.len(), "Loaded series");

    let (engine_key, end_time, recommendations): (String, DateTime<Utc>, RecommendationSet) =
        match backend {
            Backend::Local(kind) => {
                let engine = local_engine(kind)?;
                let end_time = args.end_time.unwrap_or_else(|| default_end_time(&series));
                let recommendations = engine.generate_recommendation(&series, end_time);
                (kind.key().to_string(), end_time, recommendations)
            }
            Backend::Remote(client) => {
                let response = client
                    .recommendations(&RecommendationRequest {
                        container_name: args.container_name,
                        end_time: args.end_time,
                        series: &series,
                    })
                    .await?;
                (response.engine, response.end_time, response.recommendations)
            }
        };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&recommendations)?);
        }
        OutputFormat::Table => {
            if let Some(name) = args.container_name {
                print_info(&format!("Container: {}", name));
            }
            print_info(&format!(
                "Engine: {}, end time: {}",
                engine_key,
                end_time.to_rfc3339()
            ));

            let rows: Vec<RecommendationRow> = recommendations
                .iter()
                .map(|(term, recommendation)| to_row(term, recommendation))
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}

/// Report whether a series holds enough data for any recommendation
pub async fn check(backend: Backend<'_>, input: &Path, format: OutputFormat) -> Result<()> {
    let series = load_series(input)?;

    let available = match backend {
        Backend::Local(kind) => local_engine(kind)?.check_min_data_available(&series),
        Backend::Remote(client) => client.min_data_check(&series).await?,
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "min_data_available": available,
                }))?
            );
        }
        OutputFormat::Table => {
            let summary = format!(
                "{} intervals, {:.0} minutes observed",
                series.len(),
                series.total_duration_minutes()
            );
            if available {
                print_success(&format!("Minimum data available ({})", summary));
            } else {
                print_warning(&format!("Not enough data ({})", summary));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_lib::NotificationKind;

    #[test]
    fn test_row_for_missing_data() {
        let row = to_row("long_term", &Recommendation::not_enough_data());
        assert_eq!(row.term, "long_term");
        assert_eq!(row.window, "-");
        assert_eq!(row.pods, "-");
        assert_eq!(row.cpu_request, "-");
        assert!(row
            .notifications
            .contains(NotificationKind::NotEnoughData.as_str()));
    }
}
