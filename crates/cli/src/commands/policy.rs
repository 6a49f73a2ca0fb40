//! Sub-category policy command

use anyhow::Result;
use engine_lib::policy::MINUTES_PER_HOUR;
use engine_lib::DurationPolicy;
use tabled::Tabled;

use crate::output::OutputFormat;

#[derive(Tabled)]
struct SubCategoryRow {
    #[tabled(rename = "Term")]
    label: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Min Data")]
    lower_bound: String,
}

fn format_minutes(minutes: f64) -> String {
    let hours = minutes / MINUTES_PER_HOUR;
    if hours >= 24.0 && hours % 24.0 == 0.0 {
        format!("{}d", hours / 24.0)
    } else if hours >= 1.0 {
        format!("{:.1}h", hours)
    } else {
        format!("{}m", minutes)
    }
}

/// Show the default sub-category policy
pub fn show_policy(format: OutputFormat) -> Result<()> {
    let policy = DurationPolicy::default();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&policy)?);
        }
        OutputFormat::Table => {
            let rows: Vec<SubCategoryRow> = policy
                .iter()
                .map(|sub| SubCategoryRow {
                    label: sub.label.clone(),
                    duration: format!("{}d", sub.duration_days),
                    lower_bound: format_minutes(sub.lower_bound_minutes),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
