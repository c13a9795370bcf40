use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use comfy_table::{Table, presets::NOTHING};
use jobscope::ArtifactStore;
use jobscope::store::ExecutionRoot;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct RootSummary {
    execution_id: String,
    last_modified: DateTime<Utc>,
    entries: usize,
}

impl From<&ExecutionRoot> for RootSummary {
    fn from(root: &ExecutionRoot) -> Self {
        Self {
            execution_id: root.execution_id.to_string(),
            last_modified: root.node.newest_modified(),
            // The root directory itself is not an entry.
            entries: root.node.node_count() - 1,
        }
    }
}

pub async fn execute(args: LsArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let manager = global.create_manager()?;
    let roots = manager.store().list_execution_roots()?;
    let summaries: Vec<RootSummary> = roots.iter().map(RootSummary::from).collect();

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        OutputFormat::Table => {
            let now = Utc::now();
            let mut table = Table::new();
            table.load_preset(NOTHING);
            table.set_header(vec!["EXECUTION ID", "LAST MODIFIED", "ENTRIES"]);
            for summary in &summaries {
                table.add_row(vec![
                    summary.execution_id.clone(),
                    format_age(now, summary.last_modified),
                    summary.entries.to_string(),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

/// Human-readable age, e.g. "3 hours ago".
fn format_age(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    let (value, unit) = match secs {
        0..=59 => (secs, "second"),
        60..=3599 => (secs / 60, "minute"),
        3600..=86_399 => (secs / 3600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    if value == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{value} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(now, now), "0 seconds ago");
        assert_eq!(format_age(now, now - Duration::seconds(61)), "1 minute ago");
        assert_eq!(format_age(now, now - Duration::hours(5)), "5 hours ago");
        assert_eq!(format_age(now, now - Duration::days(2)), "2 days ago");
        // Clock skew
        assert_eq!(format_age(now, now + Duration::hours(1)), "0 seconds ago");
    }
}
