use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use jobscope::cleanup::retention_threshold;
use jobscope::{RunningSet, SweepReport};

use super::parse_ids;

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Minimum age in seconds (defaults to the configured retention)
    #[arg(long, value_name = "SECS")]
    pub older_than: Option<u64>,

    /// Treat this execution as running; may be repeated
    #[arg(long = "running", value_name = "ID")]
    pub running: Vec<String>,

    /// Keep sweeping periodically until interrupted
    #[arg(long)]
    pub watch: bool,

    /// Seconds between sweeps with --watch (defaults to the configured interval)
    #[arg(long, value_name = "SECS", requires = "watch")]
    pub interval: Option<u64>,
}

pub async fn execute(args: SweepArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let (running, errors) = parse_ids(&args.running);
    if !errors.is_empty() {
        anyhow::bail!("Invalid --running id(s):\n  {}", errors.join("\n  "));
    }
    let tracker = RunningSet::new(running);

    let manager = global.create_manager_with(|options| {
        if let Some(secs) = args.older_than {
            options.retention_secs = secs;
        }
        if let Some(secs) = args.interval {
            options.sweep_interval_secs = secs;
        }
    })?;

    if args.watch {
        let sweeper = manager.spawn_sweeper(Arc::new(tracker));
        eprintln!(
            "Sweeping every {}s (retention {}s), press Ctrl-C to stop",
            manager.options().sweep_interval_secs,
            manager.options().retention_secs
        );
        tokio::signal::ctrl_c().await?;
        sweeper.stop().await;
        return Ok(());
    }

    let older_than = retention_threshold(Duration::from_secs(manager.options().retention_secs));
    let report = manager.sweep(older_than, &tracker);
    print_report(&report);

    if report.deletion_failures > 0 {
        anyhow::bail!("{} deletion(s) failed", report.deletion_failures);
    }
    Ok(())
}

fn print_report(report: &SweepReport) {
    println!(
        "Scanned {} execution(s), skipped {} protected",
        report.roots_scanned, report.roots_skipped
    );
    println!(
        "Removed {} artifact(s), {} execution(s) fully cleaned",
        report.artifacts_removed, report.fully_cleaned_roots
    );
}
