use clap::Args;

use super::parse_ids;

#[derive(Args, Debug)]
pub struct PurgeArgs {
    /// ID of the execution(s) to purge
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,
}

pub async fn execute(args: PurgeArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let (ids, mut errors) = parse_ids(&args.targets);
    let manager = global.create_manager()?;

    let mut success_count = 0;
    for id in ids {
        let report = manager.execution_cancelled(id);
        if report.failed > 0 {
            eprintln!("Error purging execution '{}': {} deletion(s) failed", id, report.failed);
            errors.push(format!("{}: {} deletion(s) failed", id, report.failed));
        } else {
            tracing::info!(execution_id = %id, purged = report.purged, "Purged execution");
            println!("{}", id);
            success_count += 1;
        }
    }

    if !errors.is_empty() {
        let error_summary = if success_count > 0 {
            format!(
                "Failed to purge {} of {} execution(s)",
                errors.len(),
                errors.len() + success_count
            )
        } else {
            format!("Failed to purge all {} execution(s)", errors.len())
        };

        anyhow::bail!("{}\nErrors:\n  {}", error_summary, errors.join("\n  "));
    }
    Ok(())
}
