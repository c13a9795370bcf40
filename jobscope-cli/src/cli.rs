use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use jobscope::{ManagerOptions, ResourceManager};

use crate::commands::{ls::LsArgs, purge::PurgeArgs, sweep::SweepArgs};

#[derive(Parser, Debug)]
#[command(name = "jobscope", version, about = "Inspect and clean a jobscope artifact store")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List executions present in the store
    Ls(LsArgs),
    /// Delete every artifact of the given executions
    Purge(PurgeArgs),
    /// Remove expired artifacts of executions that are no longer running
    Sweep(SweepArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// Store home directory
    #[arg(long, global = true, env = "JOBSCOPE_HOME")]
    pub home: Option<PathBuf>,

    /// JSON options file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalFlags {
    /// Options from `--config`, with `--home` taking precedence.
    pub fn options(&self) -> anyhow::Result<ManagerOptions> {
        let mut options = match &self.config {
            Some(path) => ManagerOptions::from_file(path)?,
            None => ManagerOptions::default(),
        };
        if let Some(home) = &self.home {
            options.home_dir = std::path::absolute(home)?;
        }
        // Logs go to stderr.
        options.file_logging = false;
        Ok(options)
    }

    pub fn create_manager(&self) -> anyhow::Result<ResourceManager> {
        self.create_manager_with(|_| {})
    }

    pub fn create_manager_with(
        &self,
        configure: impl FnOnce(&mut ManagerOptions),
    ) -> anyhow::Result<ResourceManager> {
        let mut options = self.options()?;
        configure(&mut options);
        Ok(ResourceManager::new(options)?)
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
