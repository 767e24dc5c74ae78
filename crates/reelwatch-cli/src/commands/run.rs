//! Run command

use anyhow::{anyhow, Context};
use clap::Args;
use reelwatch_core::logging_facility::{init, Profile};
use reelwatch_engine::{AppConfig, Pipeline};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Load REELWATCH_* variables from this file first (default: ./.env if present)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Log output: pretty or json
    #[arg(long, default_value = "pretty")]
    pub log_format: String,
}

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let profile = Profile::parse(&args.log_format)
        .ok_or_else(|| anyhow!("unknown log format '{}' (expected pretty or json)", args.log_format))?;

    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("failed to load ./.env"),
        },
    }

    init(profile);

    let config = AppConfig::from_env().context("invalid configuration")?;
    let pipeline = Pipeline::from_config(&config)?;
    let report = pipeline.run().await?;

    print!("{}", report.render_summary());
    Ok(())
}
