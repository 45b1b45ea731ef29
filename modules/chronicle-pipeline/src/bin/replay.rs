//! Replay a recorded fixture through the full pipeline and print the
//! generation output as JSON.
//!
//! Usage: chronicle-replay modules/chronicle-pipeline/fixtures/second_punic_war.json

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use chronicle_common::{telemetry, Config};
use chronicle_pipeline::replay::ReplayFixture;
use chronicle_pipeline::{Orchestrator, PipelineDeps};

#[derive(Parser)]
#[command(name = "chronicle-replay", about = "Replay recorded model responses through the generation pipeline")]
struct Cli {
    /// Path to a replay fixture (seed plus per-stage responses)
    fixture: PathBuf,

    /// Print only the run report
    #[arg(long)]
    report_only: bool,

    /// Skip the courtesy delay between model calls
    #[arg(long)]
    no_delay: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    telemetry::init_tracing("chronicle=info", config.log_json)?;
    config.log_redacted();
    if cli.no_delay {
        config.call_delay = std::time::Duration::ZERO;
    }

    let fixture = ReplayFixture::load(&cli.fixture).await?;
    info!(
        fixture = %cli.fixture.display(),
        title = fixture.seed.title.as_str(),
        "Replaying fixture"
    );

    let deps = PipelineDeps::builder()
        .submitter(Arc::new(fixture.submitter()))
        .config(config)
        .build();
    let output = Orchestrator::new(deps)
        .run(fixture.seed)
        .await
        .context("Replay run failed")?;

    let json = if cli.report_only {
        serde_json::to_string_pretty(&output.report)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{json}");
    Ok(())
}
