use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use next_steps::api::{HttpJobsApi, JobsApi};
use next_steps::board::{DateWindow, JobFilter};
use next_steps::config;
use next_steps::handlers;

#[derive(Parser, Debug)]
#[command(about = "Fetch all jobs once and print the board")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Only show jobs matching this text
    #[arg(long)]
    search: Option<String>,

    /// Only show jobs applied to within this many days
    #[arg(long)]
    days: Option<u32>,

    /// Print the raw job list as JSON instead of the board
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let api = HttpJobsApi::from_config(&cfg)?;

    let jobs = api.list_jobs().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    let filter = JobFilter {
        query: args.search.unwrap_or_default(),
        window: args.days.map_or(DateWindow::Any, DateWindow::LastDays),
    };
    print!("{}", handlers::render_board(&jobs, &filter));
    Ok(())
}
