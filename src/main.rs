use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use next_steps::api::HttpJobsApi;
use next_steps::board::JobFilter;
use next_steps::config;
use next_steps::coordinator::Intent;
use next_steps::engine::{Engine, Event};
use next_steps::handlers::{self, Command};

#[derive(Debug, Parser)]
#[command(author, version, about = "Track job applications on a status board")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
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
    info!(base_url = %api.base_url(), "using jobs API");

    let engine = Engine::new(Arc::new(api));
    let handle = engine.handle();
    let jobs = engine.subscribe_jobs();
    let toasts = engine.subscribe_notifications();
    let mut notifications = engine.subscribe_notifications();
    let runner = tokio::spawn(engine.run());

    handle.intent(Intent::Reload);

    // Print notifications as they appear.
    let printer = tokio::spawn(async move {
        let mut last_seen = 0;
        while notifications.changed().await.is_ok() {
            let fresh: Vec<_> = notifications
                .borrow_and_update()
                .iter()
                .filter(|n| n.id > last_seen)
                .cloned()
                .collect();
            if let Some(newest) = fresh.last() {
                last_seen = newest.id;
                print!("{}", handlers::render_notifications(&fresh));
            }
        }
    });

    println!("{}", handlers::HELP);
    let mut filter = JobFilter::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match handlers::parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match command {
            Command::Quit => break,
            Command::Help => println!("{}", handlers::HELP),
            Command::Show => {
                let snapshot = jobs.borrow().clone();
                print!("{}", handlers::render_board(&snapshot.jobs, &filter));
            }
            Command::Toasts => {
                let current = toasts.borrow().clone();
                if current.is_empty() {
                    println!("no notifications");
                } else {
                    print!("{}", handlers::render_notifications(&current));
                }
            }
            Command::Undo => {
                let latest = toasts
                    .borrow()
                    .iter()
                    .rev()
                    .find(|n| n.action.is_some())
                    .map(|n| n.id);
                match latest {
                    Some(id) => {
                        handle.invoke_action(id);
                    }
                    None => println!("nothing to undo"),
                }
            }
            Command::Search(query) => filter.query = query,
            Command::Since(window) => filter.window = window,
            Command::Action(id) => {
                handle.invoke_action(id);
            }
            Command::Dismiss(id) => {
                handle.dismiss(id);
            }
            Command::Intent(intent) => {
                handle.intent(intent);
            }
            Command::Gesture(events) => {
                for event in events {
                    handle.send(Event::Drag(event));
                }
            }
        }
    }

    handle.shutdown();
    if let Err(err) = runner.await {
        error!(?err, "engine task failed");
    }
    printer.abort();
    Ok(())
}
