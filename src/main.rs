use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use iland_api::api::{ConsoleApi, EventApi, TrackOptions};
use iland_api::Client;
use iland_console::events::{relay_events, track_and_announce};
use iland_console::{ConsoleConfig, ConsoleEvent, EventBroadcaster, LogConfig, logging};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "iland-console", version, about = "iland cloud console client")]
struct Cli {
    /// Config file (defaults to ~/.iland/console.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print live events as JSON lines until interrupted
    Events {
        /// Only receive events for this company
        #[arg(long)]
        company: Option<String>,
    },
    /// Wait for a task to settle and print its final state
    Task {
        id: String,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 3600)]
        timeout: u64,
    },
    /// GET an API path and print the response body
    Get { path: String },
    /// List companies of the logged-in user
    Companies,
    /// List known datacenter locations
    Locations,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConsoleConfig::load(cli.config.as_deref())?;
    let _log_guard = logging::init_logging(LogConfig::from_console_config(&config))?;

    tracing::info!(target: "main", version = env!("CARGO_PKG_VERSION"), "Starting iland-console");

    let client = Client::new(config.credentials()?, config.client_config())
        .context("Failed to create API client")?;

    let result = match cli.command {
        Command::Events { company } => stream_events(&client, company.as_deref()).await,
        Command::Task { id, timeout } => track_task(&client, &id, timeout).await,
        Command::Get { path } => {
            let body = client
                .get(&path)
                .await
                .with_context(|| format!("GET {path} failed"))?;
            println!("{}", body.text());
            Ok(())
        }
        Command::Companies => {
            let companies = client.get_companies().await.context("Failed to list companies")?;
            print_json(&companies)
        }
        Command::Locations => print_json(&client.get_locations()),
    };

    if let Err(e) = &result {
        tracing::error!(target: "main", error = %e, "Command failed");
    }
    result
}

async fn stream_events(client: &Client, company: Option<&str>) -> Result<()> {
    let stream = client.stream_events(company);

    let broadcaster = EventBroadcaster::default();
    let mut receiver = broadcaster.subscribe();
    let cancel = CancellationToken::new();

    let relay = tokio::spawn(relay_events(stream, broadcaster.clone(), cancel.clone()));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "main", "Interrupted, closing event stream");
        }
        shutdown.cancel();
    });

    loop {
        match receiver.recv().await {
            Ok(ConsoleEvent::StreamClosed) | Err(RecvError::Closed) => break,
            Ok(event) => print_json(&event)?,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(target: "main", skipped, "Output fell behind, events skipped");
            }
        }
    }

    let relayed = relay.await.context("Event relay task panicked")?;
    tracing::info!(target: "main", relayed, "Event stream closed");
    Ok(())
}

async fn track_task(client: &Client, task_id: &str, timeout_secs: u64) -> Result<()> {
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let options = TrackOptions::default()
        .with_interval(client.config().poll_interval)
        .with_deadline(Duration::from_secs(timeout_secs))
        .with_cancel(cancel);

    let broadcaster = EventBroadcaster::default();
    let task = track_and_announce(client, task_id, options, &broadcaster).await?;
    print_json(&task)?;

    if !task.succeeded() {
        bail!(
            "task {} finished with status {}: {}",
            task.id,
            task.status.as_str(),
            task.message
        );
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let line = serde_json::to_string(value).context("Failed to serialize output")?;
    println!("{line}");
    Ok(())
}
