//! Command-line runner for the deferred command queue.
//!
//! Run with: cargo run -p queue-runner -- --help
//!
//! Settings come from `pbx-remote.json` (or `--config`) and `PBX_REMOTE_*`
//! environment variables.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pbx_remote_client::Session;
use pbx_remote_core::{Arguments, PbxConfig, TracingDebugListener};
use pbx_remote_queue::{QueueEngine, storage::SqliteStorage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "queue-runner", about = "Queue and run PBX manager commands")]
struct Cli {
    /// Configuration file.
    #[arg(long, default_value = "pbx-remote.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Queue a command for later execution.
    Enqueue {
        /// Command or action name, e.g. `QueueStatus`.
        name: String,
        /// Positional arguments as `key=value`.
        args: Vec<String>,
    },
    /// Log in and execute every pending command.
    Drain,
    /// Print the stored response of a queued command.
    Response { id: i64 },
    /// Send one action right away and print its events.
    Call {
        action: String,
        /// Parameters as `Key=value`.
        params: Vec<String>,
    },
    /// List queueable commands and their parameters.
    Commands,
}

fn parse_pairs(pairs: &[String]) -> Result<Arguments> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("expected key=value, got '{pair}'"))?;
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

async fn open_engine(config: &PbxConfig) -> Result<QueueEngine> {
    let storage = SqliteStorage::new(&config.database_url)
        .await
        .with_context(|| format!("opening queue database {}", config.database_url))?;
    Ok(QueueEngine::with_storage(Arc::new(storage)).configured(config))
}

fn open_session(config: &PbxConfig) -> Result<Session> {
    let session = Session::from_config(config).context("creating manager session")?;
    session.add_debug_listener("tracing", Arc::new(TracingDebugListener));
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = PbxConfig::load(&cli.config).context("loading configuration")?;

    match cli.command {
        Command::Enqueue { name, args } => {
            let engine = open_engine(&config).await?;
            let id = engine.enqueue(&name, parse_pairs(&args)?).await?;
            println!("{id}");
        }
        Command::Drain => {
            let engine = open_engine(&config).await?;
            let session = open_session(&config)?;
            if !session.login().await? {
                bail!(
                    "login failed: {}",
                    session.last_error().unwrap_or_default()
                );
            }
            let summary = engine.drain(&session).await?;
            tracing::info!(
                executed = summary.executed,
                failed = summary.failed,
                skipped = summary.skipped,
                "Queue drained"
            );
            session.logoff().await?;
        }
        Command::Response { id } => {
            let engine = open_engine(&config).await?;
            match engine.retrieve_response(id).await? {
                Some(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                None => bail!("no response stored for item {id}"),
            }
        }
        Command::Call { action, params } => {
            let session = open_session(&config)?;
            if !action.eq_ignore_ascii_case("login") && !session.login().await? {
                bail!(
                    "login failed: {}",
                    session.last_error().unwrap_or_default()
                );
            }
            let response = session.invoke(&action, &parse_pairs(&params)?).await?;
            println!("{}", serde_json::to_string_pretty(&response.records)?);
            if !response.success {
                bail!(
                    "{action} failed: {}",
                    session.last_error().unwrap_or_default()
                );
            }
        }
        Command::Commands => {
            for spec in QueueEngine::new().registry().iter() {
                let params: Vec<String> = spec
                    .params
                    .iter()
                    .map(|(name, rule)| {
                        if rule.required {
                            (*name).to_string()
                        } else {
                            format!("[{name}]")
                        }
                    })
                    .collect();
                println!("{:<22} {:<20} {}", spec.name, spec.action, params.join(" "));
            }
        }
    }

    Ok(())
}
