use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use whiff_watcher::config::{parse_date, AppConfig};
use whiff_watcher::data;
use whiff_watcher::monitoring::logger;
use whiff_watcher::output::snapshot;
use whiff_watcher::server::{self, AppState};
use whiff_watcher::watcher::WhiffWatcher;

#[derive(Debug, Parser)]
#[command(name = "whiff-watcher", version, about = "Batter/pitcher strikeout matchup ratings")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Generate ratings once and write the JSON snapshot.
    Generate {
        /// Target date (YYYY-MM-DD). Defaults to the configured date or today.
        #[arg(long)]
        date: Option<String>,
        /// Snapshot path. Defaults to `{static_dir}/{snapshot_file}`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    logger::init_logging(&config.monitoring)?;

    tracing::info!(
        season = config.season.year,
        provider = ?config.provider.kind,
        "Whiff Watcher starting"
    );

    let provider = data::build_provider(&config)?;
    let watcher = Arc::new(WhiffWatcher::new(config.clone(), provider));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config, watcher).await,
        Command::Generate { date, output } => run_generate(&config, &watcher, date, output).await,
    }
}

async fn run_server(config: AppConfig, watcher: Arc<WhiffWatcher>) -> Result<()> {
    if config.server.generate_on_startup {
        let envelope = watcher.generate(None).await;
        match snapshot::write(&config.server.snapshot_path(), &envelope).await {
            Ok(()) => tracing::info!(
                total_ratings = envelope.total_ratings(),
                "Initial whiff watch data generated"
            ),
            Err(e) => tracing::warn!(error = %e, "Could not generate initial data"),
        }
    }

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    server::serve(listener, server::router(AppState::new(watcher))).await
}

async fn run_generate(
    config: &AppConfig,
    watcher: &WhiffWatcher,
    date: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let date = date.as_deref().map(parse_date).transpose()?;
    let path = output.unwrap_or_else(|| config.server.snapshot_path());

    let envelope = watcher.generate(date).await;
    snapshot::write(&path, &envelope).await?;

    let written = snapshot::read(&path).await?;
    if written["error"].as_bool().unwrap_or(false) {
        tracing::warn!(
            path = %path.display(),
            error_type = written["error_type"].as_str().unwrap_or_default(),
            "Wrote error envelope"
        );
    }
    let total = written["data_summary"]["total_whiff_ratings"].as_u64().unwrap_or(0);
    println!("{total} whiff ratings written to {}", path.display());

    Ok(())
}
