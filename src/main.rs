use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use daily_indicators::services::{
    duration_until_next_run, BatchOrchestrator, IncrementalUpdater, IndicatorEngine,
    IndicatorStore, SignalService, SqliteStore,
};
use daily_indicators::types::IngestRecord;
use daily_indicators::Config;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Daily technical indicator pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Update every active instrument for one trade date
    Update {
        /// Trade date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Update a single instrument instead of the whole universe
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Recompute a date range for one instrument
    Backfill {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Print the latest signals for an instrument
    Signals {
        #[arg(long)]
        symbol: String,
    },
    /// Load bars from a JSON array of ingest records
    Ingest {
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete update logs past the retention window
    Cleanup,
    /// Run the daily update every weekday at the configured time
    Daemon,
}

/// Everything a command needs, wired once per process.
struct App {
    config: Config,
    sqlite: Arc<SqliteStore>,
    store: Arc<dyn IndicatorStore>,
    engine: Arc<IndicatorEngine>,
    orchestrator: BatchOrchestrator,
}

impl App {
    fn new(config: Config) -> anyhow::Result<Self> {
        let sqlite = Arc::new(
            SqliteStore::new(&config.database_path)
                .with_context(|| format!("opening {}", config.database_path))?,
        );
        let store: Arc<dyn IndicatorStore> = sqlite.clone();
        let engine = Arc::new(IndicatorEngine::default());
        let updater = Arc::new(IncrementalUpdater::new(
            Arc::clone(&store),
            Arc::clone(&engine),
            config.updater.clone(),
        ));
        let orchestrator = BatchOrchestrator::new(updater, config.batch.clone());

        Ok(Self {
            config,
            sqlite,
            store,
            engine,
            orchestrator,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daily_indicators=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let app = App::new(Config::from_env())?;

    match cli.command {
        Command::Update { date, symbol } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            match symbol {
                Some(symbol) => {
                    let outcome = app.orchestrator.update_symbol(&symbol, date).await?;
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
                None => {
                    let report = app.orchestrator.run_daily_update(date).await;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    if !report.success {
                        anyhow::bail!(
                            "daily update failed: {}",
                            report.error.unwrap_or_default()
                        );
                    }
                }
            }
        }
        Command::Backfill { symbol, from, to } => {
            let instrument = app
                .store
                .find_instrument(&symbol)?
                .with_context(|| format!("unknown symbol {}", symbol))?;
            let summary = app
                .orchestrator
                .updater()
                .backfill(instrument.id, from, to)
                .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Signals { symbol } => {
            let instrument = app
                .store
                .find_instrument(&symbol)?
                .with_context(|| format!("unknown symbol {}", symbol))?;
            let service = SignalService::new(
                Arc::clone(&app.store),
                Arc::clone(&app.engine),
                app.config.cache_ttl,
            );
            let signals = service.latest_signals(instrument.id).await?;
            println!("{}", serde_json::to_string_pretty(&signals)?);
        }
        Command::Ingest { file } => ingest(&app, &file)?,
        Command::Cleanup => {
            let removed = app
                .orchestrator
                .cleanup_old_logs(Local::now().date_naive(), app.config.retention.update_log_days)
                .await?;
            println!("removed {} update logs", removed);
        }
        Command::Daemon => run_daemon(&app).await,
    }

    Ok(())
}

fn ingest(app: &App, file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let records: Vec<IngestRecord> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;

    let mut by_symbol: BTreeMap<String, (Option<String>, Vec<_>)> = BTreeMap::new();
    for record in records {
        let entry = by_symbol.entry(record.symbol).or_default();
        if entry.0.is_none() {
            entry.0 = record.name;
        }
        entry.1.push(record.bar);
    }

    for (symbol, (name, bars)) in by_symbol {
        let instrument = app.sqlite.get_or_create_instrument(&symbol, name.as_deref())?;
        let stored = app.sqlite.insert_bars(instrument.id, &bars)?;
        info!("Ingested {} bars for {}", stored, instrument.symbol);
    }
    Ok(())
}

async fn run_daemon(app: &App) {
    let cancel = app.orchestrator.cancel_handle();
    info!(
        "Daemon started; daily update runs on weekdays at {}",
        app.config.update_time
    );

    loop {
        let wait = duration_until_next_run(Local::now().naive_local(), app.config.update_time);
        info!(
            "Next daily update in {} hours {} minutes",
            wait.as_secs() / 3600,
            (wait.as_secs() % 3600) / 60
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                return;
            }
        }

        let date = Local::now().date_naive();
        let run = app.orchestrator.run_daily_update(date);
        tokio::pin!(run);
        let report = tokio::select! {
            report = &mut run => report,
            _ = tokio::signal::ctrl_c() => {
                warn!("Shutdown requested; finishing in-flight updates");
                cancel.cancel();
                let report = run.await;
                info!("Run {} stopped after {} instruments", report.run_id, report.processed);
                return;
            }
        };

        if !report.success {
            error!(
                "Daily update for {} failed: {}",
                date,
                report.error.unwrap_or_default()
            );
        }

        if let Err(e) = app
            .orchestrator
            .cleanup_old_logs(date, app.config.retention.update_log_days)
            .await
        {
            warn!("Update log cleanup failed: {}", e);
        }
    }
}
