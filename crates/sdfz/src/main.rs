use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sdfz::cache::{
    system_probe, CacheConfig, CacheError, CacheEvent, ConfigError, IngestError, Ingestor, NoMaps,
    ReplayCache, ReplayStore, StoreError, WorkQueue,
};
use sdfz::command::UnitDefTable;
use sdfz::demo::{parse_file, DemoError, GameId, ParseOptions, ReplayRecord};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Spring engine demo reader and replay cache.
#[derive(Parser)]
#[command(name = "sdfz", version, about = "Spring engine demo reader and replay cache")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one demo and print it as JSON
    Inspect {
        /// Path to the demo file
        file: PathBuf,
        /// Decode and print every unit command
        #[arg(long)]
        commands: bool,
        /// JSON array of unit definition names in engine order, for build commands
        #[arg(long)]
        unit_defs: Option<PathBuf>,
        /// Leave the chat log out
        #[arg(long)]
        no_chat: bool,
    },

    /// Run one ingestion pass over the demo directory and print the counts
    Scan {
        #[command(flatten)]
        cache: CacheArgs,
    },

    /// Run the cache, printing events, until stdin closes
    Watch {
        #[command(flatten)]
        cache: CacheArgs,
    },

    /// List cached replays
    List {
        #[command(flatten)]
        db: DbArgs,
        /// Only captures of this match (32 hex digits)
        #[arg(long)]
        game_id: Option<GameId>,
        /// Print full records instead of one summary line per replay
        #[arg(long)]
        full: bool,
    },

    /// Forget every tombstoned file so it is parsed again
    ClearErrors {
        #[command(flatten)]
        db: DbArgs,
    },
}

#[derive(Args)]
struct DbArgs {
    /// SQLite database file
    #[arg(long, default_value = "replays.sqlite3")]
    db: PathBuf,
}

#[derive(Args)]
struct CacheArgs {
    /// Directory holding the demo files
    #[arg(long)]
    demo_dir: PathBuf,
    #[command(flatten)]
    db: DbArgs,
    /// Do not watch the demo directory for changes
    #[arg(long)]
    no_watch: bool,
    /// Worker idle wait in milliseconds
    #[arg(long, default_value_t = 500)]
    idle_ms: u64,
    /// Keep the files of superseded duplicate captures
    #[arg(long)]
    keep_superseded: bool,
    /// Keep cached rows whose file is gone
    #[arg(long)]
    no_prune: bool,
}

impl CacheArgs {
    fn config(&self) -> CacheConfig {
        CacheConfig {
            watch: !self.no_watch,
            idle_interval: Duration::from_millis(self.idle_ms),
            delete_superseded_files: !self.keep_superseded,
            prune_missing: !self.no_prune,
            ..CacheConfig::new(&self.demo_dir, &self.db.db)
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Demo(#[from] DemoError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Inspect {
            file,
            commands,
            unit_defs,
            no_chat,
        } => inspect(file, commands, unit_defs, no_chat),
        Commands::Scan { cache } => scan(cache.config()),
        Commands::Watch { cache } => watch(cache.config()),
        Commands::List { db, game_id, full } => list(&db.db, game_id, full),
        Commands::ClearErrors { db } => {
            let cleared = ReplayStore::open(&db.db)?.clear_errors()?;
            println!("{cleared}");
            Ok(())
        }
    }
}

fn inspect(
    file: PathBuf,
    commands: bool,
    unit_defs: Option<PathBuf>,
    no_chat: bool,
) -> Result<(), CliError> {
    let unit_defs = match unit_defs {
        Some(path) => {
            let text = fs::read_to_string(&path).map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })?;
            let names: Vec<String> = serde_json::from_str(&text)?;
            UnitDefTable::from_names(names)
        }
        None => UnitDefTable::new(),
    };
    let options = ParseOptions {
        unit_defs,
        decode_commands: commands,
        chatlog: !no_chat,
    };
    let demo = parse_file(&file, &options)?;
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &demo)?;
    writeln!(out)?;
    Ok(())
}

fn scan(config: CacheConfig) -> Result<(), CliError> {
    config.validate()?;
    let store = ReplayStore::open(&config.database_path)?;
    let (events, _) = crossbeam_channel::unbounded();
    let prune = config.prune_missing;
    let mut ingestor = Ingestor::new(store, config, system_probe(), Arc::new(NoMaps), events);

    let pruned = if prune { ingestor.prune_missing()? } else { 0 };
    let queue = WorkQueue::new();
    ingestor.scan(&queue)?;
    let summary = ingestor.run_pass(&queue)?;
    info!(
        cached = summary.cached,
        errored = summary.errored,
        deferred = summary.deferred,
        superseded = summary.superseded,
        pruned,
        "scan finished"
    );

    let out = serde_json::json!({
        "cached": summary.cached,
        "errored": summary.errored,
        "deferred": summary.deferred,
        "superseded": summary.superseded,
        "pruned": pruned,
        "total": ingestor.store().count()?,
        "tombstoned": ingestor.store().error_count()?,
    });
    println!("{out}");
    Ok(())
}

fn watch(config: CacheConfig) -> Result<(), CliError> {
    let store = ReplayStore::open(&config.database_path)?;
    let cache = ReplayCache::start(config, store)?;

    let events = cache.events().clone();
    let printer = thread::spawn(move || {
        // Ends when the worker drops its sender on shutdown.
        for event in events {
            let line = match &event {
                CacheEvent::CachingStarted(name) => {
                    serde_json::json!({ "event": "caching_started", "file_name": name })
                }
                CacheEvent::Cached(record) => serde_json::json!({
                    "event": "cached",
                    "file_name": record.file_name,
                    "game_id": record.game_id,
                    "duration_ms": record.duration_ms,
                }),
                CacheEvent::Deleted(name) => {
                    serde_json::json!({ "event": "deleted", "file_name": name })
                }
                CacheEvent::Errored(name) => {
                    serde_json::json!({ "event": "errored", "file_name": name })
                }
            };
            println!("{line}");
        }
    });

    info!("watching; close stdin to stop");
    io::copy(&mut io::stdin().lock(), &mut io::sink())?;

    let store = cache.shutdown()?;
    // A panicked printer only loses output.
    let _ = printer.join();
    info!(cached = store.count()?, "cache stopped");
    Ok(())
}

fn summary(record: &ReplayRecord) -> serde_json::Value {
    serde_json::json!({
        "file_name": record.file_name,
        "game_id": record.game_id,
        "start_time": record.start_time,
        "duration_ms": record.duration_ms,
        "ended_normally": record.ended_normally,
        "map": record.map_spring_name,
        "game_version": record.game_version,
        "engine_version": record.engine_version,
    })
}

fn list(db: &Path, game_id: Option<GameId>, full: bool) -> Result<(), CliError> {
    let store = ReplayStore::open(db)?;
    let records = match game_id {
        Some(id) => store.get_by_game_id(&id)?,
        None => store.all()?,
    };
    let mut out = io::stdout().lock();
    for record in &records {
        if full {
            serde_json::to_writer(&mut out, record)?;
        } else {
            serde_json::to_writer(&mut out, &summary(record))?;
        }
        writeln!(out)?;
    }
    Ok(())
}
