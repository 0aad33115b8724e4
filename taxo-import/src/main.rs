//! taxo-import - taxonomy term importer
//!
//! Imports CSV or XML category trees into the SQLite term store, declares
//! custom fields on vocabularies, and lists past import runs.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taxo_common::config::{load_toml_config, resolve_database_path, resolve_root_folder};
use taxo_common::db::{init_database, FieldKind};
use taxo_common::events::EventBus;
use taxo_import::config::resolve_import_config;
use taxo_import::db::runs::{list_runs, save_run};
use taxo_import::decoder::{decode_file, SourceFormat};
use taxo_import::throttle::{throttle_for, NoPause, Throttle};
use taxo_import::utils::write_event_lines;
use taxo_import::{ImportOptions, Importer, SqliteTermRepository, TermRepository};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for taxo-import
#[derive(Parser, Debug)]
#[command(name = "taxo-import")]
#[command(about = "Import two-level taxonomies from CSV or XML into the term store")]
#[command(version)]
struct Cli {
    /// Root folder holding taxo.db
    #[arg(long, env = "TAXO_ROOT_FOLDER", global = true)]
    root_folder: Option<PathBuf>,

    /// Database file (overrides <root-folder>/taxo.db)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import terms from a file
    Import {
        /// Vocabulary display name (created if missing)
        #[arg(short, long)]
        vocabulary: String,

        /// CSV or XML source file
        #[arg(short, long)]
        file: PathBuf,

        /// Source format; defaults to the file extension
        #[arg(long)]
        format: Option<String>,

        /// Always create new terms instead of updating matches
        #[arg(long)]
        force_new: bool,

        /// Disable throttling pauses
        #[arg(long)]
        no_throttle: bool,

        /// Stream import events as JSON lines on stdout
        #[arg(long)]
        events: bool,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Declare a custom field on a vocabulary
    DeclareField {
        #[arg(short, long)]
        vocabulary: String,

        /// Field name, e.g. field_population
        #[arg(long)]
        field: String,

        /// text, number or geolocation
        #[arg(long, default_value = "text")]
        kind: String,
    },
    /// List recent import runs
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = load_toml_config(cli.config.as_deref())?;

    // Initialize tracing; RUST_LOG wins over the TOML level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting taxo-import v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = resolve_root_folder(cli.root_folder.as_deref(), &toml_config);
    let db_path = resolve_database_path(cli.database.as_deref(), &root_folder, &toml_config);
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let repo = SqliteTermRepository::new(pool.clone());

    match cli.command {
        Command::Import {
            vocabulary,
            file,
            format,
            force_new,
            no_throttle,
            events,
            json,
        } => {
            let format = format.as_deref().map(str::parse::<SourceFormat>).transpose()?;
            let decoded = decode_file(&file, format)
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let vocab = repo.get_or_create_vocabulary(&vocabulary).await?;
            let import_config = resolve_import_config(&pool, &toml_config.import).await?;

            let event_bus = EventBus::new(import_config.event_capacity);
            let printer = events
                .then(|| tokio::spawn(write_event_lines(event_bus.subscribe(), std::io::stdout())));

            let cancel = CancellationToken::new();
            let ctrl_c_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current row");
                    ctrl_c_token.cancel();
                }
            });

            let throttle: Box<dyn Throttle> = if no_throttle {
                Box::new(NoPause)
            } else {
                throttle_for(&import_config)
            };

            let importer = Importer::new(&repo, ImportOptions::from_config(&import_config))
                .with_throttle(throttle)
                .with_events(event_bus)
                .with_cancellation(cancel);

            let started_at = Utc::now();
            let result = importer
                .import_rows(vocab.id, &decoded.rows, force_new)
                .await;

            // Dropping the importer closes the bus so the printer drains and exits
            drop(importer);
            if let Some(printer) = printer {
                match printer.await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => warn!("Event stream failed: {}", e),
                    Err(e) => warn!("Event stream task failed: {}", e),
                }
            }
            let report = result?;
            save_run(
                &pool,
                &file.display().to_string(),
                &report,
                started_at,
                Some(Utc::now()),
            )
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Vocabulary '{}' ({}): processed {}, created {}, updated {}, unchanged {}, skipped {}, failed {}",
                    vocab.name,
                    vocab.machine_name,
                    report.processed,
                    report.created,
                    report.updated,
                    report.unchanged,
                    report.skipped,
                    report.failed
                );
                for warning in &report.warnings {
                    println!("  warning: {}", warning);
                }
                for error in &report.errors {
                    println!("  error: {}", error);
                }
                if report.cancelled {
                    println!("  run was cancelled before all rows were processed");
                }
            }
        }
        Command::DeclareField {
            vocabulary,
            field,
            kind,
        } => {
            let kind: FieldKind = kind.parse()?;
            let vocab = repo.get_or_create_vocabulary(&vocabulary).await?;
            repo.declare_field(vocab.id, &field, kind).await?;
            println!("Declared {} field '{}' on '{}'", kind, field, vocab.machine_name);
        }
        Command::Runs { limit } => {
            for run in list_runs(&pool, limit).await? {
                println!(
                    "{}  {}  vocabulary {}  processed {}  created {}  updated {}  failed {}{}",
                    run.started_at.format("%Y-%m-%d %H:%M:%S"),
                    run.run_id,
                    run.vocabulary_id,
                    run.report.processed,
                    run.report.created,
                    run.report.updated,
                    run.report.failed,
                    if run.report.cancelled { "  (cancelled)" } else { "" }
                );
            }
        }
    }

    Ok(())
}
