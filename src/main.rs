//! Tafsir-Ripple main entry point
//!
//! This is the command-line interface for the crawl, import and stats stages.

use anyhow::{ensure, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tafsir_ripple::config::{load_config_or_default, Config};
use tafsir_ripple::crawler::{run_crawl, CrawlOptions};
use tafsir_ripple::importer::{find_documents, ImportRun, Loader};
use tafsir_ripple::language::LanguageTag;
use tafsir_ripple::output::{
    load_statistics, print_crawl_report, print_import_summary, print_statistics,
};
use tafsir_ripple::state::{ImportProgress, JsonFileStore};
use tafsir_ripple::storage::SqliteStorage;
use tafsir_ripple::verse::CHAPTER_COUNT;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Tafsir-Ripple: a resumable tafsir crawler and loader
///
/// Crawls commentary editions verse by verse under a global concurrency cap,
/// writes one JSON document per edition, and loads those documents into a
/// SQLite store.
#[derive(Parser, Debug)]
#[command(name = "tafsir-ripple")]
#[command(version)]
#[command(about = "A resumable tafsir crawler and loader", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl editions and write one document per edition
    Crawl {
        /// Directory edition documents are written to
        #[arg(long, value_name = "DIR")]
        output_dir: Option<String>,

        /// Maximum number of fetches in flight
        #[arg(long, value_name = "N")]
        max_concurrent: Option<u32>,

        /// Delay before every request, in seconds
        #[arg(long, value_name = "SECS")]
        delay: Option<f64>,

        /// Only crawl these edition ids
        #[arg(long, value_name = "ID", num_args = 1.., value_delimiter = ',')]
        edition_ids: Vec<i64>,

        /// Only crawl editions in these languages
        #[arg(long, value_name = "LANG", num_args = 1.., value_delimiter = ',')]
        languages: Vec<String>,

        /// Origin to discover editions on
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,

        #[arg(long, value_name = "N", default_value_t = 1)]
        start_chapter: u16,

        #[arg(long, value_name = "N", default_value_t = CHAPTER_COUNT)]
        end_chapter: u16,

        /// Re-crawl editions a previous run completed
        #[arg(long)]
        force: bool,
    },

    /// Import edition documents into the database
    Import {
        /// A document or a directory of `tafsir_*.json` documents
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// SQLite database file
        #[arg(long, value_name = "FILE")]
        database: Option<String>,

        /// Verse rows per transaction
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,

        /// Re-import processed files and existing editions
        #[arg(long)]
        force: bool,

        /// Keep the progress ledger after a clean run
        #[arg(long)]
        no_cleanup: bool,
    },

    /// Show statistics from the database and exit
    Stats {
        /// SQLite database file
        #[arg(long, value_name = "FILE")]
        database: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, hash) =
        load_config_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    match (&cli.config, hash) {
        (Some(path), Some(hash)) => {
            tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash)
        }
        _ => tracing::debug!("No configuration file given, using defaults"),
    }

    let token = CancellationToken::new();
    spawn_interrupt_handler(token.clone());

    match cli.command {
        Command::Crawl {
            output_dir,
            max_concurrent,
            delay,
            edition_ids,
            languages,
            base_url,
            start_chapter,
            end_chapter,
            force,
        } => {
            config
                .apply_crawl_overrides(
                    output_dir.as_deref(),
                    max_concurrent,
                    delay,
                    base_url.as_deref(),
                )
                .context("Invalid crawl options")?;

            let options = CrawlOptions {
                edition_ids,
                languages: languages.iter().map(|l| LanguageTag::parse(l)).collect(),
                start_chapter,
                end_chapter,
                force,
            };
            handle_crawl(config, options, token).await
        }
        Command::Import {
            input,
            database,
            batch_size,
            force,
            no_cleanup,
        } => {
            config
                .apply_import_overrides(database.as_deref(), batch_size, no_cleanup)
                .context("Invalid import options")?;
            handle_import(config, input, force, token).await
        }
        Command::Stats { database } => {
            config.apply_database_override(database.as_deref());
            handle_stats(&config)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tafsir_ripple=info,warn"),
            1 => EnvFilter::new("tafsir_ripple=debug,info"),
            2 => EnvFilter::new("tafsir_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels `token` on the first Ctrl-C
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current step and saving progress");
            token.cancel();
        }
    });
}

/// Handles the crawl subcommand
///
/// Any run that gets past discovery exits successfully, partial or not.
async fn handle_crawl(
    config: Config,
    options: CrawlOptions,
    token: CancellationToken,
) -> anyhow::Result<()> {
    ensure!(
        options.start_chapter >= 1
            && options.start_chapter <= options.end_chapter
            && options.end_chapter <= CHAPTER_COUNT,
        "Chapter range {}..={} is outside 1..={}",
        options.start_chapter,
        options.end_chapter,
        CHAPTER_COUNT
    );

    tracing::info!(
        "Crawling chapters {}..={} with {} concurrent fetches and {:.1}s delay",
        options.start_chapter,
        options.end_chapter,
        config.crawler.max_concurrent,
        config.crawler.delay_secs
    );

    let report = run_crawl(config, &options, token).await.context("Crawl failed")?;
    print_crawl_report(&report);

    if report.interrupted {
        tracing::info!("Crawl interrupted; rerun to resume from the last checkpoint");
    }

    Ok(())
}

/// Handles the import subcommand
///
/// The loader is synchronous, so the whole run goes to the blocking pool.
async fn handle_import(
    config: Config,
    input: PathBuf,
    force: bool,
    token: CancellationToken,
) -> anyhow::Result<()> {
    let documents = find_documents(&input)
        .with_context(|| format!("Nothing to import from {}", input.display()))?;

    let summary = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let mut storage = SqliteStorage::new(Path::new(&config.import.database_path))
            .with_context(|| format!("Cannot open database {}", config.import.database_path))?;
        let ledger = JsonFileStore::<ImportProgress>::new(&config.import.progress_path);
        let loader = Loader::from_config(&mut storage, &config);

        let summary = ImportRun::new(loader, &ledger)
            .run(&documents, force, config.import.cleanup, &token)
            .context("Import aborted")?;
        Ok(summary)
    })
    .await
    .context("Import task panicked")??;

    print_import_summary(&summary);

    if !summary.is_success() {
        tracing::error!(
            "Import finished with {} failed documents{}",
            summary.errors,
            if summary.interrupted { " (interrupted)" } else { "" }
        );
        std::process::exit(1);
    }

    Ok(())
}

/// Handles the stats subcommand
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.import.database_path);
    ensure!(path.exists(), "Database {} does not exist", path.display());

    println!("Database: {}\n", path.display());

    let storage = SqliteStorage::new(path).context("Cannot open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}
