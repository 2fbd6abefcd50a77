//! # News Feeds
//!
//! Periodic news ingestion into an append-only CSV. Each run fetches the
//! articles of every configured feed, drops the ones whose normalized link has
//! been seen before, and appends the rest under a fixed header.
//!
//! ## Features
//!
//! - GDELT DOC 2.0 API source (`gdelt`) with a configurable lookback window
//! - Yahoo Finance HTML source (`yahoo`, deprecated) with topic-page fallback
//! - Dedupe by SHA-256 of the normalized link against a SQLite seen-id store
//! - A `validate` command to check the CSV before it is committed
//!
//! ## Usage
//!
//! ```sh
//! news_feeds gdelt --config config.yaml --out-csv data/gdelt_news.csv
//! news_feeds validate --csv data/gdelt_news.csv
//! ```
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success, or some feeds failed without `--strict` |
//! | 1 | fatal: store or CSV unusable, validation failed |
//! | 2 | usage or config error |
//! | 3 | some feeds failed and `--strict` was given |

use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod scrapers;
mod store;
mod utils;

use cli::{Cli, Command, CommonArgs, GdeltArgs, YahooArgs};
use config::{FeedConfig, Source, load_feeds};
use error::ConfigError;
use outputs::appender::CsvAppender;
use outputs::validate::validate_csv;
use pipeline::{Pipeline, RunOptions, RunStatus};
use scrapers::Fetcher;
use scrapers::gdelt::GdeltFetcher;
use scrapers::retry::{RetryFetcher, RetryPolicy};
use scrapers::yahoo::YahooFetcher;
use store::SqliteSeenStore;

const EXIT_FATAL: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_PARTIAL: u8 = 3;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Cli::parse();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.directive()));
    tfmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let code = match args.command {
        Command::Gdelt(gdelt) => run_gdelt(gdelt).await,
        Command::Yahoo(yahoo) => run_yahoo(yahoo).await,
        Command::Validate(validate) => run_validate(&validate.csv),
    };

    let elapsed = start_time.elapsed();
    info!(?elapsed, "Execution complete");
    code
}

async fn run_gdelt(args: GdeltArgs) -> ExitCode {
    let feeds = match args.query.as_deref() {
        Some(query) => Ok(vec![FeedConfig::gdelt(&args.name, query)]),
        None => load_feeds(&args.common.config, Source::Gdelt),
    };
    let feeds = match feeds {
        Ok(feeds) => feeds,
        Err(e) => return config_failure(e),
    };

    let fetcher = match GdeltFetcher::new(args.max_records, args.days_back) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!(error = %e, "Cannot build HTTP client");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    ingest(fetcher, &feeds, &args.common, &args.out_csv).await
}

async fn run_yahoo(args: YahooArgs) -> ExitCode {
    warn!("The yahoo pipeline is deprecated and may break without notice; use `gdelt`");

    let feeds = match (args.ticker.as_deref(), args.query.as_deref()) {
        (Some(ticker), Some(query)) => Ok(vec![FeedConfig::yahoo(ticker, query)]),
        (Some(_), None) => Err(ConfigError::TickerWithoutQuery),
        (None, _) => load_feeds(&args.common.config, Source::Yahoo),
    };
    let feeds = match feeds {
        Ok(feeds) => feeds,
        Err(e) => return config_failure(e),
    };

    let fetcher = match YahooFetcher::new(args.max_items, args.common.query_policy) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!(error = %e, "Cannot build HTTP client");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    ingest(fetcher, &feeds, &args.common, &args.out_csv).await
}

fn config_failure(e: ConfigError) -> ExitCode {
    error!(error = %e, "Cannot load feeds");
    ExitCode::from(EXIT_USAGE)
}

#[instrument(level = "info", skip_all, fields(source = fetcher.source_name()))]
async fn ingest<F: Fetcher>(fetcher: F, feeds: &[FeedConfig], common: &CommonArgs, out_csv: &Path) -> ExitCode {
    let mut store = match SqliteSeenStore::open(&common.db_path) {
        Ok(store) => store,
        Err(e) => {
            error!(path = %common.db_path.display(), error = %e, "Seen-id store unavailable; aborting run");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    let appender = CsvAppender::new(out_csv);
    let fetcher = RetryFetcher::new(fetcher, RetryPolicy::new(common.max_attempts));
    let options = RunOptions {
        fetched_at: utils::utc_now(),
        query_policy: common.query_policy,
    };

    info!(
        feeds = feeds.len(),
        csv = %appender.path().display(),
        fetched_at = %options.fetched_at,
        "Starting ingestion"
    );
    match Pipeline::new(&fetcher, &mut store, &appender, options).run(feeds).await {
        Ok(summary) => match summary.status() {
            RunStatus::Complete => ExitCode::SUCCESS,
            RunStatus::Partial => {
                warn!(failed = ?summary.failed_feeds, "Some feeds failed");
                if common.strict {
                    ExitCode::from(EXIT_PARTIAL)
                } else {
                    ExitCode::SUCCESS
                }
            }
        },
        Err(e) => {
            error!(error = %e, "Ingestion aborted");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run_validate(path: &Path) -> ExitCode {
    match validate_csv(path) {
        Ok(report) => {
            println!("Validation passed ({} rows)", report.rows);
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Validation failed: {e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
