//! Command-line interface definitions.
//!
//! One binary, three subcommands: `gdelt`, `yahoo` (deprecated) and
//! `validate`. The underscore spellings used by earlier releases
//! (`--out_csv`, `--db_path`, ...) are kept as aliases so existing scheduler
//! jobs keep working.

use crate::normalize::QueryPolicy;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// A century; GDELT has nothing older and larger values overflow dates.
const MAX_DAYS_BACK: i64 = 36_500;

/// Fetch news articles, dedupe them by normalized link, and append new rows
/// to a CSV file.
///
/// # Examples
///
/// ```sh
/// # All feeds from config.yaml through the GDELT DOC API
/// news_feeds gdelt --config config.yaml
///
/// # A single ad-hoc query
/// news_feeds gdelt --query '"Nvidia" OR NVDA' --name nvidia --days-back 2
///
/// # Check the output before committing it
/// news_feeds validate --csv data/gdelt_news.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Log verbosity; RUST_LOG overrides it when set
    #[arg(
        long = "log-level",
        alias = "log_level",
        global = true,
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Info
    )]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest articles from the GDELT DOC 2.0 API
    Gdelt(GdeltArgs),
    /// Ingest articles scraped from Yahoo Finance (deprecated; use `gdelt`)
    Yahoo(YahooArgs),
    /// Check an existing CSV against the fixed header and row rules
    Validate(ValidateArgs),
}

/// Flags shared by both ingestion pipelines.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to the YAML feed list (ignored when a single feed is given by flags)
    #[arg(long, env = "NEWS_FEEDS_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// SQLite file holding every id already written
    #[arg(long = "db-path", alias = "db_path", env = "NEWS_FEEDS_DB_PATH", default_value = "state/seen_ids.sqlite")]
    pub db_path: PathBuf,

    /// What to do with link query strings before fingerprinting
    #[arg(long = "query-policy", value_enum, default_value_t = QueryPolicy::DropAll)]
    pub query_policy: QueryPolicy,

    /// Attempts per feed for retryable fetch errors (429, 5xx, connection)
    #[arg(long = "max-attempts", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    /// Exit with status 3 when any feed fails
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct GdeltArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Run a single query instead of the config file
    #[arg(long)]
    pub query: Option<String>,

    /// Name for the single query
    #[arg(long, default_value = "feed")]
    pub name: String,

    /// Output CSV path
    #[arg(long = "out-csv", alias = "out_csv", default_value = "data/gdelt_news.csv")]
    pub out_csv: PathBuf,

    /// Max records per feed
    #[arg(long = "max-records", alias = "max_records", default_value_t = 250)]
    pub max_records: u32,

    /// How many days back to query (at most 36500)
    #[arg(
        long = "days-back",
        alias = "days_back",
        default_value_t = 7,
        value_parser = clap::value_parser!(u32).range(0..=MAX_DAYS_BACK)
    )]
    pub days_back: u32,
}

#[derive(Args, Debug)]
pub struct YahooArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Single ticker to ingest (requires --query)
    #[arg(long)]
    pub ticker: Option<String>,

    /// Query string for the single ticker
    #[arg(long)]
    pub query: Option<String>,

    /// Output CSV path
    #[arg(long = "out-csv", alias = "out_csv", default_value = "data/yahoo_finance_news.csv")]
    pub out_csv: PathBuf,

    /// Max items per ticker
    #[arg(long = "max-items", alias = "max_items", default_value_t = 80)]
    pub max_items: usize,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the CSV to check
    #[arg(long, default_value = "data/gdelt_news.csv")]
    pub csv: PathBuf,
}

/// Accepted `--log-level` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// `tracing` filter directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gdelt_defaults() {
        let cli = Cli::parse_from(["news_feeds", "gdelt"]);
        assert_eq!(cli.log_level, LogLevel::Info);
        let Command::Gdelt(args) = cli.command else {
            panic!("expected gdelt");
        };
        assert_eq!(args.out_csv, PathBuf::from("data/gdelt_news.csv"));
        assert_eq!(args.common.db_path, PathBuf::from("state/seen_ids.sqlite"));
        assert_eq!(args.max_records, 250);
        assert_eq!(args.days_back, 7);
        assert_eq!(args.common.max_attempts, 1);
        assert_eq!(args.common.query_policy, QueryPolicy::DropAll);
        assert!(!args.common.strict);
        assert!(args.query.is_none());
    }

    #[test]
    fn test_underscore_aliases_and_uppercase_level() {
        let cli = Cli::parse_from([
            "news_feeds",
            "yahoo",
            "--ticker",
            "NVDA",
            "--query",
            "\"Nvidia\"",
            "--out_csv",
            "/tmp/out.csv",
            "--db_path",
            "/tmp/seen.sqlite",
            "--max_items",
            "10",
            "--log_level",
            "WARNING",
        ]);
        assert_eq!(cli.log_level, LogLevel::Warning);
        let Command::Yahoo(args) = cli.command else {
            panic!("expected yahoo");
        };
        assert_eq!(args.ticker.as_deref(), Some("NVDA"));
        assert_eq!(args.out_csv, PathBuf::from("/tmp/out.csv"));
        assert_eq!(args.common.db_path, PathBuf::from("/tmp/seen.sqlite"));
        assert_eq!(args.max_items, 10);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(Cli::try_parse_from(["news_feeds", "gdelt", "--max-attempts", "0"]).is_err());
    }

    #[test]
    fn test_days_back_is_bounded() {
        assert!(Cli::try_parse_from(["news_feeds", "gdelt", "--days-back", "200000000"]).is_err());
        let cli = Cli::try_parse_from(["news_feeds", "gdelt", "--days-back", "36500"]).unwrap();
        let Command::Gdelt(args) = cli.command else {
            panic!("expected gdelt");
        };
        assert_eq!(args.days_back, 36_500);
    }

    #[test]
    fn test_validate_and_drop_tracking_policy() {
        let cli = Cli::parse_from(["news_feeds", "validate", "--csv", "x.csv"]);
        assert!(matches!(cli.command, Command::Validate(ref a) if a.csv == PathBuf::from("x.csv")));

        let cli = Cli::parse_from(["news_feeds", "gdelt", "--query-policy", "drop-tracking", "--strict"]);
        let Command::Gdelt(args) = cli.command else {
            panic!("expected gdelt");
        };
        assert_eq!(args.common.query_policy, QueryPolicy::DropTracking);
        assert!(args.common.strict);
    }

    #[test]
    fn test_log_level_directives() {
        assert_eq!(LogLevel::Warning.directive(), "warn");
        assert_eq!(LogLevel::Critical.directive(), "error");
    }
}
