//! Error types, one enum per failure class.
//!
//! The split mirrors how each class is handled by the driver:
//! [`FetchError`] is caught per feed and logged, [`StoreError`] and
//! [`CsvError`] abort the run, [`ConfigError`] is a usage error, and
//! [`ValidationError`] only comes out of the `validate` subcommand.

use std::io;
use thiserror::Error;

/// A failure fetching or parsing one feed. Never fatal for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response shape: {0}")]
    Parse(String),

    #[error("invalid url {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("feed {0} has no ticker")]
    MissingTicker(String),
}

impl FetchError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Transport errors without a response, 429 and 5xx are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self.status() {
            Some(status) => status == 429 || (500..600).contains(&status),
            None => matches!(self, FetchError::Http(_)),
        }
    }
}

/// The seen-id store could not be opened, read or written.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cannot prepare store directory: {0}")]
    Io(#[from] io::Error),
}

/// Appending to the output CSV failed.
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("csv i/o: {0}")]
    Io(#[from] io::Error),

    #[error("csv encoding: {0}")]
    Csv(#[from] csv::Error),

    #[error("existing csv header does not match schema, found: {found}")]
    HeaderMismatch { found: String },
}

/// The feed list could not be built from the config file or flags.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("feed #{index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("no feeds defined in {0}")]
    NoFeeds(String),

    #[error("--query is required when using --ticker")]
    TickerWithoutQuery,
}

/// Fatal errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("seen-id store: {0}")]
    Store(#[from] StoreError),

    #[error("csv output: {0}")]
    Csv(#[from] CsvError),
}

/// The first problem found in an existing output CSV.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("CSV not found: {0}")]
    NotFound(String),

    #[error("CSV is empty")]
    Empty,

    #[error("CSV header mismatch. Expected: {expected} but found: {found}")]
    HeaderMismatch { expected: String, found: String },

    #[error("Line {line}: row has wrong number of columns ({found})")]
    ColumnCount { line: u64, found: usize },

    #[error("Line {line}: row missing required field {field}")]
    MissingField { line: u64, field: &'static str },

    #[error("Line {line}: row has malformed id {id}")]
    MalformedId { line: u64, id: String },

    #[error("Line {line}: duplicate id")]
    DuplicateId { line: u64 },

    #[error("cannot read CSV: {0}")]
    Csv(#[from] csv::Error),
}
