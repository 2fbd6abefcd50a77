//! Feed list loading.
//!
//! The config file is YAML with a single `feeds` list:
//!
//! ```yaml
//! feeds:
//!   - name: nvidia
//!     query: '"Nvidia" OR NVDA'
//!     ticker: NVDA
//! ```
//!
//! GDELT feeds need `query`; Yahoo feeds need both `ticker` and `query`.
//! The list is loaded once and handed to the driver as an ordered,
//! immutable `Vec<FeedConfig>`.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

/// Which upstream a pipeline run talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Gdelt,
    Yahoo,
}

/// One configured news stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Label used in logs.
    pub name: String,
    /// Query string, copied into every row this feed produces.
    pub query: String,
    /// Ticker symbol; only the Yahoo source uses it.
    pub ticker: Option<String>,
}

impl FeedConfig {
    /// Ad-hoc GDELT feed built from `--query`/`--name`.
    pub fn gdelt(name: &str, query: &str) -> Self {
        Self {
            name: name.to_string(),
            query: query.to_string(),
            ticker: None,
        }
    }

    /// Ad-hoc Yahoo feed built from `--ticker`/`--query`; named after the
    /// lowercased ticker.
    pub fn yahoo(ticker: &str, query: &str) -> Self {
        Self {
            name: ticker.to_lowercase(),
            query: query.to_string(),
            ticker: Some(ticker.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    feeds: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    name: Option<String>,
    query: Option<String>,
    ticker: Option<String>,
}

/// Read and validate the feed list at `path`.
///
/// # Errors
///
/// [`ConfigError::NoFeeds`] when the file defines no feeds, plus any I/O,
/// YAML or missing-field error from [`parse_feeds`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_feeds(path: &Path, source: Source) -> Result<Vec<FeedConfig>, ConfigError> {
    let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let feeds = parse_feeds(&yaml, source)?;
    if feeds.is_empty() {
        return Err(ConfigError::NoFeeds(path.display().to_string()));
    }
    debug!(count = feeds.len(), "Loaded feeds");
    Ok(feeds)
}

/// Parse a YAML document into feeds for `source`. An empty document yields
/// an empty list.
pub fn parse_feeds(yaml: &str, source: Source) -> Result<Vec<FeedConfig>, ConfigError> {
    let file: ConfigFile = if yaml.trim().is_empty() {
        ConfigFile::default()
    } else {
        serde_yaml::from_str::<Option<ConfigFile>>(yaml)?.unwrap_or_default()
    };

    file.feeds
        .into_iter()
        .enumerate()
        .map(|(index, entry)| feed_from_entry(index, entry, source))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn feed_from_entry(index: usize, entry: FeedEntry, source: Source) -> Result<FeedConfig, ConfigError> {
    let query = non_empty(entry.query).ok_or(ConfigError::MissingField { index, field: "query" })?;
    let name = non_empty(entry.name);
    let ticker = non_empty(entry.ticker);

    match source {
        Source::Gdelt => Ok(FeedConfig {
            name: name.unwrap_or_else(|| "feed".to_string()),
            query,
            ticker,
        }),
        Source::Yahoo => {
            let ticker = ticker.ok_or(ConfigError::MissingField { index, field: "ticker" })?;
            Ok(FeedConfig {
                name: name.unwrap_or_else(|| ticker.to_lowercase()),
                query,
                ticker: Some(ticker),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
feeds:
  - name: nvidia
    ticker: NVDA
    query: '"Nvidia" OR NVDA'
  - ticker: AAPL
    query: '"Apple Inc"'
"#;

    #[test]
    fn test_gdelt_feeds_keep_order_and_default_name() {
        let yaml = "feeds:\n  - query: a\n  - name: second\n    query: b\n";
        let feeds = parse_feeds(yaml, Source::Gdelt).unwrap();
        assert_eq!(
            feeds,
            vec![FeedConfig::gdelt("feed", "a"), FeedConfig::gdelt("second", "b")]
        );
    }

    #[test]
    fn test_yahoo_feeds_default_name_is_lowercase_ticker() {
        let feeds = parse_feeds(SAMPLE, Source::Yahoo).unwrap();
        assert_eq!(feeds[0].name, "nvidia");
        assert_eq!(feeds[1], FeedConfig::yahoo("AAPL", "\"Apple Inc\""));
        assert_eq!(feeds[1].name, "aapl");
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let err = parse_feeds("feeds:\n  - name: x\n", Source::Gdelt).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { index: 0, field: "query" }));

        let err = parse_feeds("feeds:\n  - query: q\n  - query: ''\n", Source::Gdelt).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { index: 1, field: "query" }));

        let err = parse_feeds("feeds:\n  - query: q\n", Source::Yahoo).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { index: 0, field: "ticker" }));
    }

    #[test]
    fn test_empty_documents_have_no_feeds() {
        assert!(parse_feeds("", Source::Gdelt).unwrap().is_empty());
        assert!(parse_feeds("feeds: []\n", Source::Gdelt).unwrap().is_empty());
        assert!(parse_feeds("other: 1\n", Source::Gdelt).unwrap().is_empty());
    }

    #[test]
    fn test_load_feeds_reports_missing_file_and_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            load_feeds(&missing, Source::Gdelt),
            Err(ConfigError::Io { .. })
        ));

        let empty = dir.path().join("config.yaml");
        fs::write(&empty, "feeds: []\n").unwrap();
        assert!(matches!(
            load_feeds(&empty, Source::Gdelt),
            Err(ConfigError::NoFeeds(_))
        ));
    }
}
