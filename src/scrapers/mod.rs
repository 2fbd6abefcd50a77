//! Upstream news sources.
//!
//! Every source implements [`Fetcher`]: given a [`FeedConfig`] it returns the
//! feed's articles, most recent first, as far as the upstream orders them.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | GDELT | [`gdelt`] | DOC 2.0 API, `ArtList` JSON | Query based, lookback window |
//! | Yahoo Finance | [`yahoo`] | HTML scraping | Deprecated; ticker based with topic-page fallback |
//!
//! [`retry::RetryFetcher`] wraps any source with exponential backoff for
//! retryable errors.
//!
//! A failed fetch only affects its own feed: the driver logs it and moves on.

use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::models::ArticleRecord;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;

pub mod gdelt;
pub mod retry;
pub mod yahoo;

/// Both upstreams serve browsers better than bots.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// A source of articles for configured feeds.
pub trait Fetcher {
    /// Short source label for logs.
    fn source_name(&self) -> &'static str;

    /// Fetch the articles for one feed. Each record's `query` is the feed's.
    async fn fetch(&self, feed: &FeedConfig) -> Result<Vec<ArticleRecord>, FetchError>;

    /// Fill in missing details for an article that is about to be written.
    ///
    /// Only called for records that are not already in the seen-id store.
    /// Must not fail; on error the record is returned unchanged.
    async fn enrich(&self, record: ArticleRecord) -> ArticleRecord {
        record
    }
}

/// Build the shared HTTP client with browser-like headers.
///
/// # Arguments
///
/// * `accept` - value of the `Accept` header
/// * `timeout` - per-request timeout
pub fn http_client(accept: &'static str, timeout: Duration) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}

#[cfg(test)]
pub mod stub {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Canned responses per feed name. Feeds in `failing` get a 503, unknown
    /// feeds a 404.
    #[derive(Debug, Default)]
    pub struct StubFetcher {
        pub responses: HashMap<String, Vec<ArticleRecord>>,
        pub failing: Vec<String>,
        pub enriched: RefCell<Vec<String>>,
    }

    impl StubFetcher {
        pub fn with_feed(mut self, name: &str, records: Vec<ArticleRecord>) -> Self {
            self.responses.insert(name.to_string(), records);
            self
        }

        pub fn failing(mut self, name: &str) -> Self {
            self.failing.push(name.to_string());
            self
        }
    }

    impl Fetcher for StubFetcher {
        fn source_name(&self) -> &'static str {
            "stub"
        }

        async fn fetch(&self, feed: &FeedConfig) -> Result<Vec<ArticleRecord>, FetchError> {
            if self.failing.contains(&feed.name) {
                return Err(FetchError::Status {
                    url: format!("stub://{}", feed.name),
                    status: 503,
                });
            }
            self.responses.get(&feed.name).cloned().ok_or(FetchError::Status {
                url: format!("stub://{}", feed.name),
                status: 404,
            })
        }

        async fn enrich(&self, mut record: ArticleRecord) -> ArticleRecord {
            self.enriched.borrow_mut().push(record.link.clone());
            if record.summary.is_empty() {
                record.summary = "enriched".to_string();
            }
            record
        }
    }

    pub fn record(title: &str, link: &str, query: &str) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            link: link.to_string(),
            published: "20240101T120000Z".to_string(),
            source: "example.com".to_string(),
            summary: String::new(),
            query: query.to_string(),
        }
    }
}
