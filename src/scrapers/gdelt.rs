//! GDELT DOC 2.0 API fetcher.
//!
//! Queries [the DOC API](https://api.gdeltproject.org/api/v2/doc/doc) in
//! `ArtList` mode with JSON output, restricted to a lookback window of
//! `days_back` days.
//!
//! # Response Shape
//!
//! ```json
//! {"articles": [{"url": "...", "title": "...", "seendate": "20240101T120000Z",
//!                "domain": "example.com", "sourcecountry": "United States"}]}
//! ```
//!
//! GDELT answers with an empty body or `{}` when nothing matches, and with a
//! plain-text message (status 200) when it rejects a query.

use super::{Fetcher, http_client};
use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::models::ArticleRecord;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tracing::{debug, info, instrument, warn};

pub const API_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

/// Source label used when an article names no domain, country or collection.
const DEFAULT_SOURCE: &str = "GDELT";

#[derive(Debug, Default, Deserialize)]
struct GdeltResponse {
    #[serde(default)]
    articles: Option<Vec<GdeltArticle>>,
}

#[derive(Debug, Deserialize)]
struct GdeltArticle {
    url: Option<String>,
    title: Option<String>,
    seendate: Option<String>,
    domain: Option<String>,
    sourcecountry: Option<String>,
    sourcecollection: Option<String>,
    snippet: Option<String>,
}

/// Fetches one feed per request from the DOC API.
#[derive(Debug, Clone)]
pub struct GdeltFetcher {
    client: Client,
    max_records: u32,
    days_back: u32,
}

impl GdeltFetcher {
    pub fn new(max_records: u32, days_back: u32) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client("application/json", StdDuration::from_secs(30))?,
            max_records,
            days_back,
        })
    }

    /// Query parameters for `query`, with the window ending at `now`.
    pub fn params(&self, query: &str, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let start = now
            .checked_sub_signed(Duration::days(i64::from(self.days_back)))
            .unwrap_or(DateTime::UNIX_EPOCH);
        vec![
            ("query", query.to_string()),
            ("mode", "ArtList".to_string()),
            ("format", "json".to_string()),
            ("maxrecords", self.max_records.to_string()),
            ("sort", "HybridRel".to_string()),
            ("startdatetime", start.format("%Y%m%d%H%M%S").to_string()),
        ]
    }
}

impl Fetcher for GdeltFetcher {
    fn source_name(&self) -> &'static str {
        "gdelt"
    }

    #[instrument(level = "info", skip_all, fields(feed = %feed.name))]
    async fn fetch(&self, feed: &FeedConfig) -> Result<Vec<ArticleRecord>, FetchError> {
        let params = self.params(&feed.query, Utc::now());
        debug!(?params, "Fetching GDELT API");

        let response = self.client.get(API_URL).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let articles = parse_articles(&body, &feed.query)?;
        if articles.is_empty() {
            warn!(feed = %feed.name, "No articles returned");
        } else {
            info!(feed = %feed.name, count = articles.len(), "Fetched GDELT articles");
        }
        Ok(articles)
    }
}

/// Turn an `ArtList` JSON body into records, in response order.
///
/// Articles without a link or a title are dropped. An empty body counts as
/// zero articles; anything else that is not JSON is a [`FetchError::Parse`].
pub fn parse_articles(body: &str, query: &str) -> Result<Vec<ArticleRecord>, FetchError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let response: GdeltResponse = serde_json::from_str(body).map_err(|e| {
        FetchError::Parse(format!("{e}; body: {}", truncate_for_log(body.trim(), 200)))
    })?;

    let records = response
        .articles
        .unwrap_or_default()
        .into_iter()
        .filter_map(|article| {
            let link = article.url.filter(|u| !u.trim().is_empty())?;
            let title = article.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
            let source = [article.domain, article.sourcecountry, article.sourcecollection]
                .into_iter()
                .flatten()
                .find(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

            Some(ArticleRecord {
                title,
                link,
                published: article.seendate.unwrap_or_default(),
                source,
                summary: article.snippet.unwrap_or_default(),
                query: query.to_string(),
            })
        })
        .collect();

    Ok(records)
}
