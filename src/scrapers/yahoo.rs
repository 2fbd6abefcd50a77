//! Yahoo Finance news scraper (deprecated; prefer [`super::gdelt`]).
//!
//! Scrapes the per-ticker news page, falling back to the general stock market
//! topic page when the ticker page is missing or refuses the request.
//!
//! # URL Pattern
//!
//! - primary: `https://finance.yahoo.com/quote/{ticker}/news/`
//! - fallback: `https://finance.yahoo.com/topic/stock-market-news/`
//!
//! Articles are the page's `<a href>` elements whose link contains `/news/`.
//! Publisher, timestamp and snippet come from the nearest enclosing
//! `article`, `li` or `div`. Fallback items are kept only when they mention
//! the ticker or one of the quoted phrases of the feed query.

use super::{Fetcher, http_client};
use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::models::ArticleRecord;
use crate::normalize::{QueryPolicy, normalize_link};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const BASE_URL: &str = "https://finance.yahoo.com/quote/{ticker}/news/";
pub const FALLBACK_URL: &str = "https://finance.yahoo.com/topic/stock-market-news/";

const DEFAULT_SOURCE: &str = "Yahoo Finance";

/// Parsing this many items usually means the page layout changed.
const SUSPICIOUS_ITEM_COUNT: usize = 500;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static PUBLISHER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"span[class*="publisher"], div[class*="publisher"]"#).unwrap());
static SOURCE_LABEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"span[data-test="source"]"#).unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());
static META_OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:description"]"#).unwrap());
static QUOTED_PHRASE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).unwrap());

/// One parsed news link, before it is tied to a feed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    /// Absolute link.
    pub link: String,
    pub published: String,
    pub source: String,
    pub summary: String,
}

/// Scrapes ticker news pages.
#[derive(Debug, Clone)]
pub struct YahooFetcher {
    client: Client,
    max_items: usize,
    policy: QueryPolicy,
}

impl YahooFetcher {
    pub fn new(max_items: usize, policy: QueryPolicy) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                Duration::from_secs(20),
            )?,
            max_items,
            policy,
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_html(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    async fn fallback_items(&self, feed: &FeedConfig, ticker: &str) -> Result<Vec<NewsItem>, FetchError> {
        let html = self.get_html(FALLBACK_URL).await?;
        let base = Url::parse(FALLBACK_URL)?;
        Ok(parse_news_items(&html, &base, self.policy)
            .into_iter()
            .filter(|item| matches_query(item, ticker, &feed.query))
            .collect())
    }
}

impl Fetcher for YahooFetcher {
    fn source_name(&self) -> &'static str {
        "yahoo"
    }

    #[instrument(level = "info", skip_all, fields(feed = %feed.name))]
    async fn fetch(&self, feed: &FeedConfig) -> Result<Vec<ArticleRecord>, FetchError> {
        let ticker = feed
            .ticker
            .as_deref()
            .ok_or_else(|| FetchError::MissingTicker(feed.name.clone()))?;
        let url = BASE_URL.replace("{ticker}", &urlencoding::encode(ticker));

        let (items, page) = match self.get_html(&url).await {
            Ok(html) => (parse_news_items(&html, &Url::parse(&url)?, self.policy), "primary"),
            Err(e) if e.status().is_some_and(|s| (400..500).contains(&s)) => {
                warn!(%ticker, status = ?e.status(), "Primary URL refused; using fallback");
                (self.fallback_items(feed, ticker).await?, "fallback")
            }
            Err(e) => return Err(e),
        };

        if items.is_empty() {
            warn!(%ticker, page, "No items parsed");
        }
        if items.len() > SUSPICIOUS_ITEM_COUNT {
            warn!(%ticker, parsed = items.len(), limit = self.max_items, "Unusually many items; limiting");
        }
        let records: Vec<ArticleRecord> = items
            .into_iter()
            .take(self.max_items)
            .map(|item| ArticleRecord {
                title: item.title,
                link: item.link,
                published: item.published,
                source: item.source,
                summary: item.summary,
                query: feed.query.clone(),
            })
            .collect();
        info!(%ticker, page, count = records.len(), "Parsed Yahoo items");
        Ok(records)
    }

    /// Fill an empty summary from the article page's meta description.
    async fn enrich(&self, mut record: ArticleRecord) -> ArticleRecord {
        if !record.summary.is_empty() {
            return record;
        }
        match self.get_html(&record.link).await {
            Ok(html) => {
                if let Some(description) = meta_description(&html) {
                    debug!(link = %record.link, "Filled summary from meta description");
                    record.summary = description;
                }
            }
            Err(e) => warn!(link = %record.link, error = %e, "Failed to fetch article for summary"),
        }
        record
    }
}

/// Extract news links from a Yahoo Finance page.
///
/// Links are resolved against `base`; two anchors that normalize to the same
/// link are reported once, keeping the first.
pub fn parse_news_items(html: &str, base: &Url, policy: QueryPolicy) -> Vec<NewsItem> {
    let document = Html::parse_document(html);

    document
        .select(&ANCHOR)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            if !href.contains("/news/") {
                return None;
            }
            let title = element_text(anchor);
            if title.is_empty() {
                return None;
            }
            let key = normalize_link(href, Some(base), policy).link;
            let link = base.join(href).map(|u| u.to_string()).unwrap_or_else(|_| href.to_string());

            let container = anchor
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| matches!(el.value().name(), "article" | "li" | "div"));

            let item = NewsItem {
                title,
                link,
                published: container.map(extract_time).unwrap_or_default(),
                source: container
                    .and_then(extract_source)
                    .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
                summary: container
                    .and_then(|c| c.select(&PARAGRAPH).next())
                    .map(element_text)
                    .unwrap_or_default(),
            };
            Some((key, item))
        })
        .unique_by(|(key, _)| key.clone())
        .map(|(_, item)| item)
        .collect()
}

/// `true` when the item mentions the ticker or any quoted phrase of `query`.
pub fn matches_query(item: &NewsItem, ticker: &str, query: &str) -> bool {
    let text = format!("{} {}", item.title, item.summary).to_lowercase();
    if text.contains(&ticker.to_lowercase()) {
        return true;
    }
    query_phrases(query).iter().any(|phrase| text.contains(phrase))
}

/// Lowercased, non-empty double-quoted phrases of `query`, in order.
pub fn query_phrases(query: &str) -> Vec<String> {
    QUOTED_PHRASE
        .captures_iter(query)
        .map(|cap| cap[1].trim().to_lowercase())
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

/// `meta[name=description]`, else `meta[property=og:description]`.
pub fn meta_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    [&*META_DESCRIPTION, &*META_OG_DESCRIPTION]
        .into_iter()
        .filter_map(|selector| document.select(selector).next())
        .filter_map(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

fn element_text(el: ElementRef) -> String {
    el.text().flat_map(str::split_whitespace).join(" ")
}

fn extract_time(container: ElementRef) -> String {
    container
        .select(&TIME)
        .next()
        .map(|time| match time.value().attr("datetime") {
            Some(datetime) => datetime.trim().to_string(),
            None => element_text(time),
        })
        .unwrap_or_default()
}

fn extract_source(container: ElementRef) -> Option<String> {
    container
        .select(&PUBLISHER)
        .next()
        .or_else(|| container.select(&SOURCE_LABEL).next())
        .map(element_text)
        .filter(|s| !s.is_empty())
}
