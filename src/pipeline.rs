//! The ingestion driver.
//!
//! For each configured feed, strictly one after another:
//!
//! 1. **Fetch** the feed's articles; a failure is logged and the feed skipped
//! 2. **Normalize** every link and compute its fingerprint
//! 3. **Filter** out ids already in the seen-id store or already in this batch
//! 4. **Append** the batch to the CSV (flushed and synced)
//! 5. **Record** the batch's ids in the store, in one transaction
//!
//! Appending before recording means a crash between the two leaves rows
//! whose ids are not yet stored; the next run writes them again and the
//! validator flags the duplicate. The reverse order would lose those
//! articles for good.
//!
//! Store and CSV errors are fatal for the whole run. Fetch errors are not.

use crate::config::FeedConfig;
use crate::error::RunError;
use crate::models::{ArticleRecord, FeedRow};
use crate::normalize::{QueryPolicy, fingerprint, normalize_link};
use crate::outputs::appender::CsvAppender;
use crate::scrapers::Fetcher;
use crate::store::SeenStore;
use std::collections::HashSet;
use tracing::{error, info, instrument, warn};

/// Per-run settings shared by every feed.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Ingestion timestamp written to `fetched_at` and `first_seen_at`.
    pub fetched_at: String,
    pub query_policy: QueryPolicy,
}

/// Counts for one feed that made it through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedOutcome {
    pub new_rows: usize,
    pub skipped: usize,
}

/// Whether every feed was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Complete,
    Partial,
}

/// What a run did, across all feeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub feeds: usize,
    pub new_rows: usize,
    pub skipped: usize,
    /// Names of feeds whose fetch failed, in processing order.
    pub failed_feeds: Vec<String>,
}

impl RunSummary {
    pub fn status(&self) -> RunStatus {
        if self.failed_feeds.is_empty() {
            RunStatus::Complete
        } else {
            RunStatus::Partial
        }
    }
}

/// Wires a fetcher, a seen-id store and a CSV appender together.
pub struct Pipeline<'a, F, S> {
    fetcher: &'a F,
    store: &'a mut S,
    appender: &'a CsvAppender,
    options: RunOptions,
}

impl<'a, F: Fetcher, S: SeenStore> Pipeline<'a, F, S> {
    pub fn new(fetcher: &'a F, store: &'a mut S, appender: &'a CsvAppender, options: RunOptions) -> Self {
        Self {
            fetcher,
            store,
            appender,
            options,
        }
    }

    /// Process `feeds` in order.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] as soon as the store or the CSV fails; feeds after
    /// that point are not processed.
    #[instrument(level = "info", skip_all, fields(source = self.fetcher.source_name(), feeds = feeds.len()))]
    pub async fn run(&mut self, feeds: &[FeedConfig]) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary {
            feeds: feeds.len(),
            ..RunSummary::default()
        };

        for feed in feeds {
            let records = match self.fetcher.fetch(feed).await {
                Ok(records) => records,
                Err(e) => {
                    error!(feed = %feed.name, stage = "fetch", error = %e, "Feed failed; skipping");
                    summary.failed_feeds.push(feed.name.clone());
                    continue;
                }
            };

            let outcome = self.ingest(feed, records).await?;
            summary.new_rows += outcome.new_rows;
            summary.skipped += outcome.skipped;
        }

        info!(
            feeds = summary.feeds,
            new_rows = summary.new_rows,
            skipped = summary.skipped,
            failed = summary.failed_feeds.len(),
            "Ingestion complete"
        );
        Ok(summary)
    }

    /// Dedupe, append and record one feed's fetched records.
    async fn ingest(&mut self, feed: &FeedConfig, records: Vec<ArticleRecord>) -> Result<FeedOutcome, RunError> {
        let mut outcome = FeedOutcome::default();
        let mut pending: HashSet<String> = HashSet::new();
        let mut ids = Vec::new();
        let mut rows = Vec::new();

        for record in records {
            let normalized = normalize_link(&record.link, None, self.options.query_policy);
            if !normalized.canonical {
                warn!(feed = %feed.name, link = %record.link, "Link is not a valid URL; fingerprinting it as-is");
            }
            let id = fingerprint(&normalized.link);

            if pending.contains(&id) || self.store.contains(&id)? {
                outcome.skipped += 1;
                continue;
            }

            let record = self.fetcher.enrich(record).await;
            pending.insert(id.clone());
            ids.push(id.clone());
            rows.push(FeedRow::from_record(record, id, normalized.link, &self.options.fetched_at));
        }

        outcome.new_rows = self.appender.append(&rows).inspect_err(|e| {
            error!(feed = %feed.name, stage = "append", error = %e, "CSV append failed");
        })?;
        self.store
            .record_all(&ids, &self.options.fetched_at)
            .inspect_err(|e| {
                error!(feed = %feed.name, stage = "record", error = %e, "Recording seen ids failed");
            })?;

        info!(feed = %feed.name, new = outcome.new_rows, skipped = outcome.skipped, "Feed complete");
        Ok(outcome)
    }
}
