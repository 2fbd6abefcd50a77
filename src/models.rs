//! Data models shared by the fetchers, the pipeline driver and the CSV output.
//!
//! - [`ArticleRecord`]: an article as produced by a fetcher, before dedupe
//! - [`FeedRow`]: one persisted CSV row, keyed by the fingerprint of its link
//! - [`SCHEMA`]: the fixed CSV column order

/// CSV column names, in the order they are written.
///
/// Changing this breaks every existing output file; the validator and the
/// appender both compare against it verbatim.
pub const SCHEMA: [&str; 8] = [
    "id",
    "title",
    "link",
    "published",
    "source",
    "summary",
    "query",
    "fetched_at",
];

/// A raw article returned by a fetcher.
///
/// Nothing here is canonical yet: `link` may be relative, carry tracking
/// parameters, or point at a redirect wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    /// Headline text.
    pub title: String,
    /// The link as found upstream.
    pub link: String,
    /// Publication time in whatever format the source uses.
    pub published: String,
    /// Publisher name.
    pub source: String,
    /// Snippet or description; may be empty.
    pub summary: String,
    /// The configured query that produced this record.
    pub query: String,
}

/// A deduplicated article ready to be appended to the CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRow {
    /// Hex SHA-256 of `link`.
    pub id: String,
    pub title: String,
    /// The normalized link.
    pub link: String,
    pub published: String,
    pub source: String,
    pub summary: String,
    pub query: String,
    /// UTC ISO-8601 time of the run that ingested the row.
    pub fetched_at: String,
}

impl FeedRow {
    /// Build a row from a fetched record and its already-normalized link.
    pub fn from_record(
        record: ArticleRecord,
        id: String,
        normalized_link: String,
        fetched_at: &str,
    ) -> Self {
        Self {
            id,
            title: record.title,
            link: normalized_link,
            published: record.published,
            source: record.source,
            summary: record.summary,
            query: record.query,
            fetched_at: fetched_at.to_string(),
        }
    }

    /// Field values in [`SCHEMA`] order.
    pub fn to_record(&self) -> [&str; 8] {
        [
            &self.id,
            &self.title,
            &self.link,
            &self.published,
            &self.source,
            &self.summary,
            &self.query,
            &self.fetched_at,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_record_follows_schema_order() {
        let row = FeedRow {
            id: "i".into(),
            title: "t".into(),
            link: "l".into(),
            published: "p".into(),
            source: "s".into(),
            summary: "su".into(),
            query: "q".into(),
            fetched_at: "f".into(),
        };
        assert_eq!(row.to_record(), ["i", "t", "l", "p", "s", "su", "q", "f"]);
        assert_eq!(SCHEMA.join(","), "id,title,link,published,source,summary,query,fetched_at");
    }

    #[test]
    fn test_from_record_replaces_link() {
        let record = ArticleRecord {
            title: "Title".into(),
            link: "https://example.com/a?utm_source=x".into(),
            published: "20240101T000000Z".into(),
            source: "example.com".into(),
            summary: String::new(),
            query: "q".into(),
        };
        let row = FeedRow::from_record(record, "abc".into(), "https://example.com/a".into(), "now");
        assert_eq!(row.link, "https://example.com/a");
        assert_eq!(row.fetched_at, "now");
        assert_eq!(row.title, "Title");
    }
}
