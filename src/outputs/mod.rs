//! CSV output: appending new rows and validating existing files.
//!
//! # Submodules
//!
//! - [`appender`]: append-only writer that enforces the fixed header
//! - [`validate`]: read-only checker behind the `validate` subcommand
//!
//! # File layout
//!
//! ```text
//! id,title,link,published,source,summary,query,fetched_at
//! 3f1c…,Headline,https://example.com/story,20240101T120000Z,example.com,,"""Acme"" OR ACME",2024-01-01T12:05:00.000000+00:00
//! ```
//!
//! Records are CRLF-terminated, matching files produced by earlier versions
//! of these pipelines.

pub mod appender;
pub mod validate;
