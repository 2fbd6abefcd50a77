//! Read-only validation of an output CSV.
//!
//! Used by the `validate` subcommand, typically in CI after an ingestion run
//! and before the changed CSV is committed.

use crate::error::ValidationError;
use crate::models::SCHEMA;
use csv::{ReaderBuilder, StringRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument};

/// Columns that must be non-empty on every row, checked in this order.
const REQUIRED_FIELDS: [(&str, usize); 4] = [("id", 0), ("title", 1), ("link", 2), ("fetched_at", 7)];

static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{64}$").unwrap());

/// Summary of a CSV that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationReport {
    pub rows: u64,
}

/// Check `path` against the fixed header and basic row well-formedness.
///
/// Checks, stopping at the first failure:
/// 1. the file exists and is not empty
/// 2. the first record equals [`SCHEMA`]
/// 3. every row has exactly [`SCHEMA`]`.len()` columns
/// 4. `id`, `title`, `link`, `fetched_at` are non-empty
/// 5. `id` is 64 lowercase hex characters
/// 6. no `id` appears twice
///
/// Line numbers in errors are the 1-based physical line on which the
/// offending row starts; the header is line 1.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn validate_csv(path: &Path) -> Result<ValidationReport, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::NotFound(path.display().to_string()));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut header = StringRecord::new();
    if !reader.read_record(&mut header)? {
        return Err(ValidationError::Empty);
    }
    if !header.iter().eq(SCHEMA.iter().copied()) {
        return Err(ValidationError::HeaderMismatch {
            expected: SCHEMA.join(","),
            found: header.iter().collect::<Vec<_>>().join(","),
        });
    }

    let mut ids = HashSet::new();
    let mut rows = 0u64;
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        rows += 1;
        // Quoted fields may span lines, so ask the reader where the row began.
        let line = record.position().map_or(rows + 1, |pos| pos.line());
        check_row(&record, line, &mut ids)?;
    }

    let report = ValidationReport { rows };
    info!(rows = report.rows, "CSV validation passed");
    Ok(report)
}

fn check_row(
    record: &StringRecord,
    line: u64,
    ids: &mut HashSet<String>,
) -> Result<(), ValidationError> {
    if record.len() != SCHEMA.len() {
        return Err(ValidationError::ColumnCount {
            line,
            found: record.len(),
        });
    }
    for (field, idx) in REQUIRED_FIELDS {
        if record[idx].is_empty() {
            return Err(ValidationError::MissingField { line, field });
        }
    }

    let id = &record[0];
    if !ID_RE.is_match(id) {
        return Err(ValidationError::MalformedId {
            line,
            id: id.to_string(),
        });
    }
    if !ids.insert(id.to_string()) {
        return Err(ValidationError::DuplicateId { line });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::fingerprint;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const HEADER: &str = "id,title,link,published,source,summary,query,fetched_at\r\n";

    fn write(content: &str) -> (TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn line(id: &str) -> String {
        format!("{id},Title,https://example.com/{id},,GDELT,,q,2024-01-01T00:00:00+00:00\r\n")
    }

    #[test]
    fn test_valid_file_passes() {
        let a = fingerprint("https://example.com/a");
        let b = fingerprint("https://example.com/b");
        let (_dir, path) = write(&format!("{HEADER}{}{}", line(&a), line(&b)));
        assert_eq!(validate_csv(&path).unwrap(), ValidationReport { rows: 2 });
    }

    #[test]
    fn test_header_only_passes() {
        let (_dir, path) = write(HEADER);
        assert_eq!(validate_csv(&path).unwrap().rows, 0);
    }

    #[test]
    fn test_missing_and_empty_files_fail() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            validate_csv(&dir.path().join("nope.csv")),
            Err(ValidationError::NotFound(_))
        ));
        let (_dir, path) = write("");
        assert!(matches!(validate_csv(&path), Err(ValidationError::Empty)));
    }

    #[test]
    fn test_header_mismatch_fails() {
        let (_dir, path) = write("id,title,link,published,source,summary,fetched_at,query\r\n");
        assert!(matches!(
            validate_csv(&path),
            Err(ValidationError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn test_row_problems_report_line_numbers() {
        let a = fingerprint("https://example.com/a");

        let (_dir, path) = write(&format!("{HEADER}{}a,b,c\r\n", line(&a)));
        assert!(matches!(
            validate_csv(&path),
            Err(ValidationError::ColumnCount { line: 3, found: 3 })
        ));

        let (_dir, path) = write(&format!("{HEADER}{a},,https://x,,,,q,t\r\n"));
        assert!(matches!(
            validate_csv(&path),
            Err(ValidationError::MissingField { line: 2, field: "title" })
        ));

        let (_dir, path) = write(&format!("{HEADER}{}{}", line(&a), line(&a)));
        assert!(matches!(
            validate_csv(&path),
            Err(ValidationError::DuplicateId { line: 3 })
        ));

        let (_dir, path) = write(&format!("{HEADER}{}", line("NOTHEX")));
        assert!(matches!(
            validate_csv(&path),
            Err(ValidationError::MalformedId { line: 2, .. })
        ));
    }

    #[test]
    fn test_multiline_fields_keep_physical_line_numbers() {
        let a = fingerprint("https://example.com/a");
        let multiline = format!(
            "{a},Title,https://example.com/a,,GDELT,\"first\r\nsecond\r\nthird\",q,2024-01-01T00:00:00+00:00\r\n"
        );
        let (_dir, path) = write(&format!("{HEADER}{multiline}{}", line(&a)));
        assert!(matches!(
            validate_csv(&path),
            Err(ValidationError::DuplicateId { line: 5 })
        ));

        let (_dir, path) = write(&format!("{HEADER}{multiline}"));
        assert_eq!(validate_csv(&path).unwrap().rows, 1);
    }
}
