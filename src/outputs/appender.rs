//! Append-only CSV writer.
//!
//! The file is never truncated or rewritten. A batch is serialized in memory
//! and written with a single call followed by `sync_all`; if either fails the
//! file is cut back to its previous length so no half-written row remains.

use crate::error::CsvError;
use crate::models::{FeedRow, SCHEMA};
use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Writes [`FeedRow`]s to one CSV file under the fixed [`SCHEMA`] header.
#[derive(Debug, Clone)]
pub struct CsvAppender {
    path: PathBuf,
}

impl CsvAppender {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `rows` in order, writing the header first when the file is
    /// missing or empty.
    ///
    /// # Returns
    ///
    /// The number of rows written.
    ///
    /// # Errors
    ///
    /// - [`CsvError::HeaderMismatch`] if the existing file starts with a
    ///   different header; nothing is written in that case
    /// - [`CsvError::Io`] if the file cannot be opened, written, or synced
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), rows = rows.len()))]
    pub fn append(&self, rows: &[FeedRow]) -> Result<usize, CsvError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;
        let original_len = file.metadata()?.len();

        let mut buf = Vec::new();
        if original_len > 0 {
            check_header(&file)?;
            if rows.is_empty() {
                return Ok(0);
            }
            // A last line without terminator would swallow the first new row.
            if !ends_with_newline(&mut file, original_len)? {
                debug!("Existing CSV lacks a trailing newline; terminating last line");
                buf.extend_from_slice(b"\r\n");
            }
        }

        buf.extend(encode(rows, original_len == 0)?);
        write_or_rollback(&mut file, &buf, original_len)?;

        if original_len == 0 {
            info!("Created CSV with header");
        }
        debug!(bytes = buf.len(), "Appended CSV rows");
        Ok(rows.len())
    }
}

fn check_header(file: &File) -> Result<(), CsvError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));
    let mut first = StringRecord::new();
    reader.read_record(&mut first)?;

    if first.iter().eq(SCHEMA.iter().copied()) {
        Ok(())
    } else {
        Err(CsvError::HeaderMismatch {
            found: first.iter().collect::<Vec<_>>().join(","),
        })
    }
}

fn encode(rows: &[FeedRow], with_header: bool) -> Result<Vec<u8>, CsvError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());
    if with_header {
        writer.write_record(SCHEMA)?;
    }
    for row in rows {
        writer.write_record(row.to_record())?;
    }
    writer.into_inner().map_err(|e| CsvError::Io(e.into_error()))
}

fn ends_with_newline(file: &mut File, len: u64) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// A file-like sink that can be synced and cut back to a given length.
trait AppendTarget: Write {
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl AppendTarget for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write `buf` and sync it; on failure cut the target back to `original_len`.
fn write_or_rollback<T: AppendTarget>(target: &mut T, buf: &[u8], original_len: u64) -> io::Result<()> {
    let written = target
        .write_all(buf)
        .and_then(|()| target.flush())
        .and_then(|()| target.sync());
    if let Err(e) = written {
        warn!(error = %e, original_len, "CSV write failed; rolling back partial data");
        if let Err(rollback) = target.truncate(original_len) {
            warn!(error = %rollback, "CSV rollback failed");
        }
        return Err(e);
    }
    Ok(())
}
