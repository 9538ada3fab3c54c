//! JSON Lines writer
//!
//! Each thread becomes a single line:
//!
//! ```text
//! {"commenter":"alice","content":"Great video","link":"https://...","children":[]}
//! ```
//!
//! Lines are flushed one at a time so an interrupted run keeps everything
//! written before the interruption.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::models::{CommentRecord, ThreadOutcome};

/// Line-oriented JSON writer over any `io::Write`
pub struct JsonLinesWriter<W: Write> {
    writer: W,

    /// Write `null` for threads the filter skipped
    include_skips: bool,

    records_written: usize,
    skips_written: usize,
}

impl JsonLinesWriter<BufWriter<File>> {
    /// Create (or truncate) a file, making parent directories as needed
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `include_skips` - Whether skipped threads produce `null` lines
    pub fn create(path: &Path, include_skips: bool) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;

        Ok(Self::new(BufWriter::new(file), include_skips))
    }
}

impl JsonLinesWriter<io::Stdout> {
    pub fn stdout(include_skips: bool) -> Self {
        Self::new(io::stdout(), include_skips)
    }
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(writer: W, include_skips: bool) -> Self {
        Self {
            writer,
            include_skips,
            records_written: 0,
            skips_written: 0,
        }
    }

    /// Write one record and flush
    pub fn write_record(&mut self, record: &CommentRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record).context("Failed to serialize record")?;
        self.end_line()?;
        self.records_written += 1;
        Ok(())
    }

    /// Write an outcome. Skips produce a `null` line only when enabled.
    ///
    /// Returns whether a line was written.
    pub fn write_outcome(&mut self, outcome: &ThreadOutcome) -> Result<bool> {
        match outcome {
            ThreadOutcome::Record(record) => {
                self.write_record(record)?;
                Ok(true)
            }
            ThreadOutcome::Skip if self.include_skips => {
                self.writer
                    .write_all(b"null")
                    .context("Failed to write output")?;
                self.end_line()?;
                self.skips_written += 1;
                Ok(true)
            }
            ThreadOutcome::Skip => Ok(false),
        }
    }

    fn end_line(&mut self) -> Result<()> {
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .context("Failed to write output")
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn skips_written(&self) -> usize {
        self.skips_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReplyRecord;
    use tempfile::TempDir;

    fn sample() -> CommentRecord {
        let mut record = CommentRecord::new("@alice", "First!", "https://www.youtube.com/watch?v=x&lc=1");
        record
            .children
            .push(ReplyRecord::new("@bob", "Second", ""));
        record
    }

    #[test]
    fn test_one_object_per_line() {
        let mut writer = JsonLinesWriter::new(Vec::new(), false);
        writer.write_record(&sample()).unwrap();
        writer.write_record(&sample()).unwrap();
        assert_eq!(writer.records_written(), 2);

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["commenter"], "alice");
        assert_eq!(value["children"][0]["commenter"], "bob");
        assert_eq!(value["children"][0]["link"], "");
    }

    #[test]
    fn test_skips_omitted_by_default() {
        let mut writer = JsonLinesWriter::new(Vec::new(), false);
        assert!(!writer.write_outcome(&ThreadOutcome::Skip).unwrap());
        assert!(writer
            .write_outcome(&ThreadOutcome::Record(sample()))
            .unwrap());

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_skips_written_as_null() {
        let mut writer = JsonLinesWriter::new(Vec::new(), true);
        writer.write_outcome(&ThreadOutcome::Skip).unwrap();
        writer
            .write_outcome(&ThreadOutcome::Record(sample()))
            .unwrap();
        assert_eq!(writer.skips_written(), 1);
        assert_eq!(writer.records_written(), 1);

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "null");
        assert!(lines[1].starts_with('{'));
    }

    #[test]
    fn test_create_makes_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out/comments.jsonl");

        let mut writer = JsonLinesWriter::create(&path, false).unwrap();
        writer.write_record(&sample()).unwrap();
        drop(writer);

        let content = fs::read_to_string(&path).unwrap();
        let record: CommentRecord = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(record, sample());
    }
}
