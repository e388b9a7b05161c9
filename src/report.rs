//! Append-only report files with warning/error counters.
//!
//! One batch report spans the whole run; one artifact report is scoped to a
//! single artifact's processing and is closed on every exit path.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to open report `{path}`: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("failed to write report `{path}`: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Append-only text report with warning/error counters.
pub struct FileReporter {
    path: PathBuf,
    writer: BufWriter<File>,
    warnings: u32,
    errors: u32,
}

impl FileReporter {
    /// Open (truncate) a report file at `base/relative`, creating parent
    /// directories as needed, and write a timestamped header line.
    pub fn open(base: &Path, relative: &str) -> Result<Self, ReportError> {
        let path = base.join(relative);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ReportError::Open {
                path: path.clone(),
                reason: format!("failed to create {}: {e}", dir.display()),
            })?;
        }
        let file = File::create(&path).map_err(|e| ReportError::Open {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let mut reporter = Self {
            path,
            writer: BufWriter::new(file),
            warnings: 0,
            errors: 0,
        };
        reporter.write_line(&format!(
            "report opened at {}",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
        ))?;
        Ok(reporter)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn warn(&mut self, message: &str) -> Result<(), ReportError> {
        self.warnings += 1;
        self.write_line(&format!("[WARNING] {message}"))
    }

    pub fn error(&mut self, message: &str) -> Result<(), ReportError> {
        self.errors += 1;
        self.write_line(&format!("[ERROR] {message}"))
    }

    pub fn has_warning(&self) -> bool {
        self.warnings > 0
    }

    pub fn has_error(&self) -> bool {
        self.errors > 0
    }

    /// Flush and close the report.
    pub fn close(mut self) -> Result<(), ReportError> {
        self.writer.flush().map_err(|e| ReportError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn write_line(&mut self, line: &str) -> Result<(), ReportError> {
        writeln!(self.writer, "{line}").map_err(|e| ReportError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}
