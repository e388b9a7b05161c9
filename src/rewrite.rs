//! Metadata descriptor rewriting for the target scheme.
//!
//! Descriptors are TOML documents. The rewriter tolerates the configured
//! legacy schema version on the source side, normalizes coordinates from the
//! artifact (which are authoritative), and emits a current-schema document at
//! the target path.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::Artifact;
use crate::report::{FileReporter, ReportError};

/// Schema version written on the target side.
pub const TARGET_SCHEMA: &str = "v2";

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("failed to read descriptor `{path}`: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("failed to parse descriptor `{path}`: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("failed to write descriptor `{path}`: {reason}")]
    Write { path: PathBuf, reason: String },
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// The descriptor document as stored on disk.
///
/// All fields default so that sparse legacy documents still parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorDoc {
    pub schema: String,
    pub group: String,
    pub name: String,
    pub version: String,
    pub packaging: String,
}

/// Produces an equivalent descriptor valid for the target scheme.
pub trait MetadataRewriter {
    fn rewrite(
        &self,
        artifact: &Artifact,
        source: &Path,
        target: &Path,
        report: &mut FileReporter,
        report_only: bool,
    ) -> Result<(), RewriteError>;
}

/// Resolve a rewriter from the configured source schema version.
pub fn rewriter_for(schema: &str) -> Option<Box<dyn MetadataRewriter>> {
    match schema {
        "v1" | "v2" => Some(Box::new(TomlRewriter {
            source_schema: schema.to_string(),
        })),
        _ => None,
    }
}

pub struct TomlRewriter {
    source_schema: String,
}

impl MetadataRewriter for TomlRewriter {
    fn rewrite(
        &self,
        artifact: &Artifact,
        source: &Path,
        target: &Path,
        report: &mut FileReporter,
        report_only: bool,
    ) -> Result<(), RewriteError> {
        let mut doc = if source.exists() {
            let contents = fs::read_to_string(source).map_err(|e| RewriteError::Read {
                path: source.to_path_buf(),
                reason: e.to_string(),
            })?;
            let doc: DescriptorDoc =
                toml::from_str(&contents).map_err(|e| RewriteError::Parse {
                    path: source.to_path_buf(),
                    reason: e.to_string(),
                })?;
            if !doc.schema.is_empty() && doc.schema != self.source_schema {
                report.warn(&format!(
                    "descriptor for `{}` declares schema `{}`, expected `{}`",
                    artifact.id(),
                    doc.schema,
                    self.source_schema
                ))?;
            }
            doc
        } else {
            // The original repository may predate descriptors entirely.
            report.warn(&format!(
                "source descriptor missing for artifact `{}` at `{}`; synthesizing from coordinates",
                artifact.id(),
                source.display()
            ))?;
            DescriptorDoc::default()
        };

        // Coordinates from discovery are authoritative over whatever the
        // legacy document claims.
        doc.schema = TARGET_SCHEMA.to_string();
        doc.group = artifact.group.clone();
        doc.name = artifact.name.clone();
        doc.version = artifact.version.clone();
        if doc.packaging.is_empty() {
            doc.packaging = artifact.extension.clone();
        }

        if !report_only {
            write_descriptor(target, &doc)?;
        }
        Ok(())
    }
}

fn write_descriptor(path: &Path, doc: &DescriptorDoc) -> Result<(), RewriteError> {
    let contents = toml::to_string_pretty(doc).map_err(|e| RewriteError::Write {
        path: path.to_path_buf(),
        reason: format!("failed to render descriptor: {e}"),
    })?;
    let dir = path.parent().ok_or_else(|| RewriteError::Write {
        path: path.to_path_buf(),
        reason: "descriptor path missing parent directory".to_string(),
    })?;
    fs::create_dir_all(dir).map_err(|e| RewriteError::Write {
        path: path.to_path_buf(),
        reason: format!("failed to create {}: {e}", dir.display()),
    })?;
    let temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| RewriteError::Write {
        path: path.to_path_buf(),
        reason: format!("failed to create temp file in {}: {e}", dir.display()),
    })?;
    fs::write(temp.path(), contents).map_err(|e| RewriteError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    temp.persist(path).map_err(|e| RewriteError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}
