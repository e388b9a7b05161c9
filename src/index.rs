//! Target-repository index: one machine-readable summary of the discovered
//! artifact set, written before per-artifact processing begins.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::artifact::Artifact;

pub const INDEX_FILE_NAME: &str = ".index.json";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to write index `{path}`: {reason}")]
    Write { path: PathBuf, reason: String },
}

pub trait Indexer {
    fn write_index(&self, artifacts: &[Artifact], target_root: &Path) -> Result<(), IndexError>;
}

#[derive(Debug, Serialize)]
struct IndexDoc<'a> {
    generated_at: DateTime<Utc>,
    count: usize,
    artifacts: &'a [Artifact],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonIndexer;

impl Indexer for JsonIndexer {
    fn write_index(&self, artifacts: &[Artifact], target_root: &Path) -> Result<(), IndexError> {
        let path = target_root.join(INDEX_FILE_NAME);
        let doc = IndexDoc {
            generated_at: Utc::now(),
            count: artifacts.len(),
            artifacts,
        };
        let contents = serde_json::to_vec_pretty(&doc).map_err(|e| IndexError::Write {
            path: path.clone(),
            reason: format!("failed to render index: {e}"),
        })?;
        fs::write(&path, contents).map_err(|e| IndexError::Write {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
