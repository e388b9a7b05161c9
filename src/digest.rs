//! Digest verification for transferred artifacts.
//!
//! The verifier checks a sibling `.sha256` file against the target file's
//! computed digest and (re)writes the digest file unless the run is
//! report-only.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::artifact::Artifact;
use crate::report::{FileReporter, ReportError};

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("failed to read `{path}` for digesting: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("failed to write digest file `{path}`: {reason}")]
    Write { path: PathBuf, reason: String },
    #[error("digest mismatch for `{path}`: recorded {recorded}, computed {computed}")]
    Mismatch {
        path: PathBuf,
        recorded: String,
        computed: String,
    },
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Validates and maintains the digest accompanying a transferred artifact.
pub trait DigestVerifier {
    fn verify(
        &self,
        artifact: &Artifact,
        target: &Path,
        report: &mut FileReporter,
        report_only: bool,
    ) -> Result<(), DigestError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Verifier;

impl DigestVerifier for Sha256Verifier {
    fn verify(
        &self,
        artifact: &Artifact,
        target: &Path,
        report: &mut FileReporter,
        report_only: bool,
    ) -> Result<(), DigestError> {
        // In a dry run the copy never happened, so a missing target is
        // expected; digest what the run would have transferred instead.
        let subject = if report_only && !target.exists() {
            match &artifact.source_file {
                Some(source) => source.clone(),
                None => {
                    report.warn(&format!(
                        "target for artifact `{}` not present in dry run; digest would be computed and written",
                        artifact.id()
                    ))?;
                    return Ok(());
                }
            }
        } else {
            target.to_path_buf()
        };

        let computed = sha256_hex(&subject)?;
        let digest_path = digest_path(target);

        if digest_path.exists() {
            let recorded = fs::read_to_string(&digest_path)
                .map_err(|e| DigestError::Read {
                    path: digest_path.clone(),
                    reason: e.to_string(),
                })?
                .trim()
                .to_ascii_lowercase();
            if recorded != computed {
                report.error(&format!(
                    "digest mismatch for artifact `{}`: recorded {recorded}, computed {computed}",
                    artifact.id()
                ))?;
                return Err(DigestError::Mismatch {
                    path: target.to_path_buf(),
                    recorded,
                    computed,
                });
            }
        } else if report_only {
            report.warn(&format!(
                "no digest file recorded for artifact `{}`; a fresh one would be written",
                artifact.id()
            ))?;
        } else {
            report.warn(&format!(
                "no digest file recorded for artifact `{}`; writing a fresh one",
                artifact.id()
            ))?;
        }

        if !report_only {
            fs::write(&digest_path, format!("{computed}\n")).map_err(|e| DigestError::Write {
                path: digest_path.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

pub fn digest_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".sha256");
    target.with_file_name(name)
}

fn sha256_hex(path: &Path) -> Result<String, DigestError> {
    let mut file = File::open(path).map_err(|e| DigestError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| DigestError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(hex::encode(hasher.finalize()))
}
