//! The migration orchestrator.
//!
//! Sequences a run end to end: validate roots, discover, index, process each
//! artifact (copy, verify, rewrite, bridge), aggregate, escalate. Every
//! failure below root validation is contained at the narrowest scope and
//! converted into a report entry; no artifact's failure can abort the batch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::Result;
use crate::artifact::Artifact;
use crate::config::MigrationConfig;
use crate::digest::{DigestVerifier, Sha256Verifier};
use crate::discover::{Discoverer, discoverer_for};
use crate::index::{Indexer, JsonIndexer};
use crate::layout::{Layout, bridging_layout, layout_for};
use crate::notify::{MailMessage, Notifier, NotifyError, SmtpNotifier};
use crate::report::{FileReporter, ReportError};
use crate::rewrite::{MetadataRewriter, rewriter_for};

pub const BATCH_REPORT_NAME: &str = "repository.report.txt";

/// Root validation and collaborator resolution failures.
///
/// The only failures that prevent a run from doing any work at all: no
/// report is produced, no discovery happens, no mail is sent.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot use {role} directory `{path}`: not a directory")]
    NotADirectory { role: &'static str, path: PathBuf },
    #[error("cannot migrate from source repository `{path}`: it does not exist")]
    SourceMissing { path: PathBuf },
    #[error("failed to create {role} directory `{path}`: {reason}")]
    Create {
        role: &'static str,
        path: PathBuf,
        reason: String,
    },
    #[error("unknown layout id `{id}`")]
    UnknownLayout { id: String },
    #[error("unknown metadata schema version `{id}`")]
    UnknownSchema { id: String },
}

/// The collaborators a run is composed from, resolved once at
/// configuration-load time.
pub struct Collaborators {
    pub discoverer: Box<dyn Discoverer>,
    pub source_layout: Arc<dyn Layout>,
    pub target_layout: Arc<dyn Layout>,
    /// Used only to place legacy-compatible copies of rewritten metadata.
    pub bridging_layout: Arc<dyn Layout>,
    pub verifier: Box<dyn DigestVerifier>,
    pub rewriter: Box<dyn MetadataRewriter>,
    pub indexer: Box<dyn Indexer>,
    pub notifier: Box<dyn Notifier>,
}

impl Collaborators {
    pub fn from_config(config: &MigrationConfig) -> std::result::Result<Self, SetupError> {
        let source_layout =
            layout_for(&config.source.layout).ok_or_else(|| SetupError::UnknownLayout {
                id: config.source.layout.clone(),
            })?;
        let target_layout =
            layout_for(&config.target.layout).ok_or_else(|| SetupError::UnknownLayout {
                id: config.target.layout.clone(),
            })?;
        let discoverer =
            discoverer_for(&config.source.layout).ok_or_else(|| SetupError::UnknownLayout {
                id: config.source.layout.clone(),
            })?;
        let rewriter =
            rewriter_for(&config.source_schema).ok_or_else(|| SetupError::UnknownSchema {
                id: config.source_schema.clone(),
            })?;
        Ok(Self {
            discoverer,
            source_layout,
            target_layout,
            bridging_layout: bridging_layout(),
            verifier: Box::new(Sha256Verifier),
            rewriter,
            indexer: Box::new(JsonIndexer),
            notifier: Box::new(SmtpNotifier::new(config.mail.smtp_relay.clone())),
        })
    }
}

/// Aggregate outcome of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub discovered: usize,
    /// Artifacts that passed the staleness gate and were (or would have
    /// been) reprocessed.
    pub rewritten: usize,
    /// Batch-report flags; escalation is keyed to `has_error`.
    pub has_warning: bool,
    pub has_error: bool,
    /// Aggregated from the per-artifact reports.
    pub artifacts_with_warnings: usize,
    pub artifacts_with_errors: usize,
    pub escalated: bool,
    pub report_path: PathBuf,
}

struct ArtifactOutcome {
    attempted: bool,
    had_warning: bool,
    had_error: bool,
}

/// Run one migration: a pure function of (configuration, collaborators).
pub fn run(config: &MigrationConfig, collaborators: &Collaborators) -> Result<RunSummary> {
    let reports_root = normalize_reports_root(&config.reports_path)?;
    let source_root = normalize_source_root(&config.source.path)?;
    let target_root = normalize_target_root(&config.target.path)?;

    let mut batch = FileReporter::open(&reports_root, BATCH_REPORT_NAME)?;

    tracing::info!(root = %source_root.display(), "discovering artifacts");
    let artifacts = match collaborators
        .discoverer
        .discover(&source_root, &mut batch, &config.blacklist)
    {
        Ok(artifacts) => Some(artifacts),
        Err(e) => {
            // The run still completes, reports, and escalates.
            batch.error(&format!(
                "error discovering artifacts in source repository: {e}"
            ))?;
            None
        }
    };

    let mut discovered = 0;
    let mut rewritten = 0;
    let mut artifacts_with_warnings = 0;
    let mut artifacts_with_errors = 0;
    if let Some(mut artifacts) = artifacts {
        discovered = artifacts.len();

        if let Err(e) = collaborators.indexer.write_index(&artifacts, &target_root) {
            batch.error(&format!(
                "error writing artifact index into the target repository: {e}"
            ))?;
        }

        tracing::info!(count = discovered, "rewriting artifacts and metadata");
        for artifact in &mut artifacts {
            let outcome = process_artifact(
                artifact,
                config,
                collaborators,
                &source_root,
                &target_root,
                &reports_root,
                &mut batch,
            )?;
            if outcome.attempted {
                rewritten += 1;
            }
            if outcome.had_warning {
                artifacts_with_warnings += 1;
            }
            if outcome.had_error {
                artifacts_with_errors += 1;
            }
        }
        tracing::info!(rewritten, discovered, "artifact rewrite pass complete");
    }

    let has_error = batch.has_error();
    let has_warning = batch.has_warning();
    if has_error {
        tracing::error!("error(s) encountered while migrating source repository to target");
    }
    if has_warning {
        tracing::warn!("warning(s) encountered while migrating one or more artifacts");
    }

    let report_path = batch.path().to_path_buf();
    batch.close()?;

    let mut escalated = false;
    if has_error && config.mail.error_report {
        // Best-effort: a delivery failure is logged, not recorded (the batch
        // report is already closed), and never retried.
        match escalate(&report_path, config, collaborators) {
            Ok(()) => escalated = true,
            Err(e) => tracing::warn!("failed to send error report mail: {e}"),
        }
    }

    Ok(RunSummary {
        discovered,
        rewritten,
        has_warning,
        has_error,
        artifacts_with_warnings,
        artifacts_with_errors,
        escalated,
        report_path,
    })
}

/// Process one artifact under an artifact-scoped report that is closed on
/// every exit path.
fn process_artifact(
    artifact: &mut Artifact,
    config: &MigrationConfig,
    collaborators: &Collaborators,
    source_root: &Path,
    target_root: &Path,
    reports_root: &Path,
    batch: &mut FileReporter,
) -> Result<ArtifactOutcome> {
    let mut reporter = match FileReporter::open(reports_root, &artifact.report_path()) {
        Ok(reporter) => reporter,
        Err(e) => {
            batch.error(&format!(
                "failed to open report for artifact `{}`: {e}",
                artifact.id()
            ))?;
            return Ok(ArtifactOutcome {
                attempted: false,
                had_warning: false,
                had_error: true,
            });
        }
    };

    let outcome = pipeline(
        artifact,
        config,
        collaborators,
        source_root,
        target_root,
        batch,
        &mut reporter,
    );
    let attempted = match outcome {
        Ok(attempted) => attempted,
        Err(e) => {
            // Any failure escaping a stage still lands in this artifact's
            // report before the report is closed.
            if reporter
                .error(&format!(
                    "unexpected failure while migrating artifact `{}`: {e}",
                    artifact.id()
                ))
                .is_err()
            {
                tracing::error!(artifact = %artifact.id(), "failed to record pipeline failure: {e}");
            }
            false
        }
    };

    let had_warning = reporter.has_warning();
    let had_error = reporter.has_error();
    let artifact_report = reporter.path().to_path_buf();
    if let Err(e) = reporter.close() {
        tracing::warn!("failed to close artifact report: {e}");
    }
    if had_error {
        batch.warn(&format!(
            "error(s) occurred while migrating artifact `{}`; see report at `{}`",
            artifact.id(),
            artifact_report.display()
        ))?;
    }
    Ok(ArtifactOutcome {
        attempted,
        had_warning,
        had_error,
    })
}

/// The per-artifact pipeline: gate, copy, verify, rewrite, bridge.
fn pipeline(
    artifact: &mut Artifact,
    config: &MigrationConfig,
    collaborators: &Collaborators,
    source_root: &Path,
    target_root: &Path,
    batch: &mut FileReporter,
    reporter: &mut FileReporter,
) -> std::result::Result<bool, ReportError> {
    let source_path = source_root.join(collaborators.source_layout.artifact_path(artifact));
    let target_path = target_root.join(collaborators.target_layout.artifact_path(artifact));
    // The resolved source location is authoritative for the rest of this
    // artifact's processing.
    artifact.source_file = Some(source_path.clone());

    let stale = is_stale(&source_path, &target_path);

    if !source_path.exists() {
        reporter.error(&format!(
            "cannot find source file for artifact `{}` under `{}`",
            artifact.id(),
            source_path.display()
        ))?;
        return Ok(false);
    }
    if !config.force && !stale {
        // The idempotent fast path.
        reporter.warn(&format!(
            "target file for artifact `{}` is present and not stale (source `{}`, target `{}`)",
            artifact.id(),
            source_path.display(),
            target_path.display()
        ))?;
        return Ok(false);
    }

    let mut copy_failed = false;
    if !config.report_only {
        tracing::debug!(
            artifact = %artifact.id(),
            from = %source_path.display(),
            to = %target_path.display(),
            "copying artifact"
        );
        if let Err(e) = copy_artifact(&source_path, &target_path) {
            // Batch-level: the artifact never made it to the target tree.
            batch.error(&format!(
                "error transferring artifact `{}` to the target repository: {e}",
                artifact.id()
            ))?;
            copy_failed = true;
        }
    }

    // Digest verification and metadata work are meaningless against a file
    // that failed to transfer.
    if !copy_failed
        && let Err(e) =
            collaborators
                .verifier
                .verify(artifact, &target_path, reporter, config.report_only)
    {
        // A verification failure does not block the metadata rewrite.
        batch.error(&format!(
            "error verifying digest for artifact `{}`: {e}",
            artifact.id()
        ))?;
    }

    if !copy_failed {
        let descriptor = artifact.metadata();
        let source_meta = source_root.join(collaborators.source_layout.metadata_path(&descriptor));
        let target_meta = target_root.join(collaborators.target_layout.metadata_path(&descriptor));
        let bridged_meta =
            target_root.join(collaborators.bridging_layout.metadata_path(&descriptor));

        match collaborators.rewriter.rewrite(
            artifact,
            &source_meta,
            &target_meta,
            reporter,
            config.report_only,
        ) {
            Ok(()) => {
                if bridged_meta == target_meta {
                    reporter.warn(&format!(
                        "cannot create legacy-compatible copy of metadata at `{}`: the bridged path is the rewritten descriptor itself",
                        target_meta.display()
                    ))?;
                } else if !config.report_only
                    && let Err(e) = bridge_metadata(&target_meta, &bridged_meta)
                {
                    batch.error(&format!(
                        "error bridging metadata for artifact `{}` to `{}`: {e}",
                        artifact.id(),
                        bridged_meta.display()
                    ))?;
                }
            }
            Err(e) => {
                batch.error(&format!(
                    "error rewriting metadata for artifact `{}` into the target repository: {e}",
                    artifact.id()
                ))?;
            }
        }
    }

    Ok(true)
}

/// Target missing or older than its corresponding source file.
fn is_stale(source: &Path, target: &Path) -> bool {
    let Ok(target_meta) = fs::metadata(target) else {
        return true;
    };
    let Ok(source_meta) = fs::metadata(source) else {
        return true;
    };
    match (target_meta.modified(), source_meta.modified()) {
        (Ok(target_mtime), Ok(source_mtime)) => target_mtime < source_mtime,
        _ => true,
    }
}

fn copy_artifact(source: &Path, target: &Path) -> std::io::Result<()> {
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::copy(source, target)?;
    Ok(())
}

/// Byte-for-byte duplicate of the rewritten metadata at the bridged path.
fn bridge_metadata(target_meta: &Path, bridged_meta: &Path) -> std::io::Result<()> {
    if let Some(dir) = bridged_meta.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::copy(target_meta, bridged_meta)?;
    Ok(())
}

fn escalate(
    report_path: &Path,
    config: &MigrationConfig,
    collaborators: &Collaborators,
) -> std::result::Result<(), NotifyError> {
    let body = fs::read_to_string(report_path).map_err(|e| NotifyError::Compose {
        reason: format!(
            "failed to read batch report `{}`: {e}",
            report_path.display()
        ),
    })?;
    let message = MailMessage {
        subject: config.mail.subject.clone(),
        from_name: config.mail.from_name.clone(),
        from_address: config.mail.from_address.clone(),
        to_name: config.mail.to_name.clone(),
        to_address: config.mail.to_address.clone(),
        sent_at: Utc::now(),
        body,
    };
    collaborators.notifier.send(&message)
}

fn normalize_reports_root(path: &Path) -> std::result::Result<PathBuf, SetupError> {
    create_or_validate(path, "reports")
}

fn normalize_source_root(path: &Path) -> std::result::Result<PathBuf, SetupError> {
    tracing::info!(path = %path.display(), "source repository");
    if !path.exists() {
        let err = SetupError::SourceMissing {
            path: path.to_path_buf(),
        };
        tracing::error!("{err}");
        return Err(err);
    }
    if !path.is_dir() {
        let err = SetupError::NotADirectory {
            role: "source",
            path: path.to_path_buf(),
        };
        tracing::error!("{err}");
        return Err(err);
    }
    Ok(path.to_path_buf())
}

fn normalize_target_root(path: &Path) -> std::result::Result<PathBuf, SetupError> {
    tracing::info!(path = %path.display(), "target repository");
    create_or_validate(path, "target")
}

fn create_or_validate(path: &Path, role: &'static str) -> std::result::Result<PathBuf, SetupError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "creating {role} directory");
        fs::create_dir_all(path).map_err(|e| {
            let err = SetupError::Create {
                role,
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
            tracing::error!("{err}");
            err
        })?;
    } else if !path.is_dir() {
        let err = SetupError::NotADirectory {
            role,
            path: path.to_path_buf(),
        };
        tracing::error!("{err}");
        return Err(err);
    }
    Ok(path.to_path_buf())
}
