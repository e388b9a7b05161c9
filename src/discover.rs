//! Artifact discovery: scan a source root and turn files into coordinates.
//!
//! One discoverer per layout scheme, selected by the source layout id.
//! Discovery problems below the root itself are non-fatal: they are recorded
//! into the run report and the scan continues.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::artifact::Artifact;
use crate::report::{FileReporter, ReportError};

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("failed to scan source repository `{root}`: {reason}")]
    Walk { root: PathBuf, reason: String },
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Enumerates the artifacts under a source root.
///
/// The returned order is preserved and drives report and processing order.
pub trait Discoverer {
    fn discover(
        &self,
        root: &Path,
        report: &mut FileReporter,
        blacklist: &[String],
    ) -> Result<Vec<Artifact>, DiscoverError>;
}

/// Resolve a discoverer from the source layout id.
pub fn discoverer_for(layout_id: &str) -> Option<Box<dyn Discoverer>> {
    match layout_id {
        "flat" => Some(Box::new(FlatDiscoverer)),
        "hierarchical" => Some(Box::new(HierarchicalDiscoverer)),
        _ => None,
    }
}

/// Discovers artifacts in the flat layout: `group/exts/name-version.ext`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatDiscoverer;

impl Discoverer for FlatDiscoverer {
    fn discover(
        &self,
        root: &Path,
        report: &mut FileReporter,
        blacklist: &[String],
    ) -> Result<Vec<Artifact>, DiscoverError> {
        scan(root, report, blacklist, parse_flat)
    }
}

/// Discovers artifacts in the hierarchical layout:
/// `group-as-dirs/name/version/name-version[-classifier].ext`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalDiscoverer;

impl Discoverer for HierarchicalDiscoverer {
    fn discover(
        &self,
        root: &Path,
        report: &mut FileReporter,
        blacklist: &[String],
    ) -> Result<Vec<Artifact>, DiscoverError> {
        scan(root, report, blacklist, parse_hierarchical)
    }
}

fn scan(
    root: &Path,
    report: &mut FileReporter,
    blacklist: &[String],
    parse: fn(&str) -> Option<Artifact>,
) -> Result<Vec<Artifact>, DiscoverError> {
    let mut artifacts = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // The root itself being unreadable is fatal for discovery;
                // anything deeper is recorded and skipped.
                if e.path() == Some(root) || e.path().is_none() {
                    return Err(DiscoverError::Walk {
                        root: root.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
                report.warn(&format!("failed to read entry during discovery: {e}"))?;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let relative = unix_path(relative);

        if is_ancillary(&relative) {
            continue;
        }
        if blacklist.iter().any(|pattern| relative.contains(pattern)) {
            tracing::debug!(path = %relative, "skipping blacklisted path");
            continue;
        }

        match parse(&relative) {
            Some(artifact) => artifacts.push(artifact),
            None => {
                report.warn(&format!(
                    "could not derive artifact coordinates from path `{relative}`"
                ))?;
            }
        }
    }

    tracing::info!(count = artifacts.len(), root = %root.display(), "discovered artifacts");
    Ok(artifacts)
}

fn unix_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Digest files, metadata descriptors, and index files are reconstructed on
/// the target side rather than migrated as artifacts.
fn is_ancillary(relative: &str) -> bool {
    relative.ends_with(".sha256")
        || relative.ends_with(".meta.toml")
        || relative.ends_with(".index.json")
        || relative.ends_with(".report.txt")
}

/// `group/exts/name-version.ext` → artifact; extension comes from the
/// pluralized bucket directory. Classifiers are not representable in the
/// flat scheme.
fn parse_flat(relative: &str) -> Option<Artifact> {
    let parts: Vec<&str> = relative.split('/').collect();
    let [group, bucket, file_name] = parts.as_slice() else {
        return None;
    };
    let extension = bucket.strip_suffix('s')?;
    let stem = file_name.strip_suffix(&format!(".{extension}"))?;
    let (name, version) = split_name_version(stem)?;
    Some(Artifact::new(*group, name, version, extension))
}

/// `group-as-dirs/name/version/name-version[-classifier].ext` → artifact.
fn parse_hierarchical(relative: &str) -> Option<Artifact> {
    let parts: Vec<&str> = relative.split('/').collect();
    if parts.len() < 4 {
        return None;
    }
    let file_name = parts[parts.len() - 1];
    let version = parts[parts.len() - 2];
    let name = parts[parts.len() - 3];
    let group = parts[..parts.len() - 3].join(".");

    let (stem, extension) = file_name.rsplit_once('.')?;
    let prefix = format!("{name}-{version}");
    let rest = stem.strip_prefix(&prefix)?;

    let artifact = Artifact::new(group, name, version, extension);
    if rest.is_empty() {
        Some(artifact)
    } else {
        let classifier = rest.strip_prefix('-')?;
        Some(artifact.with_classifier(classifier))
    }
}

/// Split `name-version` at the rightmost hyphen that introduces a digit.
fn split_name_version(stem: &str) -> Option<(&str, &str)> {
    let bytes = stem.as_bytes();
    for (idx, byte) in bytes.iter().enumerate().rev() {
        if *byte == b'-' {
            let rest = &stem[idx + 1..];
            if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                return Some((&stem[..idx], rest));
            }
        }
    }
    None
}
