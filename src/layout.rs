//! Layout schemes: pure mappings from coordinates to relative paths.
//!
//! Two layouts may legitimately compute distinct paths for the same artifact;
//! that difference is the whole point of a migration. Layouts are resolved
//! from their string ids once, at configuration-load time.

use std::sync::Arc;

use crate::artifact::{Artifact, MetadataDescriptor};

/// A pure mapping from artifact/metadata coordinates to a relative path.
pub trait Layout: Send + Sync {
    fn id(&self) -> &'static str;

    /// Relative path of the artifact file under a repository root.
    fn artifact_path(&self, artifact: &Artifact) -> String;

    /// Relative path of the metadata descriptor under a repository root.
    fn metadata_path(&self, descriptor: &MetadataDescriptor) -> String;
}

/// Coordinate-addressed layout:
/// `group-as-dirs/name/version/name-version[-classifier].ext`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalLayout;

impl Layout for HierarchicalLayout {
    fn id(&self) -> &'static str {
        "hierarchical"
    }

    fn artifact_path(&self, artifact: &Artifact) -> String {
        format!(
            "{}/{}/{}/{}",
            artifact.group.replace('.', "/"),
            artifact.name,
            artifact.version,
            artifact.file_name()
        )
    }

    fn metadata_path(&self, descriptor: &MetadataDescriptor) -> String {
        format!(
            "{}/{}/{}/{}",
            descriptor.group.replace('.', "/"),
            descriptor.name,
            descriptor.version,
            descriptor.file_name()
        )
    }
}

/// Legacy flat layout: `group/exts/name-version[-classifier].ext`, with the
/// group kept literal (dots are not split) and files bucketed by pluralized
/// extension. Metadata lives under `group/meta/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatLayout;

impl Layout for FlatLayout {
    fn id(&self) -> &'static str {
        "flat"
    }

    fn artifact_path(&self, artifact: &Artifact) -> String {
        format!(
            "{}/{}s/{}",
            artifact.group,
            artifact.extension,
            artifact.file_name()
        )
    }

    fn metadata_path(&self, descriptor: &MetadataDescriptor) -> String {
        format!("{}/meta/{}", descriptor.group, descriptor.file_name())
    }
}

/// Resolve a layout from its configuration id.
pub fn layout_for(id: &str) -> Option<Arc<dyn Layout>> {
    match id {
        "hierarchical" => Some(Arc::new(HierarchicalLayout)),
        "flat" => Some(Arc::new(FlatLayout)),
        _ => None,
    }
}

/// The layout used only to produce legacy-compatible bridging copies of
/// rewritten metadata.
pub fn bridging_layout() -> Arc<dyn Layout> {
    Arc::new(FlatLayout)
}
