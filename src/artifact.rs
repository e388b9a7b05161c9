//! Artifact coordinates and the metadata descriptor derived from them.
//!
//! An artifact is identified by group, name, version, an optional classifier,
//! and an extension. Discoverers create artifacts; the orchestrator binds the
//! resolved source file onto them while processing.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A uniquely identified build output in the source repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub group: String,
    pub name: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
    /// Resolved source file, assigned by the orchestrator during processing.
    #[serde(skip)]
    pub source_file: Option<PathBuf>,
}

impl Artifact {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            classifier: None,
            extension: extension.into(),
            source_file: None,
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// `group:name:version[:classifier]`.
    pub fn id(&self) -> String {
        match &self.classifier {
            Some(classifier) => {
                format!("{}:{}:{}:{}", self.group, self.name, self.version, classifier)
            }
            None => format!("{}:{}:{}", self.group, self.name, self.version),
        }
    }

    /// `name-version[-classifier].extension`.
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.name, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.name, self.version, self.extension),
        }
    }

    /// Where this artifact's processing report lives under the reports root:
    /// `group-path/name/extension/[classifier-]version.report.txt`, with every
    /// `.` in the group replaced by a path separator.
    pub fn report_path(&self) -> String {
        let group_path = self.group.replace('.', "/");
        let version = match &self.classifier {
            Some(classifier) => format!("{classifier}-{}", self.version),
            None => self.version.clone(),
        };
        format!(
            "{group_path}/{}/{}/{version}.report.txt",
            self.name, self.extension
        )
    }

    /// Derive the published descriptor document for this artifact.
    pub fn metadata(&self) -> MetadataDescriptor {
        MetadataDescriptor {
            group: self.group.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// The artifact's published descriptor document (one per artifact).
///
/// Always derived on demand from an [`Artifact`]; never created independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDescriptor {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl MetadataDescriptor {
    /// `name-version.meta.toml`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.meta.toml", self.name, self.version)
    }
}

impl fmt::Display for MetadataDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}
