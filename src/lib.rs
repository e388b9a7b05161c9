#![forbid(unsafe_code)]

//! repolift migrates a repository of versioned build artifacts (binaries plus
//! their metadata descriptors) from one on-disk layout scheme to another,
//! validating integrity and rewriting metadata so artifacts remain resolvable
//! under the new scheme.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod digest;
pub mod discover;
pub mod error;
pub mod index;
pub mod layout;
pub mod migrate;
pub mod notify;
pub mod report;
pub mod rewrite;
pub mod telemetry;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the main entry points at crate root for convenience
pub use crate::artifact::{Artifact, MetadataDescriptor};
pub use crate::config::MigrationConfig;
pub use crate::migrate::{Collaborators, RunSummary, run};
pub use crate::report::FileReporter;
