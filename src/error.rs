use thiserror::Error;

use crate::config::ConfigError;
use crate::digest::DigestError;
use crate::discover::DiscoverError;
use crate::index::IndexError;
use crate::migrate::SetupError;
use crate::notify::NotifyError;
use crate::report::ReportError;
use crate::rewrite::RewriteError;

/// Top-level error returned by the CLI and orchestrator entry points.
///
/// Each variant wraps one capability's error type unchanged; callers that
/// care about a specific failure match on that capability's enum directly.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Discover(#[from] DiscoverError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}
