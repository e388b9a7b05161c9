//! CLI surface for repolift.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::{self, MigrationConfig};
use crate::migrate::{self, Collaborators};
use crate::{Error, Result};

#[derive(Parser, Debug)]
#[command(
    name = "repolift",
    version,
    about = "Migrate a repository of versioned build artifacts between layout schemes",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Debug output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a migration.
    Migrate(MigrateArgs),

    /// Write a default configuration file.
    Init(InitArgs),
}

#[derive(clap::Args, Debug)]
pub struct MigrateArgs {
    /// Configuration file (TOML). Flags below override its values.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Reports root directory.
    #[arg(long, value_name = "PATH")]
    pub reports: Option<PathBuf>,

    /// Source repository root.
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,

    /// Target repository root.
    #[arg(long, value_name = "PATH")]
    pub target: Option<PathBuf>,

    /// Source layout id (flat | hierarchical).
    #[arg(long, value_name = "LAYOUT")]
    pub source_layout: Option<String>,

    /// Target layout id (flat | hierarchical).
    #[arg(long, value_name = "LAYOUT")]
    pub target_layout: Option<String>,

    /// Path fragment to exclude from discovery (repeatable).
    #[arg(long, value_name = "PATTERN")]
    pub blacklist: Vec<String>,

    /// Reprocess artifacts even when the target is present and not stale.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Perform no writes to the target tree; only validate and report.
    #[arg(long, default_value_t = false)]
    pub report_only: bool,
}

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Where to write the configuration file.
    #[arg(long, value_name = "PATH", default_value = "repolift.toml")]
    pub path: PathBuf,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Migrate(args) => handle_migrate(args),
        Command::Init(args) => handle_init(args),
    }
}

fn handle_migrate(args: MigrateArgs) -> Result<()> {
    let mut cfg = match &args.config {
        Some(path) => config::load(path)?,
        None => MigrationConfig::default(),
    };
    apply_overrides(&mut cfg, &args);

    let collaborators = Collaborators::from_config(&cfg).map_err(Error::from)?;
    let summary = migrate::run(&cfg, &collaborators)?;

    tracing::info!(
        discovered = summary.discovered,
        rewritten = summary.rewritten,
        errors = summary.has_error,
        warnings = summary.has_warning,
        report = %summary.report_path.display(),
        "migration complete"
    );
    Ok(())
}

fn handle_init(args: InitArgs) -> Result<()> {
    config::write_config(&args.path, &MigrationConfig::default())?;
    tracing::info!(path = %args.path.display(), "wrote default configuration");
    Ok(())
}

fn apply_overrides(cfg: &mut MigrationConfig, args: &MigrateArgs) {
    if let Some(reports) = &args.reports {
        cfg.reports_path = reports.clone();
    }
    if let Some(source) = &args.source {
        cfg.source.path = source.clone();
    }
    if let Some(target) = &args.target {
        cfg.target.path = target.clone();
    }
    if let Some(layout) = &args.source_layout {
        cfg.source.layout = layout.clone();
    }
    if let Some(layout) = &args.target_layout {
        cfg.target.layout = layout.clone();
    }
    if !args.blacklist.is_empty() {
        cfg.blacklist.extend(args.blacklist.iter().cloned());
    }
    if args.force {
        cfg.force = true;
    }
    if args.report_only {
        cfg.report_only = true;
    }
}
