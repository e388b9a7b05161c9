//! End-to-end migration runs against temp repositories.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use repolift::artifact::Artifact;
use repolift::config::MigrationConfig;
use repolift::digest::{DigestError, DigestVerifier, Sha256Verifier};
use repolift::discover::{DiscoverError, Discoverer};
use repolift::migrate::{self, Collaborators};
use repolift::notify::{MailMessage, Notifier, NotifyError};
use repolift::report::FileReporter;
use repolift::rewrite::{MetadataRewriter, RewriteError, rewriter_for};

struct StubDiscoverer {
    artifacts: Vec<Artifact>,
}

impl Discoverer for StubDiscoverer {
    fn discover(
        &self,
        _root: &Path,
        _report: &mut FileReporter,
        _blacklist: &[String],
    ) -> Result<Vec<Artifact>, DiscoverError> {
        Ok(self.artifacts.clone())
    }
}

struct FailingDiscoverer;

impl Discoverer for FailingDiscoverer {
    fn discover(
        &self,
        root: &Path,
        _report: &mut FileReporter,
        _blacklist: &[String],
    ) -> Result<Vec<Artifact>, DiscoverError> {
        Err(DiscoverError::Walk {
            root: root.to_path_buf(),
            reason: "scan interrupted".to_string(),
        })
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().expect("notifier lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: &MailMessage) -> Result<(), NotifyError> {
        self.sent.lock().expect("notifier lock").push(message.clone());
        Ok(())
    }
}

struct CountingVerifier {
    calls: Arc<AtomicUsize>,
}

impl DigestVerifier for CountingVerifier {
    fn verify(
        &self,
        artifact: &Artifact,
        target: &Path,
        report: &mut FileReporter,
        report_only: bool,
    ) -> Result<(), DigestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Sha256Verifier.verify(artifact, target, report, report_only)
    }
}

struct CountingRewriter {
    calls: Arc<AtomicUsize>,
    inner: Box<dyn MetadataRewriter>,
}

impl MetadataRewriter for CountingRewriter {
    fn rewrite(
        &self,
        artifact: &Artifact,
        source: &Path,
        target: &Path,
        report: &mut FileReporter,
        report_only: bool,
    ) -> Result<(), RewriteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .rewrite(artifact, source, target, report, report_only)
    }
}

fn test_config(root: &Path) -> MigrationConfig {
    let mut cfg = MigrationConfig::default();
    cfg.reports_path = root.join("reports");
    cfg.source.path = root.join("source");
    cfg.target.path = root.join("target");
    cfg
}

fn collaborators(cfg: &MigrationConfig, notifier: RecordingNotifier) -> Collaborators {
    let mut collaborators = Collaborators::from_config(cfg).expect("collaborators");
    collaborators.notifier = Box::new(notifier);
    collaborators
}

/// Seed `group:name:version` (jar) plus its v1 descriptor into a flat source
/// repository.
fn seed_flat_artifact(source: &Path, group: &str, name: &str, version: &str) -> PathBuf {
    let jars = source.join(group).join("jars");
    fs::create_dir_all(&jars).expect("create jars dir");
    let artifact = jars.join(format!("{name}-{version}.jar"));
    fs::write(&artifact, format!("{group}:{name}:{version} bytes")).expect("write artifact");

    let meta = source.join(group).join("meta");
    fs::create_dir_all(&meta).expect("create meta dir");
    fs::write(
        meta.join(format!("{name}-{version}.meta.toml")),
        format!(
            "schema = \"v1\"\ngroup = \"{group}\"\nname = \"{name}\"\nversion = \"{version}\"\npackaging = \"jar\"\n"
        ),
    )
    .expect("write descriptor");
    artifact
}

fn age(path: &Path, seconds: u64) {
    let file = fs::File::options()
        .write(true)
        .open(path)
        .expect("open for aging");
    file.set_modified(SystemTime::now() - Duration::from_secs(seconds))
        .expect("set mtime");
}

#[test]
fn fresh_artifact_is_copied_verified_rewritten_and_bridged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path());
    seed_flat_artifact(&cfg.source.path, "org.example", "lib", "1.0");

    let notifier = RecordingNotifier::default();
    let summary = migrate::run(&cfg, &collaborators(&cfg, notifier)).expect("run");

    assert_eq!(summary.discovered, 1);
    assert_eq!(summary.rewritten, 1);
    assert!(!summary.has_error);

    let target = &cfg.target.path;
    assert!(target.join("org/example/lib/1.0/lib-1.0.jar").exists());
    assert!(target.join("org/example/lib/1.0/lib-1.0.jar.sha256").exists());
    assert!(target.join("org/example/lib/1.0/lib-1.0.meta.toml").exists());
    // Bridging copy at the flat-layout metadata path.
    assert!(target.join("org.example/meta/lib-1.0.meta.toml").exists());
    assert!(target.join(".index.json").exists());

    let report = cfg
        .reports_path
        .join("org/example/lib/jar/1.0.report.txt");
    assert!(report.exists());
}

#[test]
fn second_run_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path());
    let source_artifact = seed_flat_artifact(&cfg.source.path, "org.example", "lib", "1.0");
    // Keep the source clearly older than anything the first run writes.
    age(&source_artifact, 3600);

    let notifier = RecordingNotifier::default();
    let first = migrate::run(&cfg, &collaborators(&cfg, notifier.clone())).expect("first run");
    assert_eq!(first.rewritten, 1);

    let second = migrate::run(&cfg, &collaborators(&cfg, notifier)).expect("second run");
    assert_eq!(second.discovered, 1);
    assert_eq!(second.rewritten, 0);
    assert_eq!(second.artifacts_with_warnings, 1);
    assert!(!second.has_error);

    let report = fs::read_to_string(
        cfg.reports_path.join("org/example/lib/jar/1.0.report.txt"),
    )
    .expect("read artifact report");
    assert!(report.contains("present and not stale"));
}

#[test]
fn force_reprocesses_a_fresh_target() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(dir.path());
    let source_artifact = seed_flat_artifact(&cfg.source.path, "org.example", "lib", "1.0");
    age(&source_artifact, 3600);

    let notifier = RecordingNotifier::default();
    migrate::run(&cfg, &collaborators(&cfg, notifier.clone())).expect("first run");

    cfg.force = true;
    let summary = migrate::run(&cfg, &collaborators(&cfg, notifier)).expect("forced run");
    assert_eq!(summary.rewritten, 1);
    assert_eq!(summary.artifacts_with_warnings, 0);
}

#[test]
fn target_newer_than_source_is_skipped_without_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path());
    let source_artifact = seed_flat_artifact(&cfg.source.path, "org.example", "lib", "1.0");
    age(&source_artifact, 3600);

    let target_artifact = cfg.target.path.join("org/example/lib/1.0/lib-1.0.jar");
    fs::create_dir_all(target_artifact.parent().expect("parent")).expect("mkdirs");
    fs::write(&target_artifact, b"already migrated").expect("write target");

    let notifier = RecordingNotifier::default();
    let summary = migrate::run(&cfg, &collaborators(&cfg, notifier)).expect("run");

    assert_eq!(summary.rewritten, 0);
    assert_eq!(summary.artifacts_with_warnings, 1);
    assert!(!summary.has_error);
    // No writes: the pre-seeded bytes survive.
    assert_eq!(
        fs::read(&target_artifact).expect("read target"),
        b"already migrated"
    );
    assert!(!target_artifact.with_extension("jar.sha256").exists());
}

#[test]
fn report_only_writes_no_artifact_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(dir.path());
    cfg.report_only = true;
    cfg.mail.error_report = true;
    cfg.mail.to_address = "admin@example.org".to_string();
    seed_flat_artifact(&cfg.source.path, "org.example", "lib", "1.0");

    let notifier = RecordingNotifier::default();
    let summary = migrate::run(&cfg, &collaborators(&cfg, notifier.clone())).expect("run");

    assert_eq!(summary.rewritten, 1);
    // A dry run of a migration that would succeed must not read as an
    // error run, and must not escalate.
    assert!(!summary.has_error);
    assert!(!summary.escalated);
    assert!(notifier.sent().is_empty());
    let target = &cfg.target.path;
    assert!(!target.join("org/example/lib/1.0/lib-1.0.jar").exists());
    assert!(!target.join("org/example/lib/1.0/lib-1.0.jar.sha256").exists());
    assert!(!target.join("org/example/lib/1.0/lib-1.0.meta.toml").exists());
    assert!(!target.join("org.example/meta/lib-1.0.meta.toml").exists());
    // The reports still exist and reflect what would have happened.
    assert!(
        cfg.reports_path
            .join("org/example/lib/jar/1.0.report.txt")
            .exists()
    );
}

#[test]
fn transfer_failure_is_isolated_and_blocks_verify_and_rewrite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path());
    seed_flat_artifact(&cfg.source.path, "bad.group", "broken", "1.0");
    seed_flat_artifact(&cfg.source.path, "org.example", "lib", "1.0");

    // A file where the first artifact's target group directory should be
    // makes its copy fail; the second artifact is unaffected.
    fs::create_dir_all(&cfg.target.path).expect("create target root");
    fs::write(cfg.target.path.join("bad"), b"in the way").expect("write blocker");

    let verify_calls = Arc::new(AtomicUsize::new(0));
    let rewrite_calls = Arc::new(AtomicUsize::new(0));
    let notifier = RecordingNotifier::default();
    let mut collaborators = collaborators(&cfg, notifier);
    collaborators.verifier = Box::new(CountingVerifier {
        calls: verify_calls.clone(),
    });
    collaborators.rewriter = Box::new(CountingRewriter {
        calls: rewrite_calls.clone(),
        inner: rewriter_for(&cfg.source_schema).expect("rewriter"),
    });

    let summary = migrate::run(&cfg, &collaborators).expect("run");

    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.rewritten, 2);
    assert!(summary.has_error);
    // The failed copy blocked both delegates for that artifact only.
    assert_eq!(verify_calls.load(Ordering::SeqCst), 1);
    assert_eq!(rewrite_calls.load(Ordering::SeqCst), 1);
    assert!(
        cfg.target
            .path
            .join("org/example/lib/1.0/lib-1.0.jar")
            .exists()
    );
}

#[test]
fn escalation_fires_only_with_errors_and_mail_enabled() {
    // Errors + mail enabled: one message carrying the report body.
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(dir.path());
    cfg.mail.error_report = true;
    cfg.mail.to_address = "admin@example.org".to_string();
    seed_flat_artifact(&cfg.source.path, "bad.group", "broken", "1.0");
    fs::create_dir_all(&cfg.target.path).expect("create target root");
    fs::write(cfg.target.path.join("bad"), b"in the way").expect("write blocker");

    let notifier = RecordingNotifier::default();
    let summary = migrate::run(&cfg, &collaborators(&cfg, notifier.clone())).expect("run");
    assert!(summary.has_error);
    assert!(summary.escalated);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("error transferring artifact"));
    assert_eq!(sent[0].subject, cfg.mail.subject);

    // Errors but mail disabled: nothing is sent.
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path());
    seed_flat_artifact(&cfg.source.path, "bad.group", "broken", "1.0");
    fs::create_dir_all(&cfg.target.path).expect("create target root");
    fs::write(cfg.target.path.join("bad"), b"in the way").expect("write blocker");

    let notifier = RecordingNotifier::default();
    let summary = migrate::run(&cfg, &collaborators(&cfg, notifier.clone())).expect("run");
    assert!(summary.has_error);
    assert!(!summary.escalated);
    assert!(notifier.sent().is_empty());
}

#[test]
fn warnings_only_run_never_escalates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(dir.path());
    cfg.mail.error_report = true;
    cfg.mail.to_address = "admin@example.org".to_string();
    let source_artifact = seed_flat_artifact(&cfg.source.path, "org.example", "lib", "1.0");
    age(&source_artifact, 3600);

    let notifier = RecordingNotifier::default();
    migrate::run(&cfg, &collaborators(&cfg, notifier.clone())).expect("first run");
    let second = migrate::run(&cfg, &collaborators(&cfg, notifier.clone())).expect("second run");

    assert!(!second.has_error);
    assert_eq!(second.artifacts_with_warnings, 1);
    assert!(!second.escalated);
    assert!(notifier.sent().is_empty());
}

#[test]
fn missing_source_root_is_a_fatal_no_op() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(dir.path());
    cfg.mail.error_report = true;
    cfg.mail.to_address = "admin@example.org".to_string();
    // No source directory is ever created.

    let notifier = RecordingNotifier::default();
    let result = migrate::run(&cfg, &collaborators(&cfg, notifier.clone()));

    assert!(result.is_err());
    assert!(
        !cfg.reports_path
            .join(migrate::BATCH_REPORT_NAME)
            .exists()
    );
    assert!(notifier.sent().is_empty());
}

#[test]
fn missing_source_file_is_an_artifact_error_not_a_batch_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path());
    fs::create_dir_all(&cfg.source.path).expect("create source root");

    // A discoverer that claims an artifact whose file does not exist.
    let notifier = RecordingNotifier::default();
    let mut collaborators = collaborators(&cfg, notifier);
    collaborators.discoverer = Box::new(StubDiscoverer {
        artifacts: vec![Artifact::new("org.example", "ghost", "1.0", "jar")],
    });

    let summary = migrate::run(&cfg, &collaborators).expect("run");

    assert_eq!(summary.discovered, 1);
    assert_eq!(summary.rewritten, 0);
    assert_eq!(summary.artifacts_with_errors, 1);
    // The artifact failure surfaces as a batch warning, not a batch error.
    assert!(!summary.has_error);
    assert!(summary.has_warning);

    let report = fs::read_to_string(
        cfg.reports_path.join("org/example/ghost/jar/1.0.report.txt"),
    )
    .expect("read artifact report");
    assert!(report.contains("cannot find source file"));
}

#[test]
fn discovery_failure_short_circuits_but_still_reports_and_escalates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(dir.path());
    cfg.mail.error_report = true;
    cfg.mail.to_address = "admin@example.org".to_string();
    fs::create_dir_all(&cfg.source.path).expect("create source root");

    let notifier = RecordingNotifier::default();
    let mut collaborators = collaborators(&cfg, notifier.clone());
    collaborators.discoverer = Box::new(FailingDiscoverer);

    let summary = migrate::run(&cfg, &collaborators).expect("run");

    assert_eq!(summary.discovered, 0);
    assert!(summary.has_error);
    assert!(summary.escalated);
    // No indexing or per-artifact processing happened.
    assert!(!cfg.target.path.join(".index.json").exists());
    assert_eq!(notifier.sent().len(), 1);
}
