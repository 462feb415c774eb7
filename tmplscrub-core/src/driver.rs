//! Pipeline driver: runs the sanitizer over a list of files.
//!
//! Each file is read, fixed and (if changed) written back on its own blocking
//! task. A semaphore bounds the number of files in flight. A failure on one
//! file is recorded in its report and never stops the others.
//!
//! License: MIT OR APACHE 2.0

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

use crate::document::Document;
use crate::errors::{ScrubError, ScrubWarning};
use crate::pipeline::{Sanitizer, StageCounts};

const TMP_SUFFIX: &str = ".tmplscrub.tmp";

/// Outcome for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Unchanged,
    Fixed,
    Failed(String),
    /// The run was cancelled before this file was started.
    Cancelled,
}

/// Original and fixed content, kept only when the caller asks for previews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePreview {
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    /// False for unchanged files and for every file in a dry run.
    pub written: bool,
    pub counts: StageCounts,
    pub warnings: Vec<ScrubWarning>,
    #[serde(skip)]
    pub preview: Option<FilePreview>,
}

impl FileReport {
    fn new(path: PathBuf, status: FileStatus) -> Self {
        Self {
            path,
            status,
            written: false,
            counts: StageCounts::default(),
            warnings: Vec::new(),
            preview: None,
        }
    }

    fn failed(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::new(path.to_path_buf(), FileStatus::Failed(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    pub dry_run: bool,
    /// Maximum number of files processed at once.
    pub jobs: usize,
    /// Keep before/after text on changed files.
    pub capture_previews: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: default_jobs(),
            capture_previews: false,
        }
    }
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Cooperative cancellation flag, checked before each file starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub unchanged: usize,
    pub fixed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub warnings: usize,
}

/// Aggregated results of one driver run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub totals: RunTotals,
    pub counts: StageCounts,
    pub files: Vec<FileReport>,
}

impl RunSummary {
    fn from_reports(
        files: Vec<FileReport>,
        dry_run: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut totals = RunTotals::default();
        let mut counts = StageCounts::default();
        for report in &files {
            match report.status {
                FileStatus::Unchanged => totals.unchanged += 1,
                FileStatus::Fixed => totals.fixed += 1,
                FileStatus::Failed(_) => totals.failed += 1,
                FileStatus::Cancelled => totals.cancelled += 1,
            }
            totals.warnings += report.warnings.len();
            counts.add(&report.counts);
        }
        Self {
            started_at,
            finished_at: Utc::now(),
            dry_run,
            totals,
            counts,
            files,
        }
    }

    /// No file failed and none were skipped by cancellation.
    pub fn is_success(&self) -> bool {
        self.totals.failed == 0 && self.totals.cancelled == 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Failed(_)))
    }
}

/// Reads, fixes and (unless `dry_run`) writes one file.
pub fn process_file(
    path: &Path,
    sanitizer: &Sanitizer,
    dry_run: bool,
    capture_preview: bool,
) -> FileReport {
    let doc = match Document::read(path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            return FileReport::failed(path, e);
        }
    };
    let before = doc.render();
    let (fixed, counts, warnings, _) = sanitizer.fix_document(doc);
    let after = fixed.render();

    for w in &warnings {
        warn!("{}: {}", path.display(), w);
    }

    let mut report = FileReport::new(path.to_path_buf(), FileStatus::Unchanged);
    report.counts = counts;
    report.warnings = warnings;

    if after == before {
        debug!("{} is already canonical.", path.display());
        report.counts = counts.net_of_no_change();
        return report;
    }

    if !dry_run {
        if let Err(e) = write_atomically(path, &after) {
            warn!("Failed to write {}: {}", path.display(), e);
            report.status = FileStatus::Failed(e.to_string());
            return report;
        }
        report.written = true;
        info!(
            "Fixed {} ({} escaped, {} repaired).",
            path.display(),
            counts.sequences_escaped,
            counts.repairs()
        );
    } else {
        info!("Would fix {}.", path.display());
    }

    report.status = FileStatus::Fixed;
    if capture_preview {
        report.preview = Some(FilePreview { before, after });
    }
    report
}

/// Writes `content` to a sibling temp file and renames it over `path`.
pub fn write_atomically(path: &Path, content: &str) -> Result<(), ScrubError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}{}", file_name, TMP_SUFFIX));

    let permissions = fs::metadata(path).map_err(|e| ScrubError::io(path, e))?.permissions();
    if let Err(e) = fs::write(&tmp, content) {
        let _ = fs::remove_file(&tmp);
        return Err(ScrubError::io(&tmp, e));
    }
    if let Err(e) = fs::set_permissions(&tmp, permissions).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(ScrubError::io(path, e));
    }
    Ok(())
}

/// The report of a finished task, or a failure naming `path` if the task died.
fn joined_report(path: &Path, joined: Result<FileReport, JoinError>) -> FileReport {
    joined.unwrap_or_else(|e| {
        warn!("Task for {} failed: {}", path.display(), e);
        FileReport::failed(path, format!("task failed: {}", e))
    })
}

/// Processes every path on a bounded pool of blocking tasks.
/// Reports are returned in the order of `paths`.
pub async fn run(
    paths: Vec<PathBuf>,
    sanitizer: Arc<Sanitizer>,
    options: DriverOptions,
    cancel: CancelToken,
) -> RunSummary {
    let started_at = Utc::now();
    let jobs = options.jobs.max(1);
    info!("Processing {} file(s) with {} worker(s).", paths.len(), jobs);

    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let task_path = path.clone();
        let semaphore = Arc::clone(&semaphore);
        let sanitizer = Arc::clone(&sanitizer);
        let cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return FileReport::failed(&path, e),
            };
            if cancel.is_cancelled() {
                debug!("Cancelled before starting {}.", path.display());
                return FileReport::new(path, FileStatus::Cancelled);
            }
            let worker_path = path.clone();
            tokio::task::spawn_blocking(move || {
                process_file(&worker_path, &sanitizer, options.dry_run, options.capture_previews)
            })
            .await
            .unwrap_or_else(|e| FileReport::failed(&path, format!("worker panicked: {}", e)))
        });
        handles.push((task_path, handle));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        reports.push(joined_report(&path, handle.await));
    }

    let summary = RunSummary::from_reports(reports, options.dry_run, started_at);
    info!(
        "Run finished: {} unchanged, {} fixed, {} failed, {} cancelled.",
        summary.totals.unchanged, summary.totals.fixed, summary.totals.failed, summary.totals.cancelled
    );
    summary
}
