//! The scrub command: discover, fix, optionally verify, report.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::{debug, info, warn};
use serde::Serialize;

use tmplscrub_core::{
    run, BuildVerifier, CancelToken, DriverOptions, FileStatus, RunSummary, Sanitizer, ScrubConfig,
    ScrubError, TemplateError, VerifierOutcome,
};
use tmplscrub_core::driver::default_jobs;

use crate::discovery::discover;
use crate::ui::theme::ThemeMap;
use crate::ui::{diff_viewer, output_format, summary};

/// Everything the scrub command needs besides the configuration.
#[derive(Debug, Clone, Default)]
pub struct ScrubOptions {
    pub paths: Vec<PathBuf>,
    pub dry_run: bool,
    pub verify: bool,
    pub diff: bool,
    pub json: bool,
    pub quiet: bool,
    pub jobs: Option<usize>,
    pub verify_timeout: Option<u64>,
    pub site_root: Option<PathBuf>,
}

/// Result of the optional verification step.
#[derive(Debug)]
pub enum Verification {
    Skipped,
    /// Requested, but the run was interrupted first.
    Cancelled,
    Outcome(VerifierOutcome),
    Failed(ScrubError),
}

impl Verification {
    fn passed(&self) -> bool {
        matches!(self, Verification::Skipped | Verification::Outcome(VerifierOutcome::Clean))
    }
}

/// What a finished run produced.
#[derive(Debug)]
pub struct ScrubReport {
    pub summary: RunSummary,
    pub verification: Verification,
    /// Ctrl-C arrived at some point, even if every file had already started.
    pub cancelled: bool,
}

impl ScrubReport {
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.summary.is_success() && self.verification.passed()
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum JsonVerification<'a> {
    Clean,
    Cancelled,
    TemplateErrorsRemain { errors: &'a [TemplateError] },
    Failed { reason: String },
}

#[derive(Serialize)]
struct JsonReport<'a> {
    run: &'a RunSummary,
    cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<JsonVerification<'a>>,
}

fn site_root_for(opts: &ScrubOptions) -> PathBuf {
    opts.site_root
        .clone()
        .or_else(|| opts.paths.iter().find(|p| p.is_dir()).cloned())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Runs the whole command. Errors returned here are setup errors (config,
/// discovery); per-file problems are part of the report instead.
pub async fn run_scrub(
    opts: &ScrubOptions,
    config: &ScrubConfig,
    theme: &ThemeMap,
    cancel: CancelToken,
) -> Result<ScrubReport> {
    info!("Starting tmplscrub run.");

    let files = discover(&opts.paths, config).context("File discovery failed")?;
    if files.is_empty() {
        warn!("No markdown files found under the given paths.");
    }

    let sanitizer = Arc::new(Sanitizer::from_config(config).context("Invalid sanitizer configuration")?);
    let jobs = opts.jobs.or(config.jobs).unwrap_or_else(default_jobs);
    let driver_options = DriverOptions {
        dry_run: opts.dry_run,
        jobs,
        capture_previews: opts.diff,
    };
    debug!("Driver options: {:?}", driver_options);

    let summary = run(files, sanitizer, driver_options, cancel.clone()).await;

    let verification = if !opts.verify {
        Verification::Skipped
    } else if cancel.is_cancelled() {
        warn!("Run was cancelled; skipping the site build.");
        Verification::Cancelled
    } else {
        let mut verifier = BuildVerifier::new(&config.verifier, site_root_for(opts))
            .context("Invalid verifier configuration")?;
        if let Some(secs) = opts.verify_timeout {
            verifier = verifier.with_timeout(std::time::Duration::from_secs(secs));
        }
        match verifier.verify().await {
            Ok(outcome) => Verification::Outcome(outcome),
            Err(e) => Verification::Failed(e),
        }
    };

    let report = ScrubReport {
        summary,
        verification,
        cancelled: cancel.is_cancelled(),
    };
    render_report(&report, opts, theme)?;
    info!("tmplscrub run completed.");
    Ok(report)
}

fn failure_reason(status: &FileStatus) -> &str {
    match status {
        FileStatus::Failed(reason) => reason,
        _ => "",
    }
}

fn render_report(report: &ScrubReport, opts: &ScrubOptions, theme: &ThemeMap) -> Result<()> {
    let stdout = io::stdout();
    let stdout_color = stdout.is_terminal();
    let stderr_color = io::stderr().is_terminal();
    let mut out = stdout.lock();

    if opts.json {
        let verification = match &report.verification {
            Verification::Skipped => None,
            Verification::Cancelled => Some(JsonVerification::Cancelled),
            Verification::Outcome(VerifierOutcome::Clean) => Some(JsonVerification::Clean),
            Verification::Outcome(VerifierOutcome::TemplateErrorsRemain(errors)) => {
                Some(JsonVerification::TemplateErrorsRemain { errors })
            }
            Verification::Failed(e) => Some(JsonVerification::Failed { reason: e.to_string() }),
        };
        let json = serde_json::to_string_pretty(&JsonReport {
            run: &report.summary,
            cancelled: report.cancelled,
            verification,
        })
            .context("Failed to serialize report")?;
        writeln!(out, "{}", json)?;
        return Ok(());
    }

    if opts.diff {
        for file in &report.summary.files {
            if let Some(preview) = &file.preview {
                diff_viewer::print_diff(&file.path, &preview.before, &preview.after, &mut out, theme, stdout_color)?;
            }
        }
    }

    let mut err = io::stderr();
    for file in report.summary.failures() {
        let _ = output_format::print_error_message(
            &mut err,
            &format!("{}: {}", file.path.display(), failure_reason(&file.status)),
            theme,
            stderr_color,
        );
    }

    if !opts.quiet {
        if report.summary.files.is_empty() {
            output_format::print_warn_message(&mut out, "No markdown files found.", theme, stdout_color)?;
        }
        summary::print_summary(&report.summary, &mut out, theme, stdout_color)?;
        if report.summary.dry_run && report.summary.totals.fixed > 0 {
            output_format::print_info_message(&mut out, "Dry run: no files were written.", theme, stdout_color)?;
        }
    }

    match &report.verification {
        Verification::Skipped => {}
        Verification::Cancelled => {
            output_format::print_warn_message(&mut out, "Interrupted before the site build; it was not run.", theme, stdout_color)?;
        }
        Verification::Outcome(VerifierOutcome::Clean) => {
            if !opts.quiet {
                output_format::print_success_message(&mut out, "Site build reports no template errors.", theme, stdout_color)?;
            }
        }
        Verification::Outcome(VerifierOutcome::TemplateErrorsRemain(errors)) => {
            summary::print_template_errors(errors, &mut out, theme, stdout_color)?;
        }
        Verification::Failed(e) => {
            let _ = output_format::print_error_message(&mut err, &format!("Verification failed: {}", e), theme, stderr_color);
        }
    }
    Ok(())
}
