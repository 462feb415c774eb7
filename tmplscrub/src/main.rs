// tmplscrub/src/main.rs
//! tmplscrub entry point.
//!
//! Parses arguments, loads configuration and theme, then hands off to the
//! scrub command. Exit status: 0 on success, 1 when a file failed or the
//! site build still reports template errors, 2 on setup errors.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use is_terminal::IsTerminal;
use log::{debug, warn};

use tmplscrub::cli::Cli;
use tmplscrub::commands::scrub::{run_scrub, ScrubOptions};
use tmplscrub::logger;
use tmplscrub::ui::output_format::print_error_message;
use tmplscrub::ui::theme::{build_theme_map, ThemeMap, ThemeStyle};
use tmplscrub_core::{CancelToken, ScrubConfig};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logger::init_logger(cli.log_level());

    let theme = match build_theme_map(cli.theme.as_ref()).context("Theme error") {
        Ok(theme) => theme,
        Err(e) => return setup_failure(&e, &ThemeStyle::default_theme_map()),
    };

    match scrub(&cli, &theme).await {
        Ok(code) => code,
        Err(e) => setup_failure(&e, &theme),
    }
}

async fn scrub(cli: &Cli, theme: &ThemeMap) -> Result<ExitCode> {
    let config = ScrubConfig::resolve(cli.config.as_deref())?;
    debug!("Effective configuration: {:?}", config);

    let opts = ScrubOptions {
        paths: cli.paths.clone(),
        dry_run: cli.dry_run,
        verify: cli.verify,
        diff: cli.diff,
        json: cli.json,
        quiet: cli.quiet,
        jobs: cli.jobs.map(usize::from),
        verify_timeout: cli.verify_timeout,
        site_root: cli.site_root.clone(),
    };

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing files in progress and skipping the rest.");
            on_interrupt.cancel();
        }
    });

    let report = run_scrub(&opts, &config, theme, cancel).await?;
    Ok(report.exit_code())
}

fn setup_failure(err: &anyhow::Error, theme: &ThemeMap) -> ExitCode {
    let stderr = io::stderr();
    let color = stderr.is_terminal();
    let _ = print_error_message(&mut stderr.lock(), &format!("{:#}", err), theme, color);
    ExitCode::from(2)
}
