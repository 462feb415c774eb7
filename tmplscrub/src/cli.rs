// tmplscrub/src/cli.rs
//! This file defines the command-line interface (CLI) for the tmplscrub application.

use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "tmplscrub",
    author = "Obscura Team (Relay)",
    version = env!("CARGO_PKG_VERSION"),
    about = "Escape template delimiters inside markdown code blocks",
    long_about = "tmplscrub rewrites literal `{{` / `}}` inside fenced code blocks of markdown sources into HTML entities, so a Liquid-based site generator (e.g. Jekyll) does not try to evaluate them. Prose is never modified. Leftovers from earlier fix attempts (stray {% raw %} lines, double-escaped entities) are cleaned up first, so the tool can be re-run safely.",
)]
pub struct Cli {
    /// Files or directories to process.
    #[arg(value_name = "PATH", default_value = ".", help = "Files or directories to scan for markdown sources.")]
    pub paths: Vec<PathBuf>,

    /// Report what would change without writing.
    #[arg(long = "dry-run", help = "Report what would change without writing any file.")]
    pub dry_run: bool,

    /// Run the site build after fixing.
    #[arg(long, help = "Run the site generator afterwards and report remaining template errors.")]
    pub verify: bool,

    /// Show a unified diff for each changed file.
    #[arg(long, short = 'D', help = "Show a unified diff for each changed file.")]
    pub diff: bool,

    /// Print the run report as JSON.
    #[arg(long, help = "Print the run report as JSON on stdout instead of a table.")]
    pub json: bool,

    /// Path to a YAML configuration file.
    #[arg(long, value_name = "FILE", env = "TMPLSCRUB_CONFIG", help = "Path to a YAML configuration file merged over the defaults.")]
    pub config: Option<PathBuf>,

    /// Number of files processed in parallel.
    #[arg(long, short = 'j', value_name = "N", value_parser = clap::value_parser!(u16).range(1..), help = "Number of files processed in parallel.")]
    pub jobs: Option<u16>,

    /// Site build timeout in seconds.
    #[arg(long = "verify-timeout", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..), help = "Timeout in seconds for the --verify build.")]
    pub verify_timeout: Option<u64>,

    /// Working directory for the site build.
    #[arg(long = "site-root", value_name = "DIR", help = "Directory the site generator is run in (defaults to the first directory PATH).")]
    pub site_root: Option<PathBuf>,

    /// Specify the path to a custom YAML theme file.
    #[arg(long = "theme", value_name = "FILE", help = "Specify the path to a custom YAML theme file.")]
    pub theme: Option<PathBuf>,

    /// Disable informational messages
    #[arg(long, short = 'q', conflicts_with = "debug", help = "Suppress logging and the summary table.")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short = 'd', help = "Enable debug logging.")]
    pub debug: bool,
}

impl Cli {
    /// Logger override implied by `--quiet` / `--debug`.
    pub fn log_level(&self) -> Option<LevelFilter> {
        if self.quiet {
            Some(LevelFilter::Off)
        } else if self.debug {
            Some(LevelFilter::Debug)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["tmplscrub"]).unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from(".")]);
        assert!(!cli.dry_run);
        assert_eq!(cli.log_level(), None);
    }

    #[test]
    fn rejects_zero_jobs_and_quiet_with_debug() {
        assert!(Cli::try_parse_from(["tmplscrub", "-j", "0"]).is_err());
        assert!(Cli::try_parse_from(["tmplscrub", "-q", "-d"]).is_err());
        let cli = Cli::try_parse_from(["tmplscrub", "--dry-run", "--verify", "-j", "4", "docs"]).unwrap();
        assert_eq!(cli.jobs, Some(4));
        assert!(cli.dry_run && cli.verify);
    }
}
