//! Logger initialization for the `tmplscrub` binary.
//!
//! Logs go to stderr through `env_logger`. `RUST_LOG` is honoured unless a
//! command-line flag overrides the level for this workspace's crates.

use env_logger::{Builder, Env};
use log::LevelFilter;

const DEFAULT_FILTER: &str = "warn,tmplscrub=info,tmplscrub_core=info";

/// Initializes the global logger. Safe to call more than once.
///
/// `Some(LevelFilter::Off)` silences everything; any other override applies
/// to the `tmplscrub` crates only.
pub fn init_logger(level_override: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));
    builder.format_timestamp(None);

    match level_override {
        Some(LevelFilter::Off) => {
            builder.filter_level(LevelFilter::Off);
        }
        Some(level) => {
            builder
                .filter_module("tmplscrub", level)
                .filter_module("tmplscrub_core", level);
        }
        None => {}
    }

    // A logger may already be installed (e.g. by tests).
    builder.try_init().ok();
}
