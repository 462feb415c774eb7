//! Configuration management for `tmplscrub-core`.
//!
//! The built-in defaults live in `config/default_config.yaml` and are embedded
//! at compile time. A user file is parsed into `ScrubConfigOverrides` (every key
//! optional) and merged over the defaults, then the result is validated.
//!
//! License: MIT OR Apache-2.0

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Named groups the verifier's error pattern must define.
pub const REQUIRED_PATTERN_GROUPS: [&str; 4] = ["kind", "line", "detail", "file"];

/// Placeholder in verifier args replaced by a scratch output directory.
pub const OUT_DIR_PLACEHOLDER: &str = "{out_dir}";

/// Settings for the optional site-build verification step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VerifierConfig {
    /// Program to run (looked up on `PATH`).
    pub command: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    /// Regex with named groups `kind`, `line`, `detail`, `file`.
    pub error_pattern: String,
}

impl VerifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScrubConfig {
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub raw_open_marker: String,
    pub raw_close_marker: String,
    pub escape_tag_delimiters: bool,
    #[serde(default)]
    pub jobs: Option<usize>,
    pub verifier: VerifierConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierOverrides {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub error_pattern: Option<String>,
}

/// A user configuration file. Absent keys keep their default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrubConfigOverrides {
    pub extensions: Option<Vec<String>>,
    pub exclude_dirs: Option<Vec<String>>,
    pub raw_open_marker: Option<String>,
    pub raw_close_marker: Option<String>,
    pub escape_tag_delimiters: Option<bool>,
    pub jobs: Option<usize>,
    pub verifier: Option<VerifierOverrides>,
}

impl ScrubConfig {
    /// Loads the defaults embedded in the binary.
    pub fn load_default() -> Result<Self> {
        debug!("Loading default configuration from embedded string...");
        let default_yaml = include_str!("../config/default_config.yaml");
        let config: ScrubConfig =
            serde_yml::from_str(default_yaml).context("Failed to parse default configuration")?;
        Ok(config)
    }

    /// Loads a user file and merges it over the defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let overrides = ScrubConfigOverrides::from_yaml(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let config = merge_config(Self::load_default()?, Some(overrides));
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults, or defaults merged with `path` when given.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Self::load_default(),
        }
    }

    /// Checks the invariants the pipeline and verifier rely on.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            errors.push("`extensions` must name at least one file extension.".to_string());
        }
        for (key, marker) in [
            ("raw_open_marker", &self.raw_open_marker),
            ("raw_close_marker", &self.raw_close_marker),
        ] {
            if marker.trim().is_empty() || marker.contains(char::is_whitespace) {
                errors.push(format!("`{}` must be a single non-empty word.", key));
            }
        }
        if self.jobs == Some(0) {
            errors.push("`jobs` must be at least 1.".to_string());
        }
        if self.verifier.command.trim().is_empty() {
            errors.push("`verifier.command` must not be empty.".to_string());
        }
        if self.verifier.timeout_secs == 0 {
            errors.push("`verifier.timeout_secs` must be greater than zero.".to_string());
        }
        match Regex::new(&self.verifier.error_pattern) {
            Ok(re) => {
                let names: Vec<&str> = re.capture_names().flatten().collect();
                for group in REQUIRED_PATTERN_GROUPS {
                    if !names.contains(&group) {
                        errors.push(format!(
                            "`verifier.error_pattern` is missing the named group '{}'.",
                            group
                        ));
                    }
                }
            }
            Err(e) => errors.push(format!("`verifier.error_pattern` is not a valid regex: {}", e)),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Configuration validation failed:\n{}", errors.join("\n")))
        }
    }

    /// Whether `ext` (without the dot) is one of the configured extensions.
    pub fn matches_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

impl ScrubConfigOverrides {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(text)?)
    }
}

/// Merges user overrides into the defaults, key by key.
pub fn merge_config(default: ScrubConfig, overrides: Option<ScrubConfigOverrides>) -> ScrubConfig {
    let Some(user) = overrides else {
        return default;
    };
    let mut merged = default;

    if let Some(v) = user.extensions {
        merged.extensions = v;
    }
    if let Some(v) = user.exclude_dirs {
        merged.exclude_dirs = v;
    }
    if let Some(v) = user.raw_open_marker {
        merged.raw_open_marker = v;
    }
    if let Some(v) = user.raw_close_marker {
        merged.raw_close_marker = v;
    }
    if let Some(v) = user.escape_tag_delimiters {
        merged.escape_tag_delimiters = v;
    }
    if user.jobs.is_some() {
        merged.jobs = user.jobs;
    }
    if let Some(verifier) = user.verifier {
        if let Some(v) = verifier.command {
            merged.verifier.command = v;
        }
        if let Some(v) = verifier.args {
            merged.verifier.args = v;
        }
        if let Some(v) = verifier.timeout_secs {
            debug!("Overriding verifier timeout with user value: {}s", v);
            merged.verifier.timeout_secs = v;
        }
        if let Some(v) = verifier.error_pattern {
            merged.verifier.error_pattern = v;
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_are_valid() {
        let config = ScrubConfig::load_default().unwrap();
        config.validate().unwrap();
        assert_eq!(config.raw_open_marker, "raw");
        assert_eq!(config.raw_close_marker, "endraw");
        assert!(!config.escape_tag_delimiters);
        assert!(config.matches_extension("md"));
        assert!(config.matches_extension("MARKDOWN"));
        assert!(!config.matches_extension("rs"));
    }

    #[test]
    fn merge_only_replaces_present_keys() {
        let overrides = ScrubConfigOverrides::from_yaml(
            "escape_tag_delimiters: true\nverifier:\n  timeout_secs: 5\n",
        )
        .unwrap();
        let merged = merge_config(ScrubConfig::load_default().unwrap(), Some(overrides));
        assert!(merged.escape_tag_delimiters);
        assert_eq!(merged.verifier.timeout_secs, 5);
        assert_eq!(merged.verifier.command, "bundle");
        assert_eq!(merged.extensions, vec!["md".to_string(), "markdown".to_string()]);
    }

    #[test]
    fn validation_rejects_pattern_without_groups() {
        let mut config = ScrubConfig::load_default().unwrap();
        config.verifier.error_pattern = "Liquid Exception: (.*)".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("named group 'kind'"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ScrubConfigOverrides::from_yaml("extentions: [md]\n").is_err());
    }
}
