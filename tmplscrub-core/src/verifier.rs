//! Build verifier: runs the site generator and looks for template errors.
//!
//! The verifier never touches the sources. It spawns the configured build
//! command with a timeout, strips ANSI colour codes from its output and
//! matches each line against the configured error pattern.
//!
//! License: MIT OR APACHE 2.0

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;
use strip_ansi_escapes::strip;
use tokio::process::Command;

use crate::config::{VerifierConfig, OUT_DIR_PLACEHOLDER};
use crate::errors::ScrubError;

/// Lines of stderr kept when a build fails without recognisable errors.
const STDERR_TAIL_LINES: usize = 20;

/// One template error reported by the site generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateError {
    pub kind: String,
    pub file: String,
    pub line: Option<usize>,
    pub detail: String,
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}: {}", self.file, line, self.kind, self.detail),
            None => write!(f, "{}: {}: {}", self.file, self.kind, self.detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "errors", rename_all = "snake_case")]
pub enum VerifierOutcome {
    Clean,
    TemplateErrorsRemain(Vec<TemplateError>),
}

impl VerifierOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, VerifierOutcome::Clean)
    }
}

/// Extracts template errors from generator output, de-duplicated, in order.
pub fn parse_template_errors(pattern: &Regex, output: &str) -> Vec<TemplateError> {
    let mut errors: Vec<TemplateError> = Vec::new();
    for line in output.lines() {
        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let field = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
        let error = TemplateError {
            kind: field("kind"),
            file: field("file"),
            line: caps.name("line").and_then(|m| m.as_str().parse().ok()),
            detail: field("detail"),
        };
        if !errors.contains(&error) {
            errors.push(error);
        }
    }
    errors
}

fn strip_ansi(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&strip(bytes)).into_owned()
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[derive(Debug, Clone)]
pub struct BuildVerifier {
    command: String,
    args: Vec<String>,
    timeout: Duration,
    pattern: Regex,
    site_root: PathBuf,
}

impl BuildVerifier {
    pub fn new(config: &VerifierConfig, site_root: impl Into<PathBuf>) -> Result<Self, ScrubError> {
        let pattern = Regex::new(&config.error_pattern)
            .map_err(|e| ScrubError::Config(format!("invalid verifier error pattern: {}", e)))?;
        Ok(Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: config.timeout(),
            pattern,
            site_root: site_root.into(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    /// Runs the build once and classifies the result.
    pub async fn verify(&self) -> Result<VerifierOutcome, ScrubError> {
        let out_dir = std::env::temp_dir().join(format!("tmplscrub-verify-{}", std::process::id()));
        let uses_out_dir = self.args.iter().any(|a| a.contains(OUT_DIR_PLACEHOLDER));
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(OUT_DIR_PLACEHOLDER, &out_dir.to_string_lossy()))
            .collect();

        info!(
            "Running site build: {} {} (in {}, timeout {}s)",
            self.command,
            args.join(" "),
            self.site_root.display(),
            self.timeout.as_secs()
        );

        let child = Command::new(&self.command)
            .args(&args)
            .current_dir(&self.site_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScrubError::VerifierBuild {
                status: "failed to start".to_string(),
                stderr_tail: format!("{}: {}", self.command, e),
            })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        if uses_out_dir {
            if let Err(e) = tokio::fs::remove_dir_all(&out_dir).await {
                debug!("Could not remove {}: {}", out_dir.display(), e);
            }
        }

        let output = match result {
            Err(_) => {
                warn!("Site build timed out after {}s.", self.timeout.as_secs());
                return Err(ScrubError::VerifierTimeout { timeout: self.timeout });
            }
            Ok(Err(e)) => {
                return Err(ScrubError::VerifierBuild {
                    status: "wait failed".to_string(),
                    stderr_tail: e.to_string(),
                })
            }
            Ok(Ok(output)) => output,
        };

        let stdout = strip_ansi(&output.stdout);
        let stderr = strip_ansi(&output.stderr);
        let mut errors = parse_template_errors(&self.pattern, &stdout);
        for e in parse_template_errors(&self.pattern, &stderr) {
            if !errors.contains(&e) {
                errors.push(e);
            }
        }

        debug!("Site build exited with {} and {} template error(s).", output.status, errors.len());

        if !errors.is_empty() {
            return Ok(VerifierOutcome::TemplateErrorsRemain(errors));
        }
        if output.status.success() {
            Ok(VerifierOutcome::Clean)
        } else {
            Err(ScrubError::VerifierBuild {
                status: output.status.to_string(),
                stderr_tail: tail(&stderr, STDERR_TAIL_LINES),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrubConfig;

    fn default_pattern() -> Regex {
        Regex::new(&ScrubConfig::load_default().unwrap().verifier.error_pattern).unwrap()
    }

    #[test]
    fn parses_liquid_exception_with_line() {
        let out = "  Liquid Exception: Liquid syntax error (line 3): Variable '{{value}' was not properly terminated with regexp: /\\}\\}/ in docs/guide.md\n";
        let errors = parse_template_errors(&default_pattern(), out);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, "Liquid syntax error");
        assert_eq!(errors[0].line, Some(3));
        assert_eq!(errors[0].file, "docs/guide.md");
        assert!(errors[0].detail.starts_with("Variable '{{value}'"));
        assert_eq!(errors[0].to_string().split(':').next(), Some("docs/guide.md"));
    }

    #[test]
    fn parses_warning_without_line_and_dedupes() {
        let out = "Liquid Warning: Liquid syntax error: Unknown tag 'foo' in notes.md\n\
                   Liquid Warning: Liquid syntax error: Unknown tag 'foo' in notes.md\n\
                   Generating...\n";
        let errors = parse_template_errors(&default_pattern(), out);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, None);
        assert_eq!(errors[0].file, "notes.md");
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
    }
}
