//! The per-document pipeline: strip stray markers, classify, canonicalize, escape.
//!
//! `Sanitizer` holds only compiled, immutable matchers, so one instance can be
//! shared by every worker in the driver.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use serde::Serialize;

use crate::canonicalizer::Canonicalizer;
use crate::classifier::{classify_at, ScanState};
use crate::config::ScrubConfig;
use crate::document::Document;
use crate::errors::{ScrubError, ScrubWarning};
use crate::escaper::EscapeRuleSet;

/// What each stage did to one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub wrapper_lines_removed: usize,
    pub fragments_repaired: usize,
    pub entities_decoded: usize,
    pub sequences_escaped: usize,
    pub code_lines: usize,
}

impl StageCounts {
    /// Repairs made by the canonicalizer.
    pub fn repairs(&self) -> usize {
        self.wrapper_lines_removed + self.fragments_repaired + self.entities_decoded
    }

    /// Counts for a document whose output equals its input: decoding and
    /// re-escaping cancel out, so only the line count is kept.
    pub fn net_of_no_change(self) -> Self {
        Self {
            code_lines: self.code_lines,
            ..Self::default()
        }
    }

    pub fn add(&mut self, other: &StageCounts) {
        self.wrapper_lines_removed += other.wrapper_lines_removed;
        self.fragments_repaired += other.fragments_repaired;
        self.entities_decoded += other.entities_decoded;
        self.sequences_escaped += other.sequences_escaped;
        self.code_lines += other.code_lines;
    }
}

/// Result of running the pipeline over one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    pub output: String,
    pub changed: bool,
    pub counts: StageCounts,
    pub warnings: Vec<ScrubWarning>,
    /// Final state of each output line.
    pub states: Vec<ScanState>,
}

/// Canonicalizer and escaper bundled for repeated use.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    canonicalizer: Canonicalizer,
    escaper: EscapeRuleSet,
}

impl Sanitizer {
    pub fn new(canonicalizer: Canonicalizer, escaper: EscapeRuleSet) -> Self {
        Self { canonicalizer, escaper }
    }

    pub fn from_config(config: &ScrubConfig) -> Result<Self, ScrubError> {
        Ok(Self::new(
            Canonicalizer::from_config(config)?,
            EscapeRuleSet::for_config(config.escape_tag_delimiters)?,
        ))
    }

    pub fn escaper(&self) -> &EscapeRuleSet {
        &self.escaper
    }

    pub fn fix_text(&self, input: &str) -> FixOutcome {
        let doc = Document::parse(input);
        let (fixed, counts, warnings, states) = self.fix_document(doc);
        let output = fixed.render();
        let changed = output != input;
        let counts = if changed { counts } else { counts.net_of_no_change() };
        FixOutcome { output, changed, counts, warnings, states }
    }

    /// Runs every stage over `doc` and returns the rewritten document.
    pub fn fix_document(
        &self,
        doc: Document,
    ) -> (Document, StageCounts, Vec<ScrubWarning>, Vec<ScanState>) {
        let mut counts = StageCounts::default();
        let path = doc.path;

        let before = doc.lines.len();
        let (lines, origins) = self.canonicalizer.strip_stray_lines(doc.lines);
        counts.wrapper_lines_removed = before - lines.len();

        let classification = classify_at(&lines, &origins);
        counts.code_lines = classification.code_lines();

        let lines = lines
            .into_iter()
            .zip(classification.states.iter().copied())
            .map(|(line, state)| {
                let (canonical, repairs) = self.canonicalizer.canonicalize_line(&line.text, state);
                counts.entities_decoded += repairs.entities_decoded;
                counts.fragments_repaired += repairs.fragments_repaired;

                let baseline = canonical.as_deref().unwrap_or(&line.text);
                let (escaped, n) = self.escaper.escape_line(baseline, state);
                counts.sequences_escaped += n;

                match (escaped, canonical) {
                    (Some(text), _) | (None, Some(text)) => line.with_text(text),
                    (None, None) => line,
                }
            })
            .collect();

        debug!(
            "Pipeline counts: removed={}, repaired={}, decoded={}, escaped={}",
            counts.wrapper_lines_removed,
            counts.fragments_repaired,
            counts.entities_decoded,
            counts.sequences_escaped
        );

        (Document { path, lines }, counts, classification.warnings, classification.states)
    }
}
