//! Line classifier: tags every line as prose, fence delimiter or code.
//!
//! Classification is a fold over the lines. `FenceScanner` carries the only
//! piece of state (whether we are inside a fence) from one line to the next,
//! so each document is classified independently of every other.
//!
//! License: MIT OR APACHE 2.0

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::document::Line;
use crate::errors::ScrubWarning;

lazy_static! {
    /// Three or more backticks, optionally followed by a single info-string token.
    static ref FENCE_DELIMITER: Regex = Regex::new(r"^`{3,}[ \t]*[^`\s]*$").unwrap();
}

/// Scan state of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Prose,
    FenceDelimiter,
    Code,
}

/// Returns true if the trimmed line opens or closes a fenced code block.
pub fn is_fence_delimiter(text: &str) -> bool {
    FENCE_DELIMITER.is_match(text.trim())
}

/// Fold state for the classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct FenceScanner {
    in_code: bool,
    /// 0-based index of the delimiter that opened the current block.
    opened_at: Option<usize>,
    index: usize,
}

impl FenceScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies the next line and advances the scanner.
    pub fn step(&mut self, text: &str) -> ScanState {
        self.step_at(self.index, text)
    }

    /// Like `step`, for a line whose 0-based position in the source file is
    /// `index`. Used when some source lines were dropped before classifying.
    pub fn step_at(&mut self, index: usize, text: &str) -> ScanState {
        self.index = index + 1;

        if is_fence_delimiter(text) {
            self.in_code = !self.in_code;
            self.opened_at = if self.in_code { Some(index) } else { None };
            return ScanState::FenceDelimiter;
        }

        if self.in_code {
            ScanState::Code
        } else {
            ScanState::Prose
        }
    }

    /// Warning for a block still open after the last line, if any.
    pub fn finish(self) -> Option<ScrubWarning> {
        if self.in_code {
            self.opened_at.map(|i| ScrubWarning::UnterminatedFence { line: i + 1 })
        } else {
            None
        }
    }
}

/// Per-line states for a document plus any classification warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub states: Vec<ScanState>,
    pub warnings: Vec<ScrubWarning>,
}

impl Classification {
    pub fn code_lines(&self) -> usize {
        self.states.iter().filter(|s| **s == ScanState::Code).count()
    }
}

/// Classifies every line of a document.
pub fn classify(lines: &[Line]) -> Classification {
    let origins: Vec<usize> = (0..lines.len()).collect();
    classify_at(lines, &origins)
}

/// Classifies `lines`, where `origins[i]` is the 0-based source line of
/// `lines[i]`. Warnings refer to source line numbers.
pub fn classify_at(lines: &[Line], origins: &[usize]) -> Classification {
    let mut scanner = FenceScanner::new();
    let states: Vec<ScanState> = lines
        .iter()
        .zip(origins.iter().copied())
        .map(|(l, index)| scanner.step_at(index, &l.text))
        .collect();
    let warnings: Vec<ScrubWarning> = scanner.finish().into_iter().collect();

    debug!(
        "Classified {} lines ({} code, {} warnings).",
        states.len(),
        states.iter().filter(|s| **s == ScanState::Code).count(),
        warnings.len()
    );

    Classification { states, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn states(text: &str) -> Classification {
        classify(&Document::parse(text).lines)
    }

    #[test]
    fn recognizes_fence_variants() {
        assert!(is_fence_delimiter("```"));
        assert!(is_fence_delimiter("```js"));
        assert!(is_fence_delimiter("  ````  "));
        assert!(is_fence_delimiter("``` c++"));
        assert!(!is_fence_delimiter("``"));
        assert!(!is_fence_delimiter("```js and more"));
        assert!(!is_fence_delimiter("text ```"));
        assert!(!is_fence_delimiter("```inline```"));
    }

    #[test]
    fn toggles_between_prose_and_code() {
        let c = states("intro\n```js\nlet a = 1;\n```\noutro\n");
        assert_eq!(
            c.states,
            vec![
                ScanState::Prose,
                ScanState::FenceDelimiter,
                ScanState::Code,
                ScanState::FenceDelimiter,
                ScanState::Prose,
            ]
        );
        assert!(c.warnings.is_empty());
    }

    #[test]
    fn unterminated_fence_warns_and_stays_code() {
        let c = states("a\n```\nb\n```\nc\n```py\nd\ne\n");
        assert_eq!(c.states[6], ScanState::Code);
        assert_eq!(c.states[7], ScanState::Code);
        assert_eq!(c.warnings, vec![ScrubWarning::UnterminatedFence { line: 6 }]);
        assert_eq!(c.code_lines(), 3);
    }

    #[test]
    fn four_backtick_fences_are_ordinary() {
        let c = states("````\n```\n````\n");
        assert_eq!(c.states, vec![ScanState::FenceDelimiter; 3]);
        assert_eq!(c.warnings.len(), 1);
    }

    #[test]
    fn warnings_use_source_line_numbers() {
        let lines = Document::parse("intro
```
{{ x }}
").lines;
        let c = classify_at(&lines, &[1, 3, 4]);
        assert_eq!(c.warnings, vec![ScrubWarning::UnterminatedFence { line: 4 }]);
    }
}
