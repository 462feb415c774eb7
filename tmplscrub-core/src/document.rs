//! Line-oriented view of a markdown source file.
//!
//! A `Document` splits text into `Line`s while keeping each line's original
//! terminator, so that re-joining untouched lines reproduces the input byte
//! for byte (CRLF files stay CRLF, a missing final newline stays missing).
//!
//! License: MIT OR APACHE 2.0

use std::path::{Path, PathBuf};

use crate::errors::ScrubError;

/// A single line of text without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    /// `"\n"`, `"\r\n"` or `""` for a final line without a newline.
    pub eol: &'static str,
}

impl Line {
    pub fn new(text: impl Into<String>, eol: &'static str) -> Self {
        Self { text: text.into(), eol }
    }

    /// Same terminator, new content.
    pub fn with_text(&self, text: String) -> Self {
        Self { text, eol: self.eol }
    }
}

/// An ordered sequence of lines belonging to one source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub path: Option<PathBuf>,
    pub lines: Vec<Line>,
}

impl Document {
    /// Splits `text` into lines. Never fails; any string is a valid document.
    pub fn parse(text: &str) -> Self {
        let mut lines = Vec::new();
        for chunk in text.split_inclusive('\n') {
            let line = if let Some(body) = chunk.strip_suffix("\r\n") {
                Line::new(body, "\r\n")
            } else if let Some(body) = chunk.strip_suffix('\n') {
                Line::new(body, "\n")
            } else {
                Line::new(chunk, "")
            };
            lines.push(line);
        }
        Self { path: None, lines }
    }

    /// Reads and splits a file. Non-UTF-8 content is rejected rather than lossily decoded.
    pub fn read(path: &Path) -> Result<Self, ScrubError> {
        let bytes = std::fs::read(path).map_err(|e| ScrubError::io(path, e))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ScrubError::InvalidUtf8 { path: path.to_path_buf() })?;
        let mut doc = Self::parse(&text);
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    pub fn render(&self) -> String {
        let capacity = self.lines.iter().map(|l| l.text.len() + l.eol.len()).sum();
        let mut out = String::with_capacity(capacity);
        for line in &self.lines {
            out.push_str(&line.text);
            out.push_str(line.eol);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_reproduces_mixed_line_endings() {
        let text = "a\r\nb\nc";
        let doc = Document::parse(text);
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.lines[0], Line::new("a", "\r\n"));
        assert_eq!(doc.lines[1], Line::new("b", "\n"));
        assert_eq!(doc.lines[2], Line::new("c", ""));
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn empty_text_has_no_lines() {
        let doc = Document::parse("");
        assert!(doc.is_empty());
        assert_eq!(doc.render(), "");
    }

    #[test]
    fn trailing_newline_is_kept() {
        let doc = Document::parse("only\n");
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.render(), "only\n");
    }
}
