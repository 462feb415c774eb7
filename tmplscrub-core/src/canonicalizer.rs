//! Malformed artifact canonicalizer.
//!
//! Earlier fix attempts left three kinds of debris in the sources: standalone
//! `{% raw %}` / `{% endraw %}` lines, raw markers glued onto `{{` / `}}`, and
//! entity-escaped delimiters (sometimes escaped more than once). This module
//! undoes all of them so the escaper always starts from raw text.
//!
//! Only whole marker lines are removed outside code blocks. Everything else
//! is rewritten in code lines only.
//!
//! License: MIT OR APACHE 2.0

use std::borrow::Cow;

use lazy_static::lazy_static;
use log::debug;
use regex::{Captures, Regex};

use crate::classifier::ScanState;
use crate::config::ScrubConfig;
use crate::document::Line;
use crate::errors::ScrubError;

// `{`, `}` and `%` as HTML entities, with any number of extra `&amp;` layers.
const OPEN_ENT: &str = r"&(?:amp;)*(?:#0*123|#[xX]0*7[bB]|lbrace|lcub);";
const CLOSE_ENT: &str = r"&(?:amp;)*(?:#0*125|#[xX]0*7[dD]|rbrace|rcub);";
const PCT_ENT: &str = r"&(?:amp;)*(?:#0*37|#[xX]0*25|percnt);";

lazy_static! {
    /// Two or more adjacent braces, each raw or entity-escaped.
    static ref BRACE_RUN: Regex = Regex::new(&format!(
        r"(?:\{{|\}}|{o}|{c}){{2,}}",
        o = OPEN_ENT,
        c = CLOSE_ENT,
    ))
    .unwrap();
    /// Same, with `%` counted as a delimiter character.
    static ref DELIMITER_RUN: Regex = Regex::new(&format!(
        r"(?:\{{|\}}|%|{o}|{c}|{p}){{2,}}",
        o = OPEN_ENT,
        c = CLOSE_ENT,
        p = PCT_ENT,
    ))
    .unwrap();
    static ref ENTITY_TOKEN: Regex = Regex::new(&format!(
        r"(?P<open>{o})|(?P<close>{c})|(?P<pct>{p})",
        o = OPEN_ENT,
        c = CLOSE_ENT,
        p = PCT_ENT,
    ))
    .unwrap();
}

/// Per-line counts of what the canonicalizer changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineRepairs {
    pub entities_decoded: usize,
    pub fragments_repaired: usize,
}

/// Compiled matchers for one pair of raw marker names.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    marker_line: Regex,
    fragment: Regex,
    decode_tags: bool,
}

impl Canonicalizer {
    /// `open` / `close` are Liquid tag names, e.g. `raw` and `endraw`.
    /// Markers are recognized raw or entity-escaped.
    pub fn new(open: &str, close: &str) -> Result<Self, ScrubError> {
        let marker = format!(
            r"(?:\{{|{o})(?:%|{p})-?\s*(?:{open}|{close})\s*-?(?:%|{p})(?:\}}|{c})",
            o = OPEN_ENT,
            c = CLOSE_ENT,
            p = PCT_ENT,
            open = regex::escape(open),
            close = regex::escape(close),
        );
        let marker_line = Regex::new(&format!(r"^(?:{m}\s*)+$", m = marker))
            .map_err(|e| ScrubError::Config(format!("invalid raw marker: {}", e)))?;
        let fragment = Regex::new(&format!(
            r"(?:{m})+(?P<open>\{{\{{)|(?P<close>\}}\}})(?:{m})+",
            m = marker
        ))
        .map_err(|e| ScrubError::Config(format!("invalid raw marker: {}", e)))?;

        Ok(Self { marker_line, fragment, decode_tags: false })
    }

    /// Also decode entity-escaped `{%` / `%}`. Only safe when the escaper
    /// re-escapes tag delimiters afterwards.
    pub fn with_tag_decoding(mut self, decode_tags: bool) -> Self {
        self.decode_tags = decode_tags;
        self
    }

    pub fn from_config(config: &ScrubConfig) -> Result<Self, ScrubError> {
        Ok(Self::new(&config.raw_open_marker, &config.raw_close_marker)?
            .with_tag_decoding(config.escape_tag_delimiters))
    }

    /// A line holding nothing but raw markers (escaped or not).
    pub fn is_stray_marker_line(&self, text: &str) -> bool {
        let trimmed = text.trim();
        !trimmed.is_empty() && self.marker_line.is_match(trimmed)
    }

    /// Drops stray marker lines, wherever they are. Also returns the 0-based
    /// source index of every kept line.
    pub fn strip_stray_lines(&self, lines: Vec<Line>) -> (Vec<Line>, Vec<usize>) {
        let before = lines.len();
        let (origins, kept): (Vec<usize>, Vec<Line>) = lines
            .into_iter()
            .enumerate()
            .filter(|(_, l)| !self.is_stray_marker_line(&l.text))
            .unzip();
        let removed = before - kept.len();
        if removed > 0 {
            debug!("Removed {} stray raw-marker line(s).", removed);
        }
        (kept, origins)
    }

    /// Deletes markers glued to `{{` / `}}`, keeping the braces.
    pub fn repair_fragments<'t>(&self, text: &'t str) -> (Cow<'t, str>, usize) {
        let mut count = 0;
        let out = self.fragment.replace_all(text, |caps: &Captures| {
            count += 1;
            if caps.name("open").is_some() {
                "{{"
            } else {
                "}}"
            }
        });
        (out, count)
    }

    /// Brings a code line back to raw form. Prose and fence lines are returned untouched.
    ///
    /// Decoding can glue a marker onto a brace pair and removing a marker can
    /// join two brace runs, so both steps repeat until neither changes the line.
    pub fn canonicalize_line(&self, text: &str, state: ScanState) -> (Option<String>, LineRepairs) {
        let mut repairs = LineRepairs::default();
        if state != ScanState::Code {
            return (None, repairs);
        }

        let mut current: Option<String> = None;
        loop {
            let next = {
                let base = current.as_deref().unwrap_or(text);
                let (decoded, entities_decoded) = decode_entities(base, self.decode_tags);
                let (repaired, fragments_repaired) = self.repair_fragments(&decoded);
                if entities_decoded == 0 && fragments_repaired == 0 {
                    break;
                }
                repairs.entities_decoded += entities_decoded;
                repairs.fragments_repaired += fragments_repaired;
                repaired.into_owned()
            };
            current = Some(next);
        }
        (current, repairs)
    }
}

/// Decodes entity-escaped braces that sit in a run of two or more braces
/// (raw or escaped), and `%` as well when `tags` is set. Every character of the
/// run comes out raw, so the escaper can pair it up from scratch. A lone
/// escaped brace is not a delimiter and is left alone.
///
/// Returns the decoded text and the number of entities replaced.
pub fn decode_entities(text: &str, tags: bool) -> (Cow<'_, str>, usize) {
    if !text.contains('&') {
        return (Cow::Borrowed(text), 0);
    }
    let runs: &Regex = if tags { &DELIMITER_RUN } else { &BRACE_RUN };
    let mut count = 0;
    let out = runs.replace_all(text, |caps: &Captures| {
        let (run, n) = decode_run(&caps[0]);
        count += n;
        run
    });
    if count == 0 {
        (Cow::Borrowed(text), 0)
    } else {
        (out, count)
    }
}

fn decode_run(run: &str) -> (String, usize) {
    let mut count = 0;
    let out = ENTITY_TOKEN.replace_all(run, |caps: &Captures| {
        count += 1;
        if caps.name("open").is_some() {
            "{"
        } else if caps.name("close").is_some() {
            "}"
        } else {
            "%"
        }
    });
    (out.into_owned(), count)
}
