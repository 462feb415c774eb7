//! Unified diff rendering for `--diff`.
//!
//! Shows exactly which code lines the sanitizer rewrote: removed lines in the
//! `DiffRemoved` color, added lines in `DiffAdded`.

use std::io::{self, Write};
use std::path::Path;

use diffy::{create_patch, Line as DiffLine};
use owo_colors::OwoColorize;

use crate::ui::theme::{color_for, ThemeEntry, ThemeMap};

/// Writes a unified diff of `original` → `fixed` for `path`.
pub fn print_diff(
    path: &Path,
    original: &str,
    fixed: &str,
    writer: &mut dyn Write,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    let patch = create_patch(original, fixed);
    let header_color = color_for(theme, ThemeEntry::DiffHeader);
    let added = color_for(theme, ThemeEntry::DiffAdded);
    let removed = color_for(theme, ThemeEntry::DiffRemoved);

    let header = format!("--- a/{0}\n+++ b/{0}", path.display());
    if supports_color {
        writeln!(writer, "{}", header.color(header_color).bold())?;
    } else {
        writeln!(writer, "{}", header)?;
    }

    for hunk in patch.hunks() {
        let old = hunk.old_range();
        let new = hunk.new_range();
        let range = format!("@@ -{},{} +{},{} @@", old.start(), old.len(), new.start(), new.len());
        if supports_color {
            writeln!(writer, "{}", range.color(header_color))?;
        } else {
            writeln!(writer, "{}", range)?;
        }

        for line in hunk.lines() {
            let (prefix, text, color) = match line {
                DiffLine::Delete(s) => ("-", *s, Some(removed)),
                DiffLine::Insert(s) => ("+", *s, Some(added)),
                DiffLine::Context(s) => (" ", *s, None),
            };
            let text = text.trim_end_matches(['\n', '\r']);
            match (supports_color, color) {
                (true, Some(c)) => writeln!(writer, "{}", format!("{}{}", prefix, text).color(c))?,
                _ => writeln!(writer, "{}{}", prefix, text)?,
            }
        }
    }
    Ok(())
}
