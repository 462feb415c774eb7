//! Run summary rendering: a per-file table, the totals line and the verifier report.

use std::io::{self, Write};

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use owo_colors::{AnsiColors, OwoColorize};

use tmplscrub_core::{FileReport, FileStatus, RunSummary, TemplateError};

use crate::ui::theme::{color_for, ThemeEntry, ThemeMap};

fn table_color(color: AnsiColors) -> Color {
    match color {
        AnsiColors::Black => Color::Black,
        AnsiColors::Red => Color::DarkRed,
        AnsiColors::Green => Color::DarkGreen,
        AnsiColors::Yellow => Color::DarkYellow,
        AnsiColors::Blue => Color::DarkBlue,
        AnsiColors::Magenta => Color::DarkMagenta,
        AnsiColors::Cyan => Color::DarkCyan,
        AnsiColors::White => Color::Grey,
        AnsiColors::BrightBlack => Color::DarkGrey,
        AnsiColors::BrightRed => Color::Red,
        AnsiColors::BrightGreen => Color::Green,
        AnsiColors::BrightYellow => Color::Yellow,
        AnsiColors::BrightBlue => Color::Blue,
        AnsiColors::BrightMagenta => Color::Magenta,
        AnsiColors::BrightCyan => Color::Cyan,
        _ => Color::White,
    }
}

fn status_label(report: &FileReport, dry_run: bool) -> (String, ThemeEntry) {
    match &report.status {
        FileStatus::Unchanged => ("unchanged".to_string(), ThemeEntry::Info),
        FileStatus::Fixed if dry_run => ("would fix".to_string(), ThemeEntry::Success),
        FileStatus::Fixed => ("fixed".to_string(), ThemeEntry::Success),
        FileStatus::Failed(reason) => (format!("failed: {}", reason), ThemeEntry::Error),
        FileStatus::Cancelled => ("cancelled".to_string(), ThemeEntry::Warn),
    }
}

/// Files worth a row: anything that changed, failed, was skipped or warned.
fn is_notable(report: &FileReport) -> bool {
    report.status != FileStatus::Unchanged || !report.warnings.is_empty()
}

/// Builds the per-file table. Unchanged files without warnings are omitted.
pub fn build_table(summary: &RunSummary, theme: &ThemeMap, supports_color: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["File", "Status", "Escaped", "Repaired", "Warnings"]);
    if !supports_color {
        table.force_no_tty();
    }

    for report in summary.files.iter().filter(|r| is_notable(r)) {
        let (label, entry) = status_label(report, summary.dry_run);
        let count_color = table_color(color_for(theme, ThemeEntry::SummaryCount));
        let warnings = report
            .warnings
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        table.add_row(vec![
            Cell::new(report.path.display()).fg(table_color(color_for(theme, ThemeEntry::SummaryPath))),
            Cell::new(label).fg(table_color(color_for(theme, entry))),
            Cell::new(report.counts.sequences_escaped)
                .set_alignment(CellAlignment::Right)
                .fg(count_color),
            Cell::new(report.counts.repairs())
                .set_alignment(CellAlignment::Right)
                .fg(count_color),
            Cell::new(warnings).fg(table_color(color_for(theme, ThemeEntry::Warn))),
        ]);
    }
    table
}

/// One-line totals, e.g. `3 files: 1 unchanged, 2 fixed, 0 failed`.
pub fn totals_line(summary: &RunSummary) -> String {
    let t = &summary.totals;
    let fixed_label = if summary.dry_run { "would fix" } else { "fixed" };
    let mut line = format!(
        "{} file(s): {} unchanged, {} {}, {} failed",
        summary.files.len(),
        t.unchanged,
        t.fixed,
        fixed_label,
        t.failed
    );
    if t.cancelled > 0 {
        line.push_str(&format!(", {} cancelled", t.cancelled));
    }
    if t.warnings > 0 {
        line.push_str(&format!(" ({} warning(s))", t.warnings));
    }
    line
}

pub fn print_summary(
    summary: &RunSummary,
    writer: &mut dyn Write,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    if summary.files.iter().any(is_notable) {
        writeln!(writer, "{}", build_table(summary, theme, supports_color))?;
    }

    let line = totals_line(summary);
    let entry = if summary.is_success() { ThemeEntry::Success } else { ThemeEntry::Error };
    if supports_color {
        writeln!(writer, "{}", line.color(color_for(theme, entry)).bold())
    } else {
        writeln!(writer, "{}", line)
    }
}

/// Lists template errors the site build still reports, as `file:line` references.
pub fn print_template_errors(
    errors: &[TemplateError],
    writer: &mut dyn Write,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    let header = format!("{} template error(s) remain:", errors.len());
    if supports_color {
        writeln!(writer, "{}", header.color(color_for(theme, ThemeEntry::Header)).bold())?;
    } else {
        writeln!(writer, "{}", header)?;
    }
    for error in errors {
        writeln!(writer, "  {}", error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::theme::ThemeStyle;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tmplscrub_core::{run, CancelToken, DriverOptions, Sanitizer, ScrubConfig};

    async fn summary_for(files: &[(&str, &str)], dry_run: bool) -> RunSummary {
        let dir = tempdir().unwrap();
        let mut paths: Vec<PathBuf> = Vec::new();
        for (name, body) in files {
            let p = dir.path().join(name);
            std::fs::write(&p, body).unwrap();
            paths.push(p);
        }
        let sanitizer = Arc::new(Sanitizer::from_config(&ScrubConfig::load_default().unwrap()).unwrap());
        let options = DriverOptions { dry_run, jobs: 1, capture_previews: false };
        run(paths, sanitizer, options, CancelToken::new()).await
    }

    #[tokio::test]
    async fn totals_line_counts_each_status() {
        let summary = summary_for(&[("a.md", "```\n{{x}}\n```\n"), ("b.md", "plain\n")], true).await;
        assert_eq!(totals_line(&summary), "2 file(s): 1 unchanged, 1 would fix, 0 failed");
    }

    #[tokio::test]
    async fn table_lists_only_notable_files() {
        let summary = summary_for(&[("a.md", "```\n{{x}}\n"), ("b.md", "plain\n")], false).await;
        let mut buf = Vec::new();
        print_summary(&summary, &mut buf, &ThemeStyle::default_theme_map(), false).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("a.md"));
        assert!(!out.contains("b.md"));
        assert!(out.contains("unterminated code fence opened at line 1"));
        assert!(out.contains("2 file(s): 1 unchanged, 1 fixed, 0 failed (1 warning(s))"));
    }

    #[test]
    fn template_errors_are_listed_with_locations() {
        let errors = vec![TemplateError {
            kind: "Liquid syntax error".to_string(),
            file: "docs/a.md".to_string(),
            line: Some(4),
            detail: "Unknown tag 'x'".to_string(),
        }];
        let mut buf = Vec::new();
        print_template_errors(&errors, &mut buf, &ThemeStyle::default_theme_map(), false).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("1 template error(s) remain:"));
        assert!(out.contains("  docs/a.md:4: Liquid syntax error: Unknown tag 'x'"));
    }
}
