//! Status message helpers shared by the commands.
//!
//! Every helper takes the writer and a `supports_color` flag so callers decide
//! where output goes and whether ANSI codes are allowed.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use crate::ui::theme::{color_for, ThemeEntry, ThemeMap};

fn print_tagged(
    writer: &mut dyn Write,
    tag: &str,
    message: &str,
    entry: ThemeEntry,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    if supports_color {
        writeln!(writer, "{} {}", tag.color(color_for(theme, entry)).bold(), message)
    } else {
        writeln!(writer, "{} {}", tag, message)
    }
}

pub fn print_info_message(writer: &mut dyn Write, message: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(writer, "[info]", message, ThemeEntry::Info, theme, supports_color)
}

pub fn print_success_message(writer: &mut dyn Write, message: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(writer, "[ok]", message, ThemeEntry::Success, theme, supports_color)
}

pub fn print_warn_message(writer: &mut dyn Write, message: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(writer, "[warn]", message, ThemeEntry::Warn, theme, supports_color)
}

pub fn print_error_message(writer: &mut dyn Write, message: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(writer, "[error]", message, ThemeEntry::Error, theme, supports_color)
}
