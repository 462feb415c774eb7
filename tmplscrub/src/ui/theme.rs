//! Module for managing the application's command-line interface (CLI) theme.
//!
//! Users can recolor the summary, diff and status messages with a small YAML
//! file mapping theme entries to 16-color ANSI names.

use anyhow::{Context, Result};
use owo_colors::AnsiColors;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Type alias for the theme map, providing a consistent type definition.
pub type ThemeMap = HashMap<ThemeEntry, ThemeStyle>;

/// The different logical parts of the output that can be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeEntry {
    Header,
    Success,
    Info,
    Warn,
    Error,
    DiffAdded,
    DiffRemoved,
    DiffHeader,
    /// File paths in the summary table.
    SummaryPath,
    /// Numeric columns in the summary table.
    SummaryCount,
}

impl ThemeEntry {
    pub const ALL: [ThemeEntry; 10] = [
        ThemeEntry::Header,
        ThemeEntry::Success,
        ThemeEntry::Info,
        ThemeEntry::Warn,
        ThemeEntry::Error,
        ThemeEntry::DiffAdded,
        ThemeEntry::DiffRemoved,
        ThemeEntry::DiffHeader,
        ThemeEntry::SummaryPath,
        ThemeEntry::SummaryCount,
    ];
}

/// Represents an ANSI color that can be used in the theme.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ThemeColor {
    /// A named ANSI color (e.g., "red", "brightgreen").
    Named(String),
}

/// Error type for parsing an invalid `ThemeColor` string.
#[derive(Debug, Clone)]
pub struct ParseThemeColorError;

impl fmt::Display for ParseThemeColorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Invalid theme color; expected one of: black, red, green, yellow, blue, \
            magenta, cyan, white, brightblack, brightred, brightgreen, brightyellow, \
            brightblue, brightmagenta, brightcyan, brightwhite."
        )
    }
}

impl std::error::Error for ParseThemeColorError {}

impl FromStr for ThemeColor {
    type Err = ParseThemeColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "black" | "red" | "green" | "yellow" | "blue" | "magenta" | "cyan" | "white" |
            "brightblack" | "brightred" | "brightgreen" | "brightyellow" | "brightblue" |
            "brightmagenta" | "brightcyan" | "brightwhite" => Ok(ThemeColor::Named(lower)),
            _ => Err(ParseThemeColorError),
        }
    }
}

impl ThemeColor {
    fn named(name: &str) -> Self {
        ThemeColor::Named(name.to_string())
    }

    /// Converts the `ThemeColor` into its corresponding `owo_colors::AnsiColors`.
    pub fn to_ansi_color(&self) -> AnsiColors {
        match self {
            ThemeColor::Named(name) => match name.as_str() {
                "black" => AnsiColors::Black,
                "red" => AnsiColors::Red,
                "green" => AnsiColors::Green,
                "yellow" => AnsiColors::Yellow,
                "blue" => AnsiColors::Blue,
                "magenta" => AnsiColors::Magenta,
                "cyan" => AnsiColors::Cyan,
                "white" => AnsiColors::White,
                "brightblack" => AnsiColors::BrightBlack,
                "brightred" => AnsiColors::BrightRed,
                "brightgreen" => AnsiColors::BrightGreen,
                "brightyellow" => AnsiColors::BrightYellow,
                "brightblue" => AnsiColors::BrightBlue,
                "brightmagenta" => AnsiColors::BrightMagenta,
                "brightcyan" => AnsiColors::BrightCyan,
                "brightwhite" => AnsiColors::BrightWhite,
                _ => AnsiColors::White,
            },
        }
    }
}

/// Represents the style configuration for a specific `ThemeEntry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThemeStyle {
    pub fg: Option<ThemeColor>,
}

/// Loads a theme configuration from a YAML file or returns the default theme.
pub fn build_theme_map(theme_path: Option<&PathBuf>) -> Result<ThemeMap> {
    match theme_path {
        Some(path) => ThemeStyle::load_from_file(path),
        None => Ok(ThemeStyle::default_theme_map()),
    }
}

/// Foreground color for `entry`, falling back to white.
pub fn color_for(theme: &ThemeMap, entry: ThemeEntry) -> AnsiColors {
    theme
        .get(&entry)
        .and_then(|style| style.fg.as_ref())
        .map(ThemeColor::to_ansi_color)
        .unwrap_or(AnsiColors::White)
}

impl ThemeStyle {
    /// Loads a theme file; entries it omits keep their default color.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ThemeMap> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read theme file {}", path.display()))?;
        let custom: ThemeMap = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse theme file {}", path.display()))?;

        for style in custom.values() {
            if let Some(ThemeColor::Named(name)) = &style.fg {
                name.parse::<ThemeColor>()
                    .with_context(|| format!("Invalid color '{}' in theme file {}", name, path.display()))?;
            }
        }

        let mut theme = Self::default_theme_map();
        theme.extend(custom);
        Ok(theme)
    }

    /// Returns a default theme map with predefined color mappings.
    pub fn default_theme_map() -> ThemeMap {
        let mut theme = HashMap::new();
        for (entry, color) in [
            (ThemeEntry::Header, "cyan"),
            (ThemeEntry::Success, "green"),
            (ThemeEntry::Info, "white"),
            (ThemeEntry::Warn, "yellow"),
            (ThemeEntry::Error, "red"),
            (ThemeEntry::DiffAdded, "green"),
            (ThemeEntry::DiffRemoved, "red"),
            (ThemeEntry::DiffHeader, "brightblack"),
            (ThemeEntry::SummaryPath, "white"),
            (ThemeEntry::SummaryCount, "brightcyan"),
        ] {
            theme.insert(entry, ThemeStyle { fg: Some(ThemeColor::named(color)) });
        }
        theme
    }
}
