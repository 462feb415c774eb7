// tmplscrub-core/src/lib.rs
//! # tmplscrub Core Library
//!
//! `tmplscrub-core` keeps literal template delimiters (`{{ }}`, optionally
//! `{% %}`) in markdown code samples from being read as Liquid directives by a
//! static-site generator. It does so without touching prose.
//!
//! The library is pure apart from the driver and verifier: the classifier,
//! canonicalizer and escaper operate on strings, and each document is processed
//! independently of every other.
//!
//! ## Modules
//!
//! * `document`: splits text into lines, preserving each line terminator.
//! * `classifier`: tags lines as prose, fence delimiter or code (`ScanState`).
//! * `canonicalizer`: undoes debris from earlier fix attempts (stray raw markers, entity-escaped delimiters).
//! * `escaper`: escapes delimiters in code lines with an order-independent `EscapeRuleSet`.
//! * `pipeline`: chains the stages for one document (`Sanitizer`).
//! * `driver`: runs the pipeline over many files with a bounded worker pool and cancellation.
//! * `verifier`: runs the site build and reports remaining template errors.
//! * `config`: YAML configuration with embedded defaults.
//! * `errors`: the `ScrubError` and `ScrubWarning` types.
//!
//! ## Usage Example
//!
//! ```rust
//! use tmplscrub_core::{ScrubConfig, Sanitizer};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let config = ScrubConfig::load_default()?;
//!     let sanitizer = Sanitizer::from_config(&config)?;
//!
//!     let input = "Write {{ page.title }}.\n```js\nconsole.log({{value}})\n```\n";
//!     let outcome = sanitizer.fix_text(input);
//!
//!     assert!(outcome.changed);
//!     assert!(outcome.output.starts_with("Write {{ page.title }}."));
//!     assert!(outcome.output.contains("console.log(&#123;&#123;value&#125;&#125;)"));
//!
//!     // A second pass is a no-op.
//!     assert!(!sanitizer.fix_text(&outcome.output).changed);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Per-file problems surface as `ScrubError` and end up in a `FileReport`
//! rather than aborting the run. Configuration loading uses `anyhow::Result`.
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod canonicalizer;
pub mod classifier;
pub mod config;
pub mod document;
pub mod driver;
pub mod errors;
pub mod escaper;
pub mod pipeline;
pub mod verifier;

/// Re-exports the configuration types.
pub use config::{merge_config, ScrubConfig, ScrubConfigOverrides, VerifierConfig};

/// Re-exports the error and warning types.
pub use errors::{ScrubError, ScrubWarning};

pub use canonicalizer::Canonicalizer;
pub use classifier::{classify, classify_at, is_fence_delimiter, Classification, FenceScanner, ScanState};
pub use document::{Document, Line};
pub use escaper::{EscapeRule, EscapeRuleSet};
pub use pipeline::{FixOutcome, Sanitizer, StageCounts};

/// Re-exports the driver API used by the CLI.
pub use driver::{
    process_file, run, CancelToken, DriverOptions, FilePreview, FileReport, FileStatus, RunSummary, RunTotals,
};

/// Re-exports the build verifier.
pub use verifier::{parse_template_errors, BuildVerifier, TemplateError, VerifierOutcome};
