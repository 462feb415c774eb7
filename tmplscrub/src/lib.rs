// tmplscrub/src/lib.rs
//! # tmplscrub CLI
//!
//! Command-line front end for `tmplscrub-core`: finds markdown files, runs the
//! sanitizer over them, optionally verifies the site build, and reports.

pub mod cli;
pub mod commands;
pub mod discovery;
pub mod logger;
pub mod ui;
