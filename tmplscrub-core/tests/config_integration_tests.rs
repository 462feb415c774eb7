// tmplscrub-core/tests/config_integration_tests.rs
use anyhow::Result;
use std::io::Write;
use tempfile::NamedTempFile;

use tmplscrub_core::config::{self, ScrubConfig, ScrubConfigOverrides};

#[test]
fn test_load_default_config() {
    let config = ScrubConfig::load_default().unwrap();
    assert!(config.exclude_dirs.iter().any(|d| d == "_site"));
    assert_eq!(config.verifier.command, "bundle");
    assert_eq!(config.jobs, None);
}

#[test]
fn test_load_from_file_merges_over_defaults() -> Result<()> {
    let yaml_content = r#"
extensions: [md, mdx]
escape_tag_delimiters: true
jobs: 3
verifier:
  command: "jekyll"
  args: ["build"]
"#;
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml_content.as_bytes())?;
    let config = ScrubConfig::load_from_file(file.path())?;

    assert!(config.matches_extension("mdx"));
    assert!(config.escape_tag_delimiters);
    assert_eq!(config.jobs, Some(3));
    assert_eq!(config.verifier.command, "jekyll");
    assert_eq!(config.verifier.args, vec!["build".to_string()]);
    // Untouched keys keep their defaults.
    assert_eq!(config.verifier.timeout_secs, 300);
    assert_eq!(config.raw_open_marker, "raw");
    Ok(())
}

#[test]
fn test_invalid_file_is_rejected() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(b"jobs: 0\nverifier:\n  timeout_secs: 0\n")?;
    let err = ScrubConfig::load_from_file(file.path()).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("`jobs` must be at least 1"));
    assert!(message.contains("timeout_secs"));
    Ok(())
}

#[test]
fn test_empty_file_means_defaults() -> Result<()> {
    let file = NamedTempFile::new()?;
    let config = ScrubConfig::load_from_file(file.path())?;
    assert_eq!(config, ScrubConfig::load_default()?);
    Ok(())
}

#[test]
fn test_merge_without_overrides_is_identity() {
    let default = ScrubConfig::load_default().unwrap();
    assert_eq!(config::merge_config(default.clone(), None), default);
    assert_eq!(
        config::merge_config(default.clone(), Some(ScrubConfigOverrides::default())),
        default
    );
}

#[test]
fn test_custom_markers_drive_the_canonicalizer() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(b"raw_open_marker: verbatim\nraw_close_marker: endverbatim\n")?;
    let config = ScrubConfig::load_from_file(file.path())?;
    let sanitizer = tmplscrub_core::Sanitizer::from_config(&config)?;

    let out = sanitizer.fix_text("```\n{% verbatim %}\n{{ x }}\n{% endverbatim %}\n```\n");
    assert_eq!(out.output, "```\n&#123;&#123; x &#125;&#125;\n```\n");
    Ok(())
}
