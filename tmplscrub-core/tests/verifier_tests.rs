// tmplscrub-core/tests/verifier_tests.rs
//! Build verifier against small shell scripts standing in for the site generator.
#![cfg(unix)]

use std::time::Duration;

use tempfile::tempdir;
use tmplscrub_core::{BuildVerifier, ScrubConfig, ScrubError, VerifierConfig, VerifierOutcome};

fn shell(script: &str) -> VerifierConfig {
    let mut config = ScrubConfig::load_default().unwrap().verifier;
    config.command = "sh".to_string();
    config.args = vec!["-c".to_string(), script.to_string()];
    config.timeout_secs = 10;
    config
}

#[test_log::test(tokio::test)]
async fn successful_build_is_clean() {
    let dir = tempdir().unwrap();
    let verifier = BuildVerifier::new(&shell("echo 'done in 0.1 seconds.'"), dir.path()).unwrap();
    assert_eq!(verifier.verify().await.unwrap(), VerifierOutcome::Clean);
}

#[tokio::test]
async fn liquid_errors_are_reported_with_locations() {
    let dir = tempdir().unwrap();
    let script = "printf '\\033[31m  Liquid Exception: Liquid syntax error (line 7): Unknown tag x in docs/a.md\\033[0m\\n' >&2; exit 1";
    let verifier = BuildVerifier::new(&shell(script), dir.path()).unwrap();

    match verifier.verify().await.unwrap() {
        VerifierOutcome::TemplateErrorsRemain(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].file, "docs/a.md");
            assert_eq!(errors[0].line, Some(7));
            assert_eq!(errors[0].to_string(), "docs/a.md:7: Liquid syntax error: Unknown tag x");
        }
        other => panic!("expected template errors, got {:?}", other),
    }
}

#[tokio::test]
async fn failing_build_without_markers_is_a_build_error() {
    let dir = tempdir().unwrap();
    let verifier = BuildVerifier::new(&shell("echo 'Gemfile not found' >&2; exit 3"), dir.path()).unwrap();
    match verifier.verify().await {
        Err(ScrubError::VerifierBuild { stderr_tail, .. }) => assert!(stderr_tail.contains("Gemfile not found")),
        other => panic!("expected build error, got {:?}", other),
    }
}

#[tokio::test]
async fn slow_build_times_out() {
    let dir = tempdir().unwrap();
    let verifier = BuildVerifier::new(&shell("sleep 5"), dir.path())
        .unwrap()
        .with_timeout(Duration::from_millis(200));
    assert!(matches!(verifier.verify().await, Err(ScrubError::VerifierTimeout { .. })));
}

#[tokio::test]
async fn missing_command_is_a_build_error() {
    let dir = tempdir().unwrap();
    let mut config = shell("true");
    config.command = "tmplscrub-no-such-generator".to_string();
    let verifier = BuildVerifier::new(&config, dir.path()).unwrap();
    assert!(matches!(verifier.verify().await, Err(ScrubError::VerifierBuild { .. })));
}
