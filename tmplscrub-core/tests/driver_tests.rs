// tmplscrub-core/tests/driver_tests.rs
//! Driver behaviour over real files: isolation of failures, write-if-changed,
//! dry runs and cancellation.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tempfile::tempdir;
use tmplscrub_core::{run, CancelToken, DriverOptions, FileStatus, Sanitizer, ScrubConfig};

fn sanitizer() -> Arc<Sanitizer> {
    Arc::new(Sanitizer::from_config(&ScrubConfig::load_default().unwrap()).unwrap())
}

fn options(dry_run: bool) -> DriverOptions {
    DriverOptions { dry_run, jobs: 2, capture_previews: false }
}

#[test_log::test(tokio::test)]
async fn failure_on_one_file_does_not_stop_the_others() -> Result<()> {
    let dir = tempdir()?;
    let good = dir.path().join("good.md");
    let missing = dir.path().join("missing.md");
    let clean = dir.path().join("clean.md");
    fs::write(&good, "```\n{{ x }}\n```\n")?;
    fs::write(&clean, "prose only {{ x }}\n")?;

    let summary = run(
        vec![good.clone(), missing.clone(), clean.clone()],
        sanitizer(),
        options(false),
        CancelToken::new(),
    )
    .await;

    assert_eq!(summary.files.len(), 3);
    assert_eq!(summary.files[0].path, good);
    assert_eq!(summary.files[0].status, FileStatus::Fixed);
    assert!(summary.files[0].written);
    assert!(matches!(summary.files[1].status, FileStatus::Failed(_)));
    assert_eq!(summary.files[2].status, FileStatus::Unchanged);
    assert_eq!(summary.totals.fixed, 1);
    assert_eq!(summary.totals.failed, 1);
    assert_eq!(summary.totals.unchanged, 1);
    assert!(!summary.is_success());
    assert_eq!(summary.failures().count(), 1);

    assert_eq!(fs::read_to_string(&good)?, "```\n&#123;&#123; x &#125;&#125;\n```\n");
    Ok(())
}

#[tokio::test]
async fn unchanged_files_are_not_rewritten() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("done.md");
    fs::write(&path, "```\n&#123;&#123; x &#125;&#125;\n```\n")?;
    let before = fs::metadata(&path)?.modified()?;

    let summary = run(vec![path.clone()], sanitizer(), options(false), CancelToken::new()).await;

    assert_eq!(summary.files[0].status, FileStatus::Unchanged);
    assert!(!summary.files[0].written);
    assert_eq!(fs::metadata(&path)?.modified()?, before);
    assert!(summary.is_success());
    Ok(())
}

#[tokio::test]
async fn dry_run_never_writes() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.md");
    let input = "```\n{% raw %}{{ x }}{% endraw %}\n```\n";
    fs::write(&path, input)?;

    let summary = run(vec![path.clone()], sanitizer(), options(true), CancelToken::new()).await;

    assert!(summary.dry_run);
    assert_eq!(summary.files[0].status, FileStatus::Fixed);
    assert!(!summary.files[0].written);
    assert_eq!(summary.counts.fragments_repaired, 2);
    assert_eq!(fs::read_to_string(&path)?, input);
    Ok(())
}

#[tokio::test]
async fn cancelled_run_skips_files_not_yet_started() -> Result<()> {
    let dir = tempdir()?;
    let paths: Vec<PathBuf> = (0..4)
        .map(|i| {
            let p = dir.path().join(format!("{}.md", i));
            fs::write(&p, "```\n{{ x }}\n```\n").unwrap();
            p
        })
        .collect();

    let cancel = CancelToken::new();
    cancel.cancel();
    let summary = run(paths.clone(), sanitizer(), options(false), cancel).await;

    assert_eq!(summary.totals.cancelled, 4);
    assert!(!summary.is_success());
    for p in &paths {
        assert_eq!(fs::read_to_string(p)?, "```\n{{ x }}\n```\n");
    }
    Ok(())
}

#[tokio::test]
async fn many_files_keep_input_order_and_serialize() -> Result<()> {
    let dir = tempdir()?;
    let paths: Vec<PathBuf> = (0..20)
        .map(|i| {
            let p = dir.path().join(format!("doc{:02}.md", i));
            let body = if i % 2 == 0 { "```\n{{ x }}\n```\n" } else { "plain\n" };
            fs::write(&p, body).unwrap();
            p
        })
        .collect();

    let summary = run(
        paths.clone(),
        sanitizer(),
        DriverOptions { dry_run: false, jobs: 4, capture_previews: false },
        CancelToken::new(),
    )
    .await;

    let reported: Vec<PathBuf> = summary.files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(reported, paths);
    assert_eq!(summary.totals.fixed, 10);
    assert_eq!(summary.totals.unchanged, 10);

    let json: serde_json::Value = serde_json::from_str(&summary.to_json()?)?;
    assert_eq!(json["totals"]["fixed"], 10);
    assert_eq!(json["files"][0]["status"], "fixed");
    Ok(())
}
