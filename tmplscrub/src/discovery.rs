//! File discovery: turns command-line roots into the list of markdown files to process.
//!
//! Explicit files are always kept. Directories are walked recursively, pruning
//! excluded directory names (build output, VCS metadata, dependencies) and
//! keeping only files with a configured extension.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;
use tmplscrub_core::ScrubConfig;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("path does not exist: {}", .0.display())]
    Missing(PathBuf),
}

fn is_excluded_dir(entry: &DirEntry, exclude: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && exclude.iter().any(|name| entry.file_name() == OsStr::new(name))
}

fn has_markdown_extension(path: &Path, config: &ScrubConfig) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| config.matches_extension(ext))
}

/// Collects candidate files under `roots`, sorted and de-duplicated.
pub fn discover(roots: &[PathBuf], config: &ScrubConfig) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut found = BTreeSet::new();

    for root in roots {
        if !root.exists() {
            return Err(DiscoveryError::Missing(root.clone()));
        }
        if root.is_file() {
            found.insert(root.clone());
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_excluded_dir(e, &config.exclude_dirs));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() && has_markdown_extension(entry.path(), config) {
                found.insert(entry.into_path());
            }
        }
    }

    debug!("Discovered {} candidate file(s).", found.len());
    Ok(found.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn walks_directories_and_prunes_excluded_ones() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs/nested")).unwrap();
        fs::create_dir_all(root.join("_site")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("README.md"), "").unwrap();
        fs::write(root.join("docs/nested/guide.markdown"), "").unwrap();
        fs::write(root.join("docs/notes.txt"), "").unwrap();
        fs::write(root.join("_site/index.md"), "").unwrap();
        fs::write(root.join(".git/HEAD.md"), "").unwrap();

        let config = ScrubConfig::load_default().unwrap();
        let files = discover(&[root.to_path_buf()], &config).unwrap();
        assert_eq!(
            files,
            vec![root.join("README.md"), root.join("docs/nested/guide.markdown")]
        );
    }

    #[test]
    fn explicit_files_are_kept_and_deduplicated() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("page.html");
        fs::write(&file, "").unwrap();

        let config = ScrubConfig::load_default().unwrap();
        let files = discover(&[file.clone(), file.clone()], &config).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let config = ScrubConfig::load_default().unwrap();
        let err = discover(&[dir.path().join("nope")], &config).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
