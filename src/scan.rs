//! Document directory scanning.
//!
//! Walks the configured documents root and returns the PDF files eligible
//! for ingestion, in a deterministic order.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::Config;

/// A document file discovered under the documents root.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    /// Absolute (or root-relative) path on disk.
    pub path: PathBuf,
    /// Path relative to the documents root, used for reporting.
    pub name: String,
}

/// Scan the documents root for files matching the configured globs.
///
/// Non-files are skipped; results are sorted by relative path so repeated
/// scans visit documents in the same order. An empty result is not an
/// error here — the ingest operation decides what an empty corpus means.
pub fn scan_documents(config: &Config) -> Result<Vec<DocumentFile>> {
    let root = &config.documents.root;
    if !root.exists() {
        bail!("Documents root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.documents.include_globs)?;
    let exclude_set = build_globset(&config.documents.exclude_globs)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.documents.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(DocumentFile {
            path: path.to_path_buf(),
            name: rel_str,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DocumentsConfig};

    fn config_for(root: &std::path::Path) -> Config {
        Config {
            documents: DocumentsConfig {
                root: root.to_path_buf(),
                include_globs: vec!["**/*.pdf".to_string()],
                exclude_globs: vec![],
                follow_symlinks: false,
            },
            chunking: Default::default(),
            retrieval: Default::default(),
            embedding: Default::default(),
            generation: Default::default(),
            server: Default::default(),
        }
    }

    #[test]
    fn test_scan_finds_only_pdfs_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let files = scan_documents(&config_for(tmp.path())).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_scan_empty_directory_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let files = scan_documents(&config_for(tmp.path())).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_scan_missing_root_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let err = scan_documents(&config_for(&missing)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_scan_respects_excludes() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("drafts")).unwrap();
        std::fs::write(tmp.path().join("keep.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("drafts/skip.pdf"), b"x").unwrap();

        let mut config = config_for(tmp.path());
        config.documents.exclude_globs = vec!["drafts/**".to_string()];

        let files = scan_documents(&config).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "keep.pdf");
    }
}
