//! Authenticated metadata store for one jurisdiction.
//!
//! The update framework maintains, per partner, a metadata repository
//! whose signed target entries name the current revision of each content
//! repository. The pipeline only needs two reads from it: the target
//! entry for a content type, and a metadata file at the current revision.

use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use lawsite_shared::{LawsiteError, Result};

/// Read access to a jurisdiction's authenticated metadata.
pub trait MetadataStore {
    /// The signed target entry's revision for a content type, or `None`
    /// when the content type has no entry (it is then ignored by the
    /// incremental gate).
    fn target_commit(&self, content_type: &str) -> Result<Option<String>>;

    /// A metadata file at the current revision, parsed as JSON.
    fn read_file(&self, rel_path: &str) -> Result<Value>;
}

/// Filesystem-backed store rooted at a partner's checked-out metadata
/// repository (`<org>/law`).
#[derive(Debug, Clone)]
pub struct FsMetadataStore {
    root: PathBuf,
}

impl FsMetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MetadataStore for FsMetadataStore {
    fn target_commit(&self, content_type: &str) -> Result<Option<String>> {
        let path = self.root.join("targets").join(format!("{content_type}.json"));
        if !path.exists() {
            debug!(path = %path.display(), "no signed target entry");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| LawsiteError::io(&path, e))?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            LawsiteError::validation(format!("invalid target entry {}: {e}", path.display()))
        })?;

        value
            .get("commit")
            .and_then(Value::as_str)
            .map(|commit| Some(commit.to_string()))
            .ok_or_else(|| {
                LawsiteError::validation(format!(
                    "target entry {} has no commit field",
                    path.display()
                ))
            })
    }

    fn read_file(&self, rel_path: &str) -> Result<Value> {
        let path = self.root.join(rel_path);
        let content = std::fs::read_to_string(&path).map_err(|e| LawsiteError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            LawsiteError::validation(format!("invalid metadata file {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, FsMetadataStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        for (rel, content) in files {
            let path = dir.path().join(rel);
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            std::fs::write(&path, content).expect("write");
        }
        let store = FsMetadataStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn target_commit_reads_signed_entry() {
        let (_dir, store) = store_with(&[(
            "targets/law-html.json",
            r#"{"commit": "abc123", "branch": "main"}"#,
        )]);
        let commit = store.target_commit("law-html").expect("read");
        assert_eq!(commit.as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_target_entry_is_none() {
        let (_dir, store) = store_with(&[]);
        assert!(store.target_commit("law-docs").expect("read").is_none());
    }

    #[test]
    fn malformed_target_entry_is_an_error() {
        let (_dir, store) = store_with(&[("targets/law-html.json", r#"{"branch": "main"}"#)]);
        let err = store.target_commit("law-html").unwrap_err();
        assert!(err.to_string().contains("no commit field"));
    }

    #[test]
    fn read_file_parses_json() {
        let (_dir, store) = store_with(&[(
            "meta.json",
            r#"{"canonical-urls": {"html": "https://sanipueblo.example"}}"#,
        )]);
        let meta = store.read_file("meta.json").expect("read");
        assert_eq!(
            meta["canonical-urls"]["html"].as_str(),
            Some("https://sanipueblo.example")
        );
    }
}
