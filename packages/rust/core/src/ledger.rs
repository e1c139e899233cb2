//! Processing Ledger: persists the last successfully processed source
//! revision per `<namespace>/<content-type>`, enabling the incremental
//! gate to skip unchanged jurisdictions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use lawsite_shared::{LawsiteError, LedgerEntry, Result};

/// The on-disk ledger, loaded once per run and written back after each
/// jurisdiction completes.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    /// Load the ledger. An absent file means nothing has been processed
    /// yet and is never an error.
    pub fn load(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| LawsiteError::io(path, e))?;
            serde_json::from_str(&content).map_err(|e| {
                LawsiteError::validation(format!("invalid ledger {}: {e}", path.display()))
            })?
        } else {
            debug!(path = %path.display(), "no ledger yet");
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// The ledger key for one jurisdiction and content type.
    pub fn key(namespace: &str, content_type: &str) -> String {
        format!("{namespace}/{content_type}")
    }

    /// Whether the recorded revision for `key` equals `revision`.
    pub fn is_current(&self, key: &str, revision: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.last_validated_commit == revision)
            .unwrap_or(false)
    }

    /// Record a just-processed revision. Takes effect on disk at the
    /// next [`save`](Self::save).
    pub fn record(&mut self, key: &str, revision: &str) {
        self.entries.insert(
            key.to_string(),
            LedgerEntry {
                last_validated_commit: revision.to_string(),
            },
        );
    }

    /// Persist the ledger: re-read the file and merge our entries over
    /// whatever is there, so concurrent runs over different jurisdictions
    /// cannot clobber each other's records.
    pub fn save(&self) -> Result<()> {
        let mut merged: BTreeMap<String, LedgerEntry> = if self.path.exists() {
            let content =
                std::fs::read_to_string(&self.path).map_err(|e| LawsiteError::io(&self.path, e))?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            BTreeMap::new()
        };

        merged.extend(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())));

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LawsiteError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(&merged)
            .map_err(|e| LawsiteError::validation(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| LawsiteError::io(&self.path, e))?;

        debug!(path = %self.path.display(), entries = merged.len(), "ledger saved");
        Ok(())
    }
}

/// The incremental gate: process only when at least one tracked content
/// type's current revision differs from the ledger. An empty revision
/// set (no signed entries at all) always processes.
pub fn should_process(
    ledger: &Ledger,
    namespace: &str,
    current: &BTreeMap<String, String>,
) -> bool {
    if current.is_empty() {
        return true;
    }
    current
        .iter()
        .any(|(content_type, revision)| {
            !ledger.is_current(&Ledger::key(namespace, content_type), revision)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn absent_ledger_is_empty_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Ledger::load(&dir.path().join("ledger.json")).expect("load");
        assert!(!ledger.is_current("ns/law-html", "abc"));
    }

    #[test]
    fn unchanged_revision_skips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, r#"{"ns/law-html": {"last_validated_commit": "abc"}}"#)
            .expect("write");

        let ledger = Ledger::load(&path).expect("load");
        assert!(!should_process(&ledger, "ns", &current(&[("law-html", "abc")])));
        assert!(should_process(&ledger, "ns", &current(&[("law-html", "def")])));
    }

    #[test]
    fn any_changed_tracked_type_processes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.json");
        std::fs::write(
            &path,
            r#"{"ns/law-html": {"last_validated_commit": "a"},
                "ns/law-docs": {"last_validated_commit": "b"}}"#,
        )
        .expect("write");

        let ledger = Ledger::load(&path).expect("load");
        assert!(!should_process(
            &ledger,
            "ns",
            &current(&[("law-html", "a"), ("law-docs", "b")])
        ));
        assert!(should_process(
            &ledger,
            "ns",
            &current(&[("law-html", "a"), ("law-docs", "changed")])
        ));
    }

    #[test]
    fn no_signed_entries_always_processes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Ledger::load(&dir.path().join("ledger.json")).expect("load");
        assert!(should_process(&ledger, "ns", &BTreeMap::new()));
    }

    #[test]
    fn record_and_save_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state/ledger.json");

        let mut ledger = Ledger::load(&path).expect("load");
        ledger.record("ns/law-html", "def");
        ledger.save().expect("save");

        let reloaded = Ledger::load(&path).expect("reload");
        assert!(reloaded.is_current("ns/law-html", "def"));
    }

    #[test]
    fn save_merges_with_existing_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.json");
        std::fs::write(
            &path,
            r#"{"other/law-html": {"last_validated_commit": "zzz"}}"#,
        )
        .expect("write");

        let mut ledger = Ledger::load(&path).expect("load");
        ledger.record("ns/law-html", "abc");
        ledger.save().expect("save");

        let reloaded = Ledger::load(&path).expect("reload");
        assert!(reloaded.is_current("ns/law-html", "abc"));
        assert!(reloaded.is_current("other/law-html", "zzz"));
    }
}
