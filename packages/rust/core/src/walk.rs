//! Tree Walker: enumerates candidate source files across content
//! repositories, preserving base-relative paths for destination mapping.

use std::path::PathBuf;

use walkdir::{DirEntry, WalkDir};

/// Walk the base directories in order, yielding `(base, relative-path)`
/// for every file. Missing bases are skipped silently; hidden entries
/// (dot-prefixed names) are excluded from traversal and results.
///
/// Depth-first, directories before their contents; each call returns a
/// fresh iterator.
pub fn walk_sources(bases: &[PathBuf]) -> impl Iterator<Item = (PathBuf, PathBuf)> + '_ {
    bases.iter().flat_map(|base| {
        let base = base.clone();
        WalkDir::new(&base)
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(move |entry| {
                entry
                    .path()
                    .strip_prefix(&base)
                    .ok()
                    .map(|rel| (base.clone(), rel.to_path_buf()))
            })
    })
}

/// Hidden means a dot-prefixed name; the base directory itself is exempt.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "x").expect("write");
    }

    #[test]
    fn yields_files_with_relative_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().join("law-html");
        touch(&base, "index.html");
        touch(&base, "chapter-1/sec-1.html");

        let bases = vec![base.clone()];
        let mut found: Vec<PathBuf> = walk_sources(&bases).map(|(_, rel)| rel).collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                PathBuf::from("chapter-1/sec-1.html"),
                PathBuf::from("index.html"),
            ]
        );
    }

    #[test]
    fn missing_bases_are_skipped_silently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let existing = dir.path().join("law-html");
        touch(&existing, "a.html");

        let bases = vec![dir.path().join("does-not-exist"), existing];
        let found: Vec<_> = walk_sources(&bases).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, PathBuf::from("a.html"));
    }

    #[test]
    fn hidden_entries_are_excluded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().join("law-html");
        touch(&base, ".git/config");
        touch(&base, ".hidden.html");
        touch(&base, "visible.html");

        let bases = vec![base];
        let found: Vec<_> = walk_sources(&bases).map(|(_, rel)| rel).collect();
        assert_eq!(found, vec![PathBuf::from("visible.html")]);
    }

    #[test]
    fn bases_are_visited_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("law-html");
        let second = dir.path().join("law-docs");
        touch(&first, "a.html");
        touch(&second, "b.pdf");

        let bases = vec![first.clone(), second.clone()];
        let found: Vec<_> = walk_sources(&bases).map(|(base, _)| base).collect();
        assert_eq!(found, vec![first, second]);
    }

    #[test]
    fn restartable_per_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().join("law-html");
        touch(&base, "a.html");

        let bases = vec![base];
        assert_eq!(walk_sources(&bases).count(), 1);
        assert_eq!(walk_sources(&bases).count(), 1);
    }
}
