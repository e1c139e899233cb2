//! Path Resolver: maps a relative source path to its destination under
//! the published site, applying the pretty-URL convention.

use std::path::{Path, PathBuf};

/// Compute the destination path for one source file.
///
/// - A top-level path combined with a namespace gains the namespace as
///   its parent (disambiguates top-level files across jurisdictions).
/// - Non-HTML files, `index.html`, and `index.full.html` map to
///   themselves.
/// - Every other `.html` file moves into its own directory:
///   `foo.html` becomes `foo/index.html`.
///
/// Pure and deterministic; no filesystem access.
pub fn resolve_dst_path(rel_src: &Path, namespace: Option<&str>) -> PathBuf {
    let top_level = rel_src
        .parent()
        .map(|p| p.as_os_str().is_empty())
        .unwrap_or(true);

    let rel = match namespace {
        Some(ns) if top_level => Path::new(ns).join(rel_src),
        _ => rel_src.to_path_buf(),
    };

    let is_html = rel.extension().and_then(|e| e.to_str()) == Some("html");
    let name = rel.file_name().and_then(|n| n.to_str()).unwrap_or_default();

    if !is_html || name == "index.html" || name == "index.full.html" {
        return rel;
    }

    let stem = rel
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    rel.parent()
        .unwrap_or_else(|| Path::new(""))
        .join(stem)
        .join("index.html")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(p: &str, ns: Option<&str>) -> PathBuf {
        resolve_dst_path(Path::new(p), ns)
    }

    #[test]
    fn html_files_get_pretty_urls() {
        assert_eq!(
            resolve("chapter-1/sec-2.html", None),
            PathBuf::from("chapter-1/sec-2/index.html")
        );
    }

    #[test]
    fn index_files_map_to_themselves() {
        assert_eq!(
            resolve("chapter-1/index.html", None),
            PathBuf::from("chapter-1/index.html")
        );
        assert_eq!(
            resolve("chapter-1/index.full.html", None),
            PathBuf::from("chapter-1/index.full.html")
        );
    }

    #[test]
    fn non_html_files_are_identity() {
        assert_eq!(resolve("assets/law.css", None), PathBuf::from("assets/law.css"));
        assert_eq!(
            resolve("assets/law.css", Some("ns")),
            PathBuf::from("assets/law.css")
        );
    }

    #[test]
    fn top_level_files_gain_namespace() {
        assert_eq!(resolve("law.css", Some("ns")), PathBuf::from("ns/law.css"));
        assert_eq!(
            resolve("index.html", Some("ns")),
            PathBuf::from("ns/index.html")
        );
        // Namespace applies before the pretty-URL move
        assert_eq!(
            resolve("constitution.html", Some("ns")),
            PathBuf::from("ns/constitution/index.html")
        );
    }

    #[test]
    fn no_namespace_leaves_top_level_alone() {
        assert_eq!(resolve("law.css", None), PathBuf::from("law.css"));
    }

    #[test]
    fn multi_dot_names_keep_inner_extension() {
        assert_eq!(
            resolve("codes/title-1.full.html", None),
            // index.full.html is exempt; anything else moves as a whole
            PathBuf::from("codes/title-1.full/index.html")
        );
    }

    #[test]
    fn deterministic() {
        let a = resolve("a/b/c.html", Some("ns"));
        let b = resolve("a/b/c.html", Some("ns"));
        assert_eq!(a, b);
    }
}
