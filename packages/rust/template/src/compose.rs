//! Template Composer: splices named fragments into a site template
//! skeleton, and fetches per-jurisdiction skeletons.
//!
//! The skeleton marks insertion points with `<replace name="...">`
//! elements. Each marker is replaced independently; unknown names splice
//! nothing. The shared skeleton is deep-copied per document so composing
//! one page can never leak fragments into another.

use std::collections::BTreeMap;
use std::path::PathBuf;

use markup5ever_rcdom::{Handle, NodeData};
use tracing::{debug, instrument};

use lawsite_shared::{LawsiteError, Result};

use crate::dom;
use crate::transform::DocumentFragments;

/// One value to splice at a placeholder: either a list of nodes inserted
/// in order, or literal text merged into the surrounding content.
pub enum Replacement {
    /// Nodes inserted after the marker's position, in order.
    Nodes(Vec<Handle>),
    /// Literal text merged with the marker's trailing text.
    Text(String),
}

/// Placeholder-name → replacement mapping for one document.
pub type Replacements = BTreeMap<String, Replacement>;

impl DocumentFragments {
    /// The composer mapping for this document's standard placeholders.
    pub fn into_replacements(self) -> Replacements {
        let mut map = Replacements::new();
        map.insert("head".into(), Replacement::Nodes(self.head));
        map.insert("breadcrumbs".into(), Replacement::Nodes(self.breadcrumbs));
        map.insert("meta".into(), Replacement::Nodes(self.meta));
        map.insert("content".into(), Replacement::Nodes(self.content));
        map.insert("footer".into(), Replacement::Nodes(self.footer));
        map
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Compose a document by splicing `replacements` into a deep copy of the
/// skeleton. The skeleton itself is never mutated.
pub fn compose(skeleton: &Handle, replacements: &Replacements) -> Handle {
    let doc = dom::deep_clone(skeleton);

    for marker in dom::find_all(&doc, |n| dom::is_element(n, "replace")) {
        let name = dom::get_attr(&marker, "name").unwrap_or_default();
        match replacements.get(&name) {
            Some(Replacement::Text(text)) => splice_text(&marker, text),
            Some(Replacement::Nodes(nodes)) => splice_nodes(&marker, nodes),
            None => {
                debug!(placeholder = %name, "no fragment for placeholder");
                splice_nodes(&marker, &[]);
            }
        }
        dom::detach(&marker);
    }

    doc
}

/// Insert literal text after the marker, merging with pre-existing
/// trailing text. The marker's children are discarded with it.
fn splice_text(marker: &Handle, text: &str) {
    match dom::next_sibling(marker) {
        Some(next) => {
            if let NodeData::Text { contents } = &next.data {
                let merged = format!("{text}{}", contents.borrow());
                *contents.borrow_mut() = merged.into();
            } else {
                dom::insert_after(marker, &dom::new_text(text));
            }
        }
        None => dom::insert_after(marker, &dom::new_text(text)),
    }
}

/// Insert nodes after the marker in list order. Whitespace-only trailing
/// text of the marker is discarded; non-whitespace trailing text ends up
/// after the last inserted node.
fn splice_nodes(marker: &Handle, nodes: &[Handle]) {
    if let Some(tail) = dom::next_sibling(marker) {
        if dom::is_whitespace_text(&tail) {
            dom::detach(&tail);
        }
    }

    // Inserting in reverse, one at a time after the marker, reproduces
    // forward order.
    for node in nodes.iter().rev() {
        dom::insert_after(marker, node);
    }
}

// ---------------------------------------------------------------------------
// Skeleton loading
// ---------------------------------------------------------------------------

/// Where per-jurisdiction template skeletons come from.
#[derive(Debug, Clone)]
pub enum SkeletonSource {
    /// Fetch `<base_url><namespace>/template.html` over HTTP.
    Remote { base_url: String },
    /// Read `<dir>/<namespace>/template.html` from disk.
    LocalDir(PathBuf),
}

/// Load and parse the skeleton for one jurisdiction.
///
/// The published skeleton carries asset references relative to its
/// on-site location; those are rebased onto the URL prefix before
/// parsing.
#[instrument(skip(source))]
pub fn load_skeleton(source: &SkeletonSource, namespace: &str, url_prefix: &str) -> Result<Handle> {
    let bytes = match source {
        SkeletonSource::Remote { base_url } => {
            let url = format!("{base_url}{namespace}/template.html");
            debug!(%url, "fetching template skeleton");
            let response = reqwest::blocking::get(&url)
                .map_err(|e| LawsiteError::Http(format!("{url}: {e}")))?;
            if !response.status().is_success() {
                return Err(LawsiteError::Http(format!(
                    "{url}: HTTP {}",
                    response.status()
                )));
            }
            response
                .bytes()
                .map_err(|e| LawsiteError::Http(format!("{url}: {e}")))?
                .to_vec()
        }
        SkeletonSource::LocalDir(dir) => {
            let path = dir.join(namespace).join("template.html");
            std::fs::read(&path).map_err(|e| LawsiteError::io(&path, e))?
        }
    };

    let fixed = rebase_skeleton_refs(&bytes, url_prefix);
    dom::parse_html(&fixed)
}

/// Rewrite the skeleton's relative asset prefixes onto absolute site
/// paths. Six levels up is the site root above the URL prefix; five is
/// the prefix itself.
fn rebase_skeleton_refs(bytes: &[u8], url_prefix: &str) -> Vec<u8> {
    let site_root = url_prefix
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .unwrap_or("");

    let text = String::from_utf8_lossy(bytes);
    let text = text.replace("=\"../../../../../../", &format!("=\"{site_root}/"));
    let text = text.replace("=\"../../../../../", &format!("=\"{url_prefix}/"));
    text.into_bytes()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
