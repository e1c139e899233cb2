//! Document Transform: rewrites a raw law-HTML document in place and
//! extracts the named fragments the site template splices in.
//!
//! A document without a `<main>` region is not a content document and is
//! reported as such (the caller copies it verbatim). A content document
//! missing the authenticate marker or its canonical-URL metadata is
//! malformed source data and aborts the run.

use std::path::Path;

use markup5ever_rcdom::Handle;
use tracing::debug;
use url::Url;

use lawsite_shared::{LawsiteError, Result, TemplateOptions};

use crate::dom;

/// `itemprop` values copied into the template's head.
const HEAD_ITEMPROPS: [&str; 6] = [
    "toc-json",
    "doc-type",
    "ref-doc",
    "full-html",
    "parent-doc-url",
    "ref-path",
];

/// Of those, the ones whose `content` is a root-relative reference that
/// must gain the URL prefix.
const PREFIXED_ITEMPROPS: [&str; 3] = ["toc-json", "full-html", "parent-doc-url"];

/// Element attributes treated as references during rewriting.
const REFERENCE_ATTRS: [&str; 3] = ["href", "src", "data"];

/// Class of the element announcing client-side authentication support.
const AUTH_MARKER_CLASS: &str = "tuf-authenticate";

// ---------------------------------------------------------------------------
// Fragments
// ---------------------------------------------------------------------------

/// The named fragments pulled out of one content document.
#[derive(Debug)]
pub struct DocumentFragments {
    /// Head metadata: allow-listed `<meta>` elements, stylesheet links,
    /// and scripts.
    pub head: Vec<Handle>,
    /// Breadcrumb trail items with `" | "` separators interleaved.
    pub breadcrumbs: Vec<Handle>,
    /// The optional `area__document_meta` section (zero or one).
    pub meta: Vec<Handle>,
    /// The required main-content region (exactly one).
    pub content: Vec<Handle>,
    /// Footer synthesized from the canonical URL.
    pub footer: Vec<Handle>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Transform a parsed document in place and extract its fragments.
///
/// Returns `Ok(None)` when the document has no `<main>` region (not a
/// content document; copy the source bytes instead). `src_path` is only
/// used for error reporting.
pub fn extract_fragments(
    doc: &Handle,
    src_path: &Path,
    opts: &TemplateOptions,
) -> Result<Option<DocumentFragments>> {
    if dom::find_first(doc, |n| dom::is_element(n, "main")).is_none() {
        debug!(path = %src_path.display(), "no main region, not a content document");
        return Ok(None);
    }

    rewrite_references(doc, opts);
    offset_headings(doc, opts.heading_offset);
    annotate_auth_marker(doc, src_path, opts)?;

    let fragments = DocumentFragments {
        head: extract_head(doc, opts),
        breadcrumbs: extract_breadcrumbs(doc),
        meta: extract_document_meta(doc),
        content: vec![
            dom::find_first(doc, |n| dom::is_element(n, "main"))
                .ok_or_else(|| LawsiteError::document(src_path, "main region disappeared"))?,
        ],
        footer: build_footer(doc, src_path)?,
    };

    Ok(Some(fragments))
}

// ---------------------------------------------------------------------------
// Reference rewriting
// ---------------------------------------------------------------------------

/// Rewrite every reference attribute in the tree for the document's new
/// location under the site prefix.
pub fn rewrite_references(doc: &Handle, opts: &TemplateOptions) {
    for attr in REFERENCE_ATTRS {
        for el in dom::find_all(doc, |n| dom::get_attr(n, attr).is_some()) {
            if let Some(value) = dom::get_attr(&el, attr) {
                dom::set_attr(&el, attr, &rewrite_reference(&value, opts));
            }
        }
    }
}

/// Rewrite one reference value.
///
/// A bare root reference (`/`, ignoring any `#fragment`) gains the
/// jurisdiction namespace as its first path segment. Absolute references
/// then gain the site URL prefix; `./` references gain one more leading
/// dot, compensating for the pretty-URL move of the page into its own
/// directory.
pub fn rewrite_reference(value: &str, opts: &TemplateOptions) -> String {
    let mut url = value.to_string();

    if let Some(namespace) = &opts.namespace {
        if url.split('#').next() == Some("/") {
            url = format!("/{}{}", namespace, &url[1..]);
        }
    }

    if url.starts_with('/') {
        format!("{}{url}", opts.url_prefix)
    } else if url.starts_with("./") {
        format!(".{url}")
    } else {
        url
    }
}

// ---------------------------------------------------------------------------
// Heading offset
// ---------------------------------------------------------------------------

/// Shift every `h<digit>` element by `offset` levels. Applied exactly once
/// per document; the documents nest that much deeper inside the template.
pub fn offset_headings(doc: &Handle, offset: u8) {
    let headings = dom::find_all(doc, |n| heading_level(n).is_some());
    for el in headings {
        if let Some(level) = heading_level(&el) {
            dom::rename_element(&el, &format!("h{}", level + u32::from(offset)));
        }
    }
}

/// The numeric level of a two-character `h<digit>` tag, if this is one.
fn heading_level(node: &Handle) -> Option<u32> {
    let tag = dom::tag_name(node)?;
    let mut chars = tag.chars();
    if chars.next() != Some('h') {
        return None;
    }
    let digit = chars.next()?.to_digit(10)?;
    if chars.next().is_some() {
        return None;
    }
    Some(digit)
}

// ---------------------------------------------------------------------------
// Authenticate marker
// ---------------------------------------------------------------------------

/// Record the URL prefix and heading offset on the authenticate marker so
/// client-side verification can undo the transform.
fn annotate_auth_marker(doc: &Handle, src_path: &Path, opts: &TemplateOptions) -> Result<()> {
    let marker = dom::find_first(doc, |n| {
        dom::is_element(n, "div") && dom::get_attr(n, "class").as_deref() == Some(AUTH_MARKER_CLASS)
    })
    .ok_or_else(|| {
        LawsiteError::document(src_path, format!("missing {AUTH_MARKER_CLASS} marker"))
    })?;

    dom::set_attr(&marker, "data-url-prefix", &opts.url_prefix);
    dom::set_attr(&marker, "data-h-offset", &opts.heading_offset.to_string());
    Ok(())
}

// ---------------------------------------------------------------------------
// Fragment extraction
// ---------------------------------------------------------------------------

/// Head metadata: allow-listed `<meta>` elements (reference-valued ones
/// prefixed), non-reader stylesheet links, and head scripts.
fn extract_head(doc: &Handle, opts: &TemplateOptions) -> Vec<Handle> {
    let mut out = Vec::new();

    for meta in dom::find_all(doc, |n| dom::is_element(n, "meta")) {
        let Some(itemprop) = dom::get_attr(&meta, "itemprop") else {
            continue;
        };
        if PREFIXED_ITEMPROPS.contains(&itemprop.as_str()) {
            if let Some(content) = dom::get_attr(&meta, "content") {
                dom::set_attr(&meta, "content", &format!("{}{content}", opts.url_prefix));
            }
        }
        if HEAD_ITEMPROPS.contains(&itemprop.as_str()) {
            out.push(meta);
        }
    }

    if let Some(head) = dom::find_first(doc, |n| dom::is_element(n, "head")) {
        let children: Vec<Handle> = head.children.borrow().clone();
        out.extend(children.iter().cloned().filter(|n| {
            dom::is_element(n, "link")
                && dom::get_attr(n, "type").as_deref() == Some("text/css")
                && !dom::get_attr(n, "href").unwrap_or_default().contains("_reader")
        }));
        out.extend(
            children
                .into_iter()
                .filter(|n| dom::is_element(n, "script")),
        );
    }

    out
}

/// The optional document-metadata section.
fn extract_document_meta(doc: &Handle) -> Vec<Handle> {
    dom::find_first(doc, |n| {
        dom::is_element(n, "section")
            && dom::get_attr(n, "id").as_deref() == Some("area__document_meta")
    })
    .into_iter()
    .collect()
}

/// Breadcrumb trail: the element children of the labeled navigation list,
/// joined with `" | "`, first item forced to `"Collection"`.
fn extract_breadcrumbs(doc: &Handle) -> Vec<Handle> {
    let Some(nav) = dom::find_first(doc, |n| {
        dom::is_element(n, "nav")
            && dom::get_attr(n, "aria-label").as_deref() == Some("Breadcrumb navigation")
    }) else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for li in dom::find_all(&nav, |n| dom::is_element(n, "li")) {
        items.extend(
            li.children
                .borrow()
                .iter()
                .filter(|n| dom::tag_name(n).is_some())
                .cloned(),
        );
    }

    let Some(first) = items.first() else {
        return Vec::new();
    };
    dom::set_attr(first, "title", "Collection");
    dom::set_text(first, "Collection");

    let mut trail = Vec::new();
    let last = items.len() - 1;
    for (i, item) in items.into_iter().enumerate() {
        trail.push(item);
        if i != last {
            trail.push(dom::new_text(" | "));
        }
    }
    trail
}

/// Footer built from the canonical URL, with grant attribution on the
/// site root only.
fn build_footer(doc: &Handle, src_path: &Path) -> Result<Vec<Handle>> {
    let og_url = dom::find_first(doc, |n| {
        dom::is_element(n, "meta") && dom::get_attr(n, "property").as_deref() == Some("og:url")
    })
    .and_then(|meta| dom::get_attr(&meta, "content"))
    .filter(|content| !content.is_empty())
    .ok_or_else(|| LawsiteError::document(src_path, "missing og:url metadata"))?;

    let original = dom::new_element("p", &[]);
    dom::append_child(&original, &dom::new_text("Original url: "));
    let original_link = dom::new_element("a", &[("href", &og_url)]);
    dom::append_child(&original_link, &dom::new_text(&og_url));
    dom::append_child(&original, &original_link);

    let powered = dom::new_element("p", &[]);
    dom::append_child(&powered, &dom::new_text("Powered by the non-profit "));
    let oll_link = dom::new_element("a", &[("href", "https://openlawlib.org")]);
    dom::append_child(&oll_link, &dom::new_text("Open Law Library."));
    dom::append_child(&powered, &oll_link);

    let mut footer = vec![original, powered];

    if canonical_path_is_root(&og_url) {
        let logo = dom::new_element(
            "img",
            &[
                (
                    "src",
                    "https://www.imls.gov/sites/default/files/imls_logo_2c.gif",
                ),
                ("alt", "Institute of Museum and Library Services logo"),
                (
                    "style",
                    "width: 40%; margin: .25in 0; max-width: 325px; min-width: 200px;",
                ),
            ],
        );
        let grant = dom::new_element(
            "p",
            &[("style", "width: 40%; max-width: 325px; min-width: 200px;")],
        );
        dom::append_child(
            &grant,
            &dom::new_text(
                "This project was made possible in part by the Institute of Museum and Library Services (",
            ),
        );
        let grant_link = dom::new_element(
            "a",
            &[
                (
                    "href",
                    "https://www.imls.gov/grants/awarded/lg-246285-ols-20",
                ),
                ("target", "_blank"),
            ],
        );
        dom::append_child(&grant_link, &dom::new_text("LG-246285-OLS-20"));
        dom::append_child(&grant, &grant_link);
        dom::append_child(&grant, &dom::new_text(")."));

        footer.push(logo);
        footer.push(grant);
    }

    Ok(footer)
}

/// Whether the canonical URL points at the site root.
fn canonical_path_is_root(og_url: &str) -> bool {
    match Url::parse(og_url) {
        Ok(url) => url.path() == "/",
        Err(_) => og_url.split(['#', '?']).next() == Some("/"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
