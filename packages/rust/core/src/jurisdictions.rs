//! Jurisdiction Config Loader: derives the partner list from the
//! dependency declaration, resolves each partner's canonical domain from
//! repository metadata, and looks up per-tribe template variables.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use lawsite_repo::MetadataStore;
use lawsite_shared::{Jurisdiction, LawsiteError, Result, TribeConfig, TribesTable};
use lawsite_template::{Replacement, Replacements, dom};

/// A jurisdiction left out of this run, reported at the end.
#[derive(Debug, Clone)]
pub struct SkippedJurisdiction {
    pub org: String,
    pub reason: String,
}

/// Derive the jurisdiction list from `dependencies.json` and each
/// partner's namespace marker file.
///
/// Malformed or missing dependency data is fatal for the whole run; a
/// partner without a namespace marker is skipped and reported.
pub fn load_jurisdictions(
    dependencies_path: &Path,
    library_root: &Path,
    skipped: &mut Vec<SkippedJurisdiction>,
) -> Result<Vec<Jurisdiction>> {
    let content = std::fs::read_to_string(dependencies_path)
        .map_err(|e| LawsiteError::io(dependencies_path, e))?;
    let declaration: Value = serde_json::from_str(&content).map_err(|e| {
        LawsiteError::validation(format!(
            "invalid dependency declaration {}: {e}",
            dependencies_path.display()
        ))
    })?;

    let dependencies = declaration
        .get("dependencies")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            LawsiteError::validation(format!(
                "{} has no top-level dependencies object",
                dependencies_path.display()
            ))
        })?;

    let mut jurisdictions = Vec::new();
    for org in dependencies.keys() {
        let marker = library_root.join(org).join("law").join("namespace");
        match std::fs::read_to_string(&marker) {
            Ok(namespace) => {
                let namespace = namespace.trim().to_string();
                debug!(%org, %namespace, "jurisdiction resolved");
                jurisdictions.push(Jurisdiction {
                    org: org.clone(),
                    namespace,
                });
            }
            Err(e) => {
                warn!(%org, marker = %marker.display(), error = %e, "no namespace marker, skipping");
                skipped.push(SkippedJurisdiction {
                    org: org.clone(),
                    reason: format!("no namespace marker: {e}"),
                });
            }
        }
    }

    Ok(jurisdictions)
}

/// Resolve a jurisdiction's canonical domain from its repository
/// metadata (`meta.canonical-urls.html`, either a bare string or a
/// record with a `current` field).
pub fn canonical_domain(store: &dyn MetadataStore, org: &str) -> Result<String> {
    let meta = store
        .read_file("meta.json")
        .map_err(|e| LawsiteError::metadata(org, e.to_string()))?;

    let html_url = match &meta["canonical-urls"]["html"] {
        Value::String(url) => url.clone(),
        Value::Object(record) => record
            .get("current")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                LawsiteError::metadata(org, "canonical-urls.html record has no current field")
            })?,
        _ => {
            return Err(LawsiteError::metadata(
                org,
                "meta.json has no canonical-urls.html",
            ));
        }
    };

    // A full URL yields its host; a bare domain is used as-is.
    Ok(Url::parse(&html_url)
        .ok()
        .and_then(|url| url.host_str().map(String::from))
        .unwrap_or(html_url))
}

/// Load the `tribes.json` lookup table.
pub fn load_tribes(path: &Path) -> Result<TribesTable> {
    let content = std::fs::read_to_string(path).map_err(|e| LawsiteError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| LawsiteError::validation(format!("invalid {}: {e}", path.display())))
}

/// Jurisdiction-specific replacements for the composer: the tribe's
/// display name as literal text, its links as anchor nodes.
///
/// Built fresh per document — spliced nodes move into the composed page.
pub fn tribe_replacements(tribe: &TribeConfig) -> Replacements {
    let official = dom::new_element("a", &[("href", tribe.official_site.as_str())]);
    dom::append_child(&official, &dom::new_text("Official Website"));

    let nill_page = dom::new_element("a", &[("href", tribe.tribes_nill_page.as_str())]);
    dom::append_child(&nill_page, &dom::new_text("Tribal Profile"));

    let mut replacements = Replacements::new();
    replacements.insert(
        "tribe-name".into(),
        Replacement::Text(tribe.tribe_full_name.clone()),
    );
    replacements.insert("official-site".into(), Replacement::Nodes(vec![official]));
    replacements.insert(
        "tribes-nill-page".into(),
        Replacement::Nodes(vec![nill_page]),
    );
    replacements
}
