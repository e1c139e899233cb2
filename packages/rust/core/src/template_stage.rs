//! Template stage: walks every jurisdiction's content repositories and
//! rewrites raw law documents into templated site pages under the
//! destination repository.
//!
//! Per jurisdiction: incremental gate → domain/tribe lookup → skeleton
//! load → tree walk → transform-and-compose (or verbatim copy) → ledger
//! update. Jurisdictions that cannot be resolved are skipped and listed
//! in the end-of-run report; malformed content documents abort the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, instrument, warn};

use lawsite_repo::{FsMetadataStore, MetadataStore};
use lawsite_shared::{
    AppConfig, LawsiteError, Result, StageContext, TemplateOptions, TribeConfig,
};
use lawsite_template::{Handle, SkeletonSource, compose, dom, extract_fragments, load_skeleton};

use crate::jurisdictions::{
    self, SkippedJurisdiction, canonical_domain, load_jurisdictions, load_tribes,
};
use crate::ledger::{Ledger, should_process};
use crate::paths::resolve_dst_path;
use crate::walk::walk_sources;

// ---------------------------------------------------------------------------
// Progress & report
// ---------------------------------------------------------------------------

/// Progress callback for reporting stage status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each file is written.
    fn file_written(&self, path: &Path, count: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_written(&self, _path: &Path, _count: usize) {}
}

/// Result of one template-stage run.
#[derive(Debug, Default)]
pub struct StageReport {
    /// Jurisdictions fully templated this run.
    pub processed: Vec<String>,
    /// Jurisdictions skipped because every tracked revision was current.
    pub skipped_unchanged: Vec<String>,
    /// Jurisdictions skipped for missing config/metadata, with reasons.
    pub skipped: Vec<SkippedJurisdiction>,
    /// Documents transformed and composed.
    pub files_templated: usize,
    /// Files copied verbatim.
    pub files_copied: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Run the template stage.
#[instrument(skip_all)]
pub fn run_template_stage(
    config: &AppConfig,
    ctx: &StageContext,
    progress: &dyn ProgressReporter,
) -> Result<StageReport> {
    let start = Instant::now();
    let mut report = StageReport::default();

    progress.phase("Resolving jurisdictions");
    let jurisdictions =
        load_jurisdictions(&ctx.dependencies_path, &ctx.library_root, &mut report.skipped)?;
    let tribes = load_tribes(&ctx.tribes_path)?;
    let mut ledger = Ledger::load(&ctx.ledger_path)?;

    let skeleton_source = match &config.template.local_dir {
        Some(dir) => SkeletonSource::LocalDir(PathBuf::from(dir)),
        None => SkeletonSource::Remote {
            base_url: config.template.base_url.clone(),
        },
    };

    for jurisdiction in jurisdictions {
        let org = jurisdiction.org.clone();
        let namespace = jurisdiction.namespace.clone();
        let store = FsMetadataStore::new(ctx.library_root.join(&org).join("law"));

        // --- Incremental gate ---
        let revisions = match tracked_revisions(&store, &config.update.tracked_content_types) {
            Ok(revisions) => revisions,
            Err(e) => {
                warn!(%org, error = %e, "metadata lookup failed, skipping jurisdiction");
                report.skipped.push(SkippedJurisdiction {
                    org,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !should_process(&ledger, &namespace, &revisions) {
            info!(%org, "all tracked revisions unchanged, skipping");
            report.skipped_unchanged.push(org);
            continue;
        }

        // --- Domain and tribe config ---
        let tribe = match canonical_domain(&store, &org) {
            Ok(domain) => match tribes.get(&domain) {
                Some(tribe) => tribe.clone(),
                None => {
                    warn!(%org, %domain, "config unavailable for this jurisdiction");
                    report.skipped.push(SkippedJurisdiction {
                        org,
                        reason: format!("config unavailable for domain {domain}"),
                    });
                    continue;
                }
            },
            Err(e) => {
                warn!(%org, error = %e, "cannot resolve canonical domain");
                report.skipped.push(SkippedJurisdiction {
                    org,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        // --- Skeleton ---
        progress.phase(&format!("Templating {org}"));
        let skeleton = load_skeleton(&skeleton_source, &namespace, &config.template.url_prefix)?;

        // --- Walk and write ---
        let partner_root = ctx.library_root.join(&org);
        let mut bases: Vec<PathBuf> = config
            .update
            .content_repos
            .iter()
            .map(|repo| partner_root.join(repo))
            .collect();
        bases.push(ctx.library_root.join(&config.update.shared_assets));

        let opts = TemplateOptions::for_namespace(&config.template, Some(namespace.clone()));
        let mut written = 0usize;

        for (base, rel) in walk_sources(&bases) {
            let src = base.join(&rel);
            let dst = ctx.dst_root.join(resolve_dst_path(&rel, Some(&namespace)));

            if process_file(&src, &rel, &dst, &skeleton, &opts, &tribe)? {
                report.files_templated += 1;
            } else {
                report.files_copied += 1;
            }
            written += 1;
            progress.file_written(&dst, written);
        }

        // --- Ledger update (only after the full file set succeeded) ---
        for (content_type, revision) in &revisions {
            ledger.record(&Ledger::key(&namespace, content_type), revision);
        }
        ledger.save()?;

        info!(%org, files = written, "jurisdiction templated");
        report.processed.push(org);
    }

    report.elapsed = start.elapsed();
    info!(
        processed = report.processed.len(),
        unchanged = report.skipped_unchanged.len(),
        skipped = report.skipped.len(),
        templated = report.files_templated,
        copied = report.files_copied,
        "template stage complete"
    );

    Ok(report)
}

/// Current signed revisions for the tracked content types. Types without
/// a signed entry are left out.
fn tracked_revisions(
    store: &dyn MetadataStore,
    tracked: &[String],
) -> Result<BTreeMap<String, String>> {
    let mut revisions = BTreeMap::new();
    for content_type in tracked {
        if let Some(revision) = store.target_commit(content_type)? {
            revisions.insert(content_type.clone(), revision);
        }
    }
    Ok(revisions)
}

/// Transform one source file into its destination. Returns `true` when
/// the file was templated, `false` when copied verbatim.
fn process_file(
    src: &Path,
    rel: &Path,
    dst: &Path,
    skeleton: &Handle,
    opts: &TemplateOptions,
    tribe: &TribeConfig,
) -> Result<bool> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LawsiteError::io(parent, e))?;
    }

    if rel.extension().and_then(|e| e.to_str()) != Some("html") {
        std::fs::copy(src, dst).map_err(|e| LawsiteError::io(src, e))?;
        return Ok(false);
    }

    let bytes = std::fs::read(src).map_err(|e| LawsiteError::io(src, e))?;
    let doc = dom::parse_html(&bytes)?;

    match extract_fragments(&doc, src, opts)? {
        Some(fragments) => {
            let mut replacements = fragments.into_replacements();
            replacements.extend(jurisdictions::tribe_replacements(tribe));

            let composed = compose(skeleton, &replacements);
            let out = dom::serialize_document(&composed)?;
            std::fs::write(dst, out).map_err(|e| LawsiteError::io(dst, e))?;
            Ok(true)
        }
        None => {
            // No main region: not a content document, copy the bytes.
            std::fs::copy(src, dst).map_err(|e| LawsiteError::io(src, e))?;
            Ok(false)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a one-jurisdiction library root with a local skeleton.
    struct Fixture {
        dir: tempfile::TempDir,
        config: AppConfig,
    }

    const NS: &str = "us/nsn/san-ildefonso/council";

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let root = dir.path();

            write(root, "dependencies.json", r#"{"dependencies": {"sanipueblo": {}}}"#);
            write(root, "sanipueblo/law/namespace", NS);
            write(
                root,
                "sanipueblo/law/meta.json",
                r#"{"canonical-urls": {"html": "https://sanipueblo.example/"}}"#,
            );
            write(
                root,
                "sanipueblo/law/targets/law-html.json",
                r#"{"commit": "abc"}"#,
            );
            write(
                root,
                "tribes.json",
                r#"{"sanipueblo.example": {
                    "official-site": "https://sanipueblo.example",
                    "tribes-nill-page": "https://narf.example/nill/tribes/sanipueblo.html",
                    "tribe-full-name": "Pueblo de San Ildefonso",
                    "tribe": "San Ildefonso"
                }}"#,
            );
            write(
                root,
                &format!("templates/{NS}/template.html"),
                r#"<html><head><title>NILL</title></head><body>
                   <h1><replace name="tribe-name"></replace></h1>
                   <nav><replace name="breadcrumbs"></replace></nav>
                   <article><replace name="content"></replace></article>
                   <footer><replace name="footer"></replace>
                   <replace name="official-site"></replace></footer>
                   </body></html>"#,
            );
            write(
                root,
                "sanipueblo/law-html/index.html",
                r#"<html><head>
                   <meta property="og:url" content="https://sanipueblo.example/">
                   </head><body>
                   <nav aria-label="Breadcrumb navigation"><ul>
                   <li><a href="/" title="Home">Home</a></li>
                   <li><a href="/code" title="Code">Code</a></li>
                   </ul></nav>
                   <div class="tuf-authenticate"></div>
                   <main><h1>The Code</h1></main>
                   </body></html>"#,
            );
            write(root, "sanipueblo/law-html/style.css", "body {}");
            write(
                root,
                "sanipueblo/law-html/plain.html",
                "<html><body><p>no main here</p></body></html>",
            );

            let mut config = AppConfig::default();
            config.paths.library_root = root.to_string_lossy().into_owned();
            config.template.local_dir =
                Some(root.join("templates").to_string_lossy().into_owned());

            Self { dir, config }
        }

        fn ctx(&self) -> StageContext {
            StageContext::from_config(&self.config).expect("context")
        }

        fn dst_root(&self) -> PathBuf {
            self.dir.path().join("narf-nill/law-html/triballaw")
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, content).expect("write");
    }

    #[test]
    fn end_to_end_one_document_run() {
        let fixture = Fixture::new();
        let report =
            run_template_stage(&fixture.config, &fixture.ctx(), &SilentProgress).expect("stage");

        assert_eq!(report.processed, vec!["sanipueblo"]);
        assert!(report.skipped.is_empty());
        assert_eq!(report.files_templated, 1);
        assert_eq!(report.files_copied, 2);

        // index.html keeps its name (no pretty-URL move) under the namespace
        let page = fixture.dst_root().join(NS).join("index.html");
        let html = std::fs::read_to_string(&page).expect("templated page");

        // Breadcrumb head forced to Collection
        assert!(html.contains("Collection"));
        // Root canonical URL brings the grant attribution block
        assert!(html.contains("LG-246285-OLS-20"));
        // Heading offset applied inside the spliced content
        assert!(html.contains("<h3>The Code</h3>"));
        // Jurisdiction replacements spliced
        assert!(html.contains("Pueblo de San Ildefonso"));
        assert!(html.contains("https://sanipueblo.example"));
        // No markers survive composition
        assert!(!html.contains("<replace"));

        // The document without a main region was copied verbatim,
        // pretty-URL move applied
        let plain = fixture.dst_root().join(NS).join("plain/index.html");
        let plain_html = std::fs::read_to_string(&plain).expect("verbatim copy");
        assert!(plain_html.contains("no main here"));
        assert!(!plain_html.contains("<title>NILL</title>"));

        // Non-HTML assets copied as-is
        assert!(fixture.dst_root().join(NS).join("style.css").exists());
    }

    #[test]
    fn ledger_gates_second_run() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();

        let first = run_template_stage(&fixture.config, &ctx, &SilentProgress).expect("first");
        assert_eq!(first.processed, vec!["sanipueblo"]);

        let second = run_template_stage(&fixture.config, &ctx, &SilentProgress).expect("second");
        assert!(second.processed.is_empty());
        assert_eq!(second.skipped_unchanged, vec!["sanipueblo"]);

        // A new signed revision reopens the gate
        write(
            fixture.dir.path(),
            "sanipueblo/law/targets/law-html.json",
            r#"{"commit": "def"}"#,
        );
        let third = run_template_stage(&fixture.config, &ctx, &SilentProgress).expect("third");
        assert_eq!(third.processed, vec!["sanipueblo"]);
    }

    #[test]
    fn missing_tribe_config_skips_jurisdiction() {
        let fixture = Fixture::new();
        write(fixture.dir.path(), "tribes.json", "{}");

        let report =
            run_template_stage(&fixture.config, &fixture.ctx(), &SilentProgress).expect("stage");
        assert!(report.processed.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("config unavailable"));
    }

    #[test]
    fn malformed_document_aborts_the_run() {
        let fixture = Fixture::new();
        // A content document (has main) without the authenticate marker
        write(
            fixture.dir.path(),
            "sanipueblo/law-html/bad.html",
            r#"<html><head><meta property="og:url" content="/x"></head>
               <body><main><p>law</p></main></body></html>"#,
        );

        let err = run_template_stage(&fixture.config, &fixture.ctx(), &SilentProgress)
            .unwrap_err();
        assert!(err.to_string().contains("tuf-authenticate"));
    }

    #[test]
    fn tracked_types_policy_controls_the_gate() {
        let mut fixture = Fixture::new();
        fixture.config.update.tracked_content_types =
            vec!["law-html".into(), "law-docs".into()];
        let ctx = fixture.ctx();

        run_template_stage(&fixture.config, &ctx, &SilentProgress).expect("first");

        // law-docs gains its first signed entry: the jurisdiction must
        // be processed again even though law-html is unchanged
        write(
            fixture.dir.path(),
            "sanipueblo/law/targets/law-docs.json",
            r#"{"commit": "d1"}"#,
        );
        let second = run_template_stage(&fixture.config, &ctx, &SilentProgress).expect("second");
        assert_eq!(second.processed, vec!["sanipueblo"]);
    }
}
