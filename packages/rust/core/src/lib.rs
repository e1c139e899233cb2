//! Stage orchestration and domain logic for the lawsite pipeline.
//!
//! This crate ties together path resolution, tree walking, jurisdiction
//! configuration, the incremental ledger, and the transform/compose
//! machinery into the three update stages (`clone`, `template`,
//! `deploy`) driven by the CLI.

pub mod deploy;
pub mod jurisdictions;
pub mod ledger;
pub mod paths;
pub mod state;
pub mod template_stage;
pub mod walk;

pub use deploy::{DeployOutcome, SiteRepository, run_clone, run_deploy};
pub use jurisdictions::SkippedJurisdiction;
pub use ledger::Ledger;
pub use paths::resolve_dst_path;
pub use template_stage::{ProgressReporter, SilentProgress, StageReport, run_template_stage};
pub use walk::walk_sources;
