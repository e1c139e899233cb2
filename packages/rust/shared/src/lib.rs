//! Shared types, error model, and configuration for lawsite.
//!
//! This crate is the foundation depended on by all other lawsite crates.
//! It provides:
//! - [`LawsiteError`] — the unified error type
//! - Domain types ([`Jurisdiction`], [`TribeConfig`], [`StateEnvelope`], [`LedgerEntry`])
//! - Configuration ([`AppConfig`], [`StageContext`], [`TemplateOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CloneRepoConfig, DeployConfig, PathsConfig, StageContext, TemplateConfig,
    TemplateOptions, UpdateConfig, config_dir, init_config, load_config, load_config_from,
};
pub use error::{LawsiteError, Result};
pub use types::{Jurisdiction, LedgerEntry, StateEnvelope, TribeConfig, TribesTable};
