//! Application configuration for lawsite.
//!
//! User config lives at `lawsite.toml` in the working directory or
//! `~/.lawsite/lawsite.toml`. CLI flags override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LawsiteError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "lawsite.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".lawsite";

// ---------------------------------------------------------------------------
// Config structs (matching lawsite.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Library-root layout.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Templating settings.
    #[serde(default)]
    pub template: TemplateConfig,

    /// Incremental-update policy.
    #[serde(default)]
    pub update: UpdateConfig,

    /// Deploy-stage settings.
    #[serde(default)]
    pub deploy: DeployConfig,

    /// Repositories the clone stage sets up. When empty, the
    /// destination repository with the deploy URLs is cloned.
    #[serde(default)]
    pub clone_repos: Vec<CloneRepoConfig>,
}

/// `[[clone_repos]]` entry — one repository to clone into the library root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneRepoConfig {
    /// Repository name under the library root (`<org>/<repo>`).
    pub name: String,
    /// Remote URLs, tried in order.
    #[serde(default)]
    pub urls: Vec<String>,
}

/// `[paths]` section — everything is resolved relative to `library_root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the content archive holding all partner repositories.
    #[serde(default = "default_library_root")]
    pub library_root: String,

    /// Destination site repository, as `<org>/<name>` under the library root.
    #[serde(default = "default_destination_repo")]
    pub destination_repo: String,

    /// Subdirectory of the destination repository receiving templated pages.
    #[serde(default = "default_site_subdir")]
    pub site_subdir: String,

    /// Processing-ledger file, relative to the library root.
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,

    /// Per-domain tribe configuration table, relative to the library root.
    #[serde(default = "default_tribes_file")]
    pub tribes_file: String,

    /// Dependency declaration listing partner organizations.
    #[serde(default = "default_dependencies_file")]
    pub dependencies_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            library_root: default_library_root(),
            destination_repo: default_destination_repo(),
            site_subdir: default_site_subdir(),
            ledger_file: default_ledger_file(),
            tribes_file: default_tribes_file(),
            dependencies_file: default_dependencies_file(),
        }
    }
}

fn default_library_root() -> String {
    ".".into()
}
fn default_destination_repo() -> String {
    "narf-nill/law-html".into()
}
fn default_site_subdir() -> String {
    "triballaw".into()
}
fn default_ledger_file() -> String {
    ".lawsite/ledger.json".into()
}
fn default_tribes_file() -> String {
    "tribes.json".into()
}
fn default_dependencies_file() -> String {
    "dependencies.json".into()
}

/// `[template]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Prefix prepended to every absolute reference in transformed pages.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,

    /// Amount added to every heading level (documents nest under the
    /// site template's own headings).
    #[serde(default = "default_heading_offset")]
    pub heading_offset: u8,

    /// Base URL for per-jurisdiction template skeletons.
    #[serde(default = "default_template_base_url")]
    pub base_url: String,

    /// Local directory of skeletons (overrides `base_url` when set).
    #[serde(default)]
    pub local_dir: Option<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            url_prefix: default_url_prefix(),
            heading_offset: default_heading_offset(),
            base_url: default_template_base_url(),
            local_dir: None,
        }
    }
}

fn default_url_prefix() -> String {
    "/nill/triballaw".into()
}
fn default_heading_offset() -> u8 {
    2
}
fn default_template_base_url() -> String {
    "https://www.narf.org/nill/triballaw/templates/".into()
}

/// `[update]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Content types whose revisions gate the incremental skip.
    /// Add `law-docs` and `law-static-assets` to require all three.
    #[serde(default = "default_tracked_content_types")]
    pub tracked_content_types: Vec<String>,

    /// Per-partner content repositories walked during templating, in order.
    #[serde(default = "default_content_repos")]
    pub content_repos: Vec<String>,

    /// Shared static-assets repository walked after the partner repositories.
    #[serde(default = "default_shared_assets")]
    pub shared_assets: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            tracked_content_types: default_tracked_content_types(),
            content_repos: default_content_repos(),
            shared_assets: default_shared_assets(),
        }
    }
}

fn default_tracked_content_types() -> Vec<String> {
    vec!["law-html".into()]
}
fn default_content_repos() -> Vec<String> {
    vec![
        "law-html".into(),
        "law-docs".into(),
        "law-static-assets".into(),
    ]
}
fn default_shared_assets() -> String {
    "openlawlibrary/law-static-assets".into()
}

/// `[deploy]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Remote URLs used when the destination repository must be cloned.
    #[serde(default)]
    pub repo_urls: Vec<String>,

    /// Commit message subject; the deploy stage prefixes a timestamp.
    #[serde(default = "default_commit_subject")]
    pub commit_subject: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            repo_urls: Vec::new(),
            commit_subject: default_commit_subject(),
        }
    }
}

fn default_commit_subject() -> String {
    "Updates to Tribal Law".into()
}

// ---------------------------------------------------------------------------
// Runtime options (resolved from config, passed into components)
// ---------------------------------------------------------------------------

/// Immutable per-run transform options. Components take this record instead
/// of reading process-wide globals, keeping the transform pure and testable.
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    /// Prefix for absolute references (e.g. `/nill/triballaw`).
    pub url_prefix: String,
    /// Heading-level offset applied exactly once per document.
    pub heading_offset: u8,
    /// Jurisdiction namespace inserted into root-relative references.
    pub namespace: Option<String>,
}

impl TemplateOptions {
    /// Options for one jurisdiction, derived from the template config.
    pub fn for_namespace(config: &TemplateConfig, namespace: Option<String>) -> Self {
        Self {
            url_prefix: config.url_prefix.clone(),
            heading_offset: config.heading_offset,
            namespace,
        }
    }
}

/// Resolved filesystem layout for one stage run.
#[derive(Debug, Clone)]
pub struct StageContext {
    /// Absolute library root (must exist).
    pub library_root: PathBuf,
    /// Destination site repository path.
    pub destination_repo: PathBuf,
    /// Directory under the destination repository receiving templated pages.
    pub dst_root: PathBuf,
    /// Processing-ledger file.
    pub ledger_path: PathBuf,
    /// Tribe configuration table.
    pub tribes_path: PathBuf,
    /// Dependency declaration.
    pub dependencies_path: PathBuf,
}

impl StageContext {
    /// Resolve the stage layout from config.
    ///
    /// A missing library root is fatal for the whole run.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let library_root = PathBuf::from(&config.paths.library_root);
        if !library_root.is_dir() {
            return Err(LawsiteError::config(format!(
                "content archive at {} does not exist",
                library_root.display()
            )));
        }

        let destination_repo = library_root.join(&config.paths.destination_repo);
        let dst_root = destination_repo.join(&config.paths.site_subdir);

        Ok(Self {
            ledger_path: library_root.join(&config.paths.ledger_file),
            tribes_path: library_root.join(&config.paths.tribes_file),
            dependencies_path: library_root.join(&config.paths.dependencies_file),
            library_root,
            destination_repo,
            dst_root,
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.lawsite/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LawsiteError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Load the application config.
///
/// Search order: `./lawsite.toml`, then `~/.lawsite/lawsite.toml`.
/// Returns defaults if neither exists.
pub fn load_config() -> Result<AppConfig> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config_from(&local);
    }

    let user = config_dir()?.join(CONFIG_FILE_NAME);
    if user.exists() {
        return load_config_from(&user);
    }

    tracing::debug!("no config file found, using defaults");
    Ok(AppConfig::default())
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LawsiteError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LawsiteError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LawsiteError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LawsiteError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LawsiteError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
