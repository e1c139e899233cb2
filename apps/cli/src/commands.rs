//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use lawsite_core::state;
use lawsite_core::template_stage::{ProgressReporter, run_template_stage};
use lawsite_core::{DeployOutcome, run_clone, run_deploy};
use lawsite_repo::ContentRepository;
use lawsite_shared::{
    AppConfig, LawsiteError, StageContext, StateEnvelope, init_config, load_config,
    load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// lawsite — update stages for the tribal-law publishing pipeline.
#[derive(Parser)]
#[command(
    name = "lawsite",
    version,
    about = "Clone, template, and deploy tribal-law content as site pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (defaults to ./lawsite.toml, then ~/.lawsite/).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Clone the destination site repository into the library root.
    Clone,

    /// Transform raw law documents into templated site pages.
    Template,

    /// Pull, commit, and push the destination repository.
    Deploy,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Everything goes to stderr;
/// stdout is reserved for the state channel.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug,git2=info",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Clone => run_stage(&config, cmd_clone),
        Command::Template => run_stage(&config, cmd_template),
        Command::Deploy => run_stage(&config, cmd_deploy),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Stage wrapper: read the envelope from stdin, run the stage, and echo
/// the state to stdout. A failed stage writes `{"error": ...}` instead
/// and exits non-zero through the returned error.
fn run_stage<F>(config: &AppConfig, stage: F) -> Result<()>
where
    F: FnOnce(&AppConfig, &StateEnvelope) -> lawsite_shared::Result<()>,
{
    let envelope = match state::read_envelope(std::io::stdin().lock()) {
        Ok(envelope) => envelope,
        Err(e) => {
            state::write_error(std::io::stdout().lock(), &e.to_string())?;
            return Err(eyre!("{e}"));
        }
    };

    match stage(config, &envelope) {
        Ok(()) => {
            let mut stdout = std::io::stdout().lock();
            state::write_state(&mut stdout, &envelope.state)?;
            stdout.flush().ok();
            Ok(())
        }
        Err(e) => {
            state::write_error(std::io::stdout().lock(), &e.to_string())?;
            Err(eyre!("{e}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

fn cmd_clone(config: &AppConfig, _envelope: &StateEnvelope) -> lawsite_shared::Result<()> {
    let ctx = StageContext::from_config(config)?;

    let repos: Vec<ContentRepository> = if config.clone_repos.is_empty() {
        vec![ContentRepository::new(
            &ctx.library_root,
            &config.paths.destination_repo,
            config.deploy.repo_urls.clone(),
        )]
    } else {
        config
            .clone_repos
            .iter()
            .map(|entry| {
                ContentRepository::new(&ctx.library_root, &entry.name, entry.urls.clone())
            })
            .collect()
    };

    info!(count = repos.len(), "clone stage");
    run_clone(&repos)
}

fn cmd_template(config: &AppConfig, _envelope: &StateEnvelope) -> lawsite_shared::Result<()> {
    let ctx = StageContext::from_config(config)?;
    let reporter = CliProgress::new();

    let report = run_template_stage(config, &ctx, &reporter)?;
    reporter.finish();

    for skipped in &report.skipped {
        info!(org = %skipped.org, reason = %skipped.reason, "jurisdiction skipped");
    }
    info!(
        processed = report.processed.len(),
        unchanged = report.skipped_unchanged.len(),
        skipped = report.skipped.len(),
        templated = report.files_templated,
        copied = report.files_copied,
        elapsed_ms = report.elapsed.as_millis(),
        "template stage finished"
    );
    Ok(())
}

fn cmd_deploy(config: &AppConfig, _envelope: &StateEnvelope) -> lawsite_shared::Result<()> {
    let ctx = StageContext::from_config(config)?;
    let repo = ContentRepository::new(
        &ctx.library_root,
        &config.paths.destination_repo,
        config.deploy.repo_urls.clone(),
    );

    match run_deploy(&repo, &config.deploy.commit_subject)? {
        DeployOutcome::Pushed => info!("site updates pushed"),
        DeployOutcome::NothingToCommit => info!("nothing to commit"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    eprintln!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| LawsiteError::config(e.to_string()))?;
    print!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_written(&self, path: &Path, count: usize) {
        self.spinner
            .set_message(format!("[{count}] {}", path.display()));
    }
}
