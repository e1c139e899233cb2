//! Deploy and clone stages: thin drivers over the content-repository
//! collaborator, with the recovery semantics the publishing flow needs.
//!
//! A failed commit cleans and resets the working tree; a failed push
//! rolls back the just-created local commit. "Nothing to commit" is a
//! successful outcome, not a failure.

use chrono::Local;
use tracing::{info, instrument, warn};

use lawsite_repo::ContentRepository;
use lawsite_shared::{LawsiteError, Result};

/// The git operations the deploy stage drives. `ContentRepository` is
/// the production implementation; tests substitute a scripted double.
pub trait SiteRepository {
    fn pull(&self) -> Result<()>;
    fn commit(&self, message: &str) -> Result<String>;
    fn push(&self) -> Result<()>;
    fn clean_and_reset(&self) -> Result<()>;
    fn reset_num_of_commits(&self, n: usize) -> Result<()>;
}

impl SiteRepository for ContentRepository {
    fn pull(&self) -> Result<()> {
        ContentRepository::pull(self)
    }
    fn commit(&self, message: &str) -> Result<String> {
        ContentRepository::commit(self, message)
    }
    fn push(&self) -> Result<()> {
        ContentRepository::push(self)
    }
    fn clean_and_reset(&self) -> Result<()> {
        ContentRepository::clean_and_reset(self)
    }
    fn reset_num_of_commits(&self, n: usize) -> Result<()> {
        ContentRepository::reset_num_of_commits(self, n)
    }
}

/// What the deploy stage did.
#[derive(Debug, PartialEq, Eq)]
pub enum DeployOutcome {
    /// A commit was created and pushed.
    Pushed,
    /// The working tree was already clean.
    NothingToCommit,
}

/// Timestamped commit message for a site update.
pub fn commit_message(subject: &str) -> String {
    format!("[{}]: {subject}", Local::now().format("%Y-%m-%d %H:%M"))
}

/// Run the deploy stage: pull, commit, push.
#[instrument(skip_all)]
pub fn run_deploy(repo: &dyn SiteRepository, subject: &str) -> Result<DeployOutcome> {
    repo.pull()?;

    match repo.commit(&commit_message(subject)) {
        Ok(oid) => info!(commit = %oid, "site changes committed"),
        Err(LawsiteError::NothingToCommit) => {
            info!("nothing to commit");
            return Ok(DeployOutcome::NothingToCommit);
        }
        Err(e) => {
            warn!(error = %e, "commit failed, cleaning working tree");
            if let Err(reset_err) = repo.clean_and_reset() {
                warn!(error = %reset_err, "clean-and-reset after failed commit also failed");
            }
            return Err(e);
        }
    }

    if let Err(e) = repo.push() {
        warn!(error = %e, "push failed, rolling back local commit");
        if let Err(reset_err) = repo.reset_num_of_commits(1) {
            warn!(error = %reset_err, "rollback after failed push also failed");
        }
        return Err(e);
    }

    Ok(DeployOutcome::Pushed)
}

/// Run the clone stage over the configured repositories.
#[instrument(skip_all)]
pub fn run_clone(repos: &[ContentRepository]) -> Result<()> {
    for repo in repos {
        repo.clone()?;
    }
    Ok(())
}
