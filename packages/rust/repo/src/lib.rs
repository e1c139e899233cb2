//! Version-controlled content repositories and the authenticated
//! metadata store.
//!
//! These are the pipeline's external collaborators: [`ContentRepository`]
//! wraps the git operations the stages need (clone/pull/commit/push and
//! the two recovery resets), and [`metadata`] exposes the signed target
//! entries and metadata files the incremental gate and jurisdiction
//! loader read.

pub mod metadata;

use std::path::PathBuf;

use auth_git2::GitAuthenticator;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    FetchOptions, IndexAddOption, PushOptions, RemoteCallbacks, Repository, ResetType, Signature,
    Status, StatusOptions,
};
use tracing::{debug, info, instrument};

use lawsite_shared::{LawsiteError, Result};

pub use metadata::{FsMetadataStore, MetadataStore};

fn git_err(e: git2::Error) -> LawsiteError {
    LawsiteError::Git(e.message().to_string())
}

/// One git repository under the library root, addressed as
/// `<library_dir>/<name>`.
#[derive(Debug)]
pub struct ContentRepository {
    library_dir: PathBuf,
    name: String,
    urls: Vec<String>,
}

impl ContentRepository {
    /// Address a repository; nothing is touched on disk until an
    /// operation runs.
    pub fn new(
        library_dir: impl Into<PathBuf>,
        name: impl Into<String>,
        urls: Vec<String>,
    ) -> Self {
        Self {
            library_dir: library_dir.into(),
            name: name.into(),
            urls,
        }
    }

    /// Repository name (`<org>/<repo>`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-disk working-tree path.
    pub fn path(&self) -> PathBuf {
        self.library_dir.join(&self.name)
    }

    fn open(&self) -> Result<Repository> {
        Repository::open(self.path()).map_err(git_err)
    }

    /// Clone the repository from its first configured URL. A repository
    /// already present is left alone so update cycles can re-run this.
    #[instrument(skip(self), fields(name = %self.name))]
    pub fn clone(&self) -> Result<()> {
        let path = self.path();
        if path.join(".git").exists() {
            info!(path = %path.display(), "repository already cloned");
            return Ok(());
        }

        let url = self
            .urls
            .first()
            .ok_or_else(|| LawsiteError::Git(format!("no clone URL configured for {}", self.name)))?;

        let authenticator = GitAuthenticator::default();
        let config = git2::Config::open_default().map_err(git_err)?;
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(authenticator.credentials(&config));

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);

        RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(url, &path)
            .map_err(git_err)?;

        info!(%url, path = %path.display(), "cloned");
        Ok(())
    }

    /// Fetch and fast-forward the current branch.
    #[instrument(skip(self), fields(name = %self.name))]
    pub fn pull(&self) -> Result<()> {
        let repo = self.open()?;
        let branch = current_branch(&repo)?;

        let authenticator = GitAuthenticator::default();
        let config = repo.config().map_err(git_err)?;
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(authenticator.credentials(&config));

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);

        let mut remote = repo.find_remote("origin").map_err(git_err)?;
        remote
            .fetch(&[branch.as_str()], Some(&mut fetch_options), None)
            .map_err(git_err)?;

        let fetch_head = repo.find_reference("FETCH_HEAD").map_err(git_err)?;
        let fetch_commit = repo
            .reference_to_annotated_commit(&fetch_head)
            .map_err(git_err)?;

        let (analysis, _) = repo.merge_analysis(&[&fetch_commit]).map_err(git_err)?;
        if analysis.is_up_to_date() {
            debug!("already up to date");
            return Ok(());
        }
        if !analysis.is_fast_forward() {
            return Err(LawsiteError::Git(format!(
                "{}: cannot fast-forward {branch}",
                self.name
            )));
        }

        let refname = format!("refs/heads/{branch}");
        let mut reference = repo.find_reference(&refname).map_err(git_err)?;
        reference
            .set_target(fetch_commit.id(), "fast-forward")
            .map_err(git_err)?;
        repo.set_head(&refname).map_err(git_err)?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))
            .map_err(git_err)?;

        info!(%branch, "fast-forwarded");
        Ok(())
    }

    /// Stage everything and commit to HEAD.
    ///
    /// Returns [`LawsiteError::NothingToCommit`] when the working tree is
    /// clean; callers treat that as success, not failure.
    #[instrument(skip(self, message), fields(name = %self.name))]
    pub fn commit(&self, message: &str) -> Result<String> {
        let repo = self.open()?;

        let mut status_options = StatusOptions::new();
        status_options.include_untracked(true);
        let statuses = repo.statuses(Some(&mut status_options)).map_err(git_err)?;
        if statuses.is_empty() {
            return Err(LawsiteError::NothingToCommit);
        }

        let mut index = repo.index().map_err(git_err)?;
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .map_err(git_err)?;
        index.update_all(["*"].iter(), None).map_err(git_err)?;
        index.write().map_err(git_err)?;

        let tree_oid = index.write_tree().map_err(git_err)?;
        let tree = repo.find_tree(tree_oid).map_err(git_err)?;

        let signature = repo
            .signature()
            .or_else(|_| Signature::now("lawsite", "lawsite@localhost"))
            .map_err(git_err)?;

        let mut parents = Vec::new();
        if let Ok(head) = repo.head() {
            if let Some(target) = head.target() {
                parents.push(repo.find_commit(target).map_err(git_err)?);
            }
        }
        let parents: Vec<_> = parents.iter().collect();

        let oid = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(git_err)?;

        info!(commit = %oid, "committed");
        Ok(oid.to_string())
    }

    /// Push the current branch to origin.
    #[instrument(skip(self), fields(name = %self.name))]
    pub fn push(&self) -> Result<()> {
        let repo = self.open()?;
        let branch = current_branch(&repo)?;

        let authenticator = GitAuthenticator::default();
        let config = repo.config().map_err(git_err)?;
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(authenticator.credentials(&config));

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let mut remote = repo.find_remote("origin").map_err(git_err)?;
        remote
            .push(
                &[format!("refs/heads/{branch}:refs/heads/{branch}")],
                Some(&mut push_options),
            )
            .map_err(git_err)?;

        info!(%branch, "pushed");
        Ok(())
    }

    /// Discard all local modifications: hard-reset to HEAD and remove
    /// untracked files. Recovery path after a failed commit.
    #[instrument(skip(self), fields(name = %self.name))]
    pub fn clean_and_reset(&self) -> Result<()> {
        let repo = self.open()?;

        let mut status_options = StatusOptions::new();
        status_options
            .include_untracked(true)
            .recurse_untracked_dirs(true);
        let statuses = repo.statuses(Some(&mut status_options)).map_err(git_err)?;
        for entry in statuses.iter() {
            if entry.status().contains(Status::WT_NEW) {
                if let Some(rel) = entry.path() {
                    let _ = std::fs::remove_file(self.path().join(rel));
                }
            }
        }

        let head = repo.head().map_err(git_err)?.peel_to_commit().map_err(git_err)?;
        repo.reset(head.as_object(), ResetType::Hard, None)
            .map_err(git_err)?;

        info!("cleaned and reset to HEAD");
        Ok(())
    }

    /// Hard-reset the branch `n` commits back. Recovery path after a
    /// failed push (rolls back the local commit that could not land).
    #[instrument(skip(self), fields(name = %self.name))]
    pub fn reset_num_of_commits(&self, n: usize) -> Result<()> {
        let repo = self.open()?;
        let mut commit = repo.head().map_err(git_err)?.peel_to_commit().map_err(git_err)?;
        for _ in 0..n {
            commit = commit.parent(0).map_err(git_err)?;
        }
        repo.reset(commit.as_object(), ResetType::Hard, None)
            .map_err(git_err)?;

        info!(n, target = %commit.id(), "reset");
        Ok(())
    }
}

fn current_branch(repo: &Repository) -> Result<String> {
    let head = repo.head().map_err(git_err)?;
    head.shorthand()
        .map(String::from)
        .ok_or_else(|| LawsiteError::Git("detached HEAD".into()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
