//! Publishing a built site directory to a hosting branch.
//!
//! # Flow
//!
//! ```text
//! locate git ──► check directory ──► open repo ──► committer ──► branch tip
//!                                                                   │
//!      push ◄── git fast-import ◄── encode stream ◄── scan files ◄──┘
//! ```
//!
//! The commit replaces the whole branch tree (or the `prefix` subtree) with
//! the directory contents. Unless `no_history` is set the previous tip
//! becomes the parent, so the branch only ever fast-forwards.

mod error;
mod identity;
mod scan;
mod stream;

pub use error::PublishError;
pub use identity::Identity;
pub use scan::{SourceFile, scan_dir};
pub use stream::CommitPlan;

use crate::{
    debug, log,
    utils::git::{Git, branch_ref, branch_tip, open_repo},
};
use anyhow::anyhow;
use gix::{ObjectId, date::Time};
use std::{
    ffi::OsStr,
    fmt, io,
    path::{Path, PathBuf},
};

/// Directory published when none is given.
pub const DEFAULT_DIRECTORY: &str = "_build/html";
pub const DEFAULT_BRANCH: &str = "gh-pages";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_MESSAGE: &str = "Update documentation";

const GIT_INSTALL_HINT: &str = "https://git-scm.com/downloads (or your package manager, e.g. `apt install git`)";

// ============================================================================
// Options
// ============================================================================

/// What to publish and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    /// Working directory used to find the repository and run git.
    pub root: PathBuf,
    /// Site directory; relative paths resolve against `root`.
    pub directory: PathBuf,
    pub branch: String,
    pub remote: String,
    pub message: String,
    /// Custom domain written to `CNAME`.
    pub cname: Option<String>,
    /// Sub-path inside the branch to publish into.
    pub prefix: Option<String>,
    /// Add an empty `.nojekyll` (`-n`).
    pub nojekyll: bool,
    /// Push after committing (`-p`).
    pub push: bool,
    /// Force the push (`-f`).
    pub force: bool,
    /// Commit without a parent, discarding branch history (`-o`).
    pub no_history: bool,
    /// Enter symlinked directories while scanning (`-l`).
    pub follow_links: bool,
    /// Explicit committer; resolved from env/config when `None`.
    pub identity: Option<Identity>,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTORY)
    }
}

impl PublishOptions {
    /// Options equivalent to `-n -p -f <directory>`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            root: PathBuf::from("."),
            directory: directory.into(),
            branch: DEFAULT_BRANCH.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            cname: None,
            prefix: None,
            nojekyll: true,
            push: true,
            force: true,
            no_history: false,
            follow_links: false,
            identity: None,
        }
    }

    /// Absolute or root-relative site directory.
    pub fn source_dir(&self) -> PathBuf {
        if self.directory.is_absolute() {
            self.directory.clone()
        } else {
            self.root.join(&self.directory)
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub branch: String,
    pub commit: ObjectId,
    pub files: usize,
    /// Remote pushed to, if any.
    pub pushed: Option<String>,
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.commit.to_hex_with_len(7);
        let s = if self.files == 1 { "" } else { "s" };
        write!(f, "published {} file{s} to {} ({short})", self.files, self.branch)?;
        if let Some(remote) = &self.pushed {
            write!(f, ", pushed to {remote}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Publish
// ============================================================================

/// Publish `options.directory` to `options.branch`.
///
/// Fails with [`PublishError::DependencyMissing`] before touching anything
/// if `git` is not installed.
pub fn publish(options: &PublishOptions) -> Result<PublishReport, PublishError> {
    publish_using(None, options)
}

/// Publish with `git` looked up in `search_path` (`PATH` when `None`).
pub(crate) fn publish_using(
    search_path: Option<&OsStr>,
    options: &PublishOptions,
) -> Result<PublishReport, PublishError> {
    let git = locate_git(search_path)?;
    publish_with(&git, options)
}

/// Resolve `git`, from `PATH` or from an explicit search path.
fn locate_git(search_path: Option<&OsStr>) -> Result<Git, PublishError> {
    let git = match search_path {
        Some(paths) => Git::locate_in(paths),
        None => Git::locate(),
    };
    git.ok_or(PublishError::DependencyMissing {
        tool: "git",
        hint: GIT_INSTALL_HINT,
    })
}

/// Publish using an already resolved `git`.
pub fn publish_with(git: &Git, options: &PublishOptions) -> Result<PublishReport, PublishError> {
    debug!("publish"; "using {}", git.program().display());

    let directory = options.source_dir();
    if !directory.is_dir() {
        return Err(PublishError::NotADirectory(directory));
    }

    let repo = open_repo(&options.root)?;
    let identity = match &options.identity {
        Some(identity) => identity.clone(),
        None => Identity::resolve(&repo).ok_or(PublishError::MissingIdentity)?,
    };

    let parent = if options.no_history {
        None
    } else {
        branch_tip(&repo, &options.branch)?
    };
    match &parent {
        Some(id) => debug!("publish"; "{} is at {}", options.branch, id),
        None => debug!("publish"; "{} starts without history", options.branch),
    }

    let files = scan_dir(&directory, options.prefix.as_deref(), options.follow_links)?;
    log!("publish"; "{} -> {}", display_relative(&directory, &options.root), options.branch);
    debug!("git"; "importing {} files", files.len());

    let plan = CommitPlan {
        branch: &options.branch,
        committer: &identity,
        time: Time::now_local_or_utc(),
        message: &options.message,
        parent,
        prefix: options.prefix.as_deref(),
        files: &files,
        nojekyll: options.nojekyll,
        cname: options.cname.as_deref(),
    };

    // Write errors surface through fast-import; encode errors are kept typed
    let mut encode_error = None;
    let imported = git.fast_import(&options.root, options.no_history, |out| {
        stream::encode(&plan, out).map_err(|err| match err {
            PublishError::Stream(e) => e,
            err => {
                let e = io::Error::other(err.to_string());
                encode_error = Some(err);
                e
            }
        })
    });
    if let Some(err) = encode_error {
        return Err(err);
    }
    imported?;

    let commit = branch_tip(&repo, &options.branch)?
        .ok_or_else(|| anyhow!("{} missing after fast-import", branch_ref(&options.branch)))?;
    log!("git"; "commit {commit}");

    let pushed = if options.push {
        git.push(&options.root, &options.remote, &options.branch, options.force)?;
        Some(options.remote.clone())
    } else {
        None
    };

    Ok(PublishReport {
        branch: options.branch.clone(),
        commit,
        files: files.len(),
        pushed,
    })
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
