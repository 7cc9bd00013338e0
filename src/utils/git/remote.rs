use crate::{exec, log, utils::exec::{Cmd, FilterRule, SILENT_FILTER}};
use anyhow::{Context, Result};
use std::{
    ffi::OsStr,
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Progress chatter printed by `git push`.
static PUSH_FILTER: FilterRule = FilterRule::new(&[
    "Enumerating objects",
    "Counting objects",
    "Delta compression",
    "Compressing objects",
    "Writing objects",
    "Total ",
    "remote: Resolving deltas",
]);

/// A resolved `git` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Git {
    program: PathBuf,
}

impl Git {
    /// Locate `git` on `PATH`.
    pub fn locate() -> Option<Self> {
        which::which("git").ok().map(|program| Self { program })
    }

    /// Locate `git` in an explicit search path (same syntax as `PATH`).
    pub fn locate_in(search_path: impl AsRef<OsStr>) -> Option<Self> {
        let cwd = std::env::current_dir().ok()?;
        which::which_in("git", Some(search_path), cwd)
            .ok()
            .map(|program| Self { program })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run `git fast-import`, with `stream` writing its input.
    ///
    /// `force` allows the branch to move to a commit that does not descend
    /// from its current tip.
    pub fn fast_import<'a, F>(&self, root: &Path, force: bool, stream: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()> + Send + 'a,
    {
        Cmd::new(&self.program)
            .args(["fast-import", "--date-format=raw", "--quiet"])
            .arg(if force { "--force" } else { "" })
            .cwd(root)
            .stdin_with(stream)
            .filter(&SILENT_FILTER)
            .run()
            .context("git fast-import rejected the generated commit")?;
        Ok(())
    }

    /// Push `branch` to `remote`.
    pub fn push(&self, root: &Path, remote: &str, branch: &str, force: bool) -> Result<()> {
        log!("push"; "{branch} -> {remote}{}", if force { " (force)" } else { "" });
        exec!(
            pty=true;
            filter=&PUSH_FILTER;
            root;
            &self.program;
            "push", remote, branch, if force { "--force" } else { "" }
        )
        .with_context(|| format!("Failed to push {branch} to {remote}"))?;
        Ok(())
    }
}
