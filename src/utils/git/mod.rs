//! Git operations for publishing a site directory.
//!
//! Reads (repository discovery, branch tips, config values) go through `gix`.
//! Writes go through the `git` executable: `fast-import` builds the commit,
//! `push` talks to the remote.

mod remote;
mod repo;

pub use remote::Git;
pub use repo::{branch_ref, branch_tip, config_value, open_repo};
