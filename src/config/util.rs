//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from `start`
///
/// Walks up parent directories until finding `config_name`.
/// Absolute names are returned as-is when they exist.
///
/// # Example
/// ```text
/// /home/user/project/docs/      ← start
/// /home/user/project/ghp-publish.toml  ← found!
/// ```
pub fn find_config_file(config_name: &Path, start: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    start
        .ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.is_file())
}

/// Check that `branch` is usable as `refs/heads/<branch>`.
///
/// Returns the reason when it is not.
pub fn check_branch_name(branch: &str) -> Option<&'static str> {
    const FORBIDDEN: &[char] = &['~', '^', ':', '?', '*', '[', '\\', ' ', '\t'];

    if branch.is_empty() {
        Some("must not be empty")
    } else if branch.starts_with('-') || branch.starts_with('/') || branch.ends_with('/') {
        Some("must not start with `-` or `/`, or end with `/`")
    } else if branch.contains("..") || branch.contains("//") || branch.contains("@{") {
        Some("must not contain `..`, `//` or `@{`")
    } else if branch.ends_with(".lock") || branch.ends_with('.') {
        Some("must not end with `.lock` or `.`")
    } else if branch.contains(FORBIDDEN) || branch.chars().any(char::is_control) {
        Some("contains characters git does not allow in branch names")
    } else {
        None
    }
}
