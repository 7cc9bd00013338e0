use anyhow::{Context, Result};
use gix::{ObjectId, Repository};
use std::path::Path;

/// Open the git repository containing `root`, searching upward.
pub fn open_repo(root: &Path) -> Result<Repository> {
    gix::discover(root)
        .with_context(|| format!("No git repository found at or above {}", root.display()))
}

/// Full reference name for a branch.
pub fn branch_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}

/// Current commit of `branch`, or `None` if the branch does not exist yet.
pub fn branch_tip(repo: &Repository, branch: &str) -> Result<Option<ObjectId>> {
    let name = branch_ref(branch);
    let Some(mut reference) = repo
        .try_find_reference(name.as_str())
        .with_context(|| format!("Failed to look up {name}"))?
    else {
        return Ok(None);
    };

    let id = reference
        .peel_to_id_in_place()
        .with_context(|| format!("Failed to resolve {name} to a commit"))?;
    Ok(Some(id.detach()))
}

/// Read a string value from the repository's effective configuration.
pub fn config_value(repo: &Repository, key: &str) -> Option<String> {
    repo.config_snapshot()
        .string(key)
        .map(|value| value.to_string())
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_branch_ref() {
        assert_eq!(branch_ref("gh-pages"), "refs/heads/gh-pages");
        assert_eq!(branch_ref("docs/site"), "refs/heads/docs/site");
    }

    #[test]
    fn test_branch_tip_missing_branch() {
        let dir = TempDir::new().unwrap();
        gix::init(dir.path()).unwrap();
        let repo = open_repo(dir.path()).unwrap();
        assert!(branch_tip(&repo, "gh-pages").unwrap().is_none());
    }

    #[test]
    fn test_open_repo_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        gix::init(dir.path()).unwrap();
        let nested = dir.path().join("docs/_build/html");
        std::fs::create_dir_all(&nested).unwrap();

        let repo = open_repo(&nested).unwrap();
        assert!(branch_tip(&repo, "gh-pages").unwrap().is_none());
    }
}
