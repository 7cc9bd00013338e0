//! Committer identity for the publish commit.

use crate::utils::git::config_value;
use gix::Repository;
use std::fmt;

/// Name and email recorded on the publish commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// `Name <email>` with characters that would break the header removed.
    pub fn signature(&self) -> String {
        let clean = |s: &str| {
            s.chars()
                .filter(|c| !matches!(c, '<' | '>' | '\n'))
                .collect::<String>()
                .trim()
                .to_owned()
        };
        format!("{} <{}>", clean(&self.name), clean(&self.email))
    }

    /// Resolve the committer the way git does for a plain `git commit`.
    ///
    /// Order: `GIT_COMMITTER_NAME`/`GIT_COMMITTER_EMAIL`, then `user.name`/`user.email`.
    pub fn resolve(repo: &Repository) -> Option<Self> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self::pick(
            env("GIT_COMMITTER_NAME"),
            env("GIT_COMMITTER_EMAIL"),
            config_value(repo, "user.name"),
            config_value(repo, "user.email"),
        )
    }

    /// Each field falls back independently from environment to config.
    fn pick(
        env_name: Option<String>,
        env_email: Option<String>,
        cfg_name: Option<String>,
        cfg_email: Option<String>,
    ) -> Option<Self> {
        let name = env_name.or(cfg_name)?;
        let email = env_email.or(cfg_email)?;
        Some(Self { name, email })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_owned())
    }

    #[test]
    fn test_signature_strips_brackets() {
        let id = Identity::new("Evil <Name>", "a@b.c\n");
        assert_eq!(id.signature(), "Evil Name <a@b.c>");
    }

    #[test]
    fn test_pick_prefers_env() {
        let id = Identity::pick(s("Env"), s("env@x"), s("Cfg"), s("cfg@x")).unwrap();
        assert_eq!(id, Identity::new("Env", "env@x"));
    }

    #[test]
    fn test_pick_falls_back_per_field() {
        let id = Identity::pick(None, s("env@x"), s("Cfg"), None).unwrap();
        assert_eq!(id, Identity::new("Cfg", "env@x"));
    }

    #[test]
    fn test_pick_missing() {
        assert!(Identity::pick(None, None, s("Cfg"), None).is_none());
        assert!(Identity::pick(None, None, None, None).is_none());
    }
}
