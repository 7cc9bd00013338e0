//! Publish configuration from `ghp-publish.toml` and the command line.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error.rs   # ConfigError, ConfigDiagnostics
//! ├── util.rs    # config file search, branch name checks
//! └── mod.rs     # Config (this file)
//! ```
//!
//! # Example
//!
//! ```toml
//! [publish]
//! directory = "_build/html"   # Site directory, relative to this file
//! branch = "gh-pages"         # Hosting branch
//! remote = "origin"           # Remote to push to
//! message = "Update documentation"
//! cname = "docs.example.com"  # Optional: write CNAME
//! prefix = "v2"               # Optional: publish into a sub-path
//! nojekyll = true             # Add .nojekyll
//! push = true                 # Push after committing
//! force = true                # Force push
//! no_history = false          # Commit without parent
//! follow_links = false        # Enter symlinked directories
//!
//! [publish.committer]         # Optional: override git user.name/user.email
//! name = "Docs Bot"
//! email = "docs@example.com"
//! ```
//!
//! Precedence: command line > config file > defaults.

mod error;
mod util;

pub use error::{ConfigDiagnostics, ConfigError};

use crate::{
    cli::{Cli, PublishArgs},
    log,
    publish::{
        DEFAULT_BRANCH, DEFAULT_DIRECTORY, DEFAULT_MESSAGE, DEFAULT_REMOTE, Identity,
        PublishOptions,
    },
    utils::path::{normalize_path, resolve_against},
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Component, Path, PathBuf},
    str::FromStr,
};
use util::{check_branch_name, find_config_file};

/// Config file searched for when `--config` is not given.
pub const CONFIG_FILE: &str = "ghp-publish.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing ghp-publish.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directory git runs in: the config file's parent, else the cwd (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub publish: PublishSection,
}

/// `[publish]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSection {
    /// Site directory (relative to the config file).
    pub directory: PathBuf,
    pub branch: String,
    pub remote: String,
    pub message: String,
    pub cname: Option<String>,
    pub prefix: Option<String>,
    pub nojekyll: bool,
    pub push: bool,
    pub force: bool,
    pub no_history: bool,
    pub follow_links: bool,
    pub committer: CommitterSection,
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DIRECTORY),
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
            committer: CommitterSection::default(),
        }
    }
}

/// `[publish.committer]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitterSection {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Config {
    /// Load configuration for this invocation.
    ///
    /// Searches upward from the cwd for the config file. A missing default
    /// file is fine; a missing `--config` file is an error.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        Self::load_from(cli, &cwd)
    }

    fn load_from(cli: &Cli, cwd: &Path) -> Result<Self> {
        let name = cli.config.as_deref().unwrap_or(Path::new(CONFIG_FILE));

        let mut config = match find_config_file(name, cwd) {
            Some(path) => {
                let path = normalize_path(&path);
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config.config_path = Some(path);
                config
            }
            None if cli.config.is_some() => bail!(ConfigError::NotFound(name.to_path_buf())),
            None => Self {
                root: cwd.to_path_buf(),
                ..Self::default()
            },
        };

        config.publish.directory = resolve_against(&config.publish.directory, &config.root);
        config.apply_args(&cli.publish, cwd);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "ignoring unknown fields in {}: {}", display_path, fields.join(", "));
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command line values over the file values.
    ///
    /// A directory given on the command line is relative to `cwd`.
    fn apply_args(&mut self, args: &PublishArgs, cwd: &Path) {
        let publish = &mut self.publish;

        if let Some(dir) = &args.directory {
            publish.directory = resolve_against(dir, cwd);
        }
        Self::update_option(&mut publish.nojekyll, args.nojekyll.as_ref());
        Self::update_option(&mut publish.push, args.push.as_ref());
        Self::update_option(&mut publish.force, args.force.as_ref());
        Self::update_option(&mut publish.no_history, args.no_history.as_ref());
        Self::update_option(&mut publish.follow_links, args.follow_links.as_ref());
        Self::update_option(&mut publish.branch, args.branch.as_ref());
        Self::update_option(&mut publish.remote, args.remote.as_ref());
        Self::update_option(&mut publish.message, args.message.as_ref());
        if args.cname.is_some() {
            publish.cname.clone_from(&args.cname);
        }
        if args.prefix.is_some() {
            publish.prefix.clone_from(&args.prefix);
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, collecting all problems at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        let publish = &self.publish;

        if let Some(reason) = check_branch_name(&publish.branch) {
            diag.error_with_hint(
                "publish.branch",
                format!("invalid branch `{}`: {reason}", publish.branch),
                "hosting branches are usually `gh-pages` or `pages`",
            );
        }

        if publish.remote.trim().is_empty() {
            diag.error("publish.remote", "remote must not be empty");
        }

        if publish.message.trim().is_empty() {
            diag.error("publish.message", "commit message must not be empty");
        }

        if let Some(cname) = &publish.cname
            && (cname.is_empty() || cname.contains(char::is_whitespace))
        {
            diag.error_with_hint(
                "publish.cname",
                format!("invalid custom domain `{cname}`"),
                "use a bare domain such as `docs.example.com`",
            );
        }

        if let Some(prefix) = &publish.prefix {
            let path = Path::new(prefix);
            let escapes = path
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes {
                diag.error(
                    "publish.prefix",
                    format!("prefix `{prefix}` must be a relative path inside the branch"),
                );
            }
        }

        let committer = &publish.committer;
        if committer.name.is_some() != committer.email.is_some() {
            diag.error(
                "publish.committer",
                "set both `name` and `email`, or neither",
            );
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    // ========================================================================
    // publish options
    // ========================================================================

    /// Options for [`crate::publish::publish`].
    pub fn publish_options(&self) -> PublishOptions {
        let publish = &self.publish;
        let identity = match (&publish.committer.name, &publish.committer.email) {
            (Some(name), Some(email)) => Some(Identity::new(name, email)),
            _ => None,
        };
        let prefix = publish
            .prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty() && *p != ".")
            .map(str::to_owned);

        PublishOptions {
            root: self.root.clone(),
            directory: publish.directory.clone(),
            branch: publish.branch.clone(),
            remote: publish.remote.clone(),
            message: publish.message.clone(),
            cname: publish.cname.clone(),
            prefix,
            nojekyll: publish.nojekyll,
            push: publish.push,
            force: publish.force,
            no_history: publish.no_history,
            follow_links: publish.follow_links,
            identity,
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    /// Parse configuration from TOML string
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(content)?)
    }
}
