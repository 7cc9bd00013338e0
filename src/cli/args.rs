//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::{ffi::OsString, path::PathBuf};

/// Program name used when parsing an explicit argument list.
pub const BIN_NAME: &str = "ghp-publish";

/// Publish a built static site to a git hosting branch.
///
/// Without arguments, publishes `_build/html` to `gh-pages` with a
/// `.nojekyll` marker and force-pushes it to `origin`.
#[derive(Parser, Debug, Clone)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: search upward for ghp-publish.toml)
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub publish: PublishArgs,
}

/// Publish arguments. Unset values fall back to the config file, then defaults.
///
/// Boolean switches take an optional `=BOOL` (`-f` means `-f=true`), so a
/// following positional directory is never swallowed as a value.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishArgs {
    /// Directory containing the built site [default: _build/html]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub directory: Option<PathBuf>,

    /// Add an empty .nojekyll file so GitHub Pages serves `_`-prefixed paths [default: true]
    #[arg(short = 'n', long = "no-jekyll", action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub nojekyll: Option<bool>,

    /// Push the branch after committing [default: true]
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub push: Option<bool>,

    /// Force the push, overwriting the remote branch [default: true]
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub force: Option<bool>,

    /// Commit without history: the new commit has no parent [default: false]
    #[arg(short = 'o', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub no_history: Option<bool>,

    /// Enter symlinked directories in the site [default: false]
    #[arg(short = 'l', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub follow_links: Option<bool>,

    /// Branch to publish to [default: gh-pages]
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Remote to push to [default: origin]
    #[arg(short, long)]
    pub remote: Option<String>,

    /// Commit message [default: "Update documentation"]
    #[arg(short, long)]
    pub message: Option<String>,

    /// Custom domain written to a CNAME file
    #[arg(short, long)]
    pub cname: Option<String>,

    /// Publish into this sub-path of the branch, keeping the rest
    #[arg(short = 'x', long)]
    pub prefix: Option<String>,
}

/// Parse an explicit argument list, without the program name.
///
/// `parse_from(["-n", "-p", "-f", "docs_out"])` yields what running
/// `ghp-publish -n -p -f docs_out` would.
pub fn parse_from<I, S>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let argv = std::iter::once(OsString::from(BIN_NAME)).chain(args.into_iter().map(Into::into));
    Cli::try_parse_from(argv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_classic_flags() {
        let cli = parse_from(["-n", "-p", "-f", "docs_out"]).unwrap();
        assert_eq!(
            cli.publish,
            PublishArgs {
                directory: Some(PathBuf::from("docs_out")),
                nojekyll: Some(true),
                push: Some(true),
                force: Some(true),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_parse_no_arguments() {
        let cli = parse_from(Vec::<String>::new()).unwrap();
        assert_eq!(cli.publish, PublishArgs::default());
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_explicit_false() {
        let cli = parse_from(["--push=false", "-f=false", "-o", "-l"]).unwrap();
        assert_eq!(cli.publish.push, Some(false));
        assert_eq!(cli.publish.force, Some(false));
        assert_eq!(cli.publish.no_history, Some(true));
        assert_eq!(cli.publish.follow_links, Some(true));
        assert_eq!(cli.publish.directory, None);
    }

    #[test]
    fn test_parse_values() {
        let cli = parse_from([
            "-b", "pages", "-r", "upstream", "-m", "Deploy docs", "-c", "docs.example.com", "-x",
            "v2", "site",
        ])
        .unwrap();
        let args = cli.publish;
        assert_eq!(args.branch.as_deref(), Some("pages"));
        assert_eq!(args.remote.as_deref(), Some("upstream"));
        assert_eq!(args.message.as_deref(), Some("Deploy docs"));
        assert_eq!(args.cname.as_deref(), Some("docs.example.com"));
        assert_eq!(args.prefix.as_deref(), Some("v2"));
        assert_eq!(args.directory, Some(PathBuf::from("site")));
    }

    #[test]
    fn test_parse_rejects_unknown_flag() {
        assert!(parse_from(["--shell"]).is_err());
    }
}
