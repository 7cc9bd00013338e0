//! The publish command: config → options → publish → confirmation.

use crate::{
    config::Config,
    log, logger,
    publish::{PublishError, publish},
};
use anyhow::Result;

/// Publish with the resolved configuration and print the outcome.
///
/// A missing `git` ends the process here with the install instruction;
/// every other failure is returned to `main` with its cause chain.
pub fn run(config: &Config) -> Result<()> {
    let options = config.publish_options();

    match publish(&options) {
        Ok(report) => {
            logger::success(&report.to_string());
            Ok(())
        }
        Err(err) => match exit_code(&err) {
            Some(code) => {
                log!("error"; "{err}");
                std::process::exit(code);
            }
            None => Err(err.into()),
        },
    }
}

/// Exit status for errors that end the process without a cause chain.
fn exit_code(err: &PublishError) -> Option<i32> {
    err.is_dependency_missing().then_some(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::{PublishOptions, publish_using};
    use std::ffi::OsStr;

    #[test]
    fn test_missing_git_exits_with_status_one() {
        let mut options = PublishOptions::new("/nonexistent/ghp-publish/html");
        options.push = false;

        let err = publish_using(Some(OsStr::new("")), &options).unwrap_err();
        assert_eq!(exit_code(&err), Some(1));
    }

    #[test]
    fn test_other_errors_return_to_main() {
        let err = PublishError::NotADirectory("/nonexistent/ghp-publish/html".into());
        assert_eq!(exit_code(&err), None);

        let err = PublishError::from(anyhow::anyhow!("remote rejected"));
        assert_eq!(exit_code(&err), None);
    }
}
