//! Command-line interface module.

mod args;
pub mod publish;

pub use args::{Cli, PublishArgs, parse_from};
