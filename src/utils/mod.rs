//! Utility modules shared by the CLI and the publisher.

pub mod exec;
pub mod git;
pub mod path;
