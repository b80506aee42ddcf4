//! Command-line interface module.

mod args;
pub mod init;
pub mod inspect;

pub use args::{Cli, Commands, RequestArgs};
