//! Command-line interface module.

mod args;
pub mod convert;
pub mod serve;

pub use args::{Cli, Commands};
