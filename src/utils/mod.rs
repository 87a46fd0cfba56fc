//! Shared helpers.
//!
//! - [`exec`]: external command runner with timeouts
//! - [`mime`]: MIME type constants and lookup
//! - [`path`]: filesystem path normalization

pub mod exec;
pub mod mime;
pub mod path;
