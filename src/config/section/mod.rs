//! Configuration section definitions.
//!
//! Each module corresponds to a section in `pixtrace.toml`:
//!
//! | Module    | TOML Section | Purpose                                  |
//! |-----------|--------------|------------------------------------------|
//! | `serve`   | `[serve]`    | HTTP server (interface, port, workers)   |
//! | `convert` | `[convert]`  | Default format, failure policy, quality  |
//! | `trace`   | `[trace]`    | External tracer command, mask, timeout   |

mod convert;
mod serve;
mod trace;

pub use convert::{ConvertConfig, FailurePolicy};
pub use serve::ServeConfig;
pub use trace::{MaskSource, TraceConfig};
