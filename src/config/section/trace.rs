//! `[trace]` section configuration.
//!
//! Settings for the SVG path, which shells out to an outline tracer.
//!
//! # Example
//!
//! ```toml
//! [trace]
//! command = ["potrace"]        # Program (and leading args) to run
//! args = ["--turdsize", "4"]   # Extra args placed before `-s <in> -o <out>`
//! mask = "auto"                # auto | alpha
//! threshold = 128              # Grayscale cut for images without alpha
//! timeout_secs = 30            # Kill the tracer after this long
//! temp_dir = "~/tmp/pixtrace"  # Scratch root (default: OS temp dir)
//! ```
//!
//! A wrapper script used as `command` (e.g. `["sh", "tracer.sh"]`) must
//! `exec` the tracer: on timeout only the direct child is killed.
//!
//! # Mask source
//!
//! - `auto`: alpha channel when present, otherwise grayscale threshold
//! - `alpha`: alpha channel only; images without one are rejected

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::image::mask::DEFAULT_THRESHOLD;

/// Where the tracing mask comes from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MaskSource {
    #[default]
    Auto,
    Alpha,
}

/// Outline tracer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub mask: MaskSource,
    pub threshold: u8,
    pub timeout_secs: u64,
    pub temp_dir: Option<PathBuf>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            command: vec!["potrace".to_string()],
            args: Vec::new(),
            mask: MaskSource::Auto,
            threshold: DEFAULT_THRESHOLD,
            timeout_secs: 30,
            temp_dir: None,
        }
    }
}

impl TraceConfig {
    /// Bound on a single tracer run.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Program name, if a command is configured.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Validate tracer settings.
    ///
    /// A missing tracer is only a warning: raster conversions still work.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        match self.program() {
            None | Some("") => {
                diag.error_with_hint(
                    "trace.command",
                    "command is empty",
                    "set trace.command = [\"potrace\"]",
                );
            }
            Some(program) => {
                if which::which(program).is_err() {
                    diag.warn(
                        "trace.command",
                        format!("`{program}` not found, svg conversions will fail"),
                    );
                }
            }
        }

        if self.timeout_secs == 0 {
            diag.error("trace.timeout_secs", "must be at least 1");
        }

        if self.threshold == 0 {
            diag.error_with_hint(
                "trace.threshold",
                "0 turns every pixel white",
                "use a value in 1-255, e.g. 128",
            );
        }

        if let Some(dir) = &self.temp_dir
            && !dir.is_dir()
        {
            diag.error(
                "trace.temp_dir",
                format!("`{}` is not a directory", dir.display()),
            );
        }
    }
}
