//! `[serve]` section configuration.
//!
//! Contains HTTP server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5000                 # HTTP port number
//! workers = 4                 # Requests handled in parallel
//! max_upload = "32MB"         # Largest accepted request body
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Worker threads handling requests.
    pub workers: usize,

    /// Largest accepted request body.
    /// Supports suffixes: B, KB, MB (e.g., "512KB", "32MB").
    pub max_upload: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5000,
            workers: 4,
            max_upload: "32MB".to_string(),
        }
    }
}

impl ServeConfig {
    /// Parse `max_upload` to bytes.
    pub fn max_upload_bytes(&self) -> usize {
        parse_size_string(&self.max_upload)
    }

    /// Validate server settings.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.workers == 0 {
            diag.error_with_hint("serve.workers", "must be at least 1", "set serve.workers = 4");
        }
        if self.max_upload_bytes() == 0 {
            diag.error_with_hint(
                "serve.max_upload",
                format!("`{}` is not a valid size", self.max_upload),
                "use a size like \"32MB\" or \"512KB\"",
            );
        }
    }
}

/// Parse size string (e.g., "10KB") to bytes.
///
/// Unparsable or overflowing sizes yield 0, which validation rejects.
fn parse_size_string(s: &str) -> usize {
    let s = s.trim().to_uppercase();
    let (digits, unit) = if let Some(n) = s.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };

    digits
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(unit))
        .unwrap_or(0)
}
