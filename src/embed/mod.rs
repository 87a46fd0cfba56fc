//! Embedded static resources for pixtrace.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Server pages (index.html)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{INDEX_HTML, IndexVars};
//!
//! let html = INDEX_HTML.render(&IndexVars::from_config(&config));
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};
    use crate::config::AppConfig;
    use crate::image::TargetFormat;

    /// Variables for index.html template.
    pub struct IndexVars {
        pub version: &'static str,
        pub selected: TargetFormat,
        pub max_upload: String,
    }

    impl IndexVars {
        /// Build form variables from config.
        ///
        /// Preselects `convert.default_format`, or svg.
        pub fn from_config(config: &AppConfig) -> Self {
            Self {
                version: env!("CARGO_PKG_VERSION"),
                selected: config.convert.default_format.unwrap_or(TargetFormat::Svg),
                max_upload: config.serve.max_upload.trim().to_string(),
            }
        }

        fn format_options(&self) -> String {
            TargetFormat::ALL
                .iter()
                .map(|format| {
                    let selected = if *format == self.selected {
                        " selected"
                    } else {
                        ""
                    };
                    format!(
                        "        <option value=\"{}\"{}>{}</option>",
                        format.tag(),
                        selected,
                        format.tag().to_uppercase()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    impl TemplateVars for IndexVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__FORMAT_OPTIONS__", &self.format_options())
                .replace("__MAX_UPLOAD__", &self.max_upload)
                .replace("__VERSION__", self.version)
        }
    }

    /// Upload form served at `/`.
    pub const INDEX_HTML: Template<IndexVars> = Template::new(include_str!("serve/index.html"));
}
