//! `pixtrace convert`: batch conversion of local files.
//!
//! Uses the same packaging rules as `POST /convert`: one input writes
//! `01.<ext>`, several write a zip.

use std::{
    fs,
    ops::ControlFlow,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};

use crate::batch::{self, BatchError, Packaged, Upload};
use crate::config::AppConfig;
use crate::core::{defer_interrupts, is_shutdown};
use crate::image::TargetFormat;
use crate::logger::ProgressLine;
use crate::{debug, log};

/// Convert `inputs` and write the result.
///
/// Returns the path written.
pub fn convert_files(
    inputs: &[PathBuf],
    format: Option<TargetFormat>,
    output: Option<&Path>,
    config: &AppConfig,
) -> Result<PathBuf> {
    let Some(target) = format.or(config.convert.default_format) else {
        bail!("no output format given (pass --format or set convert.default_format)");
    };

    let uploads = read_inputs(inputs)?;
    debug!("convert"; "{} file(s) -> {}", uploads.len(), target);

    let progress = (uploads.len() > 1).then(|| ProgressLine::new(&[("convert", uploads.len())]));
    // Ctrl+C stops between files so the tracer's scratch dir is dropped
    defer_interrupts();
    let packaged = batch::package_with(&uploads, target, config, |_, _| {
        if let Some(progress) = &progress {
            progress.inc("convert");
        }
        if is_shutdown() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    if let Some(progress) = progress {
        progress.finish();
    }

    let packaged = match packaged {
        Ok(packaged) => packaged,
        Err(BatchError::Convert(err)) => {
            bail!("{}: {}", inputs[0].display(), err)
        }
        Err(err) => return Err(err.into()),
    };

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(packaged.filename()));
    fs::write(&path, packaged.data())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    match &packaged {
        Packaged::Single { .. } => log!("convert"; "wrote {}", path.display()),
        Packaged::Archive {
            converted, failed, ..
        } => log!("convert"; "wrote {} ({} converted, {} failed)", path.display(), converted, failed),
    }
    Ok(path)
}

fn read_inputs(inputs: &[PathBuf]) -> Result<Vec<Upload>> {
    inputs
        .iter()
        .map(|path| {
            let data =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(Upload::new(filename, data))
        })
        .collect()
}
