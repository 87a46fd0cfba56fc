//! Batch packaging: one upload becomes one file, several become a zip.
//!
//! Files convert strictly in submission order and are numbered from 1.
//! A failed file never aborts the batch: depending on
//! [`FailurePolicy`] it leaves an `error_NN.txt` member or nothing.

use std::{
    io::{Cursor, Write},
    ops::ControlFlow,
};

use thiserror::Error;
use zip::{CompressionMethod, ZipWriter, result::ZipError, write::SimpleFileOptions};

use crate::config::{AppConfig, FailurePolicy};
use crate::image::{self, ConvertError, TargetFormat};
use crate::log;
use crate::utils::mime;

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-side filename, only checked for presence.
    pub filename: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }
}

/// Result of packaging a batch, ready to be sent as an attachment.
#[derive(Debug)]
pub enum Packaged {
    Single {
        filename: String,
        mime: &'static str,
        data: Vec<u8>,
    },
    Archive {
        filename: &'static str,
        data: Vec<u8>,
        converted: usize,
        failed: usize,
    },
}

impl Packaged {
    pub fn filename(&self) -> &str {
        match self {
            Self::Single { filename, .. } => filename,
            Self::Archive { filename, .. } => filename,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Single { mime, .. } => *mime,
            Self::Archive { .. } => mime::types::ZIP,
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            Self::Single { data, .. } | Self::Archive { data, .. } => data,
        }
    }

    pub fn into_data(self) -> Vec<u8> {
        match self {
            Self::Single { data, .. } | Self::Archive { data, .. } => data,
        }
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no files were uploaded")]
    NoFiles,

    /// Single-file conversion failure.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("failed to build archive: {0}")]
    Archive(#[from] ZipError),

    #[error("failed to build archive: {0}")]
    Io(#[from] std::io::Error),

    /// The observer stopped the batch early.
    #[error("interrupted")]
    Interrupted,
}

/// Name of the `index`-th (1-based) converted member.
pub fn member_name(index: usize, target: TargetFormat) -> String {
    format!("{:02}.{}", index, target.extension())
}

/// Name of the `index`-th (1-based) failure marker.
pub fn error_member_name(index: usize) -> String {
    format!("error_{:02}.txt", index)
}

/// Convert and package `uploads`.
pub fn package(
    uploads: &[Upload],
    target: TargetFormat,
    config: &AppConfig,
) -> Result<Packaged, BatchError> {
    package_with(uploads, target, config, |_, _| ControlFlow::Continue(()))
}

/// Like [`package`], calling `observe` after each file with its 1-based index.
///
/// `ControlFlow::Break` stops the batch with [`BatchError::Interrupted`];
/// no partial result is returned.
pub fn package_with<F>(
    uploads: &[Upload],
    target: TargetFormat,
    config: &AppConfig,
    mut observe: F,
) -> Result<Packaged, BatchError>
where
    F: FnMut(usize, &Result<Vec<u8>, ConvertError>) -> ControlFlow<()>,
{
    match uploads {
        [] => Err(BatchError::NoFiles),
        [first, ..] if first.filename.is_empty() => Err(BatchError::NoFiles),
        [single] => {
            let result = image::convert_bytes(&single.data, target, config);
            if observe(1, &result).is_break() {
                return Err(BatchError::Interrupted);
            }
            let data = result.inspect_err(|err| report_failure(1, single, err))?;
            Ok(Packaged::Single {
                filename: member_name(1, target),
                mime: target.mime(),
                data,
            })
        }
        many => archive(many, target, config, &mut observe),
    }
}

fn archive<F>(
    uploads: &[Upload],
    target: TargetFormat,
    config: &AppConfig,
    observe: &mut F,
) -> Result<Packaged, BatchError>
where
    F: FnMut(usize, &Result<Vec<u8>, ConvertError>) -> ControlFlow<()>,
{
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let (mut converted, mut failed) = (0, 0);

    for (i, upload) in uploads.iter().enumerate() {
        let index = i + 1;
        let result = image::convert_bytes(&upload.data, target, config);
        if observe(index, &result).is_break() {
            return Err(BatchError::Interrupted);
        }

        match result {
            Ok(data) => {
                writer.start_file(member_name(index, target), options)?;
                writer.write_all(&data)?;
                converted += 1;
            }
            Err(err) => {
                report_failure(index, upload, &err);
                failed += 1;
                if config.convert.failures == FailurePolicy::Report {
                    writer.start_file(error_member_name(index), options)?;
                    writer.write_all(err.to_string().as_bytes())?;
                }
            }
        }
    }

    let data = writer.finish()?.into_inner();
    Ok(Packaged::Archive {
        filename: target.archive_name(),
        data,
        converted,
        failed,
    })
}

fn report_failure(index: usize, upload: &Upload, err: &ConvertError) {
    if err.is_tool_failure() {
        log!("error"; "#{} {}: {}", index, upload.filename, err);
    } else {
        log!("convert"; "#{} {}: {}", index, upload.filename, err);
    }
}
