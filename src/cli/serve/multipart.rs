//! `multipart/form-data` parsing for the conversion form.
//!
//! Fields:
//! - `image`: repeated, one per file, in submission order
//! - `format`: target format tag
//!
//! Other fields are ignored.

use multer::{Constraints, Multipart, SizeLimit};
use thiserror::Error;

use crate::batch::Upload;

const IMAGE_FIELD: &str = "image";
const FORMAT_FIELD: &str = "format";

/// Parsed conversion form.
#[derive(Debug, Default)]
pub struct Form {
    pub uploads: Vec<Upload>,
    pub format: Option<String>,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("expected a multipart/form-data request")]
    NotMultipart,

    #[error("request body exceeds {0} bytes")]
    TooLarge(u64),

    #[error("malformed form data: {0}")]
    Malformed(multer::Error),

    #[error("failed to start form parser: {0}")]
    Runtime(#[from] std::io::Error),
}

impl From<multer::Error> for FormError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit } => Self::TooLarge(limit),
            other => Self::Malformed(other),
        }
    }
}

/// Parse a buffered form body.
///
/// The body is already in memory, so a current-thread runtime drives the
/// parser to completion on the calling worker.
pub fn parse_form(content_type: &str, body: &[u8], limit: usize) -> Result<Form, FormError> {
    let boundary = multer::parse_boundary(content_type).map_err(|_| FormError::NotMultipart)?;
    let constraints =
        Constraints::new().size_limit(SizeLimit::new().whole_stream(limit as u64));
    let multipart = Multipart::with_reader_with_constraints(body, boundary, constraints);

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    runtime.block_on(collect_fields(multipart))
}

async fn collect_fields(mut multipart: Multipart<'_>) -> Result<Form, FormError> {
    let mut form = Form::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let data = field.bytes().await?;
                form.uploads.push(Upload::new(filename, data.to_vec()));
            }
            Some(FORMAT_FIELD) if form.format.is_none() => {
                form.format = Some(field.text().await?);
            }
            _ => {}
        }
    }

    Ok(form)
}
