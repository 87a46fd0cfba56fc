//! Request routing.
//!
//! The router works on buffered [`HttpRequest`] values and returns
//! [`HttpResponse`] values, so every route is testable without a socket.
//!
//! | Route           | Method | Response                        |
//! |-----------------|--------|---------------------------------|
//! | `/`             | GET    | Upload form                     |
//! | `/`             | HEAD   | 200, no body                    |
//! | `/convert`      | POST   | Converted file or zip           |
//! | known, other    | *      | 405                             |
//! | anything else   | *      | 404                             |

use std::str::FromStr;

use tiny_http::Method;

use crate::batch::{self, BatchError, Packaged};
use crate::config::AppConfig;
use crate::embed::serve::{INDEX_HTML, IndexVars};
use crate::image::TargetFormat;
use crate::utils::mime::types::{HTML, PLAIN};
use crate::{debug, log};

use super::multipart::{self, FormError};

/// A request with its body already read.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// URL path without query string.
    pub fn path(&self) -> &str {
        self.url.split(['?', '#']).next().unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    fn new(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            headers: Vec::new(),
            body,
        }
    }

    pub fn text(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, PLAIN, message.into().into_bytes())
    }

    fn html(body: String) -> Self {
        Self::new(200, HTML, body.into_bytes())
    }

    fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn attachment(packaged: Packaged) -> Self {
        let disposition = format!("attachment; filename=\"{}\"", packaged.filename());
        let mime = packaged.mime();
        Self::new(200, mime, packaged.into_data()).with_header("Content-Disposition", disposition)
    }

    /// Look up a header set on this response.
    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// 503 for requests arriving during shutdown.
pub fn unavailable() -> HttpResponse {
    HttpResponse::text(503, "503 Service Unavailable")
}

/// 413 for bodies over `serve.max_upload`.
pub fn payload_too_large(limit: usize) -> HttpResponse {
    HttpResponse::text(413, format!("upload exceeds the {limit} byte limit"))
}

/// Route a request.
pub fn handle(request: &HttpRequest, config: &AppConfig) -> HttpResponse {
    let response = match (request.path(), &request.method) {
        ("/", Method::Get) => HttpResponse::html(INDEX_HTML.render(&IndexVars::from_config(config))),
        ("/", Method::Head) => HttpResponse::new(200, HTML, Vec::new()),
        ("/", _) => method_not_allowed("GET, HEAD"),
        ("/convert", Method::Post) => convert(request, config),
        ("/convert", _) => method_not_allowed("POST"),
        _ => HttpResponse::text(404, "404 Not Found"),
    };

    debug!("serve"; "{} {} -> {}", request.method, request.url, response.status);
    response
}

fn method_not_allowed(allow: &'static str) -> HttpResponse {
    HttpResponse::text(405, "405 Method Not Allowed").with_header("Allow", allow)
}

fn convert(request: &HttpRequest, config: &AppConfig) -> HttpResponse {
    let Some(content_type) = request
        .content_type
        .as_deref()
        .filter(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
    else {
        return HttpResponse::text(400, FormError::NotMultipart.to_string());
    };

    let form = match multipart::parse_form(content_type, &request.body, config.serve.max_upload_bytes())
    {
        Ok(form) => form,
        Err(FormError::TooLarge(_)) => return payload_too_large(config.serve.max_upload_bytes()),
        Err(err @ (FormError::NotMultipart | FormError::Malformed(_))) => {
            return HttpResponse::text(400, err.to_string());
        }
        Err(err @ FormError::Runtime(_)) => return HttpResponse::text(500, err.to_string()),
    };

    if form.uploads.first().is_none_or(|first| first.filename.is_empty()) {
        return HttpResponse::text(400, BatchError::NoFiles.to_string());
    }

    let target = match resolve_format(form.format.as_deref(), config) {
        Ok(target) => target,
        Err(message) => return HttpResponse::text(400, message),
    };

    match batch::package(&form.uploads, target, config) {
        Ok(packaged) => {
            if let Packaged::Archive {
                converted, failed, ..
            } = &packaged
            {
                log!("convert"; "{} -> {}: {} converted, {} failed", form.uploads.len(), target, converted, failed);
            } else {
                log!("convert"; "1 -> {}", target);
            }
            HttpResponse::attachment(packaged)
        }
        Err(BatchError::NoFiles) => HttpResponse::text(400, BatchError::NoFiles.to_string()),
        Err(err) => HttpResponse::text(500, err.to_string()),
    }
}

/// Pick the target format from the form, falling back to `convert.default_format`.
fn resolve_format(field: Option<&str>, config: &AppConfig) -> Result<TargetFormat, String> {
    match field.map(str::trim).filter(|tag| !tag.is_empty()) {
        Some(tag) => TargetFormat::from_str(tag).map_err(|err| err.to_string()),
        None => config
            .convert
            .default_format
            .ok_or_else(|| "no output format selected".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::serve::multipart::tests::form_body;
    use crate::config::FailurePolicy;
    use ::image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::{Cursor, Read};

    fn png() -> Vec<u8> {
        let image = RgbaImage::from_pixel(4, 4, Rgba([0, 128, 255, 255]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::from(image)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn request(method: Method, url: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: url.into(),
            content_type: None,
            body: Vec::new(),
        }
    }

    fn post_form(format: Option<&str>, files: &[(&str, &[u8])]) -> HttpRequest {
        let (content_type, body) = form_body(format, files);
        HttpRequest {
            method: Method::Post,
            url: "/convert".into(),
            content_type: Some(content_type),
            body,
        }
    }

    fn body_text(response: &HttpResponse) -> String {
        String::from_utf8(response.body.clone()).unwrap()
    }

    #[test]
    fn test_index() {
        let response = handle(&request(Method::Get, "/"), &AppConfig::default());
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, HTML);
        assert!(body_text(&response).contains("action=\"/convert\""));

        let response = handle(&request(Method::Get, "/?lang=en"), &AppConfig::default());
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_head_index_has_no_body() {
        let response = handle(&request(Method::Head, "/"), &AppConfig::default());
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_unknown_route_and_method() {
        let config = AppConfig::default();
        assert_eq!(handle(&request(Method::Get, "/nope"), &config).status, 404);

        let response = handle(&request(Method::Get, "/convert"), &config);
        assert_eq!(response.status, 405);
        assert_eq!(response.header("allow"), Some("POST"));

        assert_eq!(handle(&request(Method::Delete, "/"), &config).status, 405);
    }

    #[test]
    fn test_convert_requires_multipart() {
        let mut req = request(Method::Post, "/convert");
        req.content_type = Some("application/json".into());
        req.body = b"{}".to_vec();

        let response = handle(&req, &AppConfig::default());
        assert_eq!(response.status, 400);

        let response = handle(&request(Method::Post, "/convert"), &AppConfig::default());
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_convert_without_files() {
        let response = handle(&post_form(Some("png"), &[]), &AppConfig::default());
        assert_eq!(response.status, 400);
        assert_eq!(body_text(&response), "no files were uploaded");

        let response = handle(&post_form(Some("png"), &[("", b"")]), &AppConfig::default());
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_convert_format_is_required_unless_defaulted() {
        let image = png();
        let files: &[(&str, &[u8])] = &[("a.png", &image)];

        let response = handle(&post_form(None, files), &AppConfig::default());
        assert_eq!(response.status, 400);
        assert!(body_text(&response).contains("format"));

        let mut config = AppConfig::default();
        config.convert.default_format = Some(TargetFormat::Bmp);
        let response = handle(&post_form(None, files), &config);
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "image/bmp");
    }

    #[test]
    fn test_convert_unknown_format() {
        let image = png();
        let response = handle(
            &post_form(Some("tiff"), &[("a.png", &image)]),
            &AppConfig::default(),
        );
        assert_eq!(response.status, 400);
        assert!(body_text(&response).contains("tiff"));
    }

    #[test]
    fn test_convert_single_file() {
        let image = png();
        let response = handle(
            &post_form(Some("jpg"), &[("photo.png", &image)]),
            &AppConfig::default(),
        );

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "image/jpeg");
        assert_eq!(
            response.header("Content-Disposition"),
            Some("attachment; filename=\"01.jpg\"")
        );
        let decoded = ::image::load_from_memory(&response.body).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn test_convert_single_invalid_file_is_500() {
        let response = handle(
            &post_form(Some("png"), &[("notes.txt", b"plain text")]),
            &AppConfig::default(),
        );
        assert_eq!(response.status, 500);
        assert_eq!(response.content_type, PLAIN);
        assert!(body_text(&response).starts_with("input is not a valid image"));
    }

    #[test]
    fn test_convert_batch_with_failure() {
        let image = png();
        let files: &[(&str, &[u8])] = &[("a.png", &image), ("b.txt", b"nope"), ("c.png", &image)];

        let response = handle(&post_form(Some("webp"), files), &AppConfig::default());
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/zip");
        assert_eq!(
            response.header("Content-Disposition"),
            Some("attachment; filename=\"converted_images.zip\"")
        );

        let mut zip = zip::ZipArchive::new(Cursor::new(response.body)).unwrap();
        let names: Vec<_> = zip.file_names().map(str::to_owned).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"01.webp".to_string()));
        assert!(names.contains(&"error_02.txt".to_string()));
        assert!(names.contains(&"03.webp".to_string()));

        let mut message = String::new();
        zip.by_name("error_02.txt")
            .unwrap()
            .read_to_string(&mut message)
            .unwrap();
        assert!(message.starts_with("input is not a valid image"));
    }

    #[test]
    fn test_convert_batch_omit_policy() {
        let image = png();
        let files: &[(&str, &[u8])] = &[("a.png", &image), ("b.txt", b"nope")];
        let mut config = AppConfig::default();
        config.convert.failures = FailurePolicy::Omit;

        let response = handle(&post_form(Some("png"), files), &config);
        let zip = zip::ZipArchive::new(Cursor::new(response.body)).unwrap();
        let names: Vec<_> = zip.file_names().collect();
        assert_eq!(names, ["01.png"]);
    }

    #[test]
    fn test_convert_svg_names_archive() {
        let image = png();
        let files: &[(&str, &[u8])] = &[("a.png", &image), ("b.png", &image)];
        let mut config = AppConfig::default();
        config.trace.command = vec!["pixtrace-no-such-tracer".into()];

        let response = handle(&post_form(Some("svg"), files), &config);
        assert_eq!(response.status, 200);
        assert_eq!(
            response.header("Content-Disposition"),
            Some("attachment; filename=\"converted_svgs.zip\"")
        );
    }

    #[test]
    fn test_oversized_form_is_413() {
        let mut config = AppConfig::default();
        config.serve.max_upload = "1KB".into();
        let big = vec![0u8; 4096];

        let response = handle(&post_form(Some("png"), &[("a.png", &big)]), &config);
        assert_eq!(response.status, 413);
    }

    #[test]
    fn test_unavailable() {
        let response = unavailable();
        assert_eq!(response.status, 503);
    }
}
