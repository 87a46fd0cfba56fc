//! tiny_http glue: read requests in, write responses out.

use std::io::Read;

use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

use super::route::{HttpRequest, HttpResponse};

/// Buffer the request body.
///
/// Returns `None` when the body is larger than `limit`; the declared
/// `Content-Length` is checked first so oversized uploads are not read.
pub fn read_request(request: &mut Request, limit: usize) -> Result<Option<HttpRequest>> {
    if request.body_length().is_some_and(|len| len > limit) {
        return Ok(None);
    }

    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit as u64 + 1)
        .read_to_end(&mut body)?;
    if body.len() > limit {
        return Ok(None);
    }

    let content_type = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.to_string());

    Ok(Some(HttpRequest {
        method: request.method().clone(),
        url: request.url().to_string(),
        content_type,
        body,
    }))
}

/// Send a routed response.
///
/// Headers that are not valid HTTP header bytes are dropped.
pub fn respond(request: Request, response: HttpResponse) -> Result<()> {
    let mut out = Response::from_data(response.body).with_status_code(StatusCode(response.status));
    let headers = std::iter::once(("Content-Type", response.content_type))
        .chain(response.headers.iter().map(|(name, value)| (*name, value.as_str())));
    for (name, value) in headers {
        if let Some(header) = make_header(name, value) {
            out.add_header(header);
        }
    }
    request.respond(out)?;
    Ok(())
}

fn make_header(key: &str, value: &str) -> Option<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).ok()
}
