use hyper::header::{HeaderName, HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Body, HeaderMap, Method, Response, StatusCode};
use std::io;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const MAX_RETAINED_BODY: usize = 1024 * 1024;

/// Buffered response sink handed to handlers through the context
///
/// Mirrors a streaming server's write semantics: the first status write
/// commits the head, later status writes are ignored, and header changes
/// after the head is committed have no effect. Body writes append and
/// commit a `200 OK` head if nothing was written yet.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status written so far, if any
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the status line and headers are committed
    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(current) => {
                log::debug!("superfluous status write {} (already {})", status, current);
            }
        }
    }

    /// Replace a header value; ignored once the head is committed
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.guard_committed(&name) {
            self.headers.insert(name, value);
        }
    }

    /// Add a header value alongside existing ones; ignored once committed
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.guard_committed(&name) {
            self.headers.append(name, value);
        }
    }

    fn guard_committed(&self, name: &HeaderName) -> bool {
        if self.is_committed() {
            log::warn!("header '{}' set after the response head was written, ignoring", name);
            return false;
        }
        true
    }

    pub fn write_body(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
    }

    /// Clear all state so the writer can serve another request
    pub fn reset(&mut self) {
        self.status = None;
        self.headers.clear();
        self.body.clear();
        if self.body.capacity() > MAX_RETAINED_BODY {
            self.body = Vec::new();
        }
    }

    /// Move the buffered response out, leaving an empty writer behind
    pub fn take(&mut self) -> ResponseWriter {
        std::mem::take(self)
    }

    pub fn into_hyper(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn plain_text(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

/// 404 produced by the transport for unmatched requests
pub fn not_found() -> Response<Body> {
    plain_text(StatusCode::NOT_FOUND, "404 page not found")
}

/// 405 for a path registered only under other methods
pub fn method_not_allowed(allowed: &[Method]) -> Response<Body> {
    let mut response = plain_text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

/// 413 for a request body over the configured limit
pub fn payload_too_large(limit: usize) -> Response<Body> {
    plain_text(
        StatusCode::PAYLOAD_TOO_LARGE,
        format!("request body exceeds {} bytes", limit),
    )
}

/// 500 carrying the failure message as a plain-text body
pub fn internal_error(message: impl Into<String>) -> Response<Body> {
    let mut response = plain_text(StatusCode::INTERNAL_SERVER_ERROR, message.into());
    response.headers_mut().insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    response
}
