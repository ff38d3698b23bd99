use crate::codec::{Decoder, Encoder, JsonCodec};
use crate::cookie::{self, Cookie};
use crate::error::{Error, Result};
use crate::http::ResponseWriter;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, COOKIE, SET_COOKIE};
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;

const MAX_RETAINED_HEADERS: usize = 1024;

/// Per-request context handed to route handlers
///
/// Instances are recycled through a [`ContextPool`](crate::pool::ContextPool).
/// [`Context::bind`] reassigns every field from the live request before the
/// handler sees it, and [`Context::reset`] clears it again on release, so
/// nothing from a previous request is observable.
#[derive(Debug, Default)]
pub struct Context {
    serial: u64,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    decoder: Decoder,
    encoder: Encoder,
    writer: ResponseWriter,
}

impl Context {
    /// Create an empty context; `serial` identifies it across reuses
    pub fn new(serial: u64) -> Self {
        Self {
            serial,
            ..Self::default()
        }
    }

    /// Populate the context from a live request/response pair
    pub fn bind(&mut self, parts: Parts, body: Bytes, writer: ResponseWriter) {
        self.method = parts.method;
        self.uri = parts.uri;
        self.headers = parts.headers;
        self.decoder = JsonCodec::decoder(body);
        self.encoder = JsonCodec::encoder();
        self.writer = writer;
    }

    /// Drop all request state, keeping only the serial and small buffers
    pub fn reset(&mut self) {
        self.method = Method::default();
        self.uri = Uri::default();
        self.headers.clear();
        if self.headers.capacity() > MAX_RETAINED_HEADERS {
            self.headers = HeaderMap::new();
        }
        self.decoder = Decoder::default();
        self.writer.reset();
    }

    /// Move the buffered response out of the context
    pub fn take_writer(&mut self) -> ResponseWriter {
        self.writer.take()
    }

    /// Identifier of this pooled instance, stable across reuse
    pub fn serial(&self) -> u64 {
        self.serial
    }

    // Request accessors

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a request header as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get a decoded query-string parameter
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Get a cookie sent by the client
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| cookie::find_in_header(header, name))
    }

    // Codec operations

    /// Decode the next JSON value of the request body into `target`
    ///
    /// The target must be a mutable reference; anything else is rejected by
    /// the compiler:
    ///
    /// ```compile_fail
    /// # fn demo(ctx: &mut misugo::Context) -> misugo::Result<()> {
    /// let target: Vec<u32> = Vec::new();
    /// ctx.decode_body(target)?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// On failure `target` is left untouched.
    pub fn decode_body<T: DeserializeOwned>(&mut self, target: &mut T) -> Result<()> {
        *target = self.decoder.decode()?;
        Ok(())
    }

    /// Decode the next JSON value of the request body
    pub fn body_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.decoder.decode()
    }

    /// Write `status`, then `value` encoded as JSON
    ///
    /// Only the first status written for a request takes effect.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> Result<()> {
        self.writer.write_header(status);
        self.encoder.encode(value, &mut self.writer)
    }

    // Response headers

    /// Append a `Set-Cookie` header
    ///
    /// Has no effect once the response status has been written. Cookies with
    /// an invalid name are skipped.
    pub fn set_cookie(&mut self, cookie: &Cookie) {
        let Some(rendered) = cookie.to_header_value() else {
            log::warn!("invalid cookie name '{}', cookie dropped", cookie.name());
            return;
        };
        match HeaderValue::from_str(&rendered) {
            Ok(value) => self.writer.append_header(SET_COOKIE, value),
            Err(e) => log::warn!("cookie '{}' is not a valid header: {}", cookie.name(), e),
        }
    }

    /// Replace a response header, e.g. to override the JSON content type
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::internal(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::internal(format!("invalid header value: {}", e)))?;
        self.writer.set_header(name, value);
        Ok(())
    }

    /// Response written so far
    pub fn response(&self) -> &ResponseWriter {
        &self.writer
    }
}
