//! Security headers middleware
//!
//! Adds a conservative set of security headers to every response that does
//! not already carry them.

use crate::middleware::{HandlerAdapter, Middleware};
use hyper::header::{HeaderName, HeaderValue};
use std::sync::Arc;

/// Security headers middleware
#[derive(Clone)]
pub struct SecurityHeadersMiddleware {
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
    enabled: bool,
}

impl SecurityHeadersMiddleware {
    /// Create new security headers middleware with default secure headers
    pub fn new() -> Self {
        Self::with_headers(vec![
            (
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            ),
            (
                HeaderName::from_static("x-frame-options"),
                HeaderValue::from_static("DENY"),
            ),
            (
                HeaderName::from_static("referrer-policy"),
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            ),
        ])
    }

    /// Create security headers middleware with a custom header set
    pub fn with_headers(headers: Vec<(HeaderName, HeaderValue)>) -> Self {
        Self {
            headers: Arc::new(headers),
            enabled: true,
        }
    }

    /// Disable security headers (not recommended)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }
}

impl Default for SecurityHeadersMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for SecurityHeadersMiddleware {
    fn wrap(&self, next: HandlerAdapter) -> HandlerAdapter {
        if !self.enabled {
            return next;
        }

        let headers = Arc::clone(&self.headers);
        HandlerAdapter::new(move |req| {
            let next = next.clone();
            let headers = Arc::clone(&headers);
            async move {
                let mut response = next.call(req).await;
                for (name, value) in headers.iter() {
                    if !response.headers().contains_key(name) {
                        response.headers_mut().insert(name.clone(), value.clone());
                    }
                }
                response
            }
        })
    }

    fn name(&self) -> &'static str {
        "security_headers"
    }
}
