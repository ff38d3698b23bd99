//! Request logging middleware
//!
//! Logs every request on the way in and its status and timing on the way
//! out. Nothing is formatted unless the `info` level is enabled, so the
//! overhead with `RUST_LOG=warn` is a level check per request.

use crate::middleware::{HandlerAdapter, Middleware};
use std::time::Instant;

/// HTTP request logging middleware
///
/// # Example
///
/// ```rust,ignore
/// use misugo::middleware::builtin::LoggingMiddleware;
///
/// app.middleware(LoggingMiddleware::new().boxed())?;
/// ```
#[derive(Clone, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn wrap(&self, next: HandlerAdapter) -> HandlerAdapter {
        HandlerAdapter::new(move |req| {
            let next = next.clone();
            async move {
                if !log::log_enabled!(log::Level::Info) {
                    return next.call(req).await;
                }

                let start_time = Instant::now();
                let method = req.method().clone();
                let path = req.uri().path().to_string();
                log::info!("→ {} {}", method, path);

                let response = next.call(req).await;

                log::info!(
                    "← {} {} {} in {:?}",
                    method,
                    path,
                    response.status().as_u16(),
                    start_time.elapsed()
                );
                response
            }
        })
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}
