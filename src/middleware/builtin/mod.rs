//! Built-in middleware implementations
//!
//! These serve as examples for application middleware and cover the
//! concerns most services want on every route.

pub mod logging;
pub mod security_headers;

pub use logging::LoggingMiddleware;
pub use security_headers::SecurityHeadersMiddleware;
