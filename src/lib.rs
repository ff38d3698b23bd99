//! misugo - a minimal HTTP router
//!
//! misugo maps `(method, path)` pairs to async handlers and provides:
//! - Per-route and app-wide middleware chains
//! - Pooled per-request contexts with JSON body decoding and encoding
//! - Cookie rendering and uniform 500 mapping for handler failures

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod app;
pub mod codec;
pub mod config;
pub mod context;
pub mod cookie;
pub mod error;
pub mod http;
pub mod middleware;
pub mod pool;
pub mod routing;

// CLI support for command-line argument parsing
pub mod cli;

// Re-export main types for public API
pub use app::Misugo;
pub use codec::JsonCodec;
pub use config::AppConfig;
pub use context::Context;
pub use cookie::{Cookie, SameSite};
pub use error::{Error, Result};
pub use http::{ResponseWriter, Server};
pub use middleware::{from_fn, BoxedMiddleware, HandlerAdapter, Middleware};
pub use pool::{ContextPool, FreshPool, PoolStats, RecyclingPool};
pub use routing::{BoxFuture, RouteHandler};

// Re-export hyper types used in handler and middleware signatures
pub use hyper;
pub use hyper::{Method, StatusCode};
