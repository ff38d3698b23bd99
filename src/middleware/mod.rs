//! Middleware chain
//!
//! A middleware is a value that wraps the next [`HandlerAdapter`] in the
//! chain and returns a new one. It can run code before and after calling
//! `next`, or answer on its own without calling it at all.
//!
//! Chains compose right to left: for `[m0, m1, m2]` around handler `h` the
//! result is `m0(m1(m2(h)))`, so `m0` sees the request first and the
//! response last.
//!
//! # Example
//!
//! ```rust,ignore
//! use misugo::middleware::{from_fn, HandlerAdapter};
//!
//! let require_token = from_fn(|next: HandlerAdapter| {
//!     HandlerAdapter::new(move |req| {
//!         let next = next.clone();
//!         async move {
//!             if req.headers().contains_key("x-token") {
//!                 next.call(req).await
//!             } else {
//!                 misugo::http::response::internal_error("missing token")
//!             }
//!         }
//!     })
//! });
//! ```

pub mod builtin;

pub use crate::routing::handler::HandlerAdapter;
use std::sync::Arc;

/// Trait for values that wrap a handler adapter
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: HandlerAdapter) -> HandlerAdapter;

    /// Optional: Get the name of this middleware for debugging
    fn name(&self) -> &'static str {
        "unnamed"
    }

    /// Type-erase this middleware for registration
    fn boxed(self) -> BoxedMiddleware
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

impl<F> Middleware for F
where
    F: Fn(HandlerAdapter) -> HandlerAdapter + Send + Sync + 'static,
{
    fn wrap(&self, next: HandlerAdapter) -> HandlerAdapter {
        self(next)
    }
}

/// Registered middleware, shared between every chain it is part of
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Build a middleware from a closure
pub fn from_fn<F>(f: F) -> BoxedMiddleware
where
    F: Fn(HandlerAdapter) -> HandlerAdapter + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Compose `middlewares` around `terminal`, first element outermost
pub fn compose(terminal: HandlerAdapter, middlewares: &[BoxedMiddleware]) -> HandlerAdapter {
    middlewares.iter().rev().fold(terminal, |next, middleware| {
        log::trace!("Wrapping handler with middleware '{}'", middleware.name());
        middleware.wrap(next)
    })
}
