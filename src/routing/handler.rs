//! Handler adapter: the innermost link of every route's chain
//!
//! [`HandlerAdapter`] is the uniform unit that middleware wrap and the router
//! stores. [`adapt`] turns a user handler into one: it declares the JSON
//! content type, collects the body up to the configured limit, checks a
//! context out of the pool, runs the handler and maps any failure to a
//! plain-text 500.

use crate::codec::JsonCodec;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{response, ResponseWriter};
use crate::pool::{self, ContextPool};
use futures::FutureExt;
use hyper::body::{Bytes, HttpBody};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Request, Response};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A route handler: reads the request and writes the response through the
/// context, returning `Err` to have the adapter answer with a 500
pub type RouteHandler =
    Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// Type-erased request handler shared by every connection
#[derive(Clone)]
pub struct HandlerAdapter {
    inner: Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response<Body>> + Send + Sync>,
}

impl HandlerAdapter {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response<Body>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |req| Box::pin(f(req))),
        }
    }

    pub fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response<Body>> {
        (self.inner)(req)
    }
}

impl std::fmt::Debug for HandlerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HandlerAdapter")
    }
}

/// Wrap `handler` into a terminal adapter drawing contexts from `pool`
///
/// Bodies longer than `max_body` bytes are answered with a 413 before a
/// context is checked out.
pub fn adapt(
    handler: RouteHandler,
    pool: Arc<dyn ContextPool>,
    max_body: usize,
) -> HandlerAdapter {
    HandlerAdapter::new(move |req: Request<Body>| {
        let handler = Arc::clone(&handler);
        let pool = Arc::clone(&pool);
        async move {
            let mut writer = ResponseWriter::new();
            writer.set_header(CONTENT_TYPE, HeaderValue::from_static(JsonCodec::MEDIA_TYPE));

            let (parts, body) = req.into_parts();
            let body = match collect_body(body, max_body).await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    log::warn!(
                        "Rejected {} {}: body exceeds {} bytes",
                        parts.method,
                        parts.uri.path(),
                        max_body
                    );
                    return response::payload_too_large(max_body);
                }
                Err(e) => return failure_response(&e),
            };

            let mut ctx = pool::checkout(&pool);
            ctx.bind(parts, body, writer);

            let outcome = AssertUnwindSafe(handler(&mut *ctx)).catch_unwind().await;

            let writer = ctx.take_writer();
            ctx.release();

            match outcome {
                Ok(Ok(())) => writer.into_hyper(),
                Ok(Err(e)) => failure_response(&e),
                Err(_) => failure_response(&Error::internal("handler panicked")),
            }
        }
    })
}

/// Collect `body`, or `None` as soon as it is known to pass `limit` bytes
async fn collect_body(mut body: Body, limit: usize) -> Result<Option<Bytes>> {
    if body.size_hint().lower() > limit as u64 {
        return Ok(None);
    }

    let mut collected = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk?;
        if collected.len() + chunk.len() > limit {
            return Ok(None);
        }
        collected.extend_from_slice(&chunk);
    }
    Ok(Some(Bytes::from(collected)))
}

fn failure_response(err: &Error) -> Response<Body> {
    log::error!("Handler failed [{}]: {}", err.error_code(), err);
    response::internal_error(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{FreshPool, RecyclingPool};
    use hyper::StatusCode;
    use serde_json::json;

    const LIMIT: usize = 1024;

    fn route<F>(f: F) -> RouteHandler
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_success_keeps_handler_output() {
        let pool: Arc<dyn ContextPool> = Arc::new(RecyclingPool::new(4));
        let adapter = adapt(
            route(|ctx| Box::pin(async move { ctx.write_json(StatusCode::ACCEPTED, &json!([1, 2])) })),
            Arc::clone(&pool),
            LIMIT,
        );

        let response = adapter.call(Request::new(Body::empty())).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_string(response).await, "[1,2]");
        assert_eq!(pool.stats().released, 1);
    }

    #[tokio::test]
    async fn test_silent_handler_yields_empty_ok() {
        let pool: Arc<dyn ContextPool> = Arc::new(FreshPool::new());
        let adapter = adapt(route(|_ctx| Box::pin(async { Ok(()) })), pool, LIMIT);

        let response = adapter.call(Request::new(Body::empty())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_failure_maps_to_500_and_discards_output() {
        let pool: Arc<dyn ContextPool> = Arc::new(RecyclingPool::new(4));
        let adapter = adapt(
            route(|ctx| {
                Box::pin(async move {
                    ctx.write_json(StatusCode::OK, &json!({"partial": true}))?;
                    Err(Error::handler("database unavailable"))
                })
            }),
            Arc::clone(&pool),
            LIMIT,
        );

        let response = adapter.call(Request::new(Body::empty())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(body_string(response).await, "database unavailable");
        assert_eq!(pool.stats().released, 1);
        assert_eq!(pool.stats().idle, 1);
    }

    #[tokio::test]
    async fn test_panic_maps_to_500_and_releases() {
        let pool: Arc<dyn ContextPool> = Arc::new(RecyclingPool::new(4));
        let adapter = adapt(
            route(|ctx| {
                Box::pin(async move {
                    if ctx.path() == "/" {
                        panic!("unexpected state");
                    }
                    Ok(())
                })
            }),
            Arc::clone(&pool),
            LIMIT,
        );

        let response = adapter.call(Request::new(Body::empty())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Internal error: handler panicked");

        let stats = pool.stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_context() {
        let pool: Arc<dyn ContextPool> = Arc::new(RecyclingPool::new(4));
        let adapter = adapt(
            route(|_ctx| Box::pin(futures::future::pending::<Result<()>>())),
            Arc::clone(&pool),
            LIMIT,
        );

        let pending = adapter.call(Request::new(Body::empty()));
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(20), pending).await;
        assert!(timed_out.is_err());

        let stats = pool.stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
    }

    fn echo_length() -> RouteHandler {
        route(|ctx| {
            Box::pin(async move {
                let text: String = ctx.body_json()?;
                ctx.write_json(StatusCode::OK, &text.len())
            })
        })
    }

    fn quoted(len: usize) -> Body {
        Body::from(format!("\"{}\"", "a".repeat(len - 2)))
    }

    #[tokio::test]
    async fn test_body_at_limit_is_accepted() {
        let pool: Arc<dyn ContextPool> = Arc::new(RecyclingPool::new(4));
        let adapter = adapt(echo_length(), Arc::clone(&pool), 16);

        let response = adapter.call(Request::new(quoted(16))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "14");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected_before_checkout() {
        let pool: Arc<dyn ContextPool> = Arc::new(RecyclingPool::new(4));
        let adapter = adapt(echo_length(), Arc::clone(&pool), 16);

        let response = adapter.call(Request::new(quoted(17))).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(body_string(response).await, "request body exceeds 16 bytes");
        assert_eq!(pool.stats().acquired, 0);
    }

    #[tokio::test]
    async fn test_streamed_body_is_capped_without_length() {
        let pool: Arc<dyn ContextPool> = Arc::new(RecyclingPool::new(4));
        let adapter = adapt(echo_length(), Arc::clone(&pool), 16);

        let (mut sender, body) = Body::channel();
        tokio::spawn(async move {
            for _ in 0..4 {
                if sender.send_data(Bytes::from_static(b"0123456789")).await.is_err() {
                    break;
                }
            }
        });

        let response = adapter.call(Request::new(body)).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(pool.stats().acquired, 0);
    }
}
