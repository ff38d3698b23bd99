use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{response, server, Server};
use crate::middleware::{self, BoxedMiddleware};
use crate::pool::{ContextPool, PoolStats};
use crate::routing::{adapt, BoxFuture, RouteMatch, Router};
use hyper::{Body, Method, Request, Response};
use std::future::Future;
use std::sync::Arc;

/// A misugo application: the route table, its middleware and its context pool
///
/// Routes are registered up front; once the app is handed to a [`Server`] it
/// is shared read-only between connections.
///
/// ```rust,ignore
/// let mut app = Misugo::new();
/// app.get("/items", |ctx| Box::pin(async move {
///     ctx.write_json(StatusCode::OK, &json!({"id": 1}))
/// }), vec![])?;
/// app.serve("8080").await?;
/// ```
pub struct Misugo {
    router: Router,
    middleware: Vec<BoxedMiddleware>,
    pool: Arc<dyn ContextPool>,
    pub config: Arc<AppConfig>,
}

impl Default for Misugo {
    fn default() -> Self {
        Self::new()
    }
}

impl Misugo {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let pool = config.build_pool();
        Self {
            router: Router::new(),
            middleware: Vec::new(),
            pool,
            config: Arc::new(config),
        }
    }

    /// Load configuration through the command line (`--config`, `--port`)
    ///
    /// `--help` is left to the binary; see [`CliArgs::is_help`].
    pub fn with_args() -> Result<Self> {
        Self::from_args(&CliArgs::parse()?)
    }

    /// Build an app from already parsed command-line arguments
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        if let Some(path) = args.config_path() {
            log::info!("Loading configuration from CLI: {}", path.display());
        }
        Ok(Self::with_config(args.load_config()?))
    }

    /// Replace the context pool
    ///
    /// Fails once a route has been registered, since every route captures
    /// the pool at registration.
    pub fn with_pool(mut self, pool: Arc<dyn ContextPool>) -> Result<Self> {
        if !self.router.is_empty() {
            return Err(Error::config(
                "context pool must be set before routes are registered",
            ));
        }
        self.pool = pool;
        Ok(self)
    }

    /// Add middleware wrapping every route, outermost first
    ///
    /// Fails once a route has been registered.
    pub fn middleware(&mut self, middleware: BoxedMiddleware) -> Result<&mut Self> {
        if !self.router.is_empty() {
            return Err(Error::config(format!(
                "middleware '{}' must be added before routes are registered",
                middleware.name()
            )));
        }
        self.middleware.push(middleware);
        Ok(self)
    }

    /// Register `handler` for `method` and `pattern` behind `middlewares`
    ///
    /// App-wide middleware wraps the route's own list. Registering a
    /// `(method, pattern)` pair twice is an error and leaves the first
    /// registration in place.
    pub fn register<H>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        middlewares: Vec<BoxedMiddleware>,
    ) -> Result<&mut Self>
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        let terminal = adapt(
            Arc::new(handler),
            Arc::clone(&self.pool),
            self.config.server.max_body,
        );
        let chain: Vec<BoxedMiddleware> = self
            .middleware
            .iter()
            .cloned()
            .chain(middlewares)
            .collect();

        self.router
            .add_route(method, pattern, middleware::compose(terminal, &chain))?;
        Ok(self)
    }

    pub fn get<H>(
        &mut self,
        pattern: &str,
        handler: H,
        middlewares: Vec<BoxedMiddleware>,
    ) -> Result<&mut Self>
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.register(Method::GET, pattern, handler, middlewares)
    }

    pub fn post<H>(
        &mut self,
        pattern: &str,
        handler: H,
        middlewares: Vec<BoxedMiddleware>,
    ) -> Result<&mut Self>
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.register(Method::POST, pattern, handler, middlewares)
    }

    pub fn put<H>(
        &mut self,
        pattern: &str,
        handler: H,
        middlewares: Vec<BoxedMiddleware>,
    ) -> Result<&mut Self>
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.register(Method::PUT, pattern, handler, middlewares)
    }

    pub fn delete<H>(
        &mut self,
        pattern: &str,
        handler: H,
        middlewares: Vec<BoxedMiddleware>,
    ) -> Result<&mut Self>
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.register(Method::DELETE, pattern, handler, middlewares)
    }

    pub fn patch<H>(
        &mut self,
        pattern: &str,
        handler: H,
        middlewares: Vec<BoxedMiddleware>,
    ) -> Result<&mut Self>
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.register(Method::PATCH, pattern, handler, middlewares)
    }

    /// Dispatch one request through the route table
    pub async fn handle_request(&self, req: Request<Body>) -> Response<Body> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match self.router.match_route(&method, &path) {
            RouteMatch::Found(adapter) => {
                log::debug!("Dispatching {} {}", method, path);
                let response = adapter.call(req).await;
                if method == Method::HEAD {
                    let (parts, _) = response.into_parts();
                    return Response::from_parts(parts, Body::empty());
                }
                response
            }
            RouteMatch::MethodNotAllowed(allowed) => {
                log::debug!("Method {} not allowed for {}", method, path);
                response::method_not_allowed(&allowed)
            }
            RouteMatch::NotFound => {
                log::debug!("No route for {} {}", method, path);
                response::not_found()
            }
        }
    }

    pub fn route_count(&self) -> usize {
        self.router.route_count()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Serve on `addr` until the listener fails
    ///
    /// `addr` is `host:port`, `:port` or a bare port.
    pub async fn serve(self, addr: &str) -> Result<()> {
        Server::bind(self, addr)?.run().await
    }

    /// Serve on `addr` until `signal` resolves, then drain in-flight requests
    pub async fn serve_with_shutdown<F>(self, addr: &str, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        Server::bind(self, addr)?.run_until(signal).await
    }

    /// Serve on the configured address until SIGINT or SIGTERM
    pub async fn start(self) -> Result<()> {
        let addr = self.config.server_address();
        log::info!(
            "Starting misugo with {} routes on {}",
            self.route_count(),
            addr
        );
        self.serve_with_shutdown(&addr, server::shutdown_signal())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;
    use crate::pool::{FreshPool, RecyclingPool};
    use hyper::StatusCode;
    use serde_json::json;
    use std::io::Write;

    fn app() -> Misugo {
        Misugo::new().with_pool(Arc::new(FreshPool::new())).unwrap()
    }

    async fn dispatch(app: &Misugo, path: &str) -> Response<Body> {
        let request = Request::get(path).body(Body::empty()).unwrap();
        app.handle_request(request).await
    }

    #[tokio::test]
    async fn test_injected_pool_serves_requests() {
        let pool = Arc::new(RecyclingPool::new(4));
        let mut app = Misugo::new().with_pool(pool.clone()).unwrap();
        app.get("/a", |_ctx| Box::pin(async { Ok(()) }), vec![])
            .unwrap();

        let response = dispatch(&app, "/a").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(pool.stats().acquired, 1);
        assert_eq!(app.pool_stats(), pool.stats());
    }

    #[tokio::test]
    async fn test_pool_swap_after_route_is_rejected() {
        let mut app = Misugo::new()
            .with_pool(Arc::new(RecyclingPool::new(4)))
            .unwrap();
        app.get("/a", |_ctx| Box::pin(async { Ok(()) }), vec![])
            .unwrap();

        let err = app.with_pool(Arc::new(FreshPool::new())).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_args_leaves_help_to_caller() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nhost = \"127.0.0.1\"\nport = 3000").unwrap();

        let args = CliArgs {
            port: Some(4100),
            config_file: Some(file.path().to_path_buf()),
            help: true,
        };
        let app = Misugo::from_args(&args).unwrap();
        assert_eq!(app.config.server_address(), "127.0.0.1:4100");
        assert_eq!(app.route_count(), 0);
    }

    #[test]
    fn test_middleware_after_route_is_rejected() {
        let mut app = app();
        app.get("/", |_ctx| Box::pin(async { Ok(()) }), vec![])
            .unwrap();

        let err = app
            .middleware(from_fn(|next| next))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_verb_helpers_register_their_method() {
        let mut app = app();
        app.get("/r", |_ctx| Box::pin(async { Ok(()) }), vec![])
            .unwrap()
            .post("/r", |_ctx| Box::pin(async { Ok(()) }), vec![])
            .unwrap()
            .put("/r", |_ctx| Box::pin(async { Ok(()) }), vec![])
            .unwrap()
            .delete("/r", |_ctx| Box::pin(async { Ok(()) }), vec![])
            .unwrap()
            .patch("/r", |_ctx| Box::pin(async { Ok(()) }), vec![])
            .unwrap();
        assert_eq!(app.route_count(), 5);
    }

    #[tokio::test]
    async fn test_head_uses_get_route_without_body() {
        let mut app = app();
        app.get(
            "/items",
            |ctx| Box::pin(async move { ctx.write_json(StatusCode::OK, &json!({"id": 1})) }),
            vec![],
        )
        .unwrap();

        let request = Request::builder()
            .method(Method::HEAD)
            .uri("/items")
            .body(Body::empty())
            .unwrap();
        let response = app.handle_request(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_method_gets_405() {
        let mut app = app();
        app.post("/items", |_ctx| Box::pin(async { Ok(()) }), vec![])
            .unwrap();

        let request = Request::builder()
            .method(Method::GET)
            .uri("/items")
            .body(Body::empty())
            .unwrap();
        let response = app.handle_request(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["allow"], "POST");
        assert_eq!(app.pool_stats().acquired, 0);
    }
}
