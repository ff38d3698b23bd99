use crate::app::Misugo;
use crate::error::{Error, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::Server as HyperServer;
use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;

/// HTTP transport for a [`Misugo`] app
///
/// Binding happens eagerly in [`Server::bind`], so the caller learns about
/// an unusable address before anything is served and can read the actual
/// port back from [`Server::local_addr`] when binding to port 0.
pub struct Server {
    app: Arc<Misugo>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

impl Server {
    pub fn bind(app: Misugo, addr: &str) -> Result<Self> {
        let addr = parse_address(addr)?;
        let listener = TcpListener::bind(addr)
            .map_err(|e| Error::transport(format!("Failed to bind {}: {}", addr, e)))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| Error::transport(format!("Failed to configure listener: {}", e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::transport(format!("Failed to read local address: {}", e)))?;

        Ok(Self {
            app: Arc::new(app),
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the listener fails
    pub async fn run(self) -> Result<()> {
        self.run_until(futures::future::pending()).await
    }

    /// Serve until `signal` resolves, then drain in-flight requests
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let app = self.app;
        let make_svc = make_service_fn(move |_conn| {
            let app = Arc::clone(&app);
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let app = Arc::clone(&app);
                    async move { Ok::<_, Infallible>(app.handle_request(req).await) }
                }))
            }
        });

        let server = HyperServer::from_tcp(self.listener)
            .map_err(|e| Error::transport(format!("Failed to start listener: {}", e)))?
            .serve(make_svc)
            .with_graceful_shutdown(signal);

        log::info!("misugo server listening on {}", self.local_addr);

        server
            .await
            .map_err(|e| Error::transport(format!("Server error: {}", e)))?;

        log::info!("Server stopped");
        Ok(())
    }
}

/// Resolve a listen address
///
/// Accepts `host:port`, `:port` or a bare `port`; the last two listen on
/// all interfaces.
pub fn parse_address(addr: &str) -> Result<SocketAddr> {
    let addr = addr.trim();
    let candidate = if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{}", port)
    } else if !addr.is_empty() && addr.bytes().all(|b| b.is_ascii_digit()) {
        format!("0.0.0.0:{}", addr)
    } else {
        addr.to_string()
    };

    candidate
        .to_socket_addrs()
        .map_err(|e| Error::transport(format!("Invalid address '{}': {}", addr, e)))?
        .next()
        .ok_or_else(|| Error::transport(format!("Invalid address '{}': no match", addr)))
}

/// Resolve on SIGINT or SIGTERM (Ctrl+C off Unix)
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                return futures::future::pending().await;
            }
        };

        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(sig) => sig,
            Err(e) => {
                log::error!("Failed to install SIGINT handler: {}", e);
                return futures::future::pending().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                log::info!("Received SIGTERM signal - initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                log::info!("Received SIGINT signal (Ctrl+C) - initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C signal - initiating graceful shutdown"),
            Err(e) => {
                log::error!("Failed to listen for Ctrl+C signal: {}", e);
                futures::future::pending::<()>().await;
            }
        }
    }
}
