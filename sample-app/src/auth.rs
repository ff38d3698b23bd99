use misugo::hyper::{Body, Response};
use misugo::{HandlerAdapter, Middleware, StatusCode};
use std::sync::Arc;

/// Rejects requests whose `x-api-token` header does not match the token
pub struct RequireToken {
    token: Arc<str>,
}

impl RequireToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::from(token.into()),
        }
    }

    /// Token from `SAMPLE_API_TOKEN`, `dev-token` when unset
    pub fn from_env() -> Self {
        Self::new(std::env::var("SAMPLE_API_TOKEN").unwrap_or_else(|_| "dev-token".to_string()))
    }
}

impl Middleware for RequireToken {
    fn wrap(&self, next: HandlerAdapter) -> HandlerAdapter {
        let token = Arc::clone(&self.token);
        HandlerAdapter::new(move |req| {
            let next = next.clone();
            let token = Arc::clone(&token);
            async move {
                let presented = req
                    .headers()
                    .get("x-api-token")
                    .and_then(|v| v.to_str().ok());
                if presented == Some(&*token) {
                    return next.call(req).await;
                }

                log::warn!("Rejected {} {}: bad token", req.method(), req.uri().path());
                let mut response = Response::new(Body::from("unauthorized"));
                *response.status_mut() = StatusCode::UNAUTHORIZED;
                response
            }
        })
    }

    fn name(&self) -> &'static str {
        "require_token"
    }
}
