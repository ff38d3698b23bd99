use super::handler::HandlerAdapter;
use crate::error::{Error, Result};
use hyper::Method;
use std::collections::HashMap;

/// Outcome of looking up a request in the route table
#[derive(Debug)]
pub enum RouteMatch<'a> {
    Found(&'a HandlerAdapter),
    /// The path is registered, but only under these methods
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Exact `(method, path)` route table
pub struct Router {
    routes: HashMap<(Method, String), HandlerAdapter>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Add a composed adapter under `(method, pattern)`
    ///
    /// The pattern is normalized first. A key that is already present is
    /// left untouched and reported as a conflict.
    pub fn add_route(
        &mut self,
        method: Method,
        pattern: &str,
        adapter: HandlerAdapter,
    ) -> Result<()> {
        let pattern = normalize_pattern(pattern);
        let key = (method, pattern);
        if self.routes.contains_key(&key) {
            let (method, pattern) = key;
            return Err(Error::RouteConflict { method, pattern });
        }

        log::debug!("Registered route {} {}", key.0, key.1);
        self.routes.insert(key, adapter);
        Ok(())
    }

    /// Look up the adapter for a request
    ///
    /// `HEAD` falls back to the `GET` route when no explicit `HEAD` route
    /// exists. Paths are matched exactly.
    pub fn match_route(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let key = (method.clone(), path.to_string());
        if let Some(adapter) = self.routes.get(&key) {
            return RouteMatch::Found(adapter);
        }

        if method == Method::HEAD {
            if let Some(adapter) = self.routes.get(&(Method::GET, key.1.clone())) {
                return RouteMatch::Found(adapter);
            }
        }

        let mut allowed: Vec<Method> = self
            .routes
            .keys()
            .filter(|(_, p)| p == path)
            .map(|(m, _)| m.clone())
            .collect();

        if allowed.is_empty() {
            return RouteMatch::NotFound;
        }

        if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
            allowed.push(Method::HEAD);
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        RouteMatch::MethodNotAllowed(allowed)
    }

    /// Get the number of routes registered in this router
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Check if the router has any routes
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Normalize a route pattern: prepend a missing leading `/`, empty becomes `/`
pub fn normalize_pattern(pattern: &str) -> String {
    if pattern.starts_with('/') {
        pattern.to_string()
    } else {
        format!("/{}", pattern)
    }
}
