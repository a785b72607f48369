//! The route table as the HTTP front sees it.
//!
//! [`App`] is a [`Router`] whose payload is an [`Endpoint`]: the handlers
//! for one route, keyed by method. Everything HTTP-specific about dispatch
//! lives here so the router itself stays payload-agnostic.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::Result;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;

/// Static asset requests are left to the web server and never routed.
static ASSET_PATHS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)assets").expect("asset regex"));

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// Handlers for one route, one per method.
#[derive(Clone, Default)]
pub struct Endpoint {
    handlers: Vec<(Method, BoxedHandler)>,
}

impl Endpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method`, replacing an earlier one.
    pub fn on(mut self, method: Method, handler: impl Handler) -> Self {
        let handler = handler.into_boxed_handler();
        match self.handlers.iter_mut().find(|(m, _)| *m == method) {
            Some(slot) => slot.1 = handler,
            None => self.handlers.push((method, handler)),
        }
        self
    }

    pub fn get(self, handler: impl Handler) -> Self { self.on(Method::GET, handler) }
    pub fn post(self, handler: impl Handler) -> Self { self.on(Method::POST, handler) }
    pub fn put(self, handler: impl Handler) -> Self { self.on(Method::PUT, handler) }
    pub fn patch(self, handler: impl Handler) -> Self { self.on(Method::PATCH, handler) }
    pub fn delete(self, handler: impl Handler) -> Self { self.on(Method::DELETE, handler) }

    pub(crate) fn handler(&self, method: &Method) -> Option<&BoxedHandler> {
        self.handlers.iter().find(|(m, _)| m == method).map(|(_, h)| h)
    }

    /// Value for an `Allow` header.
    pub fn allow(&self) -> String {
        let methods: Vec<&str> = self.handlers.iter().map(|(m, _)| m.as_str()).collect();
        methods.join(", ")
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Ordered route table plus the front-controller rules around it.
pub struct App {
    router: Router<Endpoint>,
    skip_assets: bool,
}

impl App {
    pub fn new() -> Self {
        Self { router: Router::new(), skip_assets: true }
    }

    /// Register an endpoint under a route template. Returns `self` for chaining.
    pub fn route(mut self, template: &str, endpoint: Endpoint) -> Result<Self> {
        self.router.add(template, endpoint)?;
        Ok(self)
    }

    /// Route asset-looking paths too instead of answering 404 for them.
    pub fn route_assets(mut self) -> Self {
        self.skip_assets = false;
        self
    }

    pub fn router(&self) -> &Router<Endpoint> { &self.router }

    /// Route one request and run its handler.
    pub async fn handle(&self, req: http::Request<Bytes>) -> Response {
        let (parts, body) = req.into_parts();
        let target = parts.uri.path_and_query().map_or("/", |pq| pq.as_str()).to_owned();

        if self.skip_assets && ASSET_PATHS.is_match(&target) {
            debug!(%target, "asset path, not routed");
            return Response::status(StatusCode::NOT_FOUND);
        }

        let matched = match self.router.dispatch(&target) {
            Ok(m) => m,
            Err(e) => {
                debug!(%target, "{e}");
                return e.into_response();
            }
        };

        let endpoint = matched.payload();
        let Some(handler) = endpoint.handler(&parts.method) else {
            return Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header("allow", &endpoint.allow())
                .no_body();
        };

        let handler = Arc::clone(handler);
        let req = Request::new(parts, body, matched.into_params());
        handler.call(req).await
    }
}

impl Default for App {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, uri: &str) -> http::Request<Bytes> {
        http::Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap()
    }

    async fn echo(req: Request) -> String {
        format!("{} {}", req.method(), req.param("id").unwrap_or("-"))
    }

    fn app() -> App {
        App::new()
            .route("/users/{id:\\d+}", Endpoint::new().get(echo).delete(echo))
            .unwrap()
    }

    #[tokio::test]
    async fn routes_by_path_then_method() {
        let res = app().handle(request(Method::GET, "/users/42?tab=profile")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"GET 42");
    }

    #[tokio::test]
    async fn unknown_method_is_405_with_allow() {
        let res = app().handle(request(Method::POST, "/users/42")).await;
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("GET, DELETE"));
    }

    #[tokio::test]
    async fn unmatched_path_is_404() {
        let res = app().handle(request(Method::GET, "/users/abc")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn asset_paths_are_not_routed() {
        let app = App::new()
            .route("assets/{file:.+}", Endpoint::new().get(echo))
            .unwrap();
        let res = app.handle(request(Method::GET, "/assets/app.css")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

        let res = app.route_assets().handle(request(Method::GET, "/assets/app.css")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    #[test]
    fn later_registration_replaces_handler() {
        let endpoint = Endpoint::new().get(echo).get(echo);
        assert_eq!(endpoint.allow(), "GET");
    }
}
