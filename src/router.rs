//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup via [`matchit`]. You
//! register a path, the router finds a handler — the matching algorithm
//! itself is matchit's business, not ours. Middleware chains are wrapped
//! around handlers once, at registration.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{self, Middleware};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server).
/// Every registration method returns `self`, so setup chains naturally:
///
/// ```rust,no_run
/// # use plinth::{Method, Request, Response, Router};
/// # use plinth::middleware::Trace;
/// # async fn get_user(_: Request) -> Response { Response::text("") }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
/// let app = Router::new()
///     .with(Trace)
///     .on(Method::Get,  "/users/{id}", get_user)
///     .on(Method::Post, "/users",      create_user);
/// ```
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    not_found: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            middlewares: Vec::new(),
            not_found: default_not_found.into_boxed_handler(),
        }
    }

    /// Adds a global middleware, wrapped around every registration made
    /// after this call. The first middleware added runs outermost, so add
    /// them before the routes they should cover.
    pub fn with(mut self, mw: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(mw));
        self
    }

    /// Registers a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves
    /// them:
    ///
    /// ```rust,no_run
    /// # use plinth::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn delete_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Get,    "/users/{id}", get_user)
    ///     .on(Method::Delete, "/users/{id}", delete_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics on an invalid or conflicting route pattern.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        let wrapped = self.wrap(handler.into_boxed_handler(), None);
        self.add(method, path, wrapped)
    }

    /// Like [`on`](Self::on), with a route-scoped middleware that runs
    /// inside the globals.
    pub fn on_with(
        self,
        method: Method,
        path: &str,
        mw: impl Middleware,
        handler: impl Handler,
    ) -> Self {
        let mw: Arc<dyn Middleware> = Arc::new(mw);
        let wrapped = self.wrap(handler.into_boxed_handler(), Some(mw));
        self.add(method, path, wrapped)
    }

    /// Replaces the default `404` handler. Wrapped in the global
    /// middlewares registered so far, like any route.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        let wrapped = self.wrap(handler.into_boxed_handler(), None);
        self.not_found = wrapped;
        self
    }

    /// Serves a single file for `GET path`.
    ///
    /// # Panics
    ///
    /// Panics if the file does not exist at registration: a missing asset
    /// is a deployment error, caught at startup. A file that disappears
    /// while the server runs turns into `404` responses instead.
    pub fn file(self, path: &str, file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        assert!(file.is_file(), "no such file: {}", file.display());
        self.on(Method::Get, path, move |_req: Request| {
            let file = file.clone();
            async move { serve_file(&file).await }
        })
    }

    /// Serves a directory tree for `GET` requests under `prefix`.
    ///
    /// Dotfiles, parent traversal and directories all answer `404`.
    pub fn dir(self, prefix: &str, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let pattern = format!("{}/{{*path}}", prefix.trim_end_matches('/'));
        self.on(Method::Get, &pattern, move |req: Request| {
            let root = root.clone();
            async move {
                match sanitize(req.param("path").unwrap_or("")) {
                    Some(rel) => serve_file(&root.join(rel)).await,
                    None => Response::status(Status::NotFound),
                }
            }
        })
    }

    /// Routes one request to its handler and produces the response.
    ///
    /// This is the dispatch entry point [`Server`](crate::Server) drives;
    /// tests can call it directly with a built
    /// [`Request`](crate::Request::builder) to exercise handlers and
    /// middleware without a socket.
    pub async fn handle(&self, mut req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.set_params(params);
                handler.call(req).await
            }
            None => self.not_found.call(req).await,
        }
    }

    fn wrap(&self, handler: BoxedHandler, route_mw: Option<Arc<dyn Middleware>>) -> BoxedHandler {
        let mut wrapped = handler;
        if let Some(mw) = route_mw {
            wrapped = middleware::wrap(mw, wrapped);
        }
        for mw in self.middlewares.iter().rev() {
            wrapped = middleware::wrap(Arc::clone(mw), wrapped);
        }
        wrapped
    }

    fn add(mut self, method: Method, path: &str, handler: BoxedHandler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

async fn default_not_found(_req: Request) -> Response {
    Response::builder()
        .status(Status::NotFound)
        .text("404 not found")
}

/// Reduces a request-supplied relative path to plain child segments.
/// Parent traversal, rooted paths and dotfiles are rejected.
fn sanitize(rel: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(segment) if !segment.to_string_lossy().starts_with('.') => {
                clean.push(segment);
            }
            _ => return None,
        }
    }
    Some(clean)
}

async fn serve_file(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(contents) => Response::with_content_type(content_type_for(path), contents),
        // Missing, unreadable and directory targets all answer alike.
        Err(_) => Response::status(Status::NotFound),
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("css") => "text/css; charset=utf-8",
        Some("htm" | "html") => "text/html; charset=utf-8",
        Some("ico") => "image/x-icon",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("jpeg" | "jpg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_accepts_plain_segments() {
        assert_eq!(sanitize("a/b/c.txt"), Some(PathBuf::from("a/b/c.txt")));
        assert_eq!(sanitize(""), Some(PathBuf::new()));
    }

    #[test]
    fn sanitize_rejects_escapes() {
        assert_eq!(sanitize("../secret"), None);
        assert_eq!(sanitize("a/../../b"), None);
        assert_eq!(sanitize("/etc/passwd"), None);
        assert_eq!(sanitize(".git/config"), None);
        assert_eq!(sanitize("a/.hidden"), None);
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(Path::new("a/index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("a/blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn routes_by_method_and_path() {
        let app = Router::new()
            .on(Method::Get, "/users/{id}", |req: Request| async move {
                Response::text(format!("user {}", req.param("id").unwrap()))
            })
            .on(Method::Post, "/users", |_req: Request| async {
                Response::status(Status::Created)
            });

        let res = app
            .handle(Request::builder(Method::Get, "/users/42").build())
            .await;
        assert_eq!(res.body(), b"user 42");

        let res = app
            .handle(Request::builder(Method::Post, "/users").build())
            .await;
        assert_eq!(res.status_code(), Status::Created);

        // Right path, wrong method.
        let res = app
            .handle(Request::builder(Method::Delete, "/users").build())
            .await;
        assert_eq!(res.status_code(), Status::NotFound);
    }

    #[tokio::test]
    async fn unmatched_paths_hit_not_found() {
        let app = Router::new();
        let res = app
            .handle(Request::builder(Method::Get, "/nothing").build())
            .await;
        assert_eq!(res.status_code(), Status::NotFound);
        assert_eq!(res.body(), b"404 not found");
    }

    #[tokio::test]
    async fn not_found_can_be_replaced() {
        let app = Router::new().not_found(|_req: Request| async {
            Response::builder().status(Status::Gone).text("nothing here")
        });
        let res = app
            .handle(Request::builder(Method::Get, "/nothing").build())
            .await;
        assert_eq!(res.status_code(), Status::Gone);
        assert_eq!(res.body(), b"nothing here");
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        async fn h(_req: Request) -> Response {
            Response::text("")
        }
        Router::new()
            .on(Method::Get, "/users/{id}", h)
            .on(Method::Get, "/users/{name}", h);
    }
}
