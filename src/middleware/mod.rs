//! Middleware layer.
//!
//! Middleware intercepts a request before its handler runs and can inspect
//! or replace the response on the way out. It is the place for
//! cross-cutting concerns like access logging and authentication.
//!
//! A middleware receives the [`Request`] and a [`Next`] representing the
//! rest of the chain. It can short-circuit by not calling
//! [`Next::run`]:
//!
//! ```rust
//! use plinth::middleware::Next;
//! use plinth::{Request, Response, Status};
//!
//! async fn no_teapots(req: Request, next: Next) -> Response {
//!     if req.header("user-agent").is_some_and(|ua| ua.contains("teapot")) {
//!         return Response::status(Status::ImATeapot);
//!     }
//!     next.run(req).await
//! }
//! ```
//!
//! Register globally with [`Router::with`](crate::Router::with) or per route
//! with [`Router::on_with`](crate::Router::on_with). Chains are wrapped once
//! at registration, not per request.
//!
//! Built-ins: [`Trace`] (access log), [`BasicAuth`], [`SessionAuth`].

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::Response;

mod basic_auth;
mod session;
mod trace;

pub use crate::handler::BoxFuture;
pub use basic_auth::BasicAuth;
pub use session::{SessionAuth, bearer_header, session_cookie, session_token, SESSION_COOKIE};
pub use trace::Trace;

/// The rest of the chain after a middleware: any remaining middleware, then
/// the route handler.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Runs the rest of the chain.
    pub async fn run(self, req: Request) -> Response {
        self.inner.call(req).await
    }
}

/// Intercepts requests on their way to a handler.
///
/// Implement the trait directly for middleware that carries state, or use
/// any `async fn(Request, Next) -> Response`; the blanket impl covers it.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin(self(req, next))
    }
}

/// Wraps `next` in `mw`, producing a handler the router can store.
pub(crate) fn wrap(mw: Arc<dyn Middleware>, next: BoxedHandler) -> BoxedHandler {
    Arc::new(Wrapped { mw, next })
}

struct Wrapped {
    mw: Arc<dyn Middleware>,
    next: BoxedHandler,
}

impl ErasedHandler for Wrapped {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Next {
            inner: Arc::clone(&self.next),
        };
        self.mw.handle(req, next)
    }
}
