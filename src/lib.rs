//! # plinth
//!
//! A minimal HTTP routing and middleware toolkit. A thin layer over a radix
//! router that adds the parts every service rebuilds anyway: request and
//! response helpers, error-to-status translation, panic recovery, signed
//! session tokens, and a small expiring cache. Nothing more.
//!
//! ## The contract
//!
//! plinth assumes a reverse proxy in front. TLS termination, rate limiting,
//! slow-client protection and body-size limits are proxy jobs, already
//! solved there at scale — plinth does not duplicate them. What's left is
//! the part that actually changes between applications:
//!
//! - Radix-tree routing — O(path-length) lookup via [`matchit`]
//! - Middleware — access logs, basic auth, session auth, or your own
//! - Signed, expiring session tokens — HMAC-SHA256, no server-side state
//! - An in-memory TTL cache with passive and background expiry
//! - Graceful shutdown — SIGTERM / Ctrl-C, drains in-flight requests
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use plinth::{Method, Request, Response, Router, Server, Status};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .on(Method::Get,  "/users/{id}", get_user)
//!         .on(Method::Post, "/users",      create_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(Status::BadRequest);
//!     }
//!     Response::builder()
//!         .status(Status::Created)
//!         .header("location", "/users/99")
//!         .json(br#"{"id":99}"#.to_vec())
//! }
//! ```
//!
//! ## Sessions and caching
//!
//! [`TokenCodec`] mints and verifies stateless session tokens; the
//! [`middleware::SessionAuth`] middleware gates routes on them. [`Cache`]
//! holds short-lived lookups with per-entry TTLs and an optional background
//! sweep. See `demos/basic.rs` for both wired into a running service.

mod cache;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;
mod token;

pub mod health;
pub mod middleware;

pub use cache::{Cache, CancelSweep};
pub use error::{Error, HttpError};
pub use handler::Handler;
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use status::Status;
pub use token::{Clock, DecodeError, SystemClock, TOKEN_LEN, TokenCodec};
