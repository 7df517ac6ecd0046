//! Built-in health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | Liveness | `/healthz` | Is the process alive? |
//! | Readiness | `/readyz` | Can it serve traffic? |
//!
//! Register them on your router:
//!
//! ```rust,no_run
//! use plinth::{Method, Router, health};
//!
//! let app = Router::new()
//!     .on(Method::Get, "/healthz", health::liveness)
//!     .on(Method::Get, "/readyz", health::readiness);
//! ```
//!
//! Replace `readiness` with your own handler when traffic should be gated
//! on dependency health or a warm-up period.

use crate::{Request, Response};

/// Liveness probe handler.
///
/// Always `200 OK` with body `"ok"`: if the process answers HTTP at all, it
/// is alive. Intentionally has no dependencies.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe handler (default implementation).
///
/// Always `200 OK` with body `"ready"`.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
