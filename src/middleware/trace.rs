//! Per-request access logging through `tracing`.

use std::time::Instant;

use tracing::info;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

/// Logs one event per request: method, path, status, latency and response
/// size.
///
/// Events go out at `info` level; the host picks the subscriber and format.
///
/// ```rust
/// use plinth::Router;
/// use plinth::middleware::Trace;
///
/// let app = Router::new().with(Trace);
/// ```
pub struct Trace;

impl Middleware for Trace {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin(async move {
            let method = req.method();
            let path = req.path().to_owned();
            let start = Instant::now();

            let res = next.run(req).await;

            info!(
                %method,
                path,
                status = res.status_code().code(),
                bytes = res.body().len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "request"
            );
            res
        })
    }
}
