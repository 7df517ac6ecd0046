//! HTTP Basic authentication.
//!
//! See <https://developer.mozilla.org/en-US/docs/Web/HTTP/Authentication>.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// Guards routes behind a single username/password pair.
///
/// Both sides of the comparison are SHA-256 digests, so the constant-time
/// compare always runs over fixed-length inputs and leaks neither content
/// nor length. Failures answer `401` with a `www-authenticate` challenge.
///
/// ```rust
/// use plinth::middleware::BasicAuth;
/// use plinth::{Method, Request, Response, Router};
///
/// # async fn admin(_req: Request) -> Response { Response::text("ok") }
/// let app = Router::new().on_with(
///     Method::Get,
///     "/admin",
///     BasicAuth::new("admin", "hunter2"),
///     admin,
/// );
/// ```
pub struct BasicAuth {
    user: [u8; 32],
    pass: [u8; 32],
}

impl BasicAuth {
    pub fn new(user: &str, pass: &str) -> Self {
        Self {
            user: Sha256::digest(user).into(),
            pass: Sha256::digest(pass).into(),
        }
    }

    fn verify(&self, header: Option<&str>) -> bool {
        let Some(value) = header.and_then(|h| h.strip_prefix("Basic ")) else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(value.trim()) else {
            return false;
        };
        let Ok(credentials) = String::from_utf8(decoded) else {
            return false;
        };
        let Some((user, pass)) = credentials.split_once(':') else {
            return false;
        };

        let user: [u8; 32] = Sha256::digest(user).into();
        let pass: [u8; 32] = Sha256::digest(pass).into();
        bool::from(user.ct_eq(&self.user) & pass.ct_eq(&self.pass))
    }
}

impl Middleware for BasicAuth {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        if self.verify(req.header("authorization")) {
            Box::pin(next.run(req))
        } else {
            Box::pin(async {
                Response::builder()
                    .status(Status::Unauthorized)
                    .header("www-authenticate", r#"Basic realm="Restricted""#)
                    .text("401 unauthorized")
            })
        }
    }
}
