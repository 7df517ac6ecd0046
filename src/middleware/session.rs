//! Session-token transport over the [`TokenCodec`]: issuing tokens through
//! headers or cookies and authenticating requests that carry them.

use std::sync::Arc;

use tracing::debug;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::token::{DecodeError, TokenCodec};

/// Name of the session cookie consulted when no bearer header is present.
pub const SESSION_COOKIE: &str = "session";

/// Extracts and decodes the session token carried by `req`.
///
/// Tries the `Authorization: Bearer <wire>` header first and falls back to
/// the `session` cookie. A request carrying neither fails the same way a
/// bad token does.
pub fn session_token(codec: &TokenCodec, req: &Request) -> Result<String, DecodeError> {
    if let Some(bearer) = req
        .header("authorization")
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        return codec.decode(bearer.trim());
    }
    match req.cookie(SESSION_COOKIE) {
        Some(wire) => codec.decode(wire),
        None => Err(DecodeError::missing()),
    }
}

/// `authorization` header value carrying a freshly encoded `token`.
pub fn bearer_header(codec: &TokenCodec, token: &str) -> String {
    format!("Bearer {}", codec.encode(token))
}

/// `set-cookie` header value carrying a freshly encoded `token`.
///
/// `HttpOnly` and `SameSite=Strict`, with `Max-Age` matching the codec TTL.
/// Append `; Secure` yourself when serving https.
pub fn session_cookie(codec: &TokenCodec, token: &str) -> String {
    format!(
        "{}={}; Max-Age={}; HttpOnly; SameSite=Strict",
        SESSION_COOKIE,
        codec.encode(token),
        codec.ttl().as_secs()
    )
}

/// Rejects requests that do not carry a valid session token.
///
/// On success the decoded inner token is stashed on the request;
/// handlers read it back with
/// [`Request::session_token`](crate::Request::session_token). On failure
/// the client gets a uniform `401 Unauthorized`, whatever actually went
/// wrong; the cause only reaches the server log.
pub struct SessionAuth {
    codec: Arc<TokenCodec>,
}

impl SessionAuth {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

impl Middleware for SessionAuth {
    fn handle(&self, mut req: Request, next: Next) -> BoxFuture {
        match session_token(&self.codec, &req) {
            Ok(token) => {
                req.set_session_token(token);
                Box::pin(next.run(req))
            }
            Err(err) => Box::pin(async move {
                debug!(error = ?err, "session auth rejected");
                Response::builder()
                    .status(Status::Unauthorized)
                    .text("401 unauthorized")
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::method::Method;

    fn codec() -> TokenCodec {
        TokenCodec::new("super secret key", Duration::from_secs(60))
    }

    #[test]
    fn bearer_header_round_trips() {
        let codec = codec();
        let token = codec.generate();

        let header = bearer_header(&codec, &token);
        let req = Request::builder(Method::Get, "/")
            .header("authorization", &header)
            .build();
        assert_eq!(session_token(&codec, &req).unwrap(), token);
    }

    #[test]
    fn cookie_fallback_round_trips() {
        let codec = codec();
        let token = codec.generate();

        let cookie = session_cookie(&codec, &token);
        let wire = cookie
            .strip_prefix("session=")
            .unwrap()
            .split(';')
            .next()
            .unwrap();
        let req = Request::builder(Method::Get, "/")
            .header("cookie", &format!("session={wire}"))
            .build();
        assert_eq!(session_token(&codec, &req).unwrap(), token);
    }

    #[test]
    fn header_wins_over_cookie() {
        let codec = codec();
        let token = codec.generate();

        // Valid header, garbage cookie: the header must be used.
        let req = Request::builder(Method::Get, "/")
            .header("authorization", &bearer_header(&codec, &token))
            .header("cookie", "session=garbage")
            .build();
        assert_eq!(session_token(&codec, &req).unwrap(), token);

        // Garbage header: no cookie fallback once a bearer is present.
        let req = Request::builder(Method::Get, "/")
            .header("authorization", "Bearer garbage")
            .header("cookie", &format!("session={}", codec.encode(&token)))
            .build();
        assert!(session_token(&codec, &req).is_err());
    }

    #[test]
    fn missing_token_is_an_error() {
        let req = Request::builder(Method::Get, "/").build();
        assert!(session_token(&codec(), &req).is_err());
    }
}
