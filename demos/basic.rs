//! Sessions, caching and middleware wired into a running service.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -X POST http://localhost:3000/login -d 'hunter2'
//!   curl http://localhost:3000/me -H 'authorization: Bearer <wire>'
//!   curl http://localhost:3000/weather/stockholm
//!   curl http://localhost:3000/healthz

use std::sync::Arc;
use std::time::Duration;

use plinth::middleware::{self, SessionAuth, Trace};
use plinth::{Cache, Method, Request, Response, Router, Server, Status, TokenCodec, health};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // One process-wide codec. Real deployments read the key from secrets,
    // not source.
    let codec = Arc::new(TokenCodec::new(
        "not so secret key",
        Duration::from_secs(3600),
    ));
    let cache = Arc::new(Cache::new(0));
    let _sweep = cache.start_gc(Duration::from_secs(10));

    let login_codec = Arc::clone(&codec);
    let weather_cache = Arc::clone(&cache);

    let app = Router::new()
        .with(Trace)
        .on(Method::Post, "/login", move |req: Request| {
            let codec = Arc::clone(&login_codec);
            async move { login(req, &codec) }
        })
        .on_with(Method::Get, "/me", SessionAuth::new(Arc::clone(&codec)), me)
        .on(Method::Get, "/weather/{city}", move |req: Request| {
            let cache = Arc::clone(&weather_cache);
            async move { weather(req, &cache) }
        })
        .on(Method::Get, "/healthz", health::liveness)
        .on(Method::Get, "/readyz", health::readiness);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// POST /login — exchange the demo password for a session token, issued both
// as a cookie and as a bearer header value in the body.
fn login(req: Request, codec: &TokenCodec) -> Response {
    if req.body() != b"hunter2" {
        return Response::status(Status::Unauthorized);
    }
    let token = codec.generate();
    Response::builder()
        .status(Status::Created)
        .header("set-cookie", &middleware::session_cookie(codec, &token))
        .text(middleware::bearer_header(codec, &token))
}

// GET /me — only reachable through SessionAuth.
async fn me(req: Request) -> Response {
    match req.session_token() {
        Some(token) => Response::text(format!("authenticated session {}…", &token[..8])),
        None => Response::status(Status::InternalServerError),
    }
}

// GET /weather/{city} — an expensive lookup cached for 60 seconds.
fn weather(req: Request, cache: &Cache) -> Response {
    let city = req.param("city").unwrap_or("nowhere").to_owned();
    if let Some(cached) = cache.get(&city) {
        return Response::text(cached);
    }
    let report = format!("{city}: sunny, 21°C");
    cache.set(city, report.as_str(), 60);
    Response::text(report)
}
