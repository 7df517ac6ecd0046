//! End-to-end dispatch tests: routing, middleware chains, sessions, error
//! translation and file serving, all driven through `Router::handle` — the
//! same entry point the server uses, minus the socket.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use plinth::middleware::{self, BasicAuth, Middleware, Next, SessionAuth};
use plinth::{HttpError, Method, Request, Response, Router, Status, TokenCodec};

/// Middleware that records its name before passing the request on.
fn recorder(log: Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> impl Middleware {
    move |req: Request, next: Next| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(name);
            next.run(req).await
        }
    }
}

#[tokio::test]
async fn routes_with_params_and_body() {
    let app = Router::new()
        .on(Method::Put, "/users/{id}", |req: Request| async move {
            let id = req.param("id").unwrap().to_owned();
            let name = String::from_utf8_lossy(req.body()).into_owned();
            Response::json(format!(r#"{{"id":"{id}","name":"{name}"}}"#).into_bytes())
        });

    let res = app
        .handle(
            Request::builder(Method::Put, "/users/42")
                .body(&b"alice"[..])
                .build(),
        )
        .await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(res.body(), br#"{"id":"42","name":"alice"}"#);
    assert_eq!(res.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn middleware_runs_outermost_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .with(recorder(Arc::clone(&log), "global-1"))
        .with(recorder(Arc::clone(&log), "global-2"))
        .on_with(
            Method::Get,
            "/",
            recorder(Arc::clone(&log), "route"),
            |_req: Request| async { Response::text("done") },
        );

    let res = app.handle(Request::builder(Method::Get, "/").build()).await;
    assert_eq!(res.body(), b"done");
    assert_eq!(*log.lock().unwrap(), ["global-1", "global-2", "route"]);
}

#[tokio::test]
async fn global_middleware_covers_not_found() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .with(recorder(Arc::clone(&log), "global"))
        .not_found(|_req: Request| async { Response::status(Status::Gone) });

    let res = app
        .handle(Request::builder(Method::Get, "/nothing").build())
        .await;
    assert_eq!(res.status_code(), Status::Gone);
    assert_eq!(*log.lock().unwrap(), ["global"]);
}

#[tokio::test]
async fn basic_auth_gates_routes() {
    let app = Router::new().on_with(
        Method::Get,
        "/admin",
        BasicAuth::new("admin", "hunter2"),
        |_req: Request| async { Response::text("secret dashboard") },
    );

    let res = app
        .handle(Request::builder(Method::Get, "/admin").build())
        .await;
    assert_eq!(res.status_code(), Status::Unauthorized);
    assert_eq!(
        res.header("www-authenticate"),
        Some(r#"Basic realm="Restricted""#)
    );

    let credentials = format!("Basic {}", STANDARD.encode("admin:hunter2"));
    let res = app
        .handle(
            Request::builder(Method::Get, "/admin")
                .header("authorization", &credentials)
                .build(),
        )
        .await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(res.body(), b"secret dashboard");
}

#[tokio::test]
async fn session_flow_end_to_end() {
    let codec = Arc::new(TokenCodec::new("integration key", Duration::from_secs(60)));
    let app = Router::new().on_with(
        Method::Get,
        "/me",
        SessionAuth::new(Arc::clone(&codec)),
        |req: Request| async move { Response::text(req.session_token().unwrap().to_owned()) },
    );

    let token = codec.generate();

    // Bearer header.
    let res = app
        .handle(
            Request::builder(Method::Get, "/me")
                .header("authorization", &middleware::bearer_header(&codec, &token))
                .build(),
        )
        .await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(res.body(), token.as_bytes());

    // Cookie fallback.
    let res = app
        .handle(
            Request::builder(Method::Get, "/me")
                .header("cookie", &format!("session={}", codec.encode(&token)))
                .build(),
        )
        .await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(res.body(), token.as_bytes());

    // No token at all.
    let res = app.handle(Request::builder(Method::Get, "/me").build()).await;
    assert_eq!(res.status_code(), Status::Unauthorized);

    // Tampered wire token.
    let mut wire = codec.encode(&token);
    let flipped = if wire.starts_with('A') { "B" } else { "A" };
    wire.replace_range(..1, flipped);
    let res = app
        .handle(
            Request::builder(Method::Get, "/me")
                .header("authorization", &format!("Bearer {wire}"))
                .build(),
        )
        .await;
    assert_eq!(res.status_code(), Status::Unauthorized);
}

#[tokio::test]
async fn handler_errors_map_to_statuses() {
    let app = Router::new()
        .on(Method::Get, "/teapot", |_req: Request| async {
            Err::<Response, _>(HttpError::client(Status::ImATeapot, "short and stout"))
        })
        .on(Method::Get, "/boom", |_req: Request| async {
            Err::<Response, _>(HttpError::server("connection pool exhausted"))
        });

    // Client errors reach the client verbatim.
    let res = app
        .handle(Request::builder(Method::Get, "/teapot").build())
        .await;
    assert_eq!(res.status_code(), Status::ImATeapot);
    assert_eq!(res.body(), b"short and stout");

    // Server errors stay vague.
    let res = app
        .handle(Request::builder(Method::Get, "/boom").build())
        .await;
    assert_eq!(res.status_code(), Status::InternalServerError);
    assert!(res.body().is_empty());
}

#[tokio::test]
async fn decode_errors_convert_to_401() {
    let codec = Arc::new(TokenCodec::new("integration key", Duration::from_secs(60)));
    let handler_codec = Arc::clone(&codec);
    let app = Router::new().on(Method::Get, "/validate", move |req: Request| {
        let codec = Arc::clone(&handler_codec);
        async move {
            let wire = req.header("x-token").unwrap_or_default();
            let token = codec.decode(wire)?;
            Ok::<_, HttpError>(Response::text(token))
        }
    });

    let res = app
        .handle(
            Request::builder(Method::Get, "/validate")
                .header("x-token", "garbage")
                .build(),
        )
        .await;
    assert_eq!(res.status_code(), Status::Unauthorized);
    assert_eq!(res.body(), b"invalid or expired token");
}

#[tokio::test]
async fn serves_files_from_disk() {
    let dir = std::env::temp_dir().join(format!("plinth-dispatch-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("assets")).unwrap();
    std::fs::write(dir.join("assets").join("app.css"), "body{}").unwrap();
    std::fs::write(dir.join("robots.txt"), "User-agent: *").unwrap();

    let app = Router::new()
        .file("/robots.txt", dir.join("robots.txt"))
        .dir("/static", &dir);

    let res = app
        .handle(Request::builder(Method::Get, "/robots.txt").build())
        .await;
    assert_eq!(res.body(), b"User-agent: *");
    assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));

    let res = app
        .handle(Request::builder(Method::Get, "/static/assets/app.css").build())
        .await;
    assert_eq!(res.body(), b"body{}");
    assert_eq!(res.header("content-type"), Some("text/css; charset=utf-8"));

    // Traversal, dotfiles, directories and gone files answer 404 alike.
    for path in [
        "/static/../outside",
        "/static/.hidden",
        "/static/assets",
        "/static/missing.css",
    ] {
        let res = app.handle(Request::builder(Method::Get, path).build()).await;
        assert_eq!(res.status_code(), Status::NotFound, "path {path}");
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
#[should_panic(expected = "no such file")]
fn missing_file_panics_at_registration() {
    Router::new().file("/nope", "/definitely/not/here.txt");
}
