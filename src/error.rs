//! Error types: infrastructure failures and handler-level HTTP errors.

use thiserror::Error;
use tracing::error;

use crate::response::{IntoResponse, Response};
use crate::status::Status;
use crate::token::DecodeError;

/// The error type returned by plinth's fallible infrastructure operations:
/// binding a port, accepting a connection.
///
/// Application-level failures never take this shape: handlers express them
/// as [`HttpError`] or as plain [`Response`] values.
#[derive(Debug, Error)]
#[error("io: {0}")]
pub struct Error(#[from] std::io::Error);

/// An error a handler can return, tagged with who was at fault.
///
/// Dispatch translates it by matching on the kind:
///
/// - [`Client`](HttpError::Client) — the status and message are sent back
///   verbatim and nothing is logged.
/// - [`Server`](HttpError::Server) — the client gets a bare
///   `500 Internal Server Error`; the message stays in the server log.
///
/// ```rust
/// use plinth::{HttpError, Request, Response, Status};
///
/// async fn get_user(req: Request) -> Result<Response, HttpError> {
///     let id = req
///         .param("id")
///         .ok_or_else(|| HttpError::client(Status::BadRequest, "missing id"))?;
///     Ok(Response::text(format!("user {id}")))
/// }
/// ```
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request was at fault. Status and message go to the client
    /// unaltered.
    #[error("{message}")]
    Client { status: Status, message: String },

    /// The server was at fault. Details are logged, never sent.
    #[error("{message}")]
    Server { message: String },
}

impl HttpError {
    /// A client-kind error answering with `status` and `message`.
    pub fn client(status: Status, message: impl Into<String>) -> Self {
        Self::Client {
            status,
            message: message.into(),
        }
    }

    /// A server-kind error answering with a plain 500.
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }
}

/// A failed token decode is the client's problem: uniform 401, no detail.
impl From<DecodeError> for HttpError {
    fn from(err: DecodeError) -> Self {
        Self::client(Status::Unauthorized, err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self {
            Self::Client { status, message } => {
                Response::builder().status(status).text(message)
            }
            Self::Server { message } => {
                error!("handler error: {message}");
                Response::status(Status::InternalServerError)
            }
        }
    }
}
