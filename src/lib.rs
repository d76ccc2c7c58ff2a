//! Banque is a small bank account service and the client that drives it.
//!
//! This library provides:
//! - the account record ([Compte]) and its JSON and XML wire encodings,
//! - a REST API over the `banque/comptes` collection backed by SQLite,
//! - an HTTP client ([CompteClient]) and the list screen state
//!   ([ComptesView]) that consumes that API.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod app_state;
mod client;
mod compte;
mod db;
pub mod endpoints;
mod format;
mod logging;
mod routing;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use client::{
    ActionOutcome, ClientError, CompteClient, ComptesView, Notification, RefreshOutcome,
    RefreshTicket, RequestConfig,
};
pub use compte::{Compte, CompteId, ComptePayload, TypeCompte, UnknownTypeCompte};
pub use db::initialize as initialize_db;
pub use format::{CodecError, Format};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur while serving the `banque/comptes` API.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested account was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested account could not be found")]
    NotFound,

    /// The `Accept` header did not name a format the server can produce.
    #[error("none of the accepted media types \"{0}\" can be produced")]
    NotAcceptable(String),

    /// The request body was sent with a `Content-Type` the server cannot read.
    ///
    /// An empty string means the header was missing.
    #[error("unsupported content type \"{0}\"")]
    UnsupportedMediaType(String),

    /// The request body could not be decoded as an account.
    #[error("could not decode the request body: {0}")]
    InvalidBody(String),

    /// The account ID in the request body differs from the one in the path.
    #[error("the account ID in the body ({body}) does not match the path ({path})")]
    IdMismatch {
        /// The ID taken from the request path.
        path: CompteId,
        /// The ID taken from the request body.
        body: CompteId,
    },

    /// A response body could not be encoded.
    #[error("could not encode the response body: {0}")]
    EncodingError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Error::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::InvalidBody(_) | Error::IdMismatch { .. } => StatusCode::BAD_REQUEST,
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details.",
                )
                    .into_response();
            }
        };

        (status, self.to_string()).into_response()
    }
}
