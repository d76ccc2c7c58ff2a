//! Defines the endpoint for creating a new account.

use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
};
use rusqlite::{Connection, params};

use crate::{
    Error,
    compte::{Compte, ComptePayload, ComptesState},
    format::{AcceptFormat, CompteBody},
};

/// A route handler for creating a new account, responds with the created account.
///
/// The database assigns the new account's ID, any ID in the body is ignored.
pub async fn create_compte_endpoint(
    State(state): State<ComptesState>,
    AcceptFormat(format): AcceptFormat,
    CompteBody(payload): CompteBody,
) -> Result<Response, Error> {
    let compte = create_compte(&payload, &*state.connection()?).inspect_err(|error| {
        tracing::error!("Could not create account: {error}");
    })?;

    tracing::info!("Created account {}", compte.id);

    let body = format
        .encode_compte(&compte)
        .map_err(|error| Error::EncodingError(error.to_string()))?;

    Ok(format.respond(StatusCode::CREATED, body))
}

/// Insert a new account built from `payload` and return it with its new ID.
///
/// # Errors
/// Returns [Error::SqlError] if the insert fails.
pub fn create_compte(payload: &ComptePayload, connection: &Connection) -> Result<Compte, Error> {
    connection.execute(
        "INSERT INTO compte (solde, date_creation, type) VALUES (?1, ?2, ?3)",
        params![payload.solde, payload.date_creation, payload.type_compte],
    )?;

    let id = connection.last_insert_rowid();

    Ok(payload.clone().into_compte(id))
}
