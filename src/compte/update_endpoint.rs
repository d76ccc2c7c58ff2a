//! Defines the endpoint for replacing an account.
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use rusqlite::{Connection, params};

use crate::{
    Error,
    compte::{Compte, CompteId, ComptesState},
    format::{AcceptFormat, CompteBody},
};

/// A route handler that replaces every field of the account `compte_id`.
///
/// Responds with the updated account, or 404 if the account does not exist.
/// The body may omit the ID, but if it has one it must match `compte_id`.
pub async fn update_compte_endpoint(
    State(state): State<ComptesState>,
    Path(compte_id): Path<CompteId>,
    AcceptFormat(format): AcceptFormat,
    CompteBody(payload): CompteBody,
) -> Result<Response, Error> {
    if let Some(body_id) = payload.id.filter(|&body_id| body_id != compte_id) {
        return Err(Error::IdMismatch {
            path: compte_id,
            body: body_id,
        });
    }

    let compte = payload.into_compte(compte_id);

    match update_compte(&compte, &*state.connection()?) {
        Ok(0) => return Err(Error::NotFound),
        Ok(_) => {}
        Err(error) => {
            tracing::error!("Could not update account {compte_id}: {error}");
            return Err(error);
        }
    }

    let body = format
        .encode_compte(&compte)
        .map_err(|error| Error::EncodingError(error.to_string()))?;

    Ok(format.respond(StatusCode::OK, body))
}

type RowsAffected = usize;

fn update_compte(compte: &Compte, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE compte
        SET \
            solde = ?1, \
            date_creation = ?2, \
            type = ?3 \
        WHERE id = ?4;",
            params![
                compte.solde,
                compte.date_creation,
                compte.type_compte,
                compte.id,
            ],
        )
        .map_err(Error::from)
}
