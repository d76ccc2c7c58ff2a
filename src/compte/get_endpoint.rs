//! Defines the endpoint for fetching a single account.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};

use crate::{
    Error,
    compte::{CompteId, ComptesState, get_compte},
    format::AcceptFormat,
};

/// A route handler that responds with the account `compte_id`, or 404 if it does not exist.
pub async fn get_compte_endpoint(
    State(state): State<ComptesState>,
    Path(compte_id): Path<CompteId>,
    AcceptFormat(format): AcceptFormat,
) -> Result<Response, Error> {
    let compte = get_compte(compte_id, &*state.connection()?)?;

    let body = format
        .encode_compte(&compte)
        .map_err(|error| Error::EncodingError(error.to_string()))?;

    Ok(format.respond(StatusCode::OK, body))
}
