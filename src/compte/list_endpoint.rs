//! Defines the endpoint for listing every account.

use axum::{extract::State, http::StatusCode, response::Response};
use rusqlite::Connection;

use crate::{
    Error,
    compte::{Compte, ComptesState, map_row_to_compte},
    format::AcceptFormat,
};

/// A route handler that responds with every account, encoded as the client asked in `Accept`.
pub async fn list_comptes_endpoint(
    State(state): State<ComptesState>,
    AcceptFormat(format): AcceptFormat,
) -> Result<Response, Error> {
    let comptes = list_comptes(&*state.connection()?)?;

    let body = format
        .encode_comptes(&comptes)
        .map_err(|error| Error::EncodingError(error.to_string()))?;

    Ok(format.respond(StatusCode::OK, body))
}

/// Get all accounts ordered by ID.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_comptes(connection: &Connection) -> Result<Vec<Compte>, Error> {
    let mut statement =
        connection.prepare("SELECT id, solde, date_creation, type FROM compte ORDER BY id")?;

    let comptes = statement
        .query_map([], map_row_to_compte)?
        .map(|maybe_compte| maybe_compte.map_err(Error::from))
        .collect();

    comptes
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use time::macros::date;

    use crate::{
        Compte, TypeCompte, endpoints,
        format::APPLICATION_XML,
        test_utils::{must_insert_compte, new_test_server},
    };

    #[tokio::test]
    async fn empty_collection_is_an_empty_list() {
        let (server, _) = new_test_server();

        let response = server.get(endpoints::COMPTES).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Vec<Compte>>(), vec![]);
    }

    #[tokio::test]
    async fn lists_accounts_in_id_order() {
        let (server, state) = new_test_server();
        let first = must_insert_compte(&state, 500.0, date!(2024 - 01 - 01), TypeCompte::Epargne);
        let second = must_insert_compte(&state, 12.0, date!(2022 - 06 - 30), TypeCompte::Courant);

        let response = server.get(endpoints::COMPTES).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Vec<Compte>>(), vec![first, second]);
    }

    #[tokio::test]
    async fn responds_with_xml_when_asked() {
        let (server, state) = new_test_server();
        must_insert_compte(&state, 500.0, date!(2024 - 01 - 01), TypeCompte::Epargne);

        let response = server
            .get(endpoints::COMPTES)
            .add_header("Accept", APPLICATION_XML)
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("content-type"), APPLICATION_XML);
        let text = response.text();
        assert!(text.starts_with("<List><item><id>1</id>"), "got {text}");
    }

    #[tokio::test]
    async fn prefers_format_with_higher_quality() {
        let (server, state) = new_test_server();
        must_insert_compte(&state, 500.0, date!(2024 - 01 - 01), TypeCompte::Epargne);

        let response = server
            .get(endpoints::COMPTES)
            .add_header("Accept", "application/json;q=0.1, application/xml")
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("content-type"), APPLICATION_XML);
    }

    #[tokio::test]
    async fn unsupported_accept_is_not_acceptable() {
        let (server, _) = new_test_server();

        let response = server
            .get(endpoints::COMPTES)
            .add_header("Accept", "text/html")
            .await;

        response.assert_status(StatusCode::NOT_ACCEPTABLE);
    }
}
