//! Defines the endpoint for deleting an account.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    Error,
    compte::{CompteId, ComptesState},
};

/// A route handler for deleting an account, responds with an empty body.
///
/// # Errors
///
/// Responds with 404 if the account does not exist.
pub async fn delete_compte_endpoint(
    State(state): State<ComptesState>,
    Path(compte_id): Path<CompteId>,
) -> Result<StatusCode, Error> {
    match delete_compte(compte_id, &*state.connection()?) {
        Ok(rows_affected) if rows_affected != 0 => {
            tracing::info!("Deleted account {compte_id}");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(_) => Err(Error::NotFound),
        Err(error) => {
            tracing::error!("Could not delete account {compte_id}: {error}");
            Err(error)
        }
    }
}

type RowsAffected = usize;

fn delete_compte(id: CompteId, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute("DELETE FROM compte WHERE id = :id", &[(":id", &id)])
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Compte, Error, TypeCompte,
        compte::{ComptePayload, create_compte, get_compte},
        endpoints::{self, format_endpoint},
        initialize_db,
        test_utils::{must_insert_compte, new_test_server},
    };

    use super::delete_compte;

    #[test]
    fn deletes_account() {
        let connection = Connection::open_in_memory().unwrap();
        initialize_db(&connection).unwrap();
        let compte = create_compte(
            &ComptePayload {
                id: None,
                solde: 420.69,
                date_creation: date!(2025 - 11 - 01),
                type_compte: TypeCompte::Courant,
            },
            &connection,
        )
        .unwrap();

        let rows_affected = delete_compte(compte.id, &connection).unwrap();

        assert_eq!(rows_affected, 1);
        assert_eq!(get_compte(compte.id, &connection), Err(Error::NotFound));
    }

    #[tokio::test]
    async fn delete_then_list_excludes_account() {
        let (server, state) = new_test_server();
        let kept = must_insert_compte(&state, 1.0, date!(2024 - 01 - 01), TypeCompte::Courant);
        let deleted = must_insert_compte(&state, 2.0, date!(2024 - 01 - 02), TypeCompte::Epargne);

        let response = server
            .delete(&format_endpoint(endpoints::COMPTE, deleted.id))
            .await;

        response.assert_status(StatusCode::NO_CONTENT);
        assert!(response.text().is_empty());
        let comptes = server.get(endpoints::COMPTES).await.json::<Vec<Compte>>();
        assert_eq!(comptes, vec![kept]);
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let (server, _) = new_test_server();

        let response = server.delete(&format_endpoint(endpoints::COMPTE, 3)).await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}
