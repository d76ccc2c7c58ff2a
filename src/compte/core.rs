use std::{
    fmt::Display,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard},
};

use axum::extract::FromRef;
use rusqlite::{
    Connection,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::Date;

use crate::{AppState, Error};

/// Alias for the integer type the database assigns to accounts.
pub type CompteId = i64;

time::serde::format_description!(date_creation_format, Date, "[year]-[month]-[day]");

/// Reject balances such as `inf` or `NaN` that XML accepts but JSON and the
/// database cannot hold.
fn deserialize_finite_solde<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let solde = f64::deserialize(deserializer)?;

    if solde.is_finite() {
        Ok(solde)
    } else {
        Err(serde::de::Error::custom(format!(
            "the balance must be a finite number, got {solde}"
        )))
    }
}

/// A bank account as it is stored and sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compte {
    /// The server-assigned ID of the account.
    pub id: CompteId,
    /// The balance, always a finite number.
    #[serde(deserialize_with = "deserialize_finite_solde")]
    pub solde: f64,
    /// The date the account was opened.
    #[serde(with = "date_creation_format")]
    pub date_creation: Date,
    /// The kind of account.
    #[serde(rename = "type")]
    pub type_compte: TypeCompte,
}

/// The body of a create or update request.
///
/// Identical to [Compte] except that the ID is optional, since it is only
/// meaningful when it matches the account being replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComptePayload {
    /// The ID of the account, if the sender knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CompteId>,
    /// The balance, always a finite number.
    #[serde(deserialize_with = "deserialize_finite_solde")]
    pub solde: f64,
    /// The date the account was opened.
    #[serde(with = "date_creation_format")]
    pub date_creation: Date,
    /// The kind of account.
    #[serde(rename = "type")]
    pub type_compte: TypeCompte,
}

impl ComptePayload {
    /// Attach `id` to the payload, replacing any ID it carried.
    pub fn into_compte(self, id: CompteId) -> Compte {
        Compte {
            id,
            solde: self.solde,
            date_creation: self.date_creation,
            type_compte: self.type_compte,
        }
    }
}

impl From<Compte> for ComptePayload {
    fn from(compte: Compte) -> Self {
        Self {
            id: Some(compte.id),
            solde: compte.solde,
            date_creation: compte.date_creation,
            type_compte: compte.type_compte,
        }
    }
}

/// The kind of a bank account.
///
/// On the wire and in the database this is the upper-case variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCompte {
    /// A current (checking) account.
    Courant,
    /// A savings account.
    Epargne,
}

impl TypeCompte {
    /// Every account type, in declaration order.
    pub const ALL: [TypeCompte; 2] = [TypeCompte::Courant, TypeCompte::Epargne];

    /// The canonical string for the account type.
    pub fn as_str(self) -> &'static str {
        match self {
            TypeCompte::Courant => "COURANT",
            TypeCompte::Epargne => "EPARGNE",
        }
    }
}

impl Display for TypeCompte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string did not name any [TypeCompte].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("\"{0}\" is not an account type, expected one of COURANT, EPARGNE")]
pub struct UnknownTypeCompte(pub String);

impl FromStr for TypeCompte {
    type Err = UnknownTypeCompte;

    /// Parses the account type, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeCompte::ALL
            .into_iter()
            .find(|type_compte| type_compte.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTypeCompte(s.to_owned()))
    }
}

impl Serialize for TypeCompte {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeCompte {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;

        value.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for TypeCompte {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TypeCompte {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// The state needed by the account endpoints.
#[derive(Debug, Clone)]
pub struct ComptesState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ComptesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

impl ComptesState {
    /// Lock the database connection, logging if the lock is poisoned.
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

pub fn create_compte_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    // AUTOINCREMENT so that the IDs of deleted accounts are never handed out again.
    connection.execute(
        "CREATE TABLE IF NOT EXISTS compte (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            solde REAL NOT NULL,
            date_creation TEXT NOT NULL,
            type TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_compte(row: &rusqlite::Row) -> Result<Compte, rusqlite::Error> {
    let id = row.get(0)?;
    let solde = row.get(1)?;
    let date_creation = row.get(2)?;
    let type_compte = row.get(3)?;

    Ok(Compte {
        id,
        solde,
        date_creation,
        type_compte,
    })
}

/// Get the account with the given `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such account, or [Error::SqlError]
/// if the query fails.
pub fn get_compte(id: CompteId, connection: &Connection) -> Result<Compte, Error> {
    connection
        .query_row(
            "SELECT id, solde, date_creation, type FROM compte WHERE id = ?1",
            [id],
            map_row_to_compte,
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod create_table_tests {
    use rusqlite::Connection;

    use super::create_compte_table;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), create_compte_table(&connection));
    }
}

#[cfg(test)]
mod type_compte_tests {
    use rusqlite::Connection;

    use super::{TypeCompte, UnknownTypeCompte};

    #[test]
    fn parses_canonical_and_lower_case_names() {
        assert_eq!("EPARGNE".parse(), Ok(TypeCompte::Epargne));
        assert_eq!("courant".parse(), Ok(TypeCompte::Courant));
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(
            "BLOQUE".parse::<TypeCompte>(),
            Err(UnknownTypeCompte("BLOQUE".to_owned()))
        );
    }

    #[test]
    fn round_trips_through_sqlite() {
        let connection = Connection::open_in_memory().unwrap();

        let got: TypeCompte = connection
            .query_row("SELECT ?1", [TypeCompte::Courant], |row| row.get(0))
            .unwrap();

        assert_eq!(got, TypeCompte::Courant);
    }

    #[test]
    fn unknown_sqlite_value_is_an_error() {
        let connection = Connection::open_in_memory().unwrap();

        let got = connection.query_row("SELECT 'BLOQUE'", [], |row| row.get::<_, TypeCompte>(0));

        assert!(got.is_err());
    }
}
