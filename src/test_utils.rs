//! Helpers shared by the endpoint, client and view tests.

use std::net::SocketAddr;

use axum::Router;
use axum_test::TestServer;
use rusqlite::Connection;
use time::Date;
use tokio::net::TcpListener;

use crate::{
    AppState, Compte, ComptePayload, CompteClient, TypeCompte, build_router,
    compte::{ComptesState, create_compte},
};

fn must_create_app_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("could not create in-memory SQLite database");

    AppState::new(connection).expect("could not initialize test DB")
}

/// A test server over a fresh in-memory database, plus the state to seed it with.
#[track_caller]
pub(crate) fn new_test_server() -> (TestServer, ComptesState) {
    let state = must_create_app_state();
    let comptes_state = ComptesState {
        db_connection: state.db_connection.clone(),
    };
    let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

    (server, comptes_state)
}

/// Serve `router` on an ephemeral local port and return its address.
pub(crate) async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("could not bind test listener");
    let addr = listener
        .local_addr()
        .expect("could not get test listener address");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("test server failed");
    });

    addr
}

/// Serve the app on an ephemeral local port and return a client pointed at it.
pub(crate) async fn spawn_app() -> (CompteClient, ComptesState) {
    let state = must_create_app_state();
    let comptes_state = ComptesState {
        db_connection: state.db_connection.clone(),
    };

    let addr = spawn_router(build_router(state)).await;
    let client =
        CompteClient::new(&format!("http://{addr}/")).expect("could not create test client");

    (client, comptes_state)
}

#[track_caller]
pub(crate) fn must_insert_compte(
    state: &ComptesState,
    solde: f64,
    date_creation: Date,
    type_compte: TypeCompte,
) -> Compte {
    create_compte(
        &ComptePayload {
            id: None,
            solde,
            date_creation,
            type_compte,
        },
        &state.connection().expect("could not lock test DB"),
    )
    .expect("could not create test account")
}
