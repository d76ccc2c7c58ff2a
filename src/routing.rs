//! Application router configuration.

use axum::{
    Router,
    http::StatusCode,
    routing::get,
};

use crate::{
    AppState,
    compte::{
        create_compte_endpoint, delete_compte_endpoint, get_compte_endpoint,
        list_comptes_endpoint, update_compte_endpoint,
    },
    endpoints,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::COMPTES,
            get(list_comptes_endpoint).post(create_compte_endpoint),
        )
        .route(
            endpoints::COMPTE,
            get(get_compte_endpoint)
                .put(update_compte_endpoint)
                .delete(delete_compte_endpoint),
        )
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "no such resource")
}
