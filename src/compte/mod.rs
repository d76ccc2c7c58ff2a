mod core;
mod create_endpoint;
mod delete_endpoint;
mod get_endpoint;
mod list_endpoint;
mod update_endpoint;

pub use self::core::{
    Compte, CompteId, ComptePayload, ComptesState, TypeCompte, UnknownTypeCompte,
    create_compte_table, get_compte, map_row_to_compte,
};
#[cfg(test)]
pub use create_endpoint::create_compte;
pub use create_endpoint::create_compte_endpoint;
pub use delete_endpoint::delete_compte_endpoint;
pub use get_endpoint::get_compte_endpoint;
pub use list_endpoint::list_comptes_endpoint;
pub use update_endpoint::update_compte_endpoint;
