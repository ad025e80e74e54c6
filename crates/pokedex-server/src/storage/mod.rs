//! Storage layer
//!
//! Two interchangeable backends behind `PokemonStore`: a CSV file held in
//! memory (`TableStore`) and an embedded SQLite table (`Database`).

pub mod db;
pub mod table;

pub use db::Database;
pub use table::TableStore;

use crate::config::{Backend, ServerConfig};
use anyhow::Result;
use pokedex_core::PokemonStore;
use std::sync::Arc;
use tracing::info;

/// Open whichever backend the configuration selects
pub async fn open_store(config: &ServerConfig) -> Result<Arc<dyn PokemonStore>> {
    let store: Arc<dyn PokemonStore> = match config.backend {
        Backend::Csv => Arc::new(TableStore::open(config.csv_path()).await),
        Backend::Sqlite => Arc::new(Database::new(&config.database_path()).await?),
    };
    info!("Using {} backend", store.backend_name());
    Ok(store)
}
