//! Storage trait for Pokemon persistence

use crate::Result;
use async_trait::async_trait;
use pokedex_types::{Pokemon, PokemonField, PokemonUpdate};

/// Pokemon store
///
/// Implemented by the CSV-backed table store and the SQLite store. Both
/// report a missing `id` as [`PokedexError::NotFound`] and an occupied `id`
/// on create as [`PokedexError::DuplicateKey`], leaving their data untouched
/// in either case.
///
/// [`PokedexError::NotFound`]: crate::PokedexError::NotFound
/// [`PokedexError::DuplicateKey`]: crate::PokedexError::DuplicateKey
#[async_trait]
pub trait PokemonStore: Send + Sync {
    async fn count(&self) -> Result<u64>;
    async fn list_all(&self) -> Result<Vec<Pokemon>>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Pokemon>>;
    async fn create(&self, pokemon: Pokemon) -> Result<Pokemon>;
    async fn replace(&self, id: i64, update: PokemonUpdate) -> Result<Pokemon>;
    async fn patch_field(&self, id: i64, field: PokemonField, value: String) -> Result<String>;
    async fn delete(&self, id: i64) -> Result<()>;

    /// Short backend label for logs and health checks
    fn backend_name(&self) -> &'static str;
}
