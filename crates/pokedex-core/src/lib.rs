//! Pokedex Core Library
//!
//! Domain errors and the storage port shared by every backend.

// Re-export pure types from pokedex-types
pub use pokedex_types::*;

pub mod error;
pub mod ports;

pub use error::{PokedexError, Result};
pub use ports::PokemonStore;
