//! Pokedex Types - Pure type definitions
//!
//! Plain serde data types with no async runtime dependencies, shared by the
//! storage port and the HTTP layer.

pub mod api;
pub mod pokemon;

pub use api::*;
pub use pokemon::*;
