//! Error types for the Pokedex service

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PokedexError>;

#[derive(Error, Debug)]
pub enum PokedexError {
    #[error("Pokemon not found: {0}")]
    NotFound(i64),

    #[error("Pokemon already exists: {0}")]
    DuplicateKey(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),
}
