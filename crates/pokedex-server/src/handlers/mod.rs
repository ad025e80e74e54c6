//! HTTP handlers

pub mod error;
pub mod health;
pub mod pokemon;

pub use error::ApiError;
pub use health::health;
