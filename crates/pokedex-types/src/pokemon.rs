//! Pokemon record types

use serde::{Deserialize, Serialize};

/// A single Pokedex record.
///
/// `id` is supplied by the caller and acts as the primary key. The field
/// names match both the CSV header and the SQL columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: i64,
    pub name: String,
    pub imageurl: String,
}

impl Pokemon {
    pub fn new(id: i64, name: impl Into<String>, imageurl: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            imageurl: imageurl.into(),
        }
    }

    /// Overwrite a single field with `value`
    pub fn set_field(&mut self, field: PokemonField, value: String) {
        match field {
            PokemonField::Name => self.name = value,
            PokemonField::ImageUrl => self.imageurl = value,
        }
    }

    /// Overwrite every mutable field from an update body
    pub fn apply(&mut self, update: PokemonUpdate) {
        self.name = update.name;
        self.imageurl = update.imageurl;
    }
}

/// Full replacement body for an existing record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonUpdate {
    pub name: String,
    pub imageurl: String,
}

/// Fields that can be patched individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PokemonField {
    Name,
    #[serde(rename = "imageurl")]
    ImageUrl,
}

impl PokemonField {
    /// Column name in both the CSV header and the SQL table
    pub fn column(&self) -> &'static str {
        match self {
            PokemonField::Name => "name",
            PokemonField::ImageUrl => "imageurl",
        }
    }
}

impl std::fmt::Display for PokemonField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}
