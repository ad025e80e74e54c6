//! SQLite database layer (embedded, no external dependencies)
//!
//! Every call checks a connection (or a transaction, for writes) out of the
//! pool and hands it back when the guard drops, on success and on error
//! alike. Writes are a single statement followed by a commit.

use anyhow::{Context, Result};
use async_trait::async_trait;
use pokedex_core::{PokedexError, Pokemon, PokemonField, PokemonStore, PokemonUpdate};
use sqlx::error::DatabaseError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

// Extended result codes for PRIMARY KEY and UNIQUE constraint failures
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_path: &Path) -> Result<Self> {
        info!("Opening SQLite database at: {}", database_path.display());

        // Create parent directory if needed
        let parent = match database_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;

        // Check if directory is writable
        let test_file = parent.join(".write_test");
        match tokio::fs::write(&test_file, b"test").await {
            Ok(_) => {
                let _ = tokio::fs::remove_file(&test_file).await;
                debug!("Database directory is writable");
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Database directory is not writable: {}: {}",
                    parent.display(),
                    e
                ));
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to SQLite database at: {}",
                    database_path.display()
                )
            })?;

        Self::run_migrations(&pool)
            .await
            .context("Failed to create pokemon table")?;

        info!("Database initialization complete");

        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pokemon (
                id INTEGER PRIMARY KEY,
                name TEXT,
                imageurl TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

fn db_error(e: sqlx::Error) -> PokedexError {
    PokedexError::Database(e.to_string())
}

fn is_duplicate_key(e: &dyn DatabaseError) -> bool {
    e.is_unique_violation()
        || matches!(
            e.code().as_deref(),
            Some(SQLITE_CONSTRAINT_PRIMARYKEY) | Some(SQLITE_CONSTRAINT_UNIQUE)
        )
}

#[async_trait]
impl PokemonStore for Database {
    async fn count(&self) -> pokedex_core::Result<u64> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pokemon")
            .fetch_one(&mut *conn)
            .await
            .map_err(db_error)?;

        Ok(count as u64)
    }

    async fn list_all(&self) -> pokedex_core::Result<Vec<Pokemon>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;

        let rows: Vec<PokemonRow> = sqlx::query_as(
            r#"
            SELECT id, name, imageurl FROM pokemon ORDER BY id
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn get_by_id(&self, id: i64) -> pokedex_core::Result<Option<Pokemon>> {
        debug!("Looking up pokemon {}", id);
        let mut conn = self.pool.acquire().await.map_err(db_error)?;

        let row: Option<PokemonRow> = sqlx::query_as(
            r#"
            SELECT id, name, imageurl FROM pokemon WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, pokemon: Pokemon) -> pokedex_core::Result<Pokemon> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query(
            r#"
            INSERT INTO pokemon (id, name, imageurl)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(pokemon.id)
        .bind(&pokemon.name)
        .bind(&pokemon.imageurl)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if is_duplicate_key(e.as_ref()) => {
                return Err(PokedexError::DuplicateKey(pokemon.id));
            }
            Err(e) => return Err(db_error(e)),
        }

        tx.commit().await.map_err(db_error)?;

        info!("Created pokemon {} ({})", pokemon.id, pokemon.name);
        Ok(pokemon)
    }

    async fn replace(&self, id: i64, update: PokemonUpdate) -> pokedex_core::Result<Pokemon> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: Option<PokemonRow> = sqlx::query_as(
            r#"
            UPDATE pokemon SET name = ?1, imageurl = ?2
            WHERE id = ?3
            RETURNING id, name, imageurl
            "#,
        )
        .bind(&update.name)
        .bind(&update.imageurl)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let row = row.ok_or(PokedexError::NotFound(id))?;
        tx.commit().await.map_err(db_error)?;

        info!("Replaced pokemon {}", id);
        Ok(row.into())
    }

    async fn patch_field(
        &self,
        id: i64,
        field: PokemonField,
        value: String,
    ) -> pokedex_core::Result<String> {
        // Column names come from the closed PokemonField enum
        let sql = format!(
            "UPDATE pokemon SET {column} = ?1 WHERE id = ?2 RETURNING {column}",
            column = field.column()
        );

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: Option<(Option<String>,)> = sqlx::query_as(&sql)
            .bind(&value)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

        let (stored,) = row.ok_or(PokedexError::NotFound(id))?;
        tx.commit().await.map_err(db_error)?;

        info!("Patched {} of pokemon {}", field, id);
        Ok(stored.unwrap_or(value))
    }

    async fn delete(&self, id: i64) -> pokedex_core::Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query(
            r#"
            DELETE FROM pokemon WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(PokedexError::NotFound(id));
        }
        tx.commit().await.map_err(db_error)?;

        info!("Deleted pokemon {}", id);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

// Helper struct for sqlx query_as
#[derive(sqlx::FromRow)]
struct PokemonRow {
    id: i64,
    name: Option<String>,
    imageurl: Option<String>,
}

impl From<PokemonRow> for Pokemon {
    fn from(r: PokemonRow) -> Self {
        Pokemon {
            id: r.id,
            name: r.name.unwrap_or_default(),
            imageurl: r.imageurl.unwrap_or_default(),
        }
    }
}
