//! CSV-backed table store
//!
//! The whole table is held in memory in insertion order and rewritten to
//! disk after every mutation. There is no append log and no atomic rename,
//! so a crash in the middle of a write can leave a truncated file behind.

use async_trait::async_trait;
use pokedex_core::{
    PokedexError, Pokemon, PokemonField, PokemonStore, PokemonUpdate, Result,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const HEADER: [&str; 3] = ["id", "name", "imageurl"];

/// In-memory table persisted to a CSV file
pub struct TableStore {
    path: PathBuf,
    // Writers hold the lock across the file rewrite, so mutations are
    // serialized and the file always matches the published table.
    rows: RwLock<Vec<Pokemon>>,
}

impl TableStore {
    /// Load the table from `path`.
    ///
    /// A missing or unparseable file yields an empty table. Nothing is
    /// written until the first mutation.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let rows = match tokio::fs::read(&path).await {
            Ok(bytes) => match decode(&bytes) {
                Ok(rows) => {
                    info!("Loaded {} pokemon from {}", rows.len(), path.display());
                    rows
                }
                Err(e) => {
                    warn!(
                        "Cannot parse {}, starting with an empty table: {}",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No table at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "Cannot read {}, starting with an empty table: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        Self {
            path,
            rows: RwLock::new(rows),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against a working copy, write the copy out, then publish it.
    ///
    /// If `f` or the write fails the published table is left as it was.
    async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Pokemon>) -> Result<T> + Send,
        T: Send,
    {
        let mut rows = self.rows.write().await;
        let mut next = rows.clone();
        let out = f(&mut next)?;
        self.persist(&next).await?;
        *rows = next;
        Ok(out)
    }

    async fn persist(&self, rows: &[Pokemon]) -> Result<()> {
        let bytes = encode(rows)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(&self.path, bytes).await?;
        debug!("Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> PokedexError {
    PokedexError::Csv(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<Vec<Pokemon>> {
    let mut reader = csv::ReaderBuilder::new().from_reader(bytes);
    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for record in reader.deserialize::<Pokemon>() {
        let pokemon = record.map_err(csv_error)?;
        if !seen.insert(pokemon.id) {
            warn!("Dropping duplicate row for id {}", pokemon.id);
            continue;
        }
        rows.push(pokemon);
    }

    Ok(rows)
}

fn encode(rows: &[Pokemon]) -> Result<Vec<u8>> {
    // Header is written by hand so an empty table still carries its schema
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(HEADER).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| PokedexError::Csv(e.to_string()))
}

#[async_trait]
impl PokemonStore for TableStore {
    async fn count(&self) -> Result<u64> {
        Ok(self.rows.read().await.len() as u64)
    }

    async fn list_all(&self) -> Result<Vec<Pokemon>> {
        Ok(self.rows.read().await.clone())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Pokemon>> {
        debug!("Looking up pokemon {}", id);
        Ok(self.rows.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, pokemon: Pokemon) -> Result<Pokemon> {
        let id = pokemon.id;
        let created = self
            .mutate(move |rows| {
                if rows.iter().any(|p| p.id == id) {
                    return Err(PokedexError::DuplicateKey(id));
                }
                rows.push(pokemon.clone());
                Ok(pokemon)
            })
            .await?;

        info!("Created pokemon {} ({})", created.id, created.name);
        Ok(created)
    }

    async fn replace(&self, id: i64, update: PokemonUpdate) -> Result<Pokemon> {
        let updated = self
            .mutate(move |rows| {
                let row = rows
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(PokedexError::NotFound(id))?;
                row.apply(update);
                Ok(row.clone())
            })
            .await?;

        info!("Replaced pokemon {}", id);
        Ok(updated)
    }

    async fn patch_field(&self, id: i64, field: PokemonField, value: String) -> Result<String> {
        let value = self
            .mutate(move |rows| {
                let row = rows
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(PokedexError::NotFound(id))?;
                row.set_field(field, value.clone());
                Ok(value)
            })
            .await?;

        info!("Patched {} of pokemon {}", field, id);
        Ok(value)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.mutate(move |rows| {
            let index = rows
                .iter()
                .position(|p| p.id == id)
                .ok_or(PokedexError::NotFound(id))?;
            rows.remove(index);
            Ok(())
        })
        .await?;

        info!("Deleted pokemon {}", id);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulbasaur() -> Pokemon {
        Pokemon::new(1, "Bulbasaur", "bulba.png")
    }

    async fn reload(store: &TableStore) -> Vec<Pokemon> {
        TableStore::open(store.path()).await.list_all().await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pokemon.csv");
        let store = TableStore::open(&path).await;

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unreadable_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pokemon.csv");
        std::fs::write(&path, "id,name,imageurl\nnot-a-number,Mew,mew.png\n").unwrap();

        let store = TableStore::open(&path).await;
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("pokemon.csv")).await;

        let created = store.create(bulbasaur()).await.unwrap();
        assert_eq!(created, bulbasaur());
        assert_eq!(store.get_by_id(1).await.unwrap(), Some(bulbasaur()));
        assert_eq!(store.get_by_id(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_create_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("pokemon.csv")).await;
        store.create(bulbasaur()).await.unwrap();

        let err = store
            .create(Pokemon::new(1, "Impostor", "ditto.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, PokedexError::DuplicateKey(1)));
        assert_eq!(store.list_all().await.unwrap(), vec![bulbasaur()]);
        assert_eq!(reload(&store).await, vec![bulbasaur()]);
    }

    #[tokio::test]
    async fn test_missing_id_mutations_fail_with_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("pokemon.csv")).await;
        store.create(bulbasaur()).await.unwrap();

        let update = PokemonUpdate {
            name: "Ghost".to_string(),
            imageurl: "ghost.png".to_string(),
        };
        assert!(matches!(
            store.replace(9, update).await,
            Err(PokedexError::NotFound(9))
        ));
        assert!(matches!(
            store
                .patch_field(9, PokemonField::Name, "Ghost".to_string())
                .await,
            Err(PokedexError::NotFound(9))
        ));
        assert!(matches!(
            store.delete(9).await,
            Err(PokedexError::NotFound(9))
        ));
        assert_eq!(store.list_all().await.unwrap(), vec![bulbasaur()]);
    }

    #[tokio::test]
    async fn test_patch_changes_only_one_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("pokemon.csv")).await;
        store.create(bulbasaur()).await.unwrap();

        let value = store
            .patch_field(1, PokemonField::Name, "Ivysaur".to_string())
            .await
            .unwrap();
        assert_eq!(value, "Ivysaur");
        assert_eq!(
            store.get_by_id(1).await.unwrap(),
            Some(Pokemon::new(1, "Ivysaur", "bulba.png"))
        );

        store
            .patch_field(1, PokemonField::ImageUrl, "ivy.png".to_string())
            .await
            .unwrap();
        assert_eq!(
            store.get_by_id(1).await.unwrap(),
            Some(Pokemon::new(1, "Ivysaur", "ivy.png"))
        );
    }

    #[tokio::test]
    async fn test_replace_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("pokemon.csv")).await;
        store.create(bulbasaur()).await.unwrap();

        let updated = store
            .replace(
                1,
                PokemonUpdate {
                    name: "Venusaur".to_string(),
                    imageurl: "venu.png".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated, Pokemon::new(1, "Venusaur", "venu.png"));

        store.delete(1).await.unwrap();
        assert_eq!(store.get_by_id(1).await.unwrap(), None);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_matches_memory_after_every_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("nested").join("pokemon.csv")).await;

        store.create(bulbasaur()).await.unwrap();
        assert_eq!(reload(&store).await, store.list_all().await.unwrap());

        store
            .create(Pokemon::new(4, "Charmander", "char, with comma.png"))
            .await
            .unwrap();
        store
            .create(Pokemon::new(7, "Squirtle", "squirt.png"))
            .await
            .unwrap();
        assert_eq!(reload(&store).await, store.list_all().await.unwrap());

        store
            .patch_field(4, PokemonField::Name, "Charmeleon".to_string())
            .await
            .unwrap();
        assert_eq!(reload(&store).await, store.list_all().await.unwrap());

        store
            .patch_field(4, PokemonField::ImageUrl, "char\"quoted\".png".to_string())
            .await
            .unwrap();
        assert_eq!(reload(&store).await, store.list_all().await.unwrap());

        let update = PokemonUpdate {
            name: "Wartortle".to_string(),
            imageurl: "wart,tortle.png".to_string(),
        };
        store.replace(7, update).await.unwrap();
        let reloaded = reload(&store).await;
        assert_eq!(reloaded, store.list_all().await.unwrap());
        assert_eq!(reloaded[2], Pokemon::new(7, "Wartortle", "wart,tortle.png"));

        store.delete(1).await.unwrap();
        let reloaded = reload(&store).await;
        assert_eq!(reloaded, store.list_all().await.unwrap());
        assert_eq!(
            reloaded.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![4, 7]
        );
        assert_eq!(store.count().await.unwrap(), reloaded.len() as u64);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pokemon.csv");
        std::fs::create_dir(&path).unwrap();
        let store = TableStore::open(&path).await;

        assert!(matches!(
            store.create(bulbasaur()).await,
            Err(PokedexError::Io(_))
        ));
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.get_by_id(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_table_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pokemon.csv");
        let store = TableStore::open(&path).await;

        store.create(bulbasaur()).await.unwrap();
        store.delete(1).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), "id,name,imageurl");
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(TableStore::open(dir.path().join("pokemon.csv")).await);

        let handles: Vec<_> = (1..=20)
            .map(|id| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create(Pokemon::new(id, format!("mon-{}", id), "x.png"))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 20);
        assert_eq!(reload(&store).await.len(), 20);
    }
}
