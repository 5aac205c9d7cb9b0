//! Persistent fighter index
//!
//! Maps normalized fighter names to their external identifiers. The whole map
//! is persisted as one JSON document:
//!
//! ```json
//! { "jon jones": { "id": "10169-jon-jones", "nickname": "Bones", "lastUpdated": "2025-01-01T00:00:00Z" } }
//! ```

mod normalize;

pub use normalize::normalize_name;

use crate::error::{FightgraphError, Result};
use crate::persist;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Default cap on search results
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

const STARTER_DATASET: &str = include_str!("starter_fighters.json");

/// One persisted index entry, keyed by normalized name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// A fighter as seen by callers of the index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: String,
    /// Normalized name the entry is indexed under
    pub canonical_name: String,
    pub nickname: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl Entity {
    fn from_entry(key: &str, entry: &StoredEntity) -> Self {
        Self {
            id: entry.id.clone(),
            canonical_name: key.to_string(),
            nickname: entry.nickname.clone(),
            last_updated: entry.last_updated,
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct StarterFighter {
    name: String,
    id: String,
    #[serde(default)]
    nickname: Option<String>,
}

/// Normalized-name → identifier index backed by a JSON file
pub struct EntityStore {
    path: PathBuf,
    entries: BTreeMap<String, StoredEntity>,
}

impl EntityStore {
    /// Create an empty store bound to `path`. Nothing is read until `load`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Create a store and load it, seeding the starter dataset if it is empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(path);
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upsert a fighter under the normalized form of `name`.
    ///
    /// Returns the key used, or `None` when the name normalizes to nothing.
    pub fn add(&mut self, name: &str, id: &str, nickname: Option<&str>) -> Option<String> {
        let key = normalize_name(name);
        if key.is_empty() {
            tracing::debug!("Ignoring fighter {} with empty name", id);
            return None;
        }

        let nickname = nickname
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        self.entries.insert(
            key.clone(),
            StoredEntity {
                id: id.to_string(),
                nickname,
                last_updated: Utc::now(),
            },
        );
        Some(key)
    }

    /// Exact lookup by name
    pub fn get(&self, name: &str) -> Option<Entity> {
        let key = normalize_name(name);
        self.entries
            .get(&key)
            .map(|entry| Entity::from_entry(&key, entry))
    }

    /// Whether any entry carries `id`
    pub fn has_by_id(&self, id: &str) -> bool {
        self.entries.values().any(|entry| entry.id == id)
    }

    /// Search by name or nickname.
    ///
    /// An exact normalized name match comes first, followed by entries whose
    /// name or nickname contains the query, in index order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Entity> {
        let query = normalize_name(query);
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut exact = Vec::new();
        let mut partial = Vec::new();

        for (key, entry) in &self.entries {
            if *key == query {
                exact.push(Entity::from_entry(key, entry));
            } else if key.contains(&query)
                || entry
                    .nickname
                    .as_deref()
                    .is_some_and(|nick| normalize_name(nick).contains(&query))
            {
                partial.push(Entity::from_entry(key, entry));
            }
        }

        exact.into_iter().chain(partial).take(limit).collect()
    }

    /// All entries in index order
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries
            .iter()
            .map(|(key, entry)| Entity::from_entry(key, entry))
    }

    /// Up to `count` distinct identifiers chosen at random
    pub fn sample_ids<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<String> {
        let mut seen = HashSet::new();
        let ids: Vec<&str> = self
            .entries
            .values()
            .map(|entry| entry.id.as_str())
            .filter(|id| seen.insert(*id))
            .collect();

        ids.choose_multiple(rng, count)
            .map(|id| id.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            count: self.entries.len(),
            last_updated: self.entries.values().map(|e| e.last_updated).max(),
        }
    }

    /// Replace the in-memory index with the file contents.
    ///
    /// A missing or unreadable file leaves the store empty.
    pub fn load(&mut self) {
        if !self.path.exists() {
            tracing::debug!("No entity store at {}, starting empty", self.path.display());
            self.entries.clear();
            return;
        }

        match persist::read_json::<BTreeMap<String, StoredEntity>>(&self.path) {
            Ok(entries) => {
                tracing::debug!("Loaded {} fighters from {}", entries.len(), self.path.display());
                self.entries = entries;
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable entity store: {}", e);
                self.entries.clear();
            }
        }
    }

    /// Write the whole index to disk
    pub fn save(&self) -> Result<()> {
        persist::write_json(&self.path, &self.entries)?;
        tracing::debug!("Saved {} fighters to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    /// Load from disk; if nothing was there, seed the bundled starter dataset
    /// and persist it right away. Returns the resulting entry count.
    pub fn initialize(&mut self) -> Result<usize> {
        self.load();

        if self.entries.is_empty() {
            let starters: Vec<StarterFighter> =
                serde_json::from_str(STARTER_DATASET).map_err(|e| FightgraphError::Json {
                    source: e,
                    context: "Failed to parse bundled starter dataset".to_string(),
                })?;

            for fighter in &starters {
                self.add(&fighter.name, &fighter.id, fighter.nickname.as_deref());
            }
            tracing::info!("Seeded entity store with {} starter fighters", self.entries.len());
            self.save()?;
        }

        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> EntityStore {
        EntityStore::new(dir.path().join("fighters.json"))
    }

    #[test]
    fn test_add_normalizes_key() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let key = store.add("  Jon  'Bones' JONES ", "10169-jon-jones", Some("Bones"));
        assert_eq!(key.as_deref(), Some("jon bones jones"));
        assert!(store.has_by_id("10169-jon-jones"));
        assert!(!store.has_by_id("nope"));
    }

    #[test]
    fn test_add_is_idempotent_except_timestamp() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.add("Stipe Miocic", "11135", None);
        let first = store.get("stipe miocic").unwrap();
        store.add("Stipe Miocic", "11135", None);
        let second = store.get("stipe miocic").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(first.nickname, second.nickname);
        assert!(second.last_updated >= first.last_updated);
    }

    #[test]
    fn test_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.add("Alex Pereira", "old-id", Some("Poatan"));
        store.add("alex pereira", "new-id", None);

        let entity = store.get("Alex Pereira").unwrap();
        assert_eq!(entity.id, "new-id");
        assert_eq!(entity.nickname, None);
    }

    #[test]
    fn test_empty_name_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert_eq!(store.add("!!!", "x", None), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_search_exact_match_first() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.add("Aaron Silva", "1", None);
        store.add("Anderson Silva", "2", None);
        store.add("Silva", "3", None);

        let results = store.search("silva", DEFAULT_SEARCH_LIMIT);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "3");
    }

    #[test]
    fn test_search_matches_nickname() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.add("Demetrious Johnson", "dj", Some("Mighty Mouse"));
        store.add("Henry Cejudo", "hc", Some("Triple C"));

        let results = store.search("MOUSE", 20);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "dj");
        assert_eq!(results[0].canonical_name, "demetrious johnson");
    }

    #[test]
    fn test_search_respects_limit() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        for i in 0..30 {
            store.add(&format!("Fighter {}", i), &i.to_string(), None);
        }

        assert_eq!(store.search("fighter", 20).len(), 20);
        assert_eq!(store.search("fighter", 5).len(), 5);
        assert!(store.search("   ", 5).is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add("Amanda Nunes", "36327", Some("The Lioness"));
        store.add("Zhang Weili", "123406", None);
        store.save().unwrap();

        let mut reloaded = store_in(&dir);
        reloaded.load();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("amanda nunes").unwrap().nickname.as_deref(), Some("The Lioness"));
    }

    #[test]
    fn test_document_shape() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add("Zhang Weili", "123406", None);
        store.add("Max Holloway", "38671", Some("Blessed"));
        store.save().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["zhang weili"]["id"], "123406");
        assert!(raw["zhang weili"].get("nickname").is_none());
        assert_eq!(raw["max holloway"]["nickname"], "Blessed");
        assert!(raw["max holloway"]["lastUpdated"].is_string());
    }

    #[test]
    fn test_load_corrupt_file_falls_back_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fighters.json");
        std::fs::write(&path, "not json at all").unwrap();

        let mut store = EntityStore::new(&path);
        store.add("Leftover", "1", None);
        store.load();
        assert!(store.is_empty());
    }

    #[test]
    fn test_initialize_seeds_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let count = store.initialize().unwrap();
        assert!(count > 0);
        assert!(store.path().exists());
        assert_eq!(store.search("jon jones", 20)[0].id, "10169-jon-jones");
    }

    #[test]
    fn test_initialize_keeps_existing_data() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add("Only Fighter", "only", None);
        store.save().unwrap();

        let mut reopened = store_in(&dir);
        assert_eq!(reopened.initialize().unwrap(), 1);
    }

    #[test]
    fn test_stats() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert_eq!(
            store.stats(),
            StoreStats {
                count: 0,
                last_updated: None
            }
        );

        store.add("A", "a", None);
        store.add("B", "b", None);
        let stats = store.stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.last_updated, Some(store.get("b").unwrap().last_updated));
    }

    #[test]
    fn test_sample_ids_distinct_and_bounded() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add("Name One", "shared", None);
        store.add("Name Two", "shared", None);
        store.add("Name Three", "other", None);

        let mut rng = StdRng::seed_from_u64(7);
        let mut ids = store.sample_ids(10, &mut rng);
        ids.sort();
        assert_eq!(ids, vec!["other".to_string(), "shared".to_string()]);
        assert_eq!(store.sample_ids(1, &mut rng).len(), 1);
    }
}
