//! Entity catalog: a bounded, per-language read-through cache.
//!
//! The catalog answers "does this entity exist in this language's data set"
//! for the rules engine. Data sets are fetched lazily from an
//! [`EntitySource`] and kept until evicted, invalidated or cleared.

use derive_getters::Getters;
use derive_new::new;
use gridguess_rules::{EntityId, EntityLookup, LookupError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// A selectable entity (a country) in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Entity {
    /// Stable identifier, shared across languages.
    id: EntityId,
    /// Display name in the data set's language.
    name: String,
}

/// Backend that produces the entity data set for a language.
pub trait EntitySource {
    /// Loads every entity for `language`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the data set is missing or unreadable.
    fn load(&self, language: &str) -> Result<Vec<Entity>, LookupError>;
}

/// Entity data held in memory, keyed by language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticEntitySource {
    languages: HashMap<String, Vec<Entity>>,
}

impl StaticEntitySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the data set for `language`.
    #[instrument(skip(self, language, entities), fields(count = entities.len()))]
    pub fn with_language(mut self, language: impl Into<String>, entities: Vec<Entity>) -> Self {
        self.languages.insert(language.into(), entities);
        self
    }

    /// Languages with a data set.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }
}

impl EntitySource for StaticEntitySource {
    #[instrument(skip(self))]
    fn load(&self, language: &str) -> Result<Vec<Entity>, LookupError> {
        self.languages
            .get(language)
            .cloned()
            .ok_or_else(|| LookupError::new(language.to_string(), "no data set for language".to_string()))
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    entries: HashMap<String, Arc<HashMap<EntityId, Entity>>>,
    /// Load order, oldest first.
    order: VecDeque<String>,
}

/// Read-through cache over an [`EntitySource`].
///
/// Holds at most `capacity` languages; loading one more evicts the language
/// loaded longest ago. Clones share the cache.
#[derive(Debug, Clone)]
pub struct EntityCatalog<S> {
    source: Arc<S>,
    capacity: usize,
    state: Arc<Mutex<CatalogState>>,
}

impl<S: EntitySource> EntityCatalog<S> {
    /// Creates a catalog. A zero capacity is raised to one.
    #[instrument(skip(source))]
    pub fn new(source: S, capacity: usize) -> Self {
        info!(capacity, "Creating entity catalog");
        Self {
            source: Arc::new(source),
            capacity: capacity.max(1),
            state: Arc::new(Mutex::new(CatalogState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the data set for `language`, loading it on a miss.
    #[instrument(skip(self))]
    fn data_set(&self, language: &str) -> Result<Arc<HashMap<EntityId, Entity>>, LookupError> {
        if let Some(entries) = self.lock().entries.get(language) {
            debug!("Catalog hit");
            return Ok(Arc::clone(entries));
        }

        debug!("Catalog miss, loading");
        let loaded: HashMap<EntityId, Entity> = self
            .source
            .load(language)?
            .into_iter()
            .map(|entity| (entity.id.clone(), entity))
            .collect();
        let loaded = Arc::new(loaded);

        let mut state = self.lock();
        // Another caller may have loaded it while the lock was released.
        if let Some(entries) = state.entries.get(language) {
            return Ok(Arc::clone(entries));
        }
        while state.order.len() >= self.capacity {
            if let Some(evicted) = state.order.pop_front() {
                state.entries.remove(&evicted);
                info!(language = %evicted, "Evicted language from catalog");
            }
        }
        state.order.push_back(language.to_string());
        state.entries.insert(language.to_string(), Arc::clone(&loaded));
        info!(count = loaded.len(), "Language loaded into catalog");
        Ok(loaded)
    }

    /// Looks up a single entity.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the language cannot be loaded.
    #[instrument(skip(self))]
    pub fn lookup_entity(&self, language: &str, entity: &EntityId) -> Result<Option<Entity>, LookupError> {
        Ok(self.data_set(language)?.get(entity).cloned())
    }

    /// All entity ids for `language`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the language cannot be loaded.
    #[instrument(skip(self))]
    pub fn entity_ids(&self, language: &str) -> Result<BTreeSet<EntityId>, LookupError> {
        Ok(self.data_set(language)?.keys().cloned().collect())
    }

    /// Drops the cached data set for `language`, if any.
    #[instrument(skip(self))]
    pub fn invalidate(&self, language: &str) -> bool {
        let mut state = self.lock();
        state.order.retain(|cached| cached != language);
        let removed = state.entries.remove(language).is_some();
        debug!(removed, "Invalidated");
        removed
    }

    /// Drops every cached data set.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
        debug!("Catalog cleared");
    }

    /// Cached languages, oldest load first.
    pub fn cached_languages(&self) -> Vec<String> {
        self.lock().order.iter().cloned().collect()
    }
}

impl<S: EntitySource> EntityLookup for EntityCatalog<S> {
    fn contains(&self, language: &str, entity: &EntityId) -> Result<bool, LookupError> {
        let found = self.data_set(language)?.contains_key(entity);
        if !found {
            warn!(language, %entity, "Entity not in catalog");
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts loads so cache hits can be observed.
    #[derive(Debug, Clone, Default)]
    struct CountingSource {
        loads: Arc<AtomicUsize>,
    }

    impl CountingSource {
        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl EntitySource for CountingSource {
        fn load(&self, language: &str) -> Result<Vec<Entity>, LookupError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            match language {
                "missing" => Err(LookupError::new(language.to_string(), "offline".to_string())),
                _ => Ok(vec![
                    Entity::new("FR".into(), format!("France ({language})")),
                    Entity::new("DE".into(), format!("Germany ({language})")),
                ]),
            }
        }
    }

    #[test]
    fn test_read_through_caches() {
        let source = CountingSource::default();
        let catalog = EntityCatalog::new(source.clone(), 2);
        assert!(catalog.contains("en", &"FR".into()).expect("loaded"));
        assert!(!catalog.contains("en", &"XX".into()).expect("loaded"));
        assert_eq!(source.loads(), 1);
        let entity = catalog.lookup_entity("en", &"DE".into()).expect("loaded");
        assert_eq!(entity.map(|e| e.name().clone()), Some("Germany (en)".to_string()));
    }

    #[test]
    fn test_oldest_language_evicted() {
        let source = CountingSource::default();
        let catalog = EntityCatalog::new(source.clone(), 2);
        catalog.contains("en", &"FR".into()).expect("en");
        catalog.contains("de", &"FR".into()).expect("de");
        catalog.contains("fr", &"FR".into()).expect("fr");
        assert_eq!(catalog.cached_languages(), vec!["de".to_string(), "fr".to_string()]);

        catalog.contains("en", &"FR".into()).expect("reload");
        assert_eq!(source.loads(), 4);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let source = CountingSource::default();
        let catalog = EntityCatalog::new(source.clone(), 4);
        catalog.contains("en", &"FR".into()).expect("en");
        catalog.contains("de", &"FR".into()).expect("de");

        assert!(catalog.invalidate("en"));
        assert!(!catalog.invalidate("en"));
        assert_eq!(catalog.cached_languages(), vec!["de".to_string()]);

        catalog.clear();
        assert!(catalog.cached_languages().is_empty());
        catalog.contains("de", &"FR".into()).expect("reload");
        assert_eq!(source.loads(), 3);
    }

    #[test]
    fn test_source_failure_is_lookup_error() {
        let catalog = EntityCatalog::new(CountingSource::default(), 1);
        let err = catalog.contains("missing", &"FR".into()).expect_err("offline");
        assert_eq!(err.language, "missing");
        assert!(catalog.cached_languages().is_empty());
    }

    #[test]
    fn test_static_source_from_json() {
        let source: StaticEntitySource = serde_json::from_str(
            r#"{"en": [{"id": "FR", "name": "France"}], "de": [{"id": "FR", "name": "Frankreich"}]}"#,
        )
        .expect("parse");
        assert_eq!(source.languages(), vec!["de", "en"]);
        assert!(source.load("it").is_err());
    }

    #[test]
    fn test_with_language_builds_source() {
        let source = StaticEntitySource::new()
            .with_language("en", vec![Entity::new("FR".into(), "France".to_string())])
            .with_language(String::from("de"), Vec::new());
        assert_eq!(source.languages(), vec!["de", "en"]);
        assert_eq!(source.load("en").expect("en").len(), 1);
    }
}
