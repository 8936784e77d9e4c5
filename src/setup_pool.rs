//! Setup selection and the bundled game data file.

use crate::catalog::StaticEntitySource;
use crate::error::GameError;
use derive_getters::Getters;
use gridguess_rules::{Difficulty, GameSetup};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Supplies a precomputed setup for a new game.
pub trait SetupProvider {
    /// Chooses a setup for `language`, optionally restricted to `difficulty`.
    /// Returns `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`GameError`] if the backing store is unavailable.
    fn choose_setup(&self, language: &str, difficulty: Option<Difficulty>) -> Result<Option<GameSetup>, GameError>;
}

/// A fixed collection of setups, chosen from uniformly at random.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetupPool {
    setups: Vec<GameSetup>,
}

impl SetupPool {
    /// Creates a pool from `setups`.
    #[instrument(skip(setups), fields(count = setups.len()))]
    pub fn new(setups: Vec<GameSetup>) -> Self {
        Self { setups }
    }

    /// Number of setups in the pool.
    pub fn len(&self) -> usize {
        self.setups.len()
    }

    /// Returns true if the pool holds no setups.
    pub fn is_empty(&self) -> bool {
        self.setups.is_empty()
    }

    /// Setups matching the filter.
    pub fn matching(&self, language: &str, difficulty: Option<Difficulty>) -> Vec<&GameSetup> {
        self.setups
            .iter()
            .filter(|s| s.language() == language)
            .filter(|s| difficulty.is_none_or(|d| *s.difficulty() == d))
            .collect()
    }

    /// Chooses a matching setup using `rng`.
    #[instrument(skip(self, rng))]
    pub fn choose_setup_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        language: &str,
        difficulty: Option<Difficulty>,
    ) -> Option<GameSetup> {
        let candidates = self.matching(language, difficulty);
        debug!(candidates = candidates.len(), "Choosing setup");
        let chosen = candidates.choose(rng).map(|s| (*s).clone());
        if chosen.is_none() {
            warn!("No setup matches");
        }
        chosen
    }
}

impl SetupProvider for SetupPool {
    fn choose_setup(&self, language: &str, difficulty: Option<Difficulty>) -> Result<Option<GameSetup>, GameError> {
        Ok(self.choose_setup_with(&mut rand::thread_rng(), language, difficulty))
    }
}

/// Entities and setups loaded together from one JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
pub struct GameData {
    /// Entity data sets keyed by language.
    #[serde(default)]
    entities: StaticEntitySource,
    /// Available setups.
    #[serde(default)]
    setups: SetupPool,
}

impl GameData {
    /// Reads game data from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an `UpstreamUnavailable` [`GameError`] if the file cannot be
    /// read or holds an invalid setup.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GameError::upstream_unavailable(format!("Failed to read game data: {}", e)))?;
        let data: Self = serde_json::from_str(&content)
            .map_err(|e| GameError::upstream_unavailable(format!("Invalid game data: {}", e)))?;
        info!(
            languages = data.entities.languages().len(),
            setups = data.setups.len(),
            "Game data loaded"
        );
        Ok(data)
    }

    /// Splits into the entity source and the setup pool.
    pub fn into_parts(self) -> (StaticEntitySource, SetupPool) {
        (self.entities, self.setups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridguess_rules::{Category, EntityId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeSet;

    fn setup(language: &str, difficulty: Difficulty) -> GameSetup {
        let answers: BTreeSet<EntityId> = ["FR".into()].into_iter().collect();
        GameSetup::new(
            language,
            vec![vec![answers]],
            vec![vec![BTreeSet::new()]],
            vec![Category::new("eu", "Europe")],
            vec![Category::new("coast", "Has a coastline")],
            difficulty,
        )
        .expect("valid setup")
    }

    #[test]
    fn test_filters_by_language_and_difficulty() {
        let pool = SetupPool::new(vec![
            setup("en", Difficulty::Easy),
            setup("en", Difficulty::Hard),
            setup("de", Difficulty::Easy),
        ]);
        assert_eq!(pool.matching("en", None).len(), 2);
        assert_eq!(pool.matching("en", Some(Difficulty::Hard)).len(), 1);
        assert!(pool.matching("it", None).is_empty());
    }

    #[test]
    fn test_choose_is_seeded() {
        let pool = SetupPool::new(vec![setup("en", Difficulty::Easy), setup("en", Difficulty::Medium)]);
        let first = pool.choose_setup_with(&mut StdRng::seed_from_u64(7), "en", None);
        let second = pool.choose_setup_with(&mut StdRng::seed_from_u64(7), "en", None);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_match_is_none() {
        let pool = SetupPool::new(vec![setup("en", Difficulty::Easy)]);
        let chosen = pool.choose_setup("en", Some(Difficulty::Hard)).expect("provider ok");
        assert!(chosen.is_none());
    }

    #[test]
    fn test_invalid_setup_rejected_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"{"setups": [{"language": "en", "primary_answers": [[["FR"]]],
                "row_categories": [], "column_categories": [], "difficulty": "easy"}]}"#,
        )
        .expect("write");
        let err = GameData::from_file(&path).expect_err("bad category count");
        assert_eq!(err.kind, gridguess_rules::ErrorKind::UpstreamUnavailable);
    }

    #[test]
    fn test_missing_data_file_is_upstream_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = GameData::from_file(dir.path().join("absent.json")).expect_err("no file");
        assert_eq!(err.kind, gridguess_rules::ErrorKind::UpstreamUnavailable);
        assert!(err.message.contains("Failed to read game data"));
    }
}
