//! Stored games, seats, and the persistence seams.

use crate::error::GameError;
use derive_getters::Getters;
use derive_new::new;
use gridguess_rules::{GameRecord, PlayMode, Player};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Unique identifier for a user.
pub type UserId = String;

/// Unique identifier for a session (a series of games between the same seats).
pub type SessionId = String;

/// Unique identifier for a game.
pub type GameId = String;

/// A game record together with its identity and seat assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, new)]
pub struct StoredGame {
    /// Game id.
    id: GameId,
    /// Session the game belongs to; scores accumulate per session.
    session_id: SessionId,
    /// User seated as player 0 and player 1.
    seats: [UserId; 2],
    /// Current record.
    record: GameRecord,
}

impl StoredGame {
    /// Returns a copy carrying `record` in place of the current one.
    pub fn with_record(&self, record: GameRecord) -> Self {
        Self {
            record,
            ..self.clone()
        }
    }

    /// Resolves the acting user to the player they act for.
    ///
    /// In same-device play, or when one user holds both seats, the user acts
    /// for whoever owns the turn.
    ///
    /// # Errors
    ///
    /// Returns a `Forbidden` [`GameError`] if the user holds no seat.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn resolve_actor(&self, user_id: &str) -> Result<Player, GameError> {
        let held: Vec<Player> = Player::ALL
            .into_iter()
            .filter(|p| self.seats[p.index()] == user_id)
            .collect();

        match held.as_slice() {
            [] => {
                warn!(user_id, "User holds no seat");
                Err(GameError::forbidden(format!(
                    "User '{}' is not seated in game '{}'",
                    user_id, self.id
                )))
            }
            [seat] if self.record.mode() == PlayMode::Online => {
                debug!(user_id, player = %seat, "Actor resolved");
                Ok(*seat)
            }
            _ => {
                let owner = self.record.turn();
                debug!(user_id, player = %owner, "Actor resolved to turn owner");
                Ok(owner)
            }
        }
    }
}

/// Persistence contract for stored games.
pub trait GameStore {
    /// Inserts a new game; fails with `Conflict` if the id exists.
    fn insert_game(&self, game: &StoredGame) -> Result<(), GameError>;

    /// Loads a game; fails with `NotFound` if absent.
    fn load_game(&self, game_id: &str) -> Result<StoredGame, GameError>;

    /// Replaces a game only if the stored turn counter equals
    /// `expected_counter`, adding one point to `award` in the game's session
    /// as part of the same commit. Fails with `Conflict` if the counter has
    /// moved on; on any failure neither the game nor the score changes.
    fn save_game_with_award(
        &self,
        game: &StoredGame,
        expected_counter: u64,
        award: Option<Player>,
    ) -> Result<(), GameError>;

    /// Compare-and-swap save without a score award.
    fn save_game(&self, game: &StoredGame, expected_counter: u64) -> Result<(), GameError> {
        self.save_game_with_award(game, expected_counter, None)
    }
}

/// Per-session running scores.
pub trait Scoreboard {
    /// Returns both scores, indexed by player.
    fn scores(&self, session_id: &str) -> Result<[u32; 2], GameError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    games: HashMap<GameId, StoredGame>,
    scores: HashMap<SessionId, [u32; 2]>,
}

/// In-process store for games and scores.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating memory store");
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lists all stored game ids.
    #[instrument(skip(self))]
    pub fn list_games(&self) -> Vec<GameId> {
        let state = self.lock();
        let mut ids: Vec<_> = state.games.keys().cloned().collect();
        ids.sort();
        debug!(count = ids.len(), "Listed games");
        ids
    }
}

impl GameStore for MemoryStore {
    #[instrument(skip(self, game), fields(game_id = %game.id))]
    fn insert_game(&self, game: &StoredGame) -> Result<(), GameError> {
        let mut state = self.lock();
        if state.games.contains_key(&game.id) {
            warn!("Game already exists");
            return Err(GameError::conflict(format!("Game '{}' already exists", game.id)));
        }
        state.games.insert(game.id.clone(), game.clone());
        info!("Game inserted");
        Ok(())
    }

    #[instrument(skip(self))]
    fn load_game(&self, game_id: &str) -> Result<StoredGame, GameError> {
        self.lock().games.get(game_id).cloned().ok_or_else(|| {
            debug!("Game not found");
            GameError::not_found(format!("Game '{}' not found", game_id))
        })
    }

    #[instrument(skip(self, game), fields(game_id = %game.id, new_counter = game.record.turn_counter()))]
    fn save_game_with_award(
        &self,
        game: &StoredGame,
        expected_counter: u64,
        award: Option<Player>,
    ) -> Result<(), GameError> {
        let mut state = self.lock();
        let stored = state
            .games
            .get_mut(&game.id)
            .ok_or_else(|| GameError::not_found(format!("Game '{}' not found", game.id)))?;

        let current = stored.record.turn_counter();
        if current != expected_counter {
            warn!(expected_counter, current, "Compare-and-swap lost");
            return Err(GameError::conflict(format!(
                "Game '{}' moved on: expected counter {}, stored {}",
                game.id, expected_counter, current
            )));
        }

        *stored = game.clone();
        if let Some(player) = award {
            let entry = state.scores.entry(game.session_id.clone()).or_default();
            entry[player.index()] += 1;
            info!(%player, score = entry[player.index()], "Score incremented");
        }
        debug!("Game saved");
        Ok(())
    }
}

impl Scoreboard for MemoryStore {
    #[instrument(skip(self))]
    fn scores(&self, session_id: &str) -> Result<[u32; 2], GameError> {
        Ok(self.lock().scores.get(session_id).copied().unwrap_or_default())
    }
}
