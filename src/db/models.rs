//! Database models and their conversion to domain types.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use gridguess_rules::Player;
use tracing::instrument;

use crate::db::{DbError, schema};
use crate::session::StoredGame;

/// Stored game row. The full game lives in `snapshot` as JSON; the other
/// columns are denormalized for the compare-and-swap and for queries.
#[derive(Debug, Clone, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::games)]
pub struct GameRow {
    id: String,
    session_id: String,
    turn_counter: i64,
    state: String,
    snapshot: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl GameRow {
    /// Decodes the snapshot. Record invariants are checked as part of
    /// deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the snapshot is malformed, violates a record
    /// invariant, or disagrees with the denormalized columns.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn decode(&self) -> Result<StoredGame, DbError> {
        let game: StoredGame = serde_json::from_str(&self.snapshot)
            .map_err(|e| DbError::new(format!("Corrupt snapshot for game '{}': {}", self.id, e)))?;
        let record = game.record();

        if i64::try_from(record.turn_counter()).ok() != Some(self.turn_counter) {
            return Err(DbError::new(format!(
                "Snapshot counter {} disagrees with row counter {} for game '{}'",
                record.turn_counter(),
                self.turn_counter,
                self.id
            )));
        }
        Ok(game)
    }
}

/// Insertable game row.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::games)]
pub struct NewGameRow {
    id: String,
    session_id: String,
    turn_counter: i64,
    state: String,
    snapshot: String,
}

impl NewGameRow {
    /// Encodes a stored game into its row form.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the game cannot be serialized.
    #[instrument(skip(game), fields(game_id = %game.id()))]
    pub fn encode(game: &StoredGame) -> Result<Self, DbError> {
        Ok(Self::new(
            game.id().clone(),
            game.session_id().clone(),
            counter_to_db(game.record().turn_counter())?,
            game.record().state().to_string(),
            serde_json::to_string(game)?,
        ))
    }
}

/// Per-session, per-player running score.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Getters, new)]
#[diesel(table_name = schema::scores)]
pub struct ScoreRow {
    session_id: String,
    player_index: i32,
    score: i32,
}

impl ScoreRow {
    /// Player this row belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored index is not 0 or 1.
    #[instrument(skip(self))]
    pub fn player(&self) -> Result<Player, DbError> {
        usize::try_from(self.player_index)
            .ok()
            .and_then(Player::from_index)
            .ok_or_else(|| DbError::new(format!("Invalid player index {}", self.player_index)))
    }
}

/// Converts a turn counter to the signed column type.
pub(crate) fn counter_to_db(counter: u64) -> Result<i64, DbError> {
    i64::try_from(counter).map_err(|_| DbError::new(format!("Turn counter {} out of range", counter)))
}
