//! Database repository for game records and scores.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use gridguess_rules::Player;
use tracing::{debug, info, instrument, warn};

use crate::db::models::counter_to_db;
use crate::db::{DbError, GameRow, NewGameRow, ScoreRow, schema};
use crate::error::GameError;
use crate::session::{GameStore, Scoreboard, StoredGame};

/// Schema migrations embedded at compile time.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Result of a compare-and-swap save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The row matched the expected counter and was replaced.
    Saved,
    /// The row exists but its counter has moved on.
    Stale {
        /// Counter currently stored.
        current: i64,
    },
    /// No row with that id.
    Missing,
}

/// Database repository for games and session scores.
#[derive(Debug, Clone)]
pub struct GameRepository {
    db_path: String,
}

impl GameRepository {
    /// Creates a new repository for the database at the given path.
    ///
    /// Use `":memory:"` only with care: every call opens a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating GameRepository");
        Ok(Self { db_path })
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    /// Applies any pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(applied.len())
    }

    /// Inserts a new game. Returns `false` if the id is already taken.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if encoding or the insert fails.
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    pub fn insert_game(&self, game: &StoredGame) -> Result<bool, DbError> {
        let row = NewGameRow::encode(game)?;
        let mut conn = self.connection()?;

        let inserted = diesel::insert_or_ignore_into(schema::games::table)
            .values(&row)
            .execute(&mut conn)?;

        if inserted == 0 {
            warn!("Game id already exists");
            return Ok(false);
        }
        info!(session_id = %game.session_id(), "Game inserted");
        Ok(true)
    }

    /// Loads a game by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or the snapshot is corrupt.
    #[instrument(skip(self))]
    pub fn find_game(&self, game_id: &str) -> Result<Option<StoredGame>, DbError> {
        let mut conn = self.connection()?;

        let row = schema::games::table
            .filter(schema::games::id.eq(game_id))
            .select(GameRow::as_select())
            .first::<GameRow>(&mut conn)
            .optional()?;

        match row {
            Some(row) => {
                debug!(turn_counter = row.turn_counter(), state = %row.state(), "Game row found");
                Ok(Some(row.decode()?))
            }
            None => {
                debug!("Game not found");
                Ok(None)
            }
        }
    }

    /// Replaces a game only if its stored counter still equals `expected_counter`.
    ///
    /// When `award` is set and the swap succeeds, the winner's session score
    /// is incremented in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if encoding, the update or the score write fails.
    /// The transaction is rolled back and nothing is saved.
    #[instrument(skip(self, game), fields(game_id = %game.id(), new_counter = game.record().turn_counter()))]
    pub fn compare_and_swap(
        &self,
        game: &StoredGame,
        expected_counter: u64,
        award: Option<Player>,
    ) -> Result<CasOutcome, DbError> {
        let row = NewGameRow::encode(game)?;
        let expected = counter_to_db(expected_counter)?;
        let now = chrono::Utc::now().naive_utc();
        let mut conn = self.connection()?;

        conn.transaction::<CasOutcome, DbError, _>(|conn| {
            let updated = diesel::update(
                schema::games::table
                    .filter(schema::games::id.eq(row.id()))
                    .filter(schema::games::turn_counter.eq(expected)),
            )
            .set((
                schema::games::turn_counter.eq(*row.turn_counter()),
                schema::games::state.eq(row.state()),
                schema::games::snapshot.eq(row.snapshot()),
                schema::games::updated_at.eq(now),
            ))
            .execute(conn)?;

            if updated == 1 {
                if let Some(player) = award {
                    let score = bump_score(conn, game.session_id(), player)?;
                    info!(session_id = %game.session_id(), %player, score, "Score incremented");
                }
                debug!("Game saved");
                return Ok(CasOutcome::Saved);
            }

            let current = schema::games::table
                .filter(schema::games::id.eq(row.id()))
                .select(schema::games::turn_counter)
                .first::<i64>(conn)
                .optional()?;

            Ok(match current {
                Some(current) => {
                    warn!(expected, current, "Compare-and-swap lost");
                    CasOutcome::Stale { current }
                }
                None => CasOutcome::Missing,
            })
        })
    }

    /// Adds one point to `player` in `session_id`, returning the new score.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn add_point(&self, session_id: &str, player: Player) -> Result<u32, DbError> {
        let mut conn = self.connection()?;
        let score = conn.transaction::<u32, DbError, _>(|conn| bump_score(conn, session_id, player))?;
        info!(session_id, %player, score, "Score incremented");
        Ok(score)
    }

    /// Returns both players' scores for a session (zero when never scored).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn session_scores(&self, session_id: &str) -> Result<[u32; 2], DbError> {
        let mut conn = self.connection()?;

        let rows = schema::scores::table
            .filter(schema::scores::session_id.eq(session_id))
            .select(ScoreRow::as_select())
            .load::<ScoreRow>(&mut conn)?;

        let mut scores = [0u32; 2];
        for row in &rows {
            let player = row.player()?;
            scores[player.index()] = u32::try_from(*row.score())
                .map_err(|_| DbError::new(format!("Negative score {}", row.score())))?;
        }

        debug!(session_id, first = scores[0], second = scores[1], "Scores loaded");
        Ok(scores)
    }
}

fn player_to_db(player: Player) -> Result<i32, DbError> {
    i32::try_from(player.index()).map_err(|_| DbError::new("Player index out of range"))
}

/// Upserts one point for `player` on an open connection and reads it back.
fn bump_score(conn: &mut SqliteConnection, session_id: &str, player: Player) -> Result<u32, DbError> {
    let index = player_to_db(player)?;
    diesel::insert_into(schema::scores::table)
        .values(&ScoreRow::new(session_id.to_string(), index, 1))
        .on_conflict((schema::scores::session_id, schema::scores::player_index))
        .do_update()
        .set(schema::scores::score.eq(schema::scores::score + 1))
        .execute(conn)?;

    let score = schema::scores::table
        .filter(schema::scores::session_id.eq(session_id))
        .filter(schema::scores::player_index.eq(index))
        .select(schema::scores::score)
        .first::<i32>(conn)?;
    u32::try_from(score).map_err(|_| DbError::new(format!("Negative score {}", score)))
}

impl GameStore for GameRepository {
    fn insert_game(&self, game: &StoredGame) -> Result<(), GameError> {
        if GameRepository::insert_game(self, game)? {
            Ok(())
        } else {
            Err(GameError::conflict(format!("Game '{}' already exists", game.id())))
        }
    }

    fn load_game(&self, game_id: &str) -> Result<StoredGame, GameError> {
        self.find_game(game_id)?
            .ok_or_else(|| GameError::not_found(format!("Game '{}' not found", game_id)))
    }

    fn save_game_with_award(
        &self,
        game: &StoredGame,
        expected_counter: u64,
        award: Option<Player>,
    ) -> Result<(), GameError> {
        match self.compare_and_swap(game, expected_counter, award)? {
            CasOutcome::Saved => Ok(()),
            CasOutcome::Stale { current } => Err(GameError::conflict(format!(
                "Game '{}' moved on: expected counter {}, stored {}",
                game.id(),
                expected_counter,
                current
            ))),
            CasOutcome::Missing => Err(GameError::not_found(format!("Game '{}' not found", game.id()))),
        }
    }
}

impl Scoreboard for GameRepository {
    fn scores(&self, session_id: &str) -> Result<[u32; 2], GameError> {
        Ok(self.session_scores(session_id)?)
    }
}
