//! The game service: turns submissions into validated, persisted transitions.

use crate::config::ServiceConfig;
use crate::error::GameError;
use crate::session::{GameId, GameStore, Scoreboard, SessionId, StoredGame, UserId};
use crate::setup_pool::SetupProvider;
use derive_getters::Getters;
use derive_new::new;
use gridguess_rules::{
    ActionRequest, Difficulty, EntityLookup, FormationCatalog, GameRecord, PlayMode, Player, WireAction,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Request to start a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct NewGame {
    /// Game id; generated when absent.
    #[new(default)]
    #[serde(default)]
    pub game_id: Option<GameId>,
    /// Session the game counts toward.
    pub session_id: SessionId,
    /// Users for player 0 and player 1. Same-device play may repeat one user.
    pub seats: [UserId; 2],
    /// Language of the entity data set; the configured default when absent.
    #[new(default)]
    #[serde(default)]
    pub language: Option<String>,
    /// Difficulty filter; the configured filter when absent.
    #[new(default)]
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Play mode; the configured mode when absent.
    #[new(default)]
    #[serde(default)]
    pub mode: Option<PlayMode>,
}

/// An action submitted by a client.
///
/// Every field is optional on the wire so that a missing one is reported as
/// an invalid request instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, new)]
pub struct Submission {
    /// User submitting the action.
    #[serde(default)]
    pub acting_user_id: Option<UserId>,
    /// Turn counter the client last saw.
    #[serde(default)]
    pub turn_counter_observed: Option<u64>,
    /// The action itself.
    #[serde(default)]
    pub action: Option<WireAction>,
}

/// Reply to an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct ActionResponse {
    /// Always true; rejections are returned as errors.
    success: bool,
    /// The game after the action.
    game: StoredGame,
}

/// Coordinates the rules engine with storage, entity lookup and setups.
#[derive(Debug, Clone, Getters)]
pub struct GameService<S, L, P> {
    store: S,
    lookup: L,
    setups: P,
    formations: FormationCatalog,
    config: ServiceConfig,
}

impl<S, L, P> GameService<S, L, P>
where
    S: GameStore + Scoreboard,
    L: EntityLookup,
    P: SetupProvider,
{
    /// Creates a service.
    #[instrument(skip_all)]
    pub fn new(store: S, lookup: L, setups: P, config: ServiceConfig) -> Self {
        info!(play_mode = %config.play_mode(), language = %config.default_language(), "Creating game service");
        Self { store, lookup, setups, formations: FormationCatalog::new(), config }
    }

    /// Starts a game with a randomly chosen first player.
    ///
    /// # Errors
    ///
    /// See [`GameService::create_game_with`].
    #[instrument(skip(self))]
    pub fn create_game(&self, request: NewGame) -> Result<StoredGame, GameError> {
        let mut rng = rand::thread_rng();
        let first = if rng.gen_bool(0.5) { Player::First } else { Player::Second };
        self.create_game_with(request, first)
    }

    /// Starts a game with `first` to move.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for blank ids or seats, `Forbidden` when one
    /// user holds both seats in online play, `NotFound` when no setup
    /// matches, and `Conflict` when the game id is taken.
    #[instrument(skip(self))]
    pub fn create_game_with(&self, request: NewGame, first: Player) -> Result<StoredGame, GameError> {
        if request.session_id.trim().is_empty() {
            return Err(GameError::invalid_request("session_id is required"));
        }
        if request.seats.iter().any(|seat| seat.trim().is_empty()) {
            return Err(GameError::invalid_request("both seats must name a user"));
        }

        let mode = request.mode.unwrap_or(*self.config.play_mode());
        if mode == PlayMode::Online && request.seats[0] == request.seats[1] {
            warn!(user = %request.seats[0], "Same user in both seats for online play");
            return Err(GameError::forbidden("online play needs two distinct users"));
        }

        let language = request
            .language
            .unwrap_or_else(|| self.config.default_language().clone());
        let difficulty = request.difficulty.or(*self.config.difficulty());

        let setup = self.setups.choose_setup(&language, difficulty)?.ok_or_else(|| {
            GameError::not_found(format!(
                "No setup for language '{}'{}",
                language,
                difficulty.map(|d| format!(" at difficulty {}", d)).unwrap_or_default()
            ))
        })?;

        let id = request.game_id.unwrap_or_else(generate_game_id);
        let record = GameRecord::new(setup, mode, first);
        let game = StoredGame::new(id, request.session_id, request.seats, record);
        self.store.insert_game(&game)?;

        info!(game_id = %game.id(), %first, %mode, "Game created");
        Ok(game)
    }

    /// Applies a submitted action.
    ///
    /// The game is loaded, the user resolved to a seat, and the action
    /// validated and applied. The result is saved only if no other
    /// submission got there first. An award from the first decisive win is
    /// committed together with that save.
    ///
    /// # Errors
    ///
    /// Returns a [`GameError`] classified by the failing step. Nothing is
    /// saved when an error is returned.
    #[instrument(
        skip(self, submission),
        fields(user = ?submission.acting_user_id, observed = ?submission.turn_counter_observed)
    )]
    pub fn submit(&self, game_id: &str, submission: Submission) -> Result<ActionResponse, GameError> {
        let user = submission
            .acting_user_id
            .ok_or_else(|| GameError::invalid_request("acting_user_id is required"))?;
        let observed = submission
            .turn_counter_observed
            .ok_or_else(|| GameError::invalid_request("turn_counter_observed is required"))?;
        let wire = submission
            .action
            .ok_or_else(|| GameError::invalid_request("action is required"))?;

        let game = self.store.load_game(game_id)?;
        let actor = game.resolve_actor(&user)?;
        let request = ActionRequest::new(actor, observed, wire.into_action());

        let transition = game.record().apply(&request, &self.lookup, &self.formations)?;
        let updated = game.with_record(transition.record);
        self.store.save_game_with_award(&updated, observed, transition.award)?;

        if let Some(winner) = transition.award {
            info!(session_id = %updated.session_id(), %winner, "Win recorded");
        }

        debug!(
            state = %updated.record().state(),
            turn_counter = updated.record().turn_counter(),
            "Submission accepted"
        );
        Ok(ActionResponse { success: true, game: updated })
    }

    /// Loads a game.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the game does not exist.
    #[instrument(skip(self))]
    pub fn game(&self, game_id: &str) -> Result<StoredGame, GameError> {
        self.store.load_game(game_id)
    }

    /// Both players' scores in a session.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the scoreboard cannot be read.
    #[instrument(skip(self))]
    pub fn scores(&self, session_id: &str) -> Result<[u32; 2], GameError> {
        self.store.scores(session_id)
    }

    /// Rebuilds a game from its history and checks that the result matches
    /// the stored record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the game does not exist, or the rejection that
    /// stopped the replay.
    #[instrument(skip(self))]
    pub fn verify_replay(&self, game_id: &str) -> Result<bool, GameError> {
        let game = self.store.load_game(game_id)?;
        let record = game.record();

        let requests: Vec<ActionRequest> = record
            .history()
            .iter()
            .map(|entry| ActionRequest::new(*entry.actor(), *entry.turn_counter(), entry.action().clone()))
            .collect();

        // Every turn action flips the turn once; unwind them to find who moved first.
        let flips = record.history().iter().filter(|e| e.action().is_turn_action()).count();
        let first = if flips % 2 == 0 {
            record.turn()
        } else {
            record.turn().opponent()
        };

        let initial = GameRecord::new(record.setup().clone(), record.mode(), first);
        let rebuilt = GameRecord::replay(&initial, &requests, &self.lookup, &self.formations)?;
        let matches = &rebuilt == record;
        if !matches {
            warn!("Replayed record differs from stored record");
        }
        info!(actions = requests.len(), matches, "Replay verified");
        Ok(matches)
    }
}

/// Random 16-digit hex id.
fn generate_game_id() -> GameId {
    format!("{:016x}", rand::thread_rng().r#gen::<u64>())
}
