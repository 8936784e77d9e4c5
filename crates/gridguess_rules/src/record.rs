//! The game record and its lifecycle state machine.
//!
//! [`GameRecord::apply`] is pure: it never mutates the record it is called
//! on. An accepted action yields a fresh record inside a [`Transition`]; a
//! rejected one yields a [`Rejection`] and leaves nothing changed.

use super::action::{Action, ActionRequest, Rejection};
use super::board::{BoardError, BoardState};
use super::contracts::{CounterIsCurrent, EntityLookup, MoveValidator, TurnContext, is_correct};
use super::formations::{FormationCatalog, Line};
use super::invariants::{InvariantSet, InvariantViolation, RecordInvariants};
use super::outcome::{Outcome, evaluate};
use super::setup::GameSetup;
use super::types::Player;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Lifecycle state of a game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameState {
    /// Created, no action taken yet.
    Initialized,
    /// Play under way, no decision.
    Running,
    /// Winner or draw determined; empty cells may remain.
    Decided,
    /// Board completely full.
    Finished,
    /// Terminated early by an explicit end-game action.
    Ended,
    /// Play continues after a decision; bookkeeping is frozen.
    PlayingOn,
}

impl GameState {
    /// States in which turn actions are refused.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameState::Finished | GameState::Ended)
    }
}

/// Whether turn ownership is enforced.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PlayMode {
    /// Each seat plays from its own client; only the turn owner may act.
    #[default]
    Online,
    /// Both seats share one device; anyone may act for the turn owner.
    SameDevice,
}

/// Decision recorded for a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// A player completed a line.
    Player(Player),
    /// Nobody can win.
    Draw,
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Winner::Player(player) => write!(f, "{player} wins"),
            Winner::Draw => write!(f, "draw"),
        }
    }
}

/// How an accepted action was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Verdict {
    /// The guess was accepted and the cell marked.
    Correct,
    /// The guess was legal but wrong; nothing marked.
    Wrong,
    /// The turn was passed.
    Skipped,
    /// A state-only action (end game, play on).
    Meta,
}

/// One accepted action in the game history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new, derive_getters::Getters)]
pub struct TurnEntry {
    /// Counter value the action was accepted at.
    turn_counter: u64,
    /// Seat that submitted the action.
    actor: Player,
    /// Seat credited with the action (the turn owner for turn actions).
    player: Player,
    /// What was done.
    action: Action,
    /// How it was judged.
    verdict: Verdict,
}

/// Result of an accepted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The new record.
    pub record: GameRecord,
    /// Evaluator result, when bookkeeping ran.
    pub outcome: Option<Outcome>,
    /// Player whose score must be incremented, set on the first decisive win only.
    pub award: Option<Player>,
}

/// Complete state of one game.
///
/// Deserializing checks every record invariant, so a snapshot that
/// disagrees with itself is refused before it can reach [`GameRecord::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct GameRecord {
    setup: GameSetup,
    board: BoardState,
    turn: Player,
    turn_counter: u64,
    state: GameState,
    winner: Option<Winner>,
    winning_line: Option<Line>,
    mode: PlayMode,
    history: Vec<TurnEntry>,
}

/// Unchecked wire form of [`GameRecord`].
#[derive(Deserialize)]
struct RawRecord {
    setup: GameSetup,
    board: BoardState,
    turn: Player,
    turn_counter: u64,
    state: GameState,
    winner: Option<Winner>,
    winning_line: Option<Line>,
    mode: PlayMode,
    history: Vec<TurnEntry>,
}

impl TryFrom<RawRecord> for GameRecord {
    type Error = String;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let record = GameRecord {
            setup: raw.setup,
            board: raw.board,
            turn: raw.turn,
            turn_counter: raw.turn_counter,
            state: raw.state,
            winner: raw.winner,
            winning_line: raw.winning_line,
            mode: raw.mode,
            history: raw.history,
        };
        record.validated().map_err(|violations| {
            let descriptions: Vec<String> = violations.iter().map(ToString::to_string).collect();
            format!("invalid game record: {}", descriptions.join("; "))
        })
    }
}

impl From<BoardError> for Rejection {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::OutOfBounds(cell) => Rejection::OutOfBounds { row: cell.row, col: cell.col },
            BoardError::Occupied(cell) => Rejection::CellOccupied { row: cell.row, col: cell.col },
        }
    }
}

impl GameRecord {
    /// Creates a fresh game with `first` to move.
    #[instrument(skip(setup), fields(size = setup.size()))]
    pub fn new(setup: GameSetup, mode: PlayMode, first: Player) -> Self {
        let board = BoardState::new(*setup.size());
        Self {
            setup,
            board,
            turn: first,
            turn_counter: 0,
            state: GameState::Initialized,
            winner: None,
            winning_line: None,
            mode,
            history: Vec::new(),
        }
    }

    /// Checks every record invariant, returning the record unchanged on success.
    ///
    /// # Errors
    ///
    /// Returns every violated invariant.
    #[instrument(skip(self), fields(turn_counter = self.turn_counter))]
    pub fn validated(self) -> Result<Self, Vec<InvariantViolation>> {
        RecordInvariants::check_all(&self)?;
        Ok(self)
    }

    /// The immutable setup.
    pub fn setup(&self) -> &GameSetup {
        &self.setup
    }

    /// The board.
    pub fn board(&self) -> &BoardState {
        &self.board
    }

    /// Seat that moves next.
    pub fn turn(&self) -> Player {
        self.turn
    }

    /// Optimistic-concurrency token.
    pub fn turn_counter(&self) -> u64 {
        self.turn_counter
    }

    /// Lifecycle state.
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Recorded decision, if any.
    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// Line that decided the game, if won.
    pub fn winning_line(&self) -> Option<&Line> {
        self.winning_line.as_ref()
    }

    /// Play mode.
    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    /// Accepted actions in order.
    pub fn history(&self) -> &[TurnEntry] {
        &self.history
    }

    /// Applies `request`, returning the successor record.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] if the counter is stale, the actor does not own
    /// the turn, the move is illegal, or the action is not allowed in the
    /// current state. `self` is never modified.
    #[instrument(
        skip(self, lookup, catalog),
        fields(state = %self.state, turn_counter = self.turn_counter, action = request.action().name())
    )]
    pub fn apply(
        &self,
        request: &ActionRequest,
        lookup: &dyn EntityLookup,
        catalog: &FormationCatalog,
    ) -> Result<Transition, Rejection> {
        CounterIsCurrent::check(*request.turn_counter(), self.turn_counter)?;
        let actor = *request.actor();

        match request.action() {
            action @ (Action::Move { .. } | Action::Skip) => {
                if self.state.is_terminal() {
                    return Err(Rejection::GameOver { state: self.state });
                }
                let ctx = TurnContext {
                    expected_counter: *request.turn_counter(),
                    actual_counter: self.turn_counter,
                    actor,
                    owner: self.turn,
                    mode: self.mode,
                };
                let verdict = match action {
                    Action::Move { cell, entity } => {
                        MoveValidator.validate_move(&self.setup, &self.board, &ctx, *cell, entity, lookup)?;
                        if is_correct(&self.setup, *cell, entity) {
                            Verdict::Correct
                        } else {
                            Verdict::Wrong
                        }
                    }
                    _ => {
                        MoveValidator.validate_skip(&ctx)?;
                        Verdict::Skipped
                    }
                };
                self.play_turn(actor, action, verdict, catalog)
            }
            Action::EndGame => {
                if self.state.is_terminal() {
                    return Err(Rejection::IllegalTransition { state: self.state, action: Action::EndGame.name() });
                }
                Ok(self.meta(actor, Action::EndGame, GameState::Ended))
            }
            Action::PlayOn => {
                if !matches!(self.state, GameState::Decided | GameState::Finished) {
                    return Err(Rejection::IllegalTransition { state: self.state, action: Action::PlayOn.name() });
                }
                Ok(self.meta(actor, Action::PlayOn, GameState::PlayingOn))
            }
        }
    }

    /// Applies an already validated move or skip.
    fn play_turn(
        &self,
        actor: Player,
        action: &Action,
        verdict: Verdict,
        catalog: &FormationCatalog,
    ) -> Result<Transition, Rejection> {
        let mut next = self.clone();
        let player = self.turn;

        if let (Action::Move { cell, entity }, Verdict::Correct) = (action, verdict) {
            next.board.mark_cell(*cell, player, entity.clone())?;
        }

        if next.state == GameState::Initialized {
            next.state = GameState::Running;
        }

        let mut outcome = None;
        let mut award = None;
        if next.state == GameState::Running {
            let lines = catalog.formations(*next.setup.size());
            let result = evaluate(&next.board, &lines);
            match &result {
                Outcome::Win { player: winner, line } => {
                    info!(winner = %winner, %line, "Game decided");
                    next.winner = Some(Winner::Player(*winner));
                    next.winning_line = Some(line.clone());
                    next.state = GameState::Decided;
                    award = Some(*winner);
                }
                Outcome::Draw => {
                    info!("Game drawn");
                    next.winner = Some(Winner::Draw);
                    next.state = GameState::Decided;
                }
                Outcome::Continue => {}
            }
            outcome = Some(result);
        }

        if matches!(next.state, GameState::Decided | GameState::PlayingOn) && next.board.is_full() {
            debug!("Board full");
            next.state = GameState::Finished;
        }

        next.turn = player.opponent();
        next.push_history(actor, player, action.clone(), verdict);
        next.debug_check();

        debug!(%verdict, state = %next.state, turn = %next.turn, "Turn played");
        Ok(Transition { record: next, outcome, award })
    }

    /// Applies a state-only action; the turn does not change.
    fn meta(&self, actor: Player, action: Action, state: GameState) -> Transition {
        let mut next = self.clone();
        info!(from = %self.state, to = %state, "Lifecycle transition");
        next.state = state;
        next.push_history(actor, actor, action, Verdict::Meta);
        next.debug_check();
        Transition { record: next, outcome: None, award: None }
    }

    fn push_history(&mut self, actor: Player, player: Player, action: Action, verdict: Verdict) {
        self.history
            .push(TurnEntry::new(self.turn_counter, actor, player, action, verdict));
        self.turn_counter += 1;
    }

    fn debug_check(&self) {
        debug_assert!(
            RecordInvariants::check_all(self).is_ok(),
            "record invariants violated: {:?}",
            RecordInvariants::check_all(self).err()
        );
    }

    /// Applies `requests` in order starting from `initial`.
    ///
    /// # Errors
    ///
    /// Returns the first [`Rejection`] encountered.
    #[instrument(skip_all, fields(requests = requests.len()))]
    pub fn replay(
        initial: &GameRecord,
        requests: &[ActionRequest],
        lookup: &dyn EntityLookup,
        catalog: &FormationCatalog,
    ) -> Result<GameRecord, Rejection> {
        let mut record = initial.clone();
        for request in requests {
            record = record.apply(request, lookup, catalog)?.record;
        }
        Ok(record)
    }
}
