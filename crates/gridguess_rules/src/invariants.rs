//! First-class invariants over [`GameRecord`].
//!
//! Invariants are checked after every transition in debug builds and
//! whenever a record is deserialized from a snapshot.

use super::action::Action;
use super::board::BoardState;
use super::record::{GameRecord, GameState, Verdict, Winner};
use super::types::Cell;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{description}")]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into() }
    }
}

/// A set of invariants that can be checked together.
///
/// Implemented for tuples of invariants.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

macro_rules! impl_invariant_set {
    ($($inv:ident),+) => {
        impl<S, $($inv),+> InvariantSet<S> for ($($inv,)+)
        where
            $($inv: Invariant<S>,)+
        {
            fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
                let mut violations = Vec::new();
                $(
                    if !<$inv as Invariant<S>>::holds(state) {
                        violations.push(InvariantViolation::new(<$inv as Invariant<S>>::description()));
                    }
                )+
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(violations)
                }
            }
        }
    };
}

impl_invariant_set!(I1, I2);
impl_invariant_set!(I1, I2, I3);
impl_invariant_set!(I1, I2, I3, I4);

/// Invariant: both grids are N×N and a guess is present exactly where a mark is.
pub struct GridsAgree;

impl Invariant<GameRecord> for GridsAgree {
    fn holds(record: &GameRecord) -> bool {
        let board = record.board();
        let size = *record.setup().size();
        let shaped = board.size() == size
            && board.marking().len() == size
            && board.guesses().len() == size
            && board.marking().iter().all(|row| row.len() == size)
            && board.guesses().iter().all(|row| row.len() == size);

        shaped
            && (0..size).all(|r| {
                (0..size).all(|c| {
                    let cell = Cell::new(r, c);
                    board.mark_at(cell).is_some() == board.guess_at(cell).is_some()
                })
            })
    }

    fn description() -> &'static str {
        "Marking and guess grids are square and agree on occupancy"
    }
}

/// Invariant: replaying the correct guesses in history rebuilds the board.
///
/// Cells are never overwritten, so every correct guess must land on an empty cell.
pub struct MonotonicBoard;

impl Invariant<GameRecord> for MonotonicBoard {
    fn holds(record: &GameRecord) -> bool {
        let mut rebuilt = BoardState::new(*record.setup().size());
        for entry in record.history() {
            if let (Action::Move { cell, entity }, Verdict::Correct) = (entry.action(), entry.verdict()) {
                if rebuilt.mark_cell(*cell, *entry.player(), entity.clone()).is_err() {
                    return false;
                }
            }
        }
        rebuilt == *record.board()
    }

    fn description() -> &'static str {
        "Board equals the replay of correct guesses (cells never overwritten)"
    }
}

/// Invariant: the turn counter equals the number of accepted actions.
pub struct CounterMatchesHistory;

impl Invariant<GameRecord> for CounterMatchesHistory {
    fn holds(record: &GameRecord) -> bool {
        let sequential = record
            .history()
            .iter()
            .enumerate()
            .all(|(i, entry)| *entry.turn_counter() == i as u64);
        sequential && record.turn_counter() == record.history().len() as u64
    }

    fn description() -> &'static str {
        "Turn counter equals the number of accepted actions"
    }
}

/// Invariant: the recorded decision is consistent with the lifecycle state and board.
pub struct DecisionConsistent;

impl Invariant<GameRecord> for DecisionConsistent {
    fn holds(record: &GameRecord) -> bool {
        let state_ok = match record.state() {
            GameState::Initialized | GameState::Running => record.winner().is_none(),
            GameState::Decided | GameState::PlayingOn => record.winner().is_some(),
            GameState::Finished => record.winner().is_some() && record.board().is_full(),
            GameState::Ended => true,
        };

        let line_ok = match (record.winner(), record.winning_line()) {
            (Some(Winner::Player(player)), Some(line)) => line
                .cells()
                .iter()
                .all(|cell| record.board().mark_at(*cell) == Some(player)),
            (Some(Winner::Player(_)), None) => false,
            (_, Some(_)) => false,
            (_, None) => true,
        };

        state_ok && line_ok
    }

    fn description() -> &'static str {
        "Winner, winning line and lifecycle state agree"
    }
}

/// All record invariants as a composable set.
pub type RecordInvariants = (GridsAgree, MonotonicBoard, CounterMatchesHistory, DecisionConsistent);
