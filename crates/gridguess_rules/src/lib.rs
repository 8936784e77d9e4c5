//! Rules engine for gridguess, a two-player country-grid guessing game.
//!
//! Players take turns naming an entity for a cell; a guess only claims the
//! cell if the entity satisfies that cell's row and column categories.
//! Claiming a full row, column or diagonal wins.
//!
//! # Architecture
//!
//! - **Formations**: winning lines per board size, memoized
//! - **Board**: marking and guess grids
//! - **Contracts**: ordered move preconditions
//! - **Outcome**: win / draw / continue evaluation
//! - **Record**: lifecycle state machine with turn-counter concurrency
//! - **Invariants**: record-level properties checked after every transition
//!
//! The engine performs no I/O. Entity lookup is injected through
//! [`EntityLookup`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod board;
mod contracts;
mod formations;
mod invariants;
mod outcome;
mod record;
mod setup;
mod types;

pub use action::{Action, ActionRequest, ErrorKind, Rejection, WireAction};
pub use board::{BoardError, BoardState};
pub use contracts::{
    CellInBounds, CellIsEmpty, CounterIsCurrent, EntityIsKnown, EntityLookup, LookupError, MoveValidator,
    PlayersTurn, TurnContext, is_correct,
};
pub use formations::{FormationCatalog, Line, enumerate_formations};
pub use invariants::{
    CounterMatchesHistory, DecisionConsistent, GridsAgree, Invariant, InvariantSet, InvariantViolation,
    MonotonicBoard, RecordInvariants,
};
pub use outcome::{Outcome, evaluate, is_blocked, line_owner};
pub use record::{GameRecord, GameState, PlayMode, Transition, TurnEntry, Verdict, Winner};
pub use setup::{AnswerGrid, GameSetup, SetupError};
pub use types::{Category, Cell, Difficulty, EntityId, Player};
