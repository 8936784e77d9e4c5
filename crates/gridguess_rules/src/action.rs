//! First-class action types.
//!
//! Wire actions are converted once at the boundary ([`WireAction::into_action`])
//! and are never re-interpreted deeper in the engine.

use super::record::GameState;
use super::types::{Cell, EntityId, Player};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// An action as submitted by a client, with 1-indexed coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireAction {
    /// Place `entity` at row `x`, column `y` (both 1-indexed).
    Move {
        /// 1-indexed row.
        x: usize,
        /// 1-indexed column.
        y: usize,
        /// Guessed entity.
        entity: EntityId,
    },
    /// Pass the turn without guessing.
    Skip,
    /// Terminate the game early.
    EndGame,
    /// Keep playing after a decision.
    PlayOn,
}

impl WireAction {
    /// Converts wire coordinates to a 0-indexed engine action.
    ///
    /// A zero coordinate wraps to `usize::MAX`, an index no board contains,
    /// so bounds are judged by the validator after the counter and turn
    /// checks.
    #[instrument]
    pub fn into_action(self) -> Action {
        match self {
            WireAction::Move { x, y, entity } => Action::Move {
                cell: Cell::new(x.wrapping_sub(1), y.wrapping_sub(1)),
                entity,
            },
            WireAction::Skip => Action::Skip,
            WireAction::EndGame => Action::EndGame,
            WireAction::PlayOn => Action::PlayOn,
        }
    }
}

/// An engine action with 0-indexed coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    /// Guess `entity` for `cell`.
    Move {
        /// Target cell.
        cell: Cell,
        /// Guessed entity.
        entity: EntityId,
    },
    /// Pass the turn.
    Skip,
    /// Terminate the game early.
    EndGame,
    /// Continue after a decision.
    PlayOn,
}

impl Action {
    /// Returns true for actions that consume the acting player's turn.
    pub fn is_turn_action(&self) -> bool {
        matches!(self, Action::Move { .. } | Action::Skip)
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// An action together with who submitted it and the counter they observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new, derive_getters::Getters)]
pub struct ActionRequest {
    /// Seat of the acting player.
    actor: Player,
    /// Turn counter the actor believes is current.
    turn_counter: u64,
    /// What to do.
    action: Action,
}

/// Error taxonomy shared by the engine and its callers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing request fields.
    InvalidRequest,
    /// Unknown game, session, user or entity.
    NotFound,
    /// Turn-ownership or authorization violation.
    Forbidden,
    /// Stale turn counter.
    Conflict,
    /// Occupied cell, out-of-range coordinates or an action illegal in the current state.
    IllegalMove,
    /// Entity catalog or setup provider unavailable.
    UpstreamUnavailable,
    /// Persistence backend failure.
    Storage,
}

/// Reason an action was rejected. A rejected action changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum Rejection {
    /// The submitted counter is not the current one.
    #[display("Stale turn counter: submitted {expected}, current {actual}")]
    StaleTurnCounter {
        /// Counter the caller submitted.
        expected: u64,
        /// Authoritative counter.
        actual: u64,
    },

    /// The actor does not own the turn.
    #[display("It is not {player}'s turn")]
    NotYourTurn {
        /// The player who tried to act.
        player: Player,
    },

    /// Coordinates outside the board. Messages use the 1-indexed wire form.
    #[display("Cell ({}, {}) is outside the board", row.wrapping_add(1), col.wrapping_add(1))]
    OutOfBounds {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
    },

    /// The cell is already claimed. Messages use the 1-indexed wire form.
    #[display("Cell ({}, {}) is already occupied", row.wrapping_add(1), col.wrapping_add(1))]
    CellOccupied {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
    },

    /// The entity is not in the catalog for the game's language.
    #[display("Unknown entity {entity}")]
    UnknownEntity {
        /// The submitted entity.
        entity: EntityId,
    },

    /// The entity catalog could not be consulted.
    #[display("Entity lookup unavailable: {reason}")]
    LookupUnavailable {
        /// Underlying failure.
        reason: String,
    },

    /// Turn actions are not accepted in this state.
    #[display("Game is over ({state})")]
    GameOver {
        /// Current lifecycle state.
        state: GameState,
    },

    /// A meta-action that is not legal from the current state.
    #[display("Cannot {action} while {state}")]
    IllegalTransition {
        /// Current lifecycle state.
        state: GameState,
        /// Attempted action name.
        action: &'static str,
    },
}

impl std::error::Error for Rejection {}

impl Rejection {
    /// Maps the rejection onto the shared error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Rejection::StaleTurnCounter { .. } => ErrorKind::Conflict,
            Rejection::NotYourTurn { .. } => ErrorKind::Forbidden,
            Rejection::OutOfBounds { .. }
            | Rejection::CellOccupied { .. }
            | Rejection::GameOver { .. }
            | Rejection::IllegalTransition { .. } => ErrorKind::IllegalMove,
            Rejection::UnknownEntity { .. } => ErrorKind::NotFound,
            Rejection::LookupUnavailable { .. } => ErrorKind::UpstreamUnavailable,
        }
    }
}
