//! Move validation as an ordered chain of preconditions.
//!
//! Each precondition is a small checker; [`MoveValidator`] runs them in a
//! fixed order and the first failure wins:
//!
//! 1. the turn counter is current
//! 2. the actor owns the turn (online play only)
//! 3. the cell is on the board
//! 4. the cell is free
//! 5. the entity exists in the catalog
//!
//! Correctness of a guess is not a precondition. A wrong guess is a legal
//! move that simply marks nothing; see [`is_correct`].

use super::action::Rejection;
use super::board::BoardState;
use super::record::PlayMode;
use super::setup::GameSetup;
use super::types::{Cell, EntityId, Player};
use tracing::{debug, instrument, warn};

/// Error raised by an entity lookup backend.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_new::new)]
#[display("Entity lookup failed for '{language}': {message}")]
pub struct LookupError {
    /// Language/domain tag that was queried.
    pub language: String,
    /// Failure description.
    pub message: String,
}

impl std::error::Error for LookupError {}

/// Read-only view of the external entity catalog.
pub trait EntityLookup {
    /// Returns true if `entity` exists in the data set for `language`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the data set cannot be loaded.
    fn contains(&self, language: &str, entity: &EntityId) -> Result<bool, LookupError>;
}

impl<T: EntityLookup + ?Sized> EntityLookup for &T {
    fn contains(&self, language: &str, entity: &EntityId) -> Result<bool, LookupError> {
        (**self).contains(language, entity)
    }
}

/// Returns true if `entity` is accepted at `cell`.
///
/// Only that cell's primary and alternative answer sets count.
pub fn is_correct(setup: &GameSetup, cell: Cell, entity: &EntityId) -> bool {
    setup.is_correct(cell, entity)
}

/// Precondition: the submitted counter matches the authoritative one.
#[derive(Debug, Clone, Copy)]
pub struct CounterIsCurrent;

impl CounterIsCurrent {
    /// Checks the optimistic-concurrency token.
    #[instrument]
    pub fn check(expected: u64, actual: u64) -> Result<(), Rejection> {
        if expected != actual {
            warn!(expected, actual, "Stale turn counter");
            return Err(Rejection::StaleTurnCounter { expected, actual });
        }
        Ok(())
    }
}

/// Precondition: the actor owns the turn.
#[derive(Debug, Clone, Copy)]
pub struct PlayersTurn;

impl PlayersTurn {
    /// In same-device play either seat may act for the turn owner.
    #[instrument]
    pub fn check(actor: Player, owner: Player, mode: PlayMode) -> Result<(), Rejection> {
        if mode == PlayMode::Online && actor != owner {
            warn!(%actor, %owner, "Player acted out of turn");
            return Err(Rejection::NotYourTurn { player: actor });
        }
        Ok(())
    }
}

/// Precondition: the cell lies on the board.
#[derive(Debug, Clone, Copy)]
pub struct CellInBounds;

impl CellInBounds {
    /// Checks 0-indexed coordinates against the board size.
    #[instrument(skip(board))]
    pub fn check(cell: Cell, board: &BoardState) -> Result<(), Rejection> {
        if !cell.in_bounds(board.size()) {
            return Err(Rejection::OutOfBounds { row: cell.row, col: cell.col });
        }
        Ok(())
    }
}

/// Precondition: nothing is marked or guessed at the cell.
#[derive(Debug, Clone, Copy)]
pub struct CellIsEmpty;

impl CellIsEmpty {
    /// Checks both grids.
    #[instrument(skip(board))]
    pub fn check(cell: Cell, board: &BoardState) -> Result<(), Rejection> {
        if board.is_occupied(cell) {
            return Err(Rejection::CellOccupied { row: cell.row, col: cell.col });
        }
        Ok(())
    }
}

/// Precondition: the entity exists for the game's language.
#[derive(Debug, Clone, Copy)]
pub struct EntityIsKnown;

impl EntityIsKnown {
    /// Consults the injected catalog.
    #[instrument(skip(lookup))]
    pub fn check(language: &str, entity: &EntityId, lookup: &dyn EntityLookup) -> Result<(), Rejection> {
        match lookup.contains(language, entity) {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(%entity, "Entity not in catalog");
                Err(Rejection::UnknownEntity { entity: entity.clone() })
            }
            Err(e) => {
                warn!(error = %e, "Entity catalog unavailable");
                Err(Rejection::LookupUnavailable { reason: e.to_string() })
            }
        }
    }
}

/// Everything the validator needs to judge one submission.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext {
    /// Counter submitted by the caller.
    pub expected_counter: u64,
    /// Authoritative counter.
    pub actual_counter: u64,
    /// Seat of the acting player.
    pub actor: Player,
    /// Seat that owns the turn.
    pub owner: Player,
    /// Whether turn ownership is enforced.
    pub mode: PlayMode,
}

/// Composite validator for turn actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveValidator;

impl MoveValidator {
    /// Validates a skip: counter and turn ownership only.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`Rejection`].
    #[instrument(skip(self))]
    pub fn validate_skip(&self, ctx: &TurnContext) -> Result<(), Rejection> {
        CounterIsCurrent::check(ctx.expected_counter, ctx.actual_counter)?;
        PlayersTurn::check(ctx.actor, ctx.owner, ctx.mode)
    }

    /// Validates a guess at `cell`, running every precondition in order.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`Rejection`].
    #[instrument(skip(self, setup, board, lookup))]
    pub fn validate_move(
        &self,
        setup: &GameSetup,
        board: &BoardState,
        ctx: &TurnContext,
        cell: Cell,
        entity: &EntityId,
        lookup: &dyn EntityLookup,
    ) -> Result<(), Rejection> {
        self.validate_skip(ctx)?;
        CellInBounds::check(cell, board)?;
        CellIsEmpty::check(cell, board)?;
        EntityIsKnown::check(setup.language(), entity, lookup)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::collections::BTreeSet;

    /// Lookup backed by a fixed set of identifiers.
    #[derive(Debug, Default)]
    pub(crate) struct KnownEntities(pub(crate) BTreeSet<EntityId>);

    impl KnownEntities {
        pub(crate) fn of(ids: &[&str]) -> Self {
            Self(ids.iter().map(|id| EntityId::from(*id)).collect())
        }
    }

    impl EntityLookup for KnownEntities {
        fn contains(&self, _language: &str, entity: &EntityId) -> Result<bool, LookupError> {
            Ok(self.0.contains(entity))
        }
    }

    /// Lookup that always fails.
    #[derive(Debug)]
    pub(crate) struct BrokenLookup;

    impl EntityLookup for BrokenLookup {
        fn contains(&self, language: &str, _entity: &EntityId) -> Result<bool, LookupError> {
            Err(LookupError::new(language.to_string(), "offline".to_string()))
        }
    }
}
