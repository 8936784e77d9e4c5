//! The shared board: who claimed each cell and which entity was placed there.

use super::types::{Cell, EntityId, Player};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Error returned when a cell cannot be marked.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum BoardError {
    /// The cell is outside the board.
    #[display("Cell {_0} is outside the board")]
    OutOfBounds(Cell),

    /// The cell is already claimed.
    #[display("Cell {_0} is already occupied")]
    Occupied(Cell),
}

impl std::error::Error for BoardError {}

/// N×N marking grid plus the parallel grid of guessed entities.
///
/// A cell's guess is present exactly when its mark is present, and
/// neither is ever overwritten once set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    size: usize,
    marking: Vec<Vec<Option<Player>>>,
    guesses: Vec<Vec<Option<EntityId>>>,
}

impl BoardState {
    /// Creates a fully unmarked board.
    #[instrument]
    pub fn new(size: usize) -> Self {
        Self { size, marking: vec![vec![None; size]; size], guesses: vec![vec![None; size]; size] }
    }

    /// Board dimension.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Claims `cell` for `player` with the guessed `entity`.
    ///
    /// Both grids are updated together; on error neither is touched.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::OutOfBounds`] or [`BoardError::Occupied`].
    #[instrument(skip(self), fields(size = self.size))]
    pub fn mark_cell(&mut self, cell: Cell, player: Player, entity: EntityId) -> Result<(), BoardError> {
        if !cell.in_bounds(self.size) {
            return Err(BoardError::OutOfBounds(cell));
        }
        if self.is_occupied(cell) {
            return Err(BoardError::Occupied(cell));
        }

        self.marking[cell.row][cell.col] = Some(player);
        self.guesses[cell.row][cell.col] = Some(entity);
        debug!(%cell, %player, "Cell marked");
        Ok(())
    }

    /// Returns true if either grid holds something at `cell`.
    ///
    /// Out-of-bounds cells report as unoccupied.
    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.mark_at(cell).is_some() || self.guess_at(cell).is_some()
    }

    /// Player that claimed `cell`, if any.
    pub fn mark_at(&self, cell: Cell) -> Option<Player> {
        self.marking.get(cell.row).and_then(|row| row.get(cell.col)).copied().flatten()
    }

    /// Entity guessed at `cell`, if any.
    pub fn guess_at(&self, cell: Cell) -> Option<&EntityId> {
        self.guesses
            .get(cell.row)
            .and_then(|row| row.get(cell.col))
            .and_then(Option::as_ref)
    }

    /// Returns true when every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.marking.iter().flatten().all(Option::is_some)
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.marking.iter().flatten().filter(|mark| mark.is_some()).count()
    }

    /// Read-only view of the marking grid.
    pub fn marking(&self) -> &[Vec<Option<Player>>] {
        &self.marking
    }

    /// Read-only view of the guess grid.
    pub fn guesses(&self) -> &[Vec<Option<EntityId>>] {
        &self.guesses
    }

    /// Formats the board as text, one row per line.
    ///
    /// Empty cells show their 1-indexed coordinates.
    pub fn render(&self) -> String {
        let mut rows = Vec::with_capacity(self.size);
        for (r, row) in self.marking.iter().enumerate() {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(c, mark)| match (mark, self.guess_at(Cell::new(r, c))) {
                    (Some(player), Some(entity)) => format!("{}:{}", player.index(), entity),
                    _ => format!("{},{}", r + 1, c + 1),
                })
                .collect();
            rows.push(cells.join(" | "));
        }
        rows.join("\n")
    }
}
