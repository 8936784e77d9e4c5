//! Win and draw detection.

use super::board::BoardState;
use super::formations::Line;
use super::types::{Cell, Player};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Result of evaluating a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// No decision yet.
    Continue,
    /// Nobody can win any more.
    Draw,
    /// `player` completed `line`.
    Win {
        /// The winning player.
        player: Player,
        /// First completed line in catalog order.
        line: Line,
    },
}

impl Outcome {
    /// Returns true for `Win` and `Draw`.
    pub fn is_decisive(&self) -> bool {
        !matches!(self, Outcome::Continue)
    }
}

/// Player that owns every cell of `line`, if any.
pub fn line_owner(board: &BoardState, line: &Line) -> Option<Player> {
    let (first, rest) = line.cells().split_first()?;
    let owner = board.mark_at(*first)?;
    rest.iter()
        .all(|cell| board.mark_at(*cell) == Some(owner))
        .then_some(owner)
}

/// Returns true if both players already hold a cell of `line`.
pub fn is_blocked(board: &BoardState, line: &Line) -> bool {
    let marks = |player| {
        line.cells()
            .iter()
            .any(|cell: &Cell| board.mark_at(*cell) == Some(player))
    };
    marks(Player::First) && marks(Player::Second)
}

/// Evaluates `board` against the winning `lines`.
///
/// - Exactly one player owning at least one line wins, with the first such
///   line in catalog order.
/// - Lines owned by both players at once are ambiguous and yield
///   [`Outcome::Continue`].
/// - A full board, or a board on which every line is blocked, is a draw.
#[instrument(skip_all, fields(size = board.size(), lines = lines.len()))]
pub fn evaluate(board: &BoardState, lines: &[Line]) -> Outcome {
    let matches: Vec<(Player, &Line)> = lines
        .iter()
        .filter_map(|line| line_owner(board, line).map(|player| (player, line)))
        .collect();

    if let Some((player, line)) = matches.first() {
        let winners: BTreeSet<Player> = matches.iter().map(|(p, _)| *p).collect();
        if winners.len() > 1 {
            debug!(matches = matches.len(), "Both players own a line; no decision");
            return Outcome::Continue;
        }
        debug!(%player, %line, "Winning line found");
        return Outcome::Win { player: *player, line: (*line).clone() };
    }

    if board.is_full() {
        debug!("Board full without a winner");
        return Outcome::Draw;
    }

    if !lines.is_empty() && lines.iter().all(|line| is_blocked(board, line)) {
        debug!("Every line blocked; dead position");
        return Outcome::Draw;
    }

    Outcome::Continue
}
