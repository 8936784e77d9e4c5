//! Immutable per-game configuration: board size, categories and answer sets.

use super::types::{Category, Cell, Difficulty, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Accepted entities for every cell, row-major.
pub type AnswerGrid = Vec<Vec<BTreeSet<EntityId>>>;

/// Error raised when a setup's dimensions are inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SetupError {
    /// Board size must be at least 1.
    #[display("Board size must be at least 1")]
    EmptyBoard,

    /// A category list does not have one entry per row/column.
    #[display("Expected {expected} {axis} categories, found {found}")]
    CategoryCount {
        /// Which axis ("row" or "column").
        axis: &'static str,
        /// Board size.
        expected: usize,
        /// Number supplied.
        found: usize,
    },

    /// An answer grid is not `size`×`size`.
    #[display("{grid} answer grid is not {size}x{size}")]
    AnswerShape {
        /// Which grid ("primary" or "alternative").
        grid: &'static str,
        /// Board size.
        size: usize,
    },
}

impl std::error::Error for SetupError {}

/// Everything that is fixed for the life of a game.
///
/// Produced by a setup provider and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(try_from = "RawSetup")]
pub struct GameSetup {
    /// Board dimension N.
    size: usize,
    /// Language tag selecting the entity data set.
    language: String,
    /// Primary accepted answers per cell.
    primary_answers: AnswerGrid,
    /// Alternative accepted answers per cell.
    alternative_answers: AnswerGrid,
    /// One category per row.
    row_categories: Vec<Category>,
    /// One category per column.
    column_categories: Vec<Category>,
    /// Difficulty classification.
    difficulty: Difficulty,
}

/// Unvalidated wire form; every deserialized setup goes through [`GameSetup::new`].
#[derive(Deserialize)]
struct RawSetup {
    language: String,
    primary_answers: AnswerGrid,
    #[serde(default)]
    alternative_answers: Option<AnswerGrid>,
    row_categories: Vec<Category>,
    column_categories: Vec<Category>,
    difficulty: Difficulty,
}

impl TryFrom<RawSetup> for GameSetup {
    type Error = SetupError;

    fn try_from(raw: RawSetup) -> Result<Self, Self::Error> {
        let size = raw.primary_answers.len();
        let alternative = raw
            .alternative_answers
            .unwrap_or_else(|| vec![vec![BTreeSet::new(); size]; size]);
        GameSetup::new(
            raw.language,
            raw.primary_answers,
            alternative,
            raw.row_categories,
            raw.column_categories,
            raw.difficulty,
        )
    }
}

impl GameSetup {
    /// Builds a setup, checking that every grid and category list matches the board size.
    ///
    /// The board size is taken from the number of rows in `primary_answers`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if the grids or category lists disagree on the size.
    #[instrument(skip_all, fields(language = %language.as_ref()))]
    pub fn new(
        language: impl AsRef<str>,
        primary_answers: AnswerGrid,
        alternative_answers: AnswerGrid,
        row_categories: Vec<Category>,
        column_categories: Vec<Category>,
        difficulty: Difficulty,
    ) -> Result<Self, SetupError> {
        let size = primary_answers.len();
        if size == 0 {
            return Err(SetupError::EmptyBoard);
        }
        check_shape(&primary_answers, size, "primary")?;
        check_shape(&alternative_answers, size, "alternative")?;
        if row_categories.len() != size {
            return Err(SetupError::CategoryCount { axis: "row", expected: size, found: row_categories.len() });
        }
        if column_categories.len() != size {
            return Err(SetupError::CategoryCount { axis: "column", expected: size, found: column_categories.len() });
        }

        debug!(size, %difficulty, "Game setup validated");
        Ok(Self {
            size,
            language: language.as_ref().to_string(),
            primary_answers,
            alternative_answers,
            row_categories,
            column_categories,
            difficulty,
        })
    }

    /// Returns true if `entity` is an accepted answer for `cell`.
    ///
    /// Only the target cell's primary and alternative sets are consulted.
    /// Out-of-bounds cells accept nothing.
    #[instrument(skip(self), fields(size = self.size))]
    pub fn is_correct(&self, cell: Cell, entity: &EntityId) -> bool {
        let in_grid = |grid: &AnswerGrid| {
            grid.get(cell.row)
                .and_then(|row| row.get(cell.col))
                .is_some_and(|answers| answers.contains(entity))
        };
        in_grid(&self.primary_answers) || in_grid(&self.alternative_answers)
    }
}

fn check_shape(grid: &AnswerGrid, size: usize, name: &'static str) -> Result<(), SetupError> {
    if grid.len() != size || grid.iter().any(|row| row.len() != size) {
        return Err(SetupError::AnswerShape { grid: name, size });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_is_correct_uses_primary_and_alternative() {
        let setup = three_by_three();
        assert!(setup.is_correct(Cell::new(0, 0), &"FR".into()));
        assert!(setup.is_correct(Cell::new(0, 0), &"DE".into()));
        assert!(setup.is_correct(Cell::new(1, 1), &"ALT11".into()));
        assert!(!setup.is_correct(Cell::new(0, 0), &"IT".into()));
    }

    #[test]
    fn test_is_correct_is_cell_specific() {
        let setup = three_by_three();
        let italy = EntityId::from("IT");
        assert!(setup.is_correct(Cell::new(0, 1), &italy));
        assert!(!setup.is_correct(Cell::new(0, 2), &italy));
        assert!(!setup.is_correct(Cell::new(5, 5), &italy));
    }

    #[test]
    fn test_rejects_mismatched_categories() {
        let primary = grid(&[&[&["A"], &["B"]], &[&["C"], &["D"]]]);
        let alternative = vec![vec![BTreeSet::new(); 2]; 2];
        let result = GameSetup::new(
            "en",
            primary,
            alternative,
            categories("row", 3),
            categories("col", 2),
            Difficulty::Medium,
        );
        assert!(matches!(
            result,
            Err(SetupError::CategoryCount { axis: "row", expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_rejects_ragged_grid() {
        let primary = grid(&[&[&["A"], &["B"]], &[&["C"]]]);
        let alternative = vec![vec![BTreeSet::new(); 2]; 2];
        let result = GameSetup::new(
            "en",
            primary,
            alternative,
            categories("row", 2),
            categories("col", 2),
            Difficulty::Hard,
        );
        assert!(matches!(result, Err(SetupError::AnswerShape { grid: "primary", .. })));
    }

    #[test]
    fn test_rejects_empty_board() {
        let result = GameSetup::new("en", Vec::new(), Vec::new(), Vec::new(), Vec::new(), Difficulty::Easy);
        assert_eq!(result, Err(SetupError::EmptyBoard));
    }

    #[test]
    fn test_deserialize_defaults_alternatives_and_validates() {
        let json = r#"{
            "language": "en",
            "primary_answers": [[["A"], ["B"]], [["C"], ["D"]]],
            "row_categories": [{"key": "r0", "label": "R0"}, {"key": "r1", "label": "R1"}],
            "column_categories": [{"key": "c0", "label": "C0"}, {"key": "c1", "label": "C1"}],
            "difficulty": "medium"
        }"#;
        let setup: GameSetup = serde_json::from_str(json).expect("valid setup");
        assert_eq!(*setup.size(), 2);
        assert!(setup.is_correct(Cell::new(1, 1), &"D".into()));

        let bad = json.replace(r#"{"key": "c1", "label": "C1"}"#, "");
        let bad = bad.replace(r#"{"key": "c0", "label": "C0"}, "#, r#"{"key": "c0", "label": "C0"}"#);
        assert!(serde_json::from_str::<GameSetup>(&bad).is_err());
    }
}
