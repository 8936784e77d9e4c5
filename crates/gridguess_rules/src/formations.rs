//! Winning line enumeration.
//!
//! A line is a row, a column, or one of the two diagonals. Lines are
//! enumerated in a fixed order (rows, columns, main diagonal,
//! anti-diagonal) so that "the first matching line" is well defined.

use super::types::Cell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, instrument};

/// An ordered set of cells that wins when claimed entirely by one player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Line(Vec<Cell>);

impl Line {
    /// Creates a line from its cells.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self(cells)
    }

    /// Returns the cells of the line in order.
    pub fn cells(&self) -> &[Cell] {
        &self.0
    }

    /// Number of cells in the line.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the line has no cells.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cells: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", cells.join(", "))
    }
}

/// Enumerates every winning line of a `size`×`size` board.
///
/// Boards smaller than 2 have no meaningful win condition and yield no lines.
#[instrument]
pub fn enumerate_formations(size: usize) -> Vec<Line> {
    if size < 2 {
        return Vec::new();
    }

    let mut lines = Vec::with_capacity(2 * size + 2);
    for row in 0..size {
        lines.push(Line((0..size).map(|col| Cell::new(row, col)).collect()));
    }
    for col in 0..size {
        lines.push(Line((0..size).map(|row| Cell::new(row, col)).collect()));
    }
    lines.push(Line((0..size).map(|i| Cell::new(i, i)).collect()));
    lines.push(Line((0..size).map(|i| Cell::new(i, size - 1 - i)).collect()));
    lines
}

/// Memoizing catalog of winning lines, keyed by board size.
///
/// Clones share the same cache.
#[derive(Debug, Clone, Default)]
pub struct FormationCatalog {
    cache: Arc<RwLock<HashMap<usize, Arc<[Line]>>>>,
}

impl FormationCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the winning lines for `size`, computing them on first use.
    #[instrument(skip(self))]
    pub fn formations(&self, size: usize) -> Arc<[Line]> {
        // The cache only ever holds fully built entries, so a poisoned lock is still usable.
        if let Some(lines) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&size)
        {
            return Arc::clone(lines);
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let lines = cache.entry(size).or_insert_with(|| {
            debug!(size, "Enumerating formations");
            enumerate_formations(size).into()
        });
        Arc::clone(lines)
    }

    /// Number of board sizes currently memoized.
    pub fn cached_sizes(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_boards_have_no_lines() {
        assert!(enumerate_formations(0).is_empty());
        assert!(enumerate_formations(1).is_empty());
    }

    #[test]
    fn test_line_counts_and_bounds() {
        for size in [2, 3, 4, 5, 8] {
            let lines = enumerate_formations(size);
            assert_eq!(lines.len(), 2 * size + 2, "size {size}");
            for line in &lines {
                assert_eq!(line.len(), size);
                assert!(line.cells().iter().all(|cell| cell.in_bounds(size)));
            }
        }
    }

    #[test]
    fn test_enumeration_order() {
        let lines = enumerate_formations(3);
        assert_eq!(
            lines[0].cells(),
            &[Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 2)]
        );
        assert_eq!(
            lines[3].cells(),
            &[Cell::new(0, 0), Cell::new(1, 0), Cell::new(2, 0)]
        );
        assert_eq!(
            lines[6].cells(),
            &[Cell::new(0, 0), Cell::new(1, 1), Cell::new(2, 2)]
        );
    }

    #[test]
    fn test_anti_diagonal_stays_in_bounds() {
        for size in [2, 3, 4, 5, 8] {
            let lines = enumerate_formations(size);
            let anti = lines.last().expect("anti-diagonal");
            let expected: Vec<Cell> = (0..size).map(|i| Cell::new(i, size - 1 - i)).collect();
            assert_eq!(anti.cells(), expected.as_slice());
        }
    }

    #[test]
    fn test_catalog_memoizes_per_size() {
        let catalog = FormationCatalog::new();
        let first = catalog.formations(4);
        let second = catalog.clone().formations(4);
        assert!(Arc::ptr_eq(&first, &second));
        catalog.formations(3);
        assert_eq!(catalog.cached_sizes(), 2);
    }
}
