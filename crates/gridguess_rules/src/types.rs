//! Core domain types shared across the rules engine.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// One of the two seats in a game.
///
/// Serialized as the player index (`0` or `1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Player {
    /// Player index 0.
    First,
    /// Player index 1.
    Second,
}

impl Player {
    /// Both players in index order.
    pub const ALL: [Player; 2] = [Player::First, Player::Second];

    /// Returns the opponent player.
    pub fn opponent(self) -> Self {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }

    /// Returns the player index (0 or 1).
    pub fn index(self) -> usize {
        match self {
            Player::First => 0,
            Player::Second => 1,
        }
    }

    /// Looks up a player by index.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Player::First),
            1 => Some(Player::Second),
            _ => None,
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player {}", self.index())
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> Self {
        match player {
            Player::First => 0,
            Player::Second => 1,
        }
    }
}

impl TryFrom<u8> for Player {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Player::from_index(usize::from(value)).ok_or_else(|| format!("invalid player index {value}"))
    }
}

/// A (row, column) position on the board, 0-indexed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_new::new,
    derive_more::Display,
)]
#[display("({row}, {col})")]
pub struct Cell {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl Cell {
    /// Returns true if the cell lies on an `size`×`size` board.
    pub fn in_bounds(&self, size: usize) -> bool {
        self.row < size && self.col < size
    }
}

/// Identifier of a guessable entity (for example an ISO country code).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an entity identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Difficulty classification of a game setup.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Difficulty {
    /// Well-known categories.
    Easy,
    /// Mixed categories.
    Medium,
    /// Obscure categories.
    Hard,
}

/// Describes a row or column category (e.g. "borders Germany").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct Category {
    /// Stable category key.
    key: String,
    /// Human readable description.
    label: String,
}

impl Category {
    /// Creates a category descriptor.
    #[instrument(skip_all, fields(key = %key.as_ref()))]
    pub fn new(key: impl AsRef<str>, label: impl Into<String>) -> Self {
        Self { key: key.as_ref().to_string(), label: label.into() }
    }
}
