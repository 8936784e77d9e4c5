//! SQLite persistence for game records and session scoreboards.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::DbError;
pub use models::{GameRow, NewGameRow, ScoreRow};
pub use repository::{CasOutcome, GameRepository, MIGRATIONS};
