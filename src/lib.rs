//! gridguess service library
//!
//! Hosts the rules engine from `gridguess_rules` behind a small service
//! layer: seats and stored games, optimistic-concurrency persistence, a
//! per-session scoreboard, a cached entity catalog and setup selection.
//!
//! # Architecture
//!
//! - **Service**: turns [`Submission`]s into validated, persisted transitions
//! - **Session**: stored games, seat resolution, the [`GameStore`] and [`Scoreboard`] seams
//! - **Catalog**: read-through entity cache implementing [`EntityLookup`]
//! - **Setup pool**: random setup selection
//! - **Db**: SQLite storage via diesel
//!
//! # Example
//!
//! ```no_run
//! use gridguess::{EntityCatalog, GameData, GameService, MemoryStore, NewGame, ServiceConfig};
//!
//! # fn example() -> Result<(), gridguess::GameError> {
//! let (entities, setups) = GameData::from_file("demos/gridguess_data.json")?.into_parts();
//! let config = ServiceConfig::default();
//! let catalog = EntityCatalog::new(entities, *config.catalog_capacity());
//! let service = GameService::new(MemoryStore::new(), catalog, setups, config);
//!
//! let game = service.create_game(NewGame::new("session-1".into(), ["alice".into(), "bob".into()]))?;
//! println!("{}", game.record().board().render());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod catalog;
mod config;
mod error;
mod service;
mod session;
mod setup_pool;

/// SQLite persistence.
pub mod db;

// Crate-level exports - Service
pub use service::{ActionResponse, GameService, NewGame, Submission};

// Crate-level exports - Stored games and persistence seams
pub use session::{GameId, GameStore, MemoryStore, Scoreboard, SessionId, StoredGame, UserId};

// Crate-level exports - Entity catalog
pub use catalog::{Entity, EntityCatalog, EntitySource, StaticEntitySource};

// Crate-level exports - Setups
pub use setup_pool::{GameData, SetupPool, SetupProvider};

// Crate-level exports - Configuration and errors
pub use config::{CONFIG_ENV, ConfigError, ServiceConfig};
pub use error::GameError;

// Crate-level exports - Rules engine
pub use gridguess_rules::{
    Action, ActionRequest, BoardState, Category, Cell, Difficulty, EntityId, EntityLookup, ErrorKind, FormationCatalog,
    GameRecord, GameSetup, GameState, Line, LookupError, Outcome, PlayMode, Player, Rejection, Transition,
    Verdict, Winner, WireAction,
};
