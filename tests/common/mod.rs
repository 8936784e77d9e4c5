//! Shared fixtures for integration tests.

#![allow(dead_code)]

use gridguess::{
    Category, Difficulty, Entity, EntityCatalog, EntityId, GameRecord, GameService, GameSetup, MemoryStore,
    PlayMode, Player, ServiceConfig, SetupPool, StaticEntitySource, StoredGame,
};
use std::collections::BTreeSet;

/// 3x3 setup: cell (r, c) accepts `E{r}{c}`; row 0 also accepts FR/DE at
/// (0,0), IT at (0,1) and ES at (0,2).
pub fn three_by_three() -> GameSetup {
    let mut primary = vec![vec![BTreeSet::new(); 3]; 3];
    for (r, row) in primary.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            cell.insert(EntityId::new(format!("E{r}{c}")));
        }
    }
    primary[0][0].insert("FR".into());
    primary[0][0].insert("DE".into());
    primary[0][1].insert("IT".into());
    primary[0][2].insert("ES".into());

    let categories = |prefix: &str| {
        (0..3)
            .map(|i| Category::new(format!("{prefix}{i}"), format!("{prefix} {i}")))
            .collect::<Vec<_>>()
    };
    GameSetup::new(
        "en",
        primary,
        vec![vec![BTreeSet::new(); 3]; 3],
        categories("row"),
        categories("col"),
        Difficulty::Medium,
    )
    .expect("valid setup")
}

/// Entity data set covering every answer in [`three_by_three`] plus a few
/// known-but-wrong entities.
pub fn entities() -> StaticEntitySource {
    let mut list: Vec<Entity> = ["FR", "DE", "IT", "ES", "BR", "US"]
        .iter()
        .map(|id| Entity::new((*id).into(), id.to_string()))
        .collect();
    for r in 0..3 {
        for c in 0..3 {
            list.push(Entity::new(EntityId::new(format!("E{r}{c}")), format!("Entity {r}{c}")));
        }
    }
    StaticEntitySource::new().with_language("en", list)
}

pub fn catalog() -> EntityCatalog<StaticEntitySource> {
    EntityCatalog::new(entities(), 2)
}

pub fn stored_game(id: &str, mode: PlayMode, first: Player) -> StoredGame {
    StoredGame::new(
        id.to_string(),
        "session-1".to_string(),
        ["alice".to_string(), "bob".to_string()],
        GameRecord::new(three_by_three(), mode, first),
    )
}

pub type MemoryService = GameService<MemoryStore, EntityCatalog<StaticEntitySource>, SetupPool>;

pub fn memory_service(mode: PlayMode) -> MemoryService {
    GameService::new(
        MemoryStore::new(),
        catalog(),
        SetupPool::new(vec![three_by_three()]),
        ServiceConfig::default().with_play_mode(mode),
    )
}
