//! Tests for database repository operations.

mod common;

use diesel::{Connection, RunQueryDsl, SqliteConnection};
use diesel_migrations::MigrationHarness;
use tempfile::NamedTempFile;

use common::{catalog, stored_game, three_by_three};
use gridguess::db::{CasOutcome, GameRepository, MIGRATIONS};
use gridguess::{
    Action, ActionRequest, Cell, ErrorKind, FormationCatalog, GameService, GameState, GameStore, NewGame, PlayMode,
    Player, Scoreboard, ServiceConfig, SetupPool, Submission, WireAction,
};

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, GameRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let mut conn = SqliteConnection::establish(&db_path).expect("Failed to connect");
    conn.run_pending_migrations(MIGRATIONS).expect("Migrations failed");

    let repo = GameRepository::new(db_path).expect("Failed to create repository");
    (db_file, repo)
}

fn raw_connection(db: &NamedTempFile) -> SqliteConnection {
    SqliteConnection::establish(db.path().to_str().expect("Invalid path")).expect("Failed to connect")
}

#[test]
fn test_empty_path_rejected() {
    assert!(GameRepository::new("  ".to_string()).is_err());
}

#[test]
fn test_run_migrations_is_idempotent() {
    let (_db, repo) = setup_test_db();
    assert_eq!(repo.run_migrations().expect("Migrations failed"), 0);
}

#[test]
fn test_insert_and_find_game() {
    let (_db, repo) = setup_test_db();
    let game = stored_game("g1", PlayMode::Online, Player::First);

    assert!(repo.insert_game(&game).expect("Insert failed"));
    let found = repo.find_game("g1").expect("Query failed");
    assert_eq!(found, Some(game));
}

#[test]
fn test_insert_duplicate_id() {
    let (_db, repo) = setup_test_db();
    let game = stored_game("g1", PlayMode::Online, Player::First);
    assert!(repo.insert_game(&game).expect("Insert failed"));
    assert!(!repo.insert_game(&game).expect("Insert failed"));

    let err = GameStore::insert_game(&repo, &game).expect_err("Duplicate should conflict");
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[test]
fn test_find_game_not_found() {
    let (_db, repo) = setup_test_db();
    assert!(repo.find_game("nope").expect("Query failed").is_none());
    let err = repo.load_game("nope").expect_err("Missing game");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_compare_and_swap() {
    let (_db, repo) = setup_test_db();
    let game = stored_game("g1", PlayMode::Online, Player::First);
    repo.insert_game(&game).expect("Insert failed");

    let request = ActionRequest::new(
        Player::First,
        0,
        Action::Move { cell: Cell::new(0, 0), entity: "FR".into() },
    );
    let transition = game
        .record()
        .apply(&request, &catalog(), &FormationCatalog::new())
        .expect("Move accepted");
    let moved = game.with_record(transition.record);

    assert_eq!(repo.compare_and_swap(&moved, 0, None).expect("Save failed"), CasOutcome::Saved);
    assert_eq!(
        repo.compare_and_swap(&moved, 0, None).expect("Save failed"),
        CasOutcome::Stale { current: 1 }
    );

    let err = repo.save_game(&moved, 0).expect_err("Stale save");
    assert!(err.is_conflict());

    let stored = repo.load_game("g1").expect("Load failed");
    assert_eq!(stored.record().turn_counter(), 1);
    assert_eq!(stored.record().board().mark_at(Cell::new(0, 0)), Some(Player::First));
}

#[test]
fn test_compare_and_swap_missing_game() {
    let (_db, repo) = setup_test_db();
    let game = stored_game("ghost", PlayMode::Online, Player::First);
    assert_eq!(repo.compare_and_swap(&game, 0, None).expect("Save failed"), CasOutcome::Missing);
    assert_eq!(repo.save_game(&game, 0).expect_err("Missing").kind, ErrorKind::NotFound);
}

#[test]
fn test_tampered_row_rejected() {
    let (db, repo) = setup_test_db();
    repo.insert_game(&stored_game("g1", PlayMode::Online, Player::First))
        .expect("Insert failed");

    let mut conn = raw_connection(&db);
    diesel::sql_query("UPDATE games SET turn_counter = 7 WHERE id = 'g1'")
        .execute(&mut conn)
        .expect("Update failed");

    let err = repo.find_game("g1").expect_err("Counter mismatch");
    assert!(err.message.contains("disagrees"));
}

#[test]
fn test_inconsistent_snapshot_rejected() {
    let (db, repo) = setup_test_db();
    repo.insert_game(&stored_game("g1", PlayMode::Online, Player::First))
        .expect("Insert failed");

    let mut conn = raw_connection(&db);
    diesel::sql_query("UPDATE games SET snapshot = replace(snapshot, '\"size\":3', '\"size\":5') WHERE id = 'g1'")
        .execute(&mut conn)
        .expect("Update failed");

    let err = repo.load_game("g1").expect_err("Board size disagrees with grids");
    assert_eq!(err.kind, ErrorKind::Storage);
    assert!(err.message.contains("Corrupt snapshot"));
}

#[test]
fn test_scores_start_at_zero() {
    let (_db, repo) = setup_test_db();
    assert_eq!(repo.session_scores("s1").expect("Query failed"), [0, 0]);
}

#[test]
fn test_add_point_upserts() {
    let (_db, repo) = setup_test_db();
    assert_eq!(repo.add_point("s1", Player::First).expect("Add failed"), 1);
    assert_eq!(repo.add_point("s1", Player::First).expect("Add failed"), 2);
    assert_eq!(repo.add_point("s1", Player::Second).expect("Add failed"), 1);
    assert_eq!(repo.add_point("s2", Player::Second).expect("Add failed"), 1);

    assert_eq!(repo.scores("s1").expect("Query failed"), [2, 1]);
    assert_eq!(repo.scores("s2").expect("Query failed"), [0, 1]);
}

#[test]
fn test_award_commits_with_the_swap() {
    let (_db, repo) = setup_test_db();
    let game = stored_game("g1", PlayMode::Online, Player::First);
    repo.insert_game(&game).expect("Insert failed");
    let request = ActionRequest::new(Player::First, 0, Action::Skip);
    let transition = game
        .record()
        .apply(&request, &catalog(), &FormationCatalog::new())
        .expect("Skip accepted");
    let moved = game.with_record(transition.record);

    assert_eq!(
        repo.compare_and_swap(&moved, 0, Some(Player::Second)).expect("Save failed"),
        CasOutcome::Saved
    );
    assert_eq!(repo.scores("session-1").expect("Query failed"), [0, 1]);

    // A lost race must not score.
    assert_eq!(
        repo.compare_and_swap(&moved, 0, Some(Player::Second)).expect("Save failed"),
        CasOutcome::Stale { current: 1 }
    );
    assert_eq!(repo.scores("session-1").expect("Query failed"), [0, 1]);
}

#[test]
fn test_failed_score_write_rolls_back_the_win() {
    let (db, repo) = setup_test_db();
    let mut conn = raw_connection(&db);
    diesel::sql_query("DROP TABLE scores").execute(&mut conn).expect("Drop failed");

    let service =
        GameService::new(repo, catalog(), SetupPool::new(vec![three_by_three()]), ServiceConfig::default());
    let mut request = NewGame::new("session-1".to_string(), ["alice".to_string(), "bob".to_string()]);
    request.game_id = Some("g1".to_string());
    service.create_game_with(request, Player::First).expect("Create failed");

    // Player 0 takes the top row on the fifth action.
    let moves = [("alice", 1, 1, "FR"), ("bob", 2, 2, "E11"), ("alice", 1, 2, "IT"), ("bob", 3, 3, "E22")];
    for (counter, (user, x, y, entity)) in moves.into_iter().enumerate() {
        let action = WireAction::Move { x, y, entity: entity.into() };
        let submission = Submission::new(Some(user.to_string()), Some(counter as u64), Some(action));
        service.submit("g1", submission).expect("Move accepted");
    }

    let winning = WireAction::Move { x: 1, y: 3, entity: "ES".into() };
    let err = service
        .submit("g1", Submission::new(Some("alice".to_string()), Some(4), Some(winning)))
        .expect_err("Score table is gone");
    assert_eq!(err.kind, ErrorKind::Storage);

    let stored = service.game("g1").expect("Load failed");
    assert_eq!(stored.record().turn_counter(), 4);
    assert_eq!(stored.record().state(), GameState::Running);
    assert!(stored.record().winner().is_none());
}
