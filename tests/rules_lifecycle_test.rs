//! Tests for the rules engine lifecycle through the public API.

mod common;

use common::{catalog, three_by_three};
use gridguess::{
    Action, ActionRequest, Cell, FormationCatalog, GameRecord, GameState, Outcome, PlayMode, Player, Verdict, Winner,
};

fn correct(record: &GameRecord, row: usize, col: usize) -> ActionRequest {
    ActionRequest::new(
        record.turn(),
        record.turn_counter(),
        Action::Move {
            cell: Cell::new(row, col),
            entity: format!("E{row}{col}").as_str().into(),
        },
    )
}

#[test]
fn test_formation_counts() {
    let formations = FormationCatalog::new();
    for size in [2, 3, 4, 5, 8] {
        let lines = formations.formations(size);
        assert_eq!(lines.len(), 2 * size + 2, "size {size}");
        assert!(lines.iter().all(|line| line.len() == size));
    }
    assert!(formations.formations(1).is_empty());
    assert_eq!(formations.cached_sizes(), 6);
}

#[test]
fn test_anti_diagonal_is_last() {
    let lines = FormationCatalog::new().formations(4);
    let anti = lines.last().expect("has lines");
    let cells: Vec<Cell> = (0..4).map(|i| Cell::new(i, 3 - i)).collect();
    assert_eq!(anti.cells(), cells.as_slice());
}

#[test]
fn test_full_board_draw_finishes() {
    let formations = FormationCatalog::new();
    let lookup = catalog();
    let mut record = GameRecord::new(three_by_three(), PlayMode::Online, Player::First);

    // X O X / X O O / O X X with X moving first.
    let order = [(0, 0), (1, 1), (0, 2), (0, 1), (2, 1), (1, 2), (1, 0), (2, 0), (2, 2)];
    let mut last = None;
    for (row, col) in order {
        let transition = record
            .apply(&correct(&record, row, col), &lookup, &formations)
            .expect("accepted");
        assert!(transition.award.is_none(), "no one wins a draw");
        last = transition.outcome;
        record = transition.record;
    }

    assert!(record.board().is_full());
    assert_eq!(record.state(), GameState::Finished);
    assert_eq!(record.winner(), Some(Winner::Draw));
    assert!(record.winning_line().is_none());
    // Bookkeeping froze once the draw was recorded.
    assert_ne!(last, Some(Outcome::Continue));
}

#[test]
fn test_history_records_verdicts() {
    let formations = FormationCatalog::new();
    let lookup = catalog();
    let record = GameRecord::new(three_by_three(), PlayMode::Online, Player::Second);

    let record = record
        .apply(&correct(&record, 1, 1), &lookup, &formations)
        .expect("correct")
        .record;
    let wrong = ActionRequest::new(
        Player::First,
        1,
        Action::Move { cell: Cell::new(0, 0), entity: "US".into() },
    );
    let record = record.apply(&wrong, &lookup, &formations).expect("wrong").record;
    let skip = ActionRequest::new(Player::Second, 2, Action::Skip);
    let record = record.apply(&skip, &lookup, &formations).expect("skip").record;
    let end = ActionRequest::new(Player::Second, 3, Action::EndGame);
    let record = record.apply(&end, &lookup, &formations).expect("end").record;

    let verdicts: Vec<Verdict> = record.history().iter().map(|entry| *entry.verdict()).collect();
    assert_eq!(verdicts, vec![Verdict::Correct, Verdict::Wrong, Verdict::Skipped, Verdict::Meta]);
    assert_eq!(record.turn_counter(), 4);
    assert_eq!(record.state(), GameState::Ended);
}

#[test]
fn test_snapshot_round_trip_replays_identically() {
    let formations = FormationCatalog::new();
    let lookup = catalog();
    let initial = GameRecord::new(three_by_three(), PlayMode::SameDevice, Player::First);

    let mut record = initial.clone();
    let mut requests = Vec::new();
    for (row, col) in [(0, 0), (2, 2), (0, 1), (1, 1), (0, 2)] {
        let request = correct(&record, row, col);
        record = record.apply(&request, &lookup, &formations).expect("accepted").record;
        requests.push(request);
    }
    assert_eq!(record.state(), GameState::Decided);

    let json = serde_json::to_string(&record).expect("serialize");
    let restored: GameRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored, record);

    let replayed = GameRecord::replay(&initial, &requests, &lookup, &formations).expect("replay");
    assert_eq!(replayed, restored);
}
