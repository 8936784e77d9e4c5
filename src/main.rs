//! gridguess - unified CLI
//!
//! Creates games, submits actions and inspects stored state.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use cli::{Cli, Command};
use gridguess::db::GameRepository;
use gridguess::{
    Difficulty, EntityCatalog, FormationCatalog, GameData, GameService, GameStore, NewGame, PlayMode, Player,
    Scoreboard, ServiceConfig, SetupPool, StaticEntitySource, StoredGame, Submission, WireAction,
};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

type Service = GameService<GameRepository, EntityCatalog<StaticEntitySource>, SetupPool>;

fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    if let Some(db_path) = cli.db_path {
        config = config.with_db_path(db_path);
    }

    match cli.command {
        Command::Formations { size } => {
            print_formations(size);
            Ok(())
        }
        Command::InitDb => init_db(&config),
        Command::NewGame { session, first_seat, second_seat, game_id, language, difficulty, mode, first } => {
            let mut request = NewGame::new(session, [first_seat, second_seat]);
            request.game_id = game_id;
            request.language = language;
            request.difficulty = difficulty
                .map(|d| d.parse::<Difficulty>())
                .transpose()
                .map_err(|e| anyhow!("Invalid difficulty: {}", e))?;
            request.mode = mode
                .map(|m| m.parse::<PlayMode>())
                .transpose()
                .map_err(|e| anyhow!("Invalid mode: {}", e))?;
            let first = first
                .map(|index| {
                    Player::from_index(usize::from(index)).ok_or_else(|| anyhow!("First player must be 0 or 1"))
                })
                .transpose()?;

            let service = build_service(&cli.data, config)?;
            let game = match first {
                Some(first) => service.create_game_with(request, first)?,
                None => service.create_game(request)?,
            };
            print_game(&game);
            Ok(())
        }
        Command::Submit { game_id, user, counter, action } => {
            let action: WireAction = serde_json::from_str(&action).context("Failed to parse action JSON")?;
            let service = build_service(&cli.data, config)?;
            let response = service.submit(&game_id, Submission::new(Some(user), Some(counter), Some(action)))?;
            print_game(response.game());
            Ok(())
        }
        Command::Show { game_id, json } => {
            let repository = GameRepository::new(config.db_path().clone())?;
            let game = repository.load_game(&game_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&game)?);
            } else {
                print_game(&game);
            }
            Ok(())
        }
        Command::Scores { session } => {
            let repository = GameRepository::new(config.db_path().clone())?;
            let [first, second] = repository.scores(&session)?;
            println!("session {}: player 0 {} - player 1 {}", session, first, second);
            Ok(())
        }
        Command::Replay { game_id } => {
            let service = build_service(&cli.data, config)?;
            if service.verify_replay(&game_id)? {
                println!("replay of {} matches the stored record", game_id);
                Ok(())
            } else {
                Err(anyhow!("Replay of {} diverged from the stored record", game_id))
            }
        }
    }
}

/// Wires the repository, catalog and setup pool together.
#[instrument(skip(config))]
fn build_service(data: &std::path::Path, config: ServiceConfig) -> Result<Service> {
    let (entities, setups) = GameData::from_file(data)?.into_parts();
    let repository = GameRepository::new(config.db_path().clone())?;
    repository.run_migrations()?;
    let catalog = EntityCatalog::new(entities, *config.catalog_capacity());
    info!(setups = setups.len(), "Service ready");
    Ok(GameService::new(repository, catalog, setups, config))
}

#[instrument(skip(config))]
fn init_db(config: &ServiceConfig) -> Result<()> {
    let repository = GameRepository::new(config.db_path().clone())?;
    let applied = repository.run_migrations()?;
    println!("database {} ready ({} migrations applied)", config.db_path(), applied);
    Ok(())
}

fn print_formations(size: usize) {
    let formations = FormationCatalog::new().formations(size);
    println!("{} winning lines for a {}x{} board", formations.len(), size, size);
    for line in formations.iter() {
        println!("  {}", line);
    }
}

fn print_game(game: &StoredGame) {
    let record = game.record();
    println!("game {} (session {})", game.id(), game.session_id());
    println!(
        "state: {}  turn: {}  counter: {}  mode: {}",
        record.state(),
        record.turn(),
        record.turn_counter(),
        record.mode()
    );
    if let Some(winner) = record.winner() {
        println!("result: {}", winner);
    }
    if let Some(line) = record.winning_line() {
        println!("winning line: {}", line);
    }
    println!();
    println!("{}", record.board().render());
}
