use actix_web::web::Data;
use actix_web::{App, HttpServer};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rusty_pairings::args::{self, CleanArgs};
use rusty_pairings::controller::http_handlers::{SessionRegistry, configure};
use rusty_pairings::model::Player;
use rusty_pairings::rating::{HttpRatingService, LocalRatingService, RatingService};
use rusty_pairings::storage::{RosterStore, SqliteRosterStore};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rusty_pairings=info,actix_web=warn")),
        )
        .init();

    let args = args::args_checks()?;
    let store = init_store(&args)?;
    run_startup_tasks(&args, &store).await?;

    let rating: Arc<dyn RatingService> = match &args.rating_url {
        Some(url) => {
            info!(url = %url, "using remote rating service");
            Arc::new(HttpRatingService::new(url.clone()))
        }
        None => {
            info!("no rating url, computing handicaps in process");
            Arc::new(LocalRatingService::new())
        }
    };
    let store: Arc<dyn RosterStore> = Arc::new(store);
    let registry = Data::new(SessionRegistry::new(
        args.game_config.configs(),
        store,
        rating,
    ));
    info!(bind = %args.bind, games = ?registry.game_ids(), "starting server");

    HttpServer::new(move || App::new().app_data(registry.clone()).configure(configure))
        .bind(args.bind.as_str())?
        .run()
        .await?;
    Ok(())
}

fn init_store(args: &CleanArgs) -> Result<SqliteRosterStore, Box<dyn std::error::Error>> {
    let store = if args.db_name == ":memory:" {
        SqliteRosterStore::open_in_memory()?
    } else {
        SqliteRosterStore::open(&args.db_name)?
    };
    info!(db = %args.db_name, "roster store ready");
    Ok(store)
}

async fn run_startup_tasks(
    args: &CleanArgs,
    store: &SqliteRosterStore,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.db_startup_script.is_some() {
        store.execute_batch(&args.combined_sql_script).await?;
    }

    for game in &args.game_config.games {
        if game.players.is_empty() {
            continue;
        }
        let players: Vec<Player> = game.players.iter().map(Player::from).collect();
        store.seed_players(&game.config.game_id, &players).await?;
        info!(game_id = %game.config.game_id, players = players.len(), "roster seeded");
    }
    Ok(())
}
