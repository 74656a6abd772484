use clap::Parser;

use crate::args::game_file::GameFile;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Sqlite file holding the rosters. `:memory:` keeps everything in memory.
    #[arg(short = 'n', long, value_name = "DATABASE_NAME")]
    pub db_name: String,
    /// If specified, this sql is run on program startup. Separate several files with `;`.
    #[arg(long, value_name = "DATABASE_STARTUP_SCRIPT", value_parser = crate::args::validation::check_readable_file)]
    pub db_startup_script: Option<String>,
    /// Toml file with one `[[games]]` table per game.
    #[arg(
        short = 'g',
        long,
        value_name = "GAME_CONFIG",
        value_parser = crate::args::validation::check_game_file
    )]
    pub game_config: GameFile,
    /// Base url of the rating service. Handicaps are computed in process when absent.
    #[arg(long, value_name = "RATING_URL", value_parser = crate::args::validation::check_rating_url)]
    pub rating_url: Option<String>,
    #[arg(
        short = 'b',
        long,
        value_name = "BIND",
        default_value = "0.0.0.0:5201",
        value_parser = crate::args::validation::check_bind_addr
    )]
    pub bind: String,
}

#[derive(Debug, Clone)]
pub struct CleanArgs {
    pub db_name: String,
    pub db_startup_script: Option<String>,
    pub combined_sql_script: String,
    pub game_config: GameFile,
    pub rating_url: Option<String>,
    pub bind: String,
}
