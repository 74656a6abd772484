use anyhow::Result;
use clap::Parser;
use std::fs;
use tracing::warn;

pub mod game_file;
pub mod types;
pub mod validation;

pub use game_file::{GameEntry, GameFile, SeedPlayer, load_game_file, parse_game_file};
pub use types::{Args, CleanArgs};

/// Parse the command line and read the startup scripts.
///
/// # Errors
///
/// Will return `Err` if the startup scripts cannot be read.
pub fn args_checks() -> Result<CleanArgs> {
    CleanArgs::new(Args::parse())
}

impl CleanArgs {
    /// # Errors
    ///
    /// Will return `Err` if none of the startup scripts could be read.
    pub fn new(args: Args) -> Result<Self> {
        let mut combined_sql_script = String::new();
        if let Some(scripts) = &args.db_startup_script {
            for file in scripts.split(';').map(str::trim).filter(|f| !f.is_empty()) {
                match fs::read_to_string(file) {
                    Ok(script) => {
                        combined_sql_script.push_str(&script);
                        combined_sql_script.push('\n');
                    }
                    Err(e) => warn!(file, error = %e, "failed to read sql startup script"),
                }
            }
            if combined_sql_script.is_empty() {
                anyhow::bail!("none of the sql startup scripts '{scripts}' could be read");
            }
        }
        Ok(CleanArgs {
            db_name: args.db_name,
            db_startup_script: args.db_startup_script,
            combined_sql_script,
            game_config: args.game_config,
            rating_url: args.rating_url,
            bind: args.bind,
        })
    }
}
