use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::model::{GameConfig, Player};

/// A golfer to put on a game's roster at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedPlayer {
    pub ghin: String,
    pub name: String,
    #[serde(default)]
    pub handicap_index: Option<f32>,
}

impl From<&SeedPlayer> for Player {
    fn from(seed: &SeedPlayer) -> Self {
        Player::new(seed.ghin.clone(), seed.name.clone(), seed.handicap_index)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameEntry {
    #[serde(flatten)]
    pub config: GameConfig,
    #[serde(default)]
    pub players: Vec<SeedPlayer>,
}

/// Contents of the `--game-config` toml: one `[[games]]` table per game.
#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub games: Vec<GameEntry>,
}

impl GameFile {
    #[must_use]
    pub fn configs(&self) -> Vec<GameConfig> {
        self.games.iter().map(|g| g.config.clone()).collect()
    }
}

/// Parse a game file from toml text.
///
/// # Errors
///
/// Will return `Err` if the toml is invalid, no game is defined, a game id
/// repeats, or a game fails its own checks.
pub fn parse_game_file(contents: &str) -> Result<GameFile> {
    let file: GameFile = toml::from_str(contents).context("parse game config toml")?;
    if file.games.is_empty() {
        return Err(anyhow!("game config defines no [[games]]"));
    }
    for (i, game) in file.games.iter().enumerate() {
        if file.games[..i]
            .iter()
            .any(|g| g.config.game_id == game.config.game_id)
        {
            return Err(anyhow!("game id '{}' is defined twice", game.config.game_id));
        }
        game.config
            .validate()
            .with_context(|| format!("game '{}'", game.config.game_id))?;
    }
    Ok(file)
}

/// # Errors
///
/// Will return `Err` if the file cannot be read or fails [`parse_game_file`].
pub fn load_game_file(path: &Path) -> Result<GameFile> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read game config {}", path.display()))?;
    parse_game_file(&contents).with_context(|| format!("load game config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompetitionType, TeeOffMethod};

    #[test]
    fn parses_games_with_defaults() {
        let file = parse_game_file(
            r#"
            [[games]]
            game_id = "spring-scramble"
            competition = "team"
            tee_off = "shotgun"
            holes = ["1", "5", "10"]
            tee_times = ["09:00"]

            [games.tee_set]
            course_id = "c1"
            tee_set_id = "blue"
            slope = 131.0

            [[games.players]]
            ghin = "1001"
            name = "Ana"
            handicap_index = 4.2

            [[games]]
            game_id = "tuesday"
            "#,
        )
        .unwrap();

        assert_eq!(file.games.len(), 2);
        let team = &file.games[0].config;
        assert_eq!(team.competition, CompetitionType::Team);
        assert_eq!(team.tee_off, TeeOffMethod::Shotgun);
        assert_eq!(team.suffix_alphabet.len(), 4);
        assert!((team.tee_set.slope - 131.0).abs() < f32::EPSILON);
        assert_eq!(file.games[0].players[0].ghin, "1001");
        assert_eq!(file.games[1].config.holes, vec!["1".to_string()]);
    }

    #[test]
    fn rejects_bad_files() {
        assert!(parse_game_file("games = []").is_err());
        assert!(
            parse_game_file(
                r#"
                [[games]]
                game_id = "a"
                tee_times = ["9am"]
                "#
            )
            .is_err()
        );
        assert!(
            parse_game_file(
                r#"
                [[games]]
                game_id = "a"
                [[games]]
                game_id = "a"
                "#
            )
            .is_err()
        );
    }
}
