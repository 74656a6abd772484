pub mod normalize;
pub mod sqlite;

pub use normalize::{RosterRow, normalize_row};
pub use sqlite::SqliteRosterStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

use crate::model::Player;

/// One player's full grouping and schedule tuple, in store form. Always the
/// whole tuple, so applying a row twice leaves the same result.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AssignmentRow {
    pub ghin: String,
    pub pairing_id: String,
    pub pairing_pos: String,
    pub flight_id: String,
    pub flight_pos: String,
    pub tee_time: String,
    pub start_hole: String,
    pub start_hole_suffix: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HandicapUpdate {
    pub ghin: String,
    pub course_handicap: Option<i32>,
    pub playing_handicap: Option<i32>,
    pub shots_off: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct StorageError {
    message: String,
}

impl StorageError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for StorageError {}

impl From<String> for StorageError {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for StorageError {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::new(format!("sqlite: {value}"))
    }
}

/// Canonical roster of each game. Players are created and deleted here; the
/// engine only writes grouping, schedule and handicap fields back.
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn load_roster(&self, game_id: &str) -> Result<Vec<Player>, StorageError>;

    /// Apply the rows and hand back the canonical roster as stored afterwards.
    async fn save_assignments(
        &self,
        game_id: &str,
        rows: &[AssignmentRow],
    ) -> Result<Vec<Player>, StorageError>;

    async fn remove_player(&self, game_id: &str, ghin: &str) -> Result<(), StorageError>;

    async fn store_handicaps(
        &self,
        game_id: &str,
        updates: &[HandicapUpdate],
    ) -> Result<(), StorageError>;
}
