pub mod client;
pub mod local;

pub use client::HttpRatingService;
pub use local::LocalRatingService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PairingError;
use crate::model::{Player, TeeSetContext};

/// What the rating service needs to know about one golfer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GolferEntry {
    pub ghin: String,
    pub handicap_index: Option<f32>,
    pub course_handicap: Option<i32>,
}

impl From<&Player> for GolferEntry {
    fn from(p: &Player) -> Self {
        Self {
            ghin: p.ghin.clone(),
            handicap_index: p.handicap_index,
            course_handicap: p.course_handicap,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CourseHandicapResult {
    pub ghin: String,
    pub course_handicap: Option<i32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlayingHandicapResult {
    pub ghin: String,
    pub playing_handicap: Option<i32>,
    pub shots_off: Option<i32>,
}

/// External handicap computation. Course handicaps are per player; playing
/// handicaps and shots-off only make sense for a whole group at once.
#[async_trait]
pub trait RatingService: Send + Sync {
    async fn course_handicaps(
        &self,
        tee_set: &TeeSetContext,
        golfers: &[GolferEntry],
    ) -> Result<Vec<CourseHandicapResult>, PairingError>;

    async fn playing_handicaps(
        &self,
        tee_set: &TeeSetContext,
        group: &[GolferEntry],
    ) -> Result<Vec<PlayingHandicapResult>, PairingError>;
}
