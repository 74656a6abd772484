use async_trait::async_trait;

use crate::error::PairingError;
use crate::model::TeeSetContext;
use crate::rating::{CourseHandicapResult, GolferEntry, PlayingHandicapResult, RatingService};

/// In-process rating service using the WHS formulas, for games run without
/// an external service.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRatingService;

impl LocalRatingService {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// `round(HI * slope / 113 + (course rating - par))`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn course_handicap(tee_set: &TeeSetContext, handicap_index: f32) -> i32 {
    let ch = handicap_index * tee_set.slope / 113.0 + (tee_set.course_rating - tee_set.par as f32);
    ch.round() as i32
}

#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn playing_handicap(tee_set: &TeeSetContext, course_handicap: i32) -> i32 {
    (course_handicap as f32 * tee_set.allowance_pct / 100.0).round() as i32
}

#[async_trait]
impl RatingService for LocalRatingService {
    async fn course_handicaps(
        &self,
        tee_set: &TeeSetContext,
        golfers: &[GolferEntry],
    ) -> Result<Vec<CourseHandicapResult>, PairingError> {
        Ok(golfers
            .iter()
            .map(|g| CourseHandicapResult {
                ghin: g.ghin.clone(),
                course_handicap: g.handicap_index.map(|hi| course_handicap(tee_set, hi)),
            })
            .collect())
    }

    async fn playing_handicaps(
        &self,
        tee_set: &TeeSetContext,
        group: &[GolferEntry],
    ) -> Result<Vec<PlayingHandicapResult>, PairingError> {
        let phs: Vec<Option<i32>> = group
            .iter()
            .map(|g| g.course_handicap.map(|ch| playing_handicap(tee_set, ch)))
            .collect();
        let low = phs.iter().flatten().min().copied();

        Ok(group
            .iter()
            .zip(phs)
            .map(|(g, ph)| PlayingHandicapResult {
                ghin: g.ghin.clone(),
                playing_handicap: ph,
                shots_off: ph.zip(low).map(|(ph, low)| ph - low),
            })
            .collect())
    }
}
