pub mod bucket;
pub mod draft;
pub mod mix;

pub use bucket::{bucketize, rank_pool};
pub use draft::{DraftStrategy, draft};
pub use mix::{GroupMix, valid_mixes};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PairingError, ValidationError};
use crate::model::{GameConfig, GroupModel};

/// Skill tiers used when no bucket count is requested: A, B, C and D players.
pub const DEFAULT_BUCKETS: usize = 4;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AutoPairConfig {
    pub mix: GroupMix,
    pub strategy: DraftStrategy,
    #[serde(default)]
    pub bucket_count: Option<usize>,
    /// Fixes the shuffle of the `random` strategy.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProposedGroup {
    pub members: Vec<String>,
}

/// Proposes groupings for the players nobody has paired yet. Never touches
/// the model; the session applies the result.
pub struct AutoPairEngine<'a> {
    config: &'a GameConfig,
}

impl<'a> AutoPairEngine<'a> {
    #[must_use]
    pub fn new(config: &'a GameConfig) -> Self {
        Self { config }
    }

    /// Mixes that seat every unassigned player within tee-sheet capacity.
    #[must_use]
    pub fn suggested_mixes(&self, model: &GroupModel) -> Vec<GroupMix> {
        let mixes = valid_mixes(model.unassigned().len(), self.config.tee_time_capacity());
        if self.config.is_team() {
            mixes.into_iter().filter(|m| m.fours == 0 && m.threes == 0).collect()
        } else {
            mixes
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if the seats requested do not match the unassigned
    /// players, the groups do not fit the tee sheet, a team game asks for
    /// groups other than twos, or the bucket count is zero or larger than
    /// the pool.
    pub fn validate(
        &self,
        model: &GroupModel,
        request: &AutoPairConfig,
    ) -> Result<(), ValidationError> {
        let players = model.unassigned().len();
        let seats = request.mix.seats();
        if seats != players {
            return Err(ValidationError::SeatMismatch { seats, players });
        }
        let capacity = self.config.tee_time_capacity();
        if request.mix.groups() > capacity {
            return Err(ValidationError::TooManyGroups {
                groups: request.mix.groups(),
                capacity,
            });
        }
        if self.config.is_team() {
            if request.mix.fours > 0 {
                return Err(ValidationError::TeamGroupSize(4));
            }
            if request.mix.threes > 0 {
                return Err(ValidationError::TeamGroupSize(3));
            }
        }
        match request.bucket_count {
            Some(0) => return Err(ValidationError::InvalidBucketCount),
            Some(buckets) if buckets > players => {
                return Err(ValidationError::TooManyBuckets { buckets, players });
            }
            _ => {}
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Will return `Err` if the request fails [`AutoPairEngine::validate`].
    pub fn propose(
        &self,
        model: &GroupModel,
        request: &AutoPairConfig,
    ) -> Result<Vec<ProposedGroup>, PairingError> {
        self.validate(model, request)?;

        let pool = rank_pool(&model.unassigned());
        let buckets = bucketize(&pool, request.bucket_count.unwrap_or(DEFAULT_BUCKETS));
        let sizes = request.mix.size_sequence();
        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let groups = draft(request.strategy, &sizes, &buckets, &mut rng);
        debug!(
            game_id = model.game_id(),
            strategy = %request.strategy,
            groups = groups.len(),
            "auto pair proposal"
        );
        Ok(groups
            .into_iter()
            .map(|members| ProposedGroup { members })
            .collect())
    }
}
