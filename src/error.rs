use crate::storage::StorageError;
use thiserror::Error;

/// Structural constraint violations. Checked locally, never sent to the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("pairing {pairing_id} has {size} players, at most {max} allowed")]
    TooManyInPairing {
        pairing_id: String,
        size: usize,
        max: usize,
    },
    #[error("pairing {pairing_id} cannot take {adding} more players ({current} of {max} seats used)")]
    PairingFull {
        pairing_id: String,
        current: usize,
        adding: usize,
        max: usize,
    },
    #[error("flight {0} already has both sides filled")]
    FlightFull(String),
    #[error("pairing {0} already belongs to flight {1}")]
    AlreadyFlighted(String, String),
    #[error("flights are only used in team competitions")]
    NotTeamFormat,
    #[error("requested {seats} seats but {players} players are unassigned")]
    SeatMismatch { seats: usize, players: usize },
    #[error("requested {groups} groups but only {capacity} tee slots are available")]
    TooManyGroups { groups: usize, capacity: usize },
    #[error("team competitions only allow groups of two, got a group of {0}")]
    TeamGroupSize(usize),
    #[error("group of {0} is outside the allowed range of 2 to 4")]
    GroupSize(usize),
    #[error("unknown player {0}")]
    UnknownPlayer(String),
    #[error("player {0} is already in a pairing")]
    PlayerNotUnassigned(String),
    #[error("player {0} appears more than once")]
    DuplicatePlayer(String),
    #[error("pairing {pairing_id} has two players at position {pos}")]
    DuplicatePosition { pairing_id: String, pos: u32 },
    #[error("player {ghin} is at position {pos} in pairing {pairing_id} of size {size}")]
    PositionOutOfRange {
        ghin: String,
        pairing_id: String,
        pos: u32,
        size: usize,
    },
    #[error("player {0} has a position but no pairing")]
    PositionWithoutPairing(String),
    #[error("flight {flight_id} has more than one pairing on side {side}")]
    FlightSideConflict { flight_id: String, side: String },
    #[error("nothing selected")]
    EmptySelection,
    #[error("bucket count must be at least 1")]
    InvalidBucketCount,
    #[error("{buckets} buckets requested for {players} unassigned players")]
    TooManyBuckets { buckets: usize, players: usize },
    #[error("group id {0} is outside 001 to 999")]
    GroupIdOutOfRange(String),
    #[error("no free pairing id left, {needed} needed")]
    NoFreePairingId { needed: usize },
    #[error("no free flight id left")]
    NoFreeFlightId,
    #[error("unknown hole {0}")]
    UnknownHole(String),
    #[error("tee time {0} is not on the tee sheet")]
    UnknownTeeTime(String),
    #[error("suffix {0} is not in the configured alphabet")]
    UnknownSuffix(String),
}

#[derive(Error, Debug, Clone)]
pub enum PairingError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("no free slot left at {tee_time} on hole {start_hole}")]
    SlotExhausted {
        tee_time: String,
        start_hole: String,
    },
    #[error("rating service error: {0}")]
    ExternalService(String),
    #[error("save failed, your changes are kept and can be saved again: {0}")]
    Persistence(String),
    #[error("another save or recalculation is still running")]
    Busy,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("config error: {0}")]
    Config(String),
}

impl From<StorageError> for PairingError {
    fn from(err: StorageError) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for PairingError {
    fn from(err: reqwest::Error) -> Self {
        Self::ExternalService(err.to_string())
    }
}

impl From<serde_json::Error> for PairingError {
    fn from(err: serde_json::Error) -> Self {
        Self::ExternalService(err.to_string())
    }
}
