pub mod args;
pub mod error;
pub mod model;
pub mod rating;
pub mod storage;
pub mod controller {
    pub mod auto_pair;
    pub mod handicap;
    pub mod http_handlers;
    pub mod persistence;
    pub mod pipeline;
    pub mod session;
    pub mod shotgun;
    pub mod slots;
    pub mod tee_schedule;
}

pub use controller::session::{AssignOutcome, FlightAssignOutcome, GroupingSession, SaveOutcome};
pub use error::{PairingError, ValidationError};
