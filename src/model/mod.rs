pub mod config;
pub mod roster;
pub mod types;

pub use config::*;
pub use roster::*;
pub use types::*;
