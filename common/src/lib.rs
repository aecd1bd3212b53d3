pub mod config;
pub mod error;
pub mod games;
pub mod id_generator;
pub mod identifiers;
pub mod logger;
pub mod protocol;
pub mod room;

pub use error::{ErrorCode, GameError};
pub use identifiers::*;
