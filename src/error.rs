//! Error types for TariniNav

use crate::compass::Heading;
use thiserror::Error;

/// TariniNav error type
#[derive(Error, Debug)]
pub enum TariniError {
    /// The requested heading is more than one compass step away from the
    /// current one; a single command cannot achieve a 90° turn.
    #[error("Invalid turn: {from} to {to} is not reachable in one command")]
    InvalidTurn { from: Heading, to: Heading },

    /// Ship control declined the move (collision, invalid state). The local
    /// pose must stay unchanged.
    #[error("Navigation rejected by ship control")]
    NavigationRejected,

    #[error("Vessel not found: {0}")]
    VesselNotFound(String),

    #[error("No vessel selected")]
    InvalidSelection,

    #[error("Remote call failed: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("Ship control error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for TariniError {
    fn from(e: toml::de::Error) -> Self {
        TariniError::Config(e.to_string())
    }
}

impl TariniError {
    /// Transient failures are reported and the autopilot loop carries on;
    /// anything else terminates the session.
    pub fn is_transient(&self) -> bool {
        matches!(self, TariniError::Remote(_) | TariniError::Api(_))
    }
}

pub type Result<T> = std::result::Result<T, TariniError>;
