//! Error types for the simulator

use doppler_core::AuctionError;
use doppler_test_utils::HarnessError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Failed to load scenario: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error(transparent)]
    Auction(#[from] AuctionError),

    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to encode scenario: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimulationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SimulationError::InvalidScenario(message.into())
    }
}

pub type SimulationResult<T> = Result<T, SimulationError>;
