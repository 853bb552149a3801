

use thiserror::Error;

use crate::memory::{IndexError, MemoryError};
use crate::weather::WeatherError;


#[derive(Error, Debug)]
pub enum UmbrellaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Weather lookup error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Decision memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled by user.")]
    Cancelled,
}

impl From<config::ConfigError> for UmbrellaError {
    fn from(e: config::ConfigError) -> Self {
        UmbrellaError::Config(e.to_string())
    }
}


pub type Result<T> = std::result::Result<T, UmbrellaError>;
