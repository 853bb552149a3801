pub mod models;
pub mod service;

use thiserror::Error;

pub use models::{estimate_rain_probability, WeatherSnapshot};
pub use service::{WeatherService, WeatherSource};


#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Error fetching weather data: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error parsing weather data: {0}")]
    Parse(String),

    #[error("Weather service misconfigured: {0}")]
    Config(String),
}
