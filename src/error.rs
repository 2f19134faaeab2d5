use chrono::NaiveDate;
use thiserror::Error;

/// Everything that can stop a run before the first simulated day.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: String,
    },

    #[error("no weather record for {date}")]
    MissingWeatherData { date: NaiveDate },

    #[error("end date {end} precedes start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("degenerate configuration: {0}")]
    DegenerateConfiguration(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimulationError {
    pub(crate) fn invalid(name: &'static str, value: f64, reason: impl Into<String>) -> Self {
        SimulationError::InvalidParameter {
            name,
            value,
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for SimulationError {
    fn from(err: toml::de::Error) -> Self {
        SimulationError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
