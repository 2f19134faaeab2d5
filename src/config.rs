use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::doy::serde_year_doy;
use crate::error::{Result, SimulationError};
use crate::irrigation::AutoIrrigation;
use crate::runoff::RunoffConfig;
use crate::water_balance::{AQUACROP_SHAPE, StressMode};

/// Run settings: simulation window and optional model features.
///
/// ```toml
/// start = "2024-077"
/// end = "2024-086"
/// stress = "aquacrop"
/// comment = "2024 basil"
///
/// [runoff]
/// curve_number = 78
///
/// [auto_irrigation]
/// mad = 0.45
/// fw = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(with = "serde_year_doy")]
    pub start: NaiveDate,
    #[serde(with = "serde_year_doy")]
    pub end: NaiveDate,
    #[serde(default)]
    pub stress: StressMode,
    #[serde(default = "SimulationConfig::default_shape")]
    pub aquacrop_shape: f64,
    #[serde(default)]
    pub runoff: RunoffConfig,
    #[serde(default)]
    pub auto_irrigation: Option<AutoIrrigation>,
    #[serde(default)]
    pub comment: String,
}

impl SimulationConfig {
    fn default_shape() -> f64 {
        AQUACROP_SHAPE
    }

    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        SimulationConfig {
            start,
            end,
            stress: StressMode::default(),
            aquacrop_shape: AQUACROP_SHAPE,
            runoff: RunoffConfig::default(),
            auto_irrigation: None,
            comment: String::new(),
        }
    }

    pub fn with_stress(mut self, stress: StressMode) -> Self {
        self.stress = stress;
        self
    }

    pub fn with_runoff(mut self, runoff: RunoffConfig) -> Self {
        self.runoff = runoff;
        self
    }

    pub fn with_auto_irrigation(mut self, auto: AutoIrrigation) -> Self {
        self.auto_irrigation = Some(auto);
        self
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let toml_str = fs::read_to_string(path)?;
        Self::from_toml_str(&toml_str)
    }

    /// Number of simulated days, both ends included.
    pub fn days(&self) -> usize {
        ((self.end - self.start).num_days() + 1).max(0) as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.end < self.start {
            return Err(SimulationError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        if !self.aquacrop_shape.is_finite() || self.aquacrop_shape < 0.0 {
            return Err(SimulationError::invalid(
                "aquacrop_shape",
                self.aquacrop_shape,
                "shape factor must be a non-negative number",
            ));
        }
        self.runoff.resolve()?;
        if let Some(auto) = &self.auto_irrigation {
            auto.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doy::parse_year_doy;

    #[test]
    fn minimal_config_uses_defaults() {
        let c = SimulationConfig::from_toml_str(
            r#"
            start = "2024-077"
            end = "2024-086"
            "#,
        )
        .unwrap();
        assert_eq!(c.stress, StressMode::Standard);
        assert_eq!(c.aquacrop_shape, AQUACROP_SHAPE);
        assert_eq!(c.auto_irrigation, None);
        assert_eq!(c.runoff.resolve().unwrap(), None);
        assert_eq!(c.days(), 10);
    }

    #[test]
    fn full_config() {
        let c = SimulationConfig::from_toml_str(
            r#"
            start = "2013-113"
            end = "2013-312"
            stress = "aquacrop"
            aquacrop_shape = 2.0
            comment = "cotton, dry treatment"

            [runoff]
            soil_group = "B"
            land_use = "row crops good"

            [auto_irrigation]
            mad = 0.5
            fw = 0.5
            max_depth = 40.0
            "#,
        )
        .unwrap();
        assert_eq!(c.stress, StressMode::AquaCrop);
        assert_eq!(c.start, parse_year_doy("2013-113").unwrap());
        assert_eq!(c.days(), 200);
        assert_eq!(c.runoff.resolve().unwrap(), Some(78.0));
        let auto = c.auto_irrigation.unwrap();
        assert_eq!(auto.max_depth, Some(40.0));
        assert_eq!(auto.depth, None);
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let err = SimulationConfig::from_toml_str(
            r#"
            start = "2024-086"
            end = "2024-077"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDateRange { .. }));
    }

    #[test]
    fn malformed_date_is_a_config_error() {
        let err = SimulationConfig::from_toml_str(
            r#"
            start = "2024-400"
            end = "2024-401"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));
    }

    #[test]
    fn bad_auto_irrigation_is_rejected() {
        let start = parse_year_doy("2024-077").unwrap();
        let c = SimulationConfig::new(start, start).with_auto_irrigation(AutoIrrigation::new(2.0));
        assert!(c.validate().is_err());
        assert_eq!(c.days(), 1);
    }
}
