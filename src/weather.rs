use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::doy::serde_year_doy;
use crate::error::{Result, SimulationError};

// Daily weather for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    #[serde(with = "serde_year_doy")]
    pub date: NaiveDate,
    pub et0: f64,    // Reference evapotranspiration [mm/day]
    pub precip: f64, // Precipitation [mm/day]
    #[serde(default)]
    pub u2: Option<f64>, // Wind speed at 2 m [m/s]
    #[serde(default)]
    pub rh_min: Option<f64>, // Minimum relative humidity [%]
}

impl WeatherRecord {
    pub fn new(date: NaiveDate, et0: f64, precip: f64) -> Self {
        WeatherRecord {
            date,
            et0,
            precip,
            u2: None,
            rh_min: None,
        }
    }

    pub fn with_wind_humidity(mut self, u2: f64, rh_min: f64) -> Self {
        self.u2 = Some(u2);
        self.rh_min = Some(rh_min);
        self
    }

    // Wind and humidity, only when both were measured
    pub fn climate(&self) -> Option<(f64, f64)> {
        self.u2.zip(self.rh_min)
    }

    fn validate(&self) -> Result<()> {
        if !self.et0.is_finite() || self.et0 < 0.0 {
            return Err(SimulationError::invalid(
                "ET0",
                self.et0,
                format!("must be a non-negative number on {}", self.date),
            ));
        }
        if !self.precip.is_finite() || self.precip < 0.0 {
            return Err(SimulationError::invalid(
                "precip",
                self.precip,
                format!("must be a non-negative number on {}", self.date),
            ));
        }
        if let Some(rh) = self.rh_min {
            if rh > 100.0 {
                return Err(SimulationError::invalid(
                    "rh_min",
                    rh,
                    format!("relative humidity above 100 % on {}", self.date),
                ));
            }
        }
        for (name, value) in [("u2", self.u2), ("rh_min", self.rh_min)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(SimulationError::invalid(
                        name,
                        v,
                        format!("must be a non-negative number on {}", self.date),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Daily weather keyed by date.
#[derive(Debug, Clone, Default)]
pub struct WeatherSeries {
    records: BTreeMap<NaiveDate, WeatherRecord>,
}

impl WeatherSeries {
    /// Build a series from records in any order. Duplicated dates and
    /// negative or NaN values are rejected.
    pub fn new(records: impl IntoIterator<Item = WeatherRecord>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for record in records {
            record.validate()?;
            if map.insert(record.date, record).is_some() {
                return Err(SimulationError::Config(format!(
                    "duplicate weather record for {}",
                    record.date
                )));
            }
        }
        Ok(WeatherSeries { records: map })
    }

    /// Contiguous daily series starting at `start`.
    pub fn from_daily(start: NaiveDate, et0: &[f64], precip: &[f64]) -> Result<Self> {
        if et0.len() != precip.len() {
            return Err(SimulationError::Config(format!(
                "ET0 length {} does not match precipitation length {}",
                et0.len(),
                precip.len()
            )));
        }
        let records = et0
            .iter()
            .zip(precip)
            .enumerate()
            .map(|(i, (&et0, &precip))| {
                let date = start
                    .checked_add_days(Days::new(i as u64))
                    .ok_or_else(|| SimulationError::Config("date overflow".to_string()))?;
                Ok(WeatherRecord::new(date, et0, precip))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(records)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&WeatherRecord> {
        self.records.get(&date)
    }

    /// Fails with the first date in `[start, end]` that has no record.
    pub fn require_window(&self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        match start
            .iter_days()
            .take_while(|d| *d <= end)
            .find(|d| !self.records.contains_key(d))
        {
            Some(date) => Err(SimulationError::MissingWeatherData { date }),
            None => Ok(()),
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeatherRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
