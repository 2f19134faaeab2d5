//! `YYYY-DDD` (year, day-of-year) date keys.

use chrono::{Datelike, NaiveDate};

use crate::error::{Result, SimulationError};

pub fn from_year_doy(year: i32, doy: u32) -> Result<NaiveDate> {
    NaiveDate::from_yo_opt(year, doy).ok_or_else(|| {
        SimulationError::Config(format!("{year}-{doy:03} is not a valid year/day-of-year"))
    })
}

pub fn parse_year_doy(text: &str) -> Result<NaiveDate> {
    let (year, doy) = text
        .trim()
        .split_once('-')
        .ok_or_else(|| SimulationError::Config(format!("expected YYYY-DDD, got '{text}'")))?;
    let year: i32 = year
        .parse()
        .map_err(|_| SimulationError::Config(format!("bad year in '{text}'")))?;
    let doy: u32 = doy
        .parse()
        .map_err(|_| SimulationError::Config(format!("bad day of year in '{text}'")))?;
    from_year_doy(year, doy)
}

pub fn format_year_doy(date: NaiveDate) -> String {
    format!("{}-{:03}", date.year(), date.ordinal())
}

/// Serde adapter for `NaiveDate` fields stored as `YYYY-DDD` strings.
pub mod serde_year_doy {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_year_doy(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_year_doy(&text).map_err(de::Error::custom)
    }
}
