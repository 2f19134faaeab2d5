//! Daily crop water use and soil water balance with the FAO-56 dual crop
//! coefficient method.
//!
//! A run combines a [`ParameterSet`] (crop and soil), a [`WeatherSeries`],
//! an [`IrrigationSchedule`] and a [`SimulationConfig`] and produces one
//! [`DailyRecord`] per day plus a [`SeasonSummary`].

mod config;
mod crop_stage;
mod doy;
mod engine;
mod error;
mod evaporation;
mod irrigation;
mod output;
mod params;
mod runoff;
mod water_balance;
mod weather;

pub use config::SimulationConfig;
pub use crop_stage::{CropStage, CropStageCurve, GrowthStage, adjust_kcb_for_climate};
pub use doy::{format_year_doy, from_year_doy, parse_year_doy};
pub use engine::{RunStatus, SimulationEngine, SimulationState, simulate};
pub use error::{Result, SimulationError};
pub use evaporation::{
    EvaporationDay, EvaporationStage, SoilEvaporationTracker, SurfaceInputs, canopy_cover,
    fao56_climate, kc_max,
};
pub use irrigation::{
    AutoIrrigation, DailyIrrigation, IrrigationEvent, IrrigationSchedule, IrrigationSource,
};
pub use output::{DailyRecord, OutputReport, SeasonSummary, SimulationOutput};
pub use params::ParameterSet;
pub use runoff::{RunoffConfig, adjusted_curve_number, curve_number, runoff};
pub use water_balance::{
    AquaCropStress, LinearStress, RootZone, RootZoneDay, RootZoneInputs, RootZoneWaterBalance,
    StressMode, StressPolicy,
};
pub use weather::{WeatherRecord, WeatherSeries};
