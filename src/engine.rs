use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::crop_stage::CropStageCurve;
use crate::error::{Result, SimulationError};
use crate::evaporation::{SoilEvaporationTracker, SurfaceInputs, fao56_climate, kc_max};
use crate::irrigation::IrrigationSchedule;
use crate::output::{DailyRecord, SeasonSummary, SimulationOutput};
use crate::params::ParameterSet;
use crate::runoff::{adjusted_curve_number, runoff};
use crate::water_balance::{RootZoneInputs, RootZoneWaterBalance, StressPolicy};
use crate::weather::{WeatherRecord, WeatherSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Water-balance state carried from one day to the next.
#[derive(Debug, Clone)]
pub struct SimulationState {
    evaporation: SoilEvaporationTracker,
    root_zone: RootZoneWaterBalance,
    totals: SeasonSummary,
}

impl SimulationState {
    pub fn new(params: &ParameterSet) -> Self {
        let root_zone = RootZoneWaterBalance::new(params);
        SimulationState {
            evaporation: SoilEvaporationTracker::new(params),
            totals: SeasonSummary::new(root_zone.dr()),
            root_zone,
        }
    }

    pub fn evaporation(&self) -> &SoilEvaporationTracker {
        &self.evaporation
    }

    pub fn root_zone(&self) -> &RootZoneWaterBalance {
        &self.root_zone
    }

    pub fn totals(&self) -> &SeasonSummary {
        &self.totals
    }
}

/// Daily FAO-56 dual crop coefficient simulation over an inclusive date
/// window.
///
/// Inputs are validated before the first day; a failed run produces no
/// records. The stress policy is fixed when the engine is built.
pub struct SimulationEngine<'a> {
    params: ParameterSet,
    weather: &'a WeatherSeries,
    irrigation: &'a IrrigationSchedule,
    config: SimulationConfig,
    curve: CropStageCurve,
    stress: Box<dyn StressPolicy>,
    state: SimulationState,
    status: RunStatus,
    output: Option<SimulationOutput>,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(
        params: ParameterSet,
        weather: &'a WeatherSeries,
        irrigation: &'a IrrigationSchedule,
        config: SimulationConfig,
    ) -> Self {
        let stress = config.stress.policy(config.aquacrop_shape);
        SimulationEngine {
            curve: CropStageCurve::new(&params),
            state: SimulationState::new(&params),
            params,
            weather,
            irrigation,
            config,
            stress,
            status: RunStatus::NotStarted,
            output: None,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn output(&self) -> Option<&SimulationOutput> {
        self.output.as_ref()
    }

    /// Run the whole window. A completed engine returns its existing output.
    pub fn run(&mut self) -> Result<&SimulationOutput> {
        let output = match self.output.take() {
            Some(output) => output,
            None => match self.execute() {
                Ok(output) => {
                    self.status = RunStatus::Completed;
                    output
                }
                Err(err) => {
                    self.status = RunStatus::Failed;
                    warn!(target: "fao56_balance::engine", error = %err, "run failed");
                    return Err(err);
                }
            },
        };
        Ok(self.output.insert(output))
    }

    // Resolve run-level inputs; nothing here may fail once days are simulated
    fn prepare(&self) -> Result<Option<f64>> {
        self.config.validate()?;
        self.params.validate()?;
        self.weather.require_window(self.config.start, self.config.end)?;
        let cn2 = self.config.runoff.resolve()?;
        for event in self.irrigation.outside(self.config.start, self.config.end) {
            warn!(
                target: "fao56_balance::engine",
                date = %event.date,
                depth = event.depth,
                "irrigation outside simulation window ignored"
            );
        }
        Ok(cn2)
    }

    fn execute(&mut self) -> Result<SimulationOutput> {
        let cn2 = self.prepare()?;
        self.status = RunStatus::Running;
        self.state = SimulationState::new(&self.params);

        let days = self.config.days();
        info!(
            target: "fao56_balance::engine",
            start = %self.config.start,
            end = %self.config.end,
            days,
            stress = self.stress.name(),
            runoff = cn2.is_some(),
            "simulation started"
        );

        let mut records = Vec::with_capacity(days);
        for (dap, date) in self.config.start.iter_days().take(days).enumerate() {
            let weather = self
                .weather
                .get(date)
                .ok_or(SimulationError::MissingWeatherData { date })?;
            let record = self.step(dap as u32, date, weather, cn2);
            self.state.totals.add(&record);
            records.push(record);
        }

        let summary = self.state.totals;
        info!(
            target: "fao56_balance::engine",
            days = summary.days,
            etc_adj = summary.etc_adj,
            irrigation = summary.irrigation,
            dp = summary.dp,
            stressed_days = summary.stressed_days,
            "simulation completed"
        );
        Ok(SimulationOutput { records, summary })
    }

    fn step(
        &mut self,
        dap: u32,
        date: NaiveDate,
        w: &WeatherRecord,
        cn2: Option<f64>,
    ) -> DailyRecord {
        let crop = self.curve.at(dap);

        let climate = w.climate().map(|(u2, rh_min)| {
            let limited = fao56_climate(u2, rh_min);
            if limited != (u2, rh_min) {
                warn!(
                    target: "fao56_balance::engine",
                    %date,
                    u2,
                    rh_min,
                    "wind or humidity outside FAO-56 range, clamped"
                );
            }
            limited
        });
        let kcb = match climate {
            Some((u2, rh_min)) => self.curve.kcb_in_climate(dap, u2, rh_min),
            None => crop.kcb,
        };

        self.state.root_zone.set_root_depth(crop.zr);
        let zone = self.state.root_zone.zone();

        let scheduled = self.irrigation.on(date).filter(|irr| irr.depth > 0.0);
        let (irrigation, auto_irrigated) = match scheduled {
            Some(irr) => (Some(irr), false),
            None => {
                let auto = self
                    .config
                    .auto_irrigation
                    .and_then(|auto| auto.trigger(zone.dr, zone.taw));
                (auto, auto.is_some())
            }
        };

        let ro = match cn2 {
            Some(cn2) => {
                let evap = &self.state.evaporation;
                let cn = adjusted_curve_number(cn2, evap.de(), self.params.rew, evap.tew());
                runoff(w.precip, cn)
            }
            None => 0.0,
        };
        let precip = w.precip - ro;

        let kcmax = kc_max(kcb, crop.h, climate);
        let evap = self.state.evaporation.advance(SurfaceInputs {
            kcb,
            kcmax,
            h: crop.h,
            et0: w.et0,
            precip,
            irrigation,
        });

        let ks = self.state.root_zone.ks(self.stress.as_ref());
        let kc = kcb + evap.ke;
        let kc_adj = (ks * kcb + evap.ke).min(kcmax);
        let irrigation_effective = irrigation.map_or(0.0, |irr| irr.effective());

        let balance = self.state.root_zone.apply(RootZoneInputs {
            precip,
            irrigation: irrigation_effective,
            etc_adj: kc_adj * w.et0,
        });
        // uptake limited at the wilting point
        let kc_adj = if balance.etc_adj < kc_adj * w.et0 {
            balance.etc_adj / w.et0
        } else {
            kc_adj
        };

        debug!(
            target: "fao56_balance::engine",
            %date,
            kcb,
            ke = evap.ke,
            ks,
            de = evap.de,
            dr = balance.dr,
            "day advanced"
        );

        DailyRecord {
            date,
            dap,
            stage: crop.stage,
            et0: w.et0,
            h: crop.h,
            zr: self.state.root_zone.zr(),
            kcb,
            kcmax,
            fc: evap.fc,
            fw: evap.fw,
            few: evap.few,
            de: evap.de,
            kr: evap.kr,
            ke: evap.ke,
            e: evap.e,
            dpe: evap.dpe,
            kc,
            etc: kc * w.et0,
            taw: zone.taw,
            raw: zone.raw,
            ks,
            kc_adj,
            etc_adj: balance.etc_adj,
            t: (balance.etc_adj - evap.e).max(0.0),
            precip: w.precip,
            runoff: ro,
            irrigation: irrigation.map_or(0.0, |irr| irr.depth),
            irrigation_effective,
            auto_irrigated,
            dp: balance.dp,
            dr: balance.dr,
        }
    }
}

/// Build an engine, run it, and hand back the output.
pub fn simulate(
    params: ParameterSet,
    weather: &WeatherSeries,
    irrigation: &IrrigationSchedule,
    config: SimulationConfig,
) -> Result<SimulationOutput> {
    let mut engine = SimulationEngine::new(params, weather, irrigation, config);
    engine.run().cloned()
}
