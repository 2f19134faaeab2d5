use crate::crop_stage::climate_term;
use crate::irrigation::DailyIrrigation;
use crate::params::ParameterSet;

// Minimum Kc for dry bare soil (FAO-56 Eq. 76)
pub const KC_MIN: f64 = 0.15;
// Floor on the exposed and wetted fraction, keeps E/few finite
pub const FEW_MIN: f64 = 0.01;
// Upper limit on canopy cover
pub const FC_MAX: f64 = 0.99;

/// Wind speed [m/s] and minimum relative humidity [%] limited to the ranges
/// the FAO-56 adjustment equations were fitted on.
pub fn fao56_climate(u2: f64, rh_min: f64) -> (f64, f64) {
    (u2.clamp(1.0, 6.0), rh_min.clamp(20.0, 80.0))
}

/// Upper limit on Kc after rain or irrigation (FAO-56 Eq. 72).
///
/// Without wind and humidity the climate term is dropped, leaving
/// `max(1.2, Kcb + 0.05)`.
pub fn kc_max(kcb: f64, h: f64, climate: Option<(f64, f64)>) -> f64 {
    let base = match climate {
        Some((u2, rh_min)) => 1.2 + climate_term(u2, rh_min, h),
        None => 1.2,
    };
    base.max(kcb + 0.05)
}

/// Fraction of soil covered by vegetation (FAO-56 Eq. 76).
pub fn canopy_cover(kcb: f64, kcmax: f64, h: f64) -> f64 {
    let span = kcmax - KC_MIN;
    if span <= 0.0 {
        return 0.0;
    }
    let ratio = ((kcb - KC_MIN) / span).max(0.0);
    ratio.powf(1.0 + 0.5 * h).clamp(0.0, FC_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaporationStage {
    EnergyLimited,
    FallingRate,
}

// Crop and water inputs to the surface layer for one day
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInputs {
    pub kcb: f64,
    pub kcmax: f64,
    pub h: f64,      // Crop height [m]
    pub et0: f64,    // Reference ET [mm]
    pub precip: f64, // Precipitation net of runoff [mm]
    pub irrigation: Option<DailyIrrigation>,
}

// Surface-layer results for one day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaporationDay {
    pub fw: f64,  // Fraction of soil surface wetted [-]
    pub fc: f64,  // Canopy cover [-]
    pub few: f64, // Exposed and wetted fraction [-]
    pub kr: f64,  // Evaporation reduction coefficient [-]
    pub ke: f64,  // Soil evaporation coefficient [-]
    pub e: f64,   // Soil evaporation [mm]
    pub dpe: f64, // Drainage out of the surface layer [mm]
    pub de: f64,  // End-of-day surface-layer depletion [mm]
}

/// Two-stage evaporation from the exposed surface layer (FAO-56 Ch. 7).
///
/// `de` is the cumulative depth evaporated since the layer was last at
/// field capacity. Evaporation runs at the energy-limited rate until `de`
/// passes REW, then falls off linearly to zero at TEW.
#[derive(Debug, Clone)]
pub struct SoilEvaporationTracker {
    tew: f64,
    rew: f64,
    de: f64,
    fw: f64,
    days_since_wetting: u32,
}

impl SoilEvaporationTracker {
    pub fn new(params: &ParameterSet) -> Self {
        SoilEvaporationTracker {
            tew: params.tew(),
            rew: params.rew,
            de: 0.0,
            fw: 1.0,
            days_since_wetting: 0,
        }
    }

    pub fn de(&self) -> f64 {
        self.de
    }

    pub fn tew(&self) -> f64 {
        self.tew
    }

    pub fn days_since_wetting(&self) -> u32 {
        self.days_since_wetting
    }

    pub fn stage(&self) -> EvaporationStage {
        if self.tew > self.rew && self.de > self.rew {
            EvaporationStage::FallingRate
        } else {
            EvaporationStage::EnergyLimited
        }
    }

    /// Evaporation reduction coefficient from the start-of-day depletion.
    pub fn kr(&self) -> f64 {
        match self.stage() {
            EvaporationStage::EnergyLimited => 1.0,
            EvaporationStage::FallingRate => {
                ((self.tew - self.de) / (self.tew - self.rew)).clamp(0.0, 1.0)
            }
        }
    }

    // Wetted fraction per FAO-56 Table 20; dry days keep yesterday's value
    fn wetted_fraction(&self, precip: f64, irrigation: Option<DailyIrrigation>) -> f64 {
        match irrigation.filter(|irr| irr.depth > 0.0) {
            Some(_) if precip > 0.0 => 1.0,
            Some(irr) => irr.fw,
            None if precip > 0.0 => 1.0,
            None => self.fw,
        }
    }

    /// Compute Ke for the day and advance the surface-layer balance.
    pub fn advance(&mut self, input: SurfaceInputs) -> EvaporationDay {
        let fw = self.wetted_fraction(input.precip, input.irrigation);
        let fc = canopy_cover(input.kcb, input.kcmax, input.h);
        let few = (1.0 - fc).min(fw).max(FEW_MIN);

        let kr = self.kr();
        let ke = (kr * (input.kcmax - input.kcb))
            .min(few * input.kcmax)
            .max(0.0);
        let e = ke * input.et0;

        // Irrigation depth is applied over the wetted area only
        let irrigation = input.irrigation.map_or(0.0, |irr| irr.depth);
        let wetting = input.precip + irrigation;
        let dpe = (wetting - self.de).max(0.0);
        let de = (self.de - wetting + e / few + dpe).clamp(0.0, self.tew);

        if wetting > 0.0 && wetting >= self.de {
            self.days_since_wetting = 0;
        } else {
            self.days_since_wetting += 1;
        }
        self.de = de;
        self.fw = fw;

        EvaporationDay {
            fw,
            fc,
            few,
            kr,
            ke,
            e,
            dpe,
            de,
        }
    }
}
