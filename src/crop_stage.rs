use serde::Serialize;

use crate::params::ParameterSet;

// FAO-56 growth stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum GrowthStage {
    Initial,
    Development,
    MidSeason,
    Late,
    PostSeason,
}

// Crop development for one day after planting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropStage {
    pub stage: GrowthStage,
    pub kcb: f64, // Basal crop coefficient [-]
    pub zr: f64,  // Root depth [m]
    pub h: f64,   // Crop height [m]
}

/// Piecewise-linear basal crop coefficient curve (FAO-56 Fig. 34) with root
/// and canopy growth over the initial and development stages.
#[derive(Debug, Clone, Copy)]
pub struct CropStageCurve {
    kcb_ini: f64,
    kcb_mid: f64,
    kcb_end: f64,
    ends: [u32; 4],
    zr_ini: f64,
    zr_max: f64,
    hini: f64,
    hmax: f64,
}

impl CropStageCurve {
    pub fn new(params: &ParameterSet) -> Self {
        CropStageCurve {
            kcb_ini: params.kcb_ini,
            kcb_mid: params.kcb_mid,
            kcb_end: params.kcb_end,
            ends: params.stage_ends(),
            zr_ini: params.zr_ini,
            zr_max: params.zr_max,
            hini: params.hini,
            hmax: params.hmax,
        }
    }

    pub fn stage(&self, d: u32) -> GrowthStage {
        let [ini, dev, mid, end] = self.ends;
        if d > end {
            GrowthStage::PostSeason
        } else if d <= ini {
            GrowthStage::Initial
        } else if d <= dev {
            GrowthStage::Development
        } else if d <= mid {
            GrowthStage::MidSeason
        } else {
            GrowthStage::Late
        }
    }

    /// Basal crop coefficient `d` days after planting.
    ///
    /// A zero-length stage collapses to a step; the curve holds at `Kcbend`
    /// once the season is over.
    pub fn kcb(&self, d: u32) -> f64 {
        self.interpolate(d, self.kcb_mid, self.kcb_end)
    }

    /// Basal crop coefficient with the Kcbmid and Kcbend endpoints adjusted
    /// for wind and humidity (FAO-56 Eq. 70), at the crop height of day `d`.
    ///
    /// The development and late segments run toward the adjusted endpoints,
    /// so the curve stays continuous across stage boundaries.
    pub fn kcb_in_climate(&self, d: u32, u2: f64, rh_min: f64) -> f64 {
        let h = self.height(d);
        self.interpolate(
            d,
            adjust_kcb_for_climate(self.kcb_mid, u2, rh_min, h),
            adjust_kcb_for_climate(self.kcb_end, u2, rh_min, h),
        )
    }

    fn interpolate(&self, d: u32, kcb_mid: f64, kcb_end: f64) -> f64 {
        let [ini, dev, mid, end] = self.ends;
        if d >= end {
            return kcb_end.max(0.0);
        }
        let kcb = if d <= ini {
            self.kcb_ini
        } else if d <= dev {
            let frac = f64::from(d - ini) / f64::from(dev - ini);
            self.kcb_ini + (kcb_mid - self.kcb_ini) * frac
        } else if d <= mid {
            kcb_mid
        } else {
            let frac = f64::from(d - mid) / f64::from(end - mid);
            kcb_mid + (kcb_end - kcb_mid) * frac
        };
        kcb.max(0.0)
    }

    // Fraction of root and canopy development reached by day d
    fn growth_fraction(&self, d: u32) -> f64 {
        let dev = self.ends[1];
        if dev == 0 {
            1.0
        } else {
            (f64::from(d) / f64::from(dev)).min(1.0)
        }
    }

    /// Root depth [m]; complete at the end of the development stage.
    pub fn root_depth(&self, d: u32) -> f64 {
        self.zr_ini + (self.zr_max - self.zr_ini) * self.growth_fraction(d)
    }

    /// Crop height [m], grown alongside the roots.
    pub fn height(&self, d: u32) -> f64 {
        self.hini + (self.hmax - self.hini) * self.growth_fraction(d)
    }

    pub fn at(&self, d: u32) -> CropStage {
        CropStage {
            stage: self.stage(d),
            kcb: self.kcb(d),
            zr: self.root_depth(d),
            h: self.height(d),
        }
    }
}

/// Climatic adjustment of a mid- or late-season Kcb (FAO-56 Eq. 70).
///
/// Only coefficients above 0.45 are adjusted. `u2` [m/s] and `rh_min` [%]
/// are expected to be already limited to the FAO-56 ranges.
pub fn adjust_kcb_for_climate(kcb: f64, u2: f64, rh_min: f64, h: f64) -> f64 {
    if kcb <= 0.45 {
        return kcb;
    }
    (kcb + climate_term(u2, rh_min, h)).max(0.0)
}

// Shared wind/humidity/height term of FAO-56 Eqs. 70 and 72
pub(crate) fn climate_term(u2: f64, rh_min: f64, h: f64) -> f64 {
    (0.04 * (u2 - 2.0) - 0.004 * (rh_min - 45.0)) * (h / 3.0).powf(0.3)
}
