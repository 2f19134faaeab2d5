use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

// Crop and soil parameters for one FAO-56 dual crop coefficient run.
// TOML keys follow the FAO-56 symbols (Kcbini, Lini, thetaFC, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(rename = "Kcbini")]
    pub kcb_ini: f64, // Basal crop coefficient, initial stage [-]
    #[serde(rename = "Kcbmid")]
    pub kcb_mid: f64, // Basal crop coefficient, mid-season stage [-]
    #[serde(rename = "Kcbend")]
    pub kcb_end: f64, // Basal crop coefficient at end of late stage [-]
    #[serde(rename = "Lini")]
    pub l_ini: u32, // Length of initial stage [days]
    #[serde(rename = "Ldev")]
    pub l_dev: u32, // Length of development stage [days]
    #[serde(rename = "Lmid")]
    pub l_mid: u32, // Length of mid-season stage [days]
    #[serde(rename = "Lend")]
    pub l_end: u32, // Length of late stage [days]
    pub hini: f64, // Initial crop height [m]
    pub hmax: f64, // Maximum crop height [m]
    #[serde(rename = "thetaFC")]
    pub theta_fc: f64, // Volumetric water content at field capacity [m3/m3]
    #[serde(rename = "thetaWP")]
    pub theta_wp: f64, // Volumetric water content at wilting point [m3/m3]
    #[serde(rename = "theta0")]
    pub theta0: f64, // Initial volumetric water content [m3/m3]
    #[serde(rename = "Zrini")]
    pub zr_ini: f64, // Initial root depth [m]
    #[serde(rename = "Zrmax")]
    pub zr_max: f64, // Maximum root depth [m]
    pub pbase: f64, // Depletion fraction without stress [-]
    #[serde(rename = "Ze")]
    pub ze: f64, // Depth of the evaporable surface layer [m]
    #[serde(rename = "REW")]
    pub rew: f64, // Readily evaporable water [mm]
}

impl ParameterSet {
    /// Parse a parameter set from a TOML document and validate it.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let params: ParameterSet = toml::from_str(toml_str)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let toml_str = fs::read_to_string(path)?;
        Self::from_toml_str(&toml_str)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| SimulationError::Config(e.to_string()))
    }

    /// Check every invariant the daily update relies on.
    ///
    /// Parameter combinations that would make TAW or TEW zero are reported as
    /// [`SimulationError::DegenerateConfiguration`] rather than as an ordinary
    /// out-of-range value, since they would otherwise surface as NaN deep in
    /// the recurrence.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("Kcbini", self.kcb_ini),
            ("Kcbmid", self.kcb_mid),
            ("Kcbend", self.kcb_end),
            ("hini", self.hini),
            ("hmax", self.hmax),
            ("thetaFC", self.theta_fc),
            ("thetaWP", self.theta_wp),
            ("theta0", self.theta0),
            ("Zrini", self.zr_ini),
            ("Zrmax", self.zr_max),
            ("pbase", self.pbase),
            ("Ze", self.ze),
            ("REW", self.rew),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(SimulationError::invalid(name, value, "must be finite"));
            }
            if value < 0.0 {
                return Err(SimulationError::invalid(name, value, "must not be negative"));
            }
        }

        if self.hini > self.hmax {
            return Err(SimulationError::invalid(
                "hini",
                self.hini,
                format!("exceeds hmax = {}", self.hmax),
            ));
        }
        if self.theta_fc > 1.0 {
            return Err(SimulationError::invalid(
                "thetaFC",
                self.theta_fc,
                "volumetric water content cannot exceed 1",
            ));
        }
        if self.theta_wp > self.theta_fc {
            return Err(SimulationError::invalid(
                "thetaWP",
                self.theta_wp,
                format!("exceeds thetaFC = {}", self.theta_fc),
            ));
        }
        if self.theta0 < self.theta_wp || self.theta0 > self.theta_fc {
            return Err(SimulationError::invalid(
                "theta0",
                self.theta0,
                format!(
                    "must lie between thetaWP = {} and thetaFC = {}",
                    self.theta_wp, self.theta_fc
                ),
            ));
        }
        if self.zr_ini > self.zr_max {
            return Err(SimulationError::invalid(
                "Zrini",
                self.zr_ini,
                format!("exceeds Zrmax = {}", self.zr_max),
            ));
        }
        if self.pbase > 1.0 {
            return Err(SimulationError::invalid(
                "pbase",
                self.pbase,
                "depletion fraction must lie in [0, 1]",
            ));
        }

        if self.season_length().is_none() {
            return Err(SimulationError::invalid(
                "Lend",
                [self.l_ini, self.l_dev, self.l_mid, self.l_end]
                    .into_iter()
                    .map(f64::from)
                    .sum(),
                "season length overflows the day counter",
            ));
        }

        if self.theta_fc == self.theta_wp {
            return Err(SimulationError::DegenerateConfiguration(format!(
                "thetaFC equals thetaWP ({}), total available water is zero",
                self.theta_fc
            )));
        }
        if self.zr_ini == 0.0 {
            return Err(SimulationError::DegenerateConfiguration(
                "Zrini is zero, initial total available water is zero".to_string(),
            ));
        }
        if self.tew() <= 0.0 {
            return Err(SimulationError::DegenerateConfiguration(format!(
                "total evaporable water is zero (Ze = {})",
                self.ze
            )));
        }
        Ok(())
    }

    /// Total available water for a root depth `zr` [mm].
    pub fn taw(&self, zr: f64) -> f64 {
        1000.0 * (self.theta_fc - self.theta_wp) * zr
    }

    /// Readily available water for a given TAW [mm].
    pub fn raw(&self, taw: f64) -> f64 {
        self.pbase * taw
    }

    /// Total evaporable water of the surface layer [mm].
    pub fn tew(&self) -> f64 {
        1000.0 * (self.theta_fc - 0.5 * self.theta_wp) * self.ze
    }

    /// Root-zone depletion at planting [mm], limited to [0, TAW].
    ///
    /// Never panics, even for parameters that fail [`validate`](Self::validate).
    pub fn initial_depletion(&self) -> f64 {
        let taw = self.taw(self.zr_ini);
        (1000.0 * (self.theta_fc - self.theta0) * self.zr_ini)
            .min(taw)
            .max(0.0)
    }

    /// Total season length in days, `None` if it does not fit a `u32`.
    pub fn season_length(&self) -> Option<u32> {
        self.l_ini
            .checked_add(self.l_dev)?
            .checked_add(self.l_mid)?
            .checked_add(self.l_end)
    }

    // Day after planting at which each growth stage ends
    pub fn stage_ends(&self) -> [u32; 4] {
        let ini = self.l_ini;
        let dev = ini.saturating_add(self.l_dev);
        let mid = dev.saturating_add(self.l_mid);
        [ini, dev, mid, mid.saturating_add(self.l_end)]
    }
}

impl Default for ParameterSet {
    // Basil in a greenhouse (Hohenheim, 2024)
    fn default() -> Self {
        ParameterSet {
            kcb_ini: 0.40,
            kcb_mid: 1.10,
            kcb_end: 1.05,
            l_ini: 15,
            l_dev: 30,
            l_mid: 20,
            l_end: 20,
            hini: 0.1,
            hmax: 0.8,
            theta_fc: 0.14,
            theta_wp: 0.06,
            theta0: 0.10,
            zr_ini: 0.25,
            zr_max: 0.80,
            pbase: 0.40,
            ze: 0.1143,
            rew: 8.0,
        }
    }
}
