use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::doy::{from_year_doy, serde_year_doy};
use crate::error::{Result, SimulationError};

// One scheduled irrigation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrigationEvent {
    #[serde(with = "serde_year_doy")]
    pub date: NaiveDate,
    pub depth: f64, // Applied depth [mm]
    pub fw: f64,    // Fraction of soil surface wetted (FAO-56 Table 20) [-]
}

impl IrrigationEvent {
    pub fn new(date: NaiveDate, depth: f64, fw: f64) -> Result<Self> {
        let event = IrrigationEvent { date, depth, fw };
        event.validate()?;
        Ok(event)
    }

    fn validate(&self) -> Result<()> {
        if !self.depth.is_finite() || self.depth < 0.0 {
            return Err(SimulationError::invalid(
                "depth",
                self.depth,
                format!("irrigation depth on {} must be non-negative", self.date),
            ));
        }
        if !(self.fw > 0.0 && self.fw <= 1.0) {
            return Err(SimulationError::invalid(
                "fw",
                self.fw,
                format!("wetted fraction on {} must lie in (0, 1]", self.date),
            ));
        }
        Ok(())
    }
}

/// Anything that can hand over a list of dated irrigation events: an
/// in-memory list, or a closure reading from a custom store.
pub trait IrrigationSource {
    fn events(&self) -> Result<Vec<IrrigationEvent>>;
}

impl IrrigationSource for [IrrigationEvent] {
    fn events(&self) -> Result<Vec<IrrigationEvent>> {
        Ok(self.to_vec())
    }
}

impl IrrigationSource for Vec<IrrigationEvent> {
    fn events(&self) -> Result<Vec<IrrigationEvent>> {
        Ok(self.clone())
    }
}

impl<F> IrrigationSource for F
where
    F: Fn() -> Result<Vec<IrrigationEvent>>,
{
    fn events(&self) -> Result<Vec<IrrigationEvent>> {
        self()
    }
}

// Irrigation applied on a single day, after combining that day's events
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyIrrigation {
    pub depth: f64, // Total applied depth [mm]
    pub fw: f64,    // Wetted fraction governing the day [-]
}

impl DailyIrrigation {
    /// Field-average depth reaching the root zone [mm].
    pub fn effective(&self) -> f64 {
        self.depth * self.fw
    }
}

/// Irrigation events grouped by date.
///
/// Several events on one date are applied together: depths add up and the
/// wetted fraction is the depth-weighted mean of the events' fractions.
#[derive(Debug, Clone, Default)]
pub struct IrrigationSchedule {
    events: BTreeMap<NaiveDate, Vec<IrrigationEvent>>,
}

impl IrrigationSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_source<S: IrrigationSource + ?Sized>(source: &S) -> Result<Self> {
        let mut schedule = Self::new();
        for event in source.events()? {
            schedule.push(event)?;
        }
        Ok(schedule)
    }

    pub fn push(&mut self, event: IrrigationEvent) -> Result<()> {
        event.validate()?;
        self.events.entry(event.date).or_default().push(event);
        Ok(())
    }

    pub fn add_event(&mut self, year: i32, doy: u32, depth: f64, fw: f64) -> Result<()> {
        let date = from_year_doy(year, doy)?;
        self.push(IrrigationEvent::new(date, depth, fw)?)
    }

    /// Combined irrigation for `date`, if any event falls on it.
    pub fn on(&self, date: NaiveDate) -> Option<DailyIrrigation> {
        let events = self.events.get(&date)?;
        let last = events.last()?;
        let depth: f64 = events.iter().map(|e| e.depth).sum();
        let fw = if depth > 0.0 {
            events.iter().map(|e| e.depth * e.fw).sum::<f64>() / depth
        } else {
            last.fw
        };
        Some(DailyIrrigation { depth, fw })
    }

    /// Events dated outside `[start, end]`; these are never applied.
    pub fn outside(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Iterator<Item = &IrrigationEvent> {
        self.events
            .iter()
            .filter(move |(date, _)| **date < start || **date > end)
            .flat_map(|(_, events)| events.iter())
    }

    pub fn iter(&self) -> impl Iterator<Item = &IrrigationEvent> {
        self.events.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Automatic irrigation triggered by root-zone depletion.
///
/// Fires on days without scheduled irrigation when the start-of-day
/// depletion exceeds `mad` × TAW. Applies `depth` when set, otherwise the
/// depth that returns the root zone to field capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoIrrigation {
    pub mad: f64, // Management allowed depletion, fraction of TAW [-]
    #[serde(default = "AutoIrrigation::default_fw")]
    pub fw: f64,
    #[serde(default)]
    pub depth: Option<f64>,
    #[serde(default)]
    pub max_depth: Option<f64>,
}

impl AutoIrrigation {
    fn default_fw() -> f64 {
        1.0
    }

    pub fn new(mad: f64) -> Self {
        AutoIrrigation {
            mad,
            fw: Self::default_fw(),
            depth: None,
            max_depth: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.mad) {
            return Err(SimulationError::invalid(
                "mad",
                self.mad,
                "management allowed depletion must lie in [0, 1]",
            ));
        }
        if !(self.fw > 0.0 && self.fw <= 1.0) {
            return Err(SimulationError::invalid(
                "fw",
                self.fw,
                "auto-irrigation wetted fraction must lie in (0, 1]",
            ));
        }
        for (name, value) in [("depth", self.depth), ("max_depth", self.max_depth)] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(SimulationError::invalid(
                        name,
                        v,
                        "auto-irrigation depth must be positive",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Irrigation to apply for a start-of-day depletion `dr` [mm].
    pub fn trigger(&self, dr: f64, taw: f64) -> Option<DailyIrrigation> {
        if dr <= self.mad * taw || dr <= 0.0 {
            return None;
        }
        let depth = self.depth.unwrap_or(dr / self.fw);
        let depth = match self.max_depth {
            Some(cap) => depth.min(cap),
            None => depth,
        };
        Some(DailyIrrigation { depth, fw: self.fw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(doy: u32) -> NaiveDate {
        from_year_doy(2013, doy).unwrap()
    }

    #[test]
    fn single_event_is_returned_as_is() {
        let mut s = IrrigationSchedule::new();
        s.add_event(2013, 115, 33.0, 0.5).unwrap();
        let irr = s.on(day(115)).unwrap();
        assert_relative_eq!(irr.depth, 33.0);
        assert_relative_eq!(irr.fw, 0.5);
        assert_relative_eq!(irr.effective(), 16.5);
        assert!(s.on(day(116)).is_none());
    }

    #[test]
    fn same_day_events_combine_by_depth_weight() {
        let mut s = IrrigationSchedule::new();
        s.add_event(2013, 120, 10.0, 1.0).unwrap();
        s.add_event(2013, 120, 30.0, 0.2).unwrap();
        let irr = s.on(day(120)).unwrap();
        assert_relative_eq!(irr.depth, 40.0);
        assert_relative_eq!(irr.fw, (10.0 + 6.0) / 40.0);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn zero_depth_events_keep_latest_fraction() {
        let mut s = IrrigationSchedule::new();
        s.add_event(2013, 120, 0.0, 1.0).unwrap();
        s.add_event(2013, 120, 0.0, 0.3).unwrap();
        let irr = s.on(day(120)).unwrap();
        assert_relative_eq!(irr.depth, 0.0);
        assert_relative_eq!(irr.fw, 0.3);
    }

    #[test]
    fn invalid_events_are_rejected() {
        let mut s = IrrigationSchedule::new();
        assert!(s.add_event(2013, 120, -5.0, 0.5).is_err());
        assert!(s.add_event(2013, 120, 5.0, 0.0).is_err());
        assert!(s.add_event(2013, 120, 5.0, 1.5).is_err());
        assert!(s.add_event(2013, 400, 5.0, 0.5).is_err());
        assert!(s.is_empty());
    }

    #[test]
    fn loads_from_a_closure() {
        let source = || -> Result<Vec<IrrigationEvent>> {
            Ok(vec![
                IrrigationEvent::new(day(150), 25.0, 0.5)?,
                IrrigationEvent::new(day(160), 25.0, 0.5)?,
            ])
        };
        let s = IrrigationSchedule::from_source(&source).unwrap();
        assert_eq!(s.len(), 2);
        assert!(s.on(day(160)).is_some());
    }

    #[test]
    fn loads_from_a_list() {
        let events = vec![IrrigationEvent {
            date: day(150),
            depth: 12.0,
            fw: 0.4,
        }];
        let s = IrrigationSchedule::from_source(&events).unwrap();
        assert_eq!(s.iter().count(), 1);
        let bad = vec![IrrigationEvent {
            date: day(150),
            depth: 12.0,
            fw: 0.0,
        }];
        assert!(IrrigationSchedule::from_source(&bad).is_err());
    }

    #[test]
    fn source_errors_propagate() {
        let failing = || -> Result<Vec<IrrigationEvent>> {
            Err(SimulationError::Config("store unavailable".to_string()))
        };
        assert!(IrrigationSchedule::from_source(&failing).is_err());
    }

    #[test]
    fn events_outside_window_are_listed() {
        let mut s = IrrigationSchedule::new();
        s.add_event(2013, 100, 10.0, 1.0).unwrap();
        s.add_event(2013, 150, 10.0, 1.0).unwrap();
        s.add_event(2013, 320, 10.0, 1.0).unwrap();
        assert_eq!(s.outside(day(113), day(312)).count(), 2);
    }

    #[test]
    fn auto_irrigation_refills_to_field_capacity() {
        let auto = AutoIrrigation {
            fw: 0.5,
            ..AutoIrrigation::new(0.5)
        };
        assert!(auto.trigger(40.0, 100.0).is_none());
        let irr = auto.trigger(60.0, 100.0).unwrap();
        assert_relative_eq!(irr.effective(), 60.0);
        assert_relative_eq!(irr.depth, 120.0);
    }

    #[test]
    fn auto_irrigation_respects_fixed_and_capped_depths() {
        let fixed = AutoIrrigation {
            depth: Some(25.0),
            ..AutoIrrigation::new(0.3)
        };
        assert_relative_eq!(fixed.trigger(50.0, 100.0).unwrap().depth, 25.0);
        let capped = AutoIrrigation {
            max_depth: Some(30.0),
            ..AutoIrrigation::new(0.3)
        };
        assert_relative_eq!(capped.trigger(50.0, 100.0).unwrap().depth, 30.0);
        assert!(AutoIrrigation::new(1.5).validate().is_err());
    }
}
