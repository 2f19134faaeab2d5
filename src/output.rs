use std::fmt;
use std::io;

use chrono::NaiveDate;
use serde::Serialize;

use crate::crop_stage::GrowthStage;
use crate::doy::{format_year_doy, serde_year_doy};

/// One simulated day. Depths in mm, coefficients dimensionless.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyRecord {
    #[serde(with = "serde_year_doy")]
    pub date: NaiveDate,
    pub dap: u32, // Days after planting
    pub stage: GrowthStage,
    pub et0: f64,
    pub h: f64,  // Crop height [m]
    pub zr: f64, // Root depth [m]
    pub kcb: f64,
    pub kcmax: f64,
    pub fc: f64,
    pub fw: f64,
    pub few: f64,
    pub de: f64,
    pub kr: f64,
    pub ke: f64,
    pub e: f64,
    pub dpe: f64,
    pub kc: f64,  // Kcb + Ke
    pub etc: f64, // Unstressed crop ET
    pub taw: f64,
    pub raw: f64,
    pub ks: f64,
    pub kc_adj: f64,  // min(Kcmax, Ks Kcb + Ke)
    pub etc_adj: f64, // Crop ET under water stress
    pub t: f64,       // Transpiration
    pub precip: f64,
    pub runoff: f64,
    pub irrigation: f64,           // Applied depth
    pub irrigation_effective: f64, // Field-average depth (applied x fw)
    pub auto_irrigated: bool,
    pub dp: f64,
    pub dr: f64,
}

/// Season totals and means accumulated as the run advances.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SeasonSummary {
    pub days: usize,
    pub et0: f64,
    pub etc: f64,
    pub etc_adj: f64,
    pub e: f64,
    pub t: f64,
    pub precip: f64,
    pub runoff: f64,
    pub irrigation: f64,
    pub irrigation_effective: f64,
    pub auto_irrigation: f64,
    pub dp: f64,
    pub stressed_days: usize,
    pub initial_dr: f64,
    pub final_dr: f64,
    ks_sum: f64,
    kcb_sum: f64,
}

impl SeasonSummary {
    pub fn new(initial_dr: f64) -> Self {
        SeasonSummary {
            initial_dr,
            final_dr: initial_dr,
            ..Self::default()
        }
    }

    pub fn add(&mut self, r: &DailyRecord) {
        self.days += 1;
        self.et0 += r.et0;
        self.etc += r.etc;
        self.etc_adj += r.etc_adj;
        self.e += r.e;
        self.t += r.t;
        self.precip += r.precip;
        self.runoff += r.runoff;
        self.irrigation += r.irrigation;
        self.irrigation_effective += r.irrigation_effective;
        if r.auto_irrigated {
            self.auto_irrigation += r.irrigation;
        }
        self.dp += r.dp;
        if r.ks < 1.0 {
            self.stressed_days += 1;
        }
        self.ks_sum += r.ks;
        self.kcb_sum += r.kcb;
        self.final_dr = r.dr;
    }

    pub fn mean_ks(&self) -> f64 {
        self.mean(self.ks_sum)
    }

    pub fn mean_kcb(&self) -> f64 {
        self.mean(self.kcb_sum)
    }

    fn mean(&self, sum: f64) -> f64 {
        if self.days == 0 {
            0.0
        } else {
            sum / self.days as f64
        }
    }

    /// Change in depletion not explained by the season's fluxes [mm].
    /// Zero up to rounding for any completed run.
    pub fn balance_residual(&self) -> f64 {
        (self.final_dr - self.initial_dr)
            - (self.etc_adj - (self.precip - self.runoff) - self.irrigation_effective + self.dp)
    }
}

/// Results of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    pub records: Vec<DailyRecord>,
    pub summary: SeasonSummary,
}

impl SimulationOutput {
    pub fn record(&self, date: NaiveDate) -> Option<&DailyRecord> {
        let first = self.records.first()?;
        let index = (date - first.date).num_days();
        usize::try_from(index).ok().and_then(|i| self.records.get(i))
    }
}

// Column headers and widths of the daily table
const COLUMNS: [(&str, usize); 27] = [
    ("Year-DOY", 8),
    ("ETref", 7),
    ("h", 5),
    ("Kcb", 5),
    ("Kcmax", 5),
    ("fc", 5),
    ("fw", 5),
    ("few", 5),
    ("De", 6),
    ("Kr", 5),
    ("Ke", 5),
    ("E", 6),
    ("DPe", 6),
    ("Kc", 5),
    ("ETc", 6),
    ("TAW", 7),
    ("RAW", 7),
    ("Zr", 5),
    ("Ks", 5),
    ("Kcadj", 5),
    ("ETcadj", 6),
    ("T", 6),
    ("P", 6),
    ("RO", 6),
    ("Irrig", 6),
    ("DP", 6),
    ("Dr", 7),
];

/// Fixed-width text rendering of a run: daily table then season summary.
pub struct OutputReport<'a> {
    output: &'a SimulationOutput,
    comment: &'a str,
}

impl<'a> OutputReport<'a> {
    pub fn new(output: &'a SimulationOutput, comment: &'a str) -> Self {
        OutputReport { output, comment }
    }

    pub fn write_to<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        write!(writer, "{self}")
    }

    fn write_header(f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, width) in COLUMNS {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{name:>width$}")?;
            first = false;
        }
        writeln!(f)
    }

    fn write_row(f: &mut fmt::Formatter<'_>, r: &DailyRecord) -> fmt::Result {
        let values = [
            r.et0, r.h, r.kcb, r.kcmax, r.fc, r.fw, r.few, r.de, r.kr, r.ke, r.e, r.dpe, r.kc,
            r.etc, r.taw, r.raw, r.zr, r.ks, r.kc_adj, r.etc_adj, r.t, r.precip, r.runoff,
            r.irrigation, r.dp, r.dr,
        ];
        write!(f, "{:>8}", format_year_doy(r.date))?;
        for (&(_, width), value) in COLUMNS[1..].iter().zip(values) {
            // coefficients get three decimals, depths two
            let precision = if width == 5 { 3 } else { 2 };
            write!(f, " {value:>width$.precision$}")?;
        }
        writeln!(f)
    }

    fn write_summary(f: &mut fmt::Formatter<'_>, s: &SeasonSummary) -> fmt::Result {
        writeln!(f, "Season summary ({} days)", s.days)?;
        let lines = [
            ("ETref", s.et0),
            ("ETc", s.etc),
            ("ETcadj", s.etc_adj),
            ("E", s.e),
            ("T", s.t),
            ("Rain", s.precip),
            ("Runoff", s.runoff),
            ("Irrig", s.irrigation),
            ("Auto irrig", s.auto_irrigation),
            ("DP", s.dp),
        ];
        for (name, value) in lines {
            writeln!(f, "{name:>12} {value:>9.2} mm")?;
        }
        writeln!(f, "{:>12} {:>9.3}", "Mean Ks", s.mean_ks())?;
        writeln!(f, "{:>12} {:>9.3}", "Mean Kcb", s.mean_kcb())?;
        writeln!(f, "{:>12} {:>9}", "Stress days", s.stressed_days)?;
        writeln!(f, "{:>12} {:>9.2} mm", "Final Dr", s.final_dr)
    }
}

impl fmt::Display for OutputReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.comment.is_empty() {
            writeln!(f, "{}", self.comment)?;
        }
        Self::write_header(f)?;
        for record in &self.output.records {
            Self::write_row(f, record)?;
        }
        writeln!(f)?;
        Self::write_summary(f, &self.output.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doy::from_year_doy;
    use approx::assert_relative_eq;

    fn record(doy: u32, ks: f64, irrigation: f64, auto: bool) -> DailyRecord {
        DailyRecord {
            date: from_year_doy(2024, doy).unwrap(),
            dap: doy - 77,
            stage: GrowthStage::Initial,
            et0: 4.0,
            h: 0.1,
            zr: 0.25,
            kcb: 0.4,
            kcmax: 1.2,
            fc: 0.22,
            fw: 1.0,
            few: 0.78,
            de: 4.1,
            kr: 1.0,
            ke: 0.8,
            e: 3.2,
            dpe: 0.0,
            kc: 1.2,
            etc: 4.8,
            taw: 20.0,
            raw: 8.0,
            ks,
            kc_adj: 0.4 * ks + 0.8,
            etc_adj: (0.4 * ks + 0.8) * 4.0,
            t: 1.6 * ks,
            precip: 0.0,
            runoff: 0.0,
            irrigation,
            irrigation_effective: irrigation * 0.5,
            auto_irrigated: auto,
            dp: 0.0,
            dr: 12.0,
        }
    }

    fn sample() -> SimulationOutput {
        let records = vec![
            record(77, 1.0, 0.0, false),
            record(78, 0.5, 10.0, false),
            record(79, 0.8, 6.0, true),
        ];
        let mut summary = SeasonSummary::new(10.0);
        for r in &records {
            summary.add(r);
        }
        SimulationOutput { records, summary }
    }

    #[test]
    fn summary_accumulates_totals_and_means() {
        let s = sample().summary;
        assert_eq!(s.days, 3);
        assert_relative_eq!(s.et0, 12.0);
        assert_relative_eq!(s.irrigation, 16.0);
        assert_relative_eq!(s.irrigation_effective, 8.0);
        assert_relative_eq!(s.auto_irrigation, 6.0);
        assert_eq!(s.stressed_days, 2);
        assert_relative_eq!(s.mean_ks(), (1.0 + 0.5 + 0.8) / 3.0);
        assert_relative_eq!(s.mean_kcb(), 0.4, epsilon = 1e-12);
        assert_eq!(s.final_dr, 12.0);
    }

    #[test]
    fn empty_summary_has_zero_means() {
        let s = SeasonSummary::new(5.0);
        assert_eq!(s.mean_ks(), 0.0);
        assert_eq!(s.final_dr, 5.0);
    }

    #[test]
    fn record_lookup_by_date() {
        let out = sample();
        let d = from_year_doy(2024, 78).unwrap();
        assert_eq!(out.record(d).unwrap().ks, 0.5);
        assert!(out.record(from_year_doy(2024, 76).unwrap()).is_none());
        assert!(out.record(from_year_doy(2024, 90).unwrap()).is_none());
    }

    #[test]
    fn report_has_header_rows_and_summary() {
        let out = sample();
        let text = OutputReport::new(&out, "2024 basil").to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2024 basil");
        assert!(lines[1].trim_start().starts_with("Year-DOY"));
        assert!(lines[2].starts_with("2024-077"));
        assert!(lines[4].starts_with("2024-079"));
        // every row has one field per column
        for row in &lines[1..5] {
            assert_eq!(row.split_whitespace().count(), COLUMNS.len());
        }
        assert!(text.contains("Season summary (3 days)"));
        assert!(text.contains("Stress days"));
    }

    #[test]
    fn report_writes_to_any_writer() {
        let out = sample();
        let mut buf = Vec::new();
        OutputReport::new(&out, "").write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Year-DOY"));
    }

    #[test]
    fn records_serialize_with_year_doy_dates() {
        let r = record(77, 1.0, 0.0, false);
        let text = toml::to_string(&r).unwrap();
        assert!(text.contains("date = \"2024-077\""));
        assert!(text.contains("stage = \"Initial\""));
    }
}
