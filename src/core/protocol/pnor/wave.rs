//! Wave parameter sentences: PNORW (summary) and PNORB (per band)
//!
//! Wave processing reports `-9.00` (and the wider `-999` family) when a
//! parameter could not be estimated. Those values decode to `None`.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::core::protocol::fields::{self as f, Bound, FormatError, FormatResult};
use crate::core::protocol::sentence::Sentence;

/// Data the wave spectrum was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpectrumBasis {
    Pressure,
    Velocity,
    /// Acoustic surface tracking
    Ast,
}

impl SpectrumBasis {
    pub fn code(self) -> u8 {
        match self {
            Self::Pressure => 0,
            Self::Velocity => 1,
            Self::Ast => 3,
        }
    }

    pub(super) fn parse(raw: &str) -> FormatResult<Self> {
        match f::uint::<u8>("spectrum_basis", raw)? {
            0 => Ok(Self::Pressure),
            1 => Ok(Self::Velocity),
            3 => Ok(Self::Ast),
            other => Err(FormatError::OutOfRange {
                field: "spectrum_basis",
                value: other.to_string(),
                bound: "one of 0 (pressure), 1 (velocity), 3 (AST)".to_string(),
            }),
        }
    }
}

/// Directional wave processing method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingMethod {
    Puv,
    Suv,
    Mlm,
    Mlmst,
}

impl ProcessingMethod {
    pub fn code(self) -> u8 {
        match self {
            Self::Puv => 1,
            Self::Suv => 2,
            Self::Mlm => 3,
            Self::Mlmst => 4,
        }
    }

    fn parse(raw: &str) -> FormatResult<Self> {
        match f::uint::<u8>("processing_method", raw)? {
            1 => Ok(Self::Puv),
            2 => Ok(Self::Suv),
            3 => Ok(Self::Mlm),
            4 => Ok(Self::Mlmst),
            other => Err(FormatError::OutOfRange {
                field: "processing_method",
                value: other.to_string(),
                bound: "in [1, 4]".to_string(),
            }),
        }
    }
}

const HEIGHT: Bound = Bound::Closed(0.0, 50.0);
const PERIOD: Bound = Bound::Closed(0.0, 100.0);
const UNIDIRECTIVITY: Bound = Bound::Closed(0.0, 1.0);
const FREQUENCY: Bound = Bound::LeftOpen(0.0, 10.0);

fn check_opt(field: &'static str, value: Option<f64>, bound: Bound) -> FormatResult<()> {
    match value {
        Some(v) => f::check(field, v, bound).map(|_| ()),
        None => Ok(()),
    }
}

/// PNORW wave summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveSummary {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub spectrum_basis: SpectrumBasis,
    pub processing_method: ProcessingMethod,
    /// Significant wave height from the spectrum, metres
    pub hm0: Option<f64>,
    pub h3: Option<f64>,
    pub h10: Option<f64>,
    pub hmax: Option<f64>,
    /// Mean period, seconds
    pub tm02: Option<f64>,
    /// Peak period, seconds
    pub tp: Option<f64>,
    /// Zero-crossing period, seconds
    pub tz: Option<f64>,
    pub dir_tp: Option<f64>,
    pub spr_tp: Option<f64>,
    pub main_direction: Option<f64>,
    pub unidirectivity_index: Option<f64>,
    pub mean_pressure: Option<f64>,
    pub no_detects: u32,
    pub bad_detects: u32,
    pub near_surface_speed: Option<f64>,
    pub near_surface_direction: Option<f64>,
    pub error_code: u32,
}

impl WaveSummary {
    pub fn validate(&self) -> FormatResult<()> {
        for (field, value) in [
            ("hm0", self.hm0),
            ("h3", self.h3),
            ("h10", self.h10),
            ("hmax", self.hmax),
        ] {
            check_opt(field, value, HEIGHT)?;
        }
        for (field, value) in [("tm02", self.tm02), ("tp", self.tp), ("tz", self.tz)] {
            check_opt(field, value, PERIOD)?;
        }
        for (field, value) in [
            ("dir_tp", self.dir_tp),
            ("spr_tp", self.spr_tp),
            ("main_direction", self.main_direction),
            ("near_surface_direction", self.near_surface_direction),
        ] {
            check_opt(field, value, f::DIRECTION)?;
        }
        check_opt("unidirectivity_index", self.unidirectivity_index, UNIDIRECTIVITY)?;
        check_opt("mean_pressure", self.mean_pressure, f::PRESSURE)?;
        check_opt("near_surface_speed", self.near_surface_speed, f::SPEED)?;
        Ok(())
    }

    pub(super) fn from_pnorw(s: &Sentence) -> FormatResult<Self> {
        let v = s.positional("PNORW", 21)?;
        let opt = |field, i: usize| f::wave_value(field, v[i], Bound::AtLeast(f64::MIN));
        let data = Self {
            date: f::date("date", v[0])?,
            time: f::time("time", v[1])?,
            spectrum_basis: SpectrumBasis::parse(v[2])?,
            processing_method: ProcessingMethod::parse(v[3])?,
            hm0: opt("hm0", 4)?,
            h3: opt("h3", 5)?,
            h10: opt("h10", 6)?,
            hmax: opt("hmax", 7)?,
            tm02: opt("tm02", 8)?,
            tp: opt("tp", 9)?,
            tz: opt("tz", 10)?,
            dir_tp: opt("dir_tp", 11)?,
            spr_tp: opt("spr_tp", 12)?,
            main_direction: opt("main_direction", 13)?,
            unidirectivity_index: opt("unidirectivity_index", 14)?,
            mean_pressure: opt("mean_pressure", 15)?,
            no_detects: f::uint("no_detects", v[16])?,
            bad_detects: f::uint("bad_detects", v[17])?,
            near_surface_speed: opt("near_surface_speed", 18)?,
            near_surface_direction: opt("near_surface_direction", 19)?,
            error_code: f::hex_code("error_code", v[20])?,
        };
        data.validate()?;
        Ok(data)
    }

    pub(super) fn to_pnorw(&self) -> Vec<String> {
        let mut out = vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            self.spectrum_basis.code().to_string(),
            self.processing_method.code().to_string(),
        ];
        out.extend(
            [
                self.hm0,
                self.h3,
                self.h10,
                self.hmax,
                self.tm02,
                self.tp,
                self.tz,
                self.dir_tp,
                self.spr_tp,
                self.main_direction,
                self.unidirectivity_index,
                self.mean_pressure,
            ]
            .into_iter()
            .map(f::fmt_opt),
        );
        out.push(self.no_detects.to_string());
        out.push(self.bad_detects.to_string());
        out.push(f::fmt_opt(self.near_surface_speed));
        out.push(f::fmt_opt(self.near_surface_direction));
        out.push(f::fmt_hex(self.error_code));
        out
    }
}

/// PNORB wave parameters for one frequency band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveBand {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub spectrum_basis: SpectrumBasis,
    pub processing_method: ProcessingMethod,
    /// Lower band edge, Hz
    pub frequency_low: f64,
    /// Upper band edge, Hz
    pub frequency_high: f64,
    pub hm0: Option<f64>,
    pub tm02: Option<f64>,
    pub tp: Option<f64>,
    pub dir_tp: Option<f64>,
    pub spr_tp: Option<f64>,
    pub main_direction: Option<f64>,
    pub error_code: u32,
}

impl WaveBand {
    pub fn validate(&self) -> FormatResult<()> {
        f::check("frequency_low", self.frequency_low, FREQUENCY)?;
        f::check("frequency_high", self.frequency_high, FREQUENCY)?;
        if self.frequency_low >= self.frequency_high {
            return Err(FormatError::Inconsistent {
                field: "frequency_low",
                value: self.frequency_low.to_string(),
                rule: format!("must be below frequency_high ({})", self.frequency_high),
            });
        }
        check_opt("hm0", self.hm0, HEIGHT)?;
        check_opt("tm02", self.tm02, PERIOD)?;
        check_opt("tp", self.tp, PERIOD)?;
        check_opt("dir_tp", self.dir_tp, f::DIRECTION)?;
        check_opt("spr_tp", self.spr_tp, f::DIRECTION)?;
        check_opt("main_direction", self.main_direction, f::DIRECTION)?;
        Ok(())
    }

    pub(super) fn from_pnorb(s: &Sentence) -> FormatResult<Self> {
        let v = s.positional("PNORB", 13)?;
        let opt = |field, i: usize| f::wave_value(field, v[i], Bound::AtLeast(f64::MIN));
        let data = Self {
            date: f::date("date", v[0])?,
            time: f::time("time", v[1])?,
            spectrum_basis: SpectrumBasis::parse(v[2])?,
            processing_method: ProcessingMethod::parse(v[3])?,
            frequency_low: f::float("frequency_low", v[4])?,
            frequency_high: f::float("frequency_high", v[5])?,
            hm0: opt("hm0", 6)?,
            tm02: opt("tm02", 7)?,
            tp: opt("tp", 8)?,
            dir_tp: opt("dir_tp", 9)?,
            spr_tp: opt("spr_tp", 10)?,
            main_direction: opt("main_direction", 11)?,
            error_code: f::hex_code("error_code", v[12])?,
        };
        data.validate()?;
        Ok(data)
    }

    pub(super) fn to_pnorb(&self) -> Vec<String> {
        let mut out = vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            self.spectrum_basis.code().to_string(),
            self.processing_method.code().to_string(),
            self.frequency_low.to_string(),
            self.frequency_high.to_string(),
        ];
        out.extend(
            [
                self.hm0,
                self.tm02,
                self.tp,
                self.dir_tp,
                self.spr_tp,
                self.main_direction,
            ]
            .into_iter()
            .map(f::fmt_opt),
        );
        out.push(f::fmt_hex(self.error_code));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNORW: &str = "$PNORW,120720,093150,0,1,0.89,-9.00,1.13,1.49,1.713,10.000,-9.00,\
                         -9.00,-9.00,-9.00,-9.00,10.7,0,0,0.010,344.4,0000*5F";
    const PNORB: &str = "$PNORB,120720,093150,1,4,0.02,0.20,0.27,7.54,12.00,82.42,75.46,82.10,0000*67";

    #[test]
    fn test_pnorw_sentinels() {
        let w = WaveSummary::from_pnorw(&Sentence::parse(PNORW).unwrap()).unwrap();
        assert_eq!(w.spectrum_basis, SpectrumBasis::Pressure);
        assert_eq!(w.processing_method, ProcessingMethod::Puv);
        assert_eq!(w.hm0, Some(0.89));
        assert_eq!(w.h3, None);
        assert_eq!(w.tp, Some(10.0));
        assert_eq!(w.dir_tp, None);
        assert_eq!(w.mean_pressure, Some(10.7));
        assert_eq!(w.near_surface_direction, Some(344.4));
    }

    #[test]
    fn test_pnorw_out_of_range_height() {
        let text = PNORW.replace(",0.89,", ",51.0,");
        let err = WaveSummary::from_pnorw(&Sentence::parse(&text).unwrap()).unwrap_err();
        assert!(matches!(err, FormatError::OutOfRange { field: "hm0", .. }));
    }

    #[test]
    fn test_pnorw_unknown_basis() {
        let text = PNORW.replace("093150,0,1", "093150,2,1");
        let err = WaveSummary::from_pnorw(&Sentence::parse(&text).unwrap()).unwrap_err();
        assert!(matches!(err, FormatError::OutOfRange { field: "spectrum_basis", .. }));
    }

    #[test]
    fn test_pnorb() {
        let b = WaveBand::from_pnorb(&Sentence::parse(PNORB).unwrap()).unwrap();
        assert_eq!(b.processing_method, ProcessingMethod::Mlmst);
        assert_eq!(b.frequency_low, 0.02);
        assert_eq!(b.frequency_high, 0.2);
        assert_eq!(b.main_direction, Some(82.1));
    }

    #[test]
    fn test_pnorb_band_order() {
        let text = PNORB.replace("0.02,0.20", "0.20,0.02");
        let err = WaveBand::from_pnorb(&Sentence::parse(&text).unwrap()).unwrap_err();
        assert!(matches!(err, FormatError::Inconsistent { field: "frequency_low", .. }));
    }
}
