//! Variable-length spectral sentences: PNORE, PNORF, PNORWD
//!
//! Each carries a frequency axis (start, step) followed by a declared count
//! and exactly that many values. [`Spectrum`] owns that invariant: it can
//! only be built through [`Spectrum::new`], so a record holding one always
//! has `declared_count == values.len()` however it was constructed.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use super::wave::SpectrumBasis;
use crate::core::protocol::fields::{self as f, Bound, FormatError, FormatResult};
use crate::core::protocol::sentence::Sentence;

const START_FREQUENCY: Bound = Bound::Closed(0.0, 10.0);
const STEP_FREQUENCY: Bound = Bound::LeftOpen(0.0, 10.0);
pub const MAX_BINS: usize = 1000;

/// Frequency axis plus one value per bin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    start_frequency: f64,
    step_frequency: f64,
    declared_count: usize,
    values: Vec<f64>,
}

impl Spectrum {
    pub fn new(
        start_frequency: f64,
        step_frequency: f64,
        declared_count: usize,
        values: Vec<f64>,
    ) -> FormatResult<Self> {
        f::check("start_frequency", start_frequency, START_FREQUENCY)?;
        f::check("step_frequency", step_frequency, STEP_FREQUENCY)?;
        f::check_int("count", declared_count, 1, MAX_BINS)?;
        if declared_count != values.len() {
            return Err(FormatError::CountMismatch {
                field: "count",
                declared: declared_count,
                actual: values.len(),
            });
        }
        Ok(Self {
            start_frequency,
            step_frequency,
            declared_count,
            values,
        })
    }

    pub fn start_frequency(&self) -> f64 {
        self.start_frequency
    }

    pub fn step_frequency(&self) -> f64 {
        self.step_frequency
    }

    pub fn declared_count(&self) -> usize {
        self.declared_count
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Centre frequency of bin `i`
    pub fn frequency(&self, i: usize) -> f64 {
        self.start_frequency + self.step_frequency * i as f64
    }

    fn check_values(&self, field: &'static str, bound: Bound) -> FormatResult<()> {
        for v in &self.values {
            f::check(field, *v, bound)?;
        }
        Ok(())
    }

    fn parse(raw_start: &str, raw_step: &str, declared: usize, raw_values: &[&str], field: &'static str) -> FormatResult<Self> {
        let values = raw_values
            .iter()
            .map(|raw| f::float(field, raw))
            .collect::<FormatResult<Vec<_>>>()?;
        Self::new(
            f::float("start_frequency", raw_start)?,
            f::float("step_frequency", raw_step)?,
            declared,
            values,
        )
    }

    fn push_fields(&self, out: &mut Vec<String>) {
        out.push(self.start_frequency.to_string());
        out.push(self.step_frequency.to_string());
        out.push(self.declared_count.to_string());
        out.extend(self.values.iter().map(|v| v.to_string()));
    }
}

/// PNORE wave energy density spectrum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySpectrum {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub spectrum_basis: SpectrumBasis,
    /// Energy density per bin, m^2/Hz
    pub spectrum: Spectrum,
}

impl EnergySpectrum {
    pub fn new(date: NaiveDate, time: NaiveTime, spectrum_basis: SpectrumBasis, spectrum: Spectrum) -> FormatResult<Self> {
        let record = Self {
            date,
            time,
            spectrum_basis,
            spectrum,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> FormatResult<()> {
        self.spectrum.check_values("energy_density", Bound::AtLeast(0.0))
    }

    pub(super) fn from_pnore(s: &Sentence) -> FormatResult<Self> {
        let (head, n, values) = s.counted("PNORE", 6, "count")?;
        let spectrum = Spectrum::parse(head[3], head[4], n, values, "energy_density")?;
        Self::new(
            f::date("date", head[0])?,
            f::time("time", head[1])?,
            SpectrumBasis::parse(head[2])?,
            spectrum,
        )
    }

    pub(super) fn to_pnore(&self) -> Vec<String> {
        let mut out = vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            self.spectrum_basis.code().to_string(),
        ];
        self.spectrum.push_fields(&mut out);
        out
    }
}

/// Which Fourier coefficient a PNORF sentence carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoefficientFlag {
    A1,
    B1,
    A2,
    B2,
}

impl CoefficientFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::B1 => "B1",
            Self::A2 => "A2",
            Self::B2 => "B2",
        }
    }

    fn parse(raw: &str) -> FormatResult<Self> {
        match raw.trim() {
            "A1" => Ok(Self::A1),
            "B1" => Ok(Self::B1),
            "A2" => Ok(Self::A2),
            "B2" => Ok(Self::B2),
            other => Err(FormatError::InvalidValue {
                field: "coefficient",
                value: other.to_string(),
                reason: "expected one of A1, B1, A2, B2".to_string(),
            }),
        }
    }
}

/// PNORF directional Fourier coefficients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FourierCoefficients {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub coefficient: CoefficientFlag,
    pub spectrum_basis: SpectrumBasis,
    pub spectrum: Spectrum,
}

impl FourierCoefficients {
    pub fn new(
        date: NaiveDate,
        time: NaiveTime,
        coefficient: CoefficientFlag,
        spectrum_basis: SpectrumBasis,
        spectrum: Spectrum,
    ) -> FormatResult<Self> {
        let record = Self {
            date,
            time,
            coefficient,
            spectrum_basis,
            spectrum,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> FormatResult<()> {
        self.spectrum.check_values("coefficient_value", Bound::Closed(-1.0, 1.0))
    }

    pub(super) fn from_pnorf(s: &Sentence) -> FormatResult<Self> {
        let (head, n, values) = s.counted("PNORF", 7, "count")?;
        let spectrum = Spectrum::parse(head[4], head[5], n, values, "coefficient_value")?;
        Self::new(
            f::date("date", head[0])?,
            f::time("time", head[1])?,
            CoefficientFlag::parse(head[2])?,
            SpectrumBasis::parse(head[3])?,
            spectrum,
        )
    }

    pub(super) fn to_pnorf(&self) -> Vec<String> {
        let mut out = vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            self.coefficient.as_str().to_string(),
            self.spectrum_basis.code().to_string(),
        ];
        self.spectrum.push_fields(&mut out);
        out
    }
}

/// What a PNORWD sentence's values describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DirectionType {
    /// Mean direction per bin
    MD,
    /// Directional spread per bin
    DS,
}

impl DirectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MD => "MD",
            Self::DS => "DS",
        }
    }

    fn parse(raw: &str) -> FormatResult<Self> {
        match raw.trim() {
            "MD" => Ok(Self::MD),
            "DS" => Ok(Self::DS),
            other => Err(FormatError::InvalidValue {
                field: "direction_type",
                value: other.to_string(),
                reason: "expected MD or DS".to_string(),
            }),
        }
    }
}

/// PNORWD directional spectrum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionalSpectrum {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub direction_type: DirectionType,
    /// Degrees per bin
    pub spectrum: Spectrum,
}

impl DirectionalSpectrum {
    pub fn new(date: NaiveDate, time: NaiveTime, direction_type: DirectionType, spectrum: Spectrum) -> FormatResult<Self> {
        let record = Self {
            date,
            time,
            direction_type,
            spectrum,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> FormatResult<()> {
        self.spectrum.check_values("direction", Bound::Closed(0.0, 360.0))
    }

    pub(super) fn from_pnorwd(s: &Sentence) -> FormatResult<Self> {
        let (head, n, values) = s.counted("PNORWD", 6, "count")?;
        let spectrum = Spectrum::parse(head[3], head[4], n, values, "direction")?;
        Self::new(
            f::date("date", head[0])?,
            f::time("time", head[1])?,
            DirectionType::parse(head[2])?,
            spectrum,
        )
    }

    pub(super) fn to_pnorwd(&self) -> Vec<String> {
        let mut out = vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            self.direction_type.as_str().to_string(),
        ];
        self.spectrum.push_fields(&mut out);
        out
    }
}
