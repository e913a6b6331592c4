//! Current velocity sentences: PNORC, PNORC1, PNORC2, PNORC3, PNORC4

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use super::config::CoordinateSystem;
use crate::core::protocol::fields::{self as f, FormatError, FormatResult};
use crate::core::protocol::sentence::{Sentence, TagDef};

/// Unit of the amplitude columns in PNORC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmplitudeUnit {
    /// Raw counts (`C`)
    Counts,
    /// Decibels (`D`)
    Decibels,
}

impl AmplitudeUnit {
    fn parse(raw: &str) -> FormatResult<Self> {
        match raw.trim() {
            "C" => Ok(Self::Counts),
            "D" => Ok(Self::Decibels),
            other => Err(FormatError::InvalidValue {
                field: "amplitude_unit",
                value: other.to_string(),
                reason: "expected C or D".to_string(),
            }),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Counts => "C",
            Self::Decibels => "D",
        }
    }
}

fn check_cell(cell_number: u16) -> FormatResult<u16> {
    f::check_int("cell_number", cell_number, 1, 1000)
}

/// PNORC velocity record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityData {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub cell_number: u16,
    /// Velocities 1..4 in m/s
    pub velocity: [f64; 4],
    pub speed: f64,
    pub direction: f64,
    pub amplitude_unit: AmplitudeUnit,
    pub amplitude: [u8; 4],
    pub correlation: [u8; 4],
}

impl VelocityData {
    pub fn validate(&self) -> FormatResult<()> {
        check_cell(self.cell_number)?;
        for (name, v) in VELOCITY_NAMES.into_iter().zip(self.velocity) {
            f::check(name, v, f::VELOCITY)?;
        }
        f::check("speed", self.speed, f::SPEED)?;
        f::check("direction", self.direction, f::DIRECTION)?;
        for (name, c) in CORRELATION_NAMES.into_iter().zip(self.correlation) {
            f::check_int(name, c, 0, 100)?;
        }
        Ok(())
    }

    pub(super) fn from_pnorc(s: &Sentence) -> FormatResult<Self> {
        let v = s.positional("PNORC", 18)?;
        let data = Self {
            date: f::date("date", v[0])?,
            time: f::time("time", v[1])?,
            cell_number: f::uint("cell_number", v[2])?,
            velocity: floats(&VELOCITY_NAMES, &v[3..7])?,
            speed: f::float("speed", v[7])?,
            direction: f::float("direction", v[8])?,
            amplitude_unit: AmplitudeUnit::parse(v[9])?,
            amplitude: bytes(&AMPLITUDE_NAMES, &v[10..14])?,
            correlation: bytes(&CORRELATION_NAMES, &v[14..18])?,
        };
        data.validate()?;
        Ok(data)
    }

    pub(super) fn to_pnorc(&self) -> Vec<String> {
        let mut out = vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            self.cell_number.to_string(),
        ];
        out.extend(self.velocity.iter().map(f64::to_string));
        out.push(self.speed.to_string());
        out.push(self.direction.to_string());
        out.push(self.amplitude_unit.as_str().to_string());
        out.extend(self.amplitude.iter().map(u8::to_string));
        out.extend(self.correlation.iter().map(u8::to_string));
        out
    }
}

const VELOCITY_NAMES: [&str; 4] = ["velocity1", "velocity2", "velocity3", "velocity4"];
const AMPLITUDE_NAMES: [&str; 4] = ["amplitude1", "amplitude2", "amplitude3", "amplitude4"];
const CORRELATION_NAMES: [&str; 4] = ["correlation1", "correlation2", "correlation3", "correlation4"];

fn floats<const N: usize>(names: &[&'static str; N], raw: &[&str]) -> FormatResult<[f64; N]> {
    let mut out = [0.0; N];
    for ((slot, name), value) in out.iter_mut().zip(names).zip(raw) {
        *slot = f::float(*name, value)?;
    }
    Ok(out)
}

fn bytes<const N: usize>(names: &[&'static str; N], raw: &[&str]) -> FormatResult<[u8; N]> {
    let mut out = [0u8; N];
    for ((slot, name), value) in out.iter_mut().zip(names).zip(raw) {
        *slot = f::uint(*name, value)?;
    }
    Ok(out)
}

fn check_cell_fields(
    cell_number: u16,
    cell_position: f64,
    velocity: &[f64],
    amplitude: &[f64; 4],
    correlation: &[u8; 4],
) -> FormatResult<()> {
    check_cell(cell_number)?;
    f::check("cell_position", cell_position, f::CELL_POSITION)?;
    for (name, v) in VELOCITY_NAMES.into_iter().zip(velocity) {
        f::check(name, *v, f::VELOCITY)?;
    }
    for (name, a) in AMPLITUDE_NAMES.into_iter().zip(amplitude) {
        f::check(name, *a, f::AMPLITUDE)?;
    }
    for (name, c) in CORRELATION_NAMES.into_iter().zip(correlation) {
        f::check_int(name, *c, 0, 100)?;
    }
    Ok(())
}

/// PNORC1 velocity record for one cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityCell {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub cell_number: u16,
    /// Distance of the cell centre from the instrument, metres
    pub cell_position: f64,
    /// Velocities 1..4 in m/s
    pub velocity: [f64; 4],
    /// Amplitudes in dB
    pub amplitude: [f64; 4],
    pub correlation: [u8; 4],
}

impl VelocityCell {
    pub fn validate(&self) -> FormatResult<()> {
        check_cell_fields(
            self.cell_number,
            self.cell_position,
            &self.velocity,
            &self.amplitude,
            &self.correlation,
        )
    }

    pub(super) fn from_pnorc1(s: &Sentence) -> FormatResult<Self> {
        let v = s.positional("PNORC1", 16)?;
        let cell = Self {
            date: f::date("date", v[0])?,
            time: f::time("time", v[1])?,
            cell_number: f::uint("cell_number", v[2])?,
            cell_position: f::float("cell_position", v[3])?,
            velocity: floats(&VELOCITY_NAMES, &v[4..8])?,
            amplitude: floats(&AMPLITUDE_NAMES, &v[8..12])?,
            correlation: bytes(&CORRELATION_NAMES, &v[12..16])?,
        };
        cell.validate()?;
        Ok(cell)
    }

    pub(super) fn to_pnorc1(&self) -> Vec<String> {
        let mut out = vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            self.cell_number.to_string(),
            self.cell_position.to_string(),
        ];
        out.extend(self.velocity.iter().map(f64::to_string));
        out.extend(self.amplitude.iter().map(f64::to_string));
        out.extend(self.correlation.iter().map(u8::to_string));
        out
    }
}

// Tag spellings per axis, in the order ENU, XYZ, BEAM
const AXIS1: &[&str] = &["VE", "VX", "VB1"];
const AXIS2: &[&str] = &["VN", "VY", "VB2"];
const AXIS3: &[&str] = &["VU", "VZ", "VB3"];
const AXIS4: &[&str] = &["VU2", "VZ2", "VB4"];
const AXIS_TAGS: [&[&str]; 4] = [AXIS1, AXIS2, AXIS3, AXIS4];

const PNORC2_TAGS: &[TagDef] = &[
    TagDef::required(&["DATE"]),
    TagDef::required(&["TIME"]),
    TagDef::required(&["CN"]),
    TagDef::required(&["CP"]),
    TagDef::required(AXIS1),
    TagDef::required(AXIS2),
    TagDef::required(AXIS3),
    TagDef::optional(AXIS4),
    TagDef::required(&["A1"]),
    TagDef::required(&["A2"]),
    TagDef::required(&["A3"]),
    TagDef::required(&["A4"]),
    TagDef::required(&["C1"]),
    TagDef::required(&["C2"]),
    TagDef::required(&["C3"]),
    TagDef::required(&["C4"]),
];

fn axis_of(spelling: &str) -> Option<CoordinateSystem> {
    AXIS_TAGS.iter().find_map(|group| {
        group
            .iter()
            .position(|s| *s == spelling)
            .map(|i| CoordinateSystem::ALL[i])
    })
}

/// PNORC2 tagged velocity record for one cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedVelocityCell {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub cell_number: u16,
    /// Distance of the cell centre from the instrument, metres
    pub cell_position: f64,
    /// Axis naming of the velocity tags
    pub axes: CoordinateSystem,
    /// First three velocity components in m/s
    pub velocity: [f64; 3],
    /// Fourth component (second vertical / beam 4); absent for 3-beam heads
    pub velocity4: Option<f64>,
    /// Amplitudes in dB
    pub amplitude: [f64; 4],
    pub correlation: [u8; 4],
}

impl TaggedVelocityCell {
    pub fn validate(&self) -> FormatResult<()> {
        check_cell_fields(
            self.cell_number,
            self.cell_position,
            &self.velocity,
            &self.amplitude,
            &self.correlation,
        )?;
        if let Some(v) = self.velocity4 {
            f::check("velocity4", v, f::VELOCITY)?;
        }
        Ok(())
    }

    pub(super) fn from_pnorc2(s: &Sentence) -> FormatResult<Self> {
        let t = s.tagged("PNORC2", PNORC2_TAGS)?;

        // every velocity tag must use the same axis naming
        let mut axes: Option<CoordinateSystem> = None;
        for group in &AXIS_TAGS {
            let Some(spelling) = t.spelling(group[0]) else {
                continue;
            };
            let axis = axis_of(spelling);
            match (axes, axis) {
                (None, found) => axes = found,
                (Some(a), Some(b)) if a != b => {
                    return Err(FormatError::Inconsistent {
                        field: "velocity",
                        value: spelling.to_string(),
                        rule: format!("velocity tags mix {} and {} axis names", a.name(), b.name()),
                    });
                }
                _ => {}
            }
        }
        let axes = axes.ok_or_else(|| FormatError::InvalidValue {
            field: "velocity",
            value: String::new(),
            reason: "no velocity tag names an axis".to_string(),
        })?;

        let cell = Self {
            date: f::date("date", t.require("DATE")?)?,
            time: f::time("time", t.require("TIME")?)?,
            cell_number: f::uint("cell_number", t.require("CN")?)?,
            cell_position: f::float("cell_position", t.require("CP")?)?,
            axes,
            velocity: [
                f::float("velocity1", t.require("VE")?)?,
                f::float("velocity2", t.require("VN")?)?,
                f::float("velocity3", t.require("VU")?)?,
            ],
            velocity4: t.get("VU2").map(|v| f::float("velocity4", v)).transpose()?,
            amplitude: [
                f::float("amplitude1", t.require("A1")?)?,
                f::float("amplitude2", t.require("A2")?)?,
                f::float("amplitude3", t.require("A3")?)?,
                f::float("amplitude4", t.require("A4")?)?,
            ],
            correlation: [
                f::uint("correlation1", t.require("C1")?)?,
                f::uint("correlation2", t.require("C2")?)?,
                f::uint("correlation3", t.require("C3")?)?,
                f::uint("correlation4", t.require("C4")?)?,
            ],
        };
        cell.validate()?;
        Ok(cell)
    }

    pub(super) fn to_pnorc2(&self) -> Vec<String> {
        let axis = self.axes.code() as usize;
        let mut out = vec![
            format!("DATE={}", f::fmt_date(self.date)),
            format!("TIME={}", f::fmt_time(self.time)),
            format!("CN={}", self.cell_number),
            format!("CP={}", self.cell_position),
        ];
        for (group, v) in AXIS_TAGS.iter().zip(self.velocity) {
            out.push(format!("{}={}", group[axis], v));
        }
        if let Some(v) = self.velocity4 {
            out.push(format!("{}={}", AXIS_TAGS[3][axis], v));
        }
        for (i, a) in self.amplitude.iter().enumerate() {
            out.push(format!("A{}={}", i + 1, a));
        }
        for (i, c) in self.correlation.iter().enumerate() {
            out.push(format!("C{}={}", i + 1, c));
        }
        out
    }
}

/// PNORC3/PNORC4 averaged current record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentSummary {
    pub cell_position: f64,
    pub speed: f64,
    pub direction: f64,
    pub average_correlation: u8,
    pub average_amplitude: u8,
}

const PNORC3_TAGS: &[TagDef] = &[
    TagDef::required(&["CP"]),
    TagDef::required(&["SP"]),
    TagDef::required(&["DIR"]),
    TagDef::required(&["AC"]),
    TagDef::required(&["AA"]),
];

impl CurrentSummary {
    pub fn validate(&self) -> FormatResult<()> {
        f::check("cell_position", self.cell_position, f::CELL_POSITION)?;
        f::check("speed", self.speed, f::SPEED)?;
        f::check("direction", self.direction, f::DIRECTION)?;
        f::check_int("average_correlation", self.average_correlation, 0, 100)?;
        Ok(())
    }

    pub(super) fn from_pnorc3(s: &Sentence) -> FormatResult<Self> {
        let t = s.tagged("PNORC3", PNORC3_TAGS)?;
        Self::build([
            t.require("CP")?,
            t.require("SP")?,
            t.require("DIR")?,
            t.require("AC")?,
            t.require("AA")?,
        ])
    }

    pub(super) fn from_pnorc4(s: &Sentence) -> FormatResult<Self> {
        let v = s.positional("PNORC4", 5)?;
        Self::build([v[0], v[1], v[2], v[3], v[4]])
    }

    fn build(v: [&str; 5]) -> FormatResult<Self> {
        let data = Self {
            cell_position: f::float("cell_position", v[0])?,
            speed: f::float("speed", v[1])?,
            direction: f::float("direction", v[2])?,
            average_correlation: f::uint("average_correlation", v[3])?,
            average_amplitude: f::uint("average_amplitude", v[4])?,
        };
        data.validate()?;
        Ok(data)
    }

    pub(super) fn to_pnorc4(&self) -> Vec<String> {
        vec![
            self.cell_position.to_string(),
            self.speed.to_string(),
            self.direction.to_string(),
            self.average_correlation.to_string(),
            self.average_amplitude.to_string(),
        ]
    }

    pub(super) fn to_pnorc3(&self) -> Vec<String> {
        PNORC3_TAGS
            .iter()
            .zip(self.to_pnorc4())
            .map(|(def, value)| format!("{}={}", def.canonical, value))
            .collect()
    }
}
