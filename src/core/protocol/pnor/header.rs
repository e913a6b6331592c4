//! Header and altitude sentences: PNORH3, PNORH4, PNORA

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::core::protocol::fields::{self as f, Bound, FormatResult};
use crate::core::protocol::sentence::{Sentence, TagDef};

/// Measurement header preceding a burst of velocity cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderData {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub error_code: u32,
    pub status_code: u32,
}

const PNORH3_TAGS: &[TagDef] = &[
    TagDef::required(&["DATE"]),
    TagDef::required(&["TIME"]),
    TagDef::required(&["EC"]),
    TagDef::required(&["SC"]),
];

impl HeaderData {
    pub(super) fn from_pnorh3(s: &Sentence) -> FormatResult<Self> {
        let t = s.tagged("PNORH3", PNORH3_TAGS)?;
        Self::build([
            t.require("DATE")?,
            t.require("TIME")?,
            t.require("EC")?,
            t.require("SC")?,
        ])
    }

    pub(super) fn from_pnorh4(s: &Sentence) -> FormatResult<Self> {
        let v = s.positional("PNORH4", 4)?;
        Self::build([v[0], v[1], v[2], v[3]])
    }

    fn build(v: [&str; 4]) -> FormatResult<Self> {
        Ok(Self {
            date: f::date("date", v[0])?,
            time: f::time("time", v[1])?,
            error_code: f::hex_code("error_code", v[2])?,
            status_code: f::hex_code("status_code", v[3])?,
        })
    }

    pub(super) fn to_pnorh4(&self) -> Vec<String> {
        vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            f::fmt_hex(self.error_code),
            f::fmt_hex(self.status_code),
        ]
    }

    pub(super) fn to_pnorh3(&self) -> Vec<String> {
        PNORH3_TAGS
            .iter()
            .zip(self.to_pnorh4())
            .map(|(def, value)| format!("{}={}", def.canonical, value))
            .collect()
    }
}

/// Altimeter reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AltitudeData {
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Pressure in dbar
    pub pressure: f64,
    /// Distance to the surface or bottom in metres
    pub altitude: f64,
    pub quality: u16,
    pub status: u32,
}

const ALTITUDE: Bound = Bound::Closed(0.0, 1000.0);

impl AltitudeData {
    pub fn validate(&self) -> FormatResult<()> {
        f::check("pressure", self.pressure, f::PRESSURE)?;
        f::check("altitude", self.altitude, ALTITUDE)?;
        f::check_int("status", self.status, 0, 0xFF)?;
        Ok(())
    }

    pub(super) fn from_pnora(s: &Sentence) -> FormatResult<Self> {
        let v = s.positional("PNORA", 6)?;
        let data = Self {
            date: f::date("date", v[0])?,
            time: f::time("time", v[1])?,
            pressure: f::float("pressure", v[2])?,
            altitude: f::float("altitude", v[3])?,
            quality: f::uint("quality", v[4])?,
            status: f::hex_code("status", v[5])?,
        };
        data.validate()?;
        Ok(data)
    }

    pub(super) fn to_pnora(&self) -> Vec<String> {
        vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            self.pressure.to_string(),
            self.altitude.to_string(),
            self.quality.to_string(),
            format!("{:02X}", self.status),
        ]
    }
}
