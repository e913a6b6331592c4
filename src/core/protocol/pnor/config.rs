//! Instrument configuration sentences: PNORI, PNORI1, PNORI2

use serde::Serialize;

use crate::core::protocol::fields::{self, Bound, FormatError, FormatResult};
use crate::core::protocol::sentence::{Sentence, TagDef};

/// Instrument model reported in the configuration sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentType {
    /// Aquadopp single-point current meter
    Aquadopp,
    /// Aquadopp profiler
    AquadoppProfiler,
    /// Signature series
    Signature,
}

impl InstrumentType {
    /// Numeric code on the wire
    pub fn code(self) -> u8 {
        match self {
            Self::Aquadopp => 0,
            Self::AquadoppProfiler => 2,
            Self::Signature => 4,
        }
    }

    /// Look up a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Aquadopp),
            2 => Some(Self::AquadoppProfiler),
            4 => Some(Self::Signature),
            _ => None,
        }
    }

    /// Beam counts this model can report
    pub fn beam_range(self) -> (u8, u8) {
        match self {
            Self::Signature => (4, 4),
            Self::Aquadopp | Self::AquadoppProfiler => (1, 3),
        }
    }
}

/// Coordinate system of velocity data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinateSystem {
    /// East/North/Up
    Enu,
    /// Instrument X/Y/Z
    Xyz,
    /// Along-beam
    Beam,
}

impl CoordinateSystem {
    /// All systems, in code order
    pub const ALL: [CoordinateSystem; 3] = [Self::Enu, Self::Xyz, Self::Beam];

    /// Numeric code on the wire
    pub fn code(self) -> u8 {
        match self {
            Self::Enu => 0,
            Self::Xyz => 1,
            Self::Beam => 2,
        }
    }

    /// Name on the wire
    pub fn name(self) -> &'static str {
        match self {
            Self::Enu => "ENU",
            Self::Xyz => "XYZ",
            Self::Beam => "BEAM",
        }
    }

    /// Look up a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Look up a wire name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Instrument configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentConfig {
    pub instrument_type: InstrumentType,
    pub head_id: String,
    pub beam_count: u8,
    pub cell_count: u16,
    /// Blanking distance in metres
    pub blanking_distance: f64,
    /// Cell size in metres
    pub cell_size: f64,
    pub coordinate_system: CoordinateSystem,
}

const HEAD_ID_MAX: usize = 32;

impl InstrumentConfig {
    /// Check every field and the model/beam-count rule
    pub fn validate(&self) -> FormatResult<()> {
        if self.head_id.is_empty()
            || self.head_id.len() > HEAD_ID_MAX
            || !self.head_id.bytes().all(|b| b.is_ascii_graphic() && b != b',' && b != b'*')
        {
            return Err(FormatError::InvalidValue {
                field: "head_id",
                value: self.head_id.clone(),
                reason: format!("expected 1-{HEAD_ID_MAX} printable characters without ',' or '*'"),
            });
        }
        fields::check_int("beam_count", self.beam_count, 1, 4)?;
        let (min_beams, max_beams) = self.instrument_type.beam_range();
        if self.beam_count < min_beams || self.beam_count > max_beams {
            let rule = if min_beams == max_beams {
                format!("{:?} instruments require exactly {min_beams} beams", self.instrument_type)
            } else {
                format!(
                    "{:?} instruments have {min_beams} to {max_beams} beams",
                    self.instrument_type
                )
            };
            return Err(FormatError::Inconsistent {
                field: "beam_count",
                value: self.beam_count.to_string(),
                rule,
            });
        }
        fields::check_int("cell_count", self.cell_count, 1, 1000)?;
        fields::check("blanking_distance", self.blanking_distance, Bound::Closed(0.0, 100.0))?;
        fields::check("cell_size", self.cell_size, Bound::LeftOpen(0.0, 100.0))?;
        Ok(())
    }

    /// PNORI: coordinate system as a numeric code
    pub(super) fn from_pnori(s: &Sentence) -> FormatResult<Self> {
        let f = s.positional("PNORI", 7)?;
        let code = fields::uint::<u8>("coordinate_system", f[6])?;
        let coordinate_system = CoordinateSystem::from_code(code).ok_or_else(|| {
            FormatError::OutOfRange {
                field: "coordinate_system",
                value: code.to_string(),
                bound: "one of 0 (ENU), 1 (XYZ), 2 (BEAM)".to_string(),
            }
        })?;
        Self::build(f[0], f[1], f[2], f[3], f[4], f[5], coordinate_system)
    }

    /// PNORI1: coordinate system by name
    pub(super) fn from_pnori1(s: &Sentence) -> FormatResult<Self> {
        let f = s.positional("PNORI1", 7)?;
        Self::build(f[0], f[1], f[2], f[3], f[4], f[5], coordinate_name(f[6])?)
    }

    /// PNORI2: tagged form
    pub(super) fn from_pnori2(s: &Sentence) -> FormatResult<Self> {
        const TAGS: &[TagDef] = &[
            TagDef::required(&["IT"]),
            TagDef::required(&["SN"]),
            TagDef::required(&["NB"]),
            TagDef::required(&["NC"]),
            TagDef::required(&["BD"]),
            TagDef::required(&["CS"]),
            TagDef::required(&["CY"]),
        ];
        let t = s.tagged("PNORI2", TAGS)?;
        Self::build(
            t.require("IT")?,
            t.require("SN")?,
            t.require("NB")?,
            t.require("NC")?,
            t.require("BD")?,
            t.require("CS")?,
            coordinate_name(t.require("CY")?)?,
        )
    }

    fn build(
        instrument_type: &str,
        head_id: &str,
        beams: &str,
        cells: &str,
        blanking: &str,
        cell_size: &str,
        coordinate_system: CoordinateSystem,
    ) -> FormatResult<Self> {
        let code = fields::uint::<u8>("instrument_type", instrument_type)?;
        let instrument_type =
            InstrumentType::from_code(code).ok_or_else(|| FormatError::OutOfRange {
                field: "instrument_type",
                value: code.to_string(),
                bound: "one of 0 (Aquadopp), 2 (Aquadopp Profiler), 4 (Signature)".to_string(),
            })?;
        let config = Self {
            instrument_type,
            head_id: fields::text("head_id", head_id)?,
            beam_count: fields::uint("beam_count", beams)?,
            cell_count: fields::uint("cell_count", cells)?,
            blanking_distance: fields::float("blanking_distance", blanking)?,
            cell_size: fields::float("cell_size", cell_size)?,
            coordinate_system,
        };
        config.validate()?;
        Ok(config)
    }

    fn common_fields(&self) -> [String; 6] {
        [
            self.instrument_type.code().to_string(),
            self.head_id.clone(),
            self.beam_count.to_string(),
            self.cell_count.to_string(),
            self.blanking_distance.to_string(),
            self.cell_size.to_string(),
        ]
    }

    pub(super) fn to_pnori(&self) -> Vec<String> {
        let mut out = self.common_fields().to_vec();
        out.push(self.coordinate_system.code().to_string());
        out
    }

    pub(super) fn to_pnori1(&self) -> Vec<String> {
        let mut out = self.common_fields().to_vec();
        out.push(self.coordinate_system.name().to_string());
        out
    }

    pub(super) fn to_pnori2(&self) -> Vec<String> {
        let [it, sn, nb, nc, bd, cs] = self.common_fields();
        vec![
            format!("IT={it}"),
            format!("SN={sn}"),
            format!("NB={nb}"),
            format!("NC={nc}"),
            format!("BD={bd}"),
            format!("CS={cs}"),
            format!("CY={}", self.coordinate_system.name()),
        ]
    }
}

fn coordinate_name(raw: &str) -> FormatResult<CoordinateSystem> {
    CoordinateSystem::from_name(raw).ok_or_else(|| FormatError::InvalidValue {
        field: "coordinate_system",
        value: raw.to_string(),
        reason: "expected ENU, XYZ or BEAM".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(f: fn(&Sentence) -> FormatResult<InstrumentConfig>, text: &str) -> FormatResult<InstrumentConfig> {
        f(&Sentence::parse(text)?)
    }

    #[test]
    fn test_pnori_signature() {
        let cfg = parse(
            InstrumentConfig::from_pnori,
            "$PNORI,4,Signature1000900001,4,20,0.20,1.00,0*2E",
        )
        .unwrap();
        assert_eq!(cfg.instrument_type, InstrumentType::Signature);
        assert_eq!(cfg.head_id, "Signature1000900001");
        assert_eq!(cfg.beam_count, 4);
        assert_eq!(cfg.cell_count, 20);
        assert_eq!(cfg.blanking_distance, 0.2);
        assert_eq!(cfg.cell_size, 1.0);
        assert_eq!(cfg.coordinate_system, CoordinateSystem::Enu);
    }

    #[test]
    fn test_signature_needs_four_beams() {
        let err = parse(InstrumentConfig::from_pnori, "$PNORI,4,Test,3,20,0.20,1.00,0*00").unwrap_err();
        assert!(matches!(err, FormatError::Inconsistent { field: "beam_count", .. }));
        assert!(err.to_string().contains("exactly 4 beams"), "{err}");
    }

    #[test]
    fn test_aquadopp_beam_limit() {
        assert!(parse(InstrumentConfig::from_pnori, "$PNORI,2,AQP123,3,10,0.5,1.0,1").is_ok());
        assert!(parse(InstrumentConfig::from_pnori, "$PNORI,0,AQD123,4,1,0.5,1.0,1").is_err());
    }

    #[test]
    fn test_unknown_codes() {
        let err = parse(InstrumentConfig::from_pnori, "$PNORI,3,X,4,20,0.2,1.0,0").unwrap_err();
        assert!(matches!(err, FormatError::OutOfRange { field: "instrument_type", .. }));
        let err = parse(InstrumentConfig::from_pnori, "$PNORI,4,X,4,20,0.2,1.0,7").unwrap_err();
        assert!(matches!(err, FormatError::OutOfRange { field: "coordinate_system", .. }));
    }

    #[test]
    fn test_pnori1_and_pnori2_agree() {
        let one = parse(InstrumentConfig::from_pnori1, "$PNORI1,4,123456,4,30,1.00,5.00,BEAM*5B").unwrap();
        let two = parse(
            InstrumentConfig::from_pnori2,
            "$PNORI2,CY=BEAM,IT=4,SN=123456,NB=4,NC=30,BD=1.00,CS=5.00*68",
        )
        .unwrap();
        assert_eq!(one, two);
        assert_eq!(one.coordinate_system, CoordinateSystem::Beam);
    }

    #[test]
    fn test_pnori1_rejects_numeric_coordinate() {
        let err = parse(InstrumentConfig::from_pnori1, "$PNORI1,4,123456,4,30,1.00,5.00,2").unwrap_err();
        assert!(matches!(err, FormatError::InvalidValue { field: "coordinate_system", .. }));
    }

    #[test]
    fn test_coordinate_code_name_bijection() {
        for cs in CoordinateSystem::ALL {
            assert_eq!(CoordinateSystem::from_code(cs.code()), Some(cs));
            assert_eq!(CoordinateSystem::from_name(cs.name()), Some(cs));
        }
        assert_eq!(CoordinateSystem::from_name("enu"), Some(CoordinateSystem::Enu));
        assert_eq!(CoordinateSystem::from_name("NED"), None);
    }

    #[test]
    fn test_ranges() {
        assert!(parse(InstrumentConfig::from_pnori, "$PNORI,4,X,4,0,0.2,1.0,0").is_err());
        assert!(parse(InstrumentConfig::from_pnori, "$PNORI,4,X,4,20,0.2,0,0").is_err());
        assert!(parse(InstrumentConfig::from_pnori, "$PNORI,4,X,4,20,-0.1,1,0").is_err());
    }
}
