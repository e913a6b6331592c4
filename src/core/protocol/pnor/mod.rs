//! PNORx sentence families emitted by Nortek current profilers
//!
//! Every family parses into one of a handful of record structs; related
//! families (e.g. PNORI, PNORI1 and PNORI2) share a struct and differ only
//! in their wire layout. [`Message`] ties a record to the family it was
//! read from so it can be written back in the same layout.

pub mod config;
pub mod header;
pub mod sensor;
pub mod spectrum;
pub mod velocity;
pub mod wave;

use serde::Serialize;
use std::fmt;

use super::checksum;
use super::fields::FormatResult;
use super::sentence::Sentence;

pub use config::{CoordinateSystem, InstrumentConfig, InstrumentType};
pub use header::{AltitudeData, HeaderData};
pub use sensor::{SensorData, SensorStats, SensorSummary};
pub use spectrum::{
    CoefficientFlag, DirectionType, DirectionalSpectrum, EnergySpectrum, FourierCoefficients, Spectrum,
};
pub use velocity::{AmplitudeUnit, CurrentSummary, TaggedVelocityCell, VelocityCell, VelocityData};
pub use wave::{ProcessingMethod, SpectrumBasis, WaveBand, WaveSummary};

/// Sentence families understood out of the box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Pnori,
    Pnori1,
    Pnori2,
    Pnors,
    Pnors1,
    Pnors2,
    Pnors3,
    Pnors4,
    Pnorc,
    Pnorc1,
    Pnorc2,
    Pnorc3,
    Pnorc4,
    Pnorh3,
    Pnorh4,
    Pnora,
    Pnorw,
    Pnorb,
    Pnore,
    Pnorf,
    Pnorwd,
}

impl Family {
    pub const ALL: [Family; 21] = [
        Family::Pnori,
        Family::Pnori1,
        Family::Pnori2,
        Family::Pnors,
        Family::Pnors1,
        Family::Pnors2,
        Family::Pnors3,
        Family::Pnors4,
        Family::Pnorc,
        Family::Pnorc1,
        Family::Pnorc2,
        Family::Pnorc3,
        Family::Pnorc4,
        Family::Pnorh3,
        Family::Pnorh4,
        Family::Pnora,
        Family::Pnorw,
        Family::Pnorb,
        Family::Pnore,
        Family::Pnorf,
        Family::Pnorwd,
    ];

    /// Sentence prefix without `$`
    pub fn prefix(self) -> &'static str {
        match self {
            Family::Pnori => "PNORI",
            Family::Pnori1 => "PNORI1",
            Family::Pnori2 => "PNORI2",
            Family::Pnors => "PNORS",
            Family::Pnors1 => "PNORS1",
            Family::Pnors2 => "PNORS2",
            Family::Pnors3 => "PNORS3",
            Family::Pnors4 => "PNORS4",
            Family::Pnorc => "PNORC",
            Family::Pnorc1 => "PNORC1",
            Family::Pnorc2 => "PNORC2",
            Family::Pnorc3 => "PNORC3",
            Family::Pnorc4 => "PNORC4",
            Family::Pnorh3 => "PNORH3",
            Family::Pnorh4 => "PNORH4",
            Family::Pnora => "PNORA",
            Family::Pnorw => "PNORW",
            Family::Pnorb => "PNORB",
            Family::Pnore => "PNORE",
            Family::Pnorf => "PNORF",
            Family::Pnorwd => "PNORWD",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.prefix() == prefix)
    }

    /// Parse a full sentence of this family. The checksum trailer is
    /// recorded on the sentence but not checked here.
    pub fn parse(self, text: &str) -> FormatResult<Message> {
        let s = Sentence::parse(text)?;
        s.expect_prefix(self.prefix())?;
        Ok(match self {
            Family::Pnori => Message::Pnori(InstrumentConfig::from_pnori(&s)?),
            Family::Pnori1 => Message::Pnori1(InstrumentConfig::from_pnori1(&s)?),
            Family::Pnori2 => Message::Pnori2(InstrumentConfig::from_pnori2(&s)?),
            Family::Pnors => Message::Pnors(SensorData::from_pnors(&s)?),
            Family::Pnors1 => Message::Pnors1(SensorStats::from_pnors1(&s)?),
            Family::Pnors2 => Message::Pnors2(SensorStats::from_pnors2(&s)?),
            Family::Pnors3 => Message::Pnors3(SensorSummary::from_pnors3(&s)?),
            Family::Pnors4 => Message::Pnors4(SensorSummary::from_pnors4(&s)?),
            Family::Pnorc => Message::Pnorc(VelocityData::from_pnorc(&s)?),
            Family::Pnorc1 => Message::Pnorc1(VelocityCell::from_pnorc1(&s)?),
            Family::Pnorc2 => Message::Pnorc2(TaggedVelocityCell::from_pnorc2(&s)?),
            Family::Pnorc3 => Message::Pnorc3(CurrentSummary::from_pnorc3(&s)?),
            Family::Pnorc4 => Message::Pnorc4(CurrentSummary::from_pnorc4(&s)?),
            Family::Pnorh3 => Message::Pnorh3(HeaderData::from_pnorh3(&s)?),
            Family::Pnorh4 => Message::Pnorh4(HeaderData::from_pnorh4(&s)?),
            Family::Pnora => Message::Pnora(AltitudeData::from_pnora(&s)?),
            Family::Pnorw => Message::Pnorw(WaveSummary::from_pnorw(&s)?),
            Family::Pnorb => Message::Pnorb(WaveBand::from_pnorb(&s)?),
            Family::Pnore => Message::Pnore(EnergySpectrum::from_pnore(&s)?),
            Family::Pnorf => Message::Pnorf(FourierCoefficients::from_pnorf(&s)?),
            Family::Pnorwd => Message::Pnorwd(DirectionalSpectrum::from_pnorwd(&s)?),
        })
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Coarse record category, used to route records to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Config,
    Sensor,
    Velocity,
    Header,
    Altitude,
    WaveBand,
    WaveEnergy,
    Fourier,
    Directional,
    WaveSummary,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Config => "config",
            RecordKind::Sensor => "sensor",
            RecordKind::Velocity => "velocity",
            RecordKind::Header => "header",
            RecordKind::Altitude => "altitude",
            RecordKind::WaveBand => "wave_band",
            RecordKind::WaveEnergy => "wave_energy",
            RecordKind::Fourier => "fourier",
            RecordKind::Directional => "directional",
            RecordKind::WaveSummary => "wave_summary",
        }
    }
}

/// A decoded sentence, tagged with the family it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "UPPERCASE")]
pub enum Message {
    Pnori(InstrumentConfig),
    Pnori1(InstrumentConfig),
    Pnori2(InstrumentConfig),
    Pnors(SensorData),
    Pnors1(SensorStats),
    Pnors2(SensorStats),
    Pnors3(SensorSummary),
    Pnors4(SensorSummary),
    Pnorc(VelocityData),
    Pnorc1(VelocityCell),
    Pnorc2(TaggedVelocityCell),
    Pnorc3(CurrentSummary),
    Pnorc4(CurrentSummary),
    Pnorh3(HeaderData),
    Pnorh4(HeaderData),
    Pnora(AltitudeData),
    Pnorw(WaveSummary),
    Pnorb(WaveBand),
    Pnore(EnergySpectrum),
    Pnorf(FourierCoefficients),
    Pnorwd(DirectionalSpectrum),
}

impl Message {
    pub fn family(&self) -> Family {
        match self {
            Message::Pnori(_) => Family::Pnori,
            Message::Pnori1(_) => Family::Pnori1,
            Message::Pnori2(_) => Family::Pnori2,
            Message::Pnors(_) => Family::Pnors,
            Message::Pnors1(_) => Family::Pnors1,
            Message::Pnors2(_) => Family::Pnors2,
            Message::Pnors3(_) => Family::Pnors3,
            Message::Pnors4(_) => Family::Pnors4,
            Message::Pnorc(_) => Family::Pnorc,
            Message::Pnorc1(_) => Family::Pnorc1,
            Message::Pnorc2(_) => Family::Pnorc2,
            Message::Pnorc3(_) => Family::Pnorc3,
            Message::Pnorc4(_) => Family::Pnorc4,
            Message::Pnorh3(_) => Family::Pnorh3,
            Message::Pnorh4(_) => Family::Pnorh4,
            Message::Pnora(_) => Family::Pnora,
            Message::Pnorw(_) => Family::Pnorw,
            Message::Pnorb(_) => Family::Pnorb,
            Message::Pnore(_) => Family::Pnore,
            Message::Pnorf(_) => Family::Pnorf,
            Message::Pnorwd(_) => Family::Pnorwd,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Message::Pnori(_) | Message::Pnori1(_) | Message::Pnori2(_) => RecordKind::Config,
            Message::Pnors(_)
            | Message::Pnors1(_)
            | Message::Pnors2(_)
            | Message::Pnors3(_)
            | Message::Pnors4(_) => RecordKind::Sensor,
            Message::Pnorc(_)
            | Message::Pnorc1(_)
            | Message::Pnorc2(_)
            | Message::Pnorc3(_)
            | Message::Pnorc4(_) => RecordKind::Velocity,
            Message::Pnorh3(_) | Message::Pnorh4(_) => RecordKind::Header,
            Message::Pnora(_) => RecordKind::Altitude,
            Message::Pnorw(_) => RecordKind::WaveSummary,
            Message::Pnorb(_) => RecordKind::WaveBand,
            Message::Pnore(_) => RecordKind::WaveEnergy,
            Message::Pnorf(_) => RecordKind::Fourier,
            Message::Pnorwd(_) => RecordKind::Directional,
        }
    }

    /// Re-run the range and cross-field checks applied at parse time
    pub fn validate(&self) -> FormatResult<()> {
        match self {
            Message::Pnori(m) | Message::Pnori1(m) | Message::Pnori2(m) => m.validate(),
            Message::Pnors(m) => m.validate(),
            Message::Pnors1(m) | Message::Pnors2(m) => m.validate(),
            Message::Pnors3(m) | Message::Pnors4(m) => m.validate(),
            Message::Pnorc(m) => m.validate(),
            Message::Pnorc1(m) => m.validate(),
            Message::Pnorc2(m) => m.validate(),
            Message::Pnorc3(m) | Message::Pnorc4(m) => m.validate(),
            Message::Pnorh3(_) | Message::Pnorh4(_) => Ok(()),
            Message::Pnora(m) => m.validate(),
            Message::Pnorw(m) => m.validate(),
            Message::Pnorb(m) => m.validate(),
            Message::Pnore(m) => m.validate(),
            Message::Pnorf(m) => m.validate(),
            Message::Pnorwd(m) => m.validate(),
        }
    }

    /// Fields after the prefix, in this family's wire layout
    pub fn to_fields(&self) -> Vec<String> {
        match self {
            Message::Pnori(m) => m.to_pnori(),
            Message::Pnori1(m) => m.to_pnori1(),
            Message::Pnori2(m) => m.to_pnori2(),
            Message::Pnors(m) => m.to_pnors(),
            Message::Pnors1(m) => m.to_pnors1(),
            Message::Pnors2(m) => m.to_pnors2(),
            Message::Pnors3(m) => m.to_pnors3(),
            Message::Pnors4(m) => m.to_pnors4(),
            Message::Pnorc(m) => m.to_pnorc(),
            Message::Pnorc1(m) => m.to_pnorc1(),
            Message::Pnorc2(m) => m.to_pnorc2(),
            Message::Pnorc3(m) => m.to_pnorc3(),
            Message::Pnorc4(m) => m.to_pnorc4(),
            Message::Pnorh3(m) => m.to_pnorh3(),
            Message::Pnorh4(m) => m.to_pnorh4(),
            Message::Pnora(m) => m.to_pnora(),
            Message::Pnorw(m) => m.to_pnorw(),
            Message::Pnorb(m) => m.to_pnorb(),
            Message::Pnore(m) => m.to_pnore(),
            Message::Pnorf(m) => m.to_pnorf(),
            Message::Pnorwd(m) => m.to_pnorwd(),
        }
    }

    /// Full `$PREFIX,...*HH` sentence with a freshly computed checksum
    pub fn to_sentence(&self) -> String {
        let mut payload = format!("${}", self.family().prefix());
        for field in self.to_fields() {
            payload.push(',');
            payload.push_str(&field);
        }
        checksum::with_checksum(&payload)
    }
}
