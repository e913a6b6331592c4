//! Sensor sentences: PNORS, PNORS1, PNORS2, PNORS3, PNORS4

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::core::protocol::fields::{self as f, FormatResult};
use crate::core::protocol::sentence::{Sentence, TagDef};

/// PNORS sensor record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorData {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub error_code: u32,
    pub status_code: u32,
    pub battery_voltage: f64,
    pub sound_speed: f64,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
    pub pressure: f64,
    pub temperature: f64,
    pub analog_input1: u16,
    pub analog_input2: u16,
}

impl SensorData {
    pub fn validate(&self) -> FormatResult<()> {
        check_attitude(
            self.battery_voltage,
            self.sound_speed,
            self.heading,
            self.pitch,
            self.roll,
            self.pressure,
            self.temperature,
        )
    }

    pub(super) fn from_pnors(s: &Sentence) -> FormatResult<Self> {
        let v = s.positional("PNORS", 13)?;
        let data = Self {
            date: f::date("date", v[0])?,
            time: f::time("time", v[1])?,
            error_code: f::hex_code("error_code", v[2])?,
            status_code: f::hex_code("status_code", v[3])?,
            battery_voltage: f::float("battery_voltage", v[4])?,
            sound_speed: f::float("sound_speed", v[5])?,
            heading: f::float("heading", v[6])?,
            pitch: f::float("pitch", v[7])?,
            roll: f::float("roll", v[8])?,
            pressure: f::float("pressure", v[9])?,
            temperature: f::float("temperature", v[10])?,
            analog_input1: f::uint("analog_input1", v[11])?,
            analog_input2: f::uint("analog_input2", v[12])?,
        };
        data.validate()?;
        Ok(data)
    }

    pub(super) fn to_pnors(&self) -> Vec<String> {
        vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            f::fmt_hex(self.error_code),
            f::fmt_hex(self.status_code),
            self.battery_voltage.to_string(),
            self.sound_speed.to_string(),
            self.heading.to_string(),
            self.pitch.to_string(),
            self.roll.to_string(),
            self.pressure.to_string(),
            self.temperature.to_string(),
            self.analog_input1.to_string(),
            self.analog_input2.to_string(),
        ]
    }
}

/// PNORS1/PNORS2 sensor record with standard deviations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStats {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub error_code: u32,
    pub status_code: u32,
    pub battery_voltage: f64,
    pub sound_speed: f64,
    pub heading_std_dev: f64,
    pub heading: f64,
    pub pitch: f64,
    pub pitch_std_dev: f64,
    pub roll: f64,
    pub roll_std_dev: f64,
    pub pressure: f64,
    pub pressure_std_dev: f64,
    pub temperature: f64,
}

const PNORS2_TAGS: &[TagDef] = &[
    TagDef::required(&["DATE"]),
    TagDef::required(&["TIME"]),
    TagDef::required(&["EC"]),
    TagDef::required(&["SC"]),
    TagDef::required(&["BV"]),
    TagDef::required(&["SS"]),
    TagDef::required(&["HSD"]),
    TagDef::required(&["H"]),
    TagDef::required(&["PI"]),
    TagDef::required(&["PISD"]),
    TagDef::required(&["R"]),
    TagDef::required(&["RSD"]),
    TagDef::required(&["P"]),
    TagDef::required(&["PSD"]),
    TagDef::required(&["T"]),
];

impl SensorStats {
    pub fn validate(&self) -> FormatResult<()> {
        check_attitude(
            self.battery_voltage,
            self.sound_speed,
            self.heading,
            self.pitch,
            self.roll,
            self.pressure,
            self.temperature,
        )?;
        f::check("heading_std_dev", self.heading_std_dev, f::STD_DEV)?;
        f::check("pitch_std_dev", self.pitch_std_dev, f::STD_DEV)?;
        f::check("roll_std_dev", self.roll_std_dev, f::STD_DEV)?;
        f::check("pressure_std_dev", self.pressure_std_dev, f::STD_DEV)?;
        Ok(())
    }

    pub(super) fn from_pnors1(s: &Sentence) -> FormatResult<Self> {
        let v = s.positional("PNORS1", 15)?;
        Self::build(v)
    }

    pub(super) fn from_pnors2(s: &Sentence) -> FormatResult<Self> {
        let t = s.tagged("PNORS2", PNORS2_TAGS)?;
        let mut ordered = Vec::with_capacity(PNORS2_TAGS.len());
        for def in PNORS2_TAGS {
            ordered.push(t.require(def.canonical)?);
        }
        Self::build(&ordered)
    }

    // Field order shared by PNORS1 and the PNORS2 tag table.
    fn build(v: &[&str]) -> FormatResult<Self> {
        let data = Self {
            date: f::date("date", v[0])?,
            time: f::time("time", v[1])?,
            error_code: f::hex_code("error_code", v[2])?,
            status_code: f::hex_code("status_code", v[3])?,
            battery_voltage: f::float("battery_voltage", v[4])?,
            sound_speed: f::float("sound_speed", v[5])?,
            heading_std_dev: f::float("heading_std_dev", v[6])?,
            heading: f::float("heading", v[7])?,
            pitch: f::float("pitch", v[8])?,
            pitch_std_dev: f::float("pitch_std_dev", v[9])?,
            roll: f::float("roll", v[10])?,
            roll_std_dev: f::float("roll_std_dev", v[11])?,
            pressure: f::float("pressure", v[12])?,
            pressure_std_dev: f::float("pressure_std_dev", v[13])?,
            temperature: f::float("temperature", v[14])?,
        };
        data.validate()?;
        Ok(data)
    }

    pub(super) fn to_pnors1(&self) -> Vec<String> {
        vec![
            f::fmt_date(self.date),
            f::fmt_time(self.time),
            f::fmt_hex(self.error_code),
            f::fmt_hex(self.status_code),
            self.battery_voltage.to_string(),
            self.sound_speed.to_string(),
            self.heading_std_dev.to_string(),
            self.heading.to_string(),
            self.pitch.to_string(),
            self.pitch_std_dev.to_string(),
            self.roll.to_string(),
            self.roll_std_dev.to_string(),
            self.pressure.to_string(),
            self.pressure_std_dev.to_string(),
            self.temperature.to_string(),
        ]
    }

    pub(super) fn to_pnors2(&self) -> Vec<String> {
        PNORS2_TAGS
            .iter()
            .zip(self.to_pnors1())
            .map(|(def, value)| format!("{}={}", def.canonical, value))
            .collect()
    }
}

/// PNORS3/PNORS4 reduced sensor record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSummary {
    pub battery_voltage: f64,
    pub sound_speed: f64,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
    pub pressure: f64,
    pub temperature: f64,
}

const PNORS3_TAGS: &[TagDef] = &[
    TagDef::required(&["BV"]),
    TagDef::required(&["SS"]),
    TagDef::required(&["H"]),
    TagDef::required(&["PI"]),
    TagDef::required(&["R"]),
    TagDef::required(&["P"]),
    TagDef::required(&["T"]),
];

impl SensorSummary {
    pub fn validate(&self) -> FormatResult<()> {
        check_attitude(
            self.battery_voltage,
            self.sound_speed,
            self.heading,
            self.pitch,
            self.roll,
            self.pressure,
            self.temperature,
        )
    }

    pub(super) fn from_pnors3(s: &Sentence) -> FormatResult<Self> {
        let t = s.tagged("PNORS3", PNORS3_TAGS)?;
        let mut ordered = Vec::with_capacity(PNORS3_TAGS.len());
        for def in PNORS3_TAGS {
            ordered.push(t.require(def.canonical)?);
        }
        Self::build(&ordered)
    }

    pub(super) fn from_pnors4(s: &Sentence) -> FormatResult<Self> {
        Self::build(s.positional("PNORS4", 7)?)
    }

    fn build(v: &[&str]) -> FormatResult<Self> {
        let data = Self {
            battery_voltage: f::float("battery_voltage", v[0])?,
            sound_speed: f::float("sound_speed", v[1])?,
            heading: f::float("heading", v[2])?,
            pitch: f::float("pitch", v[3])?,
            roll: f::float("roll", v[4])?,
            pressure: f::float("pressure", v[5])?,
            temperature: f::float("temperature", v[6])?,
        };
        data.validate()?;
        Ok(data)
    }

    pub(super) fn to_pnors4(&self) -> Vec<String> {
        [
            self.battery_voltage,
            self.sound_speed,
            self.heading,
            self.pitch,
            self.roll,
            self.pressure,
            self.temperature,
        ]
        .iter()
        .map(f64::to_string)
        .collect()
    }

    pub(super) fn to_pnors3(&self) -> Vec<String> {
        PNORS3_TAGS
            .iter()
            .zip(self.to_pnors4())
            .map(|(def, value)| format!("{}={}", def.canonical, value))
            .collect()
    }
}

fn check_attitude(
    battery_voltage: f64,
    sound_speed: f64,
    heading: f64,
    pitch: f64,
    roll: f64,
    pressure: f64,
    temperature: f64,
) -> FormatResult<()> {
    f::check("battery_voltage", battery_voltage, f::BATTERY)?;
    f::check("sound_speed", sound_speed, f::SOUND_SPEED)?;
    f::check("heading", heading, f::HEADING)?;
    f::check("pitch", pitch, f::PITCH)?;
    f::check("roll", roll, f::ROLL)?;
    f::check("pressure", pressure, f::PRESSURE)?;
    f::check("temperature", temperature, f::TEMPERATURE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::fields::FormatError;

    const PNORS: &str =
        "$PNORS,073010,050000,00000000,2A480000,14.4,1523.0,275.9,15.7,2.3,0.000,22.45,0,0*1C";
    const PNORS1: &str =
        "$PNORS1,083013,132455,0,34000034,23.9,1500.0,0.02,123.4,45.6,0.02,23.4,0.02,123.456,0.02,24.56*39";

    #[test]
    fn test_pnors() {
        let s = SensorData::from_pnors(&Sentence::parse(PNORS).unwrap()).unwrap();
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2010, 7, 30).unwrap());
        assert_eq!(s.status_code, 0x2A48_0000);
        assert_eq!(s.heading, 275.9);
        assert_eq!(s.temperature, 22.45);
        assert_eq!(s.analog_input2, 0);
    }

    #[test]
    fn test_pnors_field_count() {
        let err = SensorData::from_pnors(&Sentence::parse("$PNORS,073010,050000").unwrap()).unwrap_err();
        assert_eq!(
            err,
            FormatError::FieldCount {
                family: "PNORS",
                expected: 13,
                actual: 2
            }
        );
    }

    #[test]
    fn test_pnors_heading_range() {
        let text = PNORS.replace("275.9", "360.0");
        let err = SensorData::from_pnors(&Sentence::parse(&text).unwrap()).unwrap_err();
        assert!(matches!(err, FormatError::OutOfRange { field: "heading", .. }));
    }

    #[test]
    fn test_pnors1_pnors2_equivalent() {
        let one = SensorStats::from_pnors1(&Sentence::parse(PNORS1).unwrap()).unwrap();
        let two = SensorStats::from_pnors2(
            &Sentence::parse(
                "$PNORS2,T=24.56,DATE=083013,TIME=132455,EC=0,SC=34000034,BV=23.9,SS=1500.0,HSD=0.02,\
                 H=123.4,PI=45.6,PISD=0.02,R=23.4,RSD=0.02,P=123.456,PSD=0.02",
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(one, two);
        assert_eq!(one.pressure, 123.456);
    }

    #[test]
    fn test_negative_std_dev_rejected() {
        let text = PNORS1.replacen("0.02", "-0.02", 1);
        let err = SensorStats::from_pnors1(&Sentence::parse(&text).unwrap()).unwrap_err();
        assert!(matches!(err, FormatError::OutOfRange { field: "heading_std_dev", .. }));
    }

    #[test]
    fn test_pnors2_missing_tags() {
        let err = SensorStats::from_pnors2(&Sentence::parse("$PNORS2,DATE=083013,TIME=132455").unwrap())
            .unwrap_err();
        let FormatError::MissingTags { tags, .. } = err else {
            panic!("unexpected {err:?}");
        };
        assert_eq!(tags.len(), 13);
        assert!(tags.contains(&"BV".to_string()));
    }

    #[test]
    fn test_pnors3_pnors4() {
        let three = SensorSummary::from_pnors3(
            &Sentence::parse("$PNORS3,BV=22.9,SS=1546.1,H=151.1,PI=-12.0,R=-5.2,P=705.669,T=24.96*7A").unwrap(),
        )
        .unwrap();
        let four = SensorSummary::from_pnors4(
            &Sentence::parse("$PNORS4,22.9,1546.1,151.1,-12.0,-5.2,705.669,24.96*5F").unwrap(),
        )
        .unwrap();
        assert_eq!(three, four);
        assert_eq!(three.pitch, -12.0);
    }

    #[test]
    fn test_pnors3_duplicate_tag() {
        let err = SensorSummary::from_pnors3(
            &Sentence::parse("$PNORS3,BV=22.9,BV=22.9,SS=1546.1,H=151.1,PI=-12.0,R=-5.2,P=705.669,T=24.96").unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, FormatError::DuplicateTag { tag, .. } if tag == "BV"));
    }
}
