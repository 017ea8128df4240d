//! YUMA almanac files.
//!
//! Each satellite is described by a block of "Key: value" lines,
//! introduced by a "****" banner. Angles are expressed in radians.
//! YUMA files have no header: the week and time of applicability
//! are taken from the first block.
#[cfg(feature = "log")]
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::{io::BufRead, path::Path, str::FromStr};

use crate::{
    constants::Constants,
    navigation::ephemeris::resolve_week,
    orbit::AlmanacOrbit,
    prelude::{Error, SatelliteId},
    stream::{self, parse_float, parse_int, Format, LineReader, RecordStream},
    ParsingError,
};

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Header {
    /// Week counter of the first block
    pub week: i32,
    /// Time of applicability (s) of the first block
    pub toa: i64,
}

/// One YUMA almanac block
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    pub prn: u8,
    pub health: u8,
    /// Eccentricity
    pub ecc: f64,
    /// Time of applicability (s)
    pub toa: i64,
    /// Orbital inclination (rad)
    pub inclination: f64,
    /// Rate of right ascension (rad/s)
    pub omega_dot: f64,
    /// Square root of semi major axis (m^1/2)
    pub a_half: f64,
    /// Right ascension at week (rad)
    pub omega_0: f64,
    /// Argument of perigee (rad)
    pub w: f64,
    /// Mean anomaly (rad)
    pub m_0: f64,
    /// Clock bias (s)
    pub af0: f64,
    /// Clock drift (s/s)
    pub af1: f64,
    /// Week counter, possibly truncated
    pub week: i32,
}

impl Record {
    pub fn sv(&self) -> SatelliteId {
        SatelliteId::gps(self.prn)
    }
    /// Copies and returns [Record] with its truncated week
    /// resolved to the full week nearest to `hint`
    pub fn with_week_hint(&self, hint: i32) -> Self {
        let mut s = self.clone();
        s.week = resolve_week(self.week.rem_euclid(1024) as u32, hint);
        s
    }
    /// Converts to [AlmanacOrbit], the time of applicability
    /// standing for the transmit time.
    pub fn to_almanac(&self) -> AlmanacOrbit {
        AlmanacOrbit {
            sv: self.sv(),
            ecc: self.ecc,
            i_offset: self.inclination
                - Constants::semicircles(Constants::ALMANAC_REF_INCLINATION),
            omega_dot: self.omega_dot,
            a_half: self.a_half,
            omega_0: self.omega_0,
            w: self.w,
            m_0: self.m_0,
            af0: self.af0,
            af1: self.af1,
            toa: self.toa,
            xmit_time: self.toa,
            week: self.week,
            health: self.health,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Field {
    Id,
    Health,
    Eccentricity,
    Toa,
    Inclination,
    OmegaDot,
    SqrtA,
    Omega0,
    Perigee,
    MeanAnomaly,
    Af0,
    Af1,
    Week,
}

impl Field {
    const ALL: [Self; 13] = [
        Self::Id,
        Self::Health,
        Self::Eccentricity,
        Self::Toa,
        Self::Inclination,
        Self::OmegaDot,
        Self::SqrtA,
        Self::Omega0,
        Self::Perigee,
        Self::MeanAnomaly,
        Self::Af0,
        Self::Af1,
        Self::Week,
    ];
    /// Key prefix, lowercase
    fn prefix(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Health => "health",
            Self::Eccentricity => "eccentricity",
            Self::Toa => "time of applicability",
            Self::Inclination => "orbital inclination",
            Self::OmegaDot => "rate of right ascen",
            Self::SqrtA => "sqrt(a)",
            Self::Omega0 => "right ascen at week",
            Self::Perigee => "argument of perigee",
            Self::MeanAnomaly => "mean anom",
            Self::Af0 => "af0",
            Self::Af1 => "af1",
            Self::Week => "week",
        }
    }
    fn name(&self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Health => "Health",
            Self::Eccentricity => "Eccentricity",
            Self::Toa => "Time of Applicability",
            Self::Inclination => "Orbital Inclination",
            Self::OmegaDot => "Rate of Right Ascen",
            Self::SqrtA => "SQRT(A)",
            Self::Omega0 => "Right Ascen at Week",
            Self::Perigee => "Argument of Perigee",
            Self::MeanAnomaly => "Mean Anom",
            Self::Af0 => "Af0",
            Self::Af1 => "Af1",
            Self::Week => "week",
        }
    }
    fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        Self::ALL.into_iter().find(|f| key.starts_with(f.prefix()))
    }
}

fn is_banner(line: &str) -> bool {
    line.trim_start().starts_with('*')
}

/// Collects the following block: content lines and their line numbers,
/// banner excluded. Every consumed line is appended to `raw`.
/// Returns None when the input is exhausted.
fn next_block<R: BufRead>(
    lines: &mut LineReader<R>,
    raw: &mut Vec<String>,
) -> Result<Option<Vec<(usize, String)>>, Error> {
    let mut block = Vec::with_capacity(Field::ALL.len());
    loop {
        match lines.peek()? {
            None => break,
            Some(line) if is_banner(line) && !block.is_empty() => break,
            Some(line) if line.trim().is_empty() && !block.is_empty() => {
                raw.push(lines.expect_line()?);
                break;
            },
            _ => {},
        }
        let line = lines.expect_line()?;
        if !line.trim().is_empty() && !is_banner(&line) {
            block.push((lines.line_number(), line.clone()));
        }
        raw.push(line);
    }
    if block.is_empty() {
        Ok(None)
    } else {
        Ok(Some(block))
    }
}

/// Parses an integer entry, sometimes written with a decimal part
fn parse_entry_int<T: FromStr + TryFrom<i64>>(line: usize, value: &str) -> Result<T, Error> {
    let malformed = |reason| Error::MalformedInput { line, reason };
    match parse_int::<T>(value) {
        Ok(value) => Ok(value),
        Err(e) => match parse_float(value) {
            Ok(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
                T::try_from(float as i64).map_err(|_| malformed(e))
            },
            _ => Err(malformed(e)),
        },
    }
}

fn parse_block(block: &[(usize, String)]) -> Result<Record, Error> {
    let mut values: [Option<(usize, &str)>; 13] = [None; 13];
    for (line_number, line) in block.iter() {
        let malformed = || Error::MalformedInput {
            line: *line_number,
            reason: ParsingError::YumaEntry(line.to_string()),
        };
        let (key, value) = line.split_once(':').ok_or_else(malformed)?;
        let field = Field::from_key(key).ok_or_else(malformed)?;
        let index = Field::ALL.iter().position(|f| *f == field).unwrap_or_default();
        values[index] = Some((*line_number, value.trim()));
    }

    let last_line = block.last().map(|(n, _)| *n).unwrap_or_default();
    let get = |field: Field| {
        let index = Field::ALL.iter().position(|f| *f == field).unwrap_or_default();
        values[index].ok_or_else(|| Error::MalformedInput {
            line: last_line,
            reason: ParsingError::MissingYumaField(field.name()),
        })
    };
    let float = |field: Field| -> Result<f64, Error> {
        let (line, value) = get(field)?;
        parse_float(value).map_err(|reason| Error::MalformedInput { line, reason })
    };

    let (line, value) = get(Field::Id)?;
    let prn = parse_entry_int::<u8>(line, value)?;
    let (line, value) = get(Field::Health)?;
    let health = parse_entry_int::<u8>(line, value)?;
    let (line, value) = get(Field::Toa)?;
    let toa = parse_entry_int::<i64>(line, value)?;
    let (line, value) = get(Field::Week)?;
    let week = parse_entry_int::<i32>(line, value)?;

    Ok(Record {
        prn,
        health,
        ecc: float(Field::Eccentricity)?,
        toa,
        inclination: float(Field::Inclination)?,
        omega_dot: float(Field::OmegaDot)?,
        a_half: float(Field::SqrtA)?,
        omega_0: float(Field::Omega0)?,
        w: float(Field::Perigee)?,
        m_0: float(Field::MeanAnomaly)?,
        af0: float(Field::Af0)?,
        af1: float(Field::Af1)?,
        week,
    })
}

/// YUMA [Format]
pub struct Yuma;

impl Format for Yuma {
    type Header = Header;
    type Record = Record;
    fn read_header<R: BufRead>(lines: &mut LineReader<R>) -> Result<Header, Error> {
        let mut raw = Vec::new();
        let block = next_block(lines, &mut raw)?.ok_or(Error::MalformedInput {
            line: lines.line_number() + 1,
            reason: ParsingError::UnexpectedEof,
        })?;
        let record = parse_block(&block)?;
        // return the first block to the input
        for line in raw.into_iter().rev() {
            lines.push_back(line);
        }
        #[cfg(feature = "log")]
        debug!("yuma: week {} toa {}", record.week, record.toa);
        Ok(Header {
            week: record.week,
            toa: record.toa,
        })
    }
    fn read_record<R: BufRead>(
        _: &Header,
        lines: &mut LineReader<R>,
    ) -> Result<Option<Record>, Error> {
        let mut raw = Vec::new();
        match next_block(lines, &mut raw)? {
            Some(block) => parse_block(&block).map(Some),
            None => Ok(None),
        }
    }
}

/// Parses a YUMA file entirely
pub fn read_yuma(path: impl AsRef<Path>) -> Result<(Header, Vec<Record>), Error> {
    stream::read_file::<Yuma>(path)
}

/// Parses the first block of a YUMA file, records being produced on demand
pub fn stream_yuma(path: impl AsRef<Path>) -> Result<(Header, RecordStream<Yuma>), Error> {
    stream::stream_file::<Yuma>(path)
}

/// Parses YUMA content entirely, from any [BufRead]able interface
pub fn from_reader<R: BufRead>(reader: R) -> Result<(Header, Vec<Record>), Error> {
    stream::read::<Yuma, R>(reader)
}

/// Streams YUMA content from any [BufRead]able interface
pub fn stream_reader<R: BufRead>(reader: R) -> Result<(Header, RecordStream<Yuma, R>), Error> {
    stream::stream::<Yuma, R>(reader)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::orbit::OrbitRecord;
    use std::io::Cursor;

    const CONTENT: &str = "******** Week 377 almanac for PRN-01 ********
ID:                         01
Health:                     000
Eccentricity:               0.4741668701E-002
Time of Applicability(s):  405504.0000
Orbital Inclination(rad):   0.9751510040
Rate of Right Ascen(r/s):  -0.7971760625E-008
SQRT(A)  (m 1/2):           5155.598145
Right Ascen at Week(rad):  -0.2496269867E+001
Argument of Perigee(rad):   0.733432840
Mean Anom(rad):            -0.1881910133E+001
Af0(s):                     0.1430511475E-004
Af1(s/s):                   0.3637978807E-011
week:                        377

******** Week 377 almanac for PRN-02 ********
ID:                         02
Health:                     063
Eccentricity:               0.8864402771E-002
Time of Applicability(s):  405504.0000
Orbital Inclination(rad):   0.9852197170
Rate of Right Ascen(r/s):  -0.7814611349E-008
SQRT(A)  (m 1/2):           5153.586426
Right Ascen at Week(rad):   0.1087721408E+001
Argument of Perigee(rad):  -2.713636780
Mean Anom(rad):             0.7466272702E+000
Af0(s):                    -0.5340576172E-004
Af1(s/s):                   0.0000000000E+000
week:                        377

";

    #[test]
    fn yuma_content() {
        let (header, records) = from_reader(Cursor::new(CONTENT)).unwrap();
        assert_eq!(header.week, 377);
        assert_eq!(header.toa, 405504);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.prn, 1);
        assert_eq!(first.health, 0);
        assert_eq!(first.ecc, 0.4741668701E-002);
        assert_eq!(first.a_half, 5155.598145);
        assert_eq!(first.af1, 0.3637978807E-011);

        let second = &records[1];
        assert_eq!(second.prn, 2);
        assert_eq!(second.health, 63);
        assert_eq!(second.w, -2.713636780);
        assert_eq!(second.af1, 0.0);

        let almanac = first.with_week_hint(1400).to_almanac();
        assert_eq!(almanac.week, 1401);
        assert!((almanac.inclination() - 0.9751510040).abs() < 1e-12);
        assert_eq!(almanac.reference_epoch().sow(), 405504.0);
    }

    #[test]
    fn streaming() {
        let (header, stream) = stream_reader(Cursor::new(CONTENT)).unwrap();
        assert_eq!(header.week, 377);
        let prns = stream
            .map_while(|r| r.ok())
            .map(|r| r.prn)
            .collect::<Vec<_>>();
        assert_eq!(prns, vec![1, 2]);
    }

    #[test]
    fn entry_errors() {
        let content = CONTENT.replace("Eccentricity:", "Excentricity:");
        match from_reader(Cursor::new(content)) {
            Err(Error::MalformedInput { line, reason }) => {
                assert_eq!(line, 4);
                assert!(matches!(reason, ParsingError::YumaEntry(_)));
            },
            other => panic!("unexpected result: {:?}", other.map(|(_, r)| r.len())),
        }
        let content = CONTENT.replacen("week:                        377\n", "", 1);
        match from_reader(Cursor::new(content)) {
            Err(Error::MalformedInput { reason, .. }) => {
                assert_eq!(reason, ParsingError::MissingYumaField("week"));
            },
            other => panic!("unexpected result: {:?}", other.map(|(_, r)| r.len())),
        }
    }

    #[test]
    fn out_of_range_integers() {
        let content = CONTENT.replace("ID:                         02", "ID:                         300");
        match from_reader(Cursor::new(content)) {
            Err(Error::MalformedInput { line, reason }) => {
                assert_eq!(line, 16);
                assert_eq!(reason, ParsingError::Integer("300".to_string()));
            },
            other => panic!("unexpected result: {:?}", other.map(|(_, r)| r.len())),
        }
        let content = CONTENT.replace("Health:                     063", "Health:                     256.0");
        match from_reader(Cursor::new(content)) {
            Err(Error::MalformedInput { line, reason }) => {
                assert_eq!(line, 17);
                assert_eq!(reason, ParsingError::Integer("256.0".to_string()));
            },
            other => panic!("unexpected result: {:?}", other.map(|(_, r)| r.len())),
        }
        let content = CONTENT.replace("ID:                         01", "ID:                         -1");
        match from_reader(Cursor::new(content)) {
            Err(Error::MalformedInput { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other.map(|(_, r)| r.len())),
        }
        let content = CONTENT.replace("ID:                         02", "ID:                         255.0");
        let (_, records) = from_reader(Cursor::new(content)).unwrap();
        assert_eq!(records[1].prn, 255);
    }
}
