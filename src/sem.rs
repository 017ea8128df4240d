//! SEM almanac files.
//!
//! A SEM file starts with a two lines header (record count and title,
//! then week and time of applicability), followed by one block per
//! satellite. Angles are expressed in semicircles.
#[cfg(feature = "log")]
use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::{io::BufRead, path::Path};

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
    /// Number of records
    pub count: u32,
    pub title: String,
    /// Week counter, modulo 1024
    pub week: i32,
    /// Time of applicability (s)
    pub toa: i64,
}

/// One SEM almanac block
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    pub prn: u8,
    /// Space vehicle number
    pub svn: u16,
    /// Average user range accuracy index
    pub ura: i16,
    /// Eccentricity
    pub ecc: f64,
    /// Inclination offset (semicircles)
    pub i_offset: f64,
    /// Rate of right ascension (semicircles/s)
    pub omega_dot: f64,
    /// Square root of semi major axis (m^1/2)
    pub a_half: f64,
    /// Longitude of ascending node (semicircles)
    pub omega_0: f64,
    /// Argument of perigee (semicircles)
    pub w: f64,
    /// Mean anomaly (semicircles)
    pub m_0: f64,
    /// Clock bias (s)
    pub af0: f64,
    /// Clock drift (s/s)
    pub af1: f64,
    pub health: u8,
    /// Satellite configuration
    pub config: u8,
    /// Header week counter
    pub week: i32,
    /// Header time of applicability (s)
    pub toa: i64,
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
            i_offset: Constants::semicircles(self.i_offset),
            omega_dot: Constants::semicircles(self.omega_dot),
            a_half: self.a_half,
            omega_0: Constants::semicircles(self.omega_0),
            w: Constants::semicircles(self.w),
            m_0: Constants::semicircles(self.m_0),
            af0: self.af0,
            af1: self.af1,
            toa: self.toa,
            xmit_time: self.toa,
            week: self.week,
            health: self.health,
        }
    }
}

/// Splits a line of floating point values. Values may be glued
/// together, a minus sign being the only separator ("1.0E-02-2.5E-09").
fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for item in line.split_whitespace() {
        let bytes = item.as_bytes();
        let mut start = 0;
        for i in 1..bytes.len() {
            if bytes[i] == b'-' && !matches!(bytes[i - 1], b'E' | b'e' | b'D' | b'd') {
                tokens.push(&item[start..i]);
                start = i;
            }
        }
        tokens.push(&item[start..]);
    }
    tokens
}

fn parse_floats<const N: usize>(line: &str) -> Result<[f64; N], ParsingError> {
    let tokens = tokenize(line);
    if tokens.len() != N {
        return Err(ParsingError::RecordLine(line.to_string()));
    }
    let mut values = [0.0; N];
    for (value, token) in values.iter_mut().zip(tokens) {
        *value = parse_float(token)?;
    }
    Ok(values)
}

/// SEM [Format]
pub struct Sem;

impl Format for Sem {
    type Header = Header;
    type Record = Record;
    fn read_header<R: BufRead>(lines: &mut LineReader<R>) -> Result<Header, Error> {
        let line = lines.expect_line()?;
        let trimmed = line.trim_start();
        let (count, title) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        let count = parse_int(count).map_err(|e| lines.malformed(e))?;

        let line = lines.expect_line()?;
        let mut items = line.split_whitespace();
        let week = items
            .next()
            .ok_or(ParsingError::MissingHeaderField("week"))
            .and_then(|s| parse_int::<i32>(s).map_err(|_| ParsingError::Week(s.to_string())))
            .map_err(|e| lines.malformed(e))?;
        let toa = items
            .next()
            .ok_or(ParsingError::MissingHeaderField("toa"))
            .and_then(parse_int::<i64>)
            .map_err(|e| lines.malformed(e))?;

        Ok(Header {
            count,
            title: title.trim().to_string(),
            week,
            toa,
        })
    }
    fn read_record<R: BufRead>(
        header: &Header,
        lines: &mut LineReader<R>,
    ) -> Result<Option<Record>, Error> {
        let prn = loop {
            match lines.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        let prn = parse_int::<u8>(&prn).map_err(|e| lines.malformed(e))?;
        let svn = lines.expect_line()?;
        let svn = parse_int::<u16>(&svn).map_err(|e| lines.malformed(e))?;
        let ura = lines.expect_line()?;
        let ura = parse_int::<i16>(&ura).map_err(|e| lines.malformed(e))?;

        let line = lines.expect_line()?;
        let [ecc, i_offset, omega_dot] = parse_floats(&line).map_err(|e| lines.malformed(e))?;
        let line = lines.expect_line()?;
        let [a_half, omega_0, w] = parse_floats(&line).map_err(|e| lines.malformed(e))?;
        let line = lines.expect_line()?;
        let [m_0, af0, af1] = parse_floats(&line).map_err(|e| lines.malformed(e))?;

        let health = lines.expect_line()?;
        let health = parse_int::<u8>(&health).map_err(|e| lines.malformed(e))?;
        let config = lines.expect_line()?;
        let config = parse_int::<u8>(&config).map_err(|e| lines.malformed(e))?;

        Ok(Some(Record {
            prn,
            svn,
            ura,
            ecc,
            i_offset,
            omega_dot,
            a_half,
            omega_0,
            w,
            m_0,
            af0,
            af1,
            health,
            config,
            week: header.week,
            toa: header.toa,
        }))
    }
}

/// Verifies that the record count announced by the header
/// matches the number of records actually parsed.
fn check_count(header: &Header, records: &[Record]) -> Result<(), Error> {
    if records.len() == header.count as usize {
        return Ok(());
    }
    #[cfg(feature = "log")]
    warn!("sem: {} records announced, {} found", header.count, records.len());
    Err(Error::MalformedInput {
        line: 1,
        reason: ParsingError::RecordCount {
            expected: header.count,
            found: records.len(),
        },
    })
}

/// Parses a SEM file entirely. Fails when the number of records
/// differs from the header count.
pub fn read_sem(path: impl AsRef<Path>) -> Result<(Header, Vec<Record>), Error> {
    let (header, records) = stream::read_file::<Sem>(path)?;
    check_count(&header, &records)?;
    Ok((header, records))
}

/// Parses the header of a SEM file, records being produced on demand
pub fn stream_sem(path: impl AsRef<Path>) -> Result<(Header, RecordStream<Sem>), Error> {
    stream::stream_file::<Sem>(path)
}

/// Parses SEM content entirely, from any [BufRead]able interface.
/// Fails when the number of records differs from the header count.
pub fn from_reader<R: BufRead>(reader: R) -> Result<(Header, Vec<Record>), Error> {
    let (header, records) = stream::read::<Sem, R>(reader)?;
    check_count(&header, &records)?;
    Ok((header, records))
}

/// Streams SEM content from any [BufRead]able interface.
/// The header count is not enforced: the stream ends with the input.
pub fn stream_reader<R: BufRead>(reader: R) -> Result<(Header, RecordStream<Sem, R>), Error> {
    stream::stream::<Sem, R>(reader)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::orbit::OrbitRecord;
    use std::io::Cursor;

    const CONTENT: &str = "2 CURRENT.ALM
 724 405504
1
63
0
 4.74166870117188E-03 1.03988647460938E-02-2.53748340765014E-09
 5.15559814453125E+03-7.94581949710846E-01 2.33459472656250E-01
-5.99035501480103E-01 1.43051147460938E-05 3.63797880709171E-12
0
11

2
61
0
 8.86440277099609E-03 1.35955810546875E-02-2.48745165299624E-09
 5.15358642578125E+03 3.46232533454895E-01-8.63773345947266E-01
 2.37660288810730E-01-5.34057617187500E-05 0.00000000000000E+00
63
11
";

    #[test]
    fn tokenizer() {
        assert_eq!(
            tokenize(" 4.7E-03 1.0E-02-2.5E-09"),
            vec!["4.7E-03", "1.0E-02", "-2.5E-09"]
        );
        assert_eq!(tokenize("-5.9E-01-1.4E-05"), vec!["-5.9E-01", "-1.4E-05"]);
    }

    #[test]
    fn sem_content() {
        let (header, records) = from_reader(Cursor::new(CONTENT)).unwrap();
        assert_eq!(header.count, 2);
        assert_eq!(header.title, "CURRENT.ALM");
        assert_eq!(header.week, 724);
        assert_eq!(header.toa, 405504);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.prn, 1);
        assert_eq!(first.svn, 63);
        assert_eq!(first.ecc, 4.74166870117188E-03);
        assert_eq!(first.omega_dot, -2.53748340765014E-09);
        assert_eq!(first.omega_0, -7.94581949710846E-01);
        assert_eq!(first.af1, 3.63797880709171E-12);
        assert_eq!(first.config, 11);
        assert_eq!(records[1].health, 63);

        let almanac = first.with_week_hint(1750).to_almanac();
        assert_eq!(almanac.week, 1748);
        assert_eq!(almanac.xmit_time, 405504);
        assert_eq!(almanac.w, 2.33459472656250E-01 * Constants::GPS_PI);
        assert!(almanac.is_healthy());
        assert!(!records[1].to_almanac().is_healthy());
        assert_eq!(almanac.reference_epoch().week(), 1748);
    }

    #[test]
    fn truncated_record() {
        let content = CONTENT.lines().take(8).collect::<Vec<_>>().join("\n");
        match from_reader(Cursor::new(content)) {
            Err(Error::MalformedInput { line, reason }) => {
                assert_eq!(line, 9);
                assert_eq!(reason, ParsingError::UnexpectedEof);
            },
            other => panic!("unexpected result: {:?}", other.map(|(_, r)| r.len())),
        }
    }

    #[test]
    fn record_count() {
        let content = CONTENT.replacen("2 CURRENT.ALM", "3 CURRENT.ALM", 1);
        match from_reader(Cursor::new(content.as_str())) {
            Err(Error::MalformedInput { line, reason }) => {
                assert_eq!(line, 1);
                assert_eq!(
                    reason,
                    ParsingError::RecordCount {
                        expected: 3,
                        found: 2
                    }
                );
            },
            other => panic!("unexpected result: {:?}", other.map(|(_, r)| r.len())),
        }
        let (header, stream) = stream_reader(Cursor::new(content.as_str())).unwrap();
        assert_eq!(header.count, 3);
        assert_eq!(stream.map_while(|r| r.ok()).count(), 2);

        let content = CONTENT.replacen("2 CURRENT.ALM", "1 CURRENT.ALM", 1);
        assert!(matches!(
            from_reader(Cursor::new(content)),
            Err(Error::MalformedInput {
                reason: ParsingError::RecordCount { expected: 1, found: 2 },
                ..
            })
        ));
    }
}
