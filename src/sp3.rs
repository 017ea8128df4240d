//! SP3 (revision c and d) precise orbit files.
//!
//! Positions are expressed in km, velocities in dm/s,
//! clock offsets in µs and clock rates in 1E-4 µs/s.
#[cfg(feature = "log")]
use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::{io::BufRead, path::Path, str::FromStr};

use crate::{
    prelude::{Constellation, Epoch, Error, SatelliteId, TimeSystem, Triple},
    stream::{self, column, parse_float, parse_int, Format, LineReader, RecordStream},
    ParsingError,
};

/// SP3 revision
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Version {
    C,
    #[default]
    D,
}

impl FromStr for Version {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" => Ok(Self::C),
            "d" => Ok(Self::D),
            _ => Err(ParsingError::Version(s.to_string())),
        }
    }
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataType {
    #[default]
    Position,
    Velocity,
}

impl FromStr for DataType {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P" => Ok(Self::Position),
            "V" => Ok(Self::Velocity),
            _ => Err(ParsingError::DataType(s.to_string())),
        }
    }
}

/// SP3 file header
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Header {
    pub version: Version,
    /// [DataType::Velocity] means velocities are provided
    pub data_type: DataType,
    /// First epoch of the file
    pub first_epoch: Epoch,
    /// Number of epochs
    pub num_epochs: u32,
    /// Data used descriptor
    pub data_used: String,
    /// Coordinates system
    pub coord_system: String,
    /// Orbit type (FIT, EXT, BCT, BHN, HLM)
    pub orbit_type: String,
    /// Agency providing this data
    pub agency: String,
    /// Week counter of the first epoch
    pub week: i32,
    /// Seconds of week of the first epoch
    pub sow: f64,
    /// Sampling interval (s)
    pub epoch_interval: f64,
    /// Modified julian day of the first epoch
    pub mjd: u32,
    /// Fractional day of the first epoch
    pub mjd_fraction: f64,
    /// Satellites described in this file
    pub satellites: Vec<SatelliteId>,
    /// Constellation(s) described in this file
    pub constellation: Constellation,
    /// Time system all epochs are expressed in
    pub time_system: TimeSystem,
    /// Floating point base for position and velocity standard deviations
    pub base_position: f64,
    /// Floating point base for clock standard deviations
    pub base_clock: f64,
    /// Header comments, stored as is
    pub comments: Vec<String>,
}

/// Satellite state of a given epoch
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entry {
    pub sv: SatelliteId,
    /// Position (km), None when flagged as bad
    pub position: Option<Triple>,
    /// Position standard deviation (mm)
    pub position_sigma: Triple,
    /// Clock offset (µs), None when flagged as bad
    pub clock: Option<f64>,
    /// Velocity (dm/s)
    pub velocity: Option<Triple>,
    /// Velocity standard deviation (1E-4 mm/s)
    pub velocity_sigma: Triple,
    /// Clock rate (1E-4 µs/s)
    pub clock_rate: Option<f64>,
    pub clock_event: bool,
    pub clock_prediction: bool,
    pub maneuver: bool,
    pub orbit_prediction: bool,
}

impl Entry {
    pub fn new(sv: SatelliteId) -> Self {
        Self {
            sv,
            ..Default::default()
        }
    }
    /// Copies and returns [Entry] with given position (km)
    pub fn with_position(&self, position: Triple) -> Self {
        let mut s = self.clone();
        s.position = Some(position);
        s
    }
    /// Copies and returns [Entry] with given velocity (dm/s)
    pub fn with_velocity(&self, velocity: Triple) -> Self {
        let mut s = self.clone();
        s.velocity = Some(velocity);
        s
    }
    /// Copies and returns [Entry] with given clock offset (µs)
    pub fn with_clock_offset(&self, offset: f64) -> Self {
        let mut s = self.clone();
        s.clock = Some(offset);
        s
    }
    /// Copies and returns [Entry] with given clock rate (1E-4 µs/s)
    pub fn with_clock_rate(&self, rate: f64) -> Self {
        let mut s = self.clone();
        s.clock_rate = Some(rate);
        s
    }
}

/// All satellite states of one epoch
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    pub epoch: Epoch,
    pub entries: Vec<Entry>,
}

impl Record {
    pub fn entry(&self, sv: SatelliteId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.sv == sv)
    }
}

fn is_header_line1(line: &str) -> bool {
    line.starts_with('#') && !line.starts_with("##")
}

fn is_header_line2(line: &str) -> bool {
    line.starts_with("##")
}

fn new_epoch(line: &str) -> bool {
    line.starts_with('*')
}

fn end_of_file(line: &str) -> bool {
    line.trim_end().eq("EOF")
}

/// Magnitude at or above which clock values are flagged as bad
const BAD_CLOCK: f64 = 999_999.0;

/// Parses the calendar epoch starting at column 3
fn parse_epoch(line: &str, system: TimeSystem) -> Result<Epoch, ParsingError> {
    let err = || ParsingError::Epoch(line.to_string());
    let y = parse_int::<i32>(column(line, 3, 7)).map_err(|_| err())?;
    let m = parse_int::<u8>(column(line, 8, 10)).map_err(|_| err())?;
    let d = parse_int::<u8>(column(line, 11, 13)).map_err(|_| err())?;
    let hh = parse_int::<u8>(column(line, 14, 16)).map_err(|_| err())?;
    let mm = parse_int::<u8>(column(line, 17, 19)).map_err(|_| err())?;
    let ss = parse_float(column(line, 20, 31)).map_err(|_| err())?;
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) || hh > 23 || mm > 59 {
        return Err(err());
    }
    Epoch::maybe_from_gregorian(y, m, d, hh, mm, ss, system).ok_or_else(err)
}

/// Standard deviation from a "base^exponent" field, 0 when omitted
fn sigma(base: f64, field: &str) -> f64 {
    match field.trim().parse::<i32>() {
        Ok(exponent) if base > 0.0 => base.powi(exponent),
        _ => 0.0,
    }
}

fn parse_triple(line: &str) -> Result<Triple, ParsingError> {
    Ok(Triple::new(
        parse_float(column(line, 4, 18))?,
        parse_float(column(line, 18, 32))?,
        parse_float(column(line, 32, 46))?,
    ))
}

fn parse_clock(line: &str) -> Result<Option<f64>, ParsingError> {
    let field = column(line, 46, 60);
    if field.trim().is_empty() {
        return Ok(None);
    }
    let value = parse_float(field)?;
    Ok(if value.abs() >= BAD_CLOCK {
        None
    } else {
        Some(value)
    })
}

fn parse_sigmas(line: &str, base: f64) -> Triple {
    Triple::new(
        sigma(base, column(line, 61, 63)),
        sigma(base, column(line, 64, 66)),
        sigma(base, column(line, 67, 69)),
    )
}

/// SP3 [Format]
pub struct Sp3;

impl Sp3 {
    fn parse_line1(header: &mut Header, line: &str) -> Result<(), ParsingError> {
        if line.len() < 56 {
            return Err(ParsingError::HeaderLine(line.to_string()));
        }
        header.version = Version::from_str(column(line, 1, 2))?;
        header.data_type = DataType::from_str(column(line, 2, 3))?;
        header.num_epochs = parse_int(column(line, 32, 39))?;
        header.data_used = column(line, 40, 45).trim().to_string();
        header.coord_system = column(line, 45, 51).trim().to_string();
        header.orbit_type = column(line, 51, 55).trim().to_string();
        header.agency = column(line, 55, 60).trim().to_string();
        // time system is only known later on
        header.first_epoch = parse_epoch(line, TimeSystem::GPS)?;
        Ok(())
    }
    fn parse_line2(header: &mut Header, line: &str) -> Result<(), ParsingError> {
        header.week =
            parse_int(column(line, 3, 7)).map_err(|_| ParsingError::Week(line.to_string()))?;
        header.sow = parse_float(column(line, 8, 23))?;
        header.epoch_interval = parse_float(column(line, 24, 38))?;
        header.mjd = parse_int(column(line, 39, 44))?;
        header.mjd_fraction = parse_float(column(line, 45, 60))?;
        Ok(())
    }
    fn parse_satellites(header: &mut Header, line: &str) -> Result<(), ParsingError> {
        let mut offset = 9;
        while offset + 3 <= line.len() {
            let item = column(line, offset, offset + 3);
            offset += 3;
            if item.trim().is_empty() || item.trim() == "0" || item.trim_start_matches('0').is_empty() {
                continue;
            }
            let sv = SatelliteId::from_str(item)?;
            if !header.satellites.contains(&sv) {
                header.satellites.push(sv);
            }
        }
        Ok(())
    }
    fn parse_descriptor(header: &mut Header, line: &str) -> Result<(), ParsingError> {
        let code = column(line, 3, 5).trim();
        header.constellation = match code {
            "M" => Constellation::Mixed,
            code => Constellation::from_str(code)
                .map_err(|_| ParsingError::HeaderLine(line.to_string()))?,
        };
        header.time_system = match column(line, 9, 12).trim() {
            "ccc" | "" => TimeSystem::GPS,
            system => TimeSystem::from_str(system)?,
        };
        Ok(())
    }
    fn parse_bases(header: &mut Header, line: &str) -> Result<(), ParsingError> {
        header.base_position = parse_float(column(line, 3, 13))?;
        header.base_clock = parse_float(column(line, 14, 26))?;
        Ok(())
    }
    fn parse_entry(header: &Header, record: &mut Record, line: &str) -> Result<(), ParsingError> {
        if line.len() < 46 {
            return Err(ParsingError::RecordLine(line.to_string()));
        }
        let sv = SatelliteId::from_str(column(line, 1, 4))?;
        let index = match record.entries.iter().position(|e| e.sv == sv) {
            Some(index) => index,
            None => {
                record.entries.push(Entry::new(sv));
                record.entries.len() - 1
            },
        };
        let entry = &mut record.entries[index];
        let vector = parse_triple(line)?;
        let bad = vector.x() == 0.0 && vector.y() == 0.0 && vector.z() == 0.0;
        if line.starts_with('P') {
            entry.position = if bad { None } else { Some(vector) };
            entry.clock = parse_clock(line)?;
            entry.position_sigma = parse_sigmas(line, header.base_position);
            entry.clock_event = column(line, 74, 75) == "E";
            entry.clock_prediction = column(line, 75, 76) == "P";
            entry.maneuver = column(line, 78, 79) == "M";
            entry.orbit_prediction = column(line, 79, 80) == "P";
        } else {
            entry.velocity = if bad { None } else { Some(vector) };
            entry.clock_rate = parse_clock(line)?;
            entry.velocity_sigma = parse_sigmas(line, header.base_position);
        }
        Ok(())
    }
}

impl Format for Sp3 {
    type Header = Header;
    type Record = Record;
    fn read_header<R: BufRead>(lines: &mut LineReader<R>) -> Result<Header, Error> {
        let mut header = Header::default();
        let mut descriptors = 0;
        let mut bases = 0;
        let mut line1 = false;
        loop {
            match lines.peek()? {
                Some(line) if new_epoch(line) || end_of_file(line) => break,
                None => break,
                _ => {},
            }
            let line = lines.expect_line()?;
            let parsed = if is_header_line1(&line) {
                line1 = true;
                Self::parse_line1(&mut header, &line)
            } else if is_header_line2(&line) {
                Self::parse_line2(&mut header, &line)
            } else if line.starts_with("++") {
                Ok(())
            } else if line.starts_with('+') {
                Self::parse_satellites(&mut header, &line)
            } else if line.starts_with("%c") {
                descriptors += 1;
                if descriptors == 1 {
                    Self::parse_descriptor(&mut header, &line)
                } else {
                    Ok(())
                }
            } else if line.starts_with("%f") {
                bases += 1;
                if bases == 1 {
                    Self::parse_bases(&mut header, &line)
                } else {
                    Ok(())
                }
            } else if line.starts_with("/*") {
                header.comments.push(column(&line, 3, line.len()).trim_end().to_string());
                Ok(())
            } else if line.starts_with("%i") || line.trim().is_empty() {
                Ok(())
            } else {
                Err(ParsingError::HeaderLine(line.to_string()))
            };
            parsed.map_err(|e| lines.malformed(e))?;
        }
        if !line1 {
            return Err(lines.malformed(ParsingError::MissingHeaderField("#")));
        }
        header.first_epoch = header.first_epoch.with_time_system(header.time_system);
        Ok(header)
    }
    fn read_record<R: BufRead>(
        header: &Header,
        lines: &mut LineReader<R>,
    ) -> Result<Option<Record>, Error> {
        let line = loop {
            match lines.next_line()? {
                None => return Ok(None),
                Some(line) if end_of_file(&line) => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        if !new_epoch(&line) {
            return Err(lines.malformed(ParsingError::RecordLine(line)));
        }
        let epoch = parse_epoch(&line, header.time_system).map_err(|e| lines.malformed(e))?;
        let mut record = Record {
            epoch,
            entries: Vec::new(),
        };
        loop {
            match lines.peek()? {
                Some(line) if new_epoch(line) || end_of_file(line) => break,
                None => break,
                _ => {},
            }
            let line = lines.expect_line()?;
            if line.starts_with('P') || line.starts_with('V') {
                Self::parse_entry(header, &mut record, &line).map_err(|e| lines.malformed(e))?;
            } else if line.starts_with("EP") || line.starts_with("EV") || line.trim().is_empty() {
                // correlation records
                continue;
            } else {
                #[cfg(feature = "log")]
                warn!("line {}: unexpected sp3 content", lines.line_number());
                return Err(lines.malformed(ParsingError::RecordLine(line)));
            }
        }
        Ok(Some(record))
    }
}

/// Parses an SP3 file entirely
pub fn read_sp3(path: impl AsRef<Path>) -> Result<(Header, Vec<Record>), Error> {
    stream::read_file::<Sp3>(path)
}

/// Parses the header of an SP3 file, records being produced on demand
pub fn stream_sp3(path: impl AsRef<Path>) -> Result<(Header, RecordStream<Sp3>), Error> {
    stream::stream_file::<Sp3>(path)
}

/// Parses SP3 content entirely, from any [BufRead]able interface
pub fn from_reader<R: BufRead>(reader: R) -> Result<(Header, Vec<Record>), Error> {
    stream::read::<Sp3, R>(reader)
}

/// Streams SP3 content from any [BufRead]able interface
pub fn stream_reader<R: BufRead>(reader: R) -> Result<(Header, RecordStream<Sp3, R>), Error> {
    stream::stream::<Sp3, R>(reader)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    const CONTENT: &str = "#dV2019 10 27  0  0  0.00000000       2 ORBIT IGS14 FIT  IGS
## 2077      0.00000000   300.00000000 58783 0.0000000000000
+    3   G01R01E01  0  0  0  0  0  0  0  0  0  0  0  0  0  0
++         0  0  0  0  0  0  0  0  0  0  0  0  0  0  0  0  0
%c M  cc GPS ccc cccc cccc cccc cccc ccccc ccccc ccccc ccccc
%c cc cc ccc ccc cccc cccc cccc cccc ccccc ccccc ccccc ccccc
%f  1.2500000  1.025000000  0.00000000000  0.000000000000000
%f  0.0000000  0.000000000  0.00000000000  0.000000000000000
%i    0    0    0    0      0      0      0      0         0
/* test file
*  2019 10 27  0  0  0.00000000
PG01 -22335.782004 -14656.280389  -1218.238499   -176.397152 10  9 11 102 EP  MP
VG01  -1211.987432   -654.345665  32067.023411     -0.054000
PR01  15684.717752 -12408.390324 -15847.221180 999999.999999
PE01      0.000000      0.000000      0.000000     -0.012345
*  2019 10 27  0  5  0.00000000
PG01 -22340.000000 -14656.000000  -1218.000000   -176.397000
EOF
";

    #[test]
    fn sp3d_content() {
        let (header, records) = from_reader(Cursor::new(CONTENT)).unwrap();
        assert_eq!(header.version, Version::D);
        assert_eq!(header.data_type, DataType::Velocity);
        assert_eq!(header.num_epochs, 2);
        assert_eq!(header.coord_system, "IGS14");
        assert_eq!(header.orbit_type, "FIT");
        assert_eq!(header.agency, "IGS");
        assert_eq!(header.week, 2077);
        assert_eq!(header.epoch_interval, 300.0);
        assert_eq!(header.mjd, 58783);
        assert_eq!(header.constellation, Constellation::Mixed);
        assert_eq!(header.time_system, TimeSystem::GPS);
        assert_eq!(header.base_position, 1.25);
        assert_eq!(header.comments, vec!["test file".to_string()]);
        assert_eq!(
            header.satellites,
            vec![
                SatelliteId::gps(1),
                SatelliteId::glonass(1),
                SatelliteId::new(Constellation::Galileo, 1)
            ]
        );
        assert_eq!(
            header.first_epoch,
            Epoch::from_gregorian(2019, 10, 27, 0, 0, 0.0, TimeSystem::GPS)
        );

        assert_eq!(records.len(), 2);
        let g01 = records[0].entry(SatelliteId::gps(1)).unwrap();
        assert_eq!(
            g01.position,
            Some(Triple::new(-22335.782004, -14656.280389, -1218.238499))
        );
        assert_eq!(g01.clock, Some(-176.397152));
        assert_eq!(g01.position_sigma.x(), 1.25_f64.powi(10));
        assert_eq!(
            g01.velocity,
            Some(Triple::new(-1211.987432, -654.345665, 32067.023411))
        );
        assert_eq!(g01.clock_rate, Some(-0.054));
        assert!(g01.clock_event && g01.clock_prediction);
        assert!(g01.maneuver && g01.orbit_prediction);

        let r01 = records[0].entry(SatelliteId::glonass(1)).unwrap();
        assert_eq!(r01.clock, None);
        let e01 = records[0]
            .entry(SatelliteId::new(Constellation::Galileo, 1))
            .unwrap();
        assert_eq!(e01.position, None);
        assert_eq!(e01.clock, Some(-0.012345));
        assert_eq!(
            records[1].epoch,
            Epoch::from_gregorian(2019, 10, 27, 0, 5, 0.0, TimeSystem::GPS)
        );
    }

    #[test]
    fn malformed_content() {
        let content = CONTENT.replace("PR01  15684.717752", "PR01  15684.7x7752");
        match from_reader(Cursor::new(content)) {
            Err(Error::MalformedInput { line, reason }) => {
                assert_eq!(line, 14);
                assert!(matches!(reason, ParsingError::Float(_)));
            },
            other => panic!("unexpected result: {:?}", other.map(|(_, r)| r.len())),
        }
    }

    #[test]
    fn nonexistent_date() {
        let content = CONTENT.replace("*  2019 10 27  0  5", "*  2019  2 30  0  5");
        match from_reader(Cursor::new(content)) {
            Err(Error::MalformedInput { line, reason }) => {
                assert_eq!(line, 16);
                assert!(matches!(reason, ParsingError::Epoch(_)));
            },
            other => panic!("unexpected result: {:?}", other.map(|(_, r)| r.len())),
        }
    }
}
