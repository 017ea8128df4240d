//! RINEX 3 observation files
#[cfg(feature = "log")]
use log::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::{collections::BTreeMap, io::BufRead, path::Path, str::FromStr};

use crate::{
    prelude::{Constellation, Epoch, Error, SatelliteId, TimeSystem, Triple},
    rinex::{
        default_time_system, header_label, parse_constellation, parse_epoch, parse_version_type,
        LliFlags, Version,
    },
    stream::{self, column, parse_float, parse_int, Format, LineReader, RecordStream},
    ParsingError,
};

/// Observation codes per header line, continuation lines included
const CODES_PER_LINE: usize = 13;

/// Width of one observation: F14.3 value, LLI and SSI digits
const OBSERVATION_WIDTH: usize = 16;

/// [EpochFlag] validates an epoch, or describes the event that occurred
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EpochFlag {
    /// Epoch is sane
    #[default]
    Ok,
    /// Power failure since previous epoch
    PowerFailure,
    /// Antenna is being moved at current epoch
    AntennaBeingMoved,
    /// New site occupation, end of kinematic data
    NewSiteOccupation,
    /// Header information follows
    HeaderInformationFollows,
    /// External event
    ExternalEvent,
    /// Cycle slip records follow
    CycleSlip,
}

impl EpochFlag {
    /// Returns true if the following lines are observations
    pub fn has_observations(&self) -> bool {
        matches!(self, Self::Ok | Self::PowerFailure | Self::CycleSlip)
    }
}

impl FromStr for EpochFlag {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self::Ok),
            "1" => Ok(Self::PowerFailure),
            "2" => Ok(Self::AntennaBeingMoved),
            "3" => Ok(Self::NewSiteOccupation),
            "4" => Ok(Self::HeaderInformationFollows),
            "5" => Ok(Self::ExternalEvent),
            "6" => Ok(Self::CycleSlip),
            _ => Err(ParsingError::EpochFlag(s.to_string())),
        }
    }
}

/// Observation file header
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Header {
    pub version: Version,
    /// Constellation descriptor, [Constellation::Mixed] for multi-GNSS files
    pub constellation: Constellation,
    pub program: String,
    pub run_by: String,
    pub date: String,
    pub marker_name: String,
    pub marker_number: String,
    pub observer: String,
    pub agency: String,
    pub receiver_number: String,
    pub receiver_type: String,
    pub receiver_version: String,
    pub antenna_number: String,
    pub antenna_type: String,
    /// Approximate marker position (m, ECEF)
    pub approx_position: Option<Triple>,
    /// Antenna height, east and north eccentricities (m)
    pub antenna_delta: Option<Triple>,
    /// Observation codes, per constellation
    pub codes: BTreeMap<Constellation, Vec<String>>,
    /// Sampling interval (s)
    pub interval: Option<f64>,
    pub first_epoch: Option<Epoch>,
    pub last_epoch: Option<Epoch>,
    /// All epochs are expressed in this system
    pub time_system: TimeSystem,
    /// Number of satellites, 0 when not specified
    pub num_svs: u32,
    pub comments: Vec<String>,
}

impl Header {
    /// Index of the `code` observation of `constellation`.
    /// A two character code ("C1") designates the first
    /// observation of identical type and frequency ("C1C").
    pub fn obs_index(&self, constellation: Constellation, code: &str) -> Option<usize> {
        let codes = self.codes.get(&constellation)?;
        codes.iter().position(|c| c == code).or_else(|| {
            if code.len() == 2 {
                codes.iter().position(|c| c.starts_with(code))
            } else {
                None
            }
        })
    }
    /// Observation codes of `constellation`
    pub fn observables(&self, constellation: Constellation) -> &[String] {
        self.codes
            .get(&constellation)
            .map(|c| c.as_slice())
            .unwrap_or_default()
    }
}

/// One observation
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    pub value: f64,
    pub lli: Option<LliFlags>,
    /// Signal strength indicator (1-9)
    pub ssi: Option<u8>,
}

/// All observations of one epoch
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    pub epoch: Epoch,
    pub flag: EpochFlag,
    /// Number of satellites, or of event lines
    pub num_sat: u16,
    /// Receiver clock offset (s)
    pub clock_offset: f64,
    /// Observations per satellite, in header order. Blank fields are None.
    pub data: BTreeMap<SatelliteId, Vec<Option<Observation>>>,
    /// Event content (special records), stored as is
    pub events: Vec<String>,
}

impl Record {
    /// Returns observation #`index` of `sv`
    pub fn obs(&self, sv: SatelliteId, index: usize) -> Option<&Observation> {
        self.data.get(&sv)?.get(index)?.as_ref()
    }
    /// Returns the `code` observation of `sv`, as described by `header`
    pub fn obs_by_code(&self, header: &Header, sv: SatelliteId, code: &str) -> Option<&Observation> {
        let index = header.obs_index(sv.constellation, code)?;
        self.obs(sv, index)
    }
}

fn parse_triple(content: &str) -> Result<Triple, ParsingError> {
    Ok(Triple::new(
        parse_float(column(content, 0, 14))?,
        parse_float(column(content, 14, 28))?,
        parse_float(column(content, 28, 42))?,
    ))
}

/// Parses an observation line
fn parse_observations(
    header: &Header,
    line: &str,
) -> Result<(SatelliteId, Vec<Option<Observation>>), ParsingError> {
    let sv = SatelliteId::from_str(column(line, 0, 3))?;
    let count = header
        .codes
        .get(&sv.constellation)
        .map(|c| c.len())
        .ok_or(ParsingError::Satellite(column(line, 0, 3).to_string()))?;
    let mut observations = Vec::with_capacity(count);
    for i in 0..count {
        let offset = 3 + i * OBSERVATION_WIDTH;
        let value = column(line, offset, offset + 14);
        if value.trim().is_empty() {
            observations.push(None);
            continue;
        }
        let value = parse_float(value)?;
        let lli = LliFlags::from_field(column(line, offset + 14, offset + 15));
        let ssi = column(line, offset + 15, offset + 16).trim().parse::<u8>().ok();
        observations.push(Some(Observation { value, lli, ssi }));
    }
    Ok((sv, observations))
}

/// RINEX observation [Format]
pub struct RinexObs;

impl RinexObs {
    fn parse_header_line(
        header: &mut Header,
        pending: &mut Option<(Constellation, usize)>,
        line: &str,
    ) -> Result<bool, ParsingError> {
        let (content, label) = header_label(line)?;
        match label {
            "RINEX VERSION / TYPE" => {
                let (version, constellation) = parse_version_type(content, 'O')?;
                header.version = version;
                header.constellation = constellation;
                header.time_system = default_time_system(constellation);
            },
            "PGM / RUN BY / DATE" => {
                header.program = column(content, 0, 20).trim().to_string();
                header.run_by = column(content, 20, 40).trim().to_string();
                header.date = column(content, 40, 60).trim().to_string();
            },
            "MARKER NAME" => header.marker_name = content.trim().to_string(),
            "MARKER NUMBER" => header.marker_number = content.trim().to_string(),
            "OBSERVER / AGENCY" => {
                header.observer = column(content, 0, 20).trim().to_string();
                header.agency = column(content, 20, 60).trim().to_string();
            },
            "REC # / TYPE / VERS" => {
                header.receiver_number = column(content, 0, 20).trim().to_string();
                header.receiver_type = column(content, 20, 40).trim().to_string();
                header.receiver_version = column(content, 40, 60).trim().to_string();
            },
            "ANT # / TYPE" => {
                header.antenna_number = column(content, 0, 20).trim().to_string();
                header.antenna_type = column(content, 20, 40).trim().to_string();
            },
            "APPROX POSITION XYZ" => header.approx_position = Some(parse_triple(content)?),
            "ANTENNA: DELTA H/E/N" => header.antenna_delta = Some(parse_triple(content)?),
            "SYS / # / OBS TYPES" => {
                let system = column(content, 0, 1);
                let (constellation, remaining) = if system.trim().is_empty() {
                    // continuation line
                    (*pending).ok_or(ParsingError::Observable(content.to_string()))?
                } else {
                    let constellation = parse_constellation(system)?;
                    let count = parse_int::<usize>(column(content, 3, 6))?;
                    header.codes.insert(constellation, Vec::with_capacity(count));
                    (constellation, count)
                };
                let codes = header.codes.entry(constellation).or_default();
                let mut parsed = 0;
                for i in 0..remaining.min(CODES_PER_LINE) {
                    let code = column(content, 7 + 4 * i, 10 + 4 * i).trim();
                    if code.len() != 3 {
                        return Err(ParsingError::Observable(code.to_string()));
                    }
                    codes.push(code.to_string());
                    parsed += 1;
                }
                *pending = if remaining > parsed {
                    Some((constellation, remaining - parsed))
                } else {
                    None
                };
            },
            "INTERVAL" => header.interval = Some(parse_float(column(content, 0, 10))?),
            "TIME OF FIRST OBS" | "TIME OF LAST OBS" => {
                let system = column(content, 48, 51).trim();
                if !system.is_empty() {
                    header.time_system = TimeSystem::from_str(system)?;
                }
                let epoch = parse_epoch(
                    content,
                    [(0, 6), (6, 12), (12, 18), (18, 24), (24, 30), (30, 43)],
                    header.time_system,
                )?;
                if label == "TIME OF FIRST OBS" {
                    header.first_epoch = Some(epoch);
                } else {
                    header.last_epoch = Some(epoch);
                }
            },
            "# OF SATELLITES" => header.num_svs = parse_int(column(content, 0, 6))?,
            "COMMENT" => header.comments.push(content.trim_end().to_string()),
            "END OF HEADER" => return Ok(true),
            _ => {
                #[cfg(feature = "log")]
                debug!("rinex obs: ignored header label \"{}\"", label);
            },
        }
        Ok(false)
    }
}

impl Format for RinexObs {
    type Header = Header;
    type Record = Record;
    fn read_header<R: BufRead>(lines: &mut LineReader<R>) -> Result<Header, Error> {
        let mut header = Header::default();
        let mut pending = None;
        let line = lines.expect_line()?;
        match header_label(&line) {
            Ok((_, "RINEX VERSION / TYPE")) => {},
            _ => return Err(lines.malformed(ParsingError::MissingHeaderField("RINEX VERSION / TYPE"))),
        }
        Self::parse_header_line(&mut header, &mut pending, &line).map_err(|e| lines.malformed(e))?;
        loop {
            let line = lines.expect_line()?;
            let done = Self::parse_header_line(&mut header, &mut pending, &line)
                .map_err(|e| lines.malformed(e))?;
            if done {
                break;
            }
        }
        // epochs parsed before the time system was known
        let system = header.time_system;
        header.first_epoch = header.first_epoch.map(|t| t.with_time_system(system));
        header.last_epoch = header.last_epoch.map(|t| t.with_time_system(system));
        Ok(header)
    }
    fn read_record<R: BufRead>(
        header: &Header,
        lines: &mut LineReader<R>,
    ) -> Result<Option<Record>, Error> {
        let line = loop {
            match lines.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        if !line.starts_with('>') {
            return Err(lines.malformed(ParsingError::RecordLine(line)));
        }
        let epoch = parse_epoch(
            &line,
            [(2, 6), (7, 9), (10, 12), (13, 15), (16, 18), (18, 29)],
            header.time_system,
        )
        .map_err(|e| lines.malformed(e))?;
        let flag = EpochFlag::from_str(column(&line, 31, 32)).map_err(|e| lines.malformed(e))?;
        let num_sat = parse_int::<u16>(column(&line, 32, 35)).map_err(|e| lines.malformed(e))?;
        let clock = column(&line, 41, 56);
        let clock_offset = if clock.trim().is_empty() {
            0.0
        } else {
            parse_float(clock).map_err(|e| lines.malformed(e))?
        };

        let mut record = Record {
            epoch,
            flag,
            num_sat,
            clock_offset,
            data: BTreeMap::new(),
            events: Vec::new(),
        };
        for _ in 0..num_sat {
            let line = lines.expect_line()?;
            if flag.has_observations() {
                let (sv, observations) =
                    parse_observations(header, &line).map_err(|e| lines.malformed(e))?;
                if record.data.insert(sv, observations).is_some() {
                    #[cfg(feature = "log")]
                    warn!("line {}: {} observed twice at {}", lines.line_number(), sv, epoch);
                }
            } else {
                record.events.push(line);
            }
        }
        Ok(Some(record))
    }
}

/// Parses a RINEX observation file entirely
pub fn read_rinex_obs(path: impl AsRef<Path>) -> Result<(Header, Vec<Record>), Error> {
    stream::read_file::<RinexObs>(path)
}

/// Parses the header of a RINEX observation file, records being produced on demand
pub fn stream_rinex_obs(path: impl AsRef<Path>) -> Result<(Header, RecordStream<RinexObs>), Error> {
    stream::stream_file::<RinexObs>(path)
}

/// Parses RINEX observations entirely, from any [BufRead]able interface
pub fn from_reader<R: BufRead>(reader: R) -> Result<(Header, Vec<Record>), Error> {
    stream::read::<RinexObs, R>(reader)
}

/// Streams RINEX observations from any [BufRead]able interface
pub fn stream_reader<R: BufRead>(
    reader: R,
) -> Result<(Header, RecordStream<RinexObs, R>), Error> {
    stream::stream::<RinexObs, R>(reader)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn header_line(content: &str, label: &str) -> String {
        format!("{:<60}{}\n", content, label)
    }

    fn content() -> String {
        let mut s = String::new();
        s.push_str(&header_line("     3.02           OBSERVATION DATA    M", "RINEX VERSION / TYPE"));
        s.push_str(&header_line("teqc  2002Mar14     NIMA                20040611 00:22:51UTC", "PGM / RUN BY / DATE"));
        s.push_str(&header_line("85128", "MARKER NAME"));
        s.push_str(&header_line("NIMA                NATIONAL IMAGERY AND MAPPING AGENCY", "OBSERVER / AGENCY"));
        s.push_str(&header_line("  4000187.4500  -896905.7800  4881146.5000", "APPROX POSITION XYZ"));
        s.push_str(&header_line("        0.0000        0.0000        0.0000", "ANTENNA: DELTA H/E/N"));
        s.push_str(&header_line(
            "G   15 C1C L1C D1C S1C C2W L2W D2W S2W C5Q L5Q D5Q S5Q C1W",
            "SYS / # / OBS TYPES",
        ));
        s.push_str(&header_line("       L1W S1W", "SYS / # / OBS TYPES"));
        s.push_str(&header_line("R    2 C1C L1C", "SYS / # / OBS TYPES"));
        s.push_str(&header_line("    30.000", "INTERVAL"));
        s.push_str(&header_line(
            "  2004     6    10     0     0    0.0000000     GPS",
            "TIME OF FIRST OBS",
        ));
        s.push_str(&header_line("", "END OF HEADER"));
        s.push_str("> 2004 06 10 00 00  0.0000000  0  2       0.000000000000\n");
        s.push_str("G04  24236698.057 6\n");
        s.push_str("R09  20236698.100   125687456.123\n");
        s.push_str("> 2004 06 10 00 00 30.0000000  4  1\n");
        s.push_str("                                                            COMMENT\n");
        s.push_str("> 2004 06 10 00 01  0.0000000  0  1\n");
        s.push_str("G04  24236798.057 7\n");
        s
    }

    #[test]
    fn observation_header() {
        let (header, records) = from_reader(Cursor::new(content())).unwrap();
        assert_eq!(header.version, Version::new(3, 2));
        assert_eq!(header.constellation, Constellation::Mixed);
        assert_eq!(header.program, "teqc  2002Mar14");
        assert_eq!(header.agency, "NATIONAL IMAGERY AND MAPPING AGENCY");
        assert_eq!(header.marker_name, "85128");
        assert_eq!(header.num_svs, 0);
        assert_eq!(header.interval, Some(30.0));
        assert_eq!(header.time_system, TimeSystem::GPS);
        assert_eq!(
            header.approx_position,
            Some(Triple::new(4000187.45, -896905.78, 4881146.5))
        );
        assert_eq!(header.observables(Constellation::GPS).len(), 15);
        assert_eq!(header.observables(Constellation::Glonass).len(), 2);
        assert_eq!(header.obs_index(Constellation::GPS, "S1W"), Some(14));
        assert_eq!(header.obs_index(Constellation::GPS, "C1"), Some(0));
        assert_eq!(header.obs_index(Constellation::GPS, "L2"), Some(5));
        assert_eq!(header.obs_index(Constellation::GPS, "C7X"), None);
        assert_eq!(header.obs_index(Constellation::Galileo, "C1C"), None);

        let t0 = header.first_epoch.unwrap();
        assert_eq!(t0.day(), 2453167);
        assert_eq!(t0.time_system(), TimeSystem::GPS);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn observation_records() {
        let (header, records) = from_reader(Cursor::new(content())).unwrap();
        let first = &records[0];
        assert_eq!(first.flag, EpochFlag::Ok);
        assert_eq!(first.clock_offset, 0.0);
        assert_eq!(first.epoch.day(), 2453167);
        let g04 = SatelliteId::gps(4);
        let c1 = first.obs_by_code(&header, g04, "C1").unwrap();
        assert_eq!(c1.value, 24236698.057);
        assert_eq!(c1.ssi, Some(6));
        assert_eq!(c1.lli, None);
        assert!(first.obs(g04, 1).is_none());

        let r09 = SatelliteId::glonass(9);
        let l1 = first.obs(r09, 1).unwrap();
        assert_eq!(l1.value, 125687456.123);
        assert_eq!(l1.ssi, None);

        let event = &records[1];
        assert_eq!(event.flag, EpochFlag::HeaderInformationFollows);
        assert!(event.data.is_empty());
        assert_eq!(event.events.len(), 1);
        assert_eq!(records[2].epoch.sod(), 60.0);
    }

    #[test]
    fn lazy_parsing() {
        let (_, eager) = from_reader(Cursor::new(content())).unwrap();
        let (_, mut stream) = stream_reader(Cursor::new(content())).unwrap();
        for record in eager.iter() {
            assert_eq!(stream.next().unwrap().unwrap(), *record);
        }
        assert!(stream.next().is_none());
        assert!(matches!(stream.next(), Some(Err(Error::ProducerExhausted))));
    }

    #[test]
    fn malformed_records() {
        let corrupt = content().replace("24236798.057", "2423x798.057");
        match from_reader(Cursor::new(corrupt)) {
            Err(Error::MalformedInput { line, reason }) => {
                assert_eq!(line, 19);
                assert!(matches!(reason, ParsingError::Float(_)));
            },
            other => panic!("unexpected result: {:?}", other.map(|(_, r)| r.len())),
        }
        let bad_flag = content().replace("  0  2       0.0", "  9  2       0.0");
        assert!(from_reader(Cursor::new(bad_flag)).is_err());
    }
}
