//! RINEX 3 navigation files
#[cfg(feature = "log")]
use log::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::{io::BufRead, path::Path, str::FromStr};

use crate::{
    constants::Constants,
    navigation::{ura::accuracy_to_ura, NavMessageType},
    orbit::{ClockModel, GlonassEphemeris, Kepler, KeplerOrbit, OrbitModel, Perturbations},
    prelude::{Constellation, Epoch, Error, SatelliteId, TimeSystem, Triple},
    rinex::{header_label, parse_epoch, parse_version_type, Version},
    stream::{self, column, parse_float, parse_int, Format, LineReader, RecordStream},
    ParsingError,
};

/// Transmission times at or above this magnitude are unknown
const UNKNOWN_TRANSMISSION: f64 = 1.0E8;

/// Galileo data sources: FNAV message bit
const GAL_FNAV_SOURCE: u32 = 0x02;

/// Navigation file header
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Header {
    pub version: Version,
    pub constellation: Constellation,
    pub program: String,
    pub run_by: String,
    pub date: String,
    /// Leap seconds (GPS - UTC)
    pub leap_seconds: Option<i32>,
    /// "IONOSPHERIC CORR" content, stored as is
    pub ionospheric_corrections: Vec<String>,
    /// "TIME SYSTEM CORR" content, stored as is
    pub time_corrections: Vec<String>,
    pub comments: Vec<String>,
}

/// One navigation record
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NavFrame {
    /// GPS, Galileo, BeiDou, QZSS and IRNSS ephemeris
    Keplerian(KeplerOrbit),
    /// Glonass ephemeris
    Glonass(GlonassEphemeris),
    /// Record this crate does not interpret (SBAS for example)
    Unsupported {
        sv: SatelliteId,
        epoch: Epoch,
        /// Number of lines of this record
        lines: usize,
    },
}

impl NavFrame {
    pub fn sv(&self) -> SatelliteId {
        match self {
            Self::Keplerian(orbit) => crate::orbit::OrbitRecord::sv(orbit),
            Self::Glonass(frame) => crate::orbit::OrbitRecord::sv(frame),
            Self::Unsupported { sv, .. } => *sv,
        }
    }
    pub fn as_keplerian(&self) -> Option<&KeplerOrbit> {
        match self {
            Self::Keplerian(orbit) => Some(orbit),
            _ => None,
        }
    }
    pub fn as_glonass(&self) -> Option<&GlonassEphemeris> {
        match self {
            Self::Glonass(frame) => Some(frame),
            _ => None,
        }
    }
    /// Converts to [OrbitModel], None for unsupported frames
    pub fn to_orbit_model(&self) -> Option<OrbitModel> {
        match self {
            Self::Keplerian(orbit) => Some(OrbitModel::from(orbit.clone())),
            Self::Glonass(frame) => Some(OrbitModel::from(frame.clone())),
            Self::Unsupported { .. } => None,
        }
    }
}

/// Parses the 4 D19.12 fields of a broadcast orbit line,
/// starting at `offset`. Blank fields are None.
fn parse_fields(line: &str, offset: usize) -> Result<[Option<f64>; 4], ParsingError> {
    let mut fields = [None; 4];
    for (i, field) in fields.iter_mut().enumerate() {
        let content = column(line, offset + 19 * i, offset + 19 * (i + 1));
        if !content.trim().is_empty() {
            *field = Some(parse_float(content)?);
        }
    }
    Ok(fields)
}

/// Broadcast orbit values of one record. `clock` holds the
/// 3 values of the epoch line, `orbits` the 4 values of each following line.
struct Values {
    /// Line number of the epoch line
    line: usize,
    clock: [Option<f64>; 3],
    orbits: Vec<[Option<f64>; 4]>,
}

impl Values {
    /// Mandatory broadcast orbit field
    fn get(&self, line: usize, field: usize, name: &'static str) -> Result<f64, Error> {
        self.opt(line, field).ok_or(Error::MalformedInput {
            line: self.line + 1 + line,
            reason: ParsingError::MissingField(name),
        })
    }
    /// Optional (spare) broadcast orbit field
    fn opt(&self, line: usize, field: usize) -> Option<f64> {
        self.orbits.get(line).and_then(|fields| fields[field])
    }
    /// Mandatory epoch line field
    fn clock(&self, field: usize, name: &'static str) -> Result<f64, Error> {
        self.clock[field].ok_or(Error::MalformedInput {
            line: self.line,
            reason: ParsingError::MissingField(name),
        })
    }
    fn check_lines(&self, sv: SatelliteId, expected: usize) -> Result<(), Error> {
        if self.orbits.len() < expected {
            Err(Error::MalformedInput {
                line: self.line,
                reason: ParsingError::RecordLine(format!("{}: {} lines", sv, self.orbits.len() + 1)),
            })
        } else {
            Ok(())
        }
    }
}

/// Builds the [Epoch] of `sow` nearest to `reference` (s of `week`)
fn nearest_epoch(week: i32, sow: f64, reference: f64, system: TimeSystem) -> Epoch {
    let dt = sow - reference;
    let half_week = Constants::HALF_WEEK as f64;
    let week = if dt < -half_week {
        week + 1
    } else if dt > half_week {
        week - 1
    } else {
        week
    };
    Epoch::from_week_sow(week, sow, system)
}

fn keplerian(sv: SatelliteId, toc: Epoch, values: &Values) -> Result<KeplerOrbit, Error> {
    values.check_lines(sv, 7)?;
    let system = sv.time_system();
    let week = values.get(4, 2, "week")? as i32;
    let week = match sv.constellation {
        // week counter is aligned to GPS
        Constellation::Galileo | Constellation::IRNSS => week - 1024,
        _ => week,
    };
    let toe_sow = values.get(2, 0, "toe")?;
    let toe = Epoch::from_week_sow(week, toe_sow, system);

    let message = match sv.constellation {
        Constellation::Galileo => {
            if (values.get(4, 1, "data sources")? as u32) & GAL_FNAV_SOURCE != 0 {
                NavMessageType::FNAV
            } else {
                NavMessageType::INAV
            }
        },
        _ => NavMessageType::legacy(sv),
    };

    let half_validity = match sv.constellation {
        Constellation::Galileo => 10800.0,
        Constellation::BeiDou => 21600.0,
        Constellation::IRNSS => 7200.0,
        _ => {
            // fit interval (hours), 0 meaning 4 hours
            let fit = values.opt(6, 1).unwrap_or_default();
            if fit > 1.0 {
                fit * 1800.0
            } else {
                7200.0
            }
        },
    };

    let transmit_time = match values.opt(6, 0) {
        Some(tx) if tx.abs() < UNKNOWN_TRANSMISSION => nearest_epoch(week, tx, toe_sow, system),
        _ => toc,
    };

    let kepler = Kepler {
        sqrt_a: values.get(1, 3, "sqrt(a)")?,
        e: values.get(1, 1, "e")?,
        i_0: values.get(3, 0, "i0")?,
        omega_0: values.get(2, 2, "omega0")?,
        m_0: values.get(0, 3, "m0")?,
        omega: values.get(3, 2, "omega")?,
        ..Default::default()
    };
    let perturbations = Perturbations {
        dn: values.get(0, 2, "dn")?,
        i_dot: values.get(4, 0, "idot")?,
        omega_dot: values.get(3, 3, "omega_dot")?,
        cus: values.get(1, 2, "cus")?,
        cuc: values.get(1, 0, "cuc")?,
        cis: values.get(2, 3, "cis")?,
        cic: values.get(2, 1, "cic")?,
        crs: values.get(0, 1, "crs")?,
        crc: values.get(3, 1, "crc")?,
        ..Default::default()
    };
    let clock = ClockModel {
        toc,
        af0: values.clock(0, "af0")?,
        af1: values.clock(1, "af1")?,
        af2: values.clock(2, "af2")?,
        tgd: values.opt(5, 2).unwrap_or_default(),
    };
    let accuracy = values.get(5, 0, "accuracy")?;
    let health = values.get(5, 1, "health")?;

    Ok(KeplerOrbit::new(
        sv,
        message,
        toe,
        toe.add_seconds(-half_validity),
        toe.add_seconds(half_validity),
        kepler,
        perturbations,
    )
    .with_transmit_time(transmit_time)
    .with_ura(accuracy_to_ura(accuracy))
    .with_health(health == 0.0)
    .with_clock(clock))
}

fn glonass(sv: SatelliteId, epoch: Epoch, values: &Values) -> Result<GlonassEphemeris, Error> {
    values.check_lines(sv, 3)?;
    // km, km/s, km/s²
    let vector = |field: usize, names: [&'static str; 3]| -> Result<Triple, Error> {
        Ok(Triple::new(
            values.get(0, field, names[0])? * 1.0E3,
            values.get(1, field, names[1])? * 1.0E3,
            values.get(2, field, names[2])? * 1.0E3,
        ))
    };
    let position = vector(0, ["x", "y", "z"])?;
    let velocity = vector(1, ["vx", "vy", "vz"])?;
    let acceleration = vector(2, ["ax", "ay", "az"])?;
    Ok(
        GlonassEphemeris::new("R", sv.prn, epoch, position, velocity, acceleration)
            .with_clock(-values.clock(0, "tau_n")?, values.clock(1, "gamma_n")?)
            .with_mf_time(values.clock(2, "message frame time")?.round() as i64)
            .with_health(values.get(0, 3, "health")? as i16)
            .with_frequency_channel(values.get(1, 3, "frequency channel")? as i16)
            .with_age_of_info(values.get(2, 3, "age of information")?),
    )
}

/// RINEX navigation [Format]
pub struct RinexNav;

impl RinexNav {
    fn parse_header_line(header: &mut Header, line: &str) -> Result<bool, ParsingError> {
        let (content, label) = header_label(line)?;
        match label {
            "RINEX VERSION / TYPE" => {
                let (version, constellation) = parse_version_type(content, 'N')?;
                header.version = version;
                header.constellation = constellation;
            },
            "PGM / RUN BY / DATE" => {
                header.program = column(content, 0, 20).trim().to_string();
                header.run_by = column(content, 20, 40).trim().to_string();
                header.date = column(content, 40, 60).trim().to_string();
            },
            "LEAP SECONDS" => header.leap_seconds = Some(parse_int(column(content, 0, 6))?),
            "IONOSPHERIC CORR" => header
                .ionospheric_corrections
                .push(content.trim_end().to_string()),
            "TIME SYSTEM CORR" => header.time_corrections.push(content.trim_end().to_string()),
            "COMMENT" => header.comments.push(content.trim_end().to_string()),
            "END OF HEADER" => return Ok(true),
            _ => {
                #[cfg(feature = "log")]
                debug!("rinex nav: ignored header label \"{}\"", label);
            },
        }
        Ok(false)
    }
}

impl Format for RinexNav {
    type Header = Header;
    type Record = NavFrame;
    fn read_header<R: BufRead>(lines: &mut LineReader<R>) -> Result<Header, Error> {
        let mut header = Header::default();
        let line = lines.expect_line()?;
        match header_label(&line) {
            Ok((_, "RINEX VERSION / TYPE")) => {},
            _ => return Err(lines.malformed(ParsingError::MissingHeaderField("RINEX VERSION / TYPE"))),
        }
        Self::parse_header_line(&mut header, &line).map_err(|e| lines.malformed(e))?;
        loop {
            let line = lines.expect_line()?;
            if Self::parse_header_line(&mut header, &line).map_err(|e| lines.malformed(e))? {
                break;
            }
        }
        Ok(header)
    }
    fn read_record<R: BufRead>(
        _: &Header,
        lines: &mut LineReader<R>,
    ) -> Result<Option<NavFrame>, Error> {
        let line = loop {
            match lines.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        if line.starts_with(' ') {
            return Err(lines.malformed(ParsingError::RecordLine(line)));
        }
        let sv = SatelliteId::from_str(column(&line, 0, 3)).map_err(|e| lines.malformed(e))?;
        let epoch = parse_epoch(
            &line,
            [(4, 8), (9, 11), (12, 14), (15, 17), (18, 20), (21, 23)],
            sv.time_system(),
        )
        .map_err(|e| lines.malformed(e))?;
        let fields = parse_fields(&line, 23).map_err(|e| lines.malformed(e))?;
        let values_line = lines.line_number();

        // broadcast orbit lines are indented
        let mut orbits = Vec::with_capacity(7);
        loop {
            match lines.peek()? {
                Some(next) if next.starts_with("    ") && !next.trim().is_empty() => {},
                _ => break,
            }
            let line = lines.expect_line()?;
            orbits.push(parse_fields(&line, 4).map_err(|e| lines.malformed(e))?);
        }
        let values = Values {
            line: values_line,
            clock: [fields[0], fields[1], fields[2]],
            orbits,
        };

        let frame = match sv.constellation {
            Constellation::GPS
            | Constellation::Galileo
            | Constellation::BeiDou
            | Constellation::QZSS
            | Constellation::IRNSS => NavFrame::Keplerian(keplerian(sv, epoch, &values)?),
            Constellation::Glonass => NavFrame::Glonass(glonass(sv, epoch, &values)?),
            _ => {
                #[cfg(feature = "log")]
                warn!("line {}: {} frame not supported", values_line, sv);
                NavFrame::Unsupported {
                    sv,
                    epoch,
                    lines: values.orbits.len() + 1,
                }
            },
        };
        Ok(Some(frame))
    }
}

/// Parses a RINEX navigation file entirely
pub fn read_rinex_nav(path: impl AsRef<Path>) -> Result<(Header, Vec<NavFrame>), Error> {
    stream::read_file::<RinexNav>(path)
}

/// Parses the header of a RINEX navigation file, frames being produced on demand
pub fn stream_rinex_nav(path: impl AsRef<Path>) -> Result<(Header, RecordStream<RinexNav>), Error> {
    stream::stream_file::<RinexNav>(path)
}

/// Parses RINEX navigation frames entirely, from any [BufRead]able interface
pub fn from_reader<R: BufRead>(reader: R) -> Result<(Header, Vec<NavFrame>), Error> {
    stream::read::<RinexNav, R>(reader)
}

/// Streams RINEX navigation frames from any [BufRead]able interface
pub fn stream_reader<R: BufRead>(
    reader: R,
) -> Result<(Header, RecordStream<RinexNav, R>), Error> {
    stream::stream::<RinexNav, R>(reader)
}
