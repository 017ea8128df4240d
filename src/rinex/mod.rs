//! RINEX 3 observation and navigation files
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    prelude::{Constellation, Epoch, TimeSystem},
    stream::{column, parse_float, parse_int},
    ParsingError,
};

mod lli;

pub mod nav;
pub mod obs;

pub use lli::LliFlags;

/// Header label column
const LABEL_OFFSET: usize = 60;

/// RINEX revision
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Default for Version {
    fn default() -> Self {
        Self { major: 3, minor: 4 }
    }
}

impl Version {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (major, minor) = trimmed.split_once('.').unwrap_or((trimmed, "0"));
        let major = major
            .parse::<u8>()
            .map_err(|_| ParsingError::Version(s.to_string()))?;
        let minor = minor
            .parse::<u8>()
            .map_err(|_| ParsingError::Version(s.to_string()))?;
        if major != 3 {
            return Err(ParsingError::Version(s.to_string()));
        }
        Ok(Self { major, minor })
    }
}

/// Splits a header line into its content and its label
pub(crate) fn header_label(line: &str) -> Result<(&str, &str), ParsingError> {
    if line.len() <= LABEL_OFFSET {
        return Err(ParsingError::HeaderLabel(line.to_string()));
    }
    Ok((
        column(line, 0, LABEL_OFFSET),
        column(line, LABEL_OFFSET, line.len()).trim(),
    ))
}

/// Parses the "RINEX VERSION / TYPE" content, returns the
/// revision and the constellation descriptor.
pub(crate) fn parse_version_type(
    content: &str,
    expected: char,
) -> Result<(Version, Constellation), ParsingError> {
    let version = Version::from_str(column(content, 0, 9))?;
    let file_type = column(content, 20, 21);
    if !file_type.starts_with(expected) {
        return Err(ParsingError::FileType(file_type.to_string()));
    }
    let constellation = parse_constellation(column(content, 40, 41))?;
    Ok((version, constellation))
}

/// Parses a RINEX constellation descriptor, blank meaning GPS
pub(crate) fn parse_constellation(s: &str) -> Result<Constellation, ParsingError> {
    match s.trim() {
        "" | "G" => Ok(Constellation::GPS),
        "M" => Ok(Constellation::Mixed),
        code => Constellation::from_str(code).map_err(|_| ParsingError::Satellite(s.to_string())),
    }
}

/// Parses "yyyy mm dd hh mm" integer fields and the seconds field,
/// as given by their column ranges.
pub(crate) fn parse_epoch(
    line: &str,
    fields: [(usize, usize); 6],
    system: TimeSystem,
) -> Result<Epoch, ParsingError> {
    let err = |_| ParsingError::Epoch(line.to_string());
    let [y, m, d, hh, mm, ss] = fields;
    let y = parse_int::<i32>(column(line, y.0, y.1)).map_err(err)?;
    let m = parse_int::<u8>(column(line, m.0, m.1)).map_err(err)?;
    let d = parse_int::<u8>(column(line, d.0, d.1)).map_err(err)?;
    let hh = parse_int::<u8>(column(line, hh.0, hh.1)).map_err(err)?;
    let mm = parse_int::<u8>(column(line, mm.0, mm.1)).map_err(err)?;
    let ss = parse_float(column(line, ss.0, ss.1)).map_err(err)?;
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) || hh > 23 || mm > 59 || ss >= 61.0 {
        return Err(ParsingError::Epoch(line.to_string()));
    }
    Epoch::maybe_from_gregorian(y, m, d, hh, mm, ss, system)
        .ok_or_else(|| ParsingError::Epoch(line.to_string()))
}

/// Default [TimeSystem] of a file dedicated to given constellation
pub(crate) fn default_time_system(constellation: Constellation) -> TimeSystem {
    match TimeSystem::from(constellation) {
        TimeSystem::Unknown => TimeSystem::GPS,
        system => system,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn version_parsing() {
        assert_eq!(Version::from_str("     3.04").unwrap(), Version::new(3, 4));
        assert_eq!(Version::from_str("3.05").unwrap(), Version::new(3, 5));
        assert_eq!(Version::new(3, 2).to_string(), "3.02");
        assert!(Version::from_str("2.11").is_err());
        assert!(Version::from_str("x").is_err());
    }
    #[test]
    fn header_labels() {
        let line = format!("{:<60}{}", "     3.04           OBSERVATION DATA    M", "RINEX VERSION / TYPE");
        let (content, label) = header_label(&line).unwrap();
        assert_eq!(label, "RINEX VERSION / TYPE");
        let (version, constellation) = parse_version_type(content, 'O').unwrap();
        assert_eq!(version, Version::new(3, 4));
        assert_eq!(constellation, Constellation::Mixed);
        assert!(matches!(
            parse_version_type(content, 'N'),
            Err(ParsingError::FileType(_))
        ));
        assert!(header_label("short").is_err());
    }
}
