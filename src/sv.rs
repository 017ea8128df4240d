//! Satellite identification
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    epoch::TimeSystem,
    prelude::{Constellation, SV},
    ParsingError,
};

/// [SatelliteId] identifies a satellite by its [Constellation] and PRN number.
/// Ordering is by constellation first, then PRN.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteId {
    /// Constellation this satellite belongs to
    pub constellation: Constellation,
    /// PRN number
    pub prn: u8,
}

impl SatelliteId {
    pub const fn new(constellation: Constellation, prn: u8) -> Self {
        Self { constellation, prn }
    }
    /// Builds a GPS [SatelliteId]
    pub const fn gps(prn: u8) -> Self {
        Self::new(Constellation::GPS, prn)
    }
    /// Builds a GLONASS [SatelliteId]
    pub const fn glonass(prn: u8) -> Self {
        Self::new(Constellation::Glonass, prn)
    }
    /// [TimeSystem] this satellite broadcasts in
    pub fn time_system(&self) -> TimeSystem {
        TimeSystem::from(self.constellation)
    }
    /// Returns true for BeiDou geostationary vehicles
    pub fn is_beidou_geo(&self) -> bool {
        self.constellation == Constellation::BeiDou && (self.prn < 6 || self.prn > 58)
    }
    /// Single letter RINEX code of this [Constellation]
    pub fn system_code(&self) -> char {
        match self.constellation {
            Constellation::GPS => 'G',
            Constellation::Glonass => 'R',
            Constellation::Galileo => 'E',
            Constellation::BeiDou => 'C',
            Constellation::QZSS => 'J',
            Constellation::IRNSS => 'I',
            c if c.is_sbas() => 'S',
            _ => 'M',
        }
    }
}

impl std::fmt::Display for SatelliteId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}{:02}", self.system_code(), self.prn)
    }
}

impl FromStr for SatelliteId {
    type Err = ParsingError;
    /// Parses "XYY" standard format ("G04", "R 9").
    /// A bare PRN number designates a GPS vehicle.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let first = trimmed
            .chars()
            .next()
            .ok_or(ParsingError::Satellite(s.to_string()))?;
        let (constellation, prn) = if first.is_ascii_digit() {
            (Constellation::GPS, trimmed)
        } else {
            let constellation = Constellation::from_str(&trimmed[..first.len_utf8()])
                .map_err(|_| ParsingError::Satellite(s.to_string()))?;
            (constellation, &trimmed[first.len_utf8()..])
        };
        let prn = prn
            .trim()
            .parse::<u8>()
            .map_err(|_| ParsingError::Prn(s.to_string()))?;
        Ok(Self::new(constellation, prn))
    }
}

impl From<SV> for SatelliteId {
    fn from(sv: SV) -> Self {
        Self::new(sv.constellation, sv.prn)
    }
}

impl From<SatelliteId> for SV {
    fn from(sat: SatelliteId) -> Self {
        SV::new(sat.constellation, sat.prn)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn parsing() {
        for (desc, constellation, prn) in [
            ("G04", Constellation::GPS, 4),
            ("R 9", Constellation::Glonass, 9),
            ("E12", Constellation::Galileo, 12),
            ("C01", Constellation::BeiDou, 1),
            ("J02", Constellation::QZSS, 2),
            (" 7", Constellation::GPS, 7),
            ("31", Constellation::GPS, 31),
        ] {
            let sat = SatelliteId::from_str(desc).unwrap();
            assert_eq!(sat, SatelliteId::new(constellation, prn));
        }
        assert_eq!(SatelliteId::gps(4).to_string(), "G04");
        assert_eq!(SatelliteId::glonass(9).to_string(), "R09");
        assert!(SatelliteId::from_str("").is_err());
        assert!(SatelliteId::from_str("Gxx").is_err());
    }
    #[test]
    fn ordering() {
        let g31 = SatelliteId::gps(31);
        let r01 = SatelliteId::glonass(1);
        let g01 = SatelliteId::gps(1);
        assert!(g01 < g31);
        assert!(g31 < r01);
    }
    #[test]
    fn beidou_geo() {
        assert!(SatelliteId::new(Constellation::BeiDou, 1).is_beidou_geo());
        assert!(SatelliteId::new(Constellation::BeiDou, 60).is_beidou_geo());
        assert!(!SatelliteId::new(Constellation::BeiDou, 19).is_beidou_geo());
        assert!(!SatelliteId::gps(1).is_beidou_geo());
    }
    #[test]
    fn sv_conversion() {
        let sv = SV::new(Constellation::Galileo, 11);
        let sat = SatelliteId::from(sv);
        assert_eq!(SV::from(sat), sv);
    }
}
