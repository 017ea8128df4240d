#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::{Constellation, ParsingError, SatelliteId};

/// Navigation message a broadcast record was decoded from
#[derive(Default, Debug, Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NavMessageType {
    /// Legacy NAV message
    #[default]
    LNAV,
    /// Glonass FDMA message
    FDMA,
    /// Galileo FNAV message
    FNAV,
    /// Galileo INAV message
    INAV,
    /// BeiDou D1 NAV message
    D1,
    /// BeiDou D2 NAV message
    D2,
    /// SBAS NAV message
    SBAS,
    /// GPS / QZSS Civilian NAV message
    CNAV,
    /// GPS / QZSS / BeiDou CNV2 message
    CNV2,
}

impl std::str::FromStr for NavMessageType {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let c = s.to_uppercase();
        match c.trim() {
            "LNAV" => Ok(Self::LNAV),
            "FDMA" => Ok(Self::FDMA),
            "FNAV" => Ok(Self::FNAV),
            "INAV" => Ok(Self::INAV),
            "D1" => Ok(Self::D1),
            "D2" => Ok(Self::D2),
            "SBAS" => Ok(Self::SBAS),
            "CNAV" => Ok(Self::CNAV),
            "CNV2" => Ok(Self::CNV2),
            _ => Err(ParsingError::NavMessageType(s.to_string())),
        }
    }
}

impl std::fmt::Display for NavMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::LNAV => write!(f, "LNAV"),
            Self::FNAV => write!(f, "FNAV"),
            Self::INAV => write!(f, "INAV"),
            Self::FDMA => write!(f, "FDMA"),
            Self::D1 => write!(f, "D1"),
            Self::D2 => write!(f, "D2"),
            Self::SBAS => write!(f, "SBAS"),
            Self::CNAV => write!(f, "CNAV"),
            Self::CNV2 => write!(f, "CNV2"),
        }
    }
}

impl NavMessageType {
    /// Legacy message broadcast by given satellite.
    /// RINEX3 does not describe the message type, this is
    /// how we tag its records.
    pub fn legacy(sv: SatelliteId) -> Self {
        match sv.constellation {
            Constellation::Glonass => Self::FDMA,
            Constellation::Galileo => Self::INAV,
            Constellation::BeiDou => {
                if sv.is_beidou_geo() {
                    Self::D2
                } else {
                    Self::D1
                }
            },
            c if c.is_sbas() => Self::SBAS,
            _ => Self::LNAV,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;
    #[test]
    fn message_parsing() {
        for msg in ["LNAV", "FDMA", "FNAV", "INAV", "D1", "D2", "SBAS", "CNAV", "CNV2"] {
            let parsed = NavMessageType::from_str(msg).unwrap();
            assert_eq!(parsed.to_string(), msg);
        }
        assert!(NavMessageType::from_str("XXX").is_err());
    }
    #[test]
    fn legacy_messages() {
        assert_eq!(
            NavMessageType::legacy(SatelliteId::gps(1)),
            NavMessageType::LNAV
        );
        assert_eq!(
            NavMessageType::legacy(SatelliteId::new(Constellation::BeiDou, 3)),
            NavMessageType::D2
        );
        assert_eq!(
            NavMessageType::legacy(SatelliteId::glonass(3)),
            NavMessageType::FDMA
        );
    }
}
