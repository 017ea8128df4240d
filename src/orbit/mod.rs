//! Orbit models: broadcast Keplerian, almanac and numerically integrated (GLONASS).
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::{Epoch, Error, SatelliteId, Xvt};

mod almanac;
mod glonass;
mod kepler;

pub use almanac::AlmanacOrbit;
pub use glonass::GlonassEphemeris;
pub use kepler::{ClockModel, Kepler, KeplerOrbit, Perturbations};

pub(crate) use kepler::Helper;

/// Common contract of every record an orbit store may hold
pub trait OrbitRecord {
    /// Satellite this record describes
    fn sv(&self) -> SatelliteId;
    /// Reference epoch: time of ephemeris, of almanac or of the GLONASS frame
    fn reference_epoch(&self) -> Epoch;
    /// Start of validity (included)
    fn begin_valid(&self) -> Epoch;
    /// End of validity (included)
    fn end_valid(&self) -> Epoch;
    /// Time of transmission of this record
    fn transmit_time(&self) -> Epoch;
    /// Evaluates the state at `t`
    fn xvt(&self, t: Epoch) -> Result<Xvt, Error>;
    /// Returns true if `t` lies within the validity of this record.
    /// Always false for incompatible time systems.
    fn is_valid(&self, t: Epoch) -> bool {
        t >= self.begin_valid() && t <= self.end_valid()
    }
}

/// Closed set of supported orbit models
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrbitModel {
    Keplerian(KeplerOrbit),
    Almanac(AlmanacOrbit),
    Glonass(GlonassEphemeris),
}

impl From<KeplerOrbit> for OrbitModel {
    fn from(orbit: KeplerOrbit) -> Self {
        Self::Keplerian(orbit)
    }
}

impl From<AlmanacOrbit> for OrbitModel {
    fn from(orbit: AlmanacOrbit) -> Self {
        Self::Almanac(orbit)
    }
}

impl From<GlonassEphemeris> for OrbitModel {
    fn from(eph: GlonassEphemeris) -> Self {
        Self::Glonass(eph)
    }
}

impl OrbitModel {
    pub fn as_keplerian(&self) -> Option<&KeplerOrbit> {
        match self {
            Self::Keplerian(orbit) => Some(orbit),
            _ => None,
        }
    }
    pub fn as_almanac(&self) -> Option<&AlmanacOrbit> {
        match self {
            Self::Almanac(orbit) => Some(orbit),
            _ => None,
        }
    }
    pub fn as_glonass(&self) -> Option<&GlonassEphemeris> {
        match self {
            Self::Glonass(eph) => Some(eph),
            _ => None,
        }
    }
}

impl OrbitRecord for OrbitModel {
    fn sv(&self) -> SatelliteId {
        match self {
            Self::Keplerian(orbit) => orbit.sv(),
            Self::Almanac(orbit) => orbit.sv(),
            Self::Glonass(eph) => eph.sv(),
        }
    }
    fn reference_epoch(&self) -> Epoch {
        match self {
            Self::Keplerian(orbit) => orbit.reference_epoch(),
            Self::Almanac(orbit) => orbit.reference_epoch(),
            Self::Glonass(eph) => eph.reference_epoch(),
        }
    }
    fn begin_valid(&self) -> Epoch {
        match self {
            Self::Keplerian(orbit) => orbit.begin_valid(),
            Self::Almanac(orbit) => orbit.begin_valid(),
            Self::Glonass(eph) => eph.begin_valid(),
        }
    }
    fn end_valid(&self) -> Epoch {
        match self {
            Self::Keplerian(orbit) => orbit.end_valid(),
            Self::Almanac(orbit) => orbit.end_valid(),
            Self::Glonass(eph) => eph.end_valid(),
        }
    }
    fn transmit_time(&self) -> Epoch {
        match self {
            Self::Keplerian(orbit) => orbit.transmit_time(),
            Self::Almanac(orbit) => orbit.transmit_time(),
            Self::Glonass(eph) => eph.transmit_time(),
        }
    }
    fn xvt(&self, t: Epoch) -> Result<Xvt, Error> {
        match self {
            Self::Keplerian(orbit) => orbit.xvt(t),
            Self::Almanac(orbit) => orbit.xvt(t),
            Self::Glonass(eph) => eph.xvt(t),
        }
    }
}
