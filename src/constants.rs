//! GNSS constants

use crate::prelude::{Constellation, SatelliteId};

pub(crate) struct GM;

impl GM {
    pub const GPS: f64 = 3.9860050E14;
    pub const BDS: f64 = 3.986004418E14;
    pub const GLO: f64 = 3.9860044E14;
    pub const GAL: f64 = 3.986004418E14;
}

pub(crate) struct Omega;

impl Omega {
    pub const GPS: f64 = 7.2921151467E-5;
    pub const BDS: f64 = 7.292115E-5;
    pub const GLO: f64 = 7.292115E-5;
    pub const GAL: f64 = 7.2921151467E-5;
}

/// - 2 * sqrt(gm) / c / c
pub(crate) struct DtrF;

impl DtrF {
    pub const GPS: f64 = -0.000000000444280763339306;
    pub const BDS: f64 = -0.00000000044428073090439775;
    pub const GAL: f64 = -0.00000000044428073090439775;
}

pub(crate) struct Constants;

impl Constants {
    /// Maximal number of Newton-Raphson iterations on Kepler's equation
    pub const MAX_KEPLER_ITER: u8 = 30;
    /// Kepler's equation convergence threshold (rad)
    pub const KEPLER_TOLERANCE: f64 = 1.0E-15;
    /// Speed of light in vacuum (m/s)
    pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
    /// PI as defined by the GPS interface control document,
    /// to be used when converting broadcast semicircles.
    pub const GPS_PI: f64 = 3.1415926535898;
    /// Reference inclination of GPS almanacs (semicircles)
    pub const ALMANAC_REF_INCLINATION: f64 = 0.30;
    /// GLONASS second zonal harmonic (PZ-90)
    pub const GLO_J2: f64 = 1082625.75E-9;
    /// GLONASS ephemeris validity (s), on each side of the reference epoch
    pub const GLO_VALIDITY_S: f64 = 900.0;
    /// One GNSS week (s)
    pub const SECONDS_PER_WEEK: f64 = 604_800.0;
    pub const HALF_WEEK: i64 = 302_400;

    pub const fn gm(sv: SatelliteId) -> f64 {
        match sv.constellation {
            Constellation::BeiDou => GM::BDS,
            Constellation::Galileo => GM::GAL,
            Constellation::Glonass => GM::GLO,
            _ => GM::GPS,
        }
    }
    /// Earth rotation rate
    pub const fn omega(sv: SatelliteId) -> f64 {
        match sv.constellation {
            Constellation::BeiDou => Omega::BDS,
            Constellation::Galileo => Omega::GAL,
            Constellation::Glonass => Omega::GLO,
            _ => Omega::GPS,
        }
    }
    /// Relativistic clock correction factor
    pub const fn dtr_f(sv: SatelliteId) -> f64 {
        match sv.constellation {
            Constellation::BeiDou => DtrF::BDS,
            Constellation::Galileo => DtrF::GAL,
            _ => DtrF::GPS,
        }
    }
    /// Converts broadcast semicircles to radians
    pub fn semicircles(value: f64) -> f64 {
        value * Self::GPS_PI
    }
}
