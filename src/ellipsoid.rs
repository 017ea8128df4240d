//! Reference ellipsoids, as used by the orbit models.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::Constants;

/// Constants of a reference ellipsoid
pub trait EllipsoidModel {
    /// Semi major axis (m)
    fn a(&self) -> f64;
    /// Semi major axis (km)
    fn a_km(&self) -> f64 {
        self.a() / 1000.0
    }
    /// Flattening
    fn flattening(&self) -> f64;
    /// First eccentricity
    fn eccentricity(&self) -> f64 {
        let f = self.flattening();
        (f * (2.0 - f)).sqrt()
    }
    /// Squared first eccentricity
    fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        f * (2.0 - f)
    }
    /// Earth rotation rate (rad/s)
    fn angular_velocity(&self) -> f64;
    /// Gravitational constant (m³/s²)
    fn gm(&self) -> f64;
    /// Gravitational constant (km³/s²)
    fn gm_km(&self) -> f64 {
        self.gm() * 1.0E-9
    }
    /// Speed of light (m/s)
    fn c(&self) -> f64 {
        Constants::SPEED_OF_LIGHT
    }
    /// Speed of light (km/s)
    fn c_km(&self) -> f64 {
        self.c() / 1000.0
    }
}

/// Supported [Ellipsoid]s
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Ellipsoid {
    /// World Geodetic System 1984
    #[default]
    Wgs84,
    /// Parametry Zemli 1990, used by GLONASS
    Pz90,
    /// WGS84 with the GPS interface specification constants
    Gps,
    /// Galileo terrestrial reference frame constants
    Galileo,
    /// China Geodetic Coordinate System 2000, used by BeiDou
    Cgcs2000,
}

impl EllipsoidModel for Ellipsoid {
    fn a(&self) -> f64 {
        match self {
            Self::Pz90 => 6378136.0,
            _ => 6378137.0,
        }
    }
    fn flattening(&self) -> f64 {
        match self {
            Self::Pz90 => 1.0 / 298.25784,
            Self::Cgcs2000 => 1.0 / 298.257222101,
            _ => 0.335281066475E-2,
        }
    }
    fn angular_velocity(&self) -> f64 {
        match self {
            Self::Gps | Self::Galileo => 7.2921151467E-5,
            _ => 7.292115E-5,
        }
    }
    fn gm(&self) -> f64 {
        match self {
            Self::Gps => 3.986005E14,
            Self::Pz90 => 398600.4418E9,
            _ => 3986004.418E8,
        }
    }
}

impl std::fmt::Display for Ellipsoid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Wgs84 => write!(f, "WGS84"),
            Self::Pz90 => write!(f, "PZ90"),
            Self::Gps => write!(f, "GPS"),
            Self::Galileo => write!(f, "Galileo"),
            Self::Cgcs2000 => write!(f, "CGCS2000"),
        }
    }
}
