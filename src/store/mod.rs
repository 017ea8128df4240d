//! Ephemeris stores: satellite states indexed by satellite and time
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::{Epoch, Error, SatelliteId, Triple, Xvt};

mod glonass;
mod orbit;
mod sp3;

pub use glonass::GlonassStore;
pub use orbit::{AlmanacStore, BroadcastStore, OrbitStore};
pub use sp3::Sp3Store;

/// Query interface shared by all stores
pub trait XvtStore {
    /// State of `sv` at `t`
    fn xvt(&self, sv: SatelliteId, t: Epoch) -> Result<Xvt, Error>;
    /// ECEF position (m) of `sv` at `t`
    fn position(&self, sv: SatelliteId, t: Epoch) -> Result<Triple, Error> {
        Ok(self.xvt(sv, t)?.position)
    }
    /// ECEF velocity (m/s) of `sv` at `t`
    fn velocity(&self, sv: SatelliteId, t: Epoch) -> Result<Triple, Error> {
        Ok(self.xvt(sv, t)?.velocity)
    }
    /// Satellites this store holds data for, in ascending order
    fn satellites(&self) -> Vec<SatelliteId>;
    /// Earliest epoch covered by this store
    fn initial_time(&self) -> Option<Epoch>;
    /// Latest epoch covered by this store
    fn final_time(&self) -> Option<Epoch>;
}

/// [Sp3Store] interpolation settings
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sp3Config {
    /// Lagrange polynomial order: order + 1 samples are used
    pub interpolation_order: usize,
    /// Maximal time gap (s) between two consecutive samples
    /// of the interpolation window
    pub max_gap_s: f64,
}

impl Default for Sp3Config {
    fn default() -> Self {
        Self {
            interpolation_order: 10,
            max_gap_s: 3600.0,
        }
    }
}

impl Sp3Config {
    /// Copies and returns [Sp3Config] with given interpolation order
    pub fn with_interpolation_order(&self, order: usize) -> Self {
        let mut s = *self;
        s.interpolation_order = order;
        s
    }
    /// Copies and returns [Sp3Config] with given maximal gap (s)
    pub fn with_max_gap(&self, max_gap_s: f64) -> Self {
        let mut s = *self;
        s.max_gap_s = max_gap_s;
        s
    }
}

/// [GlonassStore] propagation settings
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlonassConfig {
    /// Runge-Kutta integration step (s)
    pub step_s: f64,
    /// Maximal distance (s) between query and reference epochs
    pub max_extrapolation_s: f64,
}

impl Default for GlonassConfig {
    fn default() -> Self {
        Self {
            step_s: 1.0,
            max_extrapolation_s: 900.0,
        }
    }
}

impl GlonassConfig {
    /// Copies and returns [GlonassConfig] with given integration step (s)
    pub fn with_step(&self, step_s: f64) -> Self {
        let mut s = *self;
        s.step_s = step_s;
        s
    }
    /// Copies and returns [GlonassConfig] with given extrapolation limit (s)
    pub fn with_max_extrapolation(&self, max_extrapolation_s: f64) -> Self {
        let mut s = *self;
        s.max_extrapolation_s = max_extrapolation_s;
        s
    }
}
