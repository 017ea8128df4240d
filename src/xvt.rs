//! Satellite state
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{constants::Constants, triple::Triple};

/// Satellite health, as reported by the producer of the state
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Health {
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

/// Confidence we have in a state
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Confidence {
    /// Evaluated within the validity of its source
    #[default]
    Nominal,
    /// Extrapolated beyond the validity of its source
    Degraded,
}

/// [Xvt]: Earth centered Earth fixed position, velocity and clock state
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Xvt {
    /// ECEF position (m)
    pub position: Triple,
    /// ECEF velocity (m/s)
    pub velocity: Triple,
    /// Clock bias (s)
    pub clock_bias: f64,
    /// Clock drift (s/s)
    pub clock_drift: f64,
    /// Relativistic clock correction (s)
    pub relativistic_correction: f64,
    pub health: Health,
    pub confidence: Confidence,
}

impl Xvt {
    pub fn new(position: Triple, velocity: Triple) -> Self {
        Self {
            position,
            velocity,
            ..Default::default()
        }
    }
    pub fn with_clock(&self, bias: f64, drift: f64) -> Self {
        let mut s = *self;
        s.clock_bias = bias;
        s.clock_drift = drift;
        s
    }
    pub fn with_relativistic_correction(&self, correction: f64) -> Self {
        let mut s = *self;
        s.relativistic_correction = correction;
        s
    }
    pub fn with_health(&self, health: Health) -> Self {
        let mut s = *self;
        s.health = health;
        s
    }
    pub fn with_confidence(&self, confidence: Confidence) -> Self {
        let mut s = *self;
        s.confidence = confidence;
        s
    }
    /// Relativistic clock correction -2 (r.v) / c², from the state itself
    pub fn state_relativity(&self) -> f64 {
        -2.0 * self.position.dot(&self.velocity) / Constants::SPEED_OF_LIGHT.powi(2)
    }
    /// Clock bias including the relativistic correction (s)
    pub fn corrected_clock_bias(&self) -> f64 {
        self.clock_bias + self.relativistic_correction
    }
}

impl std::fmt::Display for Xvt {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "x:{}, v:{}, clk bias:{}, clk drift:{}, relcorr:{}",
            self.position,
            self.velocity,
            self.clock_bias,
            self.clock_drift,
            self.relativistic_correction
        )
    }
}
