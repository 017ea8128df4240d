#[cfg(feature = "log")]
use log::{debug, error};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::str::FromStr;

use nalgebra::{Vector3, Vector6};

use crate::{
    constants::Constants,
    ellipsoid::{Ellipsoid, EllipsoidModel},
    orbit::OrbitRecord,
    prelude::{Constellation, Epoch, Error, SatelliteId, Triple, Xvt},
    xvt::{Confidence, Health},
};

/// [GlonassEphemeris] is a GLONASS broadcast state vector, propagated
/// by numerical integration of the equations of motion in PZ-90.
/// Position, velocity and luni-solar acceleration are stored in SI units.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlonassEphemeris {
    /// Satellite system, as labeled by the data source
    pub system: String,
    pub prn: u8,
    /// Reference epoch (tb)
    pub epoch: Epoch,
    /// Position (m)
    pub position: Triple,
    /// Velocity (m/s)
    pub velocity: Triple,
    /// Luni-solar acceleration (m/s²)
    pub acceleration: Triple,
    /// Clock bias, with opposite sign (s)
    pub tau_n: f64,
    /// Relative frequency bias (s/s)
    pub gamma_n: f64,
    /// Message frame time, in seconds of week
    pub mf_time: i64,
    /// Health flag, 0 meaning healthy
    pub health: i16,
    /// Frequency channel number
    pub freq_num: i16,
    /// Age of operational information (days)
    pub age_of_info: f64,
    /// Integration step (s)
    pub step: f64,
}

impl std::fmt::Display for GlonassEphemeris {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Sys:{}, PRN:{}", self.system, self.prn)?;
        writeln!(f, "Epoch:{}, pos:{}", self.epoch, self.position)?;
        writeln!(f, "vel:{}, acc:{}", self.velocity, self.acceleration)?;
        writeln!(f, "TauN:{}, GammaN:{}", self.tau_n, self.gamma_n)?;
        writeln!(f, "MFTime:{}, health:{}", self.mf_time, self.health)?;
        write!(f, "freqNum:{}, ageOfInfo:{}", self.freq_num, self.age_of_info)
    }
}

/// Time derivative of the (position, velocity) state,
/// luni-solar acceleration being held constant.
fn derivatives(state: &Vector6<f64>, acc: &Vector3<f64>) -> Vector6<f64> {
    let pz90 = Ellipsoid::Pz90;
    let mu = pz90.gm();
    let ae = pz90.a();
    let omega = pz90.angular_velocity();

    let (x, y, z) = (state[0], state[1], state[2]);
    let (vx, vy, vz) = (state[3], state[4], state[5]);

    let r2 = x * x + y * y + z * z;
    let r = r2.sqrt();
    let mu_r3 = mu / (r2 * r);
    let j2_term = 1.5 * Constants::GLO_J2 * mu * ae * ae / (r2 * r2 * r);
    let z2_r2 = 5.0 * z * z / r2;

    Vector6::new(
        vx,
        vy,
        vz,
        -mu_r3 * x - j2_term * x * (1.0 - z2_r2) + omega * omega * x + 2.0 * omega * vy + acc[0],
        -mu_r3 * y - j2_term * y * (1.0 - z2_r2) + omega * omega * y - 2.0 * omega * vx + acc[1],
        -mu_r3 * z - j2_term * z * (3.0 - z2_r2) + acc[2],
    )
}

fn rk4_step(state: &Vector6<f64>, acc: &Vector3<f64>, h: f64) -> Vector6<f64> {
    let k1 = derivatives(state, acc);
    let k2 = derivatives(&(state + k1 * (h / 2.0)), acc);
    let k3 = derivatives(&(state + k2 * (h / 2.0)), acc);
    let k4 = derivatives(&(state + k3 * h), acc);
    state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0)
}

impl GlonassEphemeris {
    /// Validity of a frame, on each side of its reference epoch (s)
    pub const MAX_EXTRAPOLATION_S: f64 = Constants::GLO_VALIDITY_S;

    /// Default integration step (s)
    pub const DEFAULT_STEP_S: f64 = 1.0;

    /// Smallest accepted integration step (s)
    pub const MIN_STEP_S: f64 = 1.0E-3;

    /// Farthest propagation, extrapolation included (s)
    pub const MAX_PROPAGATION_S: f64 = 86_400.0;

    /// Maximal number of integration steps per propagation
    pub const MAX_STEPS: f64 = 100_000.0;

    /// Builds a new [GlonassEphemeris] from its state vector, in SI units
    pub fn new(
        system: &str,
        prn: u8,
        epoch: Epoch,
        position: Triple,
        velocity: Triple,
        acceleration: Triple,
    ) -> Self {
        Self {
            system: system.to_string(),
            prn,
            epoch,
            position,
            velocity,
            acceleration,
            step: Self::DEFAULT_STEP_S,
            ..Default::default()
        }
    }
    /// Copies and returns [GlonassEphemeris] with given clock terms
    pub fn with_clock(&self, tau_n: f64, gamma_n: f64) -> Self {
        let mut s = self.clone();
        s.tau_n = tau_n;
        s.gamma_n = gamma_n;
        s
    }
    /// Copies and returns [GlonassEphemeris] with given message frame time
    pub fn with_mf_time(&self, mf_time: i64) -> Self {
        let mut s = self.clone();
        s.mf_time = mf_time;
        s
    }
    /// Copies and returns [GlonassEphemeris] with given health flag
    pub fn with_health(&self, health: i16) -> Self {
        let mut s = self.clone();
        s.health = health;
        s
    }
    /// Copies and returns [GlonassEphemeris] with given frequency channel
    pub fn with_frequency_channel(&self, freq_num: i16) -> Self {
        let mut s = self.clone();
        s.freq_num = freq_num;
        s
    }
    /// Copies and returns [GlonassEphemeris] with given age of information
    pub fn with_age_of_info(&self, age_of_info: f64) -> Self {
        let mut s = self.clone();
        s.age_of_info = age_of_info;
        s
    }
    /// Copies and returns [GlonassEphemeris] with given integration step
    pub fn with_step(&self, step: f64) -> Self {
        let mut s = self.clone();
        s.step = step;
        s
    }
    pub fn is_healthy(&self) -> bool {
        self.health == 0
    }
    /// Propagates the state vector `dt` seconds away from the reference
    /// epoch, with fixed steps of `step` seconds. The last step is shortened
    /// to land exactly on `dt`. Returns (position, velocity) in (m, m/s).
    ///
    /// Fails with [Error::InvalidStep] when `step` is not finite or below
    /// [Self::MIN_STEP_S], and with [Error::OutOfValidityRange] when `dt`
    /// exceeds [Self::MAX_PROPAGATION_S] or requires more than [Self::MAX_STEPS].
    pub fn propagate(&self, dt: f64, step: f64) -> Result<(Triple, Triple), Error> {
        if !step.is_finite() || step < Self::MIN_STEP_S {
            return Err(Error::InvalidStep(step));
        }
        if !dt.is_finite()
            || dt.abs() > Self::MAX_PROPAGATION_S
            || (dt.abs() / step).ceil() > Self::MAX_STEPS
        {
            #[cfg(feature = "log")]
            error!("{}: cannot propagate {}s with {}s steps", self.sv(), dt, step);
            return Err(Error::OutOfValidityRange {
                sv: self.sv(),
                epoch: self.epoch.add_seconds(dt),
            });
        }
        let acc: Vector3<f64> = self.acceleration.into();
        let mut state = Vector6::new(
            self.position.x(),
            self.position.y(),
            self.position.z(),
            self.velocity.x(),
            self.velocity.y(),
            self.velocity.z(),
        );
        let full_steps = (dt.abs() / step).floor() as u64;
        let remainder = dt.abs() - full_steps as f64 * step;
        let h = step.copysign(dt);
        for _ in 0..full_steps {
            state = rk4_step(&state, &acc, h);
        }
        if remainder > 0.0 {
            state = rk4_step(&state, &acc, remainder.copysign(dt));
        }
        Ok((
            Triple::new(state[0], state[1], state[2]),
            Triple::new(state[3], state[4], state[5]),
        ))
    }
    /// State at `t`, integrated with `step`, regardless of validity
    pub(crate) fn state_at(&self, t: Epoch, step: f64) -> Result<Xvt, Error> {
        let dt = t.try_sub(&self.epoch)?;
        let (position, velocity) = self.propagate(dt, step)?;
        let health = if self.is_healthy() {
            Health::Healthy
        } else {
            Health::Unhealthy
        };
        let confidence = if dt.abs() > Self::MAX_EXTRAPOLATION_S {
            #[cfg(feature = "log")]
            debug!("{}: extrapolating {}s away from {}", self.sv(), dt, self.epoch);
            Confidence::Degraded
        } else {
            Confidence::Nominal
        };
        let xvt = Xvt::new(position, velocity)
            .with_clock(-self.tau_n + self.gamma_n * dt, self.gamma_n)
            .with_health(health)
            .with_confidence(confidence);
        Ok(xvt.with_relativistic_correction(xvt.state_relativity()))
    }
    /// Evaluates the state at `t`, even outside the validity window,
    /// in which case the returned [Xvt] is tagged [Confidence::Degraded].
    pub fn xvt_extrapolated(&self, t: Epoch) -> Result<Xvt, Error> {
        self.state_at(t, self.step)
    }
}

impl OrbitRecord for GlonassEphemeris {
    fn sv(&self) -> SatelliteId {
        let constellation = Constellation::from_str(&self.system).unwrap_or(Constellation::Glonass);
        SatelliteId::new(constellation, self.prn)
    }
    fn reference_epoch(&self) -> Epoch {
        self.epoch
    }
    fn begin_valid(&self) -> Epoch {
        self.epoch.add_seconds(-Self::MAX_EXTRAPOLATION_S)
    }
    fn end_valid(&self) -> Epoch {
        self.epoch.add_seconds(Self::MAX_EXTRAPOLATION_S)
    }
    /// Message frame time, within the week of the reference epoch
    fn transmit_time(&self) -> Epoch {
        let (week, _) = self.epoch.to_week_sow();
        let t = Epoch::from_week_sow(week, self.mf_time as f64, self.epoch.time_system());
        let dt = t.seconds_since(&self.epoch);
        if dt > Constants::HALF_WEEK as f64 {
            t.add_days(-7)
        } else if dt < -(Constants::HALF_WEEK as f64) {
            t.add_days(7)
        } else {
            t
        }
    }
    fn xvt(&self, t: Epoch) -> Result<Xvt, Error> {
        let dt = t.try_sub(&self.epoch)?;
        if dt.abs() > Self::MAX_EXTRAPOLATION_S {
            #[cfg(feature = "log")]
            error!("{}: {} is {}s away from {}", self.sv(), t, dt, self.epoch);
            return Err(Error::OutOfValidityRange {
                sv: self.sv(),
                epoch: t,
            });
        }
        self.state_at(t, self.step)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::TimeSystem;

    /// Circular equatorial orbit, expressed in the rotating frame
    fn circular(epoch: Epoch) -> (GlonassEphemeris, f64, f64) {
        let pz90 = Ellipsoid::Pz90;
        let (mu, ae, omega) = (pz90.gm(), pz90.a(), pz90.angular_velocity());
        let r = 25_510_000.0_f64;
        // J2 strengthens the central attraction in the equatorial plane
        let central = mu / r.powi(2) * (1.0 + 1.5 * Constants::GLO_J2 * (ae / r).powi(2));
        let n = (central / r).sqrt();
        let eph = GlonassEphemeris::new(
            "R",
            1,
            epoch,
            Triple::new(r, 0.0, 0.0),
            Triple::new(0.0, n * r - omega * r, 0.0),
            Triple::default(),
        );
        (eph, r, n - omega)
    }

    #[test]
    fn display() {
        let eph = GlonassEphemeris::new(
            "mySys",
            1,
            Epoch::default(),
            Triple::new(100.0, 200.0, 300.0),
            Triple::new(10.0, 20.0, 30.0),
            Triple::new(1.0, 2.0, 3.0),
        )
        .with_clock(0.0, 0.0)
        .with_mf_time(1)
        .with_health(2)
        .with_frequency_channel(3)
        .with_age_of_info(1.1);
        assert_eq!(
            eph.to_string(),
            "Sys:mySys, PRN:1\nEpoch:0000000 00000000 0.000000000000000 Unknown, pos:(100, 200, 300)\nvel:(10, 20, 30), acc:(1, 2, 3)\nTauN:0, GammaN:0\nMFTime:1, health:2\nfreqNum:3, ageOfInfo:1.1"
        );
        assert_eq!(eph.sv(), SatelliteId::glonass(1));
        assert!(!eph.is_healthy());
    }

    #[test]
    fn rk4_circular_orbit() {
        let epoch = Epoch::from_gregorian(2020, 6, 25, 0, 15, 0.0, TimeSystem::GLO);
        let (eph, r, rate) = circular(epoch);
        for dt in [-900.0, -123.5, 0.0, 450.25, 900.0] {
            let xvt = eph.xvt(epoch.add_seconds(dt)).unwrap();
            let theta = rate * dt;
            let expected = Triple::new(r * theta.cos(), r * theta.sin(), 0.0);
            assert!((xvt.position - expected).mag() < 1.0E-2, "dt={}", dt);
            assert_eq!(xvt.confidence, Confidence::Nominal);
        }
    }

    #[test]
    fn step_independence() {
        let epoch = Epoch::from_gregorian(2020, 6, 25, 0, 15, 0.0, TimeSystem::GLO);
        let eph = GlonassEphemeris::new(
            "R",
            4,
            epoch,
            Triple::new(-14_310_000.0, 3_680_000.0, 21_220_000.0),
            Triple::new(1_100.0, -3_000.0, 1_200.0),
            Triple::new(1.0E-6, -2.0E-6, -3.0E-6),
        );
        let (p1, v1) = eph.propagate(900.0, 1.0).unwrap();
        let (p10, v10) = eph.propagate(900.0, 10.0).unwrap();
        assert!((p1 - p10).mag() < 1.0E-3);
        assert!((v1 - v10).mag() < 1.0E-6);
        let (p, _) = eph.propagate(0.0, 1.0).unwrap();
        assert_eq!(p, eph.position);
    }

    #[test]
    fn bounded_propagation() {
        let epoch = Epoch::from_gregorian(2020, 6, 25, 0, 15, 0.0, TimeSystem::GLO);
        let (eph, _, _) = circular(epoch);
        assert!(matches!(
            eph.xvt_extrapolated(epoch.add_seconds(1.0E7)),
            Err(Error::OutOfValidityRange { .. })
        ));
        assert!(matches!(
            eph.xvt_extrapolated(epoch.add_seconds(-86_401.0)),
            Err(Error::OutOfValidityRange { .. })
        ));
        // too many steps for such a small step
        assert!(matches!(
            eph.propagate(900.0, 1.0E-3),
            Err(Error::OutOfValidityRange { .. })
        ));
        assert!(eph.propagate(90.0, 1.0E-3).is_ok());
        for step in [0.0, -1.0, 1.0E-4, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                eph.propagate(60.0, step),
                Err(Error::InvalidStep(_))
            ));
        }
        let xvt = eph.with_step(60.0).xvt_extrapolated(epoch.add_seconds(3600.0)).unwrap();
        assert_eq!(xvt.confidence, Confidence::Degraded);
    }

    #[test]
    fn validity_window() {
        let epoch = Epoch::from_gregorian(2020, 6, 25, 0, 15, 0.0, TimeSystem::GLO);
        let (eph, _, _) = circular(epoch);
        let eph = eph.with_clock(1.0E-5, 1.0E-12);
        let late = epoch.add_seconds(901.0);
        assert!(matches!(
            eph.xvt(late),
            Err(Error::OutOfValidityRange { .. })
        ));
        let xvt = eph.xvt_extrapolated(late).unwrap();
        assert_eq!(xvt.confidence, Confidence::Degraded);
        assert!((xvt.clock_bias - (-1.0E-5 + 901.0E-12)).abs() < 1.0E-18);
        assert_eq!(xvt.clock_drift, 1.0E-12);
        assert!(matches!(
            eph.xvt(epoch.with_time_system(TimeSystem::GPS)),
            Err(Error::TimeSystemMismatch(..))
        ));
    }

    #[test]
    fn transmit_time() {
        // thursday, 00:15 UTC
        let epoch = Epoch::from_gregorian(2020, 6, 25, 0, 15, 0.0, TimeSystem::GLO);
        let (eph, _, _) = circular(epoch);
        let sow = epoch.sow() as i64;
        let eph = eph.with_mf_time(sow - 30);
        assert_eq!(eph.transmit_time(), epoch.add_seconds(-30.0));
        assert_eq!(eph.sv(), SatelliteId::glonass(1));
    }
}
