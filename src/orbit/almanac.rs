#[cfg(feature = "log")]
use log::error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    constants::Constants,
    orbit::{Helper, Kepler, OrbitRecord, Perturbations},
    prelude::{Epoch, Error, SatelliteId, Xvt},
    xvt::Health,
};

/// [AlmanacOrbit] is the reduced orbit of an almanac page.
/// Angles are expressed in radians.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlmanacOrbit {
    pub sv: SatelliteId,
    /// Eccentricity
    pub ecc: f64,
    /// Inclination offset from the 0.30 semicircles reference (rad)
    pub i_offset: f64,
    /// Rate of right ascension (rad/s)
    pub omega_dot: f64,
    /// Square root of the semi major axis (m^1/2)
    pub a_half: f64,
    /// Longitude of ascending node at weekly epoch (rad)
    pub omega_0: f64,
    /// Argument of perigee (rad)
    pub w: f64,
    /// Mean anomaly at reference time (rad)
    pub m_0: f64,
    /// Clock bias (s)
    pub af0: f64,
    /// Clock drift (s/s)
    pub af1: f64,
    /// Time of applicability, in seconds of [Self::week]
    pub toa: i64,
    /// Transmit time, in seconds of [Self::full_week]
    pub xmit_time: i64,
    /// Week of the time of applicability (un-truncated)
    pub week: i32,
    /// Health bits, 0 meaning healthy
    pub health: u8,
}

impl AlmanacOrbit {
    /// Half width of the validity window, around the time of applicability (s)
    pub const VALIDITY_HALF_WIDTH_S: f64 = 302_400.0;

    /// Week of transmission, which may differ from the week
    /// of applicability by one: a transmit time more than half
    /// a week after the time of applicability belongs to the previous week.
    pub fn full_week(&self) -> i32 {
        let dt = self.xmit_time - self.toa;
        if dt > Constants::HALF_WEEK {
            self.week - 1
        } else if dt < -Constants::HALF_WEEK {
            self.week + 1
        } else {
            self.week
        }
    }
    /// Week of applicability of `toa`, for a page transmitted
    /// at `xmit_time` seconds of `transmit_week`.
    pub fn applicability_week(transmit_week: i32, toa: i64, xmit_time: i64) -> i32 {
        let dt = toa - xmit_time;
        if dt < -Constants::HALF_WEEK {
            transmit_week + 1
        } else if dt > Constants::HALF_WEEK {
            transmit_week - 1
        } else {
            transmit_week
        }
    }
    pub fn af0(&self) -> f64 {
        self.af0
    }
    pub fn af1(&self) -> f64 {
        self.af1
    }
    pub fn toa(&self) -> i64 {
        self.toa
    }
    /// Orbit inclination (rad)
    pub fn inclination(&self) -> f64 {
        Constants::semicircles(Constants::ALMANAC_REF_INCLINATION) + self.i_offset
    }
    /// Semi major axis (m)
    pub fn semi_major_axis(&self) -> f64 {
        self.a_half.powi(2)
    }
    pub fn is_healthy(&self) -> bool {
        self.health == 0
    }
    fn kepler(&self) -> Kepler {
        Kepler {
            sqrt_a: self.a_half,
            e: self.ecc,
            i_0: self.inclination(),
            omega_0: self.omega_0,
            m_0: self.m_0,
            omega: self.w,
            ..Default::default()
        }
    }
}

impl OrbitRecord for AlmanacOrbit {
    fn sv(&self) -> SatelliteId {
        self.sv
    }
    /// Time of applicability
    fn reference_epoch(&self) -> Epoch {
        Epoch::from_week_sow(self.week, self.toa as f64, self.sv.time_system())
    }
    fn begin_valid(&self) -> Epoch {
        self.reference_epoch()
            .add_seconds(-Self::VALIDITY_HALF_WIDTH_S)
    }
    fn end_valid(&self) -> Epoch {
        self.reference_epoch()
            .add_seconds(Self::VALIDITY_HALF_WIDTH_S)
    }
    fn transmit_time(&self) -> Epoch {
        Epoch::from_week_sow(self.full_week(), self.xmit_time as f64, self.sv.time_system())
    }
    fn xvt(&self, t: Epoch) -> Result<Xvt, Error> {
        let toa = self.reference_epoch();
        let t_k = t.try_sub(&toa)?;
        if t_k.abs() > Self::VALIDITY_HALF_WIDTH_S {
            #[cfg(feature = "log")]
            error!("{}: {} out of almanac validity (toa={})", self.sv, t, toa);
            return Err(Error::OutOfValidityRange {
                sv: self.sv,
                epoch: t,
            });
        }
        let perturbations = Perturbations {
            omega_dot: self.omega_dot,
            ..Default::default()
        };
        let helper = Helper::new(self.sv, t_k, self.toa as f64, &self.kepler(), &perturbations)?;
        let (position, velocity) = helper.position_velocity();
        let health = if self.is_healthy() {
            Health::Healthy
        } else {
            Health::Unhealthy
        };
        Ok(Xvt::new(position.into(), velocity.into())
            .with_clock(self.af0 + self.af1 * t_k, self.af1)
            .with_relativistic_correction(helper.dtr)
            .with_health(health))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::TimeSystem;

    fn almanac(toa: i64, xmit_time: i64, week: i32) -> AlmanacOrbit {
        AlmanacOrbit {
            sv: SatelliteId::gps(4),
            ecc: 4.74166870117188E-03,
            i_offset: 1.03988647460938E-02 * Constants::GPS_PI,
            omega_dot: -2.53748340765014E-09 * Constants::GPS_PI,
            a_half: 5.15559814453125E+03,
            omega_0: -7.94581949710846E-01 * Constants::GPS_PI,
            w: 2.33459472656250E-01 * Constants::GPS_PI,
            m_0: -5.99035501480103E-01 * Constants::GPS_PI,
            af0: 4.48226928710938E-04,
            af1: 1.09139364212751E-11,
            toa,
            xmit_time,
            week,
            health: 0,
        }
    }

    #[test]
    fn full_week_rollover() {
        assert_eq!(almanac(405_504, 400_000, 1274).full_week(), 1274);
        // issued at the end of a week, for the following one
        assert_eq!(almanac(61_440, 590_000, 1275).full_week(), 1274);
        assert_eq!(AlmanacOrbit::applicability_week(1274, 61_440, 590_000), 1275);
        // applicability in the past week
        assert_eq!(almanac(589_824, 4_000, 1273).full_week(), 1274);
        assert_eq!(AlmanacOrbit::applicability_week(1274, 589_824, 4_000), 1273);
        // transmit time counted beyond the week of applicability
        let alm = AlmanacOrbit {
            omega_dot: 1.5,
            m_0: 50.5,
            toa: 0,
            xmit_time: 3_000_000,
            week: 1,
            health: 2,
            ..Default::default()
        };
        assert_eq!(alm.af0(), 0.0);
        assert_eq!(alm.toa(), 0);
        assert_eq!(alm.full_week(), 0);

        let alm = almanac(61_440, 590_000, 1275);
        assert_eq!(alm.reference_epoch().to_week_sow(), (1275, 61_440.0));
        assert_eq!(alm.transmit_time().to_week_sow(), (1274, 590_000.0));
    }

    #[test]
    fn almanac_state() {
        let alm = almanac(405_504, 400_000, 1274);
        let toa = alm.reference_epoch();
        assert_eq!(toa.time_system(), TimeSystem::GPS);
        assert_eq!(toa.to_week_sow(), (1274, 405_504.0));
        let xvt = alm.xvt(toa.add_seconds(3600.0)).unwrap();
        let r = xvt.position.mag();
        let a = alm.semi_major_axis();
        assert!(r > a * (1.0 - alm.ecc) - 1.0 && r < a * (1.0 + alm.ecc) + 1.0);
        assert!((xvt.clock_bias - (4.48226928710938E-04 + 3600.0 * 1.09139364212751E-11)).abs() < 1.0E-15);
        assert_eq!(xvt.health, Health::Healthy);
        assert!(matches!(
            alm.xvt(toa.add_seconds(302_401.0)),
            Err(Error::OutOfValidityRange { .. })
        ));
    }
}
