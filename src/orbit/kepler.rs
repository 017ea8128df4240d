#[cfg(feature = "log")]
use log::error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use nalgebra::{Matrix3, Rotation3, SMatrix, Vector3, Vector4};

use crate::{
    constants::Constants,
    navigation::NavMessageType,
    orbit::OrbitRecord,
    prelude::{Epoch, Error, SatelliteId, Xvt},
    xvt::Health,
};

/// [Kepler] stores all keplerian parameters
#[derive(Default, Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Kepler {
    /// Semi major axis (m), when broadcast as such
    pub a: f64,
    /// Square root of the semi major axis (m^1/2), when broadcast as such
    pub sqrt_a: f64,
    /// Semi major axis rate of change (m/s)
    pub a_dot: f64,
    /// Eccentricity (n.a)
    pub e: f64,
    /// Inclination angle at reference time (rad)
    pub i_0: f64,
    /// Longitude of ascending node at weekly epoch (rad)
    pub omega_0: f64,
    /// Mean anomaly at reference time (rad)
    pub m_0: f64,
    /// Argument of perigee (rad)
    pub omega: f64,
}

impl Kepler {
    /// Semi major axis at reference time (m). Prefers the
    /// square root when both were provided.
    pub fn semi_major_axis(&self) -> f64 {
        if self.sqrt_a > 0.0 {
            self.sqrt_a.powi(2)
        } else {
            self.a
        }
    }
}

/// Orbit [Perturbations]
#[derive(Default, Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Perturbations {
    /// Mean motion difference from computed value (rad/s)
    pub dn: f64,
    /// Rate of change of the mean motion difference (rad/s²)
    pub dn_dot: f64,
    /// Inclination rate of change (rad/s)
    pub i_dot: f64,
    /// Right ascension rate of change (rad/s)
    pub omega_dot: f64,
    /// Amplitude of sine harmonic correction term of the argument
    /// of latitude (rad)
    pub cus: f64,
    /// Amplitude of cosine harmonic correction term of the argument
    /// of latitude (rad)
    pub cuc: f64,
    /// Amplitude of sine harmonic correction term of the angle of inclination (rad)
    pub cis: f64,
    /// Amplitude of cosine harmonic correction term of the angle of inclination (rad)
    pub cic: f64,
    /// Amplitude of sine harmonic correction term of the orbit radius (m)
    pub crs: f64,
    /// Amplitude of cosine harmonic correction term of the orbit radius (m)
    pub crc: f64,
}

/// Broadcast clock polynomial
#[derive(Default, Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockModel {
    /// Clock reference epoch
    pub toc: Epoch,
    /// Bias (s)
    pub af0: f64,
    /// Drift (s/s)
    pub af1: f64,
    /// Drift rate (s/s²)
    pub af2: f64,
    /// Group delay (s)
    pub tgd: f64,
}

impl ClockModel {
    /// Clock (bias, drift) at `t`
    pub fn at(&self, t: Epoch) -> Result<(f64, f64), Error> {
        let dt = t.try_sub(&self.toc)?;
        Ok((
            self.af0 + self.af1 * dt + self.af2 * dt.powi(2),
            self.af1 + 2.0 * self.af2 * dt,
        ))
    }
}

/// Solves Kepler's equation with Newton-Raphson, returns the eccentric anomaly (rad)
pub(crate) fn solve_kepler(sv: SatelliteId, m_k: f64, e: f64) -> Result<f64, Error> {
    let mut e_k = m_k;
    for _ in 0..Constants::MAX_KEPLER_ITER {
        let (sin_e_k, cos_e_k) = e_k.sin_cos();
        let delta = (e_k - e * sin_e_k - m_k) / (1.0 - e * cos_e_k);
        e_k -= delta;
        if !e_k.is_finite() {
            break;
        }
        if delta.abs() <= Constants::KEPLER_TOLERANCE * (1.0 + e_k.abs()) {
            return Ok(e_k);
        }
    }
    #[cfg(feature = "log")]
    error!("{}: kepler iteration overflow (M={}, e={})", sv, m_k, e);
    Err(Error::KeplerDivergence(sv))
}

/// [Helper] helps calculate satellite orbital state from Keplerian elements.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Helper {
    /// Satellite
    pub sv: SatelliteId,
    /// The difference between the calculated time and the ephemeris reference time
    pub t_k: f64,
    /// Argument of latitude (corrected)
    pub u_k: f64,
    /// Radius (corrected)
    pub r_k: f64,
    /// Orbital inclination (corrected)
    pub i_k: f64,
    /// Ascending node right ascension
    pub omega_k: f64,
    /// First derivative of the argument of latitude (corrected)
    pub fd_u_k: f64,
    /// First derivative of the radius (corrected)
    pub fd_r_k: f64,
    /// First derivative of the orbital inclination (corrected)
    pub fd_i_k: f64,
    /// First derivative of the ascending node right ascension
    pub fd_omega_k: f64,
    /// Relativistic effect correction
    pub dtr: f64,
}

impl Helper {
    /// Solves the perturbed Keplerian motion `t_k` seconds after reference,
    /// `toe_sow` being the reference time in seconds of week.
    pub fn new(
        sv: SatelliteId,
        t_k: f64,
        toe_sow: f64,
        kepler: &Kepler,
        perturbations: &Perturbations,
    ) -> Result<Self, Error> {
        let gm_m3_s2 = Constants::gm(sv);
        let omega = Constants::omega(sv);
        let dtr_f = Constants::dtr_f(sv);

        let a = kepler.semi_major_axis() + kepler.a_dot * t_k;
        let e = kepler.e;

        let n0 = (gm_m3_s2 / a.powi(3)).sqrt(); // average angular velocity
        let n = n0 + perturbations.dn + 0.5 * perturbations.dn_dot * t_k; // corrected mean motion
        let m_k = kepler.m_0 + n * t_k; // mean anomaly

        let e_k = solve_kepler(sv, m_k, e)?;

        // true anomaly
        let (sin_e_k, cos_e_k) = e_k.sin_cos();
        let v_k = ((1.0 - e.powi(2)).sqrt() * sin_e_k).atan2(cos_e_k - e);

        let phi_k = v_k + kepler.omega; // latitude argument
        let (x2_sin_phi_k, x2_cos_phi_k) = (2.0 * phi_k).sin_cos();

        // latitude argument correction
        let du_k = perturbations.cus * x2_sin_phi_k + perturbations.cuc * x2_cos_phi_k;
        let u_k = phi_k + du_k;

        // orbital radius correction
        let dr_k = perturbations.crs * x2_sin_phi_k + perturbations.crc * x2_cos_phi_k;
        let r_k = a * (1.0 - e * cos_e_k) + dr_k;

        // inclination angle correction
        let di_k = perturbations.cis * x2_sin_phi_k + perturbations.cic * x2_cos_phi_k;
        let i_k = kepler.i_0 + di_k + perturbations.i_dot * t_k;

        // first derivatives
        let fd_e_k = n / (1.0 - e * cos_e_k);
        let fd_phi_k = (1.0 - e.powi(2)).sqrt() / (1.0 - e * cos_e_k) * fd_e_k;

        let fd_u_k = fd_phi_k
            + 2.0 * (perturbations.cus * x2_cos_phi_k - perturbations.cuc * x2_sin_phi_k) * fd_phi_k;

        let fd_r_k = a * e * sin_e_k * fd_e_k
            + 2.0 * (perturbations.crs * x2_cos_phi_k - perturbations.crc * x2_sin_phi_k) * fd_phi_k;

        let fd_i_k = perturbations.i_dot
            + 2.0 * (perturbations.cis * x2_cos_phi_k - perturbations.cic * x2_sin_phi_k) * fd_phi_k;

        // relativistic effect correction
        let dtr = dtr_f * e * a.sqrt() * sin_e_k;

        // ascending node longitude
        let (omega_k, fd_omega_k) = if sv.is_beidou_geo() {
            (
                kepler.omega_0 + perturbations.omega_dot * t_k - omega * toe_sow,
                perturbations.omega_dot,
            )
        } else {
            (
                kepler.omega_0 + (perturbations.omega_dot - omega) * t_k - omega * toe_sow,
                perturbations.omega_dot - omega,
            )
        };

        Ok(Self {
            sv,
            t_k,
            u_k,
            r_k,
            i_k,
            omega_k,
            fd_u_k,
            fd_r_k,
            fd_i_k,
            fd_omega_k,
            dtr,
        })
    }

    /// Position in the orbital plane
    fn orbit_position(&self) -> (f64, f64) {
        let (sin_u_k, cos_u_k) = self.u_k.sin_cos();
        (self.r_k * cos_u_k, self.r_k * sin_u_k)
    }

    /// Returns ẋ and ẏ in the orbital plane
    fn orbit_velocity(&self) -> (f64, f64) {
        let (sin_u_k, cos_u_k) = self.u_k.sin_cos();
        let fd_x = self.fd_r_k * cos_u_k - self.r_k * self.fd_u_k * sin_u_k;
        let fd_y = self.fd_r_k * sin_u_k + self.r_k * self.fd_u_k * cos_u_k;
        (fd_x, fd_y)
    }

    /// Orbital plane to ECEF (or GK frame, for BeiDou GEO) rotation
    fn orbit_to_ecef_rotation_matrix(&self) -> Rotation3<f64> {
        // Positive angles mean counterclockwise rotation
        let rotation_x = Rotation3::from_axis_angle(&Vector3::x_axis(), self.i_k);
        let rotation_z = Rotation3::from_axis_angle(&Vector3::z_axis(), self.omega_k);
        rotation_z * rotation_x
    }

    /// (position, velocity) in the frame [Self::orbit_to_ecef_rotation_matrix] rotates to
    fn rotated_pv(&self) -> (Vector3<f64>, Vector3<f64>) {
        let (x, y) = self.orbit_position();
        let pos = self.orbit_to_ecef_rotation_matrix() * Vector3::new(x, y, 0.0);

        let (sin_omega_k, cos_omega_k) = self.omega_k.sin_cos();
        let (sin_i_k, cos_i_k) = self.i_k.sin_cos();
        let (fd_x, fd_y) = self.orbit_velocity();

        // First derivative of the rotated position,
        // with respect to (ẋ, ẏ, Ω̇, i̇)
        let mut fd_r = SMatrix::<f64, 3, 4>::zeros();
        fd_r[(0, 0)] = cos_omega_k;
        fd_r[(0, 1)] = -sin_omega_k * cos_i_k;
        fd_r[(0, 2)] = -pos[1];
        fd_r[(0, 3)] = y * sin_omega_k * sin_i_k;
        fd_r[(1, 0)] = sin_omega_k;
        fd_r[(1, 1)] = cos_omega_k * cos_i_k;
        fd_r[(1, 2)] = pos[0];
        fd_r[(1, 3)] = -y * cos_omega_k * sin_i_k;
        fd_r[(2, 1)] = sin_i_k;
        fd_r[(2, 3)] = y * cos_i_k;

        let rhs = Vector4::new(fd_x, fd_y, self.fd_omega_k, self.fd_i_k);
        (pos, fd_r * rhs)
    }

    /// ECEF (position, velocity) in (m, m/s)
    pub fn position_velocity(&self) -> (Vector3<f64>, Vector3<f64>) {
        let (pos, vel) = self.rotated_pv();
        if !self.sv.is_beidou_geo() {
            return (pos, vel);
        }
        // GK frame to ECEF, for BeiDou GEO
        let omega = Constants::omega(self.sv);
        let theta = -omega * self.t_k;
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), 5.0_f64.to_radians());
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), theta);
        let (sin_theta, cos_theta) = theta.sin_cos();
        let fd_rz = -omega
            * Matrix3::new(
                -sin_theta, -cos_theta, 0.0, cos_theta, -sin_theta, 0.0, 0.0, 0.0, 0.0,
            );
        let ecef_pos = rz * rx * pos;
        let ecef_vel = fd_rz * (rx * pos) + rz * rx * vel;
        (ecef_pos, ecef_vel)
    }
}

/// [KeplerOrbit] is a broadcast orbit, described by Keplerian elements
/// and their [Perturbations]. Its content is immutable once built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeplerOrbit {
    sv: SatelliteId,
    message: NavMessageType,
    toe: Epoch,
    begin_valid: Epoch,
    end_valid: Epoch,
    transmit_time: Epoch,
    ura: i16,
    healthy: bool,
    kepler: Kepler,
    perturbations: Perturbations,
    clock: Option<ClockModel>,
}

impl KeplerOrbit {
    /// Builds a new [KeplerOrbit]. Transmit time defaults to
    /// the start of validity, health to healthy and URA index to 0.
    pub fn new(
        sv: SatelliteId,
        message: NavMessageType,
        toe: Epoch,
        begin_valid: Epoch,
        end_valid: Epoch,
        kepler: Kepler,
        perturbations: Perturbations,
    ) -> Self {
        Self {
            sv,
            message,
            toe,
            begin_valid,
            end_valid,
            transmit_time: begin_valid,
            ura: 0,
            healthy: true,
            kepler,
            perturbations,
            clock: None,
        }
    }
    /// Copies and returns [KeplerOrbit] with given transmit time
    pub fn with_transmit_time(&self, t: Epoch) -> Self {
        let mut s = self.clone();
        s.transmit_time = t;
        s
    }
    /// Copies and returns [KeplerOrbit] with given URA index
    pub fn with_ura(&self, ura: i16) -> Self {
        let mut s = self.clone();
        s.ura = ura;
        s
    }
    /// Copies and returns [KeplerOrbit] with given health flag
    pub fn with_health(&self, healthy: bool) -> Self {
        let mut s = self.clone();
        s.healthy = healthy;
        s
    }
    /// Copies and returns [KeplerOrbit] with given [ClockModel]
    pub fn with_clock(&self, clock: ClockModel) -> Self {
        let mut s = self.clone();
        s.clock = Some(clock);
        s
    }
    pub fn message(&self) -> NavMessageType {
        self.message
    }
    /// Time of ephemeris
    pub fn toe(&self) -> Epoch {
        self.toe
    }
    pub fn ura(&self) -> i16 {
        self.ura
    }
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }
    pub fn kepler(&self) -> &Kepler {
        &self.kepler
    }
    pub fn perturbations(&self) -> &Perturbations {
        &self.perturbations
    }
    pub fn clock(&self) -> Option<&ClockModel> {
        self.clock.as_ref()
    }
    pub fn cuc(&self) -> f64 {
        self.perturbations.cuc
    }
    pub fn cus(&self) -> f64 {
        self.perturbations.cus
    }
    pub fn crc(&self) -> f64 {
        self.perturbations.crc
    }
    pub fn crs(&self) -> f64 {
        self.perturbations.crs
    }
    pub fn cic(&self) -> f64 {
        self.perturbations.cic
    }
    pub fn cis(&self) -> f64 {
        self.perturbations.cis
    }
    pub fn m0(&self) -> f64 {
        self.kepler.m_0
    }
    pub fn dn(&self) -> f64 {
        self.perturbations.dn
    }
    pub fn dn_dot(&self) -> f64 {
        self.perturbations.dn_dot
    }
    pub fn ecc(&self) -> f64 {
        self.kepler.e
    }
    pub fn a(&self) -> f64 {
        self.kepler.a
    }
    pub fn a_half(&self) -> f64 {
        self.kepler.sqrt_a
    }
    pub fn a_dot(&self) -> f64 {
        self.kepler.a_dot
    }
    pub fn omega0(&self) -> f64 {
        self.kepler.omega_0
    }
    pub fn i0(&self) -> f64 {
        self.kepler.i_0
    }
    pub fn w(&self) -> f64 {
        self.kepler.omega
    }
    pub fn omega_dot(&self) -> f64 {
        self.perturbations.omega_dot
    }
    pub fn idot(&self) -> f64 {
        self.perturbations.i_dot
    }
}

impl OrbitRecord for KeplerOrbit {
    fn sv(&self) -> SatelliteId {
        self.sv
    }
    fn reference_epoch(&self) -> Epoch {
        self.toe
    }
    fn begin_valid(&self) -> Epoch {
        self.begin_valid
    }
    fn end_valid(&self) -> Epoch {
        self.end_valid
    }
    fn transmit_time(&self) -> Epoch {
        self.transmit_time
    }
    fn xvt(&self, t: Epoch) -> Result<Xvt, Error> {
        let t_k = t.try_sub(&self.toe)?;
        if !self.is_valid(t) {
            #[cfg(feature = "log")]
            error!("{}: {} out of validity [{}, {}]", self.sv, t, self.begin_valid, self.end_valid);
            return Err(Error::OutOfValidityRange {
                sv: self.sv,
                epoch: t,
            });
        }
        let helper = Helper::new(
            self.sv,
            t_k,
            self.toe.sow(),
            &self.kepler,
            &self.perturbations,
        )?;
        let (position, velocity) = helper.position_velocity();
        let health = if self.healthy {
            Health::Healthy
        } else {
            Health::Unhealthy
        };
        let mut xvt = Xvt::new(position.into(), velocity.into())
            .with_relativistic_correction(helper.dtr)
            .with_health(health);
        if let Some(clock) = &self.clock {
            let (bias, drift) = clock.at(t)?;
            xvt = xvt.with_clock(bias, drift);
        }
        Ok(xvt)
    }
}
