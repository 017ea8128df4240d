#[cfg(feature = "log")]
use log::{debug, error};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use itertools::Itertools;
use std::{cmp::Ordering, collections::BTreeMap, ops::Range};

use crate::{
    prelude::{Epoch, Error, SatelliteId, Triple, Xvt},
    sp3::{Header, Record},
    store::{Sp3Config, XvtStore},
    xvt::Health,
};

/// SP3 positions are expressed in km
const KM: f64 = 1.0E3;
/// SP3 velocities are expressed in dm/s
const DM_S: f64 = 1.0E-1;
/// SP3 clock offsets are expressed in µs
const US: f64 = 1.0E-6;
/// SP3 clock rates are expressed in 1E-4 µs/s
const CLOCK_RATE: f64 = 1.0E-10;

/// Tabulated vector, in SP3 units
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VectorSample {
    pub epoch: Epoch,
    pub value: Triple,
    pub sigma: Triple,
}

/// Tabulated clock term, in SP3 units
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockSample {
    pub epoch: Epoch,
    pub value: f64,
}

/// Inserts or replaces, keeping `samples` sorted by epoch
fn insert_sorted<T>(samples: &mut Vec<T>, epoch: Epoch, sample: T, epoch_of: impl Fn(&T) -> Epoch) {
    let index = samples.partition_point(|s| epoch_of(s).cmp_instant(&epoch) == Ordering::Less);
    match samples.get_mut(index) {
        Some(existing) if epoch_of(existing).cmp_instant(&epoch) == Ordering::Equal => {
            *existing = sample;
        },
        _ => samples.insert(index, sample),
    }
}

/// Outcome of a sample lookup
enum Lookup {
    Exact(usize),
    Window(Range<usize>),
}

/// Index of the first sample not earlier than `t`
fn first_not_before(samples: &[VectorSample], t: Epoch) -> usize {
    samples.partition_point(|s| s.epoch.cmp_instant(&t) == Ordering::Less)
}

/// The `count` samples centred around `index`, `count - count / 2` of them
/// lying before it.
fn window(samples: &[VectorSample], index: usize, count: usize) -> Option<Range<usize>> {
    let before = count - count / 2;
    let start = index.checked_sub(before)?;
    let end = start + count;
    if end > samples.len() {
        return None;
    }
    Some(start..end)
}

/// Locates `t` within `samples`: either an exact sample, or the `count`
/// samples centred around `t`, with no gap wider than `max_gap` seconds.
fn lookup(samples: &[VectorSample], t: Epoch, count: usize, max_gap: f64) -> Option<Lookup> {
    let index = first_not_before(samples, t);
    if let Some(s) = samples.get(index) {
        if s.epoch.cmp_instant(&t) == Ordering::Equal {
            return Some(Lookup::Exact(index));
        }
    }
    let range = window(samples, index, count)?;
    let gap = samples[range.clone()]
        .iter()
        .tuple_windows()
        .any(|(a, b)| b.epoch.seconds_since(&a.epoch) > max_gap);
    if gap {
        None
    } else {
        Some(Lookup::Window(range))
    }
}

/// Lagrange polynomial through the `window` samples, evaluated at `t`,
/// along with its first derivative (per second).
fn lagrange(window: &[VectorSample], t: Epoch) -> (Triple, Triple) {
    let x = |i: usize| window[i].epoch.seconds_since(&t);
    let n = window.len();
    let mut value = Triple::default();
    let mut derivative = Triple::default();
    for i in 0..n {
        let xi = x(i);
        let mut li = 1.0_f64;
        let mut dli = 0.0_f64;
        for k in 0..n {
            if k == i {
                continue;
            }
            let xk = x(k);
            li *= -xk / (xi - xk);
            let mut term = 1.0 / (xi - xk);
            for j in 0..n {
                if j != i && j != k {
                    let xj = x(j);
                    term *= -xj / (xi - xj);
                }
            }
            dli += term;
        }
        value = value + window[i].value * li;
        derivative = derivative + window[i].value * dli;
    }
    (value, derivative)
}

/// [Sp3Store] holds precise, tabulated, satellite states.
/// Samples are stored in SP3 units (km, dm/s, µs) and returned in
/// SI units (m, m/s, s). States are obtained by Lagrange interpolation.
/// Clock terms are linearly interpolated, and null when not available.
#[derive(Debug, Clone, Default)]
pub struct Sp3Store {
    config: Sp3Config,
    positions: BTreeMap<SatelliteId, Vec<VectorSample>>,
    velocities: BTreeMap<SatelliteId, Vec<VectorSample>>,
    clocks: BTreeMap<SatelliteId, Vec<ClockSample>>,
    clock_rates: BTreeMap<SatelliteId, Vec<ClockSample>>,
}

impl Sp3Store {
    pub fn new(config: Sp3Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }
    /// Loads a parsed SP3 file. Interpolation windows may span
    /// two file sampling intervals, if wider than the default gap.
    pub fn from_sp3(header: &Header, records: &[Record]) -> Self {
        let config = Sp3Config::default();
        let config = config.with_max_gap(config.max_gap_s.max(2.0 * header.epoch_interval));
        let mut store = Self::new(config);
        for record in records {
            store.add_record(record);
        }
        store
    }
    /// Stores all satellite entries of a parsed SP3 epoch
    pub fn add_record(&mut self, record: &Record) {
        let t = record.epoch;
        for entry in record.entries.iter() {
            if let Some(position) = entry.position {
                self.add_position_data(entry.sv, t, position, entry.position_sigma);
            }
            if let Some(clock) = entry.clock {
                self.add_clock_data(entry.sv, t, clock);
            }
            if let Some(velocity) = entry.velocity {
                self.add_velocity_data(entry.sv, t, velocity, entry.velocity_sigma);
            }
            if let Some(rate) = entry.clock_rate {
                self.add_clock_rate_data(entry.sv, t, rate);
            }
        }
    }
    pub fn config(&self) -> &Sp3Config {
        &self.config
    }
    /// Stores a position sample (km). A sample at the same epoch is replaced.
    pub fn add_position_data(&mut self, sv: SatelliteId, t: Epoch, position_km: Triple, sigma: Triple) {
        let sample = VectorSample {
            epoch: t,
            value: position_km,
            sigma,
        };
        insert_sorted(self.positions.entry(sv).or_default(), t, sample, |s| s.epoch);
    }
    /// Stores a velocity sample (dm/s). A sample at the same epoch is replaced.
    pub fn add_velocity_data(&mut self, sv: SatelliteId, t: Epoch, velocity_dm_s: Triple, sigma: Triple) {
        let sample = VectorSample {
            epoch: t,
            value: velocity_dm_s,
            sigma,
        };
        insert_sorted(self.velocities.entry(sv).or_default(), t, sample, |s| s.epoch);
    }
    /// Stores a clock offset sample (µs)
    pub fn add_clock_data(&mut self, sv: SatelliteId, t: Epoch, clock_us: f64) {
        let sample = ClockSample {
            epoch: t,
            value: clock_us,
        };
        insert_sorted(self.clocks.entry(sv).or_default(), t, sample, |s| s.epoch);
    }
    /// Stores a clock rate sample (1E-4 µs/s)
    pub fn add_clock_rate_data(&mut self, sv: SatelliteId, t: Epoch, rate: f64) {
        let sample = ClockSample { epoch: t, value: rate };
        insert_sorted(self.clock_rates.entry(sv).or_default(), t, sample, |s| s.epoch);
    }
    /// Position samples of `sv`, sorted by epoch
    pub fn position_samples(&self, sv: SatelliteId) -> &[VectorSample] {
        self.positions.get(&sv).map(|s| s.as_slice()).unwrap_or_default()
    }
    /// Velocity samples of `sv`, sorted by epoch
    pub fn velocity_samples(&self, sv: SatelliteId) -> &[VectorSample] {
        self.velocities.get(&sv).map(|s| s.as_slice()).unwrap_or_default()
    }
    /// Interpolates `samples` at `t`, returns (value, derivative per second)
    /// in SP3 units. An exact sample has no derivative.
    fn interpolate(
        &self,
        sv: SatelliteId,
        samples: &[VectorSample],
        t: Epoch,
    ) -> Result<(Triple, Option<Triple>), Error> {
        let insufficient = || Error::InsufficientData { sv, epoch: t };
        let first = samples.first().ok_or_else(insufficient)?;
        first.epoch.try_cmp(&t)?;

        let count = self.config.interpolation_order + 1;
        match lookup(samples, t, count, self.config.max_gap_s) {
            Some(Lookup::Exact(index)) => Ok((samples[index].value, None)),
            Some(Lookup::Window(range)) => {
                let (value, derivative) = lagrange(&samples[range], t);
                Ok((value, Some(derivative)))
            },
            None => {
                #[cfg(feature = "log")]
                error!("{}: cannot interpolate at {}", sv, t);
                Err(insufficient())
            },
        }
    }
    fn position_km(&self, sv: SatelliteId, t: Epoch) -> Result<(Triple, Option<Triple>), Error> {
        self.interpolate(sv, self.position_samples(sv), t)
    }
    /// Linear interpolation of a clock term, returns (value, slope)
    fn clock_term(samples: Option<&Vec<ClockSample>>, t: Epoch) -> Option<(f64, f64)> {
        let samples = samples?;
        let index = samples.partition_point(|s| s.epoch.cmp_instant(&t) == Ordering::Less);
        let after = samples.get(index)?;
        if after.epoch.cmp_instant(&t) == Ordering::Equal {
            let slope = match (samples.get(index + 1), index.checked_sub(1)) {
                (Some(next), _) => (next.value - after.value) / next.epoch.seconds_since(&after.epoch),
                (None, Some(prev)) => {
                    let prev = &samples[prev];
                    (after.value - prev.value) / after.epoch.seconds_since(&prev.epoch)
                },
                (None, None) => 0.0,
            };
            return Some((after.value, slope));
        }
        let before = &samples[index.checked_sub(1)?];
        let dt = after.epoch.seconds_since(&before.epoch);
        let slope = (after.value - before.value) / dt;
        Some((before.value + slope * t.seconds_since(&before.epoch), slope))
    }
    /// Clock (bias, drift) in SI units, null when not available
    fn clock(&self, sv: SatelliteId, t: Epoch) -> (f64, f64) {
        let bias = Self::clock_term(self.clocks.get(&sv), t);
        let rate = Self::clock_term(self.clock_rates.get(&sv), t).map(|(rate, _)| rate * CLOCK_RATE);
        match (bias, rate) {
            (Some((bias, _)), Some(rate)) => (bias * US, rate),
            (Some((bias, slope)), None) => (bias * US, slope * US),
            (None, Some(rate)) => (0.0, rate),
            (None, None) => {
                #[cfg(feature = "log")]
                debug!("{}: no clock data at {}", sv, t);
                (0.0, 0.0)
            },
        }
    }
}

impl XvtStore for Sp3Store {
    fn xvt(&self, sv: SatelliteId, t: Epoch) -> Result<Xvt, Error> {
        let (position, derivative) = self.position_km(sv, t)?;
        let velocity = if self.velocities.contains_key(&sv) {
            let (velocity, _) = self.interpolate(sv, self.velocity_samples(sv), t)?;
            velocity * DM_S
        } else if let Some(derivative) = derivative {
            derivative * KM
        } else {
            // exact sample: derivative from a window
            let samples = self.position_samples(sv);
            let count = self.config.interpolation_order + 1;
            let range = window(samples, first_not_before(samples, t), count)
                .ok_or(Error::InsufficientData { sv, epoch: t })?;
            lagrange(&samples[range], t).1 * KM
        };
        let (bias, drift) = self.clock(sv, t);
        Ok(Xvt::new(position * KM, velocity)
            .with_clock(bias, drift)
            .with_health(Health::Unknown))
    }
    fn position(&self, sv: SatelliteId, t: Epoch) -> Result<Triple, Error> {
        let (position, _) = self.position_km(sv, t)?;
        Ok(position * KM)
    }
    fn velocity(&self, sv: SatelliteId, t: Epoch) -> Result<Triple, Error> {
        Ok(self.xvt(sv, t)?.velocity)
    }
    fn satellites(&self) -> Vec<SatelliteId> {
        self.positions.keys().copied().collect()
    }
    fn initial_time(&self) -> Option<Epoch> {
        self.positions
            .values()
            .filter_map(|s| s.first())
            .map(|s| s.epoch)
            .min_by(|a, b| a.cmp_instant(b))
    }
    fn final_time(&self) -> Option<Epoch> {
        self.positions
            .values()
            .filter_map(|s| s.last())
            .map(|s| s.epoch)
            .max_by(|a, b| a.cmp_instant(b))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::TimeSystem;
    use rand::{thread_rng, Rng};

    #[test]
    fn exact_sample_units() {
        let sv = SatelliteId::gps(1);
        let t = Epoch::from_jday(10_000, TimeSystem::GPS);
        let mut store = Sp3Store::default();
        store.add_position_data(sv, t, Triple::new(50.0, -45.0, 20.0), Triple::default());
        store.add_velocity_data(sv, t, Triple::new(10.0, 20.0, -30.0), Triple::default());
        let xvt = store.xvt(sv, t).unwrap();
        assert_eq!(xvt.position, Triple::new(50_000.0, -45_000.0, 20_000.0));
        assert_eq!(xvt.velocity, Triple::new(1.0, 2.0, -3.0));
        assert_eq!(xvt.clock_bias, 0.0);
        assert_eq!(store.position(sv, t).unwrap(), xvt.position);
        assert!(matches!(
            store.xvt(sv, t.add_seconds(1.0)),
            Err(Error::InsufficientData { .. })
        ));
        assert!(matches!(
            store.xvt(SatelliteId::gps(2), t),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn polynomial_trajectory() {
        let sv = SatelliteId::gps(3);
        let t0 = Epoch::from_gregorian(2020, 6, 25, 0, 0, 0.0, TimeSystem::GPS);
        // cubic trajectory, expressed in km
        let trajectory = |dt: f64| {
            let h = dt / 3600.0;
            Triple::new(
                20_000.0 + 10.0 * h - 3.0 * h.powi(2) + 0.5 * h.powi(3),
                -5_000.0 + 2.0 * h.powi(2),
                15_000.0 - 7.0 * h,
            )
        };
        let derivative = |dt: f64| {
            let h = dt / 3600.0;
            Triple::new(
                10.0 - 6.0 * h + 1.5 * h.powi(2),
                4.0 * h,
                -7.0,
            ) * (1.0 / 3600.0)
        };
        let mut store = Sp3Store::new(Sp3Config::default().with_interpolation_order(8));
        for i in 0..96 {
            let dt = i as f64 * 900.0;
            store.add_position_data(sv, t0.add_seconds(dt), trajectory(dt), Triple::default());
            store.add_clock_data(sv, t0.add_seconds(dt), 100.0 + 1.0E-3 * dt);
        }
        let mut rng = thread_rng();
        for _ in 0..16 {
            let dt = rng.gen_range(10_000.0..70_000.0);
            let xvt = store.xvt(sv, t0.add_seconds(dt)).unwrap();
            assert!((xvt.position - trajectory(dt) * KM).mag() < 1.0E-5);
            assert!((xvt.velocity - derivative(dt) * KM).mag() < 1.0E-7);
            assert!((xvt.clock_bias - (100.0 + 1.0E-3 * dt) * US).abs() < 1.0E-15);
            assert!((xvt.clock_drift - 1.0E-9).abs() < 1.0E-15);
        }
        // exact sample: derivative from the polynomial
        let xvt = store.xvt(sv, t0.add_seconds(36_000.0)).unwrap();
        assert!((xvt.velocity - derivative(36_000.0) * KM).mag() < 1.0E-7);

        // window does not fit
        assert!(matches!(
            store.xvt(sv, t0.add_seconds(1000.0)),
            Err(Error::InsufficientData { .. })
        ));
        assert!(matches!(
            store.xvt(sv, t0.add_seconds(-1.0)),
            Err(Error::InsufficientData { .. })
        ));
        assert_eq!(store.initial_time(), Some(t0));
        assert_eq!(store.final_time(), Some(t0.add_seconds(95.0 * 900.0)));
    }

    #[test]
    fn gaps_and_duplicates() {
        let sv = SatelliteId::gps(4);
        let t0 = Epoch::from_gregorian(2020, 6, 25, 0, 0, 0.0, TimeSystem::GPS);
        let mut store = Sp3Store::new(Sp3Config::default().with_interpolation_order(3));
        for i in [0, 1, 2, 3, 4, 5, 10, 11, 12] {
            let t = t0.add_seconds(i as f64 * 900.0);
            store.add_position_data(sv, t, Triple::new(i as f64, 0.0, 0.0), Triple::default());
        }
        assert!(store.position(sv, t0.add_seconds(2.5 * 900.0)).is_ok());
        // window spans the 75 min gap
        assert!(matches!(
            store.position(sv, t0.add_seconds(5.5 * 900.0)),
            Err(Error::InsufficientData { .. })
        ));
        let t = t0.add_seconds(900.0);
        store.add_position_data(sv, t, Triple::new(7.0, 0.0, 0.0), Triple::default());
        assert_eq!(store.position_samples(sv).len(), 9);
        assert_eq!(store.position(sv, t).unwrap(), Triple::new(7_000.0, 0.0, 0.0));
        assert!(matches!(
            store.position(sv, t.with_time_system(TimeSystem::GLO)),
            Err(Error::TimeSystemMismatch(..))
        ));
    }

    #[test]
    fn window_selection() {
        let t0 = Epoch::from_gregorian(2020, 6, 25, 0, 0, 0.0, TimeSystem::GPS);
        let samples = (0..10)
            .map(|i| VectorSample {
                epoch: t0.add_seconds(i as f64 * 900.0),
                value: Triple::new(2.0 * i as f64, -(i as f64), 1.0),
                sigma: Triple::default(),
            })
            .collect::<Vec<_>>();
        let at = |i: f64| t0.add_seconds(i * 900.0);
        let window_of = |t: Epoch| match lookup(&samples, t, 4, 3600.0) {
            Some(Lookup::Window(range)) => Some(range),
            _ => None,
        };
        assert!(matches!(lookup(&samples, at(3.0), 4, 3600.0), Some(Lookup::Exact(3))));
        assert_eq!(window_of(at(2.5)), Some(1..5));
        assert_eq!(window_of(at(7.5)), Some(6..10));
        assert_eq!(window_of(at(0.5)), None);
        assert_eq!(window_of(at(8.5)), None);
        assert_eq!(window_of(at(-1.0)), None);
        assert_eq!(window(&samples, 0, 4), None);
        assert_eq!(window(&samples, 2, 5), Some(0..5));

        let (value, derivative) = lagrange(&samples[1..5], at(2.5));
        assert!((value - Triple::new(5.0, -2.5, 1.0)).mag() < 1.0E-9);
        assert!((derivative - Triple::new(2.0, -1.0, 0.0) * (1.0 / 900.0)).mag() < 1.0E-12);
    }
}
