//! Test helpers
use crate::prelude::{Epoch, TimeSystem, Triple};

/// Initializes the test logger, once. Traces require the "log" feature.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Path to a test resource
pub fn resource(path: &str) -> String {
    format!("{}/test_resources/{}", env!("CARGO_MANIFEST_DIR"), path)
}

/// Panics if both vectors are more than `tolerance` apart
pub fn assert_close(a: &Triple, b: &Triple, tolerance: f64) {
    let err = (*a - *b).mag();
    assert!(err <= tolerance, "{} != {} (err={:e})", a, b, err);
}

/// Circular orbits of the SP3 test resource: radius (km)
pub const SP3_RADIUS_KM: f64 = 26_560.0;
/// Circular orbits of the SP3 test resource: period (s)
pub const SP3_PERIOD_S: f64 = 43_082.0;

/// First epoch of the SP3 test resource
pub fn sp3_start() -> Epoch {
    Epoch::from_gregorian(2004, 6, 10, 0, 0, 0.0, TimeSystem::GPS)
}

/// Analytical (position, velocity) in (m, m/s) of the SP3 test resource,
/// `dt` seconds after its first epoch
pub fn sp3_state(prn: u8, dt: f64) -> (Triple, Triple) {
    let n = 2.0 * std::f64::consts::PI / SP3_PERIOD_S;
    let inclination = 55.0_f64.to_radians();
    let u = n * dt + 0.5 * prn as f64;
    let r = SP3_RADIUS_KM * 1.0E3;
    let (sin_u, cos_u) = u.sin_cos();
    let (sin_i, cos_i) = inclination.sin_cos();
    (
        Triple::new(r * cos_u, r * sin_u * cos_i, r * sin_u * sin_i),
        Triple::new(-r * n * sin_u, r * n * cos_u * cos_i, r * n * cos_u * sin_i),
    )
}
