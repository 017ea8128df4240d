//! User range accuracy (URA) index

/// Upper bound (m) of each URA index, IS-GPS-200 20.3.3.3.1.3
const URA_BOUNDS: [f64; 16] = [
    2.4,
    3.4,
    4.85,
    6.85,
    9.65,
    13.65,
    24.0,
    48.0,
    96.0,
    192.0,
    384.0,
    768.0,
    1536.0,
    3072.0,
    6144.0,
    f64::INFINITY,
];

/// Converts an accuracy (m), as published in RINEX, to its URA index
pub fn accuracy_to_ura(accuracy: f64) -> i16 {
    URA_BOUNDS
        .iter()
        .position(|bound| accuracy <= *bound)
        .unwrap_or(URA_BOUNDS.len() - 1) as i16
}

/// Returns the nominal accuracy (m) of a URA index
pub fn ura_to_accuracy(ura: i16) -> f64 {
    match ura {
        i if i < 0 => URA_BOUNDS[0],
        i => URA_BOUNDS[(i as usize).min(URA_BOUNDS.len() - 1)],
    }
}
