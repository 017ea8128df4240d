//! GPS LNAV ephemeris (subframes 1 to 3)
#[cfg(feature = "log")]
use log::error;

use crate::{
    constants::Constants,
    navigation::{
        subframe::{Subframe, WORDS_PER_SUBFRAME},
        NavMessageType,
    },
    orbit::{ClockModel, Kepler, KeplerOrbit, Perturbations},
    prelude::{DecodingError, Epoch, Error, SatelliteId, TimeSystem},
};

/// Resolves the 10 bit week number `wn` to the full week nearest to `hint`
pub fn resolve_week(wn: u32, hint: i32) -> i32 {
    let wn = (wn & 0x3FF) as i32;
    let rollovers = ((hint - wn) as f64 / 1024.0).round() as i32;
    wn + 1024 * rollovers
}

/// Builds the [Epoch] of `sow`, nearest to `reference` (s of `week`)
fn nearest_epoch(week: i32, sow: f64, reference: f64) -> Epoch {
    let dt = sow - reference;
    let week = if dt < -(Constants::HALF_WEEK as f64) {
        week + 1
    } else if dt > Constants::HALF_WEEK as f64 {
        week - 1
    } else {
        week
    };
    Epoch::from_week_sow(week, sow, TimeSystem::GPS)
}

fn expect_id(sf: &Subframe, id: u8) -> Result<(), Error> {
    if sf.id() == id {
        Ok(())
    } else {
        #[cfg(feature = "log")]
        error!("expecting subframe #{}, got #{}", id, sf.id());
        Err(DecodingError::SubframeId(sf.id()).into())
    }
}

/// Decodes the transmitted words of subframes 1, 2 and 3 of `prn`
/// into a [KeplerOrbit] with its clock model. `week_hint` is any full
/// GPS week within 512 weeks of the transmission, used to resolve
/// the broadcast 10 bit week number.
pub fn decode_ephemeris(
    subframes: [&[u32; WORDS_PER_SUBFRAME]; 3],
    prn: u8,
    week_hint: i32,
) -> Result<KeplerOrbit, Error> {
    let sf1 = Subframe::new(subframes[0])?;
    let sf2 = Subframe::new(subframes[1])?;
    let sf3 = Subframe::new(subframes[2])?;
    expect_id(&sf1, 1)?;
    expect_id(&sf2, 2)?;
    expect_id(&sf3, 3)?;

    let iodc = (sf1.field(3, 23, 2) << 8) | sf1.field(8, 1, 8);
    let iode2 = sf2.field(3, 1, 8);
    let iode3 = sf3.field(10, 1, 8);
    if iode2 != iode3 || iode2 != iodc & 0xFF {
        #[cfg(feature = "log")]
        error!("G{:02}: iodc={} iode={}/{}", prn, iodc, iode2, iode3);
        return Err(DecodingError::IssueOfData.into());
    }

    let sv = SatelliteId::gps(prn);
    let week = resolve_week(sf1.field(3, 1, 10), week_hint);
    let xmit_sow = sf1.transmit_sow() as f64;
    let transmit_time = Epoch::from_week_sow(week, xmit_sow, TimeSystem::GPS);

    let toc = nearest_epoch(week, sf1.field(8, 9, 16) as f64 * 16.0, xmit_sow);
    let clock = ClockModel {
        toc,
        tgd: sf1.signed_field(7, 17, 8) as f64 * 2.0_f64.powi(-31),
        af2: sf1.signed_field(9, 1, 8) as f64 * 2.0_f64.powi(-55),
        af1: sf1.signed_field(9, 9, 16) as f64 * 2.0_f64.powi(-43),
        af0: sf1.signed_field(10, 1, 22) as f64 * 2.0_f64.powi(-31),
    };

    let kepler = Kepler {
        m_0: Constants::semicircles(sf2.split_field(4, 8) as i32 as f64 * 2.0_f64.powi(-31)),
        e: sf2.split_field(6, 8) as f64 * 2.0_f64.powi(-33),
        sqrt_a: sf2.split_field(8, 8) as f64 * 2.0_f64.powi(-19),
        omega_0: Constants::semicircles(sf3.split_field(3, 8) as i32 as f64 * 2.0_f64.powi(-31)),
        i_0: Constants::semicircles(sf3.split_field(5, 8) as i32 as f64 * 2.0_f64.powi(-31)),
        omega: Constants::semicircles(sf3.split_field(7, 8) as i32 as f64 * 2.0_f64.powi(-31)),
        ..Default::default()
    };

    let perturbations = Perturbations {
        crs: sf2.signed_field(3, 9, 16) as f64 * 2.0_f64.powi(-5),
        dn: Constants::semicircles(sf2.signed_field(4, 1, 16) as f64 * 2.0_f64.powi(-43)),
        cuc: sf2.signed_field(6, 1, 16) as f64 * 2.0_f64.powi(-29),
        cus: sf2.signed_field(8, 1, 16) as f64 * 2.0_f64.powi(-29),
        cic: sf3.signed_field(3, 1, 16) as f64 * 2.0_f64.powi(-29),
        cis: sf3.signed_field(5, 1, 16) as f64 * 2.0_f64.powi(-29),
        crc: sf3.signed_field(7, 1, 16) as f64 * 2.0_f64.powi(-5),
        omega_dot: Constants::semicircles(sf3.signed_field(9, 1, 24) as f64 * 2.0_f64.powi(-43)),
        i_dot: Constants::semicircles(sf3.signed_field(10, 9, 14) as f64 * 2.0_f64.powi(-43)),
        ..Default::default()
    };

    let toe = nearest_epoch(week, sf2.field(10, 1, 16) as f64 * 16.0, xmit_sow);
    // fit interval flag: 4 hour curve fit, or longer
    let half_fit = if sf2.field(10, 17, 1) == 0 {
        7200.0
    } else {
        10800.0
    };

    Ok(KeplerOrbit::new(
        sv,
        NavMessageType::LNAV,
        toe,
        toe.add_seconds(-half_fit),
        toe.add_seconds(half_fit),
        kepler,
        perturbations,
    )
    .with_transmit_time(transmit_time)
    .with_ura(sf1.field(3, 13, 4) as i16)
    .with_health(sf1.field(3, 17, 6) == 0)
    .with_clock(clock))
}
