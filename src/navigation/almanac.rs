//! GPS almanac pages (subframes 4 and 5)
#[cfg(feature = "log")]
use log::error;

use crate::{
    constants::Constants,
    navigation::subframe::{sign_extend, Subframe, WORDS_PER_SUBFRAME},
    prelude::{DecodingError, Error, SatelliteId},
    orbit::AlmanacOrbit,
};

/// GPS almanac data ID
const GPS_DATA_ID: u32 = 0x01;

/// Decodes the almanac page of `page_sv` from the 10 transmitted words
/// of a subframe 4 or 5. `week` is the full GPS week of transmission.
pub fn decode_almanac(
    words: &[u32; WORDS_PER_SUBFRAME],
    page_sv: u8,
    week: i32,
) -> Result<AlmanacOrbit, Error> {
    let sf = Subframe::new(words)?;

    let id = sf.id();
    if id != 4 && id != 5 {
        #[cfg(feature = "log")]
        error!("subframe #{} does not carry almanac data", id);
        return Err(DecodingError::SubframeId(id).into());
    }

    let data_id = sf.field(3, 1, 2);
    if data_id != GPS_DATA_ID {
        return Err(DecodingError::DataId(data_id as u8).into());
    }

    let sv_id = sf.field(3, 3, 6) as u8;
    if sv_id != page_sv {
        return Err(DecodingError::PageMismatch {
            expected: page_sv,
            found: sv_id,
        }
        .into());
    }

    let af0 = sign_extend((sf.field(10, 1, 8) << 3) | sf.field(10, 20, 3), 11);
    let toa = sf.field(4, 1, 8) as i64 * 4096;
    let xmit_time = sf.transmit_sow();

    Ok(AlmanacOrbit {
        sv: SatelliteId::gps(sv_id),
        ecc: sf.field(3, 9, 16) as f64 * 2.0_f64.powi(-21),
        toa,
        i_offset: Constants::semicircles(sf.signed_field(4, 9, 16) as f64 * 2.0_f64.powi(-19)),
        omega_dot: Constants::semicircles(sf.signed_field(5, 1, 16) as f64 * 2.0_f64.powi(-38)),
        health: sf.field(5, 17, 8) as u8,
        a_half: sf.field(6, 1, 24) as f64 * 2.0_f64.powi(-11),
        omega_0: Constants::semicircles(sf.signed_field(7, 1, 24) as f64 * 2.0_f64.powi(-23)),
        w: Constants::semicircles(sf.signed_field(8, 1, 24) as f64 * 2.0_f64.powi(-23)),
        m_0: Constants::semicircles(sf.signed_field(9, 1, 24) as f64 * 2.0_f64.powi(-23)),
        af0: af0 as f64 * 2.0_f64.powi(-20),
        af1: sf.signed_field(10, 9, 11) as f64 * 2.0_f64.powi(-38),
        xmit_time,
        week: AlmanacOrbit::applicability_week(week, toa, xmit_time),
    })
}

/// Raw almanac page content, as transmitted
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawPage {
    pub sv: u32,
    pub ecc: u32,
    pub toa: u32,
    pub i_offset: i32,
    pub omega_dot: i32,
    pub health: u32,
    pub a_half: u32,
    pub omega_0: i32,
    pub w: i32,
    pub m_0: i32,
    pub af0: i32,
    pub af1: i32,
}

#[cfg(test)]
impl RawPage {
    /// PRN 4 page, close to the 2004-06-10 constellation
    pub fn prn4() -> Self {
        Self {
            sv: 4,
            ecc: 9_944,
            toa: 99,
            i_offset: 10_904,
            omega_dot: -680,
            health: 0,
            a_half: 10_558_663,
            omega_0: -6_665_413,
            w: 1_958_387,
            m_0: -5_025_020,
            af0: 470,
            af1: 3,
        }
    }
    /// Builds the transmitted words of subframe `id`
    pub fn encode(&self, tow_count: u32, id: u8) -> [u32; WORDS_PER_SUBFRAME] {
        use crate::navigation::subframe::{blank_subframe, encode_words, set_field};
        let mut data = blank_subframe(tow_count, id);
        set_field(&mut data, 3, 1, 2, GPS_DATA_ID);
        set_field(&mut data, 3, 3, 6, self.sv);
        set_field(&mut data, 3, 9, 16, self.ecc);
        set_field(&mut data, 4, 1, 8, self.toa);
        set_field(&mut data, 4, 9, 16, self.i_offset as u32);
        set_field(&mut data, 5, 1, 16, self.omega_dot as u32);
        set_field(&mut data, 5, 17, 8, self.health);
        set_field(&mut data, 6, 1, 24, self.a_half);
        set_field(&mut data, 7, 1, 24, self.omega_0 as u32);
        set_field(&mut data, 8, 1, 24, self.w as u32);
        set_field(&mut data, 9, 1, 24, self.m_0 as u32);
        set_field(&mut data, 10, 1, 8, (self.af0 as u32 >> 3) & 0xFF);
        set_field(&mut data, 10, 9, 11, self.af1 as u32);
        set_field(&mut data, 10, 20, 3, self.af0 as u32 & 0x07);
        encode_words(&data)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn page_decoding() {
        let raw = RawPage {
            af0: -470,
            af1: -3,
            ..RawPage::prn4()
        };
        let words = raw.encode(67_584, 5);
        let alm = decode_almanac(&words, 4, 1274).unwrap();
        assert_eq!(alm.sv, SatelliteId::gps(4));
        assert_eq!(alm.ecc, 9_944.0 * 2.0_f64.powi(-21));
        assert_eq!(alm.toa, 405_504);
        assert_eq!(alm.health, 0);
        assert_eq!(alm.a_half, 10_558_663.0 * 2.0_f64.powi(-11));
        assert_eq!(
            alm.i_offset,
            10_904.0 * 2.0_f64.powi(-19) * Constants::GPS_PI
        );
        assert_eq!(
            alm.omega_0,
            -6_665_413.0 * 2.0_f64.powi(-23) * Constants::GPS_PI
        );
        assert_eq!(alm.af0, -470.0 * 2.0_f64.powi(-20));
        assert_eq!(alm.af1, -3.0 * 2.0_f64.powi(-38));
        assert_eq!(alm.xmit_time, 67_584 * 6 - 6);
        assert_eq!(alm.week, 1274);
        assert_eq!(alm.full_week(), 1274);
    }

    #[test]
    fn page_errors() {
        let raw = RawPage::prn4();
        let words = raw.encode(67_584, 4);
        assert!(matches!(
            decode_almanac(&words, 5, 1274),
            Err(Error::Decode(DecodingError::PageMismatch {
                expected: 5,
                found: 4
            }))
        ));
        assert!(matches!(
            decode_almanac(&raw.encode(67_584, 3), 4, 1274),
            Err(Error::Decode(DecodingError::SubframeId(3)))
        ));
        let mut words = words;
        words[5] ^= 1 << 12;
        assert!(matches!(
            decode_almanac(&words, 4, 1274),
            Err(Error::Decode(DecodingError::Parity { word: 6 }))
        ));
    }
}
