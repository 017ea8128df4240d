//! GPS LNAV (30 bit words) parity algorithm.
//!
//! A transmitted word is made of 24 data bits (d1 being the MSB) followed
//! by 6 parity bits. Every data bit is inverted when the last bit of the
//! previous word (D30*) is set.

/// Data bits participating in each parity bit, d1 being bit 23
const MASKS: [u32; 6] = [0xEC7CD2, 0x763E69, 0xBB1F34, 0x5D8F9A, 0xAEC7CD, 0x2DEA27];

const DATA_MASK: u32 = 0x00FF_FFFF;

fn parity_bits(data: u32, prev: u32) -> u32 {
    let d29 = (prev >> 1) & 0x01;
    let d30 = prev & 0x01;
    // D25, D27, D30 use D29*, the others D30*
    let carried = [d29, d30, d29, d30, d30, d29];
    MASKS
        .iter()
        .zip(carried.iter())
        .fold(0, |acc, (mask, star)| {
            (acc << 1) | (((data & mask).count_ones() & 0x01) ^ star)
        })
}

/// Verifies the parity of a 30 bit `word`, `prev` being the previous
/// word of the subframe (0 for the first word). Returns the 24 data bits,
/// already corrected for D30* inversion, on success.
pub fn check(word: u32, prev: u32) -> Option<u32> {
    let mut data = (word >> 6) & DATA_MASK;
    if prev & 0x01 == 0x01 {
        data ^= DATA_MASK;
    }
    if parity_bits(data, prev) == word & 0x3F {
        Some(data)
    } else {
        None
    }
}

/// Builds the 30 bit word transmitting 24 `data` bits,
/// `prev` being the previously transmitted word.
pub fn encode(data: u32, prev: u32) -> u32 {
    let data = data & DATA_MASK;
    let transmitted = if prev & 0x01 == 0x01 {
        data ^ DATA_MASK
    } else {
        data
    };
    (transmitted << 6) | parity_bits(data, prev)
}
