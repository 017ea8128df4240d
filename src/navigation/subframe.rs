//! GPS LNAV subframe framing and bit field extraction
use crate::{navigation::parity, DecodingError};

/// TLM preamble
pub const PREAMBLE: u32 = 0x8B;

/// Words per subframe
pub const WORDS_PER_SUBFRAME: usize = 10;

/// [Subframe] holds the 24 data bits of each of the 10 words
/// of a parity checked subframe.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Subframe {
    data: [u32; WORDS_PER_SUBFRAME],
}

/// Sign extends the `len` bit two's complement `value`
pub(crate) fn sign_extend(value: u32, len: u32) -> i32 {
    let shift = 32 - len;
    ((value << shift) as i32) >> shift
}

impl Subframe {
    /// Checks the parity of the 10 transmitted words, then the preamble.
    /// Bit 30 and 29 of the word preceding the subframe are not
    /// available and taken as null: words must be transmitted accordingly.
    pub fn new(words: &[u32; WORDS_PER_SUBFRAME]) -> Result<Self, DecodingError> {
        let mut data = [0; WORDS_PER_SUBFRAME];
        let mut prev = 0;
        for (i, word) in words.iter().enumerate() {
            data[i] = parity::check(*word, prev).ok_or(DecodingError::Parity { word: i + 1 })?;
            prev = *word;
        }
        let sf = Self { data };
        if sf.field(1, 1, 8) != PREAMBLE {
            return Err(DecodingError::Preamble);
        }
        Ok(sf)
    }
    /// Extracts `len` bits starting at 1-based bit `first` of 1-based `word`.
    /// Bit 1 is the MSB of the 24 data bits.
    pub fn field(&self, word: usize, first: u32, len: u32) -> u32 {
        let shift = 25 - first - len;
        (self.data[word - 1] >> shift) & ((1 << len) - 1)
    }
    /// Same as [Self::field], interpreted as two's complement
    pub fn signed_field(&self, word: usize, first: u32, len: u32) -> i32 {
        sign_extend(self.field(word, first, len), len)
    }
    /// Concatenates the last `msb_len` bits of `word` with the 24 bits of `word + 1`
    pub fn split_field(&self, word: usize, msb_len: u32) -> u32 {
        (self.field(word, 25 - msb_len, msb_len) << 24) | self.field(word + 1, 1, 24)
    }
    /// Truncated time of week count (HOW), in 6 second units
    pub fn tow_count(&self) -> u32 {
        self.field(2, 1, 17)
    }
    /// Time of week of the start of this subframe (s)
    pub fn transmit_sow(&self) -> i64 {
        let start = self.tow_count() as i64 * 6 - 6;
        if start < 0 {
            start + 604_800
        } else {
            start
        }
    }
    /// Subframe ID (1 to 5)
    pub fn id(&self) -> u8 {
        self.field(2, 20, 3) as u8
    }
    /// 24 data bits of 1-based `word`
    pub fn data(&self, word: usize) -> u32 {
        self.data[word - 1]
    }
}

/// Builds transmitted words from 24 bit data words, with valid parity.
/// Mostly used to synthesize subframes.
pub fn encode_words(data: &[u32; WORDS_PER_SUBFRAME]) -> [u32; WORDS_PER_SUBFRAME] {
    let mut words = [0; WORDS_PER_SUBFRAME];
    let mut prev = 0;
    for (i, d) in data.iter().enumerate() {
        words[i] = parity::encode(*d, prev);
        prev = words[i];
    }
    words
}

/// Writes `len` bits of `value` at 1-based bit `first` of 1-based `word`
#[cfg(test)]
pub(crate) fn set_field(data: &mut [u32; WORDS_PER_SUBFRAME], word: usize, first: u32, len: u32, value: u32) {
    let shift = 25 - first - len;
    let mask = ((1_u32 << len) - 1) << shift;
    data[word - 1] = (data[word - 1] & !mask) | ((value << shift) & mask);
}

/// Data words of a subframe with valid TLM and HOW
#[cfg(test)]
pub(crate) fn blank_subframe(tow_count: u32, id: u8) -> [u32; WORDS_PER_SUBFRAME] {
    let mut data = [0; WORDS_PER_SUBFRAME];
    set_field(&mut data, 1, 1, 8, PREAMBLE);
    set_field(&mut data, 2, 1, 17, tow_count);
    set_field(&mut data, 2, 20, 3, id as u32);
    data
}
