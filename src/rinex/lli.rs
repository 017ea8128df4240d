//! Loss of Lock Indicator (LLI), attached to phase observations
use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Default, Copy, Clone)]
    #[derive(PartialEq, Eq, PartialOrd)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct LliFlags: u8 {
        /// Lock lost since previous observation, cycle slip is possible
        const LOCK_LOSS = 0x01;
        /// Half cycle ambiguity
        const HALF_CYCLE_SLIP = 0x02;
        /// Observed under anti spoofing (RINEX2) / BOC tracking of a MBOC signal
        const UNDER_ANTI_SPOOFING = 0x04;
    }
}

impl LliFlags {
    /// Parses the single digit LLI field, blank meaning unknown
    pub(crate) fn from_field(field: &str) -> Option<Self> {
        let value = field.trim().parse::<u8>().ok()?;
        Self::from_bits(value)
    }
}
