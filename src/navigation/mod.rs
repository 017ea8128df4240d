//! Broadcast navigation messages
mod message;

pub mod almanac;
pub mod ephemeris;
pub mod parity;
pub mod subframe;
pub mod ura;

pub use almanac::decode_almanac;
pub use ephemeris::decode_ephemeris;
pub use message::NavMessageType;
pub use subframe::Subframe;
