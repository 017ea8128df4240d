#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::type_complexity)]

extern crate gnss_rs as gnss;

pub mod ellipsoid;
pub mod epoch;
pub mod navigation;
pub mod orbit;
pub mod reader;
pub mod rinex;
pub mod sem;
pub mod sp3;
pub mod store;
pub mod stream;
pub mod sv;
pub mod triple;
pub mod xvt;
pub mod yuma;

mod constants;
mod error;

#[cfg(test)]
mod tests;

pub use error::{DecodingError, Error, ParsingError};

/// Package dedicated to file production (none yet) and high level use.
pub mod prelude {
    pub use crate::{
        ellipsoid::{Ellipsoid, EllipsoidModel},
        epoch::{Epoch, TimeSystem},
        error::{DecodingError, Error, ParsingError},
        navigation::NavMessageType,
        orbit::{
            AlmanacOrbit, ClockModel, GlonassEphemeris, Kepler, KeplerOrbit, OrbitModel,
            OrbitRecord, Perturbations,
        },
        reader::BufferedReader,
        store::{
            AlmanacStore, BroadcastStore, GlonassConfig, GlonassStore, OrbitStore, Sp3Config,
            Sp3Store, XvtStore,
        },
        stream::{Format, RecordStream},
        sv::SatelliteId,
        triple::Triple,
        xvt::{Confidence, Health, Xvt},
    };

    // pub re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Epoch as HifiEpoch, TimeScale};
}
