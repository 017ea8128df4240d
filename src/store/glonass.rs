#[cfg(feature = "log")]
use log::error;

use std::{cmp::Ordering, collections::BTreeMap};

use crate::{
    orbit::{GlonassEphemeris, OrbitRecord},
    prelude::{Epoch, Error, SatelliteId, Xvt},
    store::{GlonassConfig, XvtStore},
};

/// [GlonassStore] holds GLONASS frames, sorted by reference epoch,
/// per satellite. Queries integrate the frame whose reference epoch
/// is the nearest, the later one on equal distance.
#[derive(Debug, Clone, Default)]
pub struct GlonassStore {
    config: GlonassConfig,
    frames: BTreeMap<SatelliteId, Vec<GlonassEphemeris>>,
}

impl GlonassStore {
    pub fn new(config: GlonassConfig) -> Self {
        Self {
            config,
            frames: BTreeMap::new(),
        }
    }
    pub fn config(&self) -> &GlonassConfig {
        &self.config
    }
    /// Inserts a new frame. A frame with the same reference
    /// epoch is replaced.
    pub fn add(&mut self, frame: GlonassEphemeris) {
        let frames = self.frames.entry(frame.sv()).or_default();
        let index = frames.partition_point(|f| f.epoch.cmp_instant(&frame.epoch) == Ordering::Less);
        match frames.get_mut(index) {
            Some(existing) if existing.epoch.cmp_instant(&frame.epoch) == Ordering::Equal => {
                *existing = frame;
            },
            _ => frames.insert(index, frame),
        }
    }
    /// Total number of frames
    pub fn len(&self) -> usize {
        self.frames.values().map(|f| f.len()).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
    /// Frames of `sv`, sorted by reference epoch
    pub fn frames(&self, sv: SatelliteId) -> impl Iterator<Item = &GlonassEphemeris> + '_ {
        self.frames.get(&sv).into_iter().flat_map(|f| f.iter())
    }
    /// Selects the frame of `sv` to be integrated up to `t`
    pub fn find(&self, sv: SatelliteId, t: Epoch) -> Result<&GlonassEphemeris, Error> {
        let no_valid = || Error::NoValidEphemeris { sv, epoch: t };
        let frames = self.frames.get(&sv).ok_or_else(no_valid)?;
        let first = frames.first().ok_or_else(no_valid)?;
        first.epoch.try_cmp(&t)?;

        let index = frames.partition_point(|f| f.epoch.cmp_instant(&t) == Ordering::Less);
        let before = index.checked_sub(1).and_then(|i| frames.get(i));
        let after = frames.get(index);
        let nearest = match (before, after) {
            (Some(before), Some(after)) => {
                if t.seconds_since(&before.epoch) < after.epoch.seconds_since(&t) {
                    before
                } else {
                    after
                }
            },
            (Some(frame), None) | (None, Some(frame)) => frame,
            (None, None) => return Err(no_valid()),
        };
        if t.seconds_since(&nearest.epoch).abs() > self.config.max_extrapolation_s {
            #[cfg(feature = "log")]
            error!("{}: nearest frame {} too far from {}", sv, nearest.epoch, t);
            return Err(no_valid());
        }
        Ok(nearest)
    }
}

impl XvtStore for GlonassStore {
    fn xvt(&self, sv: SatelliteId, t: Epoch) -> Result<Xvt, Error> {
        self.find(sv, t)?.state_at(t, self.config.step_s)
    }
    fn satellites(&self) -> Vec<SatelliteId> {
        self.frames.keys().copied().collect()
    }
    fn initial_time(&self) -> Option<Epoch> {
        self.frames
            .values()
            .filter_map(|f| f.first())
            .map(|f| f.epoch.add_seconds(-self.config.max_extrapolation_s))
            .min_by(|a, b| a.cmp_instant(b))
    }
    fn final_time(&self) -> Option<Epoch> {
        self.frames
            .values()
            .filter_map(|f| f.last())
            .map(|f| f.epoch.add_seconds(self.config.max_extrapolation_s))
            .max_by(|a, b| a.cmp_instant(b))
    }
}
