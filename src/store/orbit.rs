#[cfg(feature = "log")]
use log::{debug, error};

use std::{cmp::Ordering, collections::BTreeMap};

use crate::{
    navigation::{decode_almanac, subframe::WORDS_PER_SUBFRAME},
    orbit::{AlmanacOrbit, KeplerOrbit, OrbitRecord},
    prelude::{Epoch, Error, SatelliteId, Xvt},
    store::XvtStore,
};

#[derive(Debug, Clone)]
struct Entry<R> {
    /// Insertion rank
    rank: u64,
    record: R,
}

#[derive(Debug, Clone)]
struct Timeline<R> {
    /// Sorted by start of validity
    entries: Vec<Entry<R>>,
    /// Widest validity window (s)
    max_span: f64,
}

impl<R> Default for Timeline<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            max_span: 0.0,
        }
    }
}

/// [OrbitStore] indexes records with a validity window, per satellite.
///
/// When several records are valid at the query time, the one
/// with the latest transmit time wins; among identical transmit
/// times, the one inserted last wins. Adding a record with the
/// same reference epoch and transmit time as a stored one
/// replaces the latter.
#[derive(Debug, Clone)]
pub struct OrbitStore<R: OrbitRecord> {
    timelines: BTreeMap<SatelliteId, Timeline<R>>,
    rank: u64,
}

/// Broadcast ephemeris store
pub type BroadcastStore = OrbitStore<KeplerOrbit>;

/// Almanac store
pub type AlmanacStore = OrbitStore<AlmanacOrbit>;

impl<R: OrbitRecord> Default for OrbitStore<R> {
    fn default() -> Self {
        Self {
            timelines: BTreeMap::new(),
            rank: 0,
        }
    }
}

impl<R: OrbitRecord> OrbitStore<R> {
    pub fn new() -> Self {
        Self::default()
    }
    /// Inserts a new record
    pub fn add(&mut self, record: R) {
        let sv = record.sv();
        let rank = self.rank;
        self.rank += 1;

        let timeline = self.timelines.entry(sv).or_default();
        let span = record.end_valid().seconds_since(&record.begin_valid());
        timeline.max_span = timeline.max_span.max(span);

        let toe = record.reference_epoch();
        let transmit = record.transmit_time();
        if let Some(entry) = timeline.entries.iter_mut().find(|e| {
            e.record.reference_epoch().cmp_instant(&toe) == Ordering::Equal
                && e.record.transmit_time().cmp_instant(&transmit) == Ordering::Equal
        }) {
            #[cfg(feature = "log")]
            debug!("{}: replacing record (toe={})", sv, toe);
            if entry.record.begin_valid().cmp_instant(&record.begin_valid()) == Ordering::Equal {
                *entry = Entry { rank, record };
                return;
            }
        }
        // replaced record with a different start of validity: remove and re-insert
        timeline.entries.retain(|e| {
            e.record.reference_epoch().cmp_instant(&toe) != Ordering::Equal
                || e.record.transmit_time().cmp_instant(&transmit) != Ordering::Equal
        });
        let begin = record.begin_valid();
        let index = timeline
            .entries
            .partition_point(|e| e.record.begin_valid().cmp_instant(&begin) != Ordering::Greater);
        timeline.entries.insert(index, Entry { rank, record });
    }
    /// Total number of records
    pub fn len(&self) -> usize {
        self.timelines.values().map(|t| t.entries.len()).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }
    /// Records of `sv`, sorted by start of validity
    pub fn records(&self, sv: SatelliteId) -> impl Iterator<Item = &R> + '_ {
        self.timelines
            .get(&sv)
            .into_iter()
            .flat_map(|t| t.entries.iter().map(|e| &e.record))
    }
    /// Removes all records of `sv`
    pub fn remove(&mut self, sv: SatelliteId) {
        self.timelines.remove(&sv);
    }
    /// Selects the record of `sv` to be used at `t`
    pub fn find(&self, sv: SatelliteId, t: Epoch) -> Result<&R, Error> {
        let no_valid = || Error::NoValidEphemeris { sv, epoch: t };
        let timeline = self.timelines.get(&sv).ok_or_else(no_valid)?;
        let first = timeline.entries.first().ok_or_else(no_valid)?;
        first.record.begin_valid().try_cmp(&t)?;

        let index = timeline
            .entries
            .partition_point(|e| e.record.begin_valid().cmp_instant(&t) != Ordering::Greater);

        let mut selected: Option<&Entry<R>> = None;
        for entry in timeline.entries[..index].iter().rev() {
            if t.seconds_since(&entry.record.begin_valid()) > timeline.max_span {
                // no older record may contain t
                break;
            }
            if entry.record.end_valid().cmp_instant(&t) == Ordering::Less {
                continue;
            }
            selected = match selected {
                None => Some(entry),
                Some(current) => {
                    let ordering = entry
                        .record
                        .transmit_time()
                        .cmp_instant(&current.record.transmit_time())
                        .then(entry.rank.cmp(&current.rank));
                    if ordering == Ordering::Greater {
                        Some(entry)
                    } else {
                        Some(current)
                    }
                },
            };
        }
        match selected {
            Some(entry) => Ok(&entry.record),
            None => {
                #[cfg(feature = "log")]
                error!("{}: no valid record at {}", sv, t);
                Err(no_valid())
            },
        }
    }
}

impl OrbitStore<AlmanacOrbit> {
    /// Decodes the almanac page of `page_sv` and stores it.
    /// `week` is the full week of transmission.
    pub fn add_subframe(
        &mut self,
        words: &[u32; WORDS_PER_SUBFRAME],
        page_sv: u8,
        week: i32,
    ) -> Result<(), Error> {
        let almanac = decode_almanac(words, page_sv, week)?;
        self.add(almanac);
        Ok(())
    }
}

impl<R: OrbitRecord> XvtStore for OrbitStore<R> {
    fn xvt(&self, sv: SatelliteId, t: Epoch) -> Result<Xvt, Error> {
        self.find(sv, t)?.xvt(t)
    }
    fn satellites(&self) -> Vec<SatelliteId> {
        self.timelines
            .iter()
            .filter(|(_, t)| !t.entries.is_empty())
            .map(|(sv, _)| *sv)
            .collect()
    }
    fn initial_time(&self) -> Option<Epoch> {
        self.timelines
            .values()
            .filter_map(|t| t.entries.first())
            .map(|e| e.record.begin_valid())
            .min_by(|a, b| a.cmp_instant(b))
    }
    fn final_time(&self) -> Option<Epoch> {
        self.timelines
            .values()
            .flat_map(|t| t.entries.iter())
            .map(|e| e.record.end_valid())
            .max_by(|a, b| a.cmp_instant(b))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        navigation::NavMessageType,
        orbit::{Kepler, Perturbations},
        prelude::TimeSystem,
    };

    fn orbit(sv: SatelliteId, toe: Epoch, transmit: Epoch, m_0: f64) -> KeplerOrbit {
        let kepler = Kepler {
            sqrt_a: 5153.6,
            e: 0.01,
            i_0: 0.96,
            m_0,
            ..Default::default()
        };
        KeplerOrbit::new(
            sv,
            NavMessageType::LNAV,
            toe,
            toe.add_seconds(-7200.0),
            toe.add_seconds(7200.0),
            kepler,
            Perturbations::default(),
        )
        .with_transmit_time(transmit)
    }

    #[test]
    fn selection() {
        let g01 = SatelliteId::gps(1);
        let t0 = Epoch::from_week_sow(1274, 345_600.0, TimeSystem::GPS);
        let mut store = BroadcastStore::new();
        store.add(orbit(g01, t0, t0.add_seconds(-7200.0), 0.0));
        store.add(orbit(g01, t0.add_seconds(7200.0), t0.add_seconds(-3600.0), 0.1));
        store.add(orbit(g01, t0.add_seconds(-7200.0), t0.add_seconds(-9000.0), 0.2));
        assert_eq!(store.len(), 3);
        assert_eq!(store.satellites(), vec![g01]);

        // overlapping windows: latest transmission wins
        let found = store.find(g01, t0.add_seconds(1800.0)).unwrap();
        assert_eq!(found.m0(), 0.1);
        let found = store.find(g01, t0.add_seconds(-7200.0)).unwrap();
        assert_eq!(found.m0(), 0.0);
        let found = store.find(g01, t0.add_seconds(-10_000.0)).unwrap();
        assert_eq!(found.m0(), 0.2);

        assert_eq!(store.initial_time(), Some(t0.add_seconds(-14_400.0)));
        assert_eq!(store.final_time(), Some(t0.add_seconds(14_400.0)));

        assert!(matches!(
            store.find(g01, t0.add_seconds(14_401.0)),
            Err(Error::NoValidEphemeris { .. })
        ));
        assert!(matches!(
            store.xvt(SatelliteId::gps(2), t0),
            Err(Error::NoValidEphemeris { .. })
        ));
        assert!(matches!(
            store.xvt(g01, t0.with_time_system(TimeSystem::GAL)),
            Err(Error::TimeSystemMismatch(..))
        ));
        assert!(store.position(g01, t0).is_ok());
    }

    #[test]
    fn duplicates() {
        let g01 = SatelliteId::gps(1);
        let t0 = Epoch::from_week_sow(1274, 345_600.0, TimeSystem::GPS);
        let mut store = BroadcastStore::new();
        store.add(orbit(g01, t0, t0, 0.0));
        store.add(orbit(g01, t0, t0, 0.5));
        assert_eq!(store.len(), 1);
        assert_eq!(store.find(g01, t0).unwrap().m0(), 0.5);

        // same transmission, different toe: inserted last wins
        store.add(orbit(g01, t0.add_seconds(16.0), t0, 0.7));
        assert_eq!(store.len(), 2);
        assert_eq!(store.find(g01, t0.add_seconds(100.0)).unwrap().m0(), 0.7);
        store.remove(g01);
        assert!(store.is_empty());
    }
}
