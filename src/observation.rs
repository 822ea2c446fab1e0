//! Observation records and the in-memory dataset they load into.
//!
//! A [`Dataset`] is replaced wholesale on every load; it carries a version
//! counter so derived caches key on (version, year, sector) and never serve
//! results computed from a replaced dataset. Loads go through a ticket so
//! that when a newer load begins before an older one commits, the stale
//! commit is rejected (last-request-wins).

use std::collections::HashMap;

use log::{debug, warn};
use serde::Serialize;

use crate::{flag::ObservationFlag, sector::Sector};

/// One (entity, year, sector, value) fact. `value` is `None` when the
/// source explicitly reports "no data" for the cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub entity_code: String,
    pub year: i32,
    pub sector: Sector,
    pub value: Option<f64>,
    pub flag: Option<ObservationFlag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Debug, Default)]
pub struct Dataset {
    observations: Vec<Observation>,
    index: HashMap<(String, i32, Sector), usize>,
    version: u64,
    pending_generation: u64,
    duplicate_triples: usize,
    dropped_values: usize,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Starts a load. Any ticket issued earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.pending_generation += 1;
        LoadTicket { generation: self.pending_generation }
    }

    /// Installs a loaded batch. Returns false (and leaves the dataset
    /// untouched) when a newer load has begun since the ticket was issued.
    pub fn commit(&mut self, ticket: LoadTicket, batch: Vec<Observation>, dropped_values: usize) -> bool {
        if ticket.generation != self.pending_generation {
            debug!(
                "discarding stale load (ticket {} < current {})",
                ticket.generation, self.pending_generation
            );
            return false;
        }
        self.observations.clear();
        self.index.clear();
        self.duplicate_triples = 0;
        self.dropped_values = dropped_values;
        for observation in batch {
            self.insert(observation);
        }
        self.version += 1;
        true
    }

    /// Last write wins on a duplicate (entity, year, sector) triple; the
    /// collision is logged as a data-quality concern, not an error.
    fn insert(&mut self, observation: Observation) {
        let key = (
            observation.entity_code.clone(),
            observation.year,
            observation.sector,
        );
        if let Some(&existing) = self.index.get(&key) {
            warn!(
                "duplicate observation for ({}, {}, {}); keeping the later row",
                key.0, key.1, key.2
            );
            self.duplicate_triples += 1;
            self.observations[existing] = observation;
        } else {
            self.index.insert(key, self.observations.len());
            self.observations.push(observation);
        }
    }

    /// All observations matching the year exactly and the given sector.
    /// An empty result is a valid "no data" state, never an error.
    pub fn filter(&self, year: i32, sector: Sector) -> Vec<&Observation> {
        self.observations
            .iter()
            .filter(|obs| obs.year == year && obs.sector == sector)
            .collect()
    }

    /// The single observation for (code, year, sector), if present.
    pub fn lookup(&self, code: &str, year: i32, sector: Sector) -> Option<&Observation> {
        self.index
            .get(&(code.to_string(), year, sector))
            .map(|&idx| &self.observations[idx])
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn duplicate_triples(&self) -> usize {
        self.duplicate_triples
    }

    pub fn dropped_values(&self) -> usize {
        self.dropped_values
    }

    /// Distinct entity codes, in first-seen order.
    pub fn entity_codes(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.observations
            .iter()
            .filter(|obs| seen.insert(obs.entity_code.as_str()))
            .map(|obs| obs.entity_code.as_str())
            .collect()
    }

    /// Distinct years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.observations.iter().map(|obs| obs.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(code: &str, year: i32, sector: Sector, value: f64) -> Observation {
        Observation {
            entity_code: code.to_string(),
            year,
            sector,
            value: Some(value),
            flag: None,
        }
    }

    #[test]
    fn duplicate_triple_keeps_last_value() {
        let mut dataset = Dataset::new();
        let ticket = dataset.begin_load();
        dataset.commit(
            ticket,
            vec![
                obs("ES", 2023, Sector::Total, 10.0),
                obs("ES", 2023, Sector::Total, 12.0),
            ],
            0,
        );
        assert_eq!(dataset.duplicate_triples(), 1);
        let kept = dataset.lookup("ES", 2023, Sector::Total).expect("kept row");
        assert_eq!(kept.value, Some(12.0));
        assert_eq!(dataset.observations().len(), 1);
    }

    #[test]
    fn stale_ticket_is_rejected() {
        let mut dataset = Dataset::new();
        let older = dataset.begin_load();
        let newer = dataset.begin_load();
        assert!(dataset.commit(newer, vec![obs("DE", 2023, Sector::Total, 5.0)], 0));
        let version = dataset.version();
        assert!(!dataset.commit(older, vec![obs("FR", 2023, Sector::Total, 7.0)], 0));
        assert_eq!(dataset.version(), version);
        assert!(dataset.lookup("DE", 2023, Sector::Total).is_some());
        assert!(dataset.lookup("FR", 2023, Sector::Total).is_none());
    }

    #[test]
    fn filter_on_missing_year_is_empty_not_error() {
        let mut dataset = Dataset::new();
        let ticket = dataset.begin_load();
        dataset.commit(ticket, vec![obs("ES", 2023, Sector::Total, 10.0)], 0);
        assert!(dataset.filter(1990, Sector::Total).is_empty());
        assert!(dataset.filter(2023, Sector::Business).is_empty());
    }
}
