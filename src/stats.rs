//! Statistical range engine: min/max/median/quartiles over a filtered value
//! set, driving the color scales.
//!
//! Statistics are computed over COUNTRY-kind entities with value > 0 only;
//! supranational aggregates are excluded so bloc totals (or averages) never
//! skew the country-level color distribution. Results are memoized behind
//! [`StatsCache`], keyed by (dataset version, year, sector), so every call
//! site sees the same numbers without recomputing.

use std::collections::HashMap;

use anyhow::Result;
use log::info;
use serde::Serialize;

use crate::{
    cli::StatsArgs,
    color,
    geo::GeoResolver,
    ingest,
    observation::Dataset,
    rank::{self, RankedItem},
    sector::Sector,
    table,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueStatistics {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// `[min, Q1, Q2, Q3, max]` by linear interpolation on sorted values.
    pub quartiles: [f64; 5],
}

impl ValueStatistics {
    /// Returned for an empty value set so downstream color scales never
    /// divide by zero or operate on an empty domain.
    pub fn degenerate() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            median: 0.5,
            quartiles: [0.0, 0.25, 0.5, 0.75, 1.0],
        }
    }

    /// max/min dynamic range; infinite when min is zero (the degenerate
    /// default), which routes any stray positive value to the log scale.
    pub fn range_ratio(&self) -> f64 {
        if self.min > 0.0 {
            self.max / self.min
        } else {
            f64::INFINITY
        }
    }
}

/// Linear-interpolated quantile over a sorted ascending slice, clamped at
/// the array boundary.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let fraction = position - position.floor();
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Statistics over an arbitrary positive value set. The input need not be
/// sorted; non-positive values must already be excluded by the caller.
pub fn compute_statistics(values: &[f64]) -> ValueStatistics {
    if values.is_empty() {
        return ValueStatistics::degenerate();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite observation values"));
    let quartiles = [
        sorted[0],
        quantile(&sorted, 0.25),
        quantile(&sorted, 0.5),
        quantile(&sorted, 0.75),
        sorted[sorted.len() - 1],
    ];
    ValueStatistics {
        min: quartiles[0],
        max: quartiles[4],
        median: quartiles[2],
        quartiles,
    }
}

/// Statistics over a ranked item set, applying the country-only, value > 0
/// exclusions.
pub fn compute_for_items(items: &[RankedItem]) -> ValueStatistics {
    let values: Vec<f64> = items
        .iter()
        .filter(|item| !item.entity.is_aggregate() && item.display_value > 0.0)
        .map(|item| item.display_value)
        .collect();
    compute_statistics(&values)
}

/// Memoized statistics boundary. Keys on the dataset version, so a
/// replaced dataset never serves stale numbers and no explicit
/// invalidation is needed.
#[derive(Default)]
pub struct StatsCache {
    entries: HashMap<(u64, i32, Sector), ValueStatistics>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &mut self,
        dataset: &Dataset,
        resolver: &GeoResolver,
        year: i32,
        sector: Sector,
    ) -> ValueStatistics {
        let key = (dataset.version(), year, sector);
        if let Some(cached) = self.entries.get(&key) {
            return *cached;
        }
        let items = rank::build_items(dataset, resolver, year, sector);
        let statistics = compute_for_items(&items);
        self.entries.insert(key, statistics);
        statistics
    }
}

pub fn execute(args: &StatsArgs) -> Result<()> {
    let (dataset, resolver) = ingest::load_dataset(&args.source)?;
    let mut cache = StatsCache::new();
    let statistics = cache.get_or_compute(&dataset, &resolver, args.year, args.sector);
    let mode = color::scale_mode(&statistics);

    let items = rank::build_items(&dataset, &resolver, args.year, args.sector);
    let country_count = items.iter().filter(|i| !i.entity.is_aggregate()).count();

    let headers = vec!["metric".to_string(), "value".to_string()];
    let rows = vec![
        vec!["countries".to_string(), country_count.to_string()],
        vec!["min".to_string(), format!("{}", statistics.min)],
        vec!["q1".to_string(), format!("{}", statistics.quartiles[1])],
        vec!["median".to_string(), format!("{}", statistics.median)],
        vec!["q3".to_string(), format!("{}", statistics.quartiles[3])],
        vec!["max".to_string(), format!("{}", statistics.max)],
        vec![
            "range_ratio".to_string(),
            if statistics.range_ratio().is_finite() {
                format!("{:.2}", statistics.range_ratio())
            } else {
                "inf".to_string()
            },
        ],
        vec!["scale".to_string(), mode.to_string()],
    ];
    table::print_table(&headers, &rows);
    info!(
        "Computed statistics for year {} sector {} over {} country value(s)",
        args.year, args.sector, country_count
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartile_endpoints_match_min_and_max() {
        let stats = compute_statistics(&[10.0, 20.0, 30.0, 40.0, 100.0]);
        assert_eq!(stats.quartiles[0], stats.min);
        assert_eq!(stats.quartiles[4], stats.max);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 100.0);
        assert_eq!(stats.median, 30.0);
    }

    #[test]
    fn interpolation_between_positions() {
        // Four values: the Q1 position is 0.75, so 10 + 0.75 * 10.
        let stats = compute_statistics(&[10.0, 20.0, 30.0, 40.0]);
        assert!((stats.quartiles[1] - 17.5).abs() < 1e-9);
        assert!((stats.median - 25.0).abs() < 1e-9);
    }

    #[test]
    fn empty_set_returns_degenerate_default() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats, ValueStatistics::degenerate());
        assert!(!stats.min.is_nan());
        assert!(stats.range_ratio().is_infinite());
    }

    #[test]
    fn single_value_set_is_flat() {
        let stats = compute_statistics(&[5.0]);
        assert_eq!(stats.min, 5.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.quartiles, [5.0; 5]);
    }
}
