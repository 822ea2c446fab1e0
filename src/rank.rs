//! Ranking and comparison builder: ranked display values, rank assignment
//! over country entities, and percentage deltas against reference entities
//! and the prior year.
//!
//! A supranational aggregate with a known member count displays its
//! bloc-wide total divided by that count (rounded), marked `is_averaged`.
//! Aggregates appear in the series but are excluded from rank numbering,
//! so "rank N of M" counts countries only.

use anyhow::Result;
use log::info;
use serde::Serialize;

use crate::{
    cli::RankArgs,
    flag::ObservationFlag,
    geo::{CanonicalEntity, GeoResolver},
    ingest,
    observation::Dataset,
    sector::Sector,
    series::{self, ViewParams},
    table,
};

/// Chart series cap, applied after sorting so truncation never changes
/// which entities rank highest.
pub const MAX_SERIES_ENTITIES: usize = 25;

#[derive(Debug, Clone, Serialize)]
pub struct RankedItem {
    pub entity: CanonicalEntity,
    pub display_value: f64,
    /// True when `display_value` is the bloc total divided by the member
    /// count.
    pub is_averaged: bool,
    /// 1-based position among country entities; `None` for aggregates.
    pub rank: Option<usize>,
    pub flag: Option<ObservationFlag>,
}

/// Display value for one observation: aggregates with a known coverage are
/// averaged per member and rounded, everything else passes through.
pub fn ranked_value(value: f64, entity: &CanonicalEntity) -> (f64, bool) {
    if entity.is_aggregate()
        && let Some(members) = entity.member_count
        && members > 0
    {
        ((value / members as f64).round(), true)
    } else {
        (value, false)
    }
}

/// Builds unranked items for (year, sector): filter, resolve, derive the
/// display value. Rows without a value are omitted; input order is kept so
/// the later sort stays stable.
pub fn build_items(
    dataset: &Dataset,
    resolver: &GeoResolver,
    year: i32,
    sector: Sector,
) -> Vec<RankedItem> {
    dataset
        .filter(year, sector)
        .into_iter()
        .filter_map(|observation| {
            let value = observation.value?;
            let entity = resolver.resolve(&observation.entity_code);
            let (display_value, is_averaged) = ranked_value(value, &entity);
            Some(RankedItem {
                entity,
                display_value,
                is_averaged,
                rank: None,
                flag: observation.flag.clone(),
            })
        })
        .collect()
}

/// Stable descending sort by display value, then 1-based ranks over the
/// country entities only.
pub fn assign_ranks(items: &mut [RankedItem]) {
    items.sort_by(|a, b| {
        b.display_value
            .partial_cmp(&a.display_value)
            .expect("finite display values")
    });
    let mut position = 0usize;
    for item in items.iter_mut() {
        if item.entity.is_aggregate() {
            item.rank = None;
        } else {
            position += 1;
            item.rank = Some(position);
        }
    }
}

/// The full ranking for (year, sector): build, sort, rank. Recomputed from
/// the raw dataset on every call; never mutated incrementally.
pub fn build_ranking(
    dataset: &Dataset,
    resolver: &GeoResolver,
    year: i32,
    sector: Sector,
) -> Vec<RankedItem> {
    let mut items = build_items(dataset, resolver, year, sector);
    assign_ranks(&mut items);
    items
}

/// Truncates a sorted series to `cap` entries. Must run after sorting.
pub fn truncate_series(items: &mut Vec<RankedItem>, cap: usize) {
    if items.len() > cap {
        items.truncate(cap);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Comparison {
    Delta { percent: f64, positive: bool },
    /// The reference value is zero; a percentage delta is undefined.
    NotComparable,
}

/// Percentage delta against a reference value. A zero reference yields the
/// explicit sentinel rather than NaN/Infinity.
pub fn compare(value: f64, reference: f64) -> Comparison {
    if reference == 0.0 {
        return Comparison::NotComparable;
    }
    let difference = value - reference;
    Comparison::Delta {
        percent: (difference / reference) * 100.0,
        positive: difference > 0.0,
    }
}

/// The reference entity's display value at (year, sector): the single
/// matching observation, averaged when the reference is an aggregate with
/// known coverage. Absent observation (or absent value) yields `None`, and
/// the comparison is omitted entirely.
pub fn reference_value(
    dataset: &Dataset,
    resolver: &GeoResolver,
    code: &str,
    year: i32,
    sector: Sector,
) -> Option<f64> {
    let observation = dataset.lookup(code, year, sector)?;
    let value = observation.value?;
    let entity = resolver.resolve(code);
    Some(ranked_value(value, &entity).0)
}

/// Year-over-year reference: the same entity's display value at year − 1.
pub fn prior_year_value(
    dataset: &Dataset,
    resolver: &GeoResolver,
    code: &str,
    year: i32,
    sector: Sector,
) -> Option<f64> {
    reference_value(dataset, resolver, code, year - 1, sector)
}

pub fn execute(args: &RankArgs) -> Result<()> {
    let (dataset, resolver) = ingest::load_dataset(&args.source)?;
    let params = ViewParams {
        year: args.year,
        sector: args.sector,
        lang: args.lang,
        reference_country: args.reference.clone(),
        reference_aggregate: args.reference_aggregate.clone(),
        top: args.top,
    };
    let palette = series::resolve_palette(args.sector, args.palette.as_deref())?;
    let output = series::build_series(&dataset, &resolver, &params, &palette);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if output.entries.is_empty() {
        println!("{}", args.lang.no_data());
        return Ok(());
    }

    let headers = vec![
        "rank".to_string(),
        "entity".to_string(),
        "value".to_string(),
        "color".to_string(),
        "flag".to_string(),
        "comparisons".to_string(),
    ];
    let rows: Vec<Vec<String>> = output
        .entries
        .iter()
        .map(|entry| {
            let rank = match entry.rank {
                Some(rank) => rank.to_string(),
                None => "—".to_string(),
            };
            let mut name = entry.display_name.clone();
            if entry.is_averaged {
                name.push_str(&format!(" ({})", args.lang.averaged_note()));
            }
            let comparisons = entry
                .comparisons
                .iter()
                .map(|line| line.render(args.lang))
                .collect::<Vec<_>>()
                .join("; ");
            vec![
                rank,
                name,
                args.lang.format_value(entry.display_value),
                entry.color.to_hex(),
                entry.flag.as_ref().map(|f| f.code().to_string()).unwrap_or_default(),
                comparisons,
            ]
        })
        .collect();
    table::print_table(&headers, &rows);
    info!(
        "Ranked {} entity(ies) for year {} sector {}",
        output.entries.len(),
        args.year,
        args.sector
    );
    Ok(())
}
