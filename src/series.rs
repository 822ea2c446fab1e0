//! Assembles the visualization-ready series shared by the chart, map, and
//! tooltip surfaces.
//!
//! Everything downstream of the raw dataset flows through [`build_series`]:
//! filter → resolve → ranked values → statistics → colors → truncation →
//! comparisons. Both visual surfaces consume the same output, so they can
//! never disagree on the filtered dataset.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::{
    color::{self, Palette, Rgb, ScaleMode},
    flag::ObservationFlag,
    geo::GeoResolver,
    locale::Language,
    observation::Dataset,
    rank::{self, Comparison},
    sector::Sector,
    stats::{StatsCache, ValueStatistics},
};

#[derive(Debug, Clone)]
pub struct ViewParams {
    pub year: i32,
    pub sector: Sector,
    pub lang: Language,
    /// Designated "home country" code to compare every entry against.
    pub reference_country: Option<String>,
    /// Union aggregate code to compare every entry against.
    pub reference_aggregate: Option<String>,
    /// Chart series cap, applied after sorting.
    pub top: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonLine {
    /// Localized label of what the delta is against ("frente a Alemania",
    /// "vs 2022").
    pub against: String,
    #[serde(flatten)]
    pub comparison: Comparison,
}

impl ComparisonLine {
    pub fn render(&self, lang: Language) -> String {
        match self.comparison {
            Comparison::Delta { percent, .. } => {
                format!("{} {}", lang.format_percent(percent), self.against)
            }
            Comparison::NotComparable => lang.no_comparison().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesEntry {
    pub code: String,
    pub display_name: String,
    pub display_value: f64,
    pub color: Rgb,
    pub rank: Option<usize>,
    pub is_averaged: bool,
    pub flag: Option<ObservationFlag>,
    pub comparisons: Vec<ComparisonLine>,
}

#[derive(Debug, Serialize)]
pub struct SeriesOutput {
    pub year: i32,
    pub sector: Sector,
    pub scale: ScaleMode,
    pub statistics: ValueStatistics,
    pub entries: Vec<SeriesEntry>,
}

/// Builds the full ranked, colored, compared series for one view state.
/// Recomputes everything from the raw dataset; an empty `entries` list is
/// the "no data" state.
pub fn build_series(
    dataset: &Dataset,
    resolver: &GeoResolver,
    params: &ViewParams,
    palette: &Palette,
) -> SeriesOutput {
    let mut ranking = rank::build_ranking(dataset, resolver, params.year, params.sector);

    let mut cache = StatsCache::new();
    let statistics = cache.get_or_compute(dataset, resolver, params.year, params.sector);
    let scale = color::scale_mode(&statistics);

    rank::truncate_series(&mut ranking, params.top);

    let entries = ranking
        .into_iter()
        .map(|item| {
            let comparisons = comparisons_for(dataset, resolver, params, &item.entity.code, item.display_value);
            SeriesEntry {
                code: item.entity.code.clone(),
                display_name: item.entity.display_name(params.lang).to_string(),
                display_value: item.display_value,
                color: color::color_for(Some(item.display_value), &statistics, palette),
                rank: item.rank,
                is_averaged: item.is_averaged,
                flag: item.flag,
                comparisons,
            }
        })
        .collect();

    SeriesOutput {
        year: params.year,
        sector: params.sector,
        scale,
        statistics,
        entries,
    }
}

/// Comparison lines for one entry: home country, union aggregate, prior
/// year — each omitted when its reference observation is absent, and never
/// computed against the entry itself.
pub fn comparisons_for(
    dataset: &Dataset,
    resolver: &GeoResolver,
    params: &ViewParams,
    entity_code: &str,
    display_value: f64,
) -> Vec<ComparisonLine> {
    let mut lines = Vec::new();
    for reference in [&params.reference_country, &params.reference_aggregate]
        .into_iter()
        .flatten()
    {
        if reference.eq_ignore_ascii_case(entity_code) {
            continue;
        }
        if let Some(reference_value) =
            rank::reference_value(dataset, resolver, reference, params.year, params.sector)
        {
            let name = resolver.resolve(reference).display_name(params.lang).to_string();
            lines.push(ComparisonLine {
                against: params.lang.versus(&name),
                comparison: rank::compare(display_value, reference_value),
            });
        }
    }
    if let Some(prior) =
        rank::prior_year_value(dataset, resolver, entity_code, params.year, params.sector)
    {
        lines.push(ComparisonLine {
            against: params.lang.versus_year(params.year - 1),
            comparison: rank::compare(display_value, prior),
        });
    }
    lines
}

/// The palette to use for a sector, honoring a YAML override file when one
/// is supplied.
pub fn resolve_palette(sector: Sector, palette_path: Option<&Path>) -> Result<Palette> {
    match palette_path {
        Some(path) => {
            let overrides = color::load_palette_overrides(path)?;
            Ok(color::palette_for(sector, &overrides))
        }
        None => Ok(Palette::for_sector(sector)),
    }
}
