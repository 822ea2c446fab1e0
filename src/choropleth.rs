//! Choropleth surface: per-GeoJSON-feature fill colors.
//!
//! Feature property bags disagree on key spelling across published
//! boundary files, so identity extraction checks the common variants
//! (`ISO_A3`, `ADM0_A3`, `iso_a3`, `ISO3`, `ISO_A2`, `ADMIN`, `NAME`, …)
//! defensively. Matching against the dataset tries ISO3, then ISO2, then
//! the display names in both languages.

use std::{collections::HashMap, fs, str::FromStr};

use anyhow::{Context, Result};
use geojson::{Feature, GeoJson};
use log::info;
use serde::Serialize;

use crate::{
    cli::MapArgs,
    color::{self, Palette, Rgb},
    geo::GeoResolver,
    ingest,
    locale::Language,
    rank::{self, RankedItem},
    series,
    stats::{StatsCache, ValueStatistics},
};

const ISO3_KEYS: &[&str] = &["ISO_A3", "ADM0_A3", "iso_a3", "ISO3", "iso3"];
const ISO2_KEYS: &[&str] = &["ISO_A2", "iso_a2", "ISO2", "iso2"];
const NAME_KEYS: &[&str] = &["ADMIN", "NAME", "NAME_EN", "admin", "name"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureIdentity {
    pub iso3: Option<String>,
    pub iso2: Option<String>,
    pub name: Option<String>,
}

/// Extracts whatever identity the feature's property bag carries.
pub fn feature_identity(feature: &Feature) -> FeatureIdentity {
    let mut identity = FeatureIdentity::default();
    let Some(properties) = feature.properties.as_ref() else {
        return identity;
    };
    let get = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .filter_map(|key| properties.get(*key))
            .filter_map(|value| value.as_str())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty() && value != "-99")
    };
    identity.iso3 = get(ISO3_KEYS);
    identity.iso2 = get(ISO2_KEYS);
    identity.name = get(NAME_KEYS);
    identity
}

/// Value lookup index built from a ranked item set, with the statistics
/// and palette needed to turn a value into a fill color. This is the
/// `(feature) → color` function the map surface consumes.
pub struct ChoroplethIndex {
    by_iso3: HashMap<String, f64>,
    by_iso2: HashMap<String, f64>,
    by_name: HashMap<String, f64>,
    statistics: ValueStatistics,
    palette: Palette,
}

impl ChoroplethIndex {
    pub fn new(items: &[RankedItem], statistics: ValueStatistics, palette: Palette) -> Self {
        let mut by_iso3 = HashMap::new();
        let mut by_iso2 = HashMap::new();
        let mut by_name = HashMap::new();
        for item in items {
            if let Some(iso3) = &item.entity.iso3 {
                by_iso3.insert(iso3.to_ascii_uppercase(), item.display_value);
            }
            if let Some(iso2) = &item.entity.iso2 {
                by_iso2.insert(iso2.to_ascii_uppercase(), item.display_value);
            }
            for lang in [Language::En, Language::Es] {
                by_name.insert(
                    item.entity.display_name(lang).to_lowercase(),
                    item.display_value,
                );
            }
        }
        Self { by_iso3, by_iso2, by_name, statistics, palette }
    }

    /// The display value behind a feature, if any of its identity fields
    /// match the dataset.
    pub fn value_for(&self, feature: &Feature) -> Option<f64> {
        let identity = feature_identity(feature);
        if let Some(iso3) = identity.iso3
            && let Some(value) = self.by_iso3.get(&iso3.to_ascii_uppercase())
        {
            return Some(*value);
        }
        if let Some(iso2) = identity.iso2
            && let Some(value) = self.by_iso2.get(&iso2.to_ascii_uppercase())
        {
            return Some(*value);
        }
        if let Some(name) = identity.name
            && let Some(value) = self.by_name.get(&name.to_lowercase())
        {
            return Some(*value);
        }
        None
    }

    /// Fill color for a feature; unmatched features get the no-data color.
    pub fn color_for_feature(&self, feature: &Feature) -> Rgb {
        color::color_for(self.value_for(feature), &self.statistics, &self.palette)
    }
}

#[derive(Debug, Serialize)]
pub struct FeatureColor {
    pub key: String,
    pub name: Option<String>,
    pub value: Option<f64>,
    pub color: Rgb,
}

/// Colors every feature in the collection. The key is the strongest
/// identity the feature offers (ISO3, then ISO2, then name, then index).
pub fn color_features(collection: &GeoJson, index: &ChoroplethIndex) -> Vec<FeatureColor> {
    let GeoJson::FeatureCollection(features) = collection else {
        return Vec::new();
    };
    features
        .features
        .iter()
        .enumerate()
        .map(|(position, feature)| {
            let identity = feature_identity(feature);
            let key = identity
                .iso3
                .clone()
                .or_else(|| identity.iso2.clone())
                .or_else(|| identity.name.clone())
                .unwrap_or_else(|| format!("feature-{position}"));
            FeatureColor {
                key,
                name: identity.name,
                value: index.value_for(feature),
                color: index.color_for_feature(feature),
            }
        })
        .collect()
}

pub fn execute(args: &MapArgs) -> Result<()> {
    let (dataset, resolver) = ingest::load_dataset(&args.source)?;

    let geojson_text = fs::read_to_string(&args.geojson)
        .with_context(|| format!("Reading GeoJSON from {:?}", args.geojson))?;
    let collection = GeoJson::from_str(&geojson_text)
        .with_context(|| format!("Parsing GeoJSON from {:?}", args.geojson))?;

    // The map colors all entities; the chart cap never applies here.
    let ranking = rank::build_ranking(&dataset, &resolver, args.year, args.sector);
    let mut cache = StatsCache::new();
    let statistics = cache.get_or_compute(&dataset, &resolver, args.year, args.sector);
    let palette = series::resolve_palette(args.sector, args.palette.as_deref())?;

    let index = ChoroplethIndex::new(&ranking, statistics, palette);
    let colored = color_features(&collection, &index);

    let rendered = serde_json::to_string_pretty(&colored)?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Writing feature colors to {path:?}"))?;
            info!("Wrote {} feature color(s) to {:?}", colored.len(), path);
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
