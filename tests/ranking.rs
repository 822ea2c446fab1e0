//! End-to-end ranking tests over the wide fixture: aggregate averaging,
//! rank numbering over countries only, comparisons, and idempotence.

mod common;

use rd_atlas::{
    color::{Palette, ScaleMode, scale_mode},
    geo::GeoResolver,
    ingest::{self, SourceFormat},
    io_utils,
    locale::Language,
    observation::Dataset,
    rank::{self, Comparison},
    sector::Sector,
    series::{self, ViewParams},
    stats::StatsCache,
};

use common::fixture_path;

fn wide_dataset() -> Dataset {
    let path = fixture_path("rd_wide.csv");
    let encoding = io_utils::resolve_encoding(None).expect("encoding");
    let report = ingest::load_observations(&path, SourceFormat::Wide, b',', encoding)
        .expect("load observations");
    let mut dataset = Dataset::new();
    let ticket = dataset.begin_load();
    dataset.commit(ticket, report.observations, report.dropped_values);
    dataset
}

#[test]
fn aggregates_are_averaged_and_excluded_from_rank_numbering() {
    let dataset = wide_dataset();
    let resolver = GeoResolver::new();
    let ranking = rank::build_ranking(&dataset, &resolver, 2023, Sector::Total);

    let germany = &ranking[0];
    assert_eq!(germany.entity.code, "DE");
    assert_eq!(germany.rank, Some(1));
    assert_eq!(germany.display_value, 50_000.0);

    let eu = ranking
        .iter()
        .find(|item| item.entity.code == "EU27_2020")
        .expect("EU aggregate");
    assert!(eu.is_averaged);
    assert_eq!(eu.display_value, 10_000.0);
    assert_eq!(eu.rank, None);

    let ea = ranking
        .iter()
        .find(|item| item.entity.code == "EA20")
        .expect("EA aggregate");
    assert_eq!(ea.display_value, 11_000.0);

    // Eleven countries survive ingestion (Iceland's value was dropped);
    // their ranks are contiguous from 1.
    let ranks: Vec<usize> = ranking.iter().filter_map(|item| item.rank).collect();
    assert_eq!(ranks, (1..=11).collect::<Vec<_>>());
}

#[test]
fn statistics_exclude_aggregates_and_choose_the_log_scale() {
    let dataset = wide_dataset();
    let resolver = GeoResolver::new();
    let mut cache = StatsCache::new();
    let statistics = cache.get_or_compute(&dataset, &resolver, 2023, Sector::Total);

    // Countries with value > 0: Malta's zero and both aggregates are out.
    assert_eq!(statistics.min, 1_600.0);
    assert_eq!(statistics.max, 50_000.0);
    assert_eq!(statistics.quartiles[0], statistics.min);
    assert_eq!(statistics.quartiles[4], statistics.max);
    assert_eq!(scale_mode(&statistics), ScaleMode::Logarithmic);
}

#[test]
fn series_carries_reference_and_prior_year_comparisons() {
    let dataset = wide_dataset();
    let resolver = GeoResolver::new();
    let params = ViewParams {
        year: 2023,
        sector: Sector::Total,
        lang: Language::En,
        reference_country: Some("ES".to_string()),
        reference_aggregate: Some("EU27_2020".to_string()),
        top: rank::MAX_SERIES_ENTITIES,
    };
    let palette = Palette::for_sector(Sector::Total);
    let output = series::build_series(&dataset, &resolver, &params, &palette);

    let germany = output
        .entries
        .iter()
        .find(|entry| entry.code == "DE")
        .expect("Germany entry");
    assert_eq!(germany.comparisons.len(), 3);

    // vs Spain: (50000 - 15000) / 15000.
    match germany.comparisons[0].comparison {
        Comparison::Delta { percent, positive } => {
            assert!((percent - 233.333).abs() < 0.01);
            assert!(positive);
        }
        Comparison::NotComparable => panic!("expected delta"),
    }
    assert!(germany.comparisons[0].against.contains("Spain"));

    // vs the EU per-country average of 10 000.
    match germany.comparisons[1].comparison {
        Comparison::Delta { percent, .. } => assert!((percent - 400.0).abs() < 1e-9),
        Comparison::NotComparable => panic!("expected delta"),
    }

    // vs 2022: (50000 - 47000) / 47000.
    assert_eq!(germany.comparisons[2].against, "vs 2022");
    match germany.comparisons[2].comparison {
        Comparison::Delta { percent, positive } => {
            assert!((percent - 6.3829).abs() < 0.01);
            assert!(positive);
        }
        Comparison::NotComparable => panic!("expected delta"),
    }
}

#[test]
fn refiltering_identical_parameters_is_idempotent() {
    let first = wide_dataset();
    let second = wide_dataset();
    let resolver = GeoResolver::new();
    let ranking_a = rank::build_ranking(&first, &resolver, 2023, Sector::Business);
    let ranking_b = rank::build_ranking(&second, &resolver, 2023, Sector::Business);
    assert_eq!(
        serde_json::to_string(&ranking_a).expect("serialize"),
        serde_json::to_string(&ranking_b).expect("serialize")
    );
}

#[test]
fn empty_filter_produces_the_no_data_state() {
    let dataset = wide_dataset();
    let resolver = GeoResolver::new();
    let ranking = rank::build_ranking(&dataset, &resolver, 1999, Sector::Total);
    assert!(ranking.is_empty());

    let mut cache = StatsCache::new();
    let statistics = cache.get_or_compute(&dataset, &resolver, 1999, Sector::Total);
    assert_eq!(statistics.min, 0.0);
    assert_eq!(statistics.max, 1.0);
    assert!(!statistics.median.is_nan());
}
