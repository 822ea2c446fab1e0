//! Tooltip data bundles for a hovered or selected entity.

use anyhow::Result;
use serde::Serialize;

use crate::{
    cli::TooltipArgs,
    geo::GeoResolver,
    ingest,
    observation::Dataset,
    rank,
    series::{self, ViewParams},
};

#[derive(Debug, Serialize)]
pub struct TooltipBundle {
    pub display_name: String,
    pub formatted_value: String,
    pub flag_url: Option<String>,
    /// "Rank N of M" over country entities; absent for aggregates.
    pub rank_text: Option<String>,
    pub comparison_lines: Vec<String>,
    pub flag_description: Option<String>,
    /// Present when the value shown is a per-country average of a bloc
    /// total.
    pub averaged_note: Option<String>,
}

/// Builds the tooltip for one entity at the current view state. `None`
/// means the entity has no observation for (year, sector) — a "no data"
/// state for the caller to render, not an error.
pub fn build_tooltip(
    dataset: &Dataset,
    resolver: &GeoResolver,
    params: &ViewParams,
    entity_code: &str,
) -> Option<TooltipBundle> {
    let ranking = rank::build_ranking(dataset, resolver, params.year, params.sector);
    let item = ranking
        .iter()
        .find(|item| item.entity.code.eq_ignore_ascii_case(entity_code))?;

    let country_count = ranking
        .iter()
        .filter(|item| !item.entity.is_aggregate())
        .count();
    let rank_text = item
        .rank
        .map(|rank| params.lang.rank_text(rank, country_count));

    let comparison_lines =
        series::comparisons_for(dataset, resolver, params, &item.entity.code, item.display_value)
            .iter()
            .map(|line| line.render(params.lang))
            .collect();

    Some(TooltipBundle {
        display_name: item.entity.display_name(params.lang).to_string(),
        formatted_value: params.lang.format_value(item.display_value),
        flag_url: resolver.flag_url(&item.entity),
        rank_text,
        comparison_lines,
        flag_description: item
            .flag
            .as_ref()
            .map(|flag| flag.description(params.lang)),
        averaged_note: item
            .is_averaged
            .then(|| params.lang.averaged_note().to_string()),
    })
}

pub fn execute(args: &TooltipArgs) -> Result<()> {
    let (dataset, resolver) = ingest::load_dataset(&args.source)?;
    let params = ViewParams {
        year: args.year,
        sector: args.sector,
        lang: args.lang,
        reference_country: args.reference.clone(),
        reference_aggregate: args.reference_aggregate.clone(),
        top: rank::MAX_SERIES_ENTITIES,
    };
    match build_tooltip(&dataset, &resolver, &params, &args.entity) {
        Some(bundle) => println!("{}", serde_json::to_string_pretty(&bundle)?),
        None => println!("{}", args.lang.no_data()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{locale::Language, observation::Observation, sector::Sector};

    fn dataset() -> Dataset {
        let mut dataset = Dataset::new();
        let ticket = dataset.begin_load();
        dataset.commit(
            ticket,
            vec![
                Observation {
                    entity_code: "EU27_2020".into(),
                    year: 2023,
                    sector: Sector::Total,
                    value: Some(270_000.0),
                    flag: None,
                },
                Observation {
                    entity_code: "ES".into(),
                    year: 2023,
                    sector: Sector::Total,
                    value: Some(15_000.0),
                    flag: crate::flag::ObservationFlag::parse("p"),
                },
                Observation {
                    entity_code: "DE".into(),
                    year: 2023,
                    sector: Sector::Total,
                    value: Some(50_000.0),
                    flag: None,
                },
            ],
            0,
        );
        dataset
    }

    fn params(lang: Language) -> ViewParams {
        ViewParams {
            year: 2023,
            sector: Sector::Total,
            lang,
            reference_country: None,
            reference_aggregate: Some("EU27_2020".to_string()),
            top: rank::MAX_SERIES_ENTITIES,
        }
    }

    #[test]
    fn rank_text_counts_countries_only() {
        let dataset = dataset();
        let resolver = GeoResolver::new();
        let bundle =
            build_tooltip(&dataset, &resolver, &params(Language::En), "ES").expect("tooltip");
        // Two countries in the set; the aggregate is not in N or M.
        assert_eq!(bundle.rank_text.as_deref(), Some("Rank 2 of 2"));
        assert_eq!(bundle.flag_description.as_deref(), Some("provisional"));
    }

    #[test]
    fn aggregate_tooltip_has_no_rank_but_notes_averaging() {
        let dataset = dataset();
        let resolver = GeoResolver::new();
        let bundle = build_tooltip(&dataset, &resolver, &params(Language::Es), "EU27_2020")
            .expect("tooltip");
        assert_eq!(bundle.rank_text, None);
        assert_eq!(bundle.averaged_note.as_deref(), Some("media por país"));
        assert_eq!(bundle.display_name, "Unión Europea (27)");
        assert_eq!(bundle.formatted_value, "10.000");
    }

    #[test]
    fn missing_entity_yields_none() {
        let dataset = dataset();
        let resolver = GeoResolver::new();
        assert!(build_tooltip(&dataset, &resolver, &params(Language::En), "FR").is_none());
    }
}
