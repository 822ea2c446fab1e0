//! Data-quality report: the permissive pipeline drops and overwrites
//! quietly, and this command is where those events become visible.

use anyhow::Result;
use itertools::Itertools;
use log::info;

use crate::{cli::InspectArgs, ingest, table};

pub fn execute(args: &InspectArgs) -> Result<()> {
    let (dataset, resolver) = ingest::load_dataset(&args.source)?;

    let codes = dataset.entity_codes();
    let fallback_codes: Vec<&str> = codes
        .iter()
        .copied()
        .filter(|code| resolver.resolve(code).is_fallback())
        .collect();
    let aggregate_count = codes
        .iter()
        .filter(|code| resolver.resolve(code).is_aggregate())
        .count();
    let years = dataset.years();
    let year_span = match (years.first(), years.last()) {
        (Some(first), Some(last)) if first != last => format!("{first}–{last}"),
        (Some(first), _) => first.to_string(),
        _ => "-".to_string(),
    };

    let headers = vec!["check".to_string(), "result".to_string()];
    let rows = vec![
        vec!["observations".to_string(), dataset.observations().len().to_string()],
        vec!["entities".to_string(), codes.len().to_string()],
        vec!["aggregates".to_string(), aggregate_count.to_string()],
        vec!["years".to_string(), year_span],
        vec![
            "duplicate triples (last write kept)".to_string(),
            dataset.duplicate_triples().to_string(),
        ],
        vec![
            "dropped unparseable values".to_string(),
            dataset.dropped_values().to_string(),
        ],
        vec![
            "codes shown as raw text".to_string(),
            if fallback_codes.is_empty() {
                "none".to_string()
            } else {
                fallback_codes.iter().join(", ")
            },
        ],
    ];
    table::print_table(&headers, &rows);
    info!(
        "Inspected {} observation(s) across {} entity code(s)",
        dataset.observations().len(),
        codes.len()
    );
    Ok(())
}
