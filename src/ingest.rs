//! Source-table adapters: normalize the three known source shapes into the
//! internal [`Observation`] form.
//!
//! 1. **Wide** — one row per (entity, year), one value column per short
//!    sector code (`TOTAL`, `BES`, `GOV`, `HES`, `PNP`); a cell may carry a
//!    trailing flag letter ("2.1 e") or a `:` placeholder for no data.
//! 2. **Long** — one row per (entity, sector, year) with long English
//!    sector names and explicit value/flag columns.
//! 3. **Regional** — Spanish autonomous communities with Spanish headers
//!    (`Comunidad Autónoma`, `Año`, `% PIB I+D`, `Nota`), decimal commas,
//!    and thousands dots.
//!
//! Unparseable or negative values are dropped with a debug log and counted;
//! the batch is never aborted. Blank cells are "no data", not errors.

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{debug, info};
use regex::Regex;
use thiserror::Error;

use crate::{
    cli::SourceArgs,
    flag::ObservationFlag,
    geo::{GeoResolver, ReferenceEntry},
    io_utils,
    observation::{Dataset, Observation},
    sector::Sector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum SourceFormat {
    Wide,
    Long,
    Regional,
}

/// Load-failure taxonomy. Everything here aborts the load; data-quality
/// issues inside rows never do.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{path:?}: missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },
    #[error("{path:?}: header has no recognizable sector value columns")]
    NoSectorColumns { path: PathBuf },
}

#[derive(Debug)]
pub struct IngestReport {
    pub observations: Vec<Observation>,
    pub dropped_values: usize,
}

/// Loads the dataset and geo resolver described by the shared CLI source
/// arguments. This is the single entry point every subcommand uses, so the
/// chart and map surfaces always agree on the same filtered dataset.
pub fn load_dataset(args: &SourceArgs) -> Result<(Dataset, GeoResolver)> {
    let delimiter = io_utils::resolve_input_delimiter(&args.data, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Loading {} ({:?} format, delimiter '{}')",
        args.data.display(),
        args.format,
        io_utils::printable_delimiter(delimiter)
    );

    let report = load_observations(&args.data, args.format, delimiter, encoding)
        .with_context(|| format!("Loading observations from {:?}", args.data))?;

    let mut dataset = Dataset::new();
    let ticket = dataset.begin_load();
    dataset.commit(ticket, report.observations, report.dropped_values);

    let resolver = match &args.reference_list {
        Some(path) => {
            let ref_delimiter = io_utils::resolve_input_delimiter(path, args.delimiter);
            let entries = load_reference(path, ref_delimiter, encoding)
                .with_context(|| format!("Loading geographic reference list from {path:?}"))?;
            GeoResolver::with_reference(entries)
        }
        None => GeoResolver::new(),
    };

    info!(
        "Loaded {} observation(s), {} duplicate triple(s), {} dropped value(s)",
        dataset.observations().len(),
        dataset.duplicate_triples(),
        dataset.dropped_values()
    );
    Ok((dataset, resolver))
}

pub fn load_observations(
    path: &Path,
    format: SourceFormat,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<IngestReport> {
    match format {
        SourceFormat::Wide => load_wide(path, delimiter, encoding),
        SourceFormat::Long => load_long(path, delimiter, encoding),
        SourceFormat::Regional => load_regional(path, delimiter, encoding),
    }
}

/// Loads the geographic reference list (`code`, `iso3`, `name_en`,
/// `name_es`, `flag`); consulted by the resolver as a fallback only.
pub fn load_reference(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<ReferenceEntry>> {
    let mut reader = io_utils::open_csv_reader(path, delimiter, encoding)?;
    let mut entries = Vec::new();
    for (row_idx, result) in reader.deserialize::<ReferenceEntry>().enumerate() {
        let entry = result.with_context(|| format!("Reading reference row {}", row_idx + 2))?;
        entries.push(entry);
    }
    Ok(entries)
}

fn load_wide(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<IngestReport> {
    let mut reader = io_utils::open_csv_reader(path, delimiter, encoding)?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Reading header of {path:?}"))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let geo_idx = find_column(&headers, &["geo", "country", "entity"])
        .ok_or_else(|| missing_column(path, "geo"))?;
    let year_idx = find_column(&headers, &["year", "time", "año", "ano"])
        .ok_or_else(|| missing_column(path, "year"))?;

    // Every remaining header that normalizes to a sector becomes a value
    // column; `<CODE>_FLAG` siblings become that sector's flag column.
    let mut value_columns: Vec<(usize, Sector)> = Vec::new();
    let mut flag_columns: Vec<(usize, Sector)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if idx == geo_idx || idx == year_idx {
            continue;
        }
        if let Some(stripped) = strip_flag_suffix(header) {
            if let Some(sector) = Sector::parse_selector(stripped) {
                flag_columns.push((idx, sector));
                continue;
            }
        }
        if let Some(sector) = Sector::parse_selector(header) {
            value_columns.push((idx, sector));
        }
    }
    if value_columns.is_empty() {
        return Err(IngestError::NoSectorColumns { path: path.to_path_buf() }.into());
    }

    let mut observations = Vec::new();
    let mut dropped = 0usize;
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let entity = record.get(geo_idx).unwrap_or("").trim().to_string();
        if entity.is_empty() {
            continue;
        }
        let Some(year) = parse_year(record.get(year_idx).unwrap_or("")) else {
            debug!("row {}: unparseable year, row skipped", row_idx + 2);
            continue;
        };
        for &(idx, sector) in &value_columns {
            let cell = record.get(idx).unwrap_or("");
            let (value_part, inline_flag) = split_value_and_flag(cell);
            let column_flag = flag_columns
                .iter()
                .find(|(_, s)| *s == sector)
                .and_then(|&(flag_idx, _)| ObservationFlag::parse(record.get(flag_idx).unwrap_or("")));
            let flag = inline_flag.or(column_flag);
            match parse_value_cell(value_part) {
                ParsedValue::Number(value) => observations.push(Observation {
                    entity_code: entity.clone(),
                    year,
                    sector,
                    value: Some(value),
                    flag,
                }),
                ParsedValue::Missing => {
                    if flag.is_some() {
                        observations.push(Observation {
                            entity_code: entity.clone(),
                            year,
                            sector,
                            value: None,
                            flag,
                        });
                    }
                }
                ParsedValue::Invalid => {
                    dropped += 1;
                    debug!(
                        "row {}: dropping unparseable {} value '{}' for {}",
                        row_idx + 2,
                        sector,
                        cell,
                        entity
                    );
                }
            }
        }
    }
    Ok(IngestReport { observations, dropped_values: dropped })
}

fn load_long(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<IngestReport> {
    let mut reader = io_utils::open_csv_reader(path, delimiter, encoding)?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Reading header of {path:?}"))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let country_idx = find_column(&headers, &["country", "geo", "entity"])
        .ok_or_else(|| missing_column(path, "country"))?;
    let sector_idx = find_column(&headers, &["sector", "sectperf", "sector_name"])
        .ok_or_else(|| missing_column(path, "sector"))?;
    let year_idx = find_column(&headers, &["year", "time"])
        .ok_or_else(|| missing_column(path, "year"))?;
    let value_idx = find_column(&headers, &["value", "obs_value"])
        .ok_or_else(|| missing_column(path, "value"))?;
    let flag_idx = find_column(&headers, &["flag", "obs_flag", "note"]);

    let mut observations = Vec::new();
    let mut dropped = 0usize;
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let entity = record.get(country_idx).unwrap_or("").trim().to_string();
        if entity.is_empty() {
            continue;
        }
        let raw_sector = record.get(sector_idx).unwrap_or("");
        let Some(sector) = Sector::parse_selector(raw_sector) else {
            debug!("row {}: unknown sector '{}', row skipped", row_idx + 2, raw_sector);
            continue;
        };
        let Some(year) = parse_year(record.get(year_idx).unwrap_or("")) else {
            debug!("row {}: unparseable year, row skipped", row_idx + 2);
            continue;
        };
        let flag = flag_idx.and_then(|idx| ObservationFlag::parse(record.get(idx).unwrap_or("")));
        match parse_value_cell(record.get(value_idx).unwrap_or("")) {
            ParsedValue::Number(value) => observations.push(Observation {
                entity_code: entity,
                year,
                sector,
                value: Some(value),
                flag,
            }),
            ParsedValue::Missing => {
                if flag.is_some() {
                    observations.push(Observation {
                        entity_code: entity,
                        year,
                        sector,
                        value: None,
                        flag,
                    });
                }
            }
            ParsedValue::Invalid => {
                dropped += 1;
                debug!("row {}: dropping unparseable value for {}", row_idx + 2, entity);
            }
        }
    }
    Ok(IngestReport { observations, dropped_values: dropped })
}

/// Regional tables report total R&D intensity only, so every row lands in
/// the TOTAL sector.
fn load_regional(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<IngestReport> {
    let mut reader = io_utils::open_csv_reader(path, delimiter, encoding)?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Reading header of {path:?}"))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let entity_idx = find_column(
        &headers,
        &["comunidad autónoma", "comunidad autonoma", "comunidad", "región", "region"],
    )
    .ok_or_else(|| missing_column(path, "Comunidad Autónoma"))?;
    let year_idx = find_column(&headers, &["año", "ano", "ejercicio", "year"])
        .ok_or_else(|| missing_column(path, "Año"))?;
    let value_idx = find_column(
        &headers,
        &["% pib i+d", "% pib i+d+i", "gasto i+d", "valor", "value"],
    )
    .ok_or_else(|| missing_column(path, "% PIB I+D"))?;
    let flag_idx = find_column(&headers, &["nota", "flag"]);

    let mut observations = Vec::new();
    let mut dropped = 0usize;
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let entity = record.get(entity_idx).unwrap_or("").trim().to_string();
        if entity.is_empty() {
            continue;
        }
        let Some(year) = parse_year(record.get(year_idx).unwrap_or("")) else {
            debug!("row {}: unparseable year, row skipped", row_idx + 2);
            continue;
        };
        let flag = flag_idx.and_then(|idx| ObservationFlag::parse(record.get(idx).unwrap_or("")));
        match parse_value_cell(record.get(value_idx).unwrap_or("")) {
            ParsedValue::Number(value) => observations.push(Observation {
                entity_code: entity,
                year,
                sector: Sector::Total,
                value: Some(value),
                flag,
            }),
            ParsedValue::Missing => {}
            ParsedValue::Invalid => {
                dropped += 1;
                debug!("row {}: dropping unparseable value for {}", row_idx + 2, entity);
            }
        }
    }
    Ok(IngestReport { observations, dropped_values: dropped })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedValue {
    /// Blank or `:` placeholder — no data for the cell.
    Missing,
    /// Non-empty but not a valid non-negative number; the record is dropped.
    Invalid,
    Number(f64),
}

/// Parses a value cell, accepting plain decimals and Spanish-locale shapes
/// ("1.234,56" and "1234,5"). Negative and non-finite values are invalid;
/// observation values are magnitudes.
pub fn parse_value_cell(raw: &str) -> ParsedValue {
    static THOUSANDS_DOT: OnceLock<Regex> = OnceLock::new();
    static DECIMAL_COMMA: OnceLock<Regex> = OnceLock::new();

    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == ":" {
        return ParsedValue::Missing;
    }

    let thousands = THOUSANDS_DOT
        .get_or_init(|| Regex::new(r"^\d{1,3}(\.\d{3})+(,\d+)?$").expect("static regex"));
    let decimal_comma =
        DECIMAL_COMMA.get_or_init(|| Regex::new(r"^\d+,\d+$").expect("static regex"));

    let normalized = if thousands.is_match(trimmed) {
        trimmed.replace('.', "").replace(',', ".")
    } else if decimal_comma.is_match(trimmed) {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };

    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => ParsedValue::Number(value),
        _ => ParsedValue::Invalid,
    }
}

/// Splits a wide-format cell into its numeric part and an optional trailing
/// flag code ("2.1 e" → ("2.1", flag e)).
fn split_value_and_flag(cell: &str) -> (&str, Option<ObservationFlag>) {
    let trimmed = cell.trim();
    if let Some((value_part, flag_part)) = trimmed.rsplit_once(' ') {
        if !flag_part.is_empty() && flag_part.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return (value_part.trim(), ObservationFlag::parse(flag_part));
        }
    }
    (trimmed, None)
}

fn parse_year(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok()
}

/// `TOTAL_FLAG` → `TOTAL`; the sibling flag columns some wide exports
/// carry.
fn strip_flag_suffix(header: &str) -> Option<&str> {
    const SUFFIX: &str = "_FLAG";
    if header.len() > SUFFIX.len()
        && header[header.len() - SUFFIX.len()..].eq_ignore_ascii_case(SUFFIX)
    {
        Some(&header[..header.len() - SUFFIX.len()])
    } else {
        None
    }
}

/// Case- and accent-insensitive header lookup.
fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let normalized = normalize_header(header);
        names.iter().any(|name| normalize_header(name) == normalized)
    })
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| match ch {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' => 'u',
            'ñ' | 'Ñ' => 'n',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

fn missing_column(path: &Path, column: &str) -> anyhow::Error {
    IngestError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_tolerant_number_parsing() {
        assert_eq!(parse_value_cell("1234.5"), ParsedValue::Number(1234.5));
        assert_eq!(parse_value_cell("1.234,56"), ParsedValue::Number(1234.56));
        assert_eq!(parse_value_cell("3,14"), ParsedValue::Number(3.14));
        assert_eq!(parse_value_cell("1.234.567"), ParsedValue::Number(1_234_567.0));
        assert_eq!(parse_value_cell(""), ParsedValue::Missing);
        assert_eq!(parse_value_cell(":"), ParsedValue::Missing);
        assert_eq!(parse_value_cell("n/a"), ParsedValue::Invalid);
        assert_eq!(parse_value_cell("-5"), ParsedValue::Invalid);
    }

    #[test]
    fn flag_suffix_columns_map_to_their_sector() {
        assert_eq!(strip_flag_suffix("TOTAL_FLAG"), Some("TOTAL"));
        assert_eq!(strip_flag_suffix("bes_flag"), Some("bes"));
        assert_eq!(strip_flag_suffix("TOTAL"), None);
        assert_eq!(strip_flag_suffix("_FLAG"), None);
    }

    #[test]
    fn inline_flags_split_from_values() {
        let (value, flag) = split_value_and_flag("2.1 e");
        assert_eq!(value, "2.1");
        assert_eq!(flag.expect("flag").code(), "e");

        let (value, flag) = split_value_and_flag("1500");
        assert_eq!(value, "1500");
        assert!(flag.is_none());

        let (value, flag) = split_value_and_flag(": c");
        assert_eq!(value, ":");
        assert_eq!(flag.expect("flag").code(), "c");
    }
}
