use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{ingest::SourceFormat, locale::Language, sector::Sector};

#[derive(Debug, Parser)]
#[command(author, version, about = "R&D statistics dashboard pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the ranked chart series for a year, sector, and language
    Rank(RankArgs),
    /// Compute per-feature fill colors for a GeoJSON boundary file
    Map(MapArgs),
    /// Print min/max/median/quartiles and the chosen color-scale mode
    Stats(StatsArgs),
    /// Build the tooltip bundle for a single entity
    Tooltip(TooltipArgs),
    /// Report data-quality findings for a source table
    Inspect(InspectArgs),
}

/// Source-table options shared by every subcommand.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input observations file ('-' reads stdin)
    #[arg(short = 'i', long = "data")]
    pub data: PathBuf,
    /// Shape of the source table
    #[arg(long, value_enum, default_value = "wide")]
    pub format: SourceFormat,
    /// Geographic reference list (code,iso3,name_en,name_es,flag)
    #[arg(long = "reference-list")]
    pub reference_list: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct RankArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Observation year
    #[arg(short, long)]
    pub year: i32,
    /// Sector of performance (short code or any source spelling)
    #[arg(short, long, value_parser = parse_sector)]
    pub sector: Sector,
    /// Output language
    #[arg(long, value_enum, default_value = "en")]
    pub lang: Language,
    /// Home-country code to compare every entry against
    #[arg(long)]
    pub reference: Option<String>,
    /// Union aggregate code to compare every entry against
    #[arg(long = "reference-aggregate")]
    pub reference_aggregate: Option<String>,
    /// Maximum entities in the series, applied after sorting
    #[arg(long, default_value_t = crate::rank::MAX_SERIES_ENTITIES)]
    pub top: usize,
    /// Palette override file (YAML, sector → five hex bands)
    #[arg(long)]
    pub palette: Option<PathBuf>,
    /// Emit the series as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// GeoJSON feature collection with polygon boundaries
    #[arg(short, long)]
    pub geojson: PathBuf,
    /// Observation year
    #[arg(short, long)]
    pub year: i32,
    /// Sector of performance (short code or any source spelling)
    #[arg(short, long, value_parser = parse_sector)]
    pub sector: Sector,
    /// Palette override file (YAML, sector → five hex bands)
    #[arg(long)]
    pub palette: Option<PathBuf>,
    /// Output file for the feature colors (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Observation year
    #[arg(short, long)]
    pub year: i32,
    /// Sector of performance (short code or any source spelling)
    #[arg(short, long, value_parser = parse_sector)]
    pub sector: Sector,
}

#[derive(Debug, Args)]
pub struct TooltipArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Entity code as it appears in the source data
    #[arg(short, long)]
    pub entity: String,
    /// Observation year
    #[arg(short, long)]
    pub year: i32,
    /// Sector of performance (short code or any source spelling)
    #[arg(short, long, value_parser = parse_sector)]
    pub sector: Sector,
    /// Output language
    #[arg(long, value_enum, default_value = "en")]
    pub lang: Language,
    /// Home-country code to compare against
    #[arg(long)]
    pub reference: Option<String>,
    /// Union aggregate code to compare against
    #[arg(long = "reference-aggregate")]
    pub reference_aggregate: Option<String>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

fn parse_sector(raw: &str) -> Result<Sector, String> {
    Sector::parse_selector(raw).ok_or_else(|| {
        format!("unknown sector '{raw}'; use TOTAL/BES/GOV/HES/PNP or a source name")
    })
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "tab" | "\\t" | "t" => Ok(b'\t'),
        "," => Ok(b','),
        ";" => Ok(b';'),
        "|" => Ok(b'|'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(format!("unsupported delimiter '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_parser_accepts_aliases() {
        assert_eq!(parse_sector("BES"), Ok(Sector::Business));
        assert_eq!(parse_sector("All Sectors"), Ok(Sector::Total));
        assert!(parse_sector("military").is_err());
    }

    #[test]
    fn delimiter_parser_handles_named_forms() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("ab").is_err());
    }
}
