//! Source-adapter integration tests: the wide, long, and regional shapes
//! must normalize to identical observations, with the permissive
//! data-cleaning posture (drop values, keep batches) intact.

mod common;

use encoding_rs::UTF_8;

use rd_atlas::{
    ingest::{self, SourceFormat},
    io_utils,
    observation::Dataset,
    sector::Sector,
};

use common::fixture_path;

fn load(fixture: &str, format: SourceFormat, delimiter: u8, encoding_label: Option<&str>) -> Dataset {
    let path = fixture_path(fixture);
    assert!(path.exists(), "fixture missing: {path:?}");
    let encoding = io_utils::resolve_encoding(encoding_label).expect("encoding");
    let report =
        ingest::load_observations(&path, format, delimiter, encoding).expect("load observations");
    let mut dataset = Dataset::new();
    let ticket = dataset.begin_load();
    dataset.commit(ticket, report.observations, report.dropped_values);
    dataset
}

#[test]
fn wide_adapter_reads_values_flags_and_placeholders() {
    let dataset = load("rd_wide.csv", SourceFormat::Wide, b',', None);

    let italy = dataset.lookup("IT", 2023, Sector::Total).expect("IT row");
    assert_eq!(italy.value, Some(26_000.0));
    assert_eq!(italy.flag.as_ref().expect("inline flag").code(), "e");

    let spain = dataset.lookup("ES", 2023, Sector::Total).expect("ES row");
    assert_eq!(spain.flag.as_ref().expect("flag").code(), "p");

    // Zero is data; ':' is not.
    let malta = dataset.lookup("MT", 2023, Sector::Total).expect("MT row");
    assert_eq!(malta.value, Some(0.0));
    assert!(dataset.lookup("MT", 2023, Sector::Business).is_none());

    // Unparseable values are dropped without aborting the batch.
    assert!(dataset.lookup("IS", 2023, Sector::Total).is_none());
    assert_eq!(dataset.dropped_values(), 1);
}

#[test]
fn wide_adapter_keeps_last_write_on_duplicate_triples() {
    let dataset = load("rd_wide.csv", SourceFormat::Wide, b',', None);
    // The PT row appears twice; its five sector cells all collide.
    assert_eq!(dataset.duplicate_triples(), 5);
    let portugal = dataset.lookup("PT", 2023, Sector::Total).expect("PT row");
    assert_eq!(portugal.value, Some(4_000.0));
}

#[test]
fn long_adapter_agrees_with_wide_for_equivalent_content() {
    let wide = load("rd_wide.csv", SourceFormat::Wide, b',', None);
    let long = load("rd_long.csv", SourceFormat::Long, b',', None);

    for (code, sector) in [
        ("ES", Sector::Total),
        ("ES", Sector::Business),
        ("DE", Sector::Total),
        ("DE", Sector::Business),
        ("FR", Sector::Total),
        ("EU27_2020", Sector::Total),
    ] {
        let from_wide = wide.lookup(code, 2023, sector).expect("wide row");
        let from_long = long.lookup(code, 2023, sector).expect("long row");
        assert_eq!(from_wide.value, from_long.value, "{code} {sector}");
        assert_eq!(from_wide.flag, from_long.flag, "{code} {sector}");
    }
}

#[test]
fn regional_adapter_handles_latin1_and_decimal_commas() {
    let dataset = load(
        "regional_latin1.csv",
        SourceFormat::Regional,
        b';',
        Some("latin1"),
    );
    assert_eq!(dataset.observations().len(), 5);

    let basque = dataset
        .lookup("País Vasco", 2023, Sector::Total)
        .expect("decoded entity name");
    assert_eq!(basque.value, Some(2.32));

    let madrid = dataset.lookup("Madrid", 2023, Sector::Total).expect("Madrid row");
    assert_eq!(madrid.flag.as_ref().expect("Nota flag").code(), "p");

    // Everything in the regional table is total R&D intensity.
    assert!(dataset
        .observations()
        .iter()
        .all(|obs| obs.sector == Sector::Total));
}

#[test]
fn reference_list_loads_optional_fields() {
    let path = fixture_path("countries_ref.csv");
    let entries = ingest::load_reference(&path, b',', UTF_8).expect("reference list");
    assert_eq!(entries.len(), 4);
    let andorra = entries.iter().find(|e| e.code == "AD").expect("AD entry");
    assert_eq!(andorra.iso3.as_deref(), Some("AND"));
    assert!(andorra.flag.as_deref().expect("flag url").starts_with("https://"));
}

#[test]
fn missing_required_column_aborts_the_load() {
    let workspace = common::TestWorkspace::new();
    let path = workspace.write("broken.csv", "region,value\nES,1.0\n");
    let err = ingest::load_observations(&path, SourceFormat::Wide, b',', UTF_8)
        .expect_err("missing geo column");
    assert!(format!("{err:#}").contains("missing required column"));
}
