//! Resolver integration with the external reference list: the fallback
//! strategy, flag URLs, and language switching.

mod common;

use encoding_rs::UTF_8;

use rd_atlas::{
    geo::{EntityKind, GeoResolver},
    ingest,
    locale::Language,
};

use common::fixture_path;

fn resolver_with_reference() -> GeoResolver {
    let path = fixture_path("countries_ref.csv");
    let entries = ingest::load_reference(&path, b',', UTF_8).expect("reference list");
    GeoResolver::with_reference(entries)
}

#[test]
fn reference_list_is_consulted_only_after_static_tables() {
    let resolver = resolver_with_reference();

    // Spain is in the static tables; the reference list only adds the flag.
    let spain = resolver.resolve("ES");
    assert_eq!(spain.iso3.as_deref(), Some("ESP"));
    assert_eq!(spain.display_name(Language::Es), "España");
    assert_eq!(
        resolver.flag_url(&spain).as_deref(),
        Some("https://flags.example/es.svg")
    );

    // Andorra is not; it resolves through the reference list by code.
    let andorra = resolver.resolve("AD");
    assert_eq!(andorra.kind, EntityKind::Country);
    assert_eq!(andorra.display_name(Language::En), "Andorra");

    // Monaco matches through the reference list's iso3 field.
    let monaco = resolver.resolve("MCO");
    assert_eq!(monaco.display_name(Language::Es), "Mónaco");
    assert_eq!(monaco.iso3.as_deref(), Some("MCO"));
}

#[test]
fn resolution_is_position_independent() {
    let resolver = resolver_with_reference();
    let first = resolver.resolve("PT");
    for _ in 0..3 {
        resolver.resolve("DE");
        resolver.resolve("EU27_2020");
    }
    assert_eq!(resolver.resolve("PT"), first);
}

#[test]
fn unknown_codes_stay_visible_as_raw_text() {
    let resolver = resolver_with_reference();
    let unknown = resolver.resolve("Canarias");
    assert_eq!(unknown.display_name(Language::En), "Canarias");
    assert_eq!(unknown.display_name(Language::Es), "Canarias");
    assert!(resolver.flag_url(&unknown).is_none());
}
