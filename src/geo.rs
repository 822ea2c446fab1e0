//! Geographic code resolution: ISO2, ISO3, and supranational aggregate
//! tokens map to one canonical entity with bilingual display names.
//!
//! Resolution is an ordered chain of pure strategies, tried in sequence by
//! [`GeoResolver::resolve`]:
//!
//! 1. aggregate token allowlist, then the `EU`/`EA` prefix heuristic
//! 2. static ISO3 table
//! 3. static ISO2 table (including the Eurostat `EL`/`UK` spellings)
//! 4. legacy ISO3 → ISO2 cross-reference, retrying the ISO2 table
//! 5. external geographic reference list (matched by code or iso3)
//! 6. best-effort fallback: the raw code becomes the display name
//!
//! Every strategy is a pure function of the code, so resolution never
//! depends on dataset order and results are safely memoizable.

use serde::{Deserialize, Serialize};

use crate::locale::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Country,
    SupranationalAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEntity {
    /// The raw code as supplied by the source.
    pub code: String,
    pub iso2: Option<String>,
    pub iso3: Option<String>,
    pub kind: EntityKind,
    /// Present only for aggregates with a defined coverage (EU → 27,
    /// EA19 → 19, EA20 → 20); absent means no averaging is applied.
    pub member_count: Option<u32>,
    name_en: String,
    name_es: String,
}

impl CanonicalEntity {
    pub fn display_name(&self, lang: Language) -> &str {
        match lang {
            Language::En => &self.name_en,
            Language::Es => &self.name_es,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.kind == EntityKind::SupranationalAggregate
    }

    /// True when resolution fell through every strategy and the display
    /// name is just the raw code.
    pub fn is_fallback(&self) -> bool {
        self.kind == EntityKind::Country && self.iso2.is_none() && self.iso3.is_none()
            && self.name_en == self.code
    }
}

/// One row of the external flag/name reference dataset, consulted only when
/// the static tables miss.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceEntry {
    pub code: String,
    pub iso3: Option<String>,
    pub name_en: Option<String>,
    pub name_es: Option<String>,
    pub flag: Option<String>,
}

pub struct GeoResolver {
    reference: Vec<ReferenceEntry>,
}

impl GeoResolver {
    pub fn new() -> Self {
        Self { reference: Vec::new() }
    }

    pub fn with_reference(reference: Vec<ReferenceEntry>) -> Self {
        Self { reference }
    }

    /// Resolves a raw geographic code. Pure; never fails.
    pub fn resolve(&self, code: &str) -> CanonicalEntity {
        let raw = code.trim();
        resolve_aggregate(raw)
            .or_else(|| resolve_iso3(raw))
            .or_else(|| resolve_iso2(raw))
            .or_else(|| resolve_cross_reference(raw))
            .or_else(|| resolve_from_reference(raw, &self.reference))
            .unwrap_or_else(|| fallback_entity(raw))
    }

    /// Flag image URL for tooltips, looked up in the reference list by iso3
    /// or raw code.
    pub fn flag_url(&self, entity: &CanonicalEntity) -> Option<String> {
        self.reference
            .iter()
            .find(|entry| {
                entry.code.eq_ignore_ascii_case(&entity.code)
                    || matches!(
                        (&entry.iso3, &entity.iso3),
                        (Some(a), Some(b)) if a.eq_ignore_ascii_case(b)
                    )
            })
            .and_then(|entry| entry.flag.clone())
    }
}

impl Default for GeoResolver {
    fn default() -> Self {
        Self::new()
    }
}

struct CountryRow {
    iso3: &'static str,
    iso2: &'static str,
    name_en: &'static str,
    name_es: &'static str,
}

macro_rules! country {
    ($iso3:literal, $iso2:literal, $en:literal, $es:literal) => {
        CountryRow { iso3: $iso3, iso2: $iso2, name_en: $en, name_es: $es }
    };
}

/// EU-27, EFTA, the United Kingdom, and the enlargement countries the
/// source datasets report on.
const COUNTRIES: &[CountryRow] = &[
    country!("AUT", "AT", "Austria", "Austria"),
    country!("BEL", "BE", "Belgium", "Bélgica"),
    country!("BGR", "BG", "Bulgaria", "Bulgaria"),
    country!("HRV", "HR", "Croatia", "Croacia"),
    country!("CYP", "CY", "Cyprus", "Chipre"),
    country!("CZE", "CZ", "Czechia", "Chequia"),
    country!("DNK", "DK", "Denmark", "Dinamarca"),
    country!("EST", "EE", "Estonia", "Estonia"),
    country!("FIN", "FI", "Finland", "Finlandia"),
    country!("FRA", "FR", "France", "Francia"),
    country!("DEU", "DE", "Germany", "Alemania"),
    country!("GRC", "GR", "Greece", "Grecia"),
    country!("HUN", "HU", "Hungary", "Hungría"),
    country!("IRL", "IE", "Ireland", "Irlanda"),
    country!("ITA", "IT", "Italy", "Italia"),
    country!("LVA", "LV", "Latvia", "Letonia"),
    country!("LTU", "LT", "Lithuania", "Lituania"),
    country!("LUX", "LU", "Luxembourg", "Luxemburgo"),
    country!("MLT", "MT", "Malta", "Malta"),
    country!("NLD", "NL", "Netherlands", "Países Bajos"),
    country!("POL", "PL", "Poland", "Polonia"),
    country!("PRT", "PT", "Portugal", "Portugal"),
    country!("ROU", "RO", "Romania", "Rumanía"),
    country!("SVK", "SK", "Slovakia", "Eslovaquia"),
    country!("SVN", "SI", "Slovenia", "Eslovenia"),
    country!("ESP", "ES", "Spain", "España"),
    country!("SWE", "SE", "Sweden", "Suecia"),
    country!("ISL", "IS", "Iceland", "Islandia"),
    country!("NOR", "NO", "Norway", "Noruega"),
    country!("CHE", "CH", "Switzerland", "Suiza"),
    country!("LIE", "LI", "Liechtenstein", "Liechtenstein"),
    country!("GBR", "GB", "United Kingdom", "Reino Unido"),
    country!("TUR", "TR", "Türkiye", "Turquía"),
    country!("SRB", "RS", "Serbia", "Serbia"),
    country!("MKD", "MK", "North Macedonia", "Macedonia del Norte"),
    country!("MNE", "ME", "Montenegro", "Montenegro"),
    country!("ALB", "AL", "Albania", "Albania"),
    country!("BIH", "BA", "Bosnia and Herzegovina", "Bosnia y Herzegovina"),
    country!("UKR", "UA", "Ukraine", "Ucrania"),
    country!("MDA", "MD", "Moldova", "Moldavia"),
    country!("XKX", "XK", "Kosovo", "Kosovo"),
];

/// Eurostat publishes Greece as `EL` and the United Kingdom as `UK`.
const ISO2_ALIASES: &[(&str, &str)] = &[("EL", "GR"), ("UK", "GB")];

/// Legacy and cartographic ISO3 spellings that the name table does not
/// carry; resolved by mapping to ISO2 and retrying. Natural Earth uses
/// `KOS` for Kosovo; `ROM` is the pre-2002 code for Romania.
const ISO3_TO_ISO2: &[(&str, &str)] = &[("ROM", "RO"), ("KOS", "XK"), ("GRE", "GR")];

struct AggregateRow {
    token: &'static str,
    member_count: Option<u32>,
    name_en: &'static str,
    name_es: &'static str,
}

/// Allowlist of aggregate tokens, keyed by their separator-free uppercase
/// form. The bare `EU`/`EA` tokens take the current coverage.
const AGGREGATES: &[AggregateRow] = &[
    AggregateRow { token: "EU272020", member_count: Some(27), name_en: "European Union (27)", name_es: "Unión Europea (27)" },
    AggregateRow { token: "EU27", member_count: Some(27), name_en: "European Union (27)", name_es: "Unión Europea (27)" },
    AggregateRow { token: "EU28", member_count: None, name_en: "European Union (28)", name_es: "Unión Europea (28)" },
    AggregateRow { token: "EU", member_count: Some(27), name_en: "European Union", name_es: "Unión Europea" },
    AggregateRow { token: "EA19", member_count: Some(19), name_en: "Euro Area (19)", name_es: "Zona Euro (19)" },
    AggregateRow { token: "EA20", member_count: Some(20), name_en: "Euro Area (20)", name_es: "Zona Euro (20)" },
    AggregateRow { token: "EA", member_count: Some(20), name_en: "Euro Area", name_es: "Zona Euro" },
];

/// Uppercases and strips the separators hyphenated variants carry
/// ("EU-27" and "EU27_2020" both normalize).
fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|ch| !matches!(ch, '-' | '_' | ' '))
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}

/// Strategy 1: aggregate allowlist, then the documented shape heuristic
/// (`EU`/`EA` prefix, length ≤ 5). The heuristic can misjudge novel codes;
/// heuristic matches get no member count, so they are never averaged.
pub fn resolve_aggregate(code: &str) -> Option<CanonicalEntity> {
    let token = normalize_code(code);
    if let Some(row) = AGGREGATES.iter().find(|row| row.token == token) {
        return Some(CanonicalEntity {
            code: code.to_string(),
            iso2: None,
            iso3: None,
            kind: EntityKind::SupranationalAggregate,
            member_count: row.member_count,
            name_en: row.name_en.to_string(),
            name_es: row.name_es.to_string(),
        });
    }
    let heuristic_hit =
        (token.starts_with("EU") || token.starts_with("EA")) && token.len() <= 5 && token.len() > 2;
    if heuristic_hit {
        return Some(CanonicalEntity {
            code: code.to_string(),
            iso2: None,
            iso3: None,
            kind: EntityKind::SupranationalAggregate,
            member_count: None,
            name_en: token.clone(),
            name_es: token,
        });
    }
    None
}

/// Strategy 2: exact ISO3 match in the static country table.
pub fn resolve_iso3(code: &str) -> Option<CanonicalEntity> {
    let token = normalize_code(code);
    if token.len() != 3 {
        return None;
    }
    COUNTRIES
        .iter()
        .find(|row| row.iso3 == token)
        .map(|row| country_entity(code, row))
}

/// Strategy 3: exact ISO2 match, accepting the Eurostat alias spellings.
pub fn resolve_iso2(code: &str) -> Option<CanonicalEntity> {
    let token = normalize_code(code);
    if token.len() != 2 {
        return None;
    }
    let canonical = ISO2_ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, iso2)| *iso2)
        .unwrap_or(token.as_str());
    COUNTRIES
        .iter()
        .find(|row| row.iso2 == canonical)
        .map(|row| country_entity(code, row))
}

/// Strategy 4: legacy ISO3 spellings cross-referenced to ISO2, then the
/// ISO2 table is retried.
pub fn resolve_cross_reference(code: &str) -> Option<CanonicalEntity> {
    let token = normalize_code(code);
    ISO3_TO_ISO2
        .iter()
        .find(|(iso3, _)| *iso3 == token)
        .and_then(|(_, iso2)| resolve_iso2(iso2))
        .map(|mut entity| {
            entity.code = code.to_string();
            entity
        })
}

/// Strategy 5: scan of the external flag/name reference list, matching by
/// code or iso3 field.
pub fn resolve_from_reference(code: &str, reference: &[ReferenceEntry]) -> Option<CanonicalEntity> {
    let entry = reference.iter().find(|entry| {
        entry.code.eq_ignore_ascii_case(code)
            || entry
                .iso3
                .as_deref()
                .is_some_and(|iso3| iso3.eq_ignore_ascii_case(code))
    })?;
    let name_en = entry
        .name_en
        .clone()
        .or_else(|| entry.name_es.clone())
        .unwrap_or_else(|| entry.code.clone());
    let name_es = entry
        .name_es
        .clone()
        .or_else(|| entry.name_en.clone())
        .unwrap_or_else(|| entry.code.clone());
    Some(CanonicalEntity {
        code: code.to_string(),
        iso2: None,
        iso3: entry.iso3.clone().map(|s| s.to_ascii_uppercase()),
        kind: EntityKind::Country,
        member_count: None,
        name_en,
        name_es,
    })
}

/// Strategy 6: nothing matched; keep the raw code visible rather than
/// dropping the row.
fn fallback_entity(code: &str) -> CanonicalEntity {
    CanonicalEntity {
        code: code.to_string(),
        iso2: None,
        iso3: None,
        kind: EntityKind::Country,
        member_count: None,
        name_en: code.to_string(),
        name_es: code.to_string(),
    }
}

fn country_entity(code: &str, row: &CountryRow) -> CanonicalEntity {
    CanonicalEntity {
        code: code.to_string(),
        iso2: Some(row.iso2.to_string()),
        iso3: Some(row.iso3.to_string()),
        kind: EntityKind::Country,
        member_count: None,
        name_en: row.name_en.to_string(),
        name_es: row.name_es.to_string(),
    }
}
