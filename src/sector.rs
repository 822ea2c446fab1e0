//! Sector-of-performance enum and the alias table that normalizes source
//! spellings into it.
//!
//! Source tables disagree on how sectors are labelled: short codes
//! (`TOTAL`, `BES`, `GOV`, `HES`, `PNP`), long English names
//! ("Business enterprise sector"), "All Sectors", and hyphen/case variants.
//! All of them normalize here, at the ingestion/selector boundary; nothing
//! downstream ever branches on a raw sector string.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::locale::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sector {
    Total,
    Business,
    Government,
    Education,
    NonProfit,
}

impl Sector {
    pub const ALL: [Sector; 5] = [
        Sector::Total,
        Sector::Business,
        Sector::Government,
        Sector::Education,
        Sector::NonProfit,
    ];

    pub fn short_code(self) -> &'static str {
        match self {
            Sector::Total => "TOTAL",
            Sector::Business => "BES",
            Sector::Government => "GOV",
            Sector::Education => "HES",
            Sector::NonProfit => "PNP",
        }
    }

    pub fn label(self, lang: Language) -> &'static str {
        match (self, lang) {
            (Sector::Total, Language::En) => "All sectors",
            (Sector::Total, Language::Es) => "Todos los sectores",
            (Sector::Business, Language::En) => "Business enterprise sector",
            (Sector::Business, Language::Es) => "Sector empresarial",
            (Sector::Government, Language::En) => "Government sector",
            (Sector::Government, Language::Es) => "Administración pública",
            (Sector::Education, Language::En) => "Higher education sector",
            (Sector::Education, Language::Es) => "Enseñanza superior",
            (Sector::NonProfit, Language::En) => "Private non-profit sector",
            (Sector::NonProfit, Language::Es) => "Instituciones privadas sin fines de lucro",
        }
    }

    /// Resolves any known source spelling to a sector. Matching is
    /// case-insensitive and treats hyphens/underscores as spaces.
    pub fn parse_selector(raw: &str) -> Option<Sector> {
        let key = normalize_token(raw);
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, sector)| *sector)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_code())
    }
}

/// Alias table, normalized form → sector. Exhaustive over the spellings the
/// known source tables use; extend here, never in call sites.
const ALIASES: &[(&str, Sector)] = &[
    ("total", Sector::Total),
    ("all sectors", Sector::Total),
    ("todos los sectores", Sector::Total),
    ("bes", Sector::Business),
    ("business", Sector::Business),
    ("business enterprise", Sector::Business),
    ("business enterprise sector", Sector::Business),
    ("sector empresarial", Sector::Business),
    ("gov", Sector::Government),
    ("government", Sector::Government),
    ("government sector", Sector::Government),
    ("administracion publica", Sector::Government),
    ("hes", Sector::Education),
    ("higher education", Sector::Education),
    ("higher education sector", Sector::Education),
    ("ensenanza superior", Sector::Education),
    ("pnp", Sector::NonProfit),
    ("non profit", Sector::NonProfit),
    ("private non profit", Sector::NonProfit),
    ("private non profit sector", Sector::NonProfit),
];

fn normalize_token(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = true;
    for ch in raw.trim().chars() {
        let mapped = match ch {
            '-' | '_' => ' ',
            // Strip accents the Spanish labels carry.
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' => 'u',
            'ñ' | 'Ñ' => 'n',
            other => other.to_ascii_lowercase(),
        };
        if mapped == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(mapped);
            last_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}
