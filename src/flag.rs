//! Observation flags: short codes annotating data-quality caveats.
//!
//! Codes compose letter by letter ("bd" = break in series + definition
//! differs) and carry a bilingual description for tooltips.

use serde::{Deserialize, Serialize};

use crate::locale::Language;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationFlag(String);

impl ObservationFlag {
    /// Accepts a raw flag cell; empty and placeholder cells yield `None`.
    pub fn parse(raw: &str) -> Option<ObservationFlag> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == ":" {
            return None;
        }
        Some(ObservationFlag(trimmed.to_ascii_lowercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Joins the description of each letter; unknown letters fall back to
    /// the letter itself so novel source codes still surface.
    pub fn description(&self, lang: Language) -> String {
        let parts: Vec<String> = self
            .0
            .chars()
            .map(|letter| match letter_description(letter, lang) {
                Some(text) => text.to_string(),
                None => letter.to_string(),
            })
            .collect();
        parts.join(", ")
    }
}

fn letter_description(letter: char, lang: Language) -> Option<&'static str> {
    let (en, es) = match letter {
        'b' => ("break in time series", "ruptura de serie"),
        'c' => ("confidential", "confidencial"),
        'd' => ("definition differs", "definición diferente"),
        'e' => ("estimated", "estimado"),
        'f' => ("forecast", "previsión"),
        'p' => ("provisional", "provisional"),
        'r' => ("revised", "revisado"),
        's' => ("estimate", "estimación"),
        'u' => ("low reliability", "baja fiabilidad"),
        _ => return None,
    };
    Some(match lang {
        Language::En => en,
        Language::Es => es,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_codes_join_descriptions() {
        let flag = ObservationFlag::parse("bd").expect("flag");
        assert_eq!(
            flag.description(Language::En),
            "break in time series, definition differs"
        );
        assert_eq!(
            flag.description(Language::Es),
            "ruptura de serie, definición diferente"
        );
    }

    #[test]
    fn empty_and_placeholder_cells_are_none() {
        assert_eq!(ObservationFlag::parse(""), None);
        assert_eq!(ObservationFlag::parse("  "), None);
        assert_eq!(ObservationFlag::parse(":"), None);
    }

    #[test]
    fn unknown_letter_falls_back_to_itself() {
        let flag = ObservationFlag::parse("x").expect("flag");
        assert_eq!(flag.description(Language::En), "x");
    }
}
