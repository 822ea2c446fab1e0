//! Bilingual (Spanish/English) fixed strings and number formatting.
//!
//! Every user-visible string the pipeline emits (rank text, comparison
//! lines, no-data markers) resolves through [`Language`]. The presentation
//! layer supplies the language; the core never hard-codes one.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    En,
}

impl Language {
    pub fn no_data(self) -> &'static str {
        match self {
            Language::Es => "Sin datos",
            Language::En => "No data",
        }
    }

    pub fn no_comparison(self) -> &'static str {
        match self {
            Language::Es => "Sin comparación disponible",
            Language::En => "No comparison available",
        }
    }

    /// Rank text over country entities only, e.g. "puesto 3 de 27".
    pub fn rank_text(self, rank: usize, total: usize) -> String {
        match self {
            Language::Es => format!("Puesto {rank} de {total}"),
            Language::En => format!("Rank {rank} of {total}"),
        }
    }

    /// Note attached to supranational aggregates whose value is total ÷ members.
    pub fn averaged_note(self) -> &'static str {
        match self {
            Language::Es => "media por país",
            Language::En => "per-country average",
        }
    }

    pub fn versus(self, name: &str) -> String {
        match self {
            Language::Es => format!("frente a {name}"),
            Language::En => format!("vs {name}"),
        }
    }

    pub fn versus_year(self, year: i32) -> String {
        match self {
            Language::Es => format!("respecto a {year}"),
            Language::En => format!("vs {year}"),
        }
    }

    /// Locale-aware decimal formatting with thousands separators:
    /// `12.345,6` in Spanish, `12,345.6` in English.
    pub fn format_value(self, value: f64) -> String {
        let (thousands, decimal) = match self {
            Language::Es => ('.', ','),
            Language::En => (',', '.'),
        };
        let rounded = (value.abs() * 10.0).round() / 10.0;
        let negative = value < 0.0 && rounded > 0.0;
        let integral = rounded.trunc() as u64;
        let fraction = ((rounded - rounded.trunc()) * 10.0).round() as u64;

        let digits = integral.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (idx, ch) in digits.chars().enumerate() {
            if idx > 0 && (digits.len() - idx).is_multiple_of(3) {
                grouped.push(thousands);
            }
            grouped.push(ch);
        }

        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push_str(&grouped);
        if fraction > 0 {
            out.push(decimal);
            out.push_str(&fraction.to_string());
        }
        out
    }

    /// Signed percentage, one decimal: `+12,3 %` / `+12.3%`.
    pub fn format_percent(self, percent: f64) -> String {
        let sign = if percent > 0.0 { "+" } else { "" };
        match self {
            Language::Es => format!("{sign}{} %", self.format_value(percent)),
            Language::En => format!("{sign}{}%", self.format_value(percent)),
        }
    }
}
