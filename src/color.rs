//! Color scale mapper: value → fill color, per sector, driven by the
//! filtered value statistics.
//!
//! Scale selection follows the dynamic range: when `max/min` exceeds
//! [`LOG_RATIO_THRESHOLD`] the scale turns logarithmic, because a linear
//! scale compresses visual distinction when a few large economies dominate
//! a long tail of small values. Otherwise the scale is piecewise-linear
//! over the five quartile breakpoints.
//!
//! Palettes derive deterministically from a base hue per sector, stepped at
//! fixed lightness intensities from light (MIN) to dark (MAX). A YAML file
//! can override any sector's bands.

use std::{collections::HashMap, fmt, fs, path::Path};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize, Serializer};

use crate::{sector::Sector, stats::ValueStatistics};

/// Dynamic-range ratio above which the logarithmic scale is used.
pub const LOG_RATIO_THRESHOLD: f64 = 15.0;

/// Floor for the logarithmic domain, so a tiny minimum cannot stretch the
/// scale into meaningless precision.
const LOG_DOMAIN_FLOOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn from_hex(raw: &str) -> Result<Self> {
        let hex = raw.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("Invalid hex color '{raw}'"));
        }
        Ok(Self {
            r: u8::from_str_radix(&hex[0..2], 16)?,
            g: u8::from_str_radix(&hex[2..4], 16)?,
            b: u8::from_str_radix(&hex[4..6], 16)?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// No-data fill, distinct from the zero fill.
pub const NO_DATA: Rgb = Rgb::new(0xc0, 0xc0, 0xc0);
/// Fill for an explicit zero value.
pub const ZERO: Rgb = Rgb::new(0xf2, 0xf2, 0xf2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    /// Five bands, light (MIN) to dark (MAX).
    pub bands: [Rgb; 5],
    pub no_data: Rgb,
    pub zero: Rgb,
}

impl Palette {
    pub fn from_bands(bands: [Rgb; 5]) -> Self {
        Self { bands, no_data: NO_DATA, zero: ZERO }
    }

    /// Deterministic per-sector palette: the sector's base hue at fixed
    /// lightness steps.
    pub fn for_sector(sector: Sector) -> Self {
        let hue = sector_base_hue(sector);
        let mut bands = [NO_DATA; 5];
        for (band, lightness) in LIGHTNESS_STEPS.iter().enumerate() {
            bands[band] = hsl_to_rgb(hue, BAND_SATURATION, *lightness);
        }
        Self::from_bands(bands)
    }
}

const LIGHTNESS_STEPS: [f64; 5] = [0.88, 0.72, 0.56, 0.40, 0.26];
const BAND_SATURATION: f64 = 0.62;

fn sector_base_hue(sector: Sector) -> f64 {
    match sector {
        Sector::Total => 210.0,
        Sector::Business => 28.0,
        Sector::Government => 350.0,
        Sector::Education => 140.0,
        Sector::NonProfit => 275.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    Linear,
    Logarithmic,
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScaleMode::Linear => "linear",
            ScaleMode::Logarithmic => "logarithmic",
        })
    }
}

pub fn scale_mode(statistics: &ValueStatistics) -> ScaleMode {
    if statistics.range_ratio() > LOG_RATIO_THRESHOLD {
        ScaleMode::Logarithmic
    } else {
        ScaleMode::Linear
    }
}

/// Maps a value to its fill color. `None` is "no data"; zero gets its own
/// color so it never blends into the low end of the gradient.
pub fn color_for(value: Option<f64>, statistics: &ValueStatistics, palette: &Palette) -> Rgb {
    let Some(value) = value else {
        return palette.no_data;
    };
    if value == 0.0 {
        return palette.zero;
    }
    match scale_mode(statistics) {
        ScaleMode::Logarithmic => logarithmic_color(value, statistics, palette),
        ScaleMode::Linear => piecewise_linear_color(value, statistics, palette),
    }
}

/// Two-point gradient [MIN, MAX] over a log domain from `max(min, 0.1)` to
/// `max`, clamped at both ends.
fn logarithmic_color(value: f64, statistics: &ValueStatistics, palette: &Palette) -> Rgb {
    let low = statistics.min.max(LOG_DOMAIN_FLOOR);
    let high = statistics.max;
    if high <= low {
        return palette.bands[4];
    }
    let position = (value.max(low).ln() - low.ln()) / (high.ln() - low.ln());
    lerp(palette.bands[0], palette.bands[4], position.clamp(0.0, 1.0))
}

/// Five-color gradient whose domain breakpoints are the quartile values,
/// clamped at both ends.
fn piecewise_linear_color(value: f64, statistics: &ValueStatistics, palette: &Palette) -> Rgb {
    let quartiles = &statistics.quartiles;
    if value >= quartiles[4] {
        return palette.bands[4];
    }
    if value <= quartiles[0] {
        return palette.bands[0];
    }
    for segment in 0..4 {
        let (lo, hi) = (quartiles[segment], quartiles[segment + 1]);
        if value <= hi {
            let span = hi - lo;
            let position = if span > 0.0 { (value - lo) / span } else { 0.0 };
            return lerp(palette.bands[segment], palette.bands[segment + 1], position);
        }
    }
    palette.bands[4]
}

fn lerp(from: Rgb, to: Rgb, position: f64) -> Rgb {
    let t = position.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| -> u8 {
        (a as f64 + (b as f64 - a as f64) * t).round() as u8
    };
    Rgb::new(
        channel(from.r, to.r),
        channel(from.g, to.g),
        channel(from.b, to.b),
    )
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgb {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let hue_prime = (hue.rem_euclid(360.0)) / 60.0;
    let x = chroma * (1.0 - (hue_prime.rem_euclid(2.0) - 1.0).abs());
    let (r1, g1, b1) = match hue_prime as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(to_byte(r1), to_byte(g1), to_byte(b1))
}

/// YAML palette overrides: sector short code → five hex bands.
///
/// ```yaml
/// TOTAL: ["#eef5fb", "#b8d4ec", "#7fb0da", "#3f7fb8", "#1d4e7e"]
/// ```
#[derive(Debug, Deserialize)]
pub struct PaletteConfig(HashMap<String, [String; 5]>);

pub fn load_palette_overrides(path: &Path) -> Result<HashMap<Sector, Palette>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Reading palette file {path:?}"))?;
    let config: PaletteConfig = serde_yaml::from_str(&text)
        .with_context(|| format!("Parsing palette file {path:?}"))?;
    let mut palettes = HashMap::new();
    for (key, hex_bands) in config.0 {
        let sector = Sector::parse_selector(&key)
            .ok_or_else(|| anyhow!("Unknown sector '{key}' in palette file"))?;
        let mut bands = [NO_DATA; 5];
        for (idx, hex) in hex_bands.iter().enumerate() {
            bands[idx] = Rgb::from_hex(hex)
                .with_context(|| format!("Palette band {idx} for sector '{key}'"))?;
        }
        palettes.insert(sector, Palette::from_bands(bands));
    }
    Ok(palettes)
}

/// The palette for a sector, honoring any override loaded from disk.
pub fn palette_for(sector: Sector, overrides: &HashMap<Sector, Palette>) -> Palette {
    overrides
        .get(&sector)
        .copied()
        .unwrap_or_else(|| Palette::for_sector(sector))
}
