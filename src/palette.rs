//! Colors - group registry and continuous scale
//!
//! - `GroupPalette`: fixed group id -> color mapping with a fallback
//! - `ColorScale`: fixed-range normalization through the viridis gradient

use anyhow::{bail, Result};
use std::collections::BTreeMap;

/// Group identifier as read from the `Group` column
pub type GroupId = i64;

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GRAY: Rgb = Rgb::new(128, 128, 128);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional) or the names `gray`/`grey`
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("gray") || text.eq_ignore_ascii_case("grey") {
            return Ok(Self::GRAY);
        }

        let hex = text.strip_prefix('#').unwrap_or(text);
        if hex.len() != 6 || !hex.is_ascii() {
            bail!("Invalid color '{}': expected #rrggbb", text);
        }

        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| anyhow::anyhow!("Invalid color '{}': bad hex digits", text))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear blend, `t = 0` gives `self`
    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// Default group colors, ids 1..=8
pub const DEFAULT_GROUP_COLORS: [(GroupId, &str); 8] = [
    (1, "#1f77b4"),
    (2, "#2ca02c"),
    (3, "#9467bd"),
    (4, "#17becf"),
    (5, "#e377c2"),
    (6, "#8c564b"),
    (7, "#d62728"),
    (8, "#ff7f0e"),
];

/// Immutable group id -> color registry
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPalette {
    colors: BTreeMap<GroupId, Rgb>,
    fallback: Rgb,
}

impl GroupPalette {
    pub fn new(colors: BTreeMap<GroupId, Rgb>, fallback: Rgb) -> Self {
        Self { colors, fallback }
    }

    /// Build from hex strings, failing on the first malformed entry
    pub fn from_hex<'a, I>(entries: I, fallback: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (GroupId, &'a str)>,
    {
        let mut colors = BTreeMap::new();
        for (id, hex) in entries {
            let color = Rgb::parse(hex)
                .map_err(|e| anyhow::anyhow!("Group {}: {}", id, e))?;
            colors.insert(id, color);
        }
        Ok(Self::new(colors, Rgb::parse(fallback)?))
    }

    /// Registered color, or the fallback for unknown ids
    pub fn color_of(&self, group: GroupId) -> Rgb {
        self.colors.get(&group).copied().unwrap_or(self.fallback)
    }

    pub fn contains(&self, group: GroupId) -> bool {
        self.colors.contains_key(&group)
    }

    /// Registered ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.colors.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn fallback(&self) -> Rgb {
        self.fallback
    }
}

impl Default for GroupPalette {
    fn default() -> Self {
        let colors = DEFAULT_GROUP_COLORS
            .iter()
            .filter_map(|&(id, hex)| Rgb::parse(hex).ok().map(|c| (id, c)))
            .collect();
        Self::new(colors, Rgb::GRAY)
    }
}

/// Viridis gradient, 11 evenly spaced stops
const VIRIDIS: [Rgb; 11] = [
    Rgb::new(68, 1, 84),
    Rgb::new(72, 36, 117),
    Rgb::new(65, 68, 135),
    Rgb::new(53, 95, 141),
    Rgb::new(42, 120, 142),
    Rgb::new(33, 145, 140),
    Rgb::new(34, 168, 132),
    Rgb::new(68, 191, 112),
    Rgb::new(122, 209, 81),
    Rgb::new(189, 223, 38),
    Rgb::new(253, 231, 37),
];

/// Sample the viridis gradient at `t` in [0, 1] (clamped)
pub fn viridis(t: f64) -> Rgb {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    VIRIDIS[lo].lerp(VIRIDIS[lo + 1], scaled - lo as f64)
}

/// Fixed-range continuous color scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub const DEFAULT_MIN: f64 = -0.05;
    pub const DEFAULT_MAX: f64 = 0.30;

    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) || min >= max {
            bail!("Invalid color scale range [{}, {}]", min, max);
        }
        Ok(Self { min, max })
    }

    /// Position of `value` within the range, clamped to [0, 1]
    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    pub fn color_of(&self, value: f64) -> Rgb {
        viridis(self.normalize(value))
    }
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}
