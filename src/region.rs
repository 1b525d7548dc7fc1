//! Spatial anchors and the color/region pairing rules.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// A normalized anchor point inside the displayed media, both axes in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegionRepr")]
pub struct Region {
    pub x: f32,
    pub y: f32,
}

#[derive(Deserialize)]
struct RegionRepr {
    x: f32,
    y: f32,
}

impl From<RegionRepr> for Region {
    fn from(repr: RegionRepr) -> Self {
        Region::new(repr.x, repr.y)
    }
}

impl Region {
    /// The synthetic anchor used when a color arrives without a region.
    pub const CENTER: Region = Region { x: 0.5, y: 0.5 };

    /// Create a region, clamping both axes into [0, 1]. NaN collapses to the center.
    pub fn new(x: f32, y: f32) -> Self {
        fn axis(v: f32) -> f32 {
            if v.is_nan() {
                0.5
            } else {
                v.clamp(0.0, 1.0)
            }
        }
        Self {
            x: axis(x),
            y: axis(y),
        }
    }

    /// Resolve the region for pair index `i` using the three-tier fallback:
    /// the primary block, then the contiguous secondary block, then the center.
    pub fn resolve(i: usize, primary: &[Region], secondary: &[Region]) -> Region {
        if let Some(region) = primary.get(i) {
            *region
        } else if let Some(region) = i
            .checked_sub(primary.len())
            .and_then(|j| secondary.get(j))
        {
            *region
        } else {
            Region::CENTER
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Region::CENTER
    }
}

/// A color bound to the spot in the media it was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub color: Color,
    pub region: Region,
}

impl Pair {
    pub fn new(color: Color, region: Region) -> Self {
        Self { color, region }
    }
}

/// Pair every color with a region, falling back from `primary` to `secondary`
/// to the center point. Passing an empty `secondary` gives a plain zip.
pub fn pair_up(colors: &[Color], primary: &[Region], secondary: &[Region]) -> Vec<Pair> {
    colors
        .iter()
        .enumerate()
        .map(|(i, &color)| Pair::new(color, Region::resolve(i, primary, secondary)))
        .collect()
}
