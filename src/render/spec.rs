use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Quality tier of one pass in a progressive chain, in increasing quality order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Fast preview sized by the throughput estimate.
    Low,
    /// Intermediate size between `Low` and the display size.
    Medium,
    /// Display size, adaptive anti-aliasing.
    High,
    /// Display size, full supersampling.
    Ultra,
}

impl Tier {
    /// All tiers in chain order.
    pub const ALL: [Tier; 4] = [Tier::Low, Tier::Medium, Tier::High, Tier::Ultra];
}

/// How many sub-samples a pixel receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntiAliasingMode {
    /// One sample at the pixel center.
    None,
    /// Every pixel gets the full pattern.
    Supersampling,
    /// Pattern samples only where a pixel differs noticeably from its neighbours.
    AdaptiveSupersampling,
}

/// Spatial arrangement of the sub-samples inside a pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntiAliasingPattern {
    /// Center plus the four corners.
    Quincunx,
    /// Ordered 2x2 grid.
    Og2x2,
    /// Ordered 3x3 grid.
    Og3x3,
    /// Ordered 4x4 grid.
    Og4x4,
    /// Rotated 2x2 grid.
    Rg2x2,
}

/// One sub-sample: offset from the pixel center (in pixels) and its weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Horizontal offset in `[-0.5, 0.5]`.
    pub dx: f64,
    /// Vertical offset in `[-0.5, 0.5]`, positive downward.
    pub dy: f64,
    /// Weight; the weights of a pattern sum to one.
    pub weight: f64,
}

impl AntiAliasingPattern {
    /// Sample positions and weights.
    pub fn samples(self) -> SmallVec<[Sample; 16]> {
        match self {
            Self::Quincunx => {
                let mut out = SmallVec::new();
                out.push(Sample { dx: 0.0, dy: 0.0, weight: 0.5 });
                for (dx, dy) in [(-0.5, -0.5), (0.5, -0.5), (-0.5, 0.5), (0.5, 0.5)] {
                    out.push(Sample { dx, dy, weight: 0.125 });
                }
                out
            }
            Self::Og2x2 => ordered_grid(2),
            Self::Og3x3 => ordered_grid(3),
            Self::Og4x4 => ordered_grid(4),
            Self::Rg2x2 => [(0.125, -0.375), (0.375, 0.125), (-0.125, 0.375), (-0.375, -0.125)]
                .into_iter()
                .map(|(dx, dy)| Sample { dx, dy, weight: 0.25 })
                .collect(),
        }
    }
}

fn ordered_grid(n: usize) -> SmallVec<[Sample; 16]> {
    let step = 1.0 / n as f64;
    let weight = step * step;
    let mut out = SmallVec::new();
    for j in 0..n {
        for i in 0..n {
            out.push(Sample {
                dx: (i as f64 + 0.5) * step - 0.5,
                dy: (j as f64 + 0.5) * step - 0.5,
                weight,
            });
        }
    }
    out
}

/// Anti-aliasing setting of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiAliasing {
    /// Sampling strategy.
    pub mode: AntiAliasingMode,
    /// Sub-sample arrangement (ignored for [`AntiAliasingMode::None`]).
    pub pattern: AntiAliasingPattern,
}

impl AntiAliasing {
    /// Shorthand constructor.
    pub const fn new(mode: AntiAliasingMode, pattern: AntiAliasingPattern) -> Self {
        Self { mode, pattern }
    }
}

/// What to render for one pass: square side length and anti-aliasing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSpec {
    /// Quality tier the pass belongs to.
    pub tier: Tier,
    /// Output side length in pixels.
    pub resolution: u32,
    /// Anti-aliasing setting.
    pub aa: AntiAliasing,
}

#[cfg(test)]
#[path = "../../tests/unit/render/spec.rs"]
mod tests;
