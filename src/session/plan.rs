use serde::{Deserialize, Serialize};

use crate::foundation::error::{SurferError, SurferResult};
use crate::render::spec::{AntiAliasing, AntiAliasingMode, AntiAliasingPattern, RenderSpec, Tier};

/// Options controlling progressive chain planning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerOpts {
    /// Frame rate the first (low) tier should sustain.
    pub target_fps: f64,
    /// Lower bound for the low tier's side length.
    pub min_render_size: u32,
    /// Throughput assumed until the first low pass has been measured.
    pub initial_seconds_per_pixel: f64,
    /// Anti-aliasing of the low tier.
    pub low: AntiAliasing,
    /// Anti-aliasing of the medium tier.
    pub medium: AntiAliasing,
    /// Anti-aliasing of the high tier.
    pub high: AntiAliasing,
    /// Anti-aliasing of the ultra tier.
    pub ultra: AntiAliasing,
}

impl Default for SchedulerOpts {
    fn default() -> Self {
        use AntiAliasingMode::{AdaptiveSupersampling, Supersampling};
        use AntiAliasingPattern::{Og3x3, Og4x4, Quincunx};
        Self {
            target_fps: 30.0,
            min_render_size: 100,
            initial_seconds_per_pixel: 1e-4,
            low: AntiAliasing::new(AdaptiveSupersampling, Quincunx),
            medium: AntiAliasing::new(AdaptiveSupersampling, Og3x3),
            high: AntiAliasing::new(AdaptiveSupersampling, Og4x4),
            ultra: AntiAliasing::new(Supersampling, Og4x4),
        }
    }
}

impl SchedulerOpts {
    /// Anti-aliasing configured for `tier`.
    pub fn aa_for(&self, tier: Tier) -> AntiAliasing {
        match tier {
            Tier::Low => self.low,
            Tier::Medium => self.medium,
            Tier::High => self.high,
            Tier::Ultra => self.ultra,
        }
    }

    pub(crate) fn validate(&self) -> SurferResult<()> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(SurferError::validation("scheduler 'target_fps' must be > 0"));
        }
        if self.min_render_size == 0 {
            return Err(SurferError::validation(
                "scheduler 'min_render_size' must be >= 1",
            ));
        }
        if !(self.initial_seconds_per_pixel.is_finite() && self.initial_seconds_per_pixel >= 0.0) {
            return Err(SurferError::validation(
                "scheduler 'initial_seconds_per_pixel' must be >= 0",
            ));
        }
        Ok(())
    }
}

/// Measured render cost, used to size the next chain's low tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThroughputEstimate {
    seconds_per_pixel: f64,
}

impl ThroughputEstimate {
    /// Start from an assumed cost.
    pub fn new(seconds_per_pixel: f64) -> Self {
        Self { seconds_per_pixel }
    }

    /// Current estimate.
    pub fn seconds_per_pixel(&self) -> f64 {
        self.seconds_per_pixel
    }

    /// Overwrite the estimate with `elapsed / resolution²`. Unusable measurements (zero
    /// resolution, negative or non-finite time) leave it unchanged. Returns the new value.
    pub fn record(&mut self, elapsed_seconds: f64, resolution: u32) -> f64 {
        let pixels = f64::from(resolution) * f64::from(resolution);
        if pixels > 0.0 && elapsed_seconds.is_finite() && elapsed_seconds >= 0.0 {
            self.seconds_per_pixel = elapsed_seconds / pixels;
        }
        self.seconds_per_pixel
    }
}

/// One link of a chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PassKind {
    /// Render `spec` on the worker.
    Compute(RenderSpec),
    /// Placeholder that keeps the chain shape; runs nothing and reports the estimate it was
    /// planned with.
    Noop {
        /// Tier the placeholder stands in for.
        tier: Tier,
        /// Estimate reported in place of a measurement.
        seconds_per_pixel: f64,
    },
}

impl PassKind {
    /// Tier of this link.
    pub fn tier(&self) -> Tier {
        match self {
            PassKind::Compute(spec) => spec.tier,
            PassKind::Noop { tier, .. } => *tier,
        }
    }
}

/// The passes one invalidation produces, in execution order.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainPlan {
    /// Display side length the high and ultra tiers render at.
    pub max_size: u32,
    /// Side length of the low tier.
    pub low_res: u32,
    /// Low, medium, high and ultra, in that order.
    pub passes: [PassKind; 4],
}

/// Largest square side that renders within one frame at `target_fps`, clamped to
/// `[min_render_size, max_size]`.
///
/// When the display itself is smaller than `min_render_size`, the display size wins.
pub fn low_res_size(max_size: u32, opts: &SchedulerOpts, seconds_per_pixel: f64) -> u32 {
    let budget = (1.0 / (opts.target_fps * seconds_per_pixel)).sqrt();
    let upper = f64::from(max_size).min(budget);
    let size = upper.max(f64::from(opts.min_render_size)) as u32;
    size.min(max_size)
}

/// Plan the four tiers for a display of side `max_size` (must be >= 1).
pub fn plan_chain(max_size: u32, opts: &SchedulerOpts, seconds_per_pixel: f64) -> ChainPlan {
    let low_res = low_res_size(max_size, opts, seconds_per_pixel);
    let spec = |tier: Tier, resolution: u32| {
        PassKind::Compute(RenderSpec {
            tier,
            resolution,
            aa: opts.aa_for(tier),
        })
    };
    let medium = if low_res < max_size / 2 {
        spec(Tier::Medium, (max_size + low_res) / 2)
    } else {
        PassKind::Noop {
            tier: Tier::Medium,
            seconds_per_pixel,
        }
    };
    ChainPlan {
        max_size,
        low_res,
        passes: [
            spec(Tier::Low, low_res),
            medium,
            spec(Tier::High, max_size),
            spec(Tier::Ultra, max_size),
        ],
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/plan.rs"]
mod tests;
