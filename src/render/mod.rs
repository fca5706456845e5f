//! Pass descriptions, the evaluator contract and the reference CPU evaluator.

pub(crate) mod adapter;
pub(crate) mod cpu;
pub(crate) mod evaluator;
pub(crate) mod spec;

pub use adapter::{CapturedPass, PassOutput, capture_snapshot, render};
pub use cpu::{CpuEvaluator, CpuEvaluatorOpts};
pub use evaluator::{RenderJob, SurfaceEvaluator};
pub use spec::{AntiAliasing, AntiAliasingMode, AntiAliasingPattern, RenderSpec, Sample, Tier};
