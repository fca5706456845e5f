//! Capture on the control thread, compute on the worker.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::foundation::core::PixelBuffer;
use crate::foundation::error::{SurferError, SurferResult};
use crate::render::evaluator::{RenderJob, SurfaceEvaluator};
use crate::render::spec::RenderSpec;
use crate::scene::state::SceneState;

/// A [`RenderSpec`] together with the job that will compute it.
pub struct CapturedPass {
    /// What the pass renders.
    pub spec: RenderSpec,
    job: Box<dyn RenderJob>,
}

impl std::fmt::Debug for CapturedPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedPass")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Result of [`render`].
#[derive(Clone, Debug)]
pub struct PassOutput {
    /// What was rendered.
    pub spec: RenderSpec,
    /// `resolution x resolution` ARGB pixels.
    pub pixels: PixelBuffer,
    /// Wall time spent in the evaluator.
    pub elapsed_seconds: f64,
}

/// Copy scene state into a job for `spec`. Control thread only.
///
/// The destination buffer (`resolution²` pixels) is allocated here.
pub fn capture_snapshot(
    evaluator: &mut dyn SurfaceEvaluator,
    scene: &SceneState,
    spec: RenderSpec,
) -> SurferResult<CapturedPass> {
    if spec.resolution == 0 {
        return Err(SurferError::validation("pass resolution must be >= 1"));
    }
    evaluator.configure(scene)?;
    let job = evaluator.snapshot(spec.aa, PixelBuffer::square(spec.resolution))?;
    Ok(CapturedPass { spec, job })
}

/// Execute a captured pass. Safe to call on any thread; reads nothing but `pass`.
///
/// A panicking evaluator is reported as [`SurferError::PassExecution`].
pub fn render(pass: CapturedPass) -> SurferResult<PassOutput> {
    let CapturedPass { spec, mut job } = pass;
    let elapsed_seconds = match catch_unwind(AssertUnwindSafe(|| job.execute())) {
        Ok(Ok(elapsed)) => elapsed,
        Ok(Err(SurferError::PassExecution(msg))) => return Err(SurferError::PassExecution(msg)),
        Ok(Err(e)) => return Err(SurferError::pass_execution(e.to_string())),
        Err(payload) => {
            return Err(SurferError::pass_execution(format!(
                "evaluator panicked: {}",
                panic_message(payload.as_ref())
            )));
        }
    };
    let pixels = job.into_pixels();
    if pixels.width != spec.resolution || pixels.height != spec.resolution {
        return Err(SurferError::pass_execution(format!(
            "evaluator returned {}x{} pixels for a {}px pass",
            pixels.width, pixels.height, spec.resolution
        )));
    }
    Ok(PassOutput {
        spec,
        pixels,
        elapsed_seconds,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/adapter.rs"]
mod tests;
