use std::collections::BTreeMap;

use crate::foundation::core::PixelBuffer;
use crate::foundation::error::SurferResult;
use crate::render::spec::AntiAliasing;
use crate::scene::state::SceneState;

/// A self-contained unit of pixel work, produced on the control thread by
/// [`SurfaceEvaluator::snapshot`] and executed exactly once on the worker.
///
/// A job owns its output buffer and a private copy of everything it reads, so executing it never
/// touches control-thread memory.
pub trait RenderJob: Send + 'static {
    /// Fill the owned buffer. Returns the elapsed wall time in seconds.
    fn execute(&mut self) -> SurferResult<f64>;

    /// Hand back the (possibly filled) output buffer.
    fn into_pixels(self: Box<Self>) -> PixelBuffer;
}

/// Surface evaluator/rasterizer. Lives on the control thread and is never shared across
/// threads; only the jobs it creates travel to the worker.
pub trait SurfaceEvaluator {
    /// Take over formula, parameters, orientation, camera, materials and lights from `scene`.
    ///
    /// Fails with [`SurferError::Formula`](crate::SurferError::Formula) when the formula does not
    /// compile or references a parameter without a value.
    fn configure(&mut self, scene: &SceneState) -> SurferResult<()>;

    /// Freeze the current configuration into a job that renders into `buffer`
    /// (`buffer.width x buffer.height` pixels).
    fn snapshot(&mut self, aa: AntiAliasing, buffer: PixelBuffer)
    -> SurferResult<Box<dyn RenderJob>>;

    /// Formula text of the last successful [`configure`](Self::configure).
    fn current_formula(&self) -> Option<&str>;

    /// Parameter values of the last successful [`configure`](Self::configure).
    fn current_parameters(&self) -> BTreeMap<String, f64>;
}
