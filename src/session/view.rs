use std::path::Path;
use std::time::Duration;

use crate::foundation::error::{SurferError, SurferResult};
use crate::render::evaluator::SurfaceEvaluator;
use crate::scene::state::SceneState;
use crate::session::display::{DisplaySurface, max_render_size};
use crate::session::plan::SchedulerOpts;
use crate::session::scheduler::{ProgressiveScheduler, ShutdownMode};

/// Control-thread facade: owns the scene, the scheduler and the display.
///
/// Scene setters only record invalidations. [`process`](Self::process) (also run by the pump
/// methods) turns everything recorded since the last call into at most one new chain. A change
/// of the display's renderable size (attach, detach, resize) counts as an invalidation too.
pub struct SurfaceView<D: DisplaySurface> {
    scene: SceneState,
    scheduler: ProgressiveScheduler,
    display: D,
    last_size: Option<u32>,
}

impl<D: DisplaySurface> SurfaceView<D> {
    /// Create a view with an empty scene.
    pub fn new(
        evaluator: Box<dyn SurfaceEvaluator>,
        display: D,
        opts: SchedulerOpts,
    ) -> SurferResult<Self> {
        let last_size = display.layout_bounds().map(max_render_size);
        Ok(Self {
            scene: SceneState::new(),
            scheduler: ProgressiveScheduler::new(evaluator, opts)?,
            display,
            last_size,
        })
    }

    /// The scene.
    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    /// Mutable scene access; changes take effect on the next [`process`](Self::process).
    pub fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }

    /// The display.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Mutable display access (e.g. to change its layout bounds).
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &ProgressiveScheduler {
        &self.scheduler
    }

    /// Mutable scheduler access (reports, cancellation).
    pub fn scheduler_mut(&mut self) -> &mut ProgressiveScheduler {
        &mut self.scheduler
    }

    /// Scene validity.
    pub fn is_valid(&self) -> bool {
        self.scene.is_valid()
    }

    /// Last surfaced error, empty when none.
    pub fn error_message(&self) -> &str {
        self.scene.error_message()
    }

    /// Turn pending invalidations, or a changed display size, into a new chain. Returns whether
    /// a chain was started.
    pub fn process(&mut self) -> SurferResult<bool> {
        let size = self.display.layout_bounds().map(max_render_size);
        let changes = self.scene.take_invalidations();
        if changes.is_empty() && size == self.last_size {
            return Ok(false);
        }
        if size != self.last_size {
            tracing::debug!(from = ?self.last_size, to = ?size, "display size changed");
            self.last_size = size;
        }
        if !changes.is_empty() {
            tracing::debug!(?changes, "scene invalidated");
        }
        self.scheduler.trigger(&mut self.scene, &self.display)
    }

    /// [`process`](Self::process), then handle waiting worker events without blocking.
    pub fn pump(&mut self) -> SurferResult<usize> {
        self.process()?;
        Ok(self.scheduler.pump(&mut self.scene, &mut self.display))
    }

    /// [`process`](Self::process), then wait up to `timeout` for worker events.
    pub fn wait_and_pump(&mut self, timeout: Duration) -> SurferResult<usize> {
        self.process()?;
        self.scheduler
            .wait_and_pump(&mut self.scene, &mut self.display, timeout)
    }

    /// [`process`](Self::process), then block until every tier has been handled.
    pub fn run_until_idle(&mut self) -> SurferResult<()> {
        self.process()?;
        self.scheduler
            .run_until_idle(&mut self.scene, &mut self.display)
    }

    /// Load a scene description as one bulk update and trigger a single chain.
    ///
    /// On failure the scene is invalid, its message describes the problem, and the error is
    /// returned as well.
    pub fn load_from_str(&mut self, text: &str) -> SurferResult<()> {
        let loaded = self.scene.load_config_str(text);
        self.process()?;
        loaded
    }

    /// Read and load a scene file.
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> SurferResult<()> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => self.load_from_str(&text),
            Err(e) => {
                let err =
                    SurferError::config_load(format!("cannot read '{}': {e}", path.display()));
                self.scene.mark_invalid(&err);
                Err(err)
            }
        }
    }

    /// Serialize the scene in the scene-file format.
    pub fn save_to_string(&self) -> SurferResult<String> {
        Ok(self.scene.to_config()?.to_properties_string())
    }

    /// Write the scene to `path`.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> SurferResult<()> {
        let path = path.as_ref();
        let text = self.save_to_string()?;
        std::fs::write(path, text).map_err(|e| {
            SurferError::Other(anyhow::anyhow!("cannot write '{}': {e}", path.display()))
        })
    }

    /// Stop the worker. See [`ShutdownMode`].
    pub fn shutdown(&mut self, mode: ShutdownMode) -> SurferResult<()> {
        self.scheduler
            .shutdown(mode, &mut self.scene, &mut self.display)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/view.rs"]
mod tests;
