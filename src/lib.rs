//! Surfer renders real algebraic surfaces `f(x, y, z) = 0` progressively.
//!
//! Every scene change starts a fresh chain of passes at increasing quality: a low tier sized to
//! stay interactive, then medium, high and ultra tiers at the display's full size. Passes run on
//! a single background worker; scene snapshots and frame publishing stay on the control thread.
//!
//! - Describe the surface in a [`SceneState`] (or load a `.jsurf` scene file)
//! - Pick an evaluator, e.g. the reference [`CpuEvaluator`]
//! - Drive a [`SurfaceView`] against any [`DisplaySurface`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod expression;
/// Pass descriptions, evaluators and the reference CPU ray caster.
pub mod render;
/// Control-thread scene model.
pub mod scene;
/// Progressive scheduling and display publishing.
pub mod session;

pub use crate::expression::{FORMULA_PARAMETERS, SurfaceProgram};
pub use crate::foundation::core::{PixelBuffer, PixelFormat, Rect, Rgb};
pub use crate::foundation::error::{SurferError, SurferResult};
pub use crate::foundation::math::{Mat4, Vec3};

pub use crate::render::{CpuEvaluator, CpuEvaluatorOpts, SurfaceEvaluator, Tier};
pub use crate::scene::{SceneConfig, SceneState};
pub use crate::session::{
    DisplaySurface, MemoryDisplay, PassReport, ProgressiveScheduler, SchedulerOpts,
    SchedulerState, ShutdownMode, SurfaceView, SurferOpts,
};
