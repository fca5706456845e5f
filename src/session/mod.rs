//! Progressive scheduling: chain planning, the render worker, frame publishing and the
//! control-thread [`SurfaceView`] facade.

pub(crate) mod display;
pub(crate) mod opts;
pub(crate) mod plan;
pub(crate) mod scheduler;
pub(crate) mod view;
pub(crate) mod worker;

pub use display::{DisplayPublisher, DisplaySurface, MemoryDisplay, max_render_size};
pub use opts::SurferOpts;
pub use plan::{ChainPlan, PassKind, SchedulerOpts, ThroughputEstimate, low_res_size, plan_chain};
pub use scheduler::{PassReport, ProgressiveScheduler, SchedulerState, ShutdownMode};
pub use view::SurfaceView;
