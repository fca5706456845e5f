//! Control-thread scene model: state, change events, camera, materials and scene files.

pub(crate) mod camera;
pub(crate) mod config;
pub(crate) mod dragger;
pub(crate) mod invalidation;
pub(crate) mod material;
pub(crate) mod state;

pub use camera::{Camera, CameraKind, optimal_distance};
pub use config::SceneConfig;
pub use dragger::RotateSphericalDragger;
pub use invalidation::Invalidation;
pub use material::{LightSource, LightStatus, MAX_LIGHTS, Material, default_lights};
pub use state::{SCALE_FACTOR, SceneState};
