use std::collections::BTreeMap;

use crate::expression::FORMULA_PARAMETERS;
use crate::foundation::core::Rgb;
use crate::foundation::error::{SurferError, SurferResult};
use crate::foundation::math::Mat4;
use crate::scene::camera::{Camera, CameraKind};
use crate::scene::config::SceneConfig;
use crate::scene::dragger::RotateSphericalDragger;
use crate::scene::invalidation::{Invalidation, InvalidationQueue};
use crate::scene::material::{LightSource, MAX_LIGHTS, Material, default_lights};

/// Name of the parameter holding the base-10 exponent of the uniform surface scale.
pub const SCALE_FACTOR: &str = "scale_factor";

/// Mutable scene description, owned by the control thread.
///
/// All mutation goes through setters, and every setter that changes what would be drawn records
/// an [`Invalidation`]. Nothing here triggers rendering directly: the owner drains
/// [`take_invalidations`](Self::take_invalidations) and decides.
#[derive(Clone, Debug)]
pub struct SceneState {
    formula: Option<String>,
    formula_valid: bool,
    error: Option<String>,
    parameters: BTreeMap<String, f64>,
    dragger: RotateSphericalDragger,
    front_color: Option<Rgb>,
    back_color: Option<Rgb>,
    front_material: Material,
    back_material: Material,
    camera: Camera,
    lights: Vec<LightSource>,
    background: Rgb,
    extra: BTreeMap<String, String>,
    invalidations: InvalidationQueue,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            formula: None,
            formula_valid: true,
            error: None,
            parameters: BTreeMap::from([(SCALE_FACTOR.to_owned(), 0.0)]),
            dragger: RotateSphericalDragger::default(),
            front_color: None,
            back_color: None,
            front_material: Material::default(),
            back_material: Material::default(),
            camera: Camera::default(),
            lights: default_lights(),
            background: Rgb::WHITE,
            extra: BTreeMap::new(),
            invalidations: InvalidationQueue::default(),
        }
    }
}

impl SceneState {
    /// Empty scene: no formula, no colors, hence not yet valid.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when formula and both colors are set and the formula last compiled cleanly.
    pub fn is_valid(&self) -> bool {
        self.formula.is_some()
            && self.front_color.is_some()
            && self.back_color.is_some()
            && self.formula_valid
    }

    /// Human-readable description of the last surfaced error, empty when there is none.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }

    /// Record `err` and mark the scene invalid until the formula or scene is replaced.
    pub fn mark_invalid(&mut self, err: &SurferError) {
        self.formula_valid = false;
        self.error = Some(err.to_string());
    }

    /// Surface a message without invalidating the scene (used for failed passes).
    pub fn set_error_message(&mut self, msg: impl Into<String>) {
        self.error = Some(msg.into());
    }

    /// Surface equation, if any.
    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    /// Replace the surface equation. Clears a previous formula error so the new text gets a
    /// chance to compile.
    pub fn set_formula(&mut self, formula: impl Into<String>) {
        let formula = formula.into();
        if self.formula.as_deref() == Some(formula.as_str()) && self.formula_valid {
            return;
        }
        self.formula = Some(formula);
        self.formula_valid = true;
        self.error = None;
        self.invalidations.record(Invalidation::Formula);
    }

    /// All parameter values, `scale_factor` included.
    pub fn parameters(&self) -> &BTreeMap<String, f64> {
        &self.parameters
    }

    /// Value of one parameter.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).copied()
    }

    /// Set a formula parameter (`a`..`d`) or `scale_factor`.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> SurferResult<()> {
        if name != SCALE_FACTOR && !FORMULA_PARAMETERS.contains(&name) {
            return Err(SurferError::validation(format!("unknown parameter '{name}'")));
        }
        if self.parameters.get(name) == Some(&value) {
            return Ok(());
        }
        self.parameters.insert(name.to_owned(), value);
        self.invalidations
            .record(Invalidation::Parameter(name.to_owned()));
        Ok(())
    }

    /// Base-10 exponent of the surface scale.
    pub fn scale_factor(&self) -> f64 {
        self.parameter(SCALE_FACTOR).unwrap_or(0.0)
    }

    /// Uniform scale transform `10^scale_factor`.
    pub fn scale_transform(&self) -> Mat4 {
        Mat4::uniform_scale(10f64.powf(self.scale_factor()))
    }

    /// Front material color.
    pub fn front_color(&self) -> Option<Rgb> {
        self.front_color
    }

    /// Set or clear the front material color.
    pub fn set_front_color(&mut self, color: Option<Rgb>) {
        if self.front_color != color {
            self.front_color = color;
            self.invalidations.record(Invalidation::FrontColor);
        }
    }

    /// Back material color.
    pub fn back_color(&self) -> Option<Rgb> {
        self.back_color
    }

    /// Set or clear the back material color.
    pub fn set_back_color(&mut self, color: Option<Rgb>) {
        if self.back_color != color {
            self.back_color = color;
            self.invalidations.record(Invalidation::BackColor);
        }
    }

    /// Surface orientation.
    pub fn rotation(&self) -> Mat4 {
        self.dragger.rotation()
    }

    /// Replace the surface orientation.
    pub fn set_rotation(&mut self, rotation: Mat4) {
        if self.dragger.rotation() != rotation {
            self.dragger.set_rotation(rotation);
            self.invalidations.record(Invalidation::Rotation);
        }
    }

    /// Begin a rotation gesture at pointer position `(x, y)`.
    pub fn start_drag(&mut self, x: f64, y: f64) {
        self.dragger.start_drag(x, y);
    }

    /// Continue a rotation gesture.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        if self.dragger.drag_to(x, y) {
            self.invalidations.record(Invalidation::Rotation);
        }
    }

    /// Finish a rotation gesture.
    pub fn end_drag(&mut self) {
        self.dragger.end_drag();
    }

    /// Current camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Switch projection; the camera is moved to its optimal distance.
    pub fn set_camera_kind(&mut self, kind: CameraKind) -> SurferResult<()> {
        self.set_camera(kind, self.camera.fov_y)
    }

    /// Change the vertical field of view (degrees).
    pub fn set_camera_fov(&mut self, fov_y: f64) -> SurferResult<()> {
        self.set_camera(self.camera.kind, fov_y)
    }

    fn set_camera(&mut self, kind: CameraKind, fov_y: f64) -> SurferResult<()> {
        let camera = Camera::new(kind, fov_y)?;
        if camera != self.camera {
            self.camera = camera;
            self.invalidations.record(Invalidation::Camera);
        }
        Ok(())
    }

    /// Front side reflectance.
    pub fn front_material(&self) -> &Material {
        &self.front_material
    }

    /// Back side reflectance.
    pub fn back_material(&self) -> &Material {
        &self.back_material
    }

    /// Replace both materials.
    pub fn set_materials(&mut self, front: Material, back: Material) {
        if self.front_material != front || self.back_material != back {
            self.front_material = front;
            self.back_material = back;
            self.invalidations.record(Invalidation::Materials);
        }
    }

    /// The `MAX_LIGHTS` light slots.
    pub fn lights(&self) -> &[LightSource] {
        &self.lights
    }

    /// Replace light slot `index`.
    pub fn set_light(&mut self, index: usize, light: LightSource) -> SurferResult<()> {
        let slot = self.lights.get_mut(index).ok_or_else(|| {
            SurferError::validation(format!("light index {index} out of range 0..{MAX_LIGHTS}"))
        })?;
        if *slot != light {
            *slot = light;
            self.invalidations.record(Invalidation::Lights);
        }
        Ok(())
    }

    /// Background color.
    pub fn background(&self) -> Rgb {
        self.background
    }

    /// Set the background color.
    pub fn set_background(&mut self, color: Rgb) {
        if self.background != color {
            self.background = color;
            self.invalidations.record(Invalidation::Background);
        }
    }

    /// Suppress per-field invalidations until the matching
    /// [`end_bulk_update`](Self::end_bulk_update). Calls nest.
    pub fn begin_bulk_update(&mut self) {
        self.invalidations.suppress();
    }

    /// End a bulk update. Leaving the outermost level records a single
    /// [`Invalidation::Loaded`].
    pub fn end_bulk_update(&mut self) {
        if self.invalidations.release() {
            self.invalidations.record(Invalidation::Loaded);
        }
    }

    /// `true` while inside a bulk update.
    pub fn is_repaint_suppressed(&self) -> bool {
        self.invalidations.is_suppressed()
    }

    /// `true` when invalidations are waiting to be taken.
    pub fn has_pending_invalidations(&self) -> bool {
        !self.invalidations.is_empty()
    }

    /// Drain pending invalidations in first-seen order, duplicates coalesced.
    pub fn take_invalidations(&mut self) -> Vec<Invalidation> {
        self.invalidations.drain()
    }

    /// Replace the whole scene with `cfg` as one bulk update.
    pub fn apply_config(&mut self, cfg: SceneConfig) -> SurferResult<()> {
        let camera = Camera::new(cfg.camera_kind, cfg.camera_fov_y)
            .map_err(|e| SurferError::config_load(e.to_string()))?;

        self.begin_bulk_update();
        self.formula = Some(cfg.surface_equation);
        self.formula_valid = true;
        self.error = None;
        self.parameters = cfg.parameters;
        self.parameters
            .insert(SCALE_FACTOR.to_owned(), cfg.scale_factor);
        self.dragger.set_rotation(cfg.rotation_matrix);
        self.front_color = Some(cfg.front_color);
        self.back_color = Some(cfg.back_color);
        self.front_material = cfg.front_material;
        self.back_material = cfg.back_material;
        self.camera = camera;
        self.lights = cfg.lights;
        self.lights.resize(MAX_LIGHTS, LightSource::default());
        self.background = cfg.background_color;
        self.extra = cfg.extra;
        self.end_bulk_update();
        Ok(())
    }

    /// Parse and apply a scene description. On failure the scene is marked invalid with the
    /// error's message and a single [`Invalidation::Loaded`] is still recorded.
    pub fn load_config_str(&mut self, text: &str) -> SurferResult<()> {
        self.begin_bulk_update();
        let result = SceneConfig::from_properties_str(text).and_then(|cfg| self.apply_config(cfg));
        if let Err(e) = &result {
            tracing::warn!(error = %e, "scene load failed");
            self.mark_invalid(e);
        }
        self.end_bulk_update();
        result
    }

    /// Snapshot the scene as a [`SceneConfig`]. Fails when formula or colors are unset.
    pub fn to_config(&self) -> SurferResult<SceneConfig> {
        let missing = |what: &str| SurferError::validation(format!("scene has no {what}"));
        let surface_equation = self.formula.clone().ok_or_else(|| missing("formula"))?;
        let front_color = self.front_color.ok_or_else(|| missing("front color"))?;
        let back_color = self.back_color.ok_or_else(|| missing("back color"))?;
        let parameters = self
            .parameters
            .iter()
            .filter(|(k, _)| k.as_str() != SCALE_FACTOR)
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        Ok(SceneConfig {
            surface_equation,
            parameters,
            camera_kind: self.camera.kind,
            camera_fov_y: self.camera.fov_y,
            front_color,
            back_color,
            front_material: self.front_material,
            back_material: self.back_material,
            lights: self.lights.clone(),
            background_color: self.background,
            scale_factor: self.scale_factor(),
            rotation_matrix: self.rotation(),
            extra: self.extra.clone(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/state.rs"]
mod tests;
