use crate::foundation::error::{SurferError, SurferResult};
use crate::foundation::math::{Mat4, Vec3};

/// Projection used to generate primary rays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CameraKind {
    /// Parallel rays along `-z`.
    Orthographic,
    /// Rays through a pinhole with vertical field of view `fov_y`.
    Perspective,
}

impl CameraKind {
    /// Parse the scene-file spelling (`ORTHOGRAPHIC_CAMERA` / `PERSPECTIVE_CAMERA`).
    ///
    /// The short forms `orthographic` / `perspective` are accepted in any case.
    pub fn from_config_str(s: &str) -> SurferResult<Self> {
        let t = s.trim();
        match t.to_ascii_uppercase().as_str() {
            "ORTHOGRAPHIC_CAMERA" | "ORTHOGRAPHIC" => Ok(Self::Orthographic),
            "PERSPECTIVE_CAMERA" | "PERSPECTIVE" => Ok(Self::Perspective),
            _ => Err(SurferError::unknown_camera_type(t)),
        }
    }

    /// Scene-file spelling.
    pub fn as_config_str(self) -> &'static str {
        match self {
            Self::Orthographic => "ORTHOGRAPHIC_CAMERA",
            Self::Perspective => "PERSPECTIVE_CAMERA",
        }
    }
}

/// Camera placed on the `+z` axis looking at the origin.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Camera {
    /// Projection kind.
    pub kind: CameraKind,
    /// Vertical field of view in degrees (perspective only).
    pub fov_y: f64,
    /// Camera-to-world transform, see [`Camera::look_at`].
    pub transform: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            kind: CameraKind::Orthographic,
            fov_y: 60.0,
            transform: placement(1.0),
        }
    }
}

impl Camera {
    /// Create a camera of the given kind, placed at its optimal distance.
    pub fn new(kind: CameraKind, fov_y: f64) -> SurferResult<Self> {
        let mut cam = Self {
            kind,
            fov_y,
            transform: Mat4::IDENTITY,
        };
        cam.set_optimal_distance()?;
        Ok(cam)
    }

    /// Point the camera from `eye` toward `target`.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.transform = Mat4::look_at(eye, target, up);
    }

    /// Camera position in world space.
    pub fn eye(&self) -> Vec3 {
        self.transform.transform_point(Vec3::ZERO)
    }

    /// Move the camera to `(0, 0, d)` looking toward `(0, 0, -1)` with `+y` up, where `d` is
    /// [`optimal_distance`].
    pub fn set_optimal_distance(&mut self) -> SurferResult<()> {
        self.transform = placement(optimal_distance(self.kind, self.fov_y)?);
        Ok(())
    }
}

fn placement(distance: f64) -> Mat4 {
    Mat4::look_at(
        Vec3::new(0.0, 0.0, distance),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(0.0, 1.0, 0.0),
    )
}

/// Distance at which the unit sphere fits entirely inside the view.
///
/// Orthographic: `1`. Perspective: `1 / sin(pi * fov_y / 360)`.
pub fn optimal_distance(kind: CameraKind, fov_y: f64) -> SurferResult<f64> {
    match kind {
        CameraKind::Orthographic => Ok(1.0),
        CameraKind::Perspective => {
            if !(fov_y > 0.0 && fov_y < 180.0) {
                return Err(SurferError::validation(format!(
                    "perspective fov_y must be in (0, 180) degrees, got {fov_y}"
                )));
            }
            Ok(1.0 / (std::f64::consts::PI * fov_y / 360.0).sin())
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/camera.rs"]
mod tests;
