use crate::foundation::math::Mat4;

/// Turns pointer drags into an accumulated rotation.
///
/// Horizontal motion spins the surface about the world Y axis, vertical motion about the world
/// X axis. Each step is applied on top of the current rotation, so long drags compose.
#[derive(Clone, Debug, PartialEq)]
pub struct RotateSphericalDragger {
    rotation: Mat4,
    last: Option<(f64, f64)>,
    radians_per_pixel: f64,
}

impl Default for RotateSphericalDragger {
    fn default() -> Self {
        Self {
            rotation: Mat4::IDENTITY,
            last: None,
            radians_per_pixel: std::f64::consts::PI / 360.0,
        }
    }
}

impl RotateSphericalDragger {
    /// Current orientation.
    pub fn rotation(&self) -> Mat4 {
        self.rotation
    }

    /// Replace the orientation (e.g. from a scene file). Ends any drag in progress.
    pub fn set_rotation(&mut self, rotation: Mat4) {
        self.rotation = rotation;
        self.last = None;
    }

    /// Rotation speed in radians per pixel of pointer travel.
    pub fn set_speed(&mut self, radians_per_pixel: f64) {
        self.radians_per_pixel = radians_per_pixel;
    }

    /// Anchor a drag at pointer position `(x, y)`.
    pub fn start_drag(&mut self, x: f64, y: f64) {
        self.last = Some((x, y));
    }

    /// Continue a drag. Returns `false` (and does nothing) without a preceding
    /// [`start_drag`](Self::start_drag) or when the pointer did not move.
    pub fn drag_to(&mut self, x: f64, y: f64) -> bool {
        let Some((lx, ly)) = self.last else {
            return false;
        };
        self.last = Some((x, y));
        let (dx, dy) = (x - lx, y - ly);
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        // screen y grows downward; dragging down tips the top toward the viewer
        let step = Mat4::rotation_y(dx * self.radians_per_pixel)
            .mul(&Mat4::rotation_x(dy * self.radians_per_pixel));
        self.rotation = step.mul(&self.rotation);
        true
    }

    /// Finish the current drag.
    pub fn end_drag(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/dragger.rs"]
mod tests;
