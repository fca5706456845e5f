use crate::foundation::core::Rgb;
use crate::foundation::error::{SurferError, SurferResult};
use crate::foundation::math::Vec3;

/// Maximum number of light sources a scene can carry.
pub const MAX_LIGHTS: usize = 9;

/// Phong-style reflectance of one side of the surface. The base color lives on
/// [`SceneState`](crate::SceneState) so it can be unset independently.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Material {
    /// Fraction of the base color always visible.
    pub ambient_intensity: f32,
    /// Lambert term weight.
    pub diffuse_intensity: f32,
    /// Highlight weight.
    pub specular_intensity: f32,
    /// Highlight exponent.
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.4,
            diffuse_intensity: 0.8,
            specular_intensity: 0.5,
            shininess: 30.0,
        }
    }
}

/// Whether a light contributes to shading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LightStatus {
    /// Lit.
    On,
    /// Ignored while shading.
    #[default]
    Off,
}

impl LightStatus {
    pub(crate) fn from_config_str(s: &str) -> SurferResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            other => Err(SurferError::config_load(format!(
                "light status must be ON or OFF, got '{other}'"
            ))),
        }
    }

    pub(crate) fn as_config_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

/// Point light in world space.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LightSource {
    /// On/off switch.
    pub status: LightStatus,
    /// Position in world space.
    pub position: Vec3,
    /// Light color.
    pub color: Rgb,
    /// Scales `color`.
    pub intensity: f32,
}

impl Default for LightSource {
    fn default() -> Self {
        Self {
            status: LightStatus::Off,
            position: Vec3::new(0.0, 0.0, 10.0),
            color: Rgb::WHITE,
            intensity: 1.0,
        }
    }
}

impl LightSource {
    /// `true` when the light contributes to shading.
    pub fn is_on(&self) -> bool {
        self.status == LightStatus::On
    }
}

/// Light rig used before any scene file is loaded: a key light, a fill light and a dim rim.
pub fn default_lights() -> Vec<LightSource> {
    let mut lights = vec![LightSource::default(); MAX_LIGHTS];
    lights[0] = LightSource {
        status: LightStatus::On,
        position: Vec3::new(-100.0, 100.0, 100.0),
        color: Rgb::WHITE,
        intensity: 0.5,
    };
    lights[1] = LightSource {
        status: LightStatus::On,
        position: Vec3::new(100.0, 100.0, 100.0),
        color: Rgb::WHITE,
        intensity: 0.3,
    };
    lights[2] = LightSource {
        status: LightStatus::On,
        position: Vec3::new(0.0, -100.0, 100.0),
        color: Rgb::WHITE,
        intensity: 0.2,
    };
    lights
}

#[cfg(test)]
#[path = "../../tests/unit/scene/material.rs"]
mod tests;
