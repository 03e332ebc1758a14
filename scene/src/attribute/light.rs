use cgmath::Vector3;

use crate::common::RgbaColor;

/// Which part of the scene a light attribute illuminates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LightScope {
    /// Lights the whole scene wherever the attribute is attached
    #[default]
    Global,
    /// Lights only the subtree below the owning node
    Local,
}

/// A light source, positioned relative to the node that owns the attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    /// Point light that radiates in all directions from a position.
    Point {
        position: Vector3<f32>,
        color: RgbaColor,
        intensity: f32,
        /// Maximum range of the light. 0.0 means infinite range.
        range: f32,
    },
    /// Directional light with parallel rays (like sunlight).
    Directional {
        /// Direction the light is pointing (will be normalized).
        direction: Vector3<f32>,
        color: RgbaColor,
        intensity: f32,
    },
    /// Spotlight with a cone of light.
    Spot {
        position: Vector3<f32>,
        direction: Vector3<f32>,
        color: RgbaColor,
        intensity: f32,
        range: f32,
        /// Outer cone angle in degrees.
        cutoff_degrees: f32,
    },
}

impl Light {
    pub fn point(position: Vector3<f32>, color: RgbaColor, intensity: f32) -> Self {
        Self::Point {
            position,
            color,
            intensity,
            range: 0.0,
        }
    }

    pub fn directional(direction: Vector3<f32>, color: RgbaColor, intensity: f32) -> Self {
        Self::Directional {
            direction,
            color,
            intensity,
        }
    }

    pub fn color(&self) -> RgbaColor {
        match self {
            Light::Point { color, .. }
            | Light::Directional { color, .. }
            | Light::Spot { color, .. } => *color,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightAttribute {
    pub light: Light,
    pub scope: LightScope,
    pub enabled: bool,
}

impl LightAttribute {
    pub fn new(light: Light, scope: LightScope) -> Self {
        Self {
            light,
            scope,
            enabled: true,
        }
    }

    pub fn is_local(&self) -> bool {
        self.scope == LightScope::Local
    }
}
