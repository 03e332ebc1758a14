//! State-category attribute values.
//!
//! State attributes describe how geometry below a node is drawn. During a render
//! traversal the winning value for each [`StateKind`] is tracked by the
//! [`GraphicsState`](crate::GraphicsState); at attach time the value is also
//! written into the owning node's backend state set.

use crate::common::RgbaColor;

/// The state slots tracked per traversal, one per State attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKind {
    Fog,
    Transparency,
    Backface,
    Wireframe,
    Shading,
    LineWidth,
}

impl StateKind {
    pub const COUNT: usize = 6;

    pub const ALL: [StateKind; Self::COUNT] = [
        StateKind::Fog,
        StateKind::Transparency,
        StateKind::Backface,
        StateKind::Wireframe,
        StateKind::Shading,
        StateKind::LineWidth,
    ];

    /// Slot index into per-kind arrays.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// How fog density falls off with distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FogMode {
    #[default]
    Linear,
    Exponential,
    ExponentialSquared,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogState {
    pub mode: FogMode,
    pub color: RgbaColor,
    /// Linear fog start distance
    pub near: f32,
    /// Linear fog end distance
    pub far: f32,
    /// Density for the exponential modes
    pub density: f32,
}

impl Default for FogState {
    fn default() -> Self {
        Self {
            mode: FogMode::Linear,
            color: RgbaColor::GRAY,
            near: 0.0,
            far: 10_000.0,
            density: 1.0,
        }
    }
}

/// Blending quality hint for transparent geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransparencyQuality {
    #[default]
    Default,
    High,
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransparencyState {
    pub enabled: bool,
    pub quality: TransparencyQuality,
    /// Write transparent fragments to the depth buffer
    pub occlusion: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadingMode {
    Flat,
    #[default]
    Gouraud,
}

/// The value carried by a State-category attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateValue {
    Fog(FogState),
    Transparency(TransparencyState),
    /// True draws back faces (two-sided geometry)
    Backface(bool),
    /// True draws polygons as outlines
    Wireframe(bool),
    Shading(ShadingMode),
    LineWidth(f32),
}

impl StateValue {
    pub fn kind(&self) -> StateKind {
        match self {
            StateValue::Fog(_) => StateKind::Fog,
            StateValue::Transparency(_) => StateKind::Transparency,
            StateValue::Backface(_) => StateKind::Backface,
            StateValue::Wireframe(_) => StateKind::Wireframe,
            StateValue::Shading(_) => StateKind::Shading,
            StateValue::LineWidth(_) => StateKind::LineWidth,
        }
    }
}

/// The content of one slot of a node's backend state set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StateSetting {
    /// Take whatever the ancestors provide
    #[default]
    Inherit,
    Value(StateValue),
}

impl StateSetting {
    pub fn value(&self) -> Option<&StateValue> {
        match self {
            StateSetting::Inherit => None,
            StateSetting::Value(value) => Some(value),
        }
    }
}
