// scene/components.rs
// Entity metadata and the small data-only components

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec3, Vec4};

use super::component::{set_attributes, Attribute, Component, ComponentType};
use crate::signal::ChangeSignal;

// ============================================================================
// Entity Metadata
// ============================================================================

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, monotonically increasing entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Bookkeeping stored next to the components of every scene entity.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub id: EntityId,
    pub tags: HashSet<String>,
    /// Attached component types in attachment order. Transform is always first.
    pub(crate) components: Vec<ComponentType>,
}

impl EntityInfo {
    pub(crate) fn new(tags: HashSet<String>) -> Self {
        Self {
            id: EntityId::next(),
            tags,
            components: Vec::new(),
        }
    }

    pub fn components(&self) -> &[ComponentType] {
        &self.components
    }
}

/// Name component for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

// ============================================================================
// Morph Targets
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MorphAttr {
    /// Flattened position deltas, one array per target.
    Targets(Vec<Vec<f32>>),
    Weights(Vec<f32>),
}

impl Attribute for MorphAttr {
    fn name(&self) -> &'static str {
        match self {
            MorphAttr::Targets(_) => "targets",
            MorphAttr::Weights(_) => "weights",
        }
    }
}

#[derive(Debug, Default)]
pub struct Morph {
    targets: Vec<Vec<f32>>,
    weights: Vec<f32>,
    pub changed: ChangeSignal,
}

impl Morph {
    pub fn new(targets: Vec<Vec<f32>>, weights: Vec<f32>) -> Self {
        Self {
            targets,
            weights,
            changed: ChangeSignal::new(),
        }
    }

    pub fn set(&mut self, attrs: impl IntoIterator<Item = MorphAttr>) {
        set_attributes(self, attrs, Self::apply, |morph| &morph.changed);
    }

    fn apply(&mut self, attr: MorphAttr) {
        match attr {
            MorphAttr::Targets(targets) => self.targets = targets,
            MorphAttr::Weights(weights) => self.weights = weights,
        }
    }

    pub fn targets(&self) -> &[Vec<f32>] {
        &self.targets
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

impl Component for Morph {
    const TYPE: ComponentType = ComponentType::Morph;
}

// ============================================================================
// Lighting Components
// ============================================================================

/// Attributes shared by the light components. A light ignores values it has
/// no field for but still notifies about them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightAttr {
    Color(Vec4),
    Intensity(f32),
    Direction(Vec3),
    Radius(f32),
    Range(f32),
    InnerAngle(f32),
    OuterAngle(f32),
    Bias(f32),
    CastShadows(bool),
}

impl Attribute for LightAttr {
    fn name(&self) -> &'static str {
        match self {
            LightAttr::Color(_) => "color",
            LightAttr::Intensity(_) => "intensity",
            LightAttr::Direction(_) => "direction",
            LightAttr::Radius(_) => "radius",
            LightAttr::Range(_) => "range",
            LightAttr::InnerAngle(_) => "inner_angle",
            LightAttr::OuterAngle(_) => "outer_angle",
            LightAttr::Bias(_) => "bias",
            LightAttr::CastShadows(_) => "cast_shadows",
        }
    }
}

/// Directional light component
#[derive(Debug)]
pub struct DirectionalLight {
    pub color: Vec4,
    pub direction: Vec3,
    pub intensity: f32,
    pub bias: f32,
    pub cast_shadows: bool,
    pub changed: ChangeSignal,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            direction: Vec3::new(0.0, -1.0, 0.0),
            intensity: 1.0,
            bias: 0.1,
            cast_shadows: false,
            changed: ChangeSignal::new(),
        }
    }
}

impl DirectionalLight {
    pub fn set(&mut self, attrs: impl IntoIterator<Item = LightAttr>) {
        set_attributes(self, attrs, Self::apply, |light| &light.changed);
    }

    fn apply(&mut self, attr: LightAttr) {
        match attr {
            LightAttr::Color(color) => self.color = color,
            LightAttr::Intensity(intensity) => self.intensity = intensity,
            LightAttr::Direction(direction) => self.direction = direction.normalize_or_zero(),
            LightAttr::Bias(bias) => self.bias = bias,
            LightAttr::CastShadows(cast) => self.cast_shadows = cast,
            _ => {}
        }
    }
}

impl Component for DirectionalLight {
    const TYPE: ComponentType = ComponentType::DirectionalLight;
}

/// Point light component
#[derive(Debug)]
pub struct PointLight {
    pub color: Vec4,
    pub intensity: f32,
    pub radius: f32,
    pub cast_shadows: bool,
    pub changed: ChangeSignal,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            intensity: 1.0,
            radius: 10.0,
            cast_shadows: false,
            changed: ChangeSignal::new(),
        }
    }
}

impl PointLight {
    pub fn set(&mut self, attrs: impl IntoIterator<Item = LightAttr>) {
        set_attributes(self, attrs, Self::apply, |light| &light.changed);
    }

    fn apply(&mut self, attr: LightAttr) {
        match attr {
            LightAttr::Color(color) => self.color = color,
            LightAttr::Intensity(intensity) => self.intensity = intensity,
            LightAttr::Radius(radius) | LightAttr::Range(radius) => self.radius = radius,
            LightAttr::CastShadows(cast) => self.cast_shadows = cast,
            _ => {}
        }
    }
}

impl Component for PointLight {
    const TYPE: ComponentType = ComponentType::PointLight;
}

/// Spot light component. Angles are in radians.
#[derive(Debug)]
pub struct SpotLight {
    pub color: Vec4,
    pub intensity: f32,
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub range: f32,
    pub changed: ChangeSignal,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            intensity: 1.0,
            inner_angle: 0.0,
            outer_angle: std::f32::consts::FRAC_PI_4,
            range: 10.0,
            changed: ChangeSignal::new(),
        }
    }
}

impl SpotLight {
    pub fn set(&mut self, attrs: impl IntoIterator<Item = LightAttr>) {
        set_attributes(self, attrs, Self::apply, |light| &light.changed);
    }

    fn apply(&mut self, attr: LightAttr) {
        match attr {
            LightAttr::Color(color) => self.color = color,
            LightAttr::Intensity(intensity) => self.intensity = intensity,
            LightAttr::InnerAngle(angle) => self.inner_angle = angle,
            LightAttr::OuterAngle(angle) => self.outer_angle = angle,
            LightAttr::Range(range) | LightAttr::Radius(range) => self.range = range,
            _ => {}
        }
    }
}

impl Component for SpotLight {
    const TYPE: ComponentType = ComponentType::SpotLight;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn entity_ids_are_monotonic() {
        let a = EntityId::next();
        let b = EntityId::next();
        assert!(b > a);
    }

    #[test]
    fn lights_notify_for_attributes_they_ignore() {
        let mut light = PointLight::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        light
            .changed
            .subscribe(move |name| log.lock().unwrap().push(name.to_string()));

        light.set([LightAttr::Intensity(3.0), LightAttr::Direction(Vec3::X)]);

        assert_eq!(light.intensity, 3.0);
        assert_eq!(*seen.lock().unwrap(), vec!["intensity", "direction"]);
    }

    #[test]
    fn directional_light_normalizes_direction() {
        let mut light = DirectionalLight::default();
        light.set([LightAttr::Direction(Vec3::new(0.0, 0.0, -4.0))]);
        assert!(light.direction.abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }
}
