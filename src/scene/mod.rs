// scene/mod.rs

pub mod animation;
pub mod builder;
pub mod camera;
pub mod component;
pub mod components;
pub mod geometry;
pub mod loader;
pub mod material;
pub mod orbiter;
pub mod scene;
pub mod skin;
pub mod transform;

mod internal;

// Re-export commonly used types
pub use builder::EntityBuilder;
pub use camera::{Camera, CameraAttr, Projection};
pub use component::{AnyComponent, Attribute, Component, ComponentType};
pub use loader::{ImportedScene, SceneLoader};
pub use scene::Scene;
pub use transform::{Transform, TransformAttr};

// Re-export all components
pub use animation::{
    Animation, AnimationAttr, AnimationChannel, AnimationClip, Interpolation, PoseUpdate,
    TargetPath,
};
pub use components::{
    DirectionalLight, EntityId, EntityInfo, LightAttr, Morph, MorphAttr, Name, PointLight,
    SpotLight,
};
pub use geometry::{
    Geometry, GeometryAttr, GpuStream, IndexStream, ScalarKind, Topology, TypedArray,
    VertexAttribute, VertexSemantic,
};
pub use material::{AlphaMode, Material, MaterialAttr};
pub use orbiter::{Orbiter, OrbiterAttr, OrbiterEvent};
pub use skin::{Skin, SkinAttr};
