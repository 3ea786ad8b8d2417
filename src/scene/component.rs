// scene/component.rs
// Component lifecycle contract and the closed set of attachable components

use std::fmt;

use super::animation::Animation;
use super::camera::Camera;
use super::components::{DirectionalLight, Morph, PointLight, SpotLight};
use super::geometry::Geometry;
use super::material::Material;
use super::orbiter::Orbiter;
use super::skin::Skin;
use super::transform::Transform;
use crate::signal::ChangeSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentType {
    Transform,
    Geometry,
    Material,
    Skin,
    Morph,
    Animation,
    Camera,
    Orbiter,
    DirectionalLight,
    PointLight,
    SpotLight,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single named attribute value accepted by a component's `set`.
pub trait Attribute {
    fn name(&self) -> &'static str;
}

/// Data or behaviour attached to an entity.
///
/// `init` runs once when the component is attached, after the entity's
/// transform is already in place. `dispose` runs when the entity is removed
/// from its [`Scene`](super::Scene).
pub trait Component: hecs::Component {
    const TYPE: ComponentType;

    fn init(&mut self, _entity: hecs::Entity) {}

    fn dispose(&mut self) {}
}

/// Merges every attribute, then notifies once per attribute in the order given.
pub(crate) fn set_attributes<C, A>(
    component: &mut C,
    attrs: impl IntoIterator<Item = A>,
    apply: fn(&mut C, A),
    changed: fn(&C) -> &ChangeSignal,
) where
    A: Attribute,
{
    let names: Vec<&'static str> = attrs
        .into_iter()
        .map(|attr| {
            let name = attr.name();
            apply(component, attr);
            name
        })
        .collect();

    let signal = changed(component);
    for name in names {
        signal.dispatch(name);
    }
}

/// Any component, as handed to [`Scene::spawn`](super::Scene::spawn).
#[derive(Debug)]
pub enum AnyComponent {
    Transform(Transform),
    Geometry(Geometry),
    Material(Material),
    Skin(Skin),
    Morph(Morph),
    Animation(Animation),
    Camera(Camera),
    Orbiter(Orbiter),
    DirectionalLight(DirectionalLight),
    PointLight(PointLight),
    SpotLight(SpotLight),
}

macro_rules! any_component {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for AnyComponent {
                fn from(component: $variant) -> Self {
                    AnyComponent::$variant(component)
                }
            }
        )*

        impl AnyComponent {
            pub fn component_type(&self) -> ComponentType {
                match self {
                    $(AnyComponent::$variant(_) => ComponentType::$variant,)*
                }
            }

            /// Runs `init` and stores the component on `entity`.
            pub(crate) fn attach(
                self,
                world: &mut hecs::World,
                entity: hecs::Entity,
            ) -> Result<(), hecs::NoSuchEntity> {
                match self {
                    $(AnyComponent::$variant(mut component) => {
                        component.init(entity);
                        world.insert_one(entity, component)
                    })*
                }
            }
        }

        /// Runs the `dispose` hook of the component of type `ty`, if present.
        pub(crate) fn dispose_component(
            world: &hecs::World,
            entity: hecs::Entity,
            ty: ComponentType,
        ) {
            match ty {
                $(ComponentType::$variant => {
                    if let Ok(mut component) = world.get::<&mut $variant>(entity) {
                        component.dispose();
                    }
                })*
            }
        }
    };
}

any_component!(
    Transform,
    Geometry,
    Material,
    Skin,
    Morph,
    Animation,
    Camera,
    Orbiter,
    DirectionalLight,
    PointLight,
    SpotLight,
);
