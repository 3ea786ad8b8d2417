// scene/builder.rs
// Fluent helper over Scene::spawn

use hecs::Entity;

use super::component::AnyComponent;
use super::scene::Scene;
use crate::error::SceneError;

/// Helper for building entities with a fluent API
/// This is optional - you can also call [`Scene::spawn`] directly
pub struct EntityBuilder<'s> {
    scene: &'s mut Scene,
    name: Option<String>,
    components: Vec<AnyComponent>,
    parent: Option<Entity>,
    tags: Vec<String>,
}

impl<'s> EntityBuilder<'s> {
    pub fn new(scene: &'s mut Scene) -> Self {
        Self {
            scene,
            name: None,
            components: Vec::new(),
            parent: None,
            tags: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a component; attachment order follows call order.
    pub fn with(mut self, component: impl Into<AnyComponent>) -> Self {
        self.components.push(component.into());
        self
    }

    pub fn parent(mut self, parent: Entity) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn spawn(self) -> Result<Entity, SceneError> {
        self.scene
            .spawn_named(self.name, self.components, self.parent, self.tags)
    }
}
