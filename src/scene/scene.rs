// scene/scene.rs - Entity registry over a hecs World
use super::component::{dispose_component, AnyComponent, Component, ComponentType};
use super::components::{EntityInfo, Name};
use super::internal::{animations, debug, transforms};
use super::orbiter::{Orbiter, OrbiterEvent};
use super::transform::{Transform, TransformAttr};
use super::{Attribute, Camera, Geometry};
use crate::error::SceneError;
use crate::math::Aabb;
use glam::Mat4;
use hecs::{Entity, World};
use std::collections::HashSet;

/// Live entities of one session.
///
/// Every entity spawned through the scene carries an [`EntityInfo`], a
/// [`Name`] and exactly one [`Transform`]. Components are stored in `world`;
/// the scene keeps insertion order for enumeration.
pub struct Scene {
    pub world: World,
    entities: Vec<Entity>,
    time: f64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            entities: Vec::new(),
            time: 0.0,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Creates an entity from `components`.
    ///
    /// A Transform is created when none is supplied; either way it becomes the
    /// first component, is parented under `parent`, and is initialised
    /// before the remaining components, which are then initialised in the
    /// order given.
    pub fn spawn<T: Into<String>>(
        &mut self,
        components: impl IntoIterator<Item = AnyComponent>,
        parent: Option<Entity>,
        tags: impl IntoIterator<Item = T>,
    ) -> Result<Entity, SceneError> {
        self.spawn_named(None, components, parent, tags)
    }

    pub(crate) fn spawn_named<T: Into<String>>(
        &mut self,
        name: Option<String>,
        components: impl IntoIterator<Item = AnyComponent>,
        parent: Option<Entity>,
        tags: impl IntoIterator<Item = T>,
    ) -> Result<Entity, SceneError> {
        let mut components: Vec<AnyComponent> = components.into_iter().collect();

        let mut seen = HashSet::new();
        for component in &components {
            if !seen.insert(component.component_type()) {
                return Err(SceneError::DuplicateComponent(component.component_type()));
            }
        }
        if let Some(parent) = parent {
            self.require_transform(parent)?;
        }

        let transform = match components
            .iter()
            .position(|c| c.component_type() == ComponentType::Transform)
        {
            Some(index) => components.remove(index),
            None => AnyComponent::Transform(Transform::new()),
        };

        let info = EntityInfo::new(tags.into_iter().map(Into::into).collect());
        let name = name.unwrap_or_else(|| format!("entity_{}", info.id.0));
        let entity = self.world.spawn((info, Name::new(name)));
        self.entities.push(entity);

        self.attach(entity, transform)?;
        if parent.is_some() {
            self.set_transform(entity, [TransformAttr::Parent(parent)])?;
        }
        for component in components {
            self.attach(entity, component)?;
        }

        log::debug!("Spawned {:?} with {:?}", entity, self.component_types(entity));
        Ok(entity)
    }

    /// Appends a component to an existing entity and runs its `init`.
    pub fn add_component(
        &mut self,
        entity: Entity,
        component: impl Into<AnyComponent>,
    ) -> Result<(), SceneError> {
        let component = component.into();
        if !self.world.contains(entity) {
            return Err(SceneError::NoSuchEntity(entity));
        }
        if self.has(entity, component.component_type()) {
            return Err(SceneError::DuplicateComponent(component.component_type()));
        }
        self.attach(entity, component)
    }

    fn attach(&mut self, entity: Entity, component: AnyComponent) -> Result<(), SceneError> {
        let ty = component.component_type();
        let geometry_bounds = match &component {
            AnyComponent::Geometry(geometry) => geometry.bounds(),
            _ => None,
        };

        component
            .attach(&mut self.world, entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        if let Ok(mut info) = self.world.get::<&mut EntityInfo>(entity) {
            info.components.push(ty);
        }

        if geometry_bounds.is_some() {
            self.set_transform(entity, [TransformAttr::Bounds(geometry_bounds)])?;
        }
        Ok(())
    }

    /// Detaches the entity from its parent. Components and descendants are
    /// left untouched.
    pub fn dispose(&mut self, entity: Entity) -> Result<(), SceneError> {
        self.set_transform(entity, [TransformAttr::Parent(None)])
    }

    /// Detaches the entity, turns its children into roots, runs every
    /// component's `dispose` hook and despawns it.
    pub fn remove(&mut self, entity: Entity) -> Result<(), SceneError> {
        self.dispose(entity)?;
        for child in self.children(entity) {
            self.set_transform(child, [TransformAttr::Parent(None)])?;
        }

        for ty in self.component_types(entity) {
            dispose_component(&self.world, entity, ty);
        }
        self.world
            .despawn(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        self.entities.retain(|&e| e != entity);
        log::debug!("Removed {:?}", entity);
        Ok(())
    }

    pub fn get<C: Component>(&self, entity: Entity) -> Option<hecs::Ref<'_, C>> {
        self.world.get::<&C>(entity).ok()
    }

    pub fn get_mut<C: Component>(&self, entity: Entity) -> Option<hecs::RefMut<'_, C>> {
        self.world.get::<&mut C>(entity).ok()
    }

    pub fn has(&self, entity: Entity, ty: ComponentType) -> bool {
        self.world
            .get::<&EntityInfo>(entity)
            .map_or(false, |info| info.components.contains(&ty))
    }

    /// Attached component types in attachment order.
    pub fn component_types(&self, entity: Entity) -> Vec<ComponentType> {
        self.world
            .get::<&EntityInfo>(entity)
            .map(|info| info.components.clone())
            .unwrap_or_default()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    /// Entities without a parent, in insertion order.
    pub fn roots(&self) -> Vec<Entity> {
        self.entities
            .iter()
            .copied()
            .filter(|&entity| self.parent(entity).is_none())
            .collect()
    }

    pub fn name(&self, entity: Entity) -> Option<String> {
        self.world.get::<&Name>(entity).ok().map(|name| name.0.clone())
    }

    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        self.entities.iter().copied().find(|&entity| {
            self.world
                .get::<&Name>(entity)
                .map_or(false, |n| n.0 == name)
        })
    }

    pub fn has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.world
            .get::<&EntityInfo>(entity)
            .map_or(false, |info| info.tags.contains(tag))
    }

    fn require_transform(&self, entity: Entity) -> Result<(), SceneError> {
        if !self.world.contains(entity) {
            return Err(SceneError::NoSuchEntity(entity));
        }
        if !self.world.entity(entity).map_or(false, |e| e.has::<Transform>()) {
            return Err(SceneError::MissingComponent {
                entity,
                component: ComponentType::Transform,
            });
        }
        Ok(())
    }

    /// Applies Transform attributes in order, then notifies once per
    /// attribute. Parent targets are validated first, so a rejected call
    /// changes nothing.
    pub fn set_transform(
        &mut self,
        entity: Entity,
        attrs: impl IntoIterator<Item = TransformAttr>,
    ) -> Result<(), SceneError> {
        let attrs: Vec<TransformAttr> = attrs.into_iter().collect();
        self.require_transform(entity)?;

        for attr in &attrs {
            if let TransformAttr::Parent(Some(parent)) = *attr {
                self.require_transform(parent)?;
                transforms::check_reparent(&self.world, entity, parent)?;
            }
        }

        let mut names = Vec::with_capacity(attrs.len());
        for attr in attrs {
            names.push(attr.name());
            match attr {
                TransformAttr::Parent(parent) => {
                    transforms::reparent(&self.world, entity, parent);
                }
                TransformAttr::Bounds(_) => {
                    if let Ok(mut transform) = self.world.get::<&mut Transform>(entity) {
                        transform.apply_local(attr);
                    }
                    transforms::mark_ancestors_bounds_dirty(&self.world, entity);
                }
                _ => {
                    if let Ok(mut transform) = self.world.get::<&mut Transform>(entity) {
                        transform.apply_local(attr);
                    }
                    transforms::mark_dirty(&self.world, entity);
                }
            }
        }

        if let Ok(transform) = self.world.get::<&Transform>(entity) {
            for name in names {
                transform.changed.dispatch(name);
            }
        }
        Ok(())
    }

    pub fn set_parent(&mut self, entity: Entity, parent: Option<Entity>) -> Result<(), SceneError> {
        self.set_transform(entity, [TransformAttr::Parent(parent)])
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<&Transform>(entity).ok().and_then(|t| t.parent())
    }

    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.world
            .get::<&Transform>(entity)
            .map(|t| t.children().to_vec())
            .unwrap_or_default()
    }

    /// Parent world matrix times local matrix; never stale.
    pub fn world_matrix(&self, entity: Entity) -> Option<Mat4> {
        transforms::world_matrix(&self.world, entity)
    }

    /// Own bounds in world space united with all descendants' world bounds.
    pub fn world_bounds(&self, entity: Entity) -> Option<Aabb> {
        transforms::world_bounds(&self.world, entity)
    }

    /// Refreshes the cached world matrices and bounds of every tree.
    pub fn update_transforms(&mut self) {
        let roots = self.roots();
        transforms::propagate_transforms(&mut self.world, &roots);
    }

    /// Per-frame tick: animations, orbiters, transforms, then the camera and
    /// skin state that depends on final world matrices.
    pub fn update(&mut self, dt: f64) {
        self.time += dt;

        animations::advance_animations(self, dt as f32);
        animations::update_orbiters(self);

        self.update_transforms();

        animations::update_cameras(self);
        animations::update_skins(self);
    }

    /// Forwards an input event to the Orbiter on `entity`, together with the
    /// entity's Camera when it has one.
    pub fn handle_orbiter_event(
        &mut self,
        entity: Entity,
        event: OrbiterEvent,
    ) -> Result<(), SceneError> {
        let mut orbiter = self
            .world
            .get::<&mut Orbiter>(entity)
            .map_err(|_| SceneError::MissingComponent {
                entity,
                component: ComponentType::Orbiter,
            })?;
        let camera = self.world.get::<&Camera>(entity).ok();
        orbiter.handle_event(event, camera.as_deref());
        Ok(())
    }

    /// Entities in the subtree of `root` that carry Geometry.
    pub fn geometry_entities(&self, root: Entity) -> Vec<Entity> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            if self.world.entity(entity).map_or(false, |e| e.has::<Geometry>()) {
                found.push(entity);
            }
            stack.extend(self.children(entity));
        }
        found
    }

    pub fn describe_hierarchy(&self, root: Entity) -> String {
        debug::describe_hierarchy(&self.world, root)
    }

    pub fn debug_print_hierarchy(&self, root: Entity) {
        debug::debug_print_hierarchy(&self.world, root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::components::{Morph, PointLight};
    use crate::scene::{AnimationChannel, AnimationClip, Animation, Interpolation, TargetPath};
    use glam::{Quat, Vec3};

    fn no_tags() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn duplicate_component_types_are_rejected() {
        let mut scene = Scene::new();
        let result = scene.spawn(
            [
                AnyComponent::from(PointLight::default()),
                AnyComponent::from(PointLight::default()),
            ],
            None,
            no_tags(),
        );
        assert!(matches!(
            result,
            Err(SceneError::DuplicateComponent(ComponentType::PointLight))
        ));
        assert!(scene.is_empty());
    }

    #[test]
    fn supplied_transform_moves_to_front() {
        let mut scene = Scene::new();
        let entity = scene
            .spawn(
                [
                    AnyComponent::from(PointLight::default()),
                    AnyComponent::from(Transform::from_trs(Vec3::X, Quat::IDENTITY, Vec3::ONE)),
                ],
                None,
                ["light"],
            )
            .unwrap();

        assert_eq!(
            scene.component_types(entity),
            vec![ComponentType::Transform, ComponentType::PointLight]
        );
        assert_eq!(scene.get::<Transform>(entity).unwrap().entity(), Some(entity));
        assert!(scene.has_tag(entity, "light"));
        assert!(!scene.has_tag(entity, "camera"));
    }

    #[test]
    fn remove_orphans_children() {
        let mut scene = Scene::new();
        let parent = scene.spawn([], None, no_tags()).unwrap();
        let child = scene.spawn([], Some(parent), no_tags()).unwrap();

        scene.remove(parent).unwrap();

        assert!(!scene.contains(parent));
        assert_eq!(scene.parent(child), None);
        assert_eq!(scene.roots(), vec![child]);
    }

    #[test]
    fn dispose_only_detaches() {
        let mut scene = Scene::new();
        let parent = scene.spawn([], None, no_tags()).unwrap();
        let child = scene.spawn([AnyComponent::from(PointLight::default())], Some(parent), no_tags()).unwrap();

        scene.dispose(child).unwrap();

        assert!(scene.contains(child));
        assert!(scene.children(parent).is_empty());
        assert!(scene.has(child, ComponentType::PointLight));
    }

    #[test]
    fn update_applies_animation_to_transforms_and_morphs() {
        let mut scene = Scene::new();
        let node = scene
            .spawn(
                [AnyComponent::from(Morph::new(vec![vec![0.0; 3]], vec![0.0]))],
                None,
                no_tags(),
            )
            .unwrap();

        let mut clip = AnimationClip::new("move");
        clip.add_channel(AnimationChannel {
            input: vec![0.0, 2.0],
            output: vec![vec![0.0, 0.0, 0.0], vec![4.0, 0.0, 0.0]],
            interpolation: Interpolation::Linear,
            target: node,
            path: TargetPath::Translation,
        });
        clip.add_channel(AnimationChannel {
            input: vec![0.0, 2.0],
            output: vec![vec![0.0], vec![1.0]],
            interpolation: Interpolation::Linear,
            target: node,
            path: TargetPath::Weights,
        });
        scene
            .spawn([AnyComponent::from(Animation::new(vec![clip]))], None, no_tags())
            .unwrap();

        scene.update(0.5);

        let position = scene.get::<Transform>(node).unwrap().position();
        assert!(position.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
        assert_eq!(scene.get::<Morph>(node).unwrap().weights(), &[0.25]);
    }
}
