use crate::error::CycleError;
use crate::math::Aabb;
use crate::scene::transform::Transform;
use glam::Mat4;
use hecs::{Entity, World};

// hecs tracks borrows per archetype column, so no helper here holds a
// Transform borrow while taking another one.

fn parent_of(world: &World, entity: Entity) -> Option<Entity> {
    world.get::<&Transform>(entity).ok().and_then(|t| t.parent)
}

fn children_of(world: &World, entity: Entity) -> Vec<Entity> {
    world
        .get::<&Transform>(entity)
        .map(|t| t.children.clone())
        .unwrap_or_default()
}

/// Rejects `parent` when it is `child` itself or one of its descendants.
pub(crate) fn check_reparent(world: &World, child: Entity, parent: Entity) -> Result<(), CycleError> {
    let mut cursor = Some(parent);
    while let Some(node) = cursor {
        if node == child {
            return Err(CycleError { child, parent });
        }
        cursor = parent_of(world, node);
    }
    Ok(())
}

/// Moves `child` under `new_parent`. Returns `false` when the parent is
/// unchanged, in which case nothing is touched.
pub(crate) fn reparent(world: &World, child: Entity, new_parent: Option<Entity>) -> bool {
    let old_parent = parent_of(world, child);
    if old_parent == new_parent {
        return false;
    }

    if let Some(old) = old_parent {
        if let Ok(mut transform) = world.get::<&mut Transform>(old) {
            transform.children.retain(|&c| c != child);
        }
        mark_ancestors_bounds_dirty(world, old);
    }

    if let Some(new) = new_parent {
        if let Ok(mut transform) = world.get::<&mut Transform>(new) {
            if !transform.children.contains(&child) {
                transform.children.push(child);
            }
        }
    }

    if let Ok(mut transform) = world.get::<&mut Transform>(child) {
        transform.parent = new_parent;
    }

    log::trace!("Reparented {:?}: {:?} -> {:?}", child, old_parent, new_parent);
    mark_dirty(world, child);
    true
}

/// Invalidates world state of `entity` and its subtree, and the bounds of
/// every ancestor.
pub(crate) fn mark_dirty(world: &World, entity: Entity) {
    let mut stack = vec![entity];
    while let Some(node) = stack.pop() {
        if let Ok(mut transform) = world.get::<&mut Transform>(node) {
            transform.world_dirty = true;
            transform.bounds_dirty = true;
            stack.extend(transform.children.iter().copied());
        }
    }

    if let Some(parent) = parent_of(world, entity) {
        mark_ancestors_bounds_dirty(world, parent);
    }
}

/// Invalidates the bounds of `entity` and the chain above it.
pub(crate) fn mark_ancestors_bounds_dirty(world: &World, entity: Entity) {
    let mut cursor = Some(entity);
    while let Some(node) = cursor {
        cursor = match world.get::<&mut Transform>(node) {
            Ok(mut transform) => {
                transform.bounds_dirty = true;
                transform.parent
            }
            Err(_) => None,
        };
    }
}

/// World matrix of `entity`, recomputed along the ancestor chain when the
/// cached value is stale.
pub(crate) fn world_matrix(world: &World, entity: Entity) -> Option<Mat4> {
    let (dirty, cached, local, parent) = {
        let t = world.get::<&Transform>(entity).ok()?;
        (t.world_dirty, t.world_matrix, t.local_matrix(), t.parent)
    };

    if !dirty {
        return Some(cached);
    }

    let parent_world = match parent {
        Some(parent) => world_matrix(world, parent).unwrap_or(Mat4::IDENTITY),
        None => Mat4::IDENTITY,
    };
    Some(parent_world * local)
}

/// Own bounds in world space united with the world bounds of every child.
pub(crate) fn world_bounds(world: &World, entity: Entity) -> Option<Aabb> {
    let (dirty, cached, local_bounds) = {
        let t = world.get::<&Transform>(entity).ok()?;
        (t.bounds_dirty, t.world_bounds, t.bounds())
    };

    if !dirty {
        return Some(cached);
    }

    let mut bounds = match local_bounds {
        Some(local) => local.transformed(&world_matrix(world, entity)?),
        None => Aabb::EMPTY,
    };
    for child in children_of(world, entity) {
        if let Some(child_bounds) = world_bounds(world, child) {
            bounds = bounds.union(&child_bounds);
        }
    }
    Some(bounds)
}

/// Top-down world matrices followed by bottom-up world bounds for every tree
/// under `roots`. Clears both dirty flags on every visited node.
pub(crate) fn propagate_transforms(world: &mut World, roots: &[Entity]) {
    log::trace!("Propagating transforms from {} root entities", roots.len());

    let mut visited: Vec<Entity> = Vec::new();
    let mut stack: Vec<(Entity, Mat4)> = Vec::new();

    for &root in roots {
        stack.push((root, Mat4::IDENTITY));

        while let Some((entity, parent_world)) = stack.pop() {
            let Ok(mut transform) = world.get::<&mut Transform>(entity) else {
                log::trace!("Entity {:?} has no Transform, skipping", entity);
                continue;
            };

            let world_transform = parent_world * transform.local_matrix();
            transform.world_matrix = world_transform;
            transform.world_dirty = false;
            visited.push(entity);

            for &child in transform.children.iter().rev() {
                stack.push((child, world_transform));
            }
        }
    }

    // Reverse pre-order visits every child before its parent.
    for &entity in visited.iter().rev() {
        let (matrix, local_bounds, children) = {
            let Ok(t) = world.get::<&Transform>(entity) else {
                continue;
            };
            (t.world_matrix, t.bounds(), t.children.clone())
        };

        let mut bounds = local_bounds.map_or(Aabb::EMPTY, |b| b.transformed(&matrix));
        for child in children {
            if let Ok(t) = world.get::<&Transform>(child) {
                bounds = bounds.union(&t.world_bounds);
            }
        }

        if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
            transform.world_bounds = bounds;
            transform.bounds_dirty = false;
        }
    }
}
