use crate::scene::animation::{Animation, PoseUpdate};
use crate::scene::camera::Camera;
use crate::scene::components::{Morph, MorphAttr};
use crate::scene::orbiter::Orbiter;
use crate::scene::transform::{Transform, TransformAttr};
use crate::scene::{CameraAttr, Scene, Skin};
use glam::{Mat4, Quat};
use hecs::Entity;
use std::collections::HashMap;

pub(crate) fn advance_animations(scene: &mut Scene, dt: f32) {
    let mut updates: HashMap<Entity, PoseUpdate> = HashMap::new();
    for (_, animation) in scene.world.query_mut::<&mut Animation>() {
        animation.tick(dt, &mut updates);
    }

    if updates.is_empty() {
        return;
    }
    log::trace!("Applying sampled poses to {} entities", updates.len());

    for (entity, update) in updates {
        apply_pose_update(scene, entity, update);
    }
}

fn apply_pose_update(scene: &mut Scene, entity: Entity, update: PoseUpdate) {
    let mut attrs = Vec::with_capacity(3);
    if let Some(translation) = update.translation {
        attrs.push(TransformAttr::Position(translation));
    }
    if let Some(rotation) = update.rotation {
        attrs.push(TransformAttr::Rotation(rotation));
    }
    if let Some(scale) = update.scale {
        attrs.push(TransformAttr::Scale(scale));
    }

    if !attrs.is_empty() {
        if let Err(err) = scene.set_transform(entity, attrs) {
            log::warn!("Animated entity {:?} could not be posed: {}", entity, err);
        }
    }

    if let Some(weights) = update.weights {
        // Multi-primitive meshes keep their Morph on the sub-entities.
        let mut targets = vec![entity];
        if !scene.world.entity(entity).map_or(false, |e| e.has::<Morph>()) {
            targets = scene.children(entity);
        }
        for target in targets {
            if let Ok(mut morph) = scene.world.get::<&mut Morph>(target) {
                morph.set([MorphAttr::Weights(weights.clone())]);
            }
        }
    }
}

pub(crate) fn update_orbiters(scene: &mut Scene) {
    let orbiters: Vec<Entity> = scene
        .world
        .query::<&Orbiter>()
        .iter()
        .filter(|(_, orbiter)| orbiter.auto_update())
        .map(|(entity, _)| entity)
        .collect();

    for entity in orbiters {
        let camera = scene
            .world
            .get::<&Camera>(entity)
            .ok()
            .map(|camera| camera.is_orthographic());

        let (matrix, position, distance) = {
            let Ok(mut orbiter) = scene.world.get::<&mut Orbiter>(entity) else {
                continue;
            };
            let matrix = orbiter.update_matrix(camera.is_some());
            (matrix, orbiter.position(), orbiter.distance())
        };
        let rotation = Quat::from_mat4(&matrix).normalize();

        let attrs = match camera {
            Some(_) => vec![TransformAttr::Position(position), TransformAttr::Rotation(rotation)],
            None => vec![TransformAttr::Rotation(rotation)],
        };
        if let Err(err) = scene.set_transform(entity, attrs) {
            log::warn!("Orbiter on {:?} could not update its transform: {}", entity, err);
        }

        if camera == Some(true) {
            if let Ok(mut camera) = scene.world.get::<&mut Camera>(entity) {
                camera.set([CameraAttr::Zoom(distance)]);
            }
        }
    }
}

/// Requires world matrices to be up to date.
pub(crate) fn update_cameras(scene: &mut Scene) {
    for (_, (transform, camera)) in scene.world.query_mut::<(&Transform, &mut Camera)>() {
        camera.view_matrix = transform.world_matrix.inverse();
    }
}

/// Joint matrix = joint world matrix x inverse bind matrix. Aliased skins are
/// computed once.
pub(crate) fn update_skins(scene: &mut Scene) {
    let mut skins: Vec<Skin> = Vec::new();
    for (_, skin) in scene.world.query::<&Skin>().iter() {
        if !skins.iter().any(|known| known.ptr_eq(skin)) {
            skins.push(skin.clone());
        }
    }

    for skin in skins {
        let inverse_bind = skin.inverse_bind_matrices();
        let matrices: Vec<Mat4> = skin
            .joints()
            .iter()
            .enumerate()
            .map(|(i, &joint)| {
                let joint_world = scene.world_matrix(joint).unwrap_or(Mat4::IDENTITY);
                joint_world * inverse_bind.get(i).copied().unwrap_or(Mat4::IDENTITY)
            })
            .collect();
        skin.set_joint_matrices(matrices);
    }
}
