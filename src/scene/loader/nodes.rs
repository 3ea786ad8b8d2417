//! Stages 7 to 9: node entities, hierarchy links and skin joints.

use glam::{Mat4, Quat, Vec3};
use gltf::json;
use hecs::Entity;

use super::buffers::Accessor;
use super::document::Document;
use super::meshes::PrimitiveRecipe;
use crate::error::ImportError;
use crate::scene::component::AnyComponent;
use crate::scene::skin::{Skin, SkinAttr};
use crate::scene::transform::Transform;
use crate::scene::Scene;

/// Entity and skin handle created for one source node.
#[derive(Debug)]
pub(crate) struct NodeEntity {
    pub entity: Entity,
    pub skin: Option<Skin>,
}

fn node_transform(node: &json::Node) -> Transform {
    match node.matrix {
        Some(matrix) => Transform::from_matrix(Mat4::from_cols_array(&matrix)),
        None => Transform::from_trs(
            node.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
            node.rotation
                .map(|r| Quat::from_array(r.0).normalize())
                .unwrap_or(Quat::IDENTITY),
            node.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
        ),
    }
}

fn inverse_bind_matrices(
    skin: &json::Skin,
    accessors: &[Accessor],
) -> Result<Vec<Mat4>, ImportError> {
    let mut matrices = match &skin.inverse_bind_matrices {
        Some(index) => {
            let index = index.value();
            let accessor = accessors.get(index).ok_or(ImportError::MissingReference {
                kind: "accessor",
                index,
            })?;
            match accessor.floats() {
                Some(floats) => floats.chunks_exact(16).map(Mat4::from_cols_slice).collect(),
                None => {
                    log::warn!("Inverse bind matrices in accessor {} are unreadable", index);
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };
    if matrices.len() < skin.joints.len() {
        matrices.resize(skin.joints.len(), Mat4::IDENTITY);
    }
    Ok(matrices)
}

fn primitive_components(recipe: &PrimitiveRecipe, skin: Option<&Skin>) -> Vec<AnyComponent> {
    let mut components = vec![
        AnyComponent::from(recipe.geometry()),
        AnyComponent::from(recipe.material()),
    ];
    if let Some(morph) = recipe.morph() {
        components.push(morph.into());
    }
    if let Some(skin) = skin {
        components.push(skin.clone().into());
    }
    components
}

/// Spawns one entity per node, plus one sub-entity per primitive for meshes
/// with more than one primitive. Every spawned entity is appended to
/// `spawned` as soon as it exists.
pub(crate) fn build_nodes(
    scene: &mut Scene,
    document: &Document,
    accessors: &[Accessor],
    meshes: &[Vec<PrimitiveRecipe>],
    spawned: &mut Vec<Entity>,
) -> Result<Vec<NodeEntity>, ImportError> {
    let mut nodes = Vec::with_capacity(document.nodes.len());
    for (index, node) in document.nodes.iter().enumerate() {
        let name = node.name.clone().unwrap_or_else(|| format!("node_{}", index));

        let skin = match node.skin.map(|skin| skin.value()) {
            Some(skin_index) => {
                let def = document.skins.get(skin_index).ok_or(ImportError::MissingReference {
                    kind: "skin",
                    index: skin_index,
                })?;
                Some(Skin::new(inverse_bind_matrices(def, accessors)?))
            }
            None => None,
        };

        let mesh_index = node.mesh.map(|mesh| mesh.value());
        let primitives: &[PrimitiveRecipe] = match mesh_index {
            Some(mesh) => meshes.get(mesh).ok_or(ImportError::MissingReference {
                kind: "mesh",
                index: mesh,
            })?,
            None => &[],
        };

        let mut components = vec![AnyComponent::from(node_transform(node))];
        match primitives {
            [single] => components.extend(primitive_components(single, skin.as_ref())),
            _ => {
                if let Some(skin) = &skin {
                    components.push(skin.clone().into());
                }
            }
        }

        log::debug!(
            "Node {} ({}) mesh {:?} primitives {} skin {:?}",
            index,
            name,
            mesh_index,
            primitives.len(),
            node.skin.map(|skin| skin.value())
        );
        let entity = scene.spawn_named(Some(name), components, None, std::iter::empty::<String>())?;
        spawned.push(entity);

        if primitives.len() > 1 {
            for (primitive, recipe) in primitives.iter().enumerate() {
                let sub = scene.spawn_named(
                    Some(format!("node_{}_{}", index, primitive)),
                    primitive_components(recipe, skin.as_ref()),
                    Some(entity),
                    std::iter::empty::<String>(),
                )?;
                spawned.push(sub);
            }
        }

        nodes.push(NodeEntity { entity, skin });
    }
    Ok(nodes)
}

/// Parents every node's children under it. Runs after all node entities
/// exist since children may come later in document order.
pub(crate) fn link_hierarchy(
    scene: &mut Scene,
    document: &Document,
    nodes: &[NodeEntity],
) -> Result<(), ImportError> {
    for (node, def) in nodes.iter().zip(&document.nodes) {
        for child in def.children.iter().flatten() {
            let child = child.value();
            let child = nodes.get(child).ok_or(ImportError::MissingReference {
                kind: "node",
                index: child,
            })?;
            scene.set_parent(child.entity, Some(node.entity))?;
        }
    }
    Ok(())
}

/// Resolves joint indices to entities. Primitive sub-entities hold clones of
/// the node's skin, so one assignment reaches all of them.
pub(crate) fn bind_joints(document: &Document, nodes: &[NodeEntity]) -> Result<(), ImportError> {
    for (node, def) in nodes.iter().zip(&document.nodes) {
        let (Some(skin), Some(skin_index)) = (&node.skin, def.skin.map(|skin| skin.value())) else {
            continue;
        };
        let skin_def = document.skins.get(skin_index).ok_or(ImportError::MissingReference {
            kind: "skin",
            index: skin_index,
        })?;
        let joints = skin_def
            .joints
            .iter()
            .map(|joint| {
                let joint = joint.value();
                nodes
                    .get(joint)
                    .map(|joint| joint.entity)
                    .ok_or(ImportError::MissingReference {
                        kind: "node",
                        index: joint,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        skin.set([SkinAttr::Joints(joints)]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(value: serde_json::Value) -> json::Node {
        serde_json::from_value(value).unwrap()
    }

    fn document(mut value: serde_json::Value) -> Document {
        value["asset"] = serde_json::json!({ "version": "2.0" });
        super::super::document::from_json(value)
    }

    #[test]
    fn matrix_takes_precedence_over_trs() {
        let matrix = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let transform = node_transform(&node(serde_json::json!({
            "matrix": matrix.to_cols_array(),
            "translation": [9.0, 9.0, 9.0]
        })));
        assert!(transform.local_matrix().abs_diff_eq(matrix, 1e-6));
        assert_eq!(transform.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn missing_inverse_bind_matrices_default_to_identity() {
        let skin: json::Skin = serde_json::from_value(serde_json::json!({ "joints": [0, 1] })).unwrap();
        let matrices = inverse_bind_matrices(&skin, &[]).unwrap();
        assert_eq!(matrices, vec![Mat4::IDENTITY; 2]);
    }

    #[test]
    fn children_listed_before_their_parent_are_linked() {
        let document = document(serde_json::json!({
            "buffers": [],
            "nodes": [{ "name": "leaf" }, { "name": "top", "children": [0] }]
        }));
        let mut scene = Scene::new();
        let mut spawned = Vec::new();
        let nodes = build_nodes(&mut scene, &document, &[], &[], &mut spawned).unwrap();
        link_hierarchy(&mut scene, &document, &nodes).unwrap();

        assert_eq!(spawned.len(), 2);
        assert_eq!(scene.parent(nodes[0].entity), Some(nodes[1].entity));
        assert_eq!(scene.name(nodes[0].entity).as_deref(), Some("leaf"));
    }

    #[test]
    fn cyclic_children_are_rejected() {
        let document = document(serde_json::json!({
            "buffers": [],
            "nodes": [{ "children": [1] }, { "children": [0] }]
        }));
        let mut scene = Scene::new();
        let mut spawned = Vec::new();
        let nodes = build_nodes(&mut scene, &document, &[], &[], &mut spawned).unwrap();
        let err = link_hierarchy(&mut scene, &document, &nodes).unwrap_err();
        assert!(matches!(err, ImportError::Scene(_)));
    }
}
