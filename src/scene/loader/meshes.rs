//! Stage 6: mesh primitives resolved into geometry and material recipes.
//!
//! A node may instance the same mesh more than once, so every primitive is
//! kept as attribute lists and turned into components per node.

use glam::Vec3;
use gltf::json::mesh::{Mode, Primitive, Semantic};
use gltf::json::validation::Checked;

use super::buffers::Accessor;
use super::document::Document;
use super::materials::MaterialBuilder;
use crate::asset::GpuContext;
use crate::error::ImportError;
use crate::math::Aabb;
use crate::scene::geometry::{
    Geometry, GeometryAttr, IndexStream, Topology, VertexAttribute, VertexSemantic,
};
use crate::scene::material::{Material, MaterialAttr};
use crate::scene::components::Morph;

#[derive(Debug, Clone)]
pub(crate) struct PrimitiveRecipe {
    pub geometry: Vec<GeometryAttr>,
    pub material: Vec<MaterialAttr>,
    pub morph: Option<(Vec<Vec<f32>>, Vec<f32>)>,
}

impl PrimitiveRecipe {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.geometry.iter().cloned())
    }

    pub fn material(&self) -> Material {
        Material::new(self.material.iter().cloned())
    }

    pub fn morph(&self) -> Option<Morph> {
        self.morph
            .as_ref()
            .map(|(targets, weights)| Morph::new(targets.clone(), weights.clone()))
    }
}

pub(crate) fn build_meshes(
    document: &Document,
    accessors: &[Accessor],
    materials: &mut MaterialBuilder<'_>,
    gpu: &mut dyn GpuContext,
) -> Result<Vec<Vec<PrimitiveRecipe>>, ImportError> {
    let mut meshes = Vec::with_capacity(document.meshes.len());
    for (mesh_index, mesh) in document.meshes.iter().enumerate() {
        log::debug!(
            "Mesh {} ({}) with {} primitives",
            mesh_index,
            mesh.name.as_deref().unwrap_or("unnamed"),
            mesh.primitives.len()
        );
        let mut primitives = Vec::with_capacity(mesh.primitives.len());
        for primitive in &mesh.primitives {
            let geometry = geometry_attrs(mesh_index, primitive, accessors)?;
            let material =
                materials.material_attrs(primitive.material.map(|m| m.value()), gpu)?;
            let morph = morph_targets(primitive, mesh.weights.as_deref(), accessors)?;
            primitives.push(PrimitiveRecipe {
                geometry,
                material,
                morph,
            });
        }
        meshes.push(primitives);
    }
    Ok(meshes)
}

fn accessor<'a>(accessors: &'a [Accessor], index: usize) -> Result<&'a Accessor, ImportError> {
    accessors.get(index).ok_or(ImportError::MissingReference {
        kind: "accessor",
        index,
    })
}

fn semantic(name: &Checked<Semantic>) -> Option<VertexSemantic> {
    match name {
        Checked::Valid(Semantic::Positions) => Some(VertexSemantic::Position),
        Checked::Valid(Semantic::Normals) => Some(VertexSemantic::Normal),
        Checked::Valid(Semantic::Tangents) => Some(VertexSemantic::Tangent),
        Checked::Valid(Semantic::TexCoords(set @ 0..=2)) => Some(VertexSemantic::TexCoord(*set as u8)),
        Checked::Valid(Semantic::Joints(0)) => Some(VertexSemantic::Joints),
        Checked::Valid(Semantic::Weights(0)) => Some(VertexSemantic::Weights),
        Checked::Valid(Semantic::Colors(0)) => Some(VertexSemantic::Color),
        _ => None,
    }
}

fn topology(mesh_index: usize, mode: &Checked<Mode>) -> Topology {
    match mode {
        Checked::Valid(Mode::Points) => Topology::Points,
        Checked::Valid(Mode::Lines) => Topology::Lines,
        Checked::Valid(Mode::LineLoop) => Topology::LineLoop,
        Checked::Valid(Mode::LineStrip) => Topology::LineStrip,
        Checked::Valid(Mode::Triangles) => Topology::Triangles,
        Checked::Valid(Mode::TriangleStrip) => Topology::TriangleStrip,
        Checked::Valid(Mode::TriangleFan) => Topology::TriangleFan,
        Checked::Invalid => {
            log::warn!("Mesh {} has an unknown primitive mode, using triangles", mesh_index);
            Topology::Triangles
        }
    }
}

fn geometry_attrs(
    mesh_index: usize,
    primitive: &Primitive,
    accessors: &[Accessor],
) -> Result<Vec<GeometryAttr>, ImportError> {
    let mut attrs = Vec::new();
    let mut vertex_count = 0;
    let mut bounds = None;

    for (name, index) in &primitive.attributes {
        let semantic = semantic(name).ok_or_else(|| ImportError::UnknownAttribute {
            mesh: mesh_index,
            name: match name {
                Checked::Valid(name) => name.to_string(),
                Checked::Invalid => "<unrecognized>".to_owned(),
            },
        })?;
        let source = accessor(accessors, index.value())?;

        if semantic == VertexSemantic::Position {
            vertex_count = source.count;
            bounds = accessor_bounds(source);
        }

        let attribute = match (&source.gpu, &source.data) {
            (Some(stream), _) => VertexAttribute::Gpu {
                stream: *stream,
                size: source.size,
            },
            (None, Some(data)) => VertexAttribute::Data {
                data: data.clone(),
                size: source.size,
            },
            (None, None) => {
                log::warn!(
                    "Mesh {} attribute {} has no usable data, skipping",
                    mesh_index,
                    semantic.name()
                );
                continue;
            }
        };
        attrs.push(GeometryAttr::Attribute(semantic, attribute));
    }

    let indices = match &primitive.indices {
        Some(index) => {
            let source = accessor(accessors, index.value())?;
            match (&source.gpu, &source.data) {
                (Some(stream), _) => Some(IndexStream::Gpu {
                    stream: *stream,
                    count: source.count,
                }),
                (None, Some(data)) => Some(IndexStream::Data(data.clone())),
                (None, None) => {
                    log::warn!("Mesh {} indices have no usable data, drawing unindexed", mesh_index);
                    None
                }
            }
        }
        None => None,
    };
    attrs.push(GeometryAttr::Indices(indices));
    attrs.push(GeometryAttr::Count(vertex_count));
    attrs.push(GeometryAttr::Bounds(bounds));

    attrs.push(GeometryAttr::Topology(topology(mesh_index, &primitive.mode)));

    Ok(attrs)
}

/// Bounds from the accessor's declared min/max, falling back to scanning
/// the decoded positions.
fn accessor_bounds(source: &Accessor) -> Option<Aabb> {
    if let (Some(min), Some(max)) = (&source.min, &source.max) {
        if min.len() >= 3 && max.len() >= 3 {
            return Some(Aabb::new(Vec3::from_slice(min), Vec3::from_slice(max)));
        }
    }
    let positions = source.floats()?;
    let bounds = Aabb::from_points(positions.chunks_exact(3).map(Vec3::from_slice));
    (!bounds.is_empty()).then_some(bounds)
}

fn morph_targets(
    primitive: &Primitive,
    mesh_weights: Option<&[f32]>,
    accessors: &[Accessor],
) -> Result<Option<(Vec<Vec<f32>>, Vec<f32>)>, ImportError> {
    let Some(morphs) = primitive.targets.as_ref().filter(|targets| !targets.is_empty()) else {
        return Ok(None);
    };
    let mut targets = Vec::with_capacity(morphs.len());
    for target in morphs {
        let positions = match &target.positions {
            Some(index) => accessor(accessors, index.value())?.floats().unwrap_or_default(),
            None => Vec::new(),
        };
        targets.push(positions);
    }
    let weights = match mesh_weights {
        Some(weights) => weights.to_vec(),
        None => vec![0.0; targets.len()],
    };
    Ok(Some((targets, weights)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::geometry::TypedArray;

    fn positions() -> Accessor {
        Accessor {
            count: 3,
            size: 3,
            gpu: None,
            data: Some(TypedArray::F32(vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, -1.0,
            ])),
            min: None,
            max: None,
        }
    }

    fn primitive(json: serde_json::Value) -> Primitive {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn unindexed_primitive_uses_vertex_count_and_scanned_bounds() {
        let attrs =
            geometry_attrs(0, &primitive(serde_json::json!({ "attributes": { "POSITION": 0 } })), &[positions()])
                .unwrap();
        let geometry = Geometry::new(attrs);
        assert!(geometry.indices().is_none());
        assert_eq!(geometry.count(), 3);
        assert_eq!(
            geometry.bounds(),
            Some(Aabb::new(Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 0.0)))
        );
        assert_eq!(geometry.topology(), Topology::Triangles);
    }

    #[test]
    fn unknown_attribute_is_fatal() {
        let err = geometry_attrs(
            2,
            &primitive(serde_json::json!({ "attributes": { "POSITION": 0, "TEXCOORD_5": 0 } })),
            &[positions()],
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::UnknownAttribute { mesh: 2, ref name } if name == "TEXCOORD_5"));
    }

    #[test]
    fn semantics_map_to_geometry_streams() {
        assert_eq!(
            semantic(&Checked::Valid(Semantic::TexCoords(1))).map(|s| s.name()),
            Some("tex_coords1")
        );
        assert_eq!(semantic(&Checked::Valid(Semantic::Colors(0))), Some(VertexSemantic::Color));
        assert_eq!(semantic(&Checked::Valid(Semantic::Joints(1))), None);
        assert_eq!(semantic(&Checked::Invalid), None);
    }

    #[test]
    fn unknown_mode_falls_back_to_triangles() {
        let prim = primitive(serde_json::json!({ "attributes": { "POSITION": 0 }, "mode": 9 }));
        assert_eq!(topology(0, &prim.mode), Topology::Triangles);
        let prim = primitive(serde_json::json!({ "attributes": { "POSITION": 0 }, "mode": 3 }));
        assert_eq!(topology(0, &prim.mode), Topology::LineStrip);
    }

    #[test]
    fn morph_weights_default_to_zero() {
        let prim = primitive(serde_json::json!({
            "attributes": { "POSITION": 0 },
            "targets": [{ "POSITION": 0 }, { "POSITION": 0 }]
        }));
        let (targets, weights) = morph_targets(&prim, None, &[positions()]).unwrap().unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].len(), 9);
        assert_eq!(weights, vec![0.0, 0.0]);
    }
}
