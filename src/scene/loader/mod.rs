// scene/loader/mod.rs
// glTF 2.0 import into a Scene

mod animations;
mod buffers;
mod document;
mod materials;
mod meshes;
mod nodes;

use std::collections::HashSet;

use hecs::Entity;

use self::document::Document;
use self::materials::MaterialBuilder;
use self::meshes::PrimitiveRecipe;
use crate::asset::GpuContext;
use crate::error::ImportError;
use crate::io::AssetSource;
use crate::scene::animation::Animation;
use crate::scene::component::AnyComponent;
use crate::scene::geometry::Geometry;
use crate::scene::skin::Skin;
use crate::scene::Scene;
use crate::settings::{ImportSettings, PruneMode};

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedScene {
    /// Synthetic root parenting every top-level node. Holds the Animation
    /// component when the document has animations.
    pub root: Entity,
    /// Every entity still alive after pruning, in creation order, root last.
    pub entities: Vec<Entity>,
    /// Subtrees without geometry or joints. Under [`PruneMode::Remove`]
    /// these are already gone from the scene.
    pub pruned: Vec<Entity>,
}

/// Loads glTF documents (`.gltf` or `.glb`) into a [`Scene`].
///
/// Resources come from an [`AssetSource`]; buffers and textures are created
/// through a [`GpuContext`].
pub struct SceneLoader<'a> {
    source: &'a dyn AssetSource,
    gpu: &'a mut dyn GpuContext,
    settings: ImportSettings,
}

impl<'a> SceneLoader<'a> {
    pub fn new(source: &'a dyn AssetSource, gpu: &'a mut dyn GpuContext) -> Self {
        Self {
            source,
            gpu,
            settings: ImportSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ImportSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Imports `uri` into `scene`.
    ///
    /// Either the whole document lands in the scene or nothing does: a
    /// failure after entities were spawned removes them again. GPU resources
    /// created before the failure are not released.
    pub fn load_gltf(&mut self, scene: &mut Scene, uri: &str) -> Result<ImportedScene, ImportError> {
        log::info!("=== Loading glTF: {} ===", uri);

        let bytes = self.source.load_binary(uri)?;
        let (document, embedded) = document::parse(&bytes)?;
        log::info!(
            "Document: {} nodes, {} meshes, {} materials, {} animations",
            document.nodes.len(),
            document.meshes.len(),
            document.materials.len(),
            document.animations.len()
        );

        let parallel = self.settings.parallel_loads;
        log::info!("Loading buffers...");
        let buffers =
            buffers::load_buffers(&document, uri, embedded.as_deref(), self.source, parallel)?;

        log::info!("Loading images...");
        let mut images = buffers::load_images(&document, uri, self.source, parallel)?;

        let views = buffers::materialize_views(&document, &buffers, &mut *self.gpu)?;
        buffers::decode_embedded_images(&document.images, &mut images, &views, &buffers)?;
        log::info!("Loaded {} images", images.iter().flatten().count());

        let accessors = buffers::materialize_accessors(&document, &views, &buffers)?;
        log::debug!("Materialized {} views, {} accessors", views.len(), accessors.len());

        log::info!("Building meshes...");
        let mut materials = MaterialBuilder::new(&document, &images, &self.settings);
        let meshes = meshes::build_meshes(&document, &accessors, &mut materials, &mut *self.gpu)?;
        log::info!(
            "Built {} meshes, {} textures",
            meshes.len(),
            materials.texture_count()
        );

        let mut spawned = Vec::new();
        match self.assemble(scene, &document, &accessors, &meshes, &mut spawned) {
            Ok(imported) => {
                log::info!(
                    "=== glTF loaded: {} entities, {} pruned ===",
                    imported.entities.len(),
                    imported.pruned.len()
                );
                Ok(imported)
            }
            Err(err) => {
                for &entity in spawned.iter().rev() {
                    if !scene.contains(entity) {
                        continue;
                    }
                    if let Err(remove_err) = scene.remove(entity) {
                        log::warn!("Rollback could not remove {:?}: {}", entity, remove_err);
                    }
                }
                log::warn!("Import of {} failed, rolled back {} entities: {}", uri, spawned.len(), err);
                Err(err)
            }
        }
    }

    fn assemble(
        &self,
        scene: &mut Scene,
        document: &Document,
        accessors: &[buffers::Accessor],
        meshes: &[Vec<PrimitiveRecipe>],
        spawned: &mut Vec<Entity>,
    ) -> Result<ImportedScene, ImportError> {
        log::info!("Creating nodes...");
        let nodes = nodes::build_nodes(scene, document, accessors, meshes, spawned)?;
        nodes::link_hierarchy(scene, document, &nodes)?;
        nodes::bind_joints(document, &nodes)?;

        let clips = animations::build_clips(scene, document, accessors, &nodes)?;
        let mut root_components = Vec::new();
        if !clips.is_empty() {
            log::info!("Loaded {} animation clips", clips.len());
            root_components.push(AnyComponent::from(Animation::new(clips)));
        }
        let root = scene.spawn_named(
            Some("root".to_string()),
            root_components,
            None,
            std::iter::empty::<String>(),
        )?;
        spawned.push(root);

        for node in &nodes {
            if scene.parent(node.entity).is_none() {
                scene.set_parent(node.entity, Some(root))?;
            }
        }

        let mut entities = spawned.clone();
        let pruned = match self.settings.prune {
            PruneMode::Keep => Vec::new(),
            PruneMode::Flag | PruneMode::Remove => prunable(scene, &entities, root),
        };
        if self.settings.prune == PruneMode::Remove {
            for &entity in &pruned {
                scene.remove(entity)?;
            }
            entities.retain(|entity| !pruned.contains(entity));
        }
        if !pruned.is_empty() {
            log::debug!("Pruned {} entities ({:?})", pruned.len(), self.settings.prune);
        }

        scene.update_transforms();
        Ok(ImportedScene {
            root,
            entities,
            pruned,
        })
    }
}

/// Entities whose subtree holds no Geometry and which are neither a skin
/// joint nor an ancestor of one.
fn prunable(scene: &Scene, entities: &[Entity], root: Entity) -> Vec<Entity> {
    let mut used: HashSet<Entity> = HashSet::new();
    used.insert(root);

    let mut seeds: Vec<Entity> = Vec::new();
    for &entity in entities {
        if scene.get::<Geometry>(entity).is_some() {
            seeds.push(entity);
        }
        if let Some(skin) = scene.get::<Skin>(entity) {
            seeds.extend(skin.joints());
        }
    }

    for seed in seeds {
        let mut current = Some(seed);
        while let Some(entity) = current {
            if !used.insert(entity) && entity != seed {
                break;
            }
            current = scene.parent(entity);
        }
    }

    entities
        .iter()
        .copied()
        .filter(|entity| !used.contains(entity))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::asset::HeadlessGpu;
    use crate::io::MemorySource;

    fn triangle_document() -> serde_json::Value {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bytes = bytemuck::cast_slice::<f32, u8>(&positions);
        serde_json::json!({
            "asset": { "version": "2.0" },
            "buffers": [{
                "uri": format!("data:application/octet-stream;base64,{}", base64::encode(bytes)),
                "byteLength": 36
            }],
            "bufferViews": [{ "buffer": 0, "byteLength": 36, "target": 34962 }],
            "accessors": [{
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            }],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
            "nodes": [
                { "name": "mesh", "mesh": 0, "translation": [2.0, 0.0, 0.0] },
                { "name": "empty" }
            ]
        })
    }

    #[test]
    fn glb_container_imports_from_bin_chunk() {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mut document = triangle_document();
        document["buffers"][0] = serde_json::json!({ "byteLength": 36 });
        let glb = gltf::Glb {
            header: gltf::binary::Header {
                magic: *b"glTF",
                version: 2,
                length: 0,
            },
            json: Cow::Owned(document.to_string().into_bytes()),
            bin: Some(Cow::Borrowed(bytemuck::cast_slice::<f32, u8>(&positions))),
        }
        .to_vec()
        .unwrap();

        let mut source = MemorySource::new();
        source.insert("model.glb", glb);
        let mut gpu = HeadlessGpu::new();
        let mut scene = Scene::new();
        let imported = SceneLoader::new(&source, &mut gpu)
            .load_gltf(&mut scene, "model.glb")
            .unwrap();

        let mesh = scene.find_by_name("mesh").unwrap();
        assert!(scene.get::<Geometry>(mesh).is_some());
        assert_eq!(imported.entities.last(), Some(&imported.root));
        assert_eq!(gpu.buffer_count(), 1);
        assert_eq!(gpu.buffer(crate::asset::Handle::new(0)).unwrap().bytes.len(), 36);
    }

    #[test]
    fn prune_modes_flag_or_remove_empty_nodes() {
        let mut source = MemorySource::new();
        source.insert_json("scene.gltf", &triangle_document());

        let mut gpu = HeadlessGpu::new();
        let mut scene = Scene::new();
        let flagged = SceneLoader::new(&source, &mut gpu)
            .load_gltf(&mut scene, "scene.gltf")
            .unwrap();
        let empty = scene.find_by_name("empty").unwrap();
        assert_eq!(flagged.pruned, vec![empty]);
        assert!(scene.contains(empty));

        let mut scene = Scene::new();
        let removed = SceneLoader::new(&source, &mut gpu)
            .with_settings(ImportSettings {
                prune: PruneMode::Remove,
                ..ImportSettings::default()
            })
            .load_gltf(&mut scene, "scene.gltf")
            .unwrap();
        assert_eq!(removed.pruned.len(), 1);
        assert!(scene.find_by_name("empty").is_none());
        assert_eq!(removed.entities.len(), 2);

        let mut scene = Scene::new();
        let kept = SceneLoader::new(&source, &mut gpu)
            .with_settings(ImportSettings {
                prune: PruneMode::Keep,
                ..ImportSettings::default()
            })
            .load_gltf(&mut scene, "scene.gltf")
            .unwrap();
        assert!(kept.pruned.is_empty());
        assert_eq!(kept.entities.len(), 3);
    }

    #[test]
    fn missing_nodes_collection_is_fatal() {
        let mut source = MemorySource::new();
        source.insert_json("scene.gltf", &serde_json::json!({ "buffers": [] }));
        let mut gpu = HeadlessGpu::new();
        let mut scene = Scene::new();
        let err = SceneLoader::new(&source, &mut gpu)
            .load_gltf(&mut scene, "scene.gltf")
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingCollection("nodes")));
        assert!(scene.is_empty());
    }
}
