//! Stage 10: animation clips.

use gltf::json;
use gltf::json::animation::{Interpolation as GltfInterpolation, Property};
use gltf::json::validation::Checked;
use hecs::Entity;

use super::buffers::Accessor;
use super::document::Document;
use super::nodes::NodeEntity;
use crate::error::ImportError;
use crate::scene::animation::{AnimationChannel, AnimationClip, Interpolation, TargetPath};
use crate::scene::components::Morph;
use crate::scene::Scene;

pub(crate) fn build_clips(
    scene: &Scene,
    document: &Document,
    accessors: &[Accessor],
    nodes: &[NodeEntity],
) -> Result<Vec<AnimationClip>, ImportError> {
    let mut clips = Vec::with_capacity(document.animations.len());
    for (index, animation) in document.animations.iter().enumerate() {
        let name = animation
            .name
            .clone()
            .unwrap_or_else(|| format!("animation_{}", index));
        let mut clip = AnimationClip::new(name);
        for channel in &animation.channels {
            if let Some(channel) = build_channel(scene, animation, channel, accessors, nodes)? {
                clip.add_channel(channel);
            }
        }
        log::debug!(
            "Clip {} has {} channels over {:.3}s",
            clip.name,
            clip.channels.len(),
            clip.duration
        );
        clips.push(clip);
    }
    Ok(clips)
}

fn target_path(path: &Checked<Property>) -> Option<TargetPath> {
    match path {
        Checked::Valid(Property::Translation) => Some(TargetPath::Translation),
        Checked::Valid(Property::Rotation) => Some(TargetPath::Rotation),
        Checked::Valid(Property::Scale) => Some(TargetPath::Scale),
        Checked::Valid(Property::MorphTargetWeights) => Some(TargetPath::Weights),
        Checked::Invalid => None,
    }
}

fn build_channel(
    scene: &Scene,
    animation: &json::Animation,
    channel: &json::animation::Channel,
    accessors: &[Accessor],
    nodes: &[NodeEntity],
) -> Result<Option<AnimationChannel>, ImportError> {
    let node = channel.target.node.value();
    let target = nodes
        .get(node)
        .ok_or(ImportError::MissingReference { kind: "node", index: node })?
        .entity;
    let Some(path) = target_path(&channel.target.path) else {
        log::warn!("Skipping animation channel on node {} with an unsupported path", node);
        return Ok(None);
    };

    let sampler_index = channel.sampler.value();
    let sampler = animation
        .samplers
        .get(sampler_index)
        .ok_or(ImportError::MissingReference {
            kind: "animation sampler",
            index: sampler_index,
        })?;
    let interpolation = match &sampler.interpolation {
        Checked::Valid(GltfInterpolation::Step) => Interpolation::Step,
        Checked::Valid(GltfInterpolation::Linear) => Interpolation::Linear,
        Checked::Valid(GltfInterpolation::CubicSpline) => Interpolation::CubicSpline,
        Checked::Invalid => {
            log::warn!("Unknown interpolation on sampler {}, using linear", sampler_index);
            Interpolation::Linear
        }
    };

    let lookup = |index: usize| {
        accessors
            .get(index)
            .ok_or(ImportError::MissingReference { kind: "accessor", index })
    };
    let input_accessor = lookup(sampler.input.value())?;
    let output_accessor = lookup(sampler.output.value())?;
    let (Some(input), Some(output)) = (input_accessor.floats(), output_accessor.floats()) else {
        log::warn!("Skipping animation channel on node {} with unreadable keyframes", node);
        return Ok(None);
    };

    let arity = match path {
        TargetPath::Weights => morph_weight_count(scene, target).unwrap_or(1),
        _ => output_accessor.size,
    }
    .max(1);

    Ok(Some(AnimationChannel {
        input,
        output: output.chunks(arity).map(<[f32]>::to_vec).collect(),
        interpolation,
        target,
        path,
    }))
}

/// Weight count of the Morph on `entity`, or on its first child that has one
/// (the sub-entity case of multi-primitive meshes).
fn morph_weight_count(scene: &Scene, entity: Entity) -> Option<usize> {
    if let Some(morph) = scene.get::<Morph>(entity) {
        return Some(morph.weights().len());
    }
    scene
        .children(entity)
        .into_iter()
        .find_map(|child| scene.get::<Morph>(child).map(|morph| morph.weights().len()))
        .filter(|&count| count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::geometry::TypedArray;
    use crate::scene::AnyComponent;

    fn floats(size: usize, values: Vec<f32>) -> Accessor {
        Accessor {
            count: values.len() / size,
            size,
            gpu: None,
            data: Some(TypedArray::F32(values)),
            min: None,
            max: None,
        }
    }

    fn morph(count: usize) -> AnyComponent {
        Morph::new(vec![Vec::new(); count], vec![0.0; count]).into()
    }

    fn document() -> Document {
        super::super::document::from_json(serde_json::json!({
            "asset": { "version": "2.0" },
            "buffers": [],
            "nodes": [{}],
            "animations": [{
                "samplers": [
                    { "input": 0, "output": 1 },
                    { "input": 0, "output": 2, "interpolation": "STEP" }
                ],
                "channels": [
                    { "sampler": 0, "target": { "node": 0, "path": "translation" } },
                    { "sampler": 1, "target": { "node": 0, "path": "weights" } },
                    { "sampler": 0, "target": { "node": 0, "path": "pointer" } }
                ]
            }]
        }))
    }

    #[test]
    fn outputs_are_reshaped_by_target_arity() {
        let mut scene = Scene::new();
        let entity = scene
            .spawn([morph(2)], None, std::iter::empty::<String>())
            .unwrap();
        let nodes = vec![NodeEntity { entity, skin: None }];
        let accessors = vec![
            floats(1, vec![0.0, 1.0]),
            floats(3, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0]),
            floats(1, vec![0.0, 1.0, 1.0, 0.0]),
        ];

        let clips = build_clips(&scene, &document(), &accessors, &nodes).unwrap();
        assert_eq!(clips.len(), 1);
        let clip = &clips[0];
        assert_eq!(clip.name, "animation_0");
        // The channel with an unsupported path is dropped.
        assert_eq!(clip.channels.len(), 2);
        assert_eq!(clip.channels[0].output, vec![vec![0.0, 0.0, 0.0], vec![1.0, 2.0, 3.0]]);
        assert_eq!(clip.channels[1].output, vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(clip.channels[1].interpolation, Interpolation::Step);
        assert_eq!(clip.duration, 1.0);
    }
    #[test]
    fn channel_without_target_node_fails_to_parse() {
        let parsed = serde_json::from_value::<json::animation::Channel>(serde_json::json!({
            "sampler": 0,
            "target": { "path": "translation" }
        }));
        assert!(parsed.is_err());
    }
}
