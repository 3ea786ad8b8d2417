//! Stage 5: materials and the textures they reference.

use std::collections::HashMap;

use glam::{Vec3, Vec4};
use gltf::json;
use gltf::json::material::AlphaMode as GltfAlphaMode;
use gltf::json::validation::Checked;

use super::document::Document;
use crate::asset::{
    DecodedImage, Filter, GpuContext, TextureDescriptor, TextureEncoding, TextureHandle, Wrap,
};
use crate::error::ImportError;
use crate::scene::material::{AlphaMode, MaterialAttr};
use crate::settings::ImportSettings;

fn slot(info: &Option<json::texture::Info>) -> Option<usize> {
    info.as_ref().map(|info| info.index.value())
}

/// Builds material attribute lists and uploads each (texture, encoding)
/// pair at most once.
pub(crate) struct MaterialBuilder<'a> {
    document: &'a Document,
    images: &'a [Option<DecodedImage>],
    settings: &'a ImportSettings,
    textures: HashMap<(usize, TextureEncoding), TextureHandle>,
}

impl<'a> MaterialBuilder<'a> {
    pub fn new(
        document: &'a Document,
        images: &'a [Option<DecodedImage>],
        settings: &'a ImportSettings,
    ) -> Self {
        Self {
            document,
            images,
            settings,
            textures: HashMap::new(),
        }
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Attributes for `material`, or defaults carrying the shadow settings
    /// when the primitive references none.
    pub fn material_attrs(
        &mut self,
        material: Option<usize>,
        gpu: &mut dyn GpuContext,
    ) -> Result<Vec<MaterialAttr>, ImportError> {
        let mut attrs = vec![
            MaterialAttr::CastShadows(self.settings.cast_shadows),
            MaterialAttr::ReceiveShadows(self.settings.receive_shadows),
        ];
        let Some(index) = material else {
            return Ok(attrs);
        };
        let document = self.document;
        let def = document.materials.get(index).ok_or(ImportError::MissingReference {
            kind: "material",
            index,
        })?;
        log::debug!(
            "Building material {} ({})",
            index,
            def.name.as_deref().unwrap_or("unnamed")
        );
        self.push_metallic_roughness(&def.pbr_metallic_roughness, &mut attrs, gpu)?;
        self.push_specular_glossiness(def, &mut attrs, gpu)?;
        self.push_common(def, &mut attrs, gpu)?;
        Ok(attrs)
    }

    fn push_metallic_roughness(
        &mut self,
        pbr: &json::material::PbrMetallicRoughness,
        attrs: &mut Vec<MaterialAttr>,
        gpu: &mut dyn GpuContext,
    ) -> Result<(), ImportError> {
        attrs.push(MaterialAttr::BaseColor(Vec4::from_array(pbr.base_color_factor.0)));
        attrs.push(MaterialAttr::Metallic(pbr.metallic_factor.0));
        attrs.push(MaterialAttr::Roughness(pbr.roughness_factor.0));
        if let Some(handle) =
            self.texture(slot(&pbr.base_color_texture), TextureEncoding::Srgb, gpu)?
        {
            attrs.push(MaterialAttr::BaseColorMap(Some(handle)));
        }
        if let Some(handle) =
            self.texture(slot(&pbr.metallic_roughness_texture), TextureEncoding::Linear, gpu)?
        {
            attrs.push(MaterialAttr::MetallicRoughnessMap(Some(handle)));
        }
        Ok(())
    }

    fn push_specular_glossiness(
        &mut self,
        def: &json::Material,
        attrs: &mut Vec<MaterialAttr>,
        gpu: &mut dyn GpuContext,
    ) -> Result<(), ImportError> {
        let Some(sg) = def
            .extensions
            .as_ref()
            .and_then(|extensions| extensions.pbr_specular_glossiness.as_ref())
        else {
            return Ok(());
        };
        attrs.push(MaterialAttr::Diffuse(Vec4::from_array(sg.diffuse_factor.0)));
        attrs.push(MaterialAttr::Specular(Vec3::from_array(sg.specular_factor.0)));
        attrs.push(MaterialAttr::Glossiness(sg.glossiness_factor.0));
        if let Some(handle) =
            self.texture(slot(&sg.diffuse_texture), TextureEncoding::Srgb, gpu)?
        {
            attrs.push(MaterialAttr::DiffuseMap(Some(handle)));
        }
        if let Some(handle) =
            self.texture(slot(&sg.specular_glossiness_texture), TextureEncoding::Srgb, gpu)?
        {
            attrs.push(MaterialAttr::SpecularGlossinessMap(Some(handle)));
        }
        Ok(())
    }

    fn push_common(
        &mut self,
        def: &json::Material,
        attrs: &mut Vec<MaterialAttr>,
        gpu: &mut dyn GpuContext,
    ) -> Result<(), ImportError> {
        if let Some(info) = &def.normal_texture {
            if let Some(handle) =
                self.texture(Some(info.index.value()), TextureEncoding::Linear, gpu)?
            {
                attrs.push(MaterialAttr::NormalMap(Some(handle)));
                attrs.push(MaterialAttr::NormalScale(info.scale));
            }
        }
        if let Some(info) = &def.occlusion_texture {
            if let Some(handle) =
                self.texture(Some(info.index.value()), TextureEncoding::Linear, gpu)?
            {
                attrs.push(MaterialAttr::OcclusionMap(Some(handle)));
                attrs.push(MaterialAttr::OcclusionStrength(info.strength.0));
            }
        }
        if let Some(handle) =
            self.texture(slot(&def.emissive_texture), TextureEncoding::Srgb, gpu)?
        {
            attrs.push(MaterialAttr::EmissiveColorMap(Some(handle)));
        }
        attrs.push(MaterialAttr::EmissiveColor(
            Vec3::from_array(def.emissive_factor.0).extend(1.0),
        ));
        let alpha_mode = match &def.alpha_mode {
            Checked::Valid(GltfAlphaMode::Opaque) => Some(AlphaMode::Opaque),
            Checked::Valid(GltfAlphaMode::Mask) => Some(AlphaMode::Mask),
            Checked::Valid(GltfAlphaMode::Blend) => Some(AlphaMode::Blend),
            Checked::Invalid => None,
        };
        match alpha_mode {
            Some(mode) => attrs.push(MaterialAttr::AlphaMode(mode)),
            None => log::warn!("Material has an unknown alpha mode, keeping opaque"),
        }
        if let Some(cutoff) = &def.alpha_cutoff {
            attrs.push(MaterialAttr::AlphaCutoff(cutoff.0));
        }
        attrs.push(MaterialAttr::CullFace(!def.double_sided));
        Ok(())
    }

    /// Resolves a texture slot. Dangling references are skipped with a
    /// warning; GPU failures abort.
    fn texture(
        &mut self,
        index: Option<usize>,
        encoding: TextureEncoding,
        gpu: &mut dyn GpuContext,
    ) -> Result<Option<TextureHandle>, ImportError> {
        let Some(index) = index else {
            return Ok(None);
        };
        if let Some(&handle) = self.textures.get(&(index, encoding)) {
            return Ok(Some(handle));
        }

        let document = self.document;
        let images = self.images;
        let Some(texture) = document.textures.get(index) else {
            log::warn!("Texture {} is referenced but not defined", index);
            return Ok(None);
        };
        let Some(image) = images.get(texture.source.value()).and_then(Option::as_ref) else {
            log::warn!("Texture {} has no decoded image source", index);
            return Ok(None);
        };
        let sampler = texture
            .sampler
            .and_then(|sampler| document.samplers.get(sampler.value()));

        let wrap = |mode: Option<&Checked<json::texture::WrappingMode>>| match mode {
            Some(Checked::Valid(mode)) => Wrap::from_gl(mode.as_gl_enum()).unwrap_or(Wrap::Repeat),
            _ => Wrap::Repeat,
        };
        let min_filter = match sampler.and_then(|s| s.min_filter.as_ref()) {
            Some(Checked::Valid(filter)) => Filter::from_gl(filter.as_gl_enum()),
            _ => None,
        }
        .unwrap_or(self.settings.default_min_filter);
        let mag_filter = match sampler.and_then(|s| s.mag_filter.as_ref()) {
            Some(Checked::Valid(filter)) => Filter::from_gl(filter.as_gl_enum()),
            _ => None,
        }
        .unwrap_or(Filter::Linear);

        let resized;
        let mut descriptor = TextureDescriptor {
            image,
            encoding,
            wrap_s: wrap(sampler.map(|s| &s.wrap_s)),
            wrap_t: wrap(sampler.map(|s| &s.wrap_t)),
            min_filter,
            mag_filter,
            mipmap: min_filter.uses_mipmaps(),
            anisotropy: self.settings.anisotropy,
        };

        if gpu.restricts_npot_textures()
            && self.settings.resize_npot_textures
            && descriptor.needs_power_of_two()
            && !(gpu.is_power_of_two(image.width) && gpu.is_power_of_two(image.height))
        {
            let width = image.width.next_power_of_two();
            let height = image.height.next_power_of_two();
            log::warn!(
                "Resizing texture {} from {}x{} to {}x{} for power-of-two sampling",
                index,
                image.width,
                image.height,
                width,
                height
            );
            match image.resized(width, height) {
                Some(image) => {
                    resized = image;
                    descriptor.image = &resized;
                }
                None => log::warn!("Texture {} pixel data does not match its size", index),
            }
        }

        let handle = gpu.create_texture_2d(&descriptor)?;
        self.textures.insert((index, encoding), handle);
        Ok(Some(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::HeadlessGpu;
    use crate::scene::material::Material;

    fn document(mut value: serde_json::Value) -> Document {
        value["asset"] = serde_json::json!({ "version": "2.0" });
        super::super::document::from_json(value)
    }

    fn setup() -> (Document, Vec<Option<DecodedImage>>) {
        let document = document(serde_json::json!({
            "materials": [{
                "pbrMetallicRoughness": {
                    "baseColorTexture": { "index": 0 },
                    "metallicRoughnessTexture": { "index": 0 },
                    "metallicFactor": 0.25
                },
                "emissiveTexture": { "index": 0 },
                "emissiveFactor": [1.0, 0.5, 0.0],
                "doubleSided": true,
                "extensions": {
                    "KHR_materials_pbrSpecularGlossiness": { "glossinessFactor": 0.5 }
                }
            }],
            "textures": [{ "source": 0 }],
            "images": [{ "uri": "a.png" }]
        }));
        let images = vec![Some(DecodedImage::new(3, 5, vec![255; 3 * 5 * 4]))];
        (document, images)
    }

    #[test]
    fn textures_are_cached_per_encoding() {
        let (document, images) = setup();
        let settings = ImportSettings::default();
        let mut gpu = HeadlessGpu::unrestricted();
        let mut builder = MaterialBuilder::new(&document, &images, &settings);

        let attrs = builder.material_attrs(Some(0), &mut gpu).unwrap();
        builder.material_attrs(Some(0), &mut gpu).unwrap();
        let material = Material::new(attrs);

        // Base color and emissive share the sRGB upload.
        assert_eq!(gpu.texture_count(), 2);
        assert_eq!(material.base_color_map, material.emissive_color_map);
        assert_ne!(material.base_color_map, material.metallic_roughness_map);
        assert_eq!(material.metallic, 0.25);
        assert_eq!(material.roughness, 1.0);
        assert_eq!(material.glossiness, 0.5);
        assert_eq!(material.emissive_color, Vec4::new(1.0, 0.5, 0.0, 1.0));
        assert!(!material.cull_face);
        assert!(material.cast_shadows);
    }

    #[test]
    fn npot_images_are_resized_when_restricted() {
        let (document, images) = setup();
        let settings = ImportSettings::default();
        let mut gpu = HeadlessGpu::new();
        let mut builder = MaterialBuilder::new(&document, &images, &settings);
        let attrs = builder.material_attrs(Some(0), &mut gpu).unwrap();
        let material = Material::new(attrs);

        let texture = gpu.texture(material.base_color_map.unwrap()).unwrap();
        assert_eq!((texture.width, texture.height), (4, 8));
        assert!(texture.mipmap);
    }

    #[test]
    fn npot_images_are_kept_when_resizing_disabled() {
        let (document, images) = setup();
        let settings = ImportSettings {
            resize_npot_textures: false,
            ..ImportSettings::default()
        };
        let mut gpu = HeadlessGpu::new();
        let mut builder = MaterialBuilder::new(&document, &images, &settings);
        let attrs = builder.material_attrs(Some(0), &mut gpu).unwrap();
        let material = Material::new(attrs);

        let texture = gpu.texture(material.base_color_map.unwrap()).unwrap();
        assert_eq!((texture.width, texture.height), (3, 5));
    }

    #[test]
    fn dangling_texture_is_skipped() {
        let document = document(serde_json::json!({
            "materials": [{ "normalTexture": { "index": 4, "scale": 2.0 } }]
        }));
        let settings = ImportSettings::default();
        let mut gpu = HeadlessGpu::new();
        let mut builder = MaterialBuilder::new(&document, &[], &settings);
        let material = Material::new(builder.material_attrs(Some(0), &mut gpu).unwrap());
        assert!(material.normal_map.is_none());
        assert_eq!(material.normal_scale, 1.0);
        assert!(material.cull_face);
    }
}
