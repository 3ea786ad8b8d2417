use glam::{Vec3, Vec4};

use super::component::{set_attributes, Attribute, Component, ComponentType};
use crate::asset::TextureHandle;
use crate::signal::ChangeSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialAttr {
    BaseColor(Vec4),
    BaseColorMap(Option<TextureHandle>),
    Metallic(f32),
    Roughness(f32),
    MetallicRoughnessMap(Option<TextureHandle>),
    Diffuse(Vec4),
    DiffuseMap(Option<TextureHandle>),
    Specular(Vec3),
    Glossiness(f32),
    SpecularGlossinessMap(Option<TextureHandle>),
    NormalMap(Option<TextureHandle>),
    NormalScale(f32),
    OcclusionMap(Option<TextureHandle>),
    OcclusionStrength(f32),
    EmissiveColor(Vec4),
    EmissiveColorMap(Option<TextureHandle>),
    AlphaMode(AlphaMode),
    AlphaCutoff(f32),
    CastShadows(bool),
    ReceiveShadows(bool),
    CullFace(bool),
}

impl Attribute for MaterialAttr {
    fn name(&self) -> &'static str {
        match self {
            MaterialAttr::BaseColor(_) => "base_color",
            MaterialAttr::BaseColorMap(_) => "base_color_map",
            MaterialAttr::Metallic(_) => "metallic",
            MaterialAttr::Roughness(_) => "roughness",
            MaterialAttr::MetallicRoughnessMap(_) => "metallic_roughness_map",
            MaterialAttr::Diffuse(_) => "diffuse",
            MaterialAttr::DiffuseMap(_) => "diffuse_map",
            MaterialAttr::Specular(_) => "specular",
            MaterialAttr::Glossiness(_) => "glossiness",
            MaterialAttr::SpecularGlossinessMap(_) => "specular_glossiness_map",
            MaterialAttr::NormalMap(_) => "normal_map",
            MaterialAttr::NormalScale(_) => "normal_scale",
            MaterialAttr::OcclusionMap(_) => "occlusion_map",
            MaterialAttr::OcclusionStrength(_) => "occlusion_strength",
            MaterialAttr::EmissiveColor(_) => "emissive_color",
            MaterialAttr::EmissiveColorMap(_) => "emissive_color_map",
            MaterialAttr::AlphaMode(_) => "alpha_mode",
            MaterialAttr::AlphaCutoff(_) => "alpha_cutoff",
            MaterialAttr::CastShadows(_) => "cast_shadows",
            MaterialAttr::ReceiveShadows(_) => "receive_shadows",
            MaterialAttr::CullFace(_) => "cull_face",
        }
    }
}

/// Surface parameters. Metallic-roughness and specular-glossiness values
/// live side by side; each parameterization only touches its own fields.
#[derive(Debug)]
pub struct Material {
    pub base_color: Vec4,
    pub base_color_map: Option<TextureHandle>,
    pub metallic: f32,
    pub roughness: f32,
    pub metallic_roughness_map: Option<TextureHandle>,
    pub diffuse: Vec4,
    pub diffuse_map: Option<TextureHandle>,
    pub specular: Vec3,
    pub glossiness: f32,
    pub specular_glossiness_map: Option<TextureHandle>,
    pub normal_map: Option<TextureHandle>,
    pub normal_scale: f32,
    pub occlusion_map: Option<TextureHandle>,
    pub occlusion_strength: f32,
    pub emissive_color: Vec4,
    pub emissive_color_map: Option<TextureHandle>,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    pub cull_face: bool,
    pub changed: ChangeSignal,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Vec4::ONE,
            base_color_map: None,
            metallic: 1.0,
            roughness: 1.0,
            metallic_roughness_map: None,
            diffuse: Vec4::ONE,
            diffuse_map: None,
            specular: Vec3::ONE,
            glossiness: 1.0,
            specular_glossiness_map: None,
            normal_map: None,
            normal_scale: 1.0,
            occlusion_map: None,
            occlusion_strength: 1.0,
            emissive_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emissive_color_map: None,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            cast_shadows: false,
            receive_shadows: false,
            cull_face: true,
            changed: ChangeSignal::new(),
        }
    }
}

impl Material {
    pub fn new(attrs: impl IntoIterator<Item = MaterialAttr>) -> Self {
        let mut material = Self::default();
        material.set(attrs);
        material
    }

    pub fn set(&mut self, attrs: impl IntoIterator<Item = MaterialAttr>) {
        set_attributes(self, attrs, Self::apply, |material| &material.changed);
    }

    fn apply(&mut self, attr: MaterialAttr) {
        match attr {
            MaterialAttr::BaseColor(v) => self.base_color = v,
            MaterialAttr::BaseColorMap(v) => self.base_color_map = v,
            MaterialAttr::Metallic(v) => self.metallic = v,
            MaterialAttr::Roughness(v) => self.roughness = v,
            MaterialAttr::MetallicRoughnessMap(v) => self.metallic_roughness_map = v,
            MaterialAttr::Diffuse(v) => self.diffuse = v,
            MaterialAttr::DiffuseMap(v) => self.diffuse_map = v,
            MaterialAttr::Specular(v) => self.specular = v,
            MaterialAttr::Glossiness(v) => self.glossiness = v,
            MaterialAttr::SpecularGlossinessMap(v) => self.specular_glossiness_map = v,
            MaterialAttr::NormalMap(v) => self.normal_map = v,
            MaterialAttr::NormalScale(v) => self.normal_scale = v,
            MaterialAttr::OcclusionMap(v) => self.occlusion_map = v,
            MaterialAttr::OcclusionStrength(v) => self.occlusion_strength = v,
            MaterialAttr::EmissiveColor(v) => self.emissive_color = v,
            MaterialAttr::EmissiveColorMap(v) => self.emissive_color_map = v,
            MaterialAttr::AlphaMode(v) => self.alpha_mode = v,
            MaterialAttr::AlphaCutoff(v) => self.alpha_cutoff = v,
            MaterialAttr::CastShadows(v) => self.cast_shadows = v,
            MaterialAttr::ReceiveShadows(v) => self.receive_shadows = v,
            MaterialAttr::CullFace(v) => self.cull_face = v,
        }
    }

    pub fn texture_slots(&self) -> impl Iterator<Item = (&'static str, TextureHandle)> + '_ {
        [
            ("base_color_map", self.base_color_map),
            ("metallic_roughness_map", self.metallic_roughness_map),
            ("diffuse_map", self.diffuse_map),
            ("specular_glossiness_map", self.specular_glossiness_map),
            ("normal_map", self.normal_map),
            ("occlusion_map", self.occlusion_map),
            ("emissive_color_map", self.emissive_color_map),
        ]
        .into_iter()
        .filter_map(|(slot, handle)| handle.map(|handle| (slot, handle)))
    }
}

impl Component for Material {
    const TYPE: ComponentType = ComponentType::Material;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_neutral() {
        let material = Material::default();
        assert_eq!(material.base_color, Vec4::ONE);
        assert_eq!(material.diffuse, Vec4::ONE);
        assert_eq!(material.specular, Vec3::ONE);
        assert_eq!(material.glossiness, 1.0);
        assert_eq!((material.metallic, material.roughness), (1.0, 1.0));
        assert_eq!(material.texture_slots().count(), 0);
    }

    #[test]
    fn both_parameterizations_coexist() {
        let material = Material::new([
            MaterialAttr::Metallic(0.25),
            MaterialAttr::Glossiness(0.5),
            MaterialAttr::DiffuseMap(Some(TextureHandle::new(3))),
        ]);
        assert_eq!(material.metallic, 0.25);
        assert_eq!(material.glossiness, 0.5);
        let slots: Vec<_> = material.texture_slots().collect();
        assert_eq!(slots, vec![("diffuse_map", TextureHandle::new(3))]);
    }
}
