use glam::{Mat4, Vec3};

use super::component::{set_attributes, Attribute, Component, ComponentType};
use crate::math::Ray;
use crate::signal::ChangeSignal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    /// Extents are scaled by the camera zoom.
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y: 60f32.to_radians(),
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraAttr {
    Projection(Projection),
    Zoom(f32),
    /// Width over height of the viewport.
    Aspect(f32),
}

impl Attribute for CameraAttr {
    fn name(&self) -> &'static str {
        match self {
            CameraAttr::Projection(_) => "projection",
            CameraAttr::Zoom(_) => "zoom",
            CameraAttr::Aspect(_) => "aspect",
        }
    }
}

/// Projection capability. The view matrix is the inverse of the owning
/// entity's world matrix and is refreshed by [`Scene::update`](super::Scene::update).
#[derive(Debug)]
pub struct Camera {
    projection: Projection,
    zoom: f32,
    pub(crate) view_matrix: Mat4,
    entity: Option<hecs::Entity>,
    pub changed: ChangeSignal,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Projection::default())
    }
}

impl Camera {
    pub fn new(projection: Projection) -> Self {
        Self {
            projection,
            zoom: 1.0,
            view_matrix: Mat4::IDENTITY,
            entity: None,
            changed: ChangeSignal::new(),
        }
    }

    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Perspective {
            fov_y,
            aspect,
            near,
            far,
        })
    }

    pub fn orthographic(half_width: f32, half_height: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Orthographic {
            left: -half_width,
            right: half_width,
            bottom: -half_height,
            top: half_height,
            near,
            far,
        })
    }

    pub fn set(&mut self, attrs: impl IntoIterator<Item = CameraAttr>) {
        set_attributes(self, attrs, Self::apply, |camera| &camera.changed);
    }

    fn apply(&mut self, attr: CameraAttr) {
        match attr {
            CameraAttr::Projection(projection) => self.projection = projection,
            CameraAttr::Zoom(zoom) => self.zoom = zoom,
            CameraAttr::Aspect(new_aspect) => match &mut self.projection {
                Projection::Perspective { aspect, .. } => *aspect = new_aspect,
                Projection::Orthographic {
                    left,
                    right,
                    bottom,
                    top,
                    ..
                } => {
                    let half_height = (*top - *bottom) * 0.5;
                    let center = (*left + *right) * 0.5;
                    *left = center - half_height * new_aspect;
                    *right = center + half_height * new_aspect;
                }
            },
        }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn is_orthographic(&self) -> bool {
        matches!(self.projection, Projection::Orthographic { .. })
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    pub fn entity(&self) -> Option<hecs::Entity> {
        self.entity
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y, aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => {
                let (cx, cy) = ((left + right) * 0.5, (bottom + top) * 0.5);
                let (dx, dy) = ((right - left) * 0.5 * self.zoom, (top - bottom) * 0.5 * self.zoom);
                Mat4::orthographic_rh(cx - dx, cx + dx, cy - dy, cy + dy, near, far)
            }
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix
    }

    /// Ray through pixel (`x`, `y`) of a `width` x `height` viewport, in view
    /// space. The origin of the pixel grid is the top-left corner.
    pub fn view_ray(&self, x: f32, y: f32, width: f32, height: f32) -> Ray {
        let nx = 2.0 * x / width - 1.0;
        let ny = 1.0 - 2.0 * y / height;

        match self.projection {
            Projection::Perspective { fov_y, aspect, .. } => {
                let half = (fov_y * 0.5).tan();
                Ray::new(Vec3::ZERO, Vec3::new(nx * half * aspect, ny * half, -1.0))
            }
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                ..
            } => {
                let (cx, cy) = ((left + right) * 0.5, (bottom + top) * 0.5);
                let (dx, dy) = ((right - left) * 0.5 * self.zoom, (top - bottom) * 0.5 * self.zoom);
                Ray::new(Vec3::new(cx + nx * dx, cy + ny * dy, 0.0), Vec3::NEG_Z)
            }
        }
    }
}

impl Component for Camera {
    const TYPE: ComponentType = ComponentType::Camera;

    fn init(&mut self, entity: hecs::Entity) {
        self.entity = Some(entity);
    }
}
