use glam::{Mat4, Quat, Vec3};

use super::component::{Attribute, Component, ComponentType};
use crate::math::Aabb;
use crate::signal::ChangeSignal;

/// One attribute of a [`Transform`], applied through
/// [`Scene::set_transform`](super::Scene::set_transform).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformAttr {
    Position(Vec3),
    Rotation(Quat),
    Scale(Vec3),
    /// Decomposed into position, rotation and scale.
    Matrix(Mat4),
    /// `None` detaches the node and makes it a root.
    Parent(Option<hecs::Entity>),
    /// Local-space bounds of whatever this node carries.
    Bounds(Option<Aabb>),
}

impl Attribute for TransformAttr {
    fn name(&self) -> &'static str {
        match self {
            TransformAttr::Position(_) => "position",
            TransformAttr::Rotation(_) => "rotation",
            TransformAttr::Scale(_) => "scale",
            TransformAttr::Matrix(_) => "matrix",
            TransformAttr::Parent(_) => "parent",
            TransformAttr::Bounds(_) => "bounds",
        }
    }
}

/// Hierarchical spatial node.
///
/// Parent and children are plain entity handles: the hierarchy relates
/// transforms but never owns them. World matrix and world bounds are cached
/// and only trusted while the matching dirty flag is clear; the owning
/// [`Scene`](super::Scene) recomputes them on read when it is set.
#[derive(Debug)]
pub struct Transform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    local_matrix: Mat4,
    bounds: Option<Aabb>,
    entity: Option<hecs::Entity>,
    pub(crate) parent: Option<hecs::Entity>,
    pub(crate) children: Vec<hecs::Entity>,
    pub(crate) world_matrix: Mat4,
    pub(crate) world_bounds: Aabb,
    pub(crate) world_dirty: bool,
    pub(crate) bounds_dirty: bool,
    pub changed: ChangeSignal,
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_trs(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_trs(t: Vec3, r: Quat, s: Vec3) -> Self {
        Self {
            position: t,
            rotation: r,
            scale: s,
            local_matrix: Mat4::from_scale_rotation_translation(s, r, t),
            bounds: None,
            entity: None,
            parent: None,
            children: Vec::new(),
            world_matrix: Mat4::IDENTITY,
            world_bounds: Aabb::EMPTY,
            world_dirty: true,
            bounds_dirty: true,
            changed: ChangeSignal::new(),
        }
    }

    /// Decomposes `matrix` into TRS and rebuilds the local matrix from it, so
    /// later position, rotation or scale changes start from the same pose.
    /// Shear is not representable and is dropped.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (s, r, t) = matrix.to_scale_rotation_translation();
        Self::from_trs(t, r, s)
    }

    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.local_matrix
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn parent(&self) -> Option<hecs::Entity> {
        self.parent
    }

    pub fn children(&self) -> &[hecs::Entity] {
        &self.children
    }

    pub fn entity(&self) -> Option<hecs::Entity> {
        self.entity
    }

    /// Applies a pose or bounds attribute. Parent changes touch other nodes
    /// and are handled by the scene.
    pub(crate) fn apply_local(&mut self, attr: TransformAttr) {
        match attr {
            TransformAttr::Position(position) => self.position = position,
            TransformAttr::Rotation(rotation) => self.rotation = rotation,
            TransformAttr::Scale(scale) => self.scale = scale,
            TransformAttr::Matrix(matrix) => {
                let (s, r, t) = matrix.to_scale_rotation_translation();
                self.position = t;
                self.rotation = r;
                self.scale = s;
            }
            TransformAttr::Bounds(bounds) => {
                self.bounds = bounds;
                return;
            }
            TransformAttr::Parent(_) => return,
        }
        self.local_matrix =
            Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
    }
}

impl Component for Transform {
    const TYPE: ComponentType = ComponentType::Transform;

    fn init(&mut self, entity: hecs::Entity) {
        self.entity = Some(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        let m = Transform::default().local_matrix();
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn translate_then_scale_ok() {
        let tr = Transform::from_trs(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY, Vec3::splat(2.0));
        let p = tr.local_matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        // (1,0,0) -> (2,0,0) -> (3,2,3)
        assert!(p.abs_diff_eq(Vec3::new(3.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn matrix_attribute_keeps_trs_consistent() {
        let source = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(0.5),
            Vec3::new(-4.0, 0.0, 9.0),
        );
        let mut transform = Transform::new();
        transform.apply_local(TransformAttr::Matrix(source));

        assert!(transform.local_matrix().abs_diff_eq(source, 1e-5));
        assert!(transform.position().abs_diff_eq(Vec3::new(-4.0, 0.0, 9.0), 1e-5));
        assert!(transform.scale().abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-5));
    }

    #[test]
    fn sheared_matrix_is_rebuilt_from_its_decomposition() {
        let mut sheared = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        sheared.y_axis.x = 0.5;
        let mut transform = Transform::from_matrix(sheared);

        let rebuilt = Mat4::from_scale_rotation_translation(
            transform.scale(),
            transform.rotation(),
            transform.position(),
        );
        assert!(transform.local_matrix().abs_diff_eq(rebuilt, 1e-6));

        // Moving the node keeps rotation and scale untouched.
        transform.apply_local(TransformAttr::Position(Vec3::ZERO));
        let moved = Mat4::from_scale_rotation_translation(
            transform.scale(),
            transform.rotation(),
            Vec3::ZERO,
        );
        assert!(transform.local_matrix().abs_diff_eq(moved, 1e-6));
        assert!(rebuilt.w_axis.abs_diff_eq(sheared.w_axis, 1e-6));
    }
}
