use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use glam::Mat4;

use super::component::{Attribute, Component, ComponentType};
use crate::signal::ChangeSignal;

#[derive(Debug, Clone, PartialEq)]
pub enum SkinAttr {
    InverseBindMatrices(Vec<Mat4>),
    Joints(Vec<hecs::Entity>),
}

impl Attribute for SkinAttr {
    fn name(&self) -> &'static str {
        match self {
            SkinAttr::InverseBindMatrices(_) => "inverse_bind_matrices",
            SkinAttr::Joints(_) => "joints",
        }
    }
}

#[derive(Debug, Default)]
struct SkinState {
    inverse_bind_matrices: Vec<Mat4>,
    joints: Vec<hecs::Entity>,
    joint_matrices: Vec<Mat4>,
}

#[derive(Debug, Default)]
struct SkinShared {
    state: RwLock<SkinState>,
    changed: ChangeSignal,
}

/// Joint binding for vertex skinning.
///
/// A `Skin` is a shared handle: clones attached to several entities (one per
/// primitive of a skinned mesh) all see the same state and the same
/// `changed` signal.
#[derive(Debug, Clone, Default)]
pub struct Skin {
    shared: Arc<SkinShared>,
}

impl Skin {
    pub fn new(inverse_bind_matrices: Vec<Mat4>) -> Self {
        let skin = Self::default();
        skin.write().inverse_bind_matrices = inverse_bind_matrices;
        skin
    }

    fn read(&self) -> RwLockReadGuard<'_, SkinState> {
        self.shared.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SkinState> {
        self.shared.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, attrs: impl IntoIterator<Item = SkinAttr>) {
        let names: Vec<&'static str> = {
            let mut state = self.write();
            attrs
                .into_iter()
                .map(|attr| {
                    let name = attr.name();
                    match attr {
                        SkinAttr::InverseBindMatrices(matrices) => {
                            state.inverse_bind_matrices = matrices
                        }
                        SkinAttr::Joints(joints) => state.joints = joints,
                    }
                    name
                })
                .collect()
        };

        // The lock is released so listeners can read the skin back.
        for name in names {
            self.shared.changed.dispatch(name);
        }
    }

    pub fn changed(&self) -> &ChangeSignal {
        &self.shared.changed
    }

    /// True when both handles alias the same skin.
    pub fn ptr_eq(&self, other: &Skin) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn joints(&self) -> Vec<hecs::Entity> {
        self.read().joints.clone()
    }

    pub fn inverse_bind_matrices(&self) -> Vec<Mat4> {
        self.read().inverse_bind_matrices.clone()
    }

    pub fn joint_matrices(&self) -> Vec<Mat4> {
        self.read().joint_matrices.clone()
    }

    pub(crate) fn set_joint_matrices(&self, matrices: Vec<Mat4>) {
        self.write().joint_matrices = matrices;
    }
}

impl Component for Skin {
    const TYPE: ComponentType = ComponentType::Skin;
}
