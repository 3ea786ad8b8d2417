use thiserror::Error;

use crate::scene::ComponentType;

/// Reparenting would make a transform its own ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot parent {child:?} under {parent:?}: the new parent is the node itself or one of its descendants")]
pub struct CycleError {
    pub child: hecs::Entity,
    pub parent: hecs::Entity,
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error("entity {0:?} does not exist")]
    NoSuchEntity(hecs::Entity),
    #[error("entity {entity:?} has no {component} component")]
    MissingComponent {
        entity: hecs::Entity,
        component: ComponentType,
    },
    #[error("entity already has a {0} component")]
    DuplicateComponent(ComponentType),
}

/// Failure reported by an [`AssetSource`](crate::io::AssetSource).
#[derive(Debug, Error)]
pub enum IoError {
    #[error("resource `{0}` not found")]
    NotFound(String),
    #[error("failed to read `{uri}`: {source}")]
    Read {
        uri: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed data URI: {0}")]
    DataUri(String),
    #[error("failed to decode `{uri}`: {message}")]
    Decode { uri: String, message: String },
}

/// Failure reported by a [`GpuContext`](crate::asset::GpuContext).
#[derive(Debug, Clone, Error)]
#[error("gpu allocation failed: {0}")]
pub struct GpuError(pub String);

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("invalid scene document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scene document has no `{0}` collection")]
    MissingCollection(&'static str),
    #[error("{kind} {index} is referenced but not defined")]
    MissingReference { kind: &'static str, index: usize },
    #[error("mesh {mesh} uses unknown vertex attribute `{name}`")]
    UnknownAttribute { mesh: usize, name: String },
    #[error("buffer view {view} range {start}..{end} exceeds buffer {buffer} ({len} bytes)")]
    ViewOutOfRange {
        view: usize,
        buffer: usize,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("accessor {accessor} reads past the end of buffer view {view}")]
    AccessorOutOfRange { accessor: usize, view: usize },
    #[error("accessor {accessor} declares {count} elements, more than can be allocated")]
    AccessorTooLarge { accessor: usize, count: usize },
    #[error("buffer {0} has no uri and the document carries no binary chunk")]
    MissingBufferSource(usize),
    #[error("invalid binary container: {0}")]
    InvalidBinary(String),
}
