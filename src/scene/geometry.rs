use std::collections::BTreeMap;

use super::component::{set_attributes, Attribute, Component, ComponentType};
use crate::asset::BufferHandle;
use crate::math::Aabb;
use crate::signal::ChangeSignal;

/// Scalar element type of a typed array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl ScalarKind {
    pub const UNSIGNED_SHORT: u32 = 5123;
    pub const UNSIGNED_INT: u32 = 5125;
    pub const FLOAT: u32 = 5126;

    pub fn from_gl(code: u32) -> Option<Self> {
        match code {
            Self::UNSIGNED_SHORT => Some(ScalarKind::UnsignedShort),
            Self::UNSIGNED_INT => Some(ScalarKind::UnsignedInt),
            Self::FLOAT => Some(ScalarKind::Float),
            _ => None,
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            ScalarKind::UnsignedShort => 2,
            ScalarKind::UnsignedInt | ScalarKind::Float => 4,
        }
    }
}

/// CPU-side numeric data decoded from an accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl TypedArray {
    pub fn kind(&self) -> ScalarKind {
        match self {
            TypedArray::U16(_) => ScalarKind::UnsignedShort,
            TypedArray::U32(_) => ScalarKind::UnsignedInt,
            TypedArray::F32(_) => ScalarKind::Float,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedArray::U16(values) => values.len(),
            TypedArray::U32(values) => values.len(),
            TypedArray::F32(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            TypedArray::U16(values) => values.iter().map(|&v| f32::from(v)).collect(),
            TypedArray::U32(values) => values.iter().map(|&v| v as f32).collect(),
            TypedArray::F32(values) => values.clone(),
        }
    }
}

/// Named vertex streams a geometry understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexSemantic {
    Position,
    Normal,
    Tangent,
    /// Texture coordinate set 0, 1 or 2.
    TexCoord(u8),
    Joints,
    Weights,
    Color,
}

impl VertexSemantic {
    pub fn name(&self) -> &'static str {
        match self {
            VertexSemantic::Position => "positions",
            VertexSemantic::Normal => "normals",
            VertexSemantic::Tangent => "tangents",
            VertexSemantic::TexCoord(0) => "tex_coords",
            VertexSemantic::TexCoord(1) => "tex_coords1",
            VertexSemantic::TexCoord(_) => "tex_coords2",
            VertexSemantic::Joints => "joints",
            VertexSemantic::Weights => "weights",
            VertexSemantic::Color => "vertex_colors",
        }
    }
}

/// A range of a GPU buffer. `component_type` keeps the raw format code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuStream {
    pub buffer: BufferHandle,
    pub byte_offset: usize,
    pub component_type: u32,
    pub stride: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VertexAttribute {
    Gpu { stream: GpuStream, size: usize },
    Data { data: TypedArray, size: usize },
}

impl VertexAttribute {
    pub fn size(&self) -> usize {
        match self {
            VertexAttribute::Gpu { size, .. } | VertexAttribute::Data { size, .. } => *size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexStream {
    Gpu { stream: GpuStream, count: usize },
    Data(TypedArray),
}

impl IndexStream {
    pub fn count(&self) -> usize {
        match self {
            IndexStream::Gpu { count, .. } => *count,
            IndexStream::Data(data) => data.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeometryAttr {
    Attribute(VertexSemantic, VertexAttribute),
    Indices(Option<IndexStream>),
    /// Vertex count used when there is no index stream.
    Count(usize),
    Bounds(Option<Aabb>),
    Topology(Topology),
}

impl Attribute for GeometryAttr {
    fn name(&self) -> &'static str {
        match self {
            GeometryAttr::Attribute(semantic, _) => semantic.name(),
            GeometryAttr::Indices(_) => "indices",
            GeometryAttr::Count(_) => "count",
            GeometryAttr::Bounds(_) => "bounds",
            GeometryAttr::Topology(_) => "primitive",
        }
    }
}

#[derive(Debug, Default)]
pub struct Geometry {
    attributes: BTreeMap<VertexSemantic, VertexAttribute>,
    indices: Option<IndexStream>,
    count: usize,
    bounds: Option<Aabb>,
    topology: Topology,
    pub changed: ChangeSignal,
}

impl Geometry {
    pub fn new(attrs: impl IntoIterator<Item = GeometryAttr>) -> Self {
        let mut geometry = Self::default();
        geometry.set(attrs);
        geometry
    }

    pub fn set(&mut self, attrs: impl IntoIterator<Item = GeometryAttr>) {
        set_attributes(self, attrs, Self::apply, |geometry| &geometry.changed);
    }

    fn apply(&mut self, attr: GeometryAttr) {
        match attr {
            GeometryAttr::Attribute(semantic, attribute) => {
                self.attributes.insert(semantic, attribute);
            }
            GeometryAttr::Indices(indices) => self.indices = indices,
            GeometryAttr::Count(count) => self.count = count,
            GeometryAttr::Bounds(bounds) => self.bounds = bounds,
            GeometryAttr::Topology(topology) => self.topology = topology,
        }
    }

    pub fn attribute(&self, semantic: VertexSemantic) -> Option<&VertexAttribute> {
        self.attributes.get(&semantic)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (VertexSemantic, &VertexAttribute)> {
        self.attributes.iter().map(|(semantic, attribute)| (*semantic, attribute))
    }

    pub fn indices(&self) -> Option<&IndexStream> {
        self.indices.as_ref()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }
}

impl Component for Geometry {
    const TYPE: ComponentType = ComponentType::Geometry;
}
