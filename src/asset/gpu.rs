use super::handle::{BufferHandle, Handle, TextureHandle};
use super::texture::{TextureDescriptor, TextureEncoding};
use crate::error::GpuError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Index,
    Vertex,
}

/// Resource allocation surface the importer and components rely on.
pub trait GpuContext {
    fn create_index_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle, GpuError>;

    fn create_vertex_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle, GpuError>;

    fn create_texture_2d(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
    ) -> Result<TextureHandle, GpuError>;

    fn is_power_of_two(&self, value: u32) -> bool {
        value.is_power_of_two()
    }

    /// `true` on targets where repeat wrapping and mipmapping only work with
    /// power-of-two textures.
    fn restricts_npot_textures(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBuffer {
    pub usage: BufferUsage,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTexture {
    pub width: u32,
    pub height: u32,
    pub encoding: TextureEncoding,
    pub mipmap: bool,
}

/// A [`GpuContext`] that keeps every allocation in memory. Used by the
/// `scene-inspect` tool and by tests.
#[derive(Debug, Default)]
pub struct HeadlessGpu {
    buffers: Vec<RecordedBuffer>,
    textures: Vec<RecordedTexture>,
    npot_restricted: bool,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self {
            npot_restricted: true,
            ..Self::default()
        }
    }

    /// A context without the non-power-of-two restriction.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&RecordedBuffer> {
        self.buffers.get(handle.index())
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&RecordedTexture> {
        self.textures.get(handle.index())
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn push_buffer(&mut self, usage: BufferUsage, bytes: &[u8]) -> BufferHandle {
        let index = self.buffers.len();
        self.buffers.push(RecordedBuffer {
            usage,
            bytes: bytes.to_vec(),
        });
        Handle::new(index)
    }
}

impl GpuContext for HeadlessGpu {
    fn create_index_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle, GpuError> {
        Ok(self.push_buffer(BufferUsage::Index, bytes))
    }

    fn create_vertex_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle, GpuError> {
        Ok(self.push_buffer(BufferUsage::Vertex, bytes))
    }

    fn create_texture_2d(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
    ) -> Result<TextureHandle, GpuError> {
        let image = descriptor.image;
        let expected = image.width as usize * image.height as usize * 4;
        if image.pixels.len() != expected {
            return Err(GpuError(format!(
                "texture data has {} bytes, expected {} for {}x{} RGBA8",
                image.pixels.len(),
                expected,
                image.width,
                image.height
            )));
        }

        let index = self.textures.len();
        self.textures.push(RecordedTexture {
            width: image.width,
            height: image.height,
            encoding: descriptor.encoding,
            mipmap: descriptor.mipmap,
        });
        Ok(Handle::new(index))
    }

    fn restricts_npot_textures(&self) -> bool {
        self.npot_restricted
    }
}
