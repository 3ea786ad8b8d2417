pub mod gpu;
pub mod handle;
pub mod texture;

pub use gpu::{BufferUsage, GpuContext, HeadlessGpu, RecordedBuffer, RecordedTexture};
pub use handle::{BufferHandle, GpuBuffer, GpuTexture, Handle, TextureHandle};
pub use texture::{DecodedImage, Filter, TextureDescriptor, TextureEncoding, Wrap};
