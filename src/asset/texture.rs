use image::imageops::FilterType;
use image::RgbaImage;

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_encoded(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self::new(width, height, image.into_raw()))
    }

    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Resamples to the given size. Returns `None` if the pixel buffer does not
    /// match the recorded dimensions.
    pub fn resized(&self, width: u32, height: u32) -> Option<Self> {
        let source = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())?;
        let resized = image::imageops::resize(&source, width, height, FilterType::Triangle);
        Some(Self::new(width, height, resized.into_raw()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureEncoding {
    Srgb,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wrap {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

impl Wrap {
    pub fn from_gl(code: u32) -> Option<Self> {
        match code {
            10497 => Some(Wrap::Repeat),
            33071 => Some(Wrap::ClampToEdge),
            33648 => Some(Wrap::MirroredRepeat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl Filter {
    pub fn from_gl(code: u32) -> Option<Self> {
        match code {
            9728 => Some(Filter::Nearest),
            9729 => Some(Filter::Linear),
            9984 => Some(Filter::NearestMipmapNearest),
            9985 => Some(Filter::LinearMipmapNearest),
            9986 => Some(Filter::NearestMipmapLinear),
            9987 => Some(Filter::LinearMipmapLinear),
            _ => None,
        }
    }

    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, Filter::Nearest | Filter::Linear)
    }
}

#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    pub image: &'a DecodedImage,
    pub encoding: TextureEncoding,
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mipmap: bool,
    pub anisotropy: u8,
}

impl TextureDescriptor<'_> {
    /// Whether a platform that restricts non-power-of-two textures needs the
    /// image resized before this descriptor can be honoured.
    pub fn needs_power_of_two(&self) -> bool {
        self.wrap_s != Wrap::ClampToEdge
            || self.wrap_t != Wrap::ClampToEdge
            || self.min_filter.uses_mipmaps()
    }
}
