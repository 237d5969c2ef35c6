//! CPU-side textures.

use glam::UVec2;

use crate::error::Result;
use crate::assets::Disposable;
use crate::resource::{ResourceState, Versioned};

/// Raw pixels produced by an image loader.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// A single-color RGBA8 image.
    pub fn solid_rgba(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, data)
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureWrap {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    Alpha,
    Luminance,
    LuminanceAlpha,
    Rgb,
    #[default]
    Rgba,
    DepthComponent,
    DepthStencil,
}

impl PixelFormat {
    /// Number of channels per pixel.
    pub fn components(&self) -> usize {
        match self {
            PixelFormat::Alpha | PixelFormat::Luminance | PixelFormat::DepthComponent => 1,
            PixelFormat::LuminanceAlpha | PixelFormat::DepthStencil => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    #[default]
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    UnsignedInt24_8,
    HalfFloat,
    Float,
}

impl DataType {
    /// Size in bytes of one channel (packed types count the whole pixel).
    pub fn bytes(&self) -> usize {
        match self {
            DataType::UnsignedByte => 1,
            DataType::UnsignedShort | DataType::HalfFloat => 2,
            DataType::UnsignedInt | DataType::Float | DataType::UnsignedInt24_8 => 4,
        }
    }

    pub fn is_packed(&self) -> bool {
        matches!(self, DataType::UnsignedInt24_8)
    }
}

/// Bytes per pixel for a format/type pair.
pub fn bytes_per_pixel(format: PixelFormat, data_type: DataType) -> usize {
    if data_type.is_packed() {
        data_type.bytes()
    } else {
        format.components() * data_type.bytes()
    }
}

/// Sampling parameters for a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureParameters {
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub mag_filter: TextureFilter,
    pub min_filter: TextureFilter,
    pub generate_mipmaps: bool,
    pub anisotropy_levels: u32,
}

impl Default for TextureParameters {
    fn default() -> Self {
        Self {
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
            mag_filter: TextureFilter::Linear,
            min_filter: TextureFilter::Linear,
            generate_mipmaps: true,
            anisotropy_levels: 1,
        }
    }
}

/// A 2D texture backed by CPU pixels.
#[derive(Debug)]
pub struct Texture {
    state: ResourceState,
    name: String,
    image: ImageData,
    parameters: TextureParameters,
    pixel_format: PixelFormat,
    data_type: DataType,
}

impl Texture {
    /// Creates an RGBA8 texture with default sampling.
    pub fn new(image: ImageData) -> Self {
        Self {
            state: ResourceState::new("texture"),
            name: String::new(),
            image,
            parameters: TextureParameters::default(),
            pixel_format: PixelFormat::Rgba,
            data_type: DataType::UnsignedByte,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_parameters(mut self, parameters: TextureParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_format(mut self, pixel_format: PixelFormat, data_type: DataType) -> Self {
        self.pixel_format = pixel_format;
        self.data_type = data_type;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }

    pub fn size(&self) -> UVec2 {
        self.image.size()
    }

    pub fn parameters(&self) -> &TextureParameters {
        &self.parameters
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Replaces the pixels.
    pub fn set_image(&mut self, image: ImageData) -> Result<()> {
        self.state.mark_dirty()?;
        self.image = image;
        Ok(())
    }

    pub fn set_parameters(&mut self, parameters: TextureParameters) -> Result<()> {
        self.state.mark_dirty()?;
        self.parameters = parameters;
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.state.mark_dirty()?;
        self.name = name.into();
        Ok(())
    }

    /// Copies everything but identity from `source`.
    pub fn copy_from(&mut self, source: &Texture) -> Result<()> {
        self.state.mark_dirty()?;
        self.name = source.name.clone();
        self.image = source.image.clone();
        self.parameters = source.parameters;
        self.pixel_format = source.pixel_format;
        self.data_type = source.data_type;
        Ok(())
    }
}

impl Disposable for Texture {
    fn dispose(&mut self) -> bool {
        self.state.dispose()
    }
}

impl Versioned for Texture {
    fn state(&self) -> &ResourceState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_bump_version() {
        let mut texture = Texture::new(ImageData::solid_rgba(2, 2, [255, 0, 0, 255]));
        assert_eq!(texture.version(), 0);
        texture
            .set_image(ImageData::solid_rgba(4, 4, [0, 255, 0, 255]))
            .unwrap();
        assert_eq!(texture.version(), 1);
        assert_eq!(texture.size(), UVec2::new(4, 4));
    }

    #[test]
    fn test_copy_keeps_identity() {
        let source = Texture::new(ImageData::solid_rgba(1, 1, [1, 2, 3, 4])).with_name("src");
        let mut target = Texture::new(ImageData::solid_rgba(2, 2, [0; 4]));
        let id = target.id();
        target.copy_from(&source).unwrap();
        assert_eq!(target.id(), id);
        assert_eq!(target.name(), "src");
        assert_eq!(target.image(), source.image());
    }

    #[test]
    fn test_solid_rgba_length() {
        let image = ImageData::solid_rgba(3, 2, [9, 8, 7, 6]);
        assert_eq!(image.data.len(), 24);
        assert_eq!(&image.data[4..8], &[9, 8, 7, 6]);
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(bytes_per_pixel(PixelFormat::Rgba, DataType::UnsignedByte), 4);
        assert_eq!(bytes_per_pixel(PixelFormat::Rgb, DataType::Float), 12);
        assert_eq!(bytes_per_pixel(PixelFormat::DepthStencil, DataType::UnsignedInt24_8), 4);
    }
}
