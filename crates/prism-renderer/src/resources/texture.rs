//! GPU textures: pooled uploads of CPU textures, and render targets.

use glam::UVec2;
use prism_core::texture::bytes_per_pixel;
use prism_core::{
    DataType, PixelFormat, ResourceId, Texture, TextureFilter, TextureParameters, TextureWrap,
};

use super::pool::PoolResource;
use crate::device::{GraphicsDevice, TextureDescriptor, TextureHandle};
use crate::error::{RenderError, Result};

/// A 2D texture uploaded from a [`Texture`] asset.
#[derive(Debug)]
pub struct TexImage2D {
    handle: TextureHandle,
    size: UVec2,
}

impl TexImage2D {
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }
}

/// Describes `texture` for upload, checking the pixel buffer length.
fn descriptor(texture: &Texture) -> Result<TextureDescriptor<'_>> {
    let image = texture.image();
    let expected = image.width as usize
        * image.height as usize
        * bytes_per_pixel(texture.pixel_format(), texture.data_type());
    if image.data.len() != expected {
        return Err(RenderError::InvalidImageData {
            expected,
            actual: image.data.len(),
        });
    }
    Ok(TextureDescriptor {
        width: image.width,
        height: image.height,
        format: texture.pixel_format(),
        data_type: texture.data_type(),
        parameters: *texture.parameters(),
        pixels: Some(&image.data),
    })
}

impl PoolResource for TexImage2D {
    type Source = Texture;

    fn create(device: &mut dyn GraphicsDevice, texture: &Texture) -> Result<Self> {
        let handle = device.create_texture(&descriptor(texture)?)?;
        Ok(Self {
            handle,
            size: texture.size(),
        })
    }

    fn update(&mut self, device: &mut dyn GraphicsDevice, texture: &Texture) -> Result<()> {
        device.update_texture(self.handle, &descriptor(texture)?)?;
        self.size = texture.size();
        Ok(())
    }

    fn release(self, device: &mut dyn GraphicsDevice) {
        device.delete_texture(self.handle);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetKind {
    /// RGBA8 color.
    Color,
    /// 24-bit depth.
    Depth,
}

/// A texture allocated for a framebuffer attachment.
///
/// Render targets are created and disposed through the rendering context,
/// which keeps a registry so a target's id can be bound as a texture
/// uniform in later draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    id: ResourceId,
    texture: TextureHandle,
    size: UVec2,
    kind: RenderTargetKind,
}

impl RenderTarget {
    pub(crate) fn allocate(
        device: &mut dyn GraphicsDevice,
        kind: RenderTargetKind,
        size: UVec2,
    ) -> Result<Self> {
        let (format, data_type) = match kind {
            RenderTargetKind::Color => (PixelFormat::Rgba, DataType::UnsignedByte),
            RenderTargetKind::Depth => (PixelFormat::DepthComponent, DataType::UnsignedInt),
        };
        let texture = device.create_texture(&TextureDescriptor {
            width: size.x,
            height: size.y,
            format,
            data_type,
            parameters: TextureParameters {
                wrap_s: TextureWrap::ClampToEdge,
                wrap_t: TextureWrap::ClampToEdge,
                mag_filter: TextureFilter::Nearest,
                min_filter: TextureFilter::Nearest,
                generate_mipmaps: false,
                anisotropy_levels: 1,
            },
            pixels: None,
        })?;
        Ok(Self {
            id: ResourceId::new(),
            texture,
            size,
            kind,
        })
    }

    /// Identity used to bind this target as a texture uniform.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn kind(&self) -> RenderTargetKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use prism_core::ImageData;

    use super::*;

    #[test]
    fn test_descriptor_rejects_short_pixel_buffer() {
        let texture = Texture::new(ImageData::new(2, 2, vec![0; 15]));
        assert_eq!(
            descriptor(&texture).unwrap_err(),
            RenderError::InvalidImageData {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_descriptor_uses_texture_format() {
        let texture = Texture::new(ImageData::new(1, 1, vec![0; 4]))
            .with_format(PixelFormat::Luminance, DataType::Float);
        let descriptor = descriptor(&texture).unwrap();
        assert_eq!(descriptor.format, PixelFormat::Luminance);
        assert_eq!(descriptor.data_type, DataType::Float);
    }
}
