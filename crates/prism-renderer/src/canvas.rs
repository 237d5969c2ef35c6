//! The default framebuffer of an on-screen surface.

use glam::{UVec2, Vec2};
use tracing::debug;

use crate::context::RenderingContext;
use crate::device::{FramebufferHandle, GraphicsDevice};
use crate::error::Result;
use crate::state::{BlendState, ClearState, CullingState, DepthTestState, DrawState, MaskState, Rect};
use crate::traits::DrawTarget;

/// A window or canvas element whose drawing buffer backs the default
/// framebuffer.
pub trait DisplaySurface {
    /// Returns the displayed size in layout units.
    fn client_size(&self) -> Vec2;

    /// Returns physical pixels per layout unit.
    fn device_pixel_ratio(&self) -> f32;

    /// Resizes the drawing buffer.
    fn set_drawing_buffer_size(&mut self, size: UVec2);
}

/// A surface with no window behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSurface {
    client_size: Vec2,
    device_pixel_ratio: f32,
    drawing_buffer_size: UVec2,
}

impl HeadlessSurface {
    pub fn new(client_size: Vec2, device_pixel_ratio: f32) -> Self {
        Self {
            client_size,
            device_pixel_ratio,
            drawing_buffer_size: UVec2::ZERO,
        }
    }

    pub fn set_client_size(&mut self, client_size: Vec2) {
        self.client_size = client_size;
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f32) {
        self.device_pixel_ratio = ratio;
    }

    pub fn drawing_buffer_size(&self) -> UVec2 {
        self.drawing_buffer_size
    }
}

impl DisplaySurface for HeadlessSurface {
    fn client_size(&self) -> Vec2 {
        self.client_size
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    fn set_drawing_buffer_size(&mut self, size: UVec2) {
        self.drawing_buffer_size = size;
    }
}

/// Draw target for the default framebuffer.
///
/// The drawing buffer is resized to `client_size / device_pixel_ratio`,
/// rounded, before every clear and draw.
#[derive(Debug)]
pub struct CanvasFramebuffer<S: DisplaySurface> {
    surface: S,
    size: UVec2,
    pub clear_state: ClearState,
    pub depth_test: DepthTestState,
    pub blend: BlendState,
    pub mask: MaskState,
    pub culling: CullingState,
}

impl<S: DisplaySurface> CanvasFramebuffer<S> {
    pub fn new<D: GraphicsDevice>(ctx: &RenderingContext<D>, surface: S) -> Self {
        let mut canvas = Self {
            surface,
            size: UVec2::ZERO,
            clear_state: ctx.config().clear_state(),
            depth_test: ctx.config().depth_test_state(),
            blend: BlendState::default(),
            mask: MaskState::default(),
            culling: CullingState::default(),
        };
        canvas.sync_size();
        canvas
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Resizes the drawing buffer if the surface changed. Returns true if
    /// it did.
    pub fn sync_size(&mut self) -> bool {
        let ratio = match self.surface.device_pixel_ratio() {
            r if r.is_finite() && r > 0.0 => r,
            _ => 1.0,
        };
        let scaled = (self.surface.client_size() / ratio).round().max(Vec2::ZERO);
        let size = UVec2::new(scaled.x as u32, scaled.y as u32);
        if size == self.size {
            return false;
        }
        debug!(width = size.x, height = size.y, ratio, "canvas resized");
        self.surface.set_drawing_buffer_size(size);
        self.size = size;
        true
    }
}

impl<S: DisplaySurface> DrawTarget for CanvasFramebuffer<S> {
    fn framebuffer(&self) -> Option<FramebufferHandle> {
        None
    }

    fn size(&self) -> UVec2 {
        self.size
    }

    fn draw_state(&self) -> DrawState {
        DrawState {
            viewport: Some(Rect::from_size(self.size)),
            scissor: Some(None),
            blend: Some(self.blend),
            depth_test: Some(self.depth_test),
            mask: Some(self.mask),
            culling: Some(self.culling),
        }
    }

    fn clear_state(&self) -> ClearState {
        self.clear_state
    }

    fn prepare<D: GraphicsDevice>(&mut self, _ctx: &mut RenderingContext<D>) -> Result<()> {
        self.sync_size();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ClearMask, RecordingDevice};

    #[test]
    fn test_drawing_buffer_follows_surface() {
        let mut ctx = RenderingContext::new(RecordingDevice::new()).unwrap();
        let surface = HeadlessSurface::new(Vec2::new(800.0, 600.0), 2.0);
        let mut canvas = CanvasFramebuffer::new(&ctx, surface);
        assert_eq!(canvas.size(), UVec2::new(400, 300));
        assert_eq!(canvas.surface().drawing_buffer_size(), UVec2::new(400, 300));

        canvas.surface_mut().set_client_size(Vec2::new(400.0, 300.0));
        let clear_state = canvas.clear_state();
        canvas.clear(&mut ctx, ClearMask::COLOR, &clear_state).unwrap();
        assert_eq!(canvas.size(), UVec2::new(200, 150));
        assert_eq!(ctx.viewport(), Rect::new(0, 0, 200, 150));
    }

    #[test]
    fn test_unchanged_surface_does_not_resize() {
        let ctx = RenderingContext::new(RecordingDevice::new()).unwrap();
        let mut canvas = CanvasFramebuffer::new(&ctx, HeadlessSurface::new(Vec2::new(10.0, 10.0), 1.0));
        assert!(!canvas.sync_size());
        canvas.surface_mut().set_device_pixel_ratio(0.0);
        assert!(!canvas.sync_size());
    }
}
