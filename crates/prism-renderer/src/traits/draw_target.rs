//! DrawTarget trait definition.

use glam::UVec2;
use prism_core::{Assets, Camera, Geometry, NodeId, Scene, ShaderMaterial, Texture, Uniforms};

use crate::context::{DrawCall, RenderingContext, TargetBinding};
use crate::device::{ClearMask, FramebufferHandle, GraphicsDevice};
use crate::error::Result;
use crate::render::{render_scene, FrameStats};
use crate::state::{ClearState, DrawState};

/// A surface draws are submitted into.
///
/// Implementors describe their framebuffer binding and state; the provided
/// methods route every clear and draw through [`DrawTarget::prepare`] first,
/// so a target can validate or resize itself before any command reaches it.
pub trait DrawTarget {
    /// Returns the framebuffer to bind; `None` is the default framebuffer.
    fn framebuffer(&self) -> Option<FramebufferHandle>;

    /// Returns the drawable size in pixels.
    fn size(&self) -> UVec2;

    /// Returns the state applied before each draw.
    fn draw_state(&self) -> DrawState;

    /// Returns the values [`DrawTarget::render`] clears with.
    fn clear_state(&self) -> ClearState;

    /// Called before every clear and draw.
    fn prepare<D: GraphicsDevice>(&mut self, _ctx: &mut RenderingContext<D>) -> Result<()> {
        Ok(())
    }

    /// Returns the binding the context applies for draws into this target.
    fn binding(&self) -> TargetBinding {
        TargetBinding {
            framebuffer: self.framebuffer(),
            state: self.draw_state(),
        }
    }

    /// Returns width over height, or 1 for an empty target.
    fn aspect_ratio(&self) -> f32 {
        let size = self.size();
        if size.x == 0 || size.y == 0 {
            1.0
        } else {
            size.x as f32 / size.y as f32
        }
    }

    /// Clears the buffers in `mask`.
    ///
    /// Write masks and the scissor of this target apply to the clear.
    fn clear<D: GraphicsDevice>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        mask: ClearMask,
        clear_state: &ClearState,
    ) -> Result<()> {
        self.prepare(ctx)?;
        let state = self.draw_state();
        ctx.set_framebuffer(self.framebuffer())?;
        ctx.apply_draw_state(&DrawState {
            viewport: state.viewport,
            scissor: state.scissor,
            mask: state.mask,
            ..Default::default()
        })?;
        ctx.clear(mask, clear_state)
    }

    /// Draws one geometry with `material`.
    fn render_draw<D: GraphicsDevice>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        material: &ShaderMaterial,
        uniforms: &Uniforms,
        geometry: &Geometry,
        textures: &Assets<Texture>,
    ) -> Result<()> {
        self.prepare(ctx)?;
        ctx.draw(
            &self.binding(),
            &DrawCall {
                material,
                geometry,
                uniforms,
                textures,
            },
        )
    }

    /// Draws `material` over the full-screen quad.
    fn render_pass<D: GraphicsDevice>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        material: &ShaderMaterial,
        uniforms: &Uniforms,
        textures: &Assets<Texture>,
    ) -> Result<()> {
        self.prepare(ctx)?;
        ctx.draw_pass(&self.binding(), material, uniforms, textures)
    }

    /// Draws every visible mesh under `root` as seen from `camera`. The
    /// target is prepared again before each draw.
    ///
    /// With `clear`, color, depth and stencil are cleared with
    /// [`DrawTarget::clear_state`] first.
    fn render<D: GraphicsDevice>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        scene: &mut Scene,
        root: NodeId,
        camera: &Camera,
        clear: bool,
    ) -> Result<FrameStats> {
        self.prepare(ctx)?;
        if clear {
            let clear_state = self.clear_state();
            self.clear(ctx, ClearMask::ALL, &clear_state)?;
        }
        render_scene(ctx, self, scene, root, camera)
    }
}
