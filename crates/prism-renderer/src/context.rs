//! Rendering context that owns the device, its resource pools and a shadow
//! copy of the bound pipeline state.
//!
//! Every state setter compares against the shadow copy and only emits the
//! commands for fields that changed, so redundant binds never reach the
//! driver.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use glam::UVec2;
use prism_core::{
    Assets, Attribute, Geometry, ResourceId, Scene, ShaderMaterial, Texture, Uniforms, Versioned,
};
use tracing::{debug, trace};

use crate::config::RendererConfig;
use crate::device::{
    AttachmentPoint, ClearMask, DeviceCommand, FramebufferHandle, FramebufferStatus, GraphicsDevice, ProgramHandle,
    TextureHandle,
};
use crate::error::{RenderError, Result};
use crate::resources::{
    BufferGeometry, Pool, Program, RenderTarget, RenderTargetKind, TexImage2D,
};
use crate::state::{
    BlendState, ClearState, CullingState, DepthTestState, DrawState, MaskState, Rect, StateBlock,
};
use crate::uniforms::bind_uniforms;

/// Where a draw lands and the state it needs there.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetBinding {
    /// `None` is the default framebuffer.
    pub framebuffer: Option<FramebufferHandle>,
    pub state: DrawState,
}

/// One material and geometry pair to submit.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub material: &'a ShaderMaterial,
    pub geometry: &'a Geometry,
    /// Uniform values; texture values refer to `textures` or to a render
    /// target id.
    pub uniforms: &'a Uniforms,
    pub textures: &'a Assets<Texture>,
}

/// Render context containing the device and everything realized on it.
pub struct RenderingContext<D: GraphicsDevice> {
    device: D,
    config: RendererConfig,
    program: Option<ProgramHandle>,
    framebuffer: Option<FramebufferHandle>,
    viewport: Rect,
    scissor: Option<Rect>,
    blend: BlendState,
    depth_test: DepthTestState,
    mask: MaskState,
    clear_state: ClearState,
    culling: CullingState,
    programs: Pool<Program>,
    textures: Pool<TexImage2D>,
    geometries: Pool<BufferGeometry>,
    render_targets: HashMap<ResourceId, RenderTarget>,
    pass_geometry: Rc<Geometry>,
    disposed: bool,
}

impl<D: GraphicsDevice> RenderingContext<D> {
    /// Creates a context with the default configuration.
    pub fn new(device: D) -> Result<Self> {
        Self::with_config(device, RendererConfig::default())
    }

    /// Creates a context. The shadow state starts at the driver defaults.
    pub fn with_config(device: D, config: RendererConfig) -> Result<Self> {
        let pass_geometry = Rc::new(pass_quad(config.pass_geometry_size)?);
        debug!(
            max_texture_units = config.max_texture_units,
            "rendering context created"
        );
        Ok(Self {
            device,
            config,
            program: None,
            framebuffer: None,
            viewport: Rect::default(),
            scissor: None,
            blend: BlendState::default(),
            depth_test: DepthTestState::default(),
            mask: MaskState::default(),
            clear_state: ClearState::default(),
            culling: CullingState::default(),
            programs: Pool::new(),
            textures: Pool::new(),
            geometries: Pool::new(),
            render_targets: HashMap::new(),
            pass_geometry,
            disposed: false,
        })
    }

    /// Returns the device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns the device mutably. State changed behind the context's back
    /// is not tracked.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Returns the quad drawn by full-screen passes.
    pub fn pass_geometry(&self) -> &Geometry {
        &self.pass_geometry
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn program(&self) -> Option<ProgramHandle> {
        self.program
    }

    pub fn framebuffer(&self) -> Option<FramebufferHandle> {
        self.framebuffer
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn scissor(&self) -> Option<Rect> {
        self.scissor
    }

    pub fn blend_state(&self) -> BlendState {
        self.blend
    }

    pub fn depth_test_state(&self) -> DepthTestState {
        self.depth_test
    }

    pub fn mask_state(&self) -> MaskState {
        self.mask
    }

    pub fn clear_state(&self) -> ClearState {
        self.clear_state
    }

    pub fn culling_state(&self) -> CullingState {
        self.culling
    }

    pub fn set_program(&mut self, program: Option<ProgramHandle>) -> Result<()> {
        Self::apply_block(&mut self.device, &mut self.program, &program)
    }

    pub fn set_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) -> Result<()> {
        Self::apply_block(&mut self.device, &mut self.framebuffer, &framebuffer)
    }

    pub fn set_viewport(&mut self, viewport: Rect) -> Result<()> {
        Self::apply_block(&mut self.device, &mut self.viewport, &viewport)
    }

    /// `None` disables the scissor test.
    pub fn set_scissor(&mut self, scissor: Option<Rect>) -> Result<()> {
        Self::apply_block(&mut self.device, &mut self.scissor, &scissor)
    }

    pub fn set_blend_state(&mut self, blend: BlendState) -> Result<()> {
        Self::apply_block(&mut self.device, &mut self.blend, &blend)
    }

    pub fn set_depth_test_state(&mut self, depth_test: DepthTestState) -> Result<()> {
        Self::apply_block(&mut self.device, &mut self.depth_test, &depth_test)
    }

    pub fn set_mask_state(&mut self, mask: MaskState) -> Result<()> {
        Self::apply_block(&mut self.device, &mut self.mask, &mask)
    }

    pub fn set_clear_state(&mut self, clear_state: ClearState) -> Result<()> {
        Self::apply_block(&mut self.device, &mut self.clear_state, &clear_state)
    }

    pub fn set_culling_state(&mut self, culling: CullingState) -> Result<()> {
        Self::apply_block(&mut self.device, &mut self.culling, &culling)
    }

    /// Applies the blocks `state` sets, in viewport, scissor, blend, depth,
    /// mask, culling order.
    pub fn apply_draw_state(&mut self, state: &DrawState) -> Result<()> {
        if let Some(viewport) = state.viewport {
            self.set_viewport(viewport)?;
        }
        if let Some(scissor) = state.scissor {
            self.set_scissor(scissor)?;
        }
        if let Some(blend) = state.blend {
            self.set_blend_state(blend)?;
        }
        if let Some(depth_test) = state.depth_test {
            self.set_depth_test_state(depth_test)?;
        }
        if let Some(mask) = state.mask {
            self.set_mask_state(mask)?;
        }
        if let Some(culling) = state.culling {
            self.set_culling_state(culling)?;
        }
        Ok(())
    }

    /// Clears the bound framebuffer with `clear_state`'s values.
    pub fn clear(&mut self, mask: ClearMask, clear_state: &ClearState) -> Result<()> {
        self.ensure_live()?;
        self.set_clear_state(*clear_state)?;
        if mask.is_empty() {
            return Ok(());
        }
        self.execute(&DeviceCommand::Clear(mask))
    }

    fn apply_block<S: StateBlock>(device: &mut D, current: &mut S, requested: &S) -> Result<()> {
        for command in S::transition(current, requested) {
            trace!(?command, "state change");
            device.execute(&command)?;
        }
        *current = requested.clone();
        Ok(())
    }

    fn execute(&mut self, command: &DeviceCommand) -> Result<()> {
        trace!(?command, "execute");
        self.device.execute(command)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(RenderError::Device("rendering context is disposed".to_string()));
        }
        Ok(())
    }

    /// Returns the linked program for `material`, building or relinking it
    /// if the material changed.
    pub fn acquire_program(&mut self, material: &ShaderMaterial) -> Result<&Program> {
        self.ensure_live()?;
        self.release_disposed_program(material);
        self.programs.acquire(&mut self.device, material).map(|p| &*p)
    }

    /// Returns the GPU texture for `texture`, uploading it if needed.
    pub fn acquire_texture(&mut self, texture: &Texture) -> Result<&TexImage2D> {
        self.ensure_live()?;
        self.textures.acquire(&mut self.device, texture).map(|t| &*t)
    }

    /// Returns the GPU buffers for `geometry`, uploading them if needed.
    pub fn acquire_geometry(&mut self, geometry: &Geometry) -> Result<&BufferGeometry> {
        self.ensure_live()?;
        self.geometries.acquire(&mut self.device, geometry).map(|g| &*g)
    }

    /// Releases the program for `id` along with every vertex array built
    /// against it.
    pub fn release_program(&mut self, id: ResourceId) -> bool {
        if !self.programs.release(&mut self.device, id) {
            return false;
        }
        self.prune_vertex_arrays();
        true
    }

    pub fn release_texture(&mut self, id: ResourceId) -> bool {
        self.textures.release(&mut self.device, id)
    }

    pub fn release_geometry(&mut self, id: ResourceId) -> bool {
        self.geometries.release(&mut self.device, id)
    }

    /// Releases GPU objects whose source is disposed or no longer in
    /// `scene`'s asset stores. Returns how many pool entries were released.
    pub fn collect(&mut self, scene: &Scene) -> usize {
        let device: &mut dyn GraphicsDevice = &mut self.device;
        let pass_geometry = self.pass_geometry.id();
        let programs = self
            .programs
            .retain(device, |id, _| is_live(&scene.materials, id));
        let textures = self
            .textures
            .retain(device, |id, _| is_live(&scene.textures, id));
        let geometries = self.geometries.retain(device, |id, _| {
            id == pass_geometry || is_live(&scene.geometries, id)
        });
        if programs > 0 {
            self.prune_vertex_arrays();
        }

        let released = programs + textures + geometries;
        if released > 0 {
            debug!(programs, textures, geometries, "unused GPU resources collected");
        }
        released
    }

    fn release_disposed_program(&mut self, material: &ShaderMaterial) {
        if material.is_disposed() {
            self.release_program(material.id());
        }
    }

    /// Drops vertex arrays whose program is no longer pooled.
    fn prune_vertex_arrays(&mut self) {
        let live: HashSet<ProgramHandle> = self.programs.resources().map(Program::handle).collect();
        let device: &mut dyn GraphicsDevice = &mut self.device;
        for geometry in self.geometries.resources_mut() {
            geometry.retain_vertex_arrays(device, |program| live.contains(&program));
        }
    }

    pub fn programs(&self) -> &Pool<Program> {
        &self.programs
    }

    pub fn textures(&self) -> &Pool<TexImage2D> {
        &self.textures
    }

    pub fn geometries(&self) -> &Pool<BufferGeometry> {
        &self.geometries
    }

    /// Allocates a texture to attach to framebuffers.
    pub fn create_render_target(&mut self, kind: RenderTargetKind, size: UVec2) -> Result<RenderTarget> {
        self.ensure_live()?;
        let target = RenderTarget::allocate(&mut self.device, kind, size)?;
        self.render_targets.insert(target.id(), target);
        debug!(id = %target.id(), ?kind, width = size.x, height = size.y, "render target created");
        Ok(target)
    }

    pub fn render_target(&self, id: ResourceId) -> Option<&RenderTarget> {
        self.render_targets.get(&id)
    }

    /// Deletes a render target's texture. Returns false if it was already
    /// disposed.
    pub fn dispose_render_target(&mut self, id: ResourceId) -> bool {
        match self.render_targets.remove(&id) {
            Some(target) => {
                self.device.delete_texture(target.texture());
                true
            }
            None => false,
        }
    }

    pub(crate) fn create_framebuffer(&mut self) -> Result<FramebufferHandle> {
        self.ensure_live()?;
        self.device.create_framebuffer()
    }

    pub(crate) fn attach_render_target(
        &mut self,
        framebuffer: FramebufferHandle,
        point: AttachmentPoint,
        texture: Option<TextureHandle>,
    ) -> Result<()> {
        self.ensure_live()?;
        self.device.attach_texture(framebuffer, point, texture)
    }

    pub(crate) fn framebuffer_status(&mut self, framebuffer: FramebufferHandle) -> FramebufferStatus {
        self.device.framebuffer_status(framebuffer)
    }

    /// Deletes a framebuffer. The driver falls back to the default
    /// framebuffer if it was bound.
    pub(crate) fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if self.framebuffer == Some(framebuffer) {
            self.framebuffer = None;
        }
        if !self.disposed {
            self.device.delete_framebuffer(framebuffer);
        }
    }

    /// Submits one draw.
    ///
    /// Everything fallible that does not touch bound state (program build,
    /// uploads, uniform validation) runs first, so a rejected draw leaves the
    /// shadow state as it was.
    pub fn draw(&mut self, target: &TargetBinding, call: &DrawCall<'_>) -> Result<()> {
        self.ensure_live()?;
        let max_texture_units = self.config.max_texture_units;
        self.release_disposed_program(call.material);

        let program = self.programs.acquire(&mut self.device, call.material)?;
        let geometry = self.geometries.acquire(&mut self.device, call.geometry)?;
        let vertex_array = geometry.vertex_array(&mut self.device, program)?;
        let range = geometry.draw_range();

        let device: &mut dyn GraphicsDevice = &mut self.device;
        let textures = &mut self.textures;
        let render_targets = &self.render_targets;
        let bound = bind_uniforms(program, call.uniforms, max_texture_units, &mut |id| {
            resolve_texture(&mut *device, textures, render_targets, call.textures, id)
        })?;
        let program = program.handle();

        self.set_program(Some(program))?;
        self.set_framebuffer(target.framebuffer)?;
        self.apply_draw_state(&target.state)?;

        for (name, data) in bound.uploads {
            self.execute(&DeviceCommand::Uniform { program, name, data })?;
        }
        for (unit, texture) in bound.textures {
            self.execute(&DeviceCommand::BindTexture {
                unit,
                texture: Some(texture),
            })?;
        }
        self.execute(&DeviceCommand::BindVertexArray(Some(vertex_array)))?;
        match range.index_type {
            Some(index_type) => self.execute(&DeviceCommand::DrawElements {
                mode: range.mode,
                count: range.count,
                index_type,
            })?,
            None => self.execute(&DeviceCommand::DrawArrays {
                mode: range.mode,
                first: 0,
                count: range.count,
            })?,
        }
        self.execute(&DeviceCommand::BindVertexArray(None))
    }

    /// Draws `material` over the full-screen quad.
    pub fn draw_pass(
        &mut self,
        target: &TargetBinding,
        material: &ShaderMaterial,
        uniforms: &Uniforms,
        textures: &Assets<Texture>,
    ) -> Result<()> {
        let geometry = Rc::clone(&self.pass_geometry);
        self.draw(
            target,
            &DrawCall {
                material,
                geometry: &geometry,
                uniforms,
                textures,
            },
        )
    }

    /// Releases every pool entry and render target. Returns false if the
    /// context was already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        let device: &mut dyn GraphicsDevice = &mut self.device;
        self.programs.release_all(device);
        self.textures.release_all(device);
        self.geometries.release_all(device);
        for (_, target) in self.render_targets.drain() {
            device.delete_texture(target.texture());
        }
        self.program = None;
        self.framebuffer = None;
        debug!("rendering context disposed");
        true
    }
}

impl<D: GraphicsDevice> Drop for RenderingContext<D> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn is_live<T: Versioned>(assets: &Assets<T>, id: ResourceId) -> bool {
    assets.get(id).is_some_and(|asset| !asset.is_disposed())
}

fn resolve_texture(
    device: &mut dyn GraphicsDevice,
    pool: &mut Pool<TexImage2D>,
    render_targets: &HashMap<ResourceId, RenderTarget>,
    assets: &Assets<Texture>,
    id: ResourceId,
) -> Result<TextureHandle> {
    if let Some(target) = render_targets.get(&id) {
        return Ok(target.texture());
    }
    let texture = assets.get(id).ok_or(RenderError::MissingTexture(id))?;
    Ok(pool.acquire(device, texture)?.handle())
}

/// A `size` by `size` quad in the XY plane facing +Z.
fn pass_quad(size: f32) -> Result<Geometry> {
    let half = size / 2.0;
    let positions = vec![
        -half, half, 0.0, half, half, 0.0, //
        -half, -half, 0.0, half, -half, 0.0,
    ];
    let normals = [0.0, 0.0, 1.0].repeat(4);
    let uvs = vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    let geometry = Geometry::new()
        .with_attribute("position", Attribute::float32(positions, 3)?)?
        .with_attribute("normal", Attribute::float32(normals, 3)?)?
        .with_attribute("uv", Attribute::float32(uvs, 2)?)?
        .with_indices(Attribute::indices(vec![0, 2, 1, 2, 3, 1]))?;
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::device::{DepthFunc, RecordingDevice};

    fn context() -> RenderingContext<RecordingDevice> {
        RenderingContext::new(RecordingDevice::new()).unwrap()
    }

    #[test]
    fn test_unchanged_state_emits_nothing() {
        let mut ctx = context();
        ctx.set_depth_test_state(DepthTestState::enabled(DepthFunc::Less)).unwrap();
        ctx.device_mut().clear_commands();

        ctx.set_depth_test_state(DepthTestState::enabled(DepthFunc::Less)).unwrap();
        assert!(ctx.device().commands().is_empty());

        ctx.set_depth_test_state(DepthTestState::enabled(DepthFunc::LessEqual)).unwrap();
        assert_eq!(
            ctx.device().commands(),
            [DeviceCommand::DepthFunc(DepthFunc::LessEqual)]
        );
    }

    #[test]
    fn test_clear_sets_values_then_clears() {
        let mut ctx = context();
        let clear_state = ClearState::new(Vec3::new(1.0, 0.0, 0.0), 1.0);
        ctx.clear(ClearMask::COLOR | ClearMask::DEPTH, &clear_state).unwrap();
        assert_eq!(
            ctx.device().commands(),
            [
                DeviceCommand::ClearColor([1.0, 0.0, 0.0, 1.0]),
                DeviceCommand::Clear(ClearMask::COLOR | ClearMask::DEPTH),
            ]
        );
        assert_eq!(ctx.clear_state(), clear_state);
    }

    #[test]
    fn test_pass_quad_layout() {
        let ctx = context();
        let quad = ctx.pass_geometry();
        assert_eq!(quad.vertex_count(), 4);
        assert_eq!(quad.draw_count(), 6);
        assert!(quad.attribute("normal").is_some());
        assert!(quad.attribute("uv").is_some());
    }

    #[test]
    fn test_render_target_registry() {
        let mut ctx = context();
        let target = ctx
            .create_render_target(RenderTargetKind::Color, UVec2::new(64, 32))
            .unwrap();
        assert_eq!(ctx.render_target(target.id()), Some(&target));
        assert_eq!(ctx.device().texture_size(target.texture()), Some(UVec2::new(64, 32)));

        assert!(ctx.dispose_render_target(target.id()));
        assert!(!ctx.dispose_render_target(target.id()));
        assert!(!ctx.device().is_live(target.texture().raw()));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut ctx = context();
        ctx.create_render_target(RenderTargetKind::Depth, UVec2::splat(16))
            .unwrap();
        assert!(ctx.dispose());
        assert!(!ctx.dispose());
        assert!(ctx.device().faults().is_empty());
        assert!(ctx.clear(ClearMask::ALL, &ClearState::default()).is_err());
    }
}
