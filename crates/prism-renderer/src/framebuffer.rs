//! Offscreen framebuffers built from render targets.

use std::collections::BTreeMap;

use glam::UVec2;
use prism_core::CoreError;
use tracing::{debug, warn};

use crate::context::RenderingContext;
use crate::device::{AttachmentPoint, FramebufferHandle, FramebufferStatus, GraphicsDevice};
use crate::error::{RenderError, Result};
use crate::resources::{RenderTarget, RenderTargetKind};
use crate::state::{BlendState, ClearState, CullingState, DepthTestState, DrawState, MaskState, Rect};
use crate::traits::DrawTarget;

/// A framebuffer object and the render targets attached to it.
///
/// All attachments share one size. Completeness is checked once, before the
/// first clear or draw after the attachments change. Every clear and draw
/// fails while an attached render target is disposed.
#[derive(Debug)]
pub struct Framebuffer {
    handle: FramebufferHandle,
    attachments: BTreeMap<AttachmentPoint, RenderTarget>,
    verified: bool,
    disposed: bool,
    pub clear_state: ClearState,
    pub depth_test: DepthTestState,
    pub blend: BlendState,
    pub mask: MaskState,
    pub culling: CullingState,
}

impl Framebuffer {
    /// Creates a framebuffer with no attachments and the configured clear
    /// and depth defaults.
    pub fn new<D: GraphicsDevice>(ctx: &mut RenderingContext<D>) -> Result<Self> {
        let handle = ctx.create_framebuffer()?;
        Ok(Self {
            handle,
            attachments: BTreeMap::new(),
            verified: false,
            disposed: false,
            clear_state: ctx.config().clear_state(),
            depth_test: ctx.config().depth_test_state(),
            blend: BlendState::default(),
            mask: MaskState::default(),
            culling: CullingState::default(),
        })
    }

    /// Creates a framebuffer with a fresh color target and, if `depth`, a
    /// depth target of the same size.
    pub fn with_targets<D: GraphicsDevice>(
        ctx: &mut RenderingContext<D>,
        size: UVec2,
        depth: bool,
    ) -> Result<Self> {
        let mut framebuffer = Self::new(ctx)?;
        let color = ctx.create_render_target(RenderTargetKind::Color, size)?;
        framebuffer.attach(ctx, AttachmentPoint::Color(0), &color)?;
        if depth {
            let depth = ctx.create_render_target(RenderTargetKind::Depth, size)?;
            framebuffer.attach(ctx, AttachmentPoint::Depth, &depth)?;
        }
        Ok(framebuffer)
    }

    pub fn handle(&self) -> FramebufferHandle {
        self.handle
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Attaches `target` at `point`, replacing what was there.
    ///
    /// The target must be live and match the size of every other
    /// attachment.
    pub fn attach<D: GraphicsDevice>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        point: AttachmentPoint,
        target: &RenderTarget,
    ) -> Result<()> {
        self.ensure_live()?;
        if ctx.render_target(target.id()).is_none() {
            return Err(CoreError::InvalidResourceState {
                kind: "render target",
                id: target.id(),
            }
            .into());
        }
        if let Some((_, other)) = self
            .attachments
            .iter()
            .find(|(p, other)| **p != point && other.size() != target.size())
        {
            return Err(RenderError::AttachmentSizeMismatch {
                attachment: point,
                expected: other.size(),
                actual: target.size(),
            });
        }

        ctx.attach_render_target(self.handle, point, Some(target.texture()))?;
        self.attachments.insert(point, *target);
        self.verified = false;
        debug!(?point, id = %target.id(), "render target attached");
        Ok(())
    }

    /// Detaches whatever is at `point`. The render target itself stays
    /// alive.
    pub fn detach<D: GraphicsDevice>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        point: AttachmentPoint,
    ) -> Result<Option<RenderTarget>> {
        self.ensure_live()?;
        let Some(target) = self.attachments.remove(&point) else {
            return Ok(None);
        };
        ctx.attach_render_target(self.handle, point, None)?;
        self.verified = false;
        Ok(Some(target))
    }

    pub fn attachment(&self, point: AttachmentPoint) -> Option<&RenderTarget> {
        self.attachments.get(&point)
    }

    pub fn attachments(&self) -> impl Iterator<Item = (AttachmentPoint, &RenderTarget)> {
        self.attachments.iter().map(|(point, target)| (*point, target))
    }

    /// Deletes the framebuffer object. Attached targets are not disposed.
    /// Returns false if already disposed.
    pub fn dispose<D: GraphicsDevice>(&mut self, ctx: &mut RenderingContext<D>) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.attachments.clear();
        ctx.delete_framebuffer(self.handle);
        true
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(RenderError::Device(format!(
                "framebuffer {} is disposed",
                self.handle.raw()
            )));
        }
        Ok(())
    }
}

impl DrawTarget for Framebuffer {
    fn framebuffer(&self) -> Option<FramebufferHandle> {
        Some(self.handle)
    }

    /// Size shared by all attachments; zero with none attached.
    fn size(&self) -> UVec2 {
        self.attachments
            .values()
            .next()
            .map_or(UVec2::ZERO, RenderTarget::size)
    }

    fn draw_state(&self) -> DrawState {
        DrawState {
            viewport: Some(Rect::from_size(self.size())),
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

    fn prepare<D: GraphicsDevice>(&mut self, ctx: &mut RenderingContext<D>) -> Result<()> {
        self.ensure_live()?;
        if let Some((point, target)) = self
            .attachments
            .iter()
            .find(|(_, target)| ctx.render_target(target.id()).is_none())
        {
            warn!(
                framebuffer = self.handle.raw(),
                ?point,
                id = %target.id(),
                "attached render target disposed"
            );
            self.verified = false;
            return Err(CoreError::InvalidResourceState {
                kind: "render target",
                id: target.id(),
            }
            .into());
        }
        if self.verified {
            return Ok(());
        }
        let status = ctx.framebuffer_status(self.handle);
        if status != FramebufferStatus::Complete {
            warn!(framebuffer = self.handle.raw(), ?status, "framebuffer incomplete");
            return Err(RenderError::IncompleteFramebuffer(status));
        }
        self.verified = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ClearMask, DeviceCommand, ObjectKind, RecordingDevice};

    fn context() -> RenderingContext<RecordingDevice> {
        RenderingContext::new(RecordingDevice::new()).unwrap()
    }

    #[test]
    fn test_attachment_sizes_must_match() {
        let mut ctx = context();
        let mut framebuffer = Framebuffer::new(&mut ctx).unwrap();
        let color = ctx
            .create_render_target(RenderTargetKind::Color, UVec2::splat(256))
            .unwrap();
        let depth = ctx
            .create_render_target(RenderTargetKind::Depth, UVec2::splat(128))
            .unwrap();

        framebuffer.attach(&mut ctx, AttachmentPoint::Color(0), &color).unwrap();
        let err = framebuffer
            .attach(&mut ctx, AttachmentPoint::Depth, &depth)
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::AttachmentSizeMismatch {
                attachment: AttachmentPoint::Depth,
                expected: UVec2::splat(256),
                actual: UVec2::splat(128),
            }
        );
        assert!(framebuffer.attachment(AttachmentPoint::Depth).is_none());
    }

    #[test]
    fn test_reattaching_a_point_replaces_it() {
        let mut ctx = context();
        let mut framebuffer = Framebuffer::new(&mut ctx).unwrap();
        let small = ctx
            .create_render_target(RenderTargetKind::Color, UVec2::splat(64))
            .unwrap();
        let large = ctx
            .create_render_target(RenderTargetKind::Color, UVec2::splat(512))
            .unwrap();

        framebuffer.attach(&mut ctx, AttachmentPoint::Color(0), &small).unwrap();
        framebuffer.attach(&mut ctx, AttachmentPoint::Color(0), &large).unwrap();
        assert_eq!(framebuffer.size(), UVec2::splat(512));
    }

    #[test]
    fn test_disposed_target_cannot_be_attached() {
        let mut ctx = context();
        let mut framebuffer = Framebuffer::new(&mut ctx).unwrap();
        let color = ctx
            .create_render_target(RenderTargetKind::Color, UVec2::splat(32))
            .unwrap();
        ctx.dispose_render_target(color.id());

        assert!(matches!(
            framebuffer.attach(&mut ctx, AttachmentPoint::Color(0), &color),
            Err(RenderError::Core(CoreError::InvalidResourceState { .. }))
        ));
    }

    #[test]
    fn test_disposing_attached_target_fails_later_clears() {
        let mut ctx = context();
        let mut framebuffer = Framebuffer::with_targets(&mut ctx, UVec2::splat(8), false).unwrap();
        let color = *framebuffer.attachment(AttachmentPoint::Color(0)).unwrap();
        let clear_state = framebuffer.clear_state();
        framebuffer
            .clear(&mut ctx, ClearMask::COLOR, &clear_state)
            .unwrap();

        assert!(ctx.dispose_render_target(color.id()));
        ctx.device_mut().clear_commands();
        let err = framebuffer
            .clear(&mut ctx, ClearMask::COLOR, &clear_state)
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::Core(CoreError::InvalidResourceState {
                kind: "render target",
                id: color.id(),
            })
        );
        assert!(ctx.device().commands().is_empty());

        // a fresh target makes the framebuffer usable again
        let replacement = ctx
            .create_render_target(RenderTargetKind::Color, UVec2::splat(8))
            .unwrap();
        framebuffer
            .attach(&mut ctx, AttachmentPoint::Color(0), &replacement)
            .unwrap();
        framebuffer
            .clear(&mut ctx, ClearMask::COLOR, &clear_state)
            .unwrap();
        assert!(ctx.device().faults().is_empty());
    }

    #[test]
    fn test_empty_framebuffer_is_incomplete() {
        let mut ctx = context();
        let mut framebuffer = Framebuffer::new(&mut ctx).unwrap();
        let clear_state = framebuffer.clear_state();
        let err = framebuffer
            .clear(&mut ctx, ClearMask::COLOR, &clear_state)
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::IncompleteFramebuffer(FramebufferStatus::MissingAttachment)
        );
        assert!(!ctx.device().commands().iter().any(|c| matches!(c, DeviceCommand::Clear(_))));
    }

    #[test]
    fn test_clear_binds_and_sizes_viewport() {
        let mut ctx = context();
        let mut framebuffer = Framebuffer::with_targets(&mut ctx, UVec2::new(320, 240), true).unwrap();
        let clear_state = framebuffer.clear_state();
        framebuffer
            .clear(&mut ctx, ClearMask::ALL, &clear_state)
            .unwrap();

        assert_eq!(ctx.framebuffer(), Some(framebuffer.handle()));
        assert_eq!(ctx.viewport(), Rect::new(0, 0, 320, 240));
        assert_eq!(
            ctx.device().commands().last(),
            Some(&DeviceCommand::Clear(ClearMask::ALL))
        );
    }

    #[test]
    fn test_dispose_forgets_binding() {
        let mut ctx = context();
        let mut framebuffer = Framebuffer::with_targets(&mut ctx, UVec2::splat(8), false).unwrap();
        ctx.set_framebuffer(Some(framebuffer.handle())).unwrap();

        assert!(framebuffer.dispose(&mut ctx));
        assert!(!framebuffer.dispose(&mut ctx));
        assert_eq!(ctx.framebuffer(), None);
        assert_eq!(ctx.device().live_count(ObjectKind::Framebuffer), 0);
        assert_eq!(ctx.device().live_count(ObjectKind::Texture), 1);
        assert!(ctx.device().faults().is_empty());
    }
}
