//! Prism Renderer
//!
//! GPU resource and state layer for prism scenes.
//!
//! # Architecture
//!
//! - [`device::GraphicsDevice`] - Driver boundary, implemented over glow and
//!   by a recording device for tests
//! - [`context::RenderingContext`] - Owns the device, the resource pools and
//!   a shadow copy of bound state; only changed state reaches the driver
//! - [`resources::Pool`] - Version-gated cache from CPU resources to GPU
//!   objects
//! - [`traits::DrawTarget`] - Offscreen [`Framebuffer`]s and the on-screen
//!   [`CanvasFramebuffer`]
//! - [`render::render_scene`] - Scene traversal and per-node matrices
//!
//! # Example
//!
//! ```ignore
//! use prism_renderer::{CanvasFramebuffer, DrawTarget, GlDevice, RenderingContext};
//!
//! let mut ctx = RenderingContext::new(GlDevice::new(gl)?)?;
//! let mut canvas = CanvasFramebuffer::new(&ctx, window_surface);
//!
//! let stats = canvas.render(&mut ctx, &mut scene, root, &camera, true)?;
//! ```

pub mod canvas;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod logging;
pub mod render;
pub mod resources;
pub mod state;
pub mod traits;
pub mod uniforms;

pub use canvas::{CanvasFramebuffer, DisplaySurface, HeadlessSurface};
pub use config::{ClearConfig, ConfigError, RendererConfig};
pub use context::{DrawCall, RenderingContext, TargetBinding};
pub use device::{GlDevice, GraphicsDevice, RecordingDevice};
pub use error::{RenderError, Result};
pub use framebuffer::Framebuffer;
pub use logging::{init_logging, LoggingConfig};
pub use render::{render_scene, FrameStats};
pub use resources::{Pool, RenderTarget, RenderTargetKind};
pub use state::{
    BlendState, ClearState, CullingState, DepthTestState, DrawState, MaskState, Rect, StateBlock,
};
pub use traits::DrawTarget;
