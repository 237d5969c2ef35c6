//! Errors raised by the GPU layer.

use glam::UVec2;
use prism_core::{CoreError, ResourceId};

use crate::device::{AttachmentPoint, FramebufferStatus, ShaderStage};

/// Errors raised by the device, the rendering context and draw submission.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// No usable graphics device could be obtained.
    #[error("graphics device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("{stage:?} shader failed to compile: {log}")]
    ShaderCompileFailure { stage: ShaderStage, log: String },

    #[error("program failed to link: {log}")]
    ProgramLinkFailure { log: String },

    /// An attachment does not match the size of the framebuffer's other
    /// attachments.
    #[error("{attachment:?} is {actual}, but the framebuffer is {expected}")]
    AttachmentSizeMismatch {
        attachment: AttachmentPoint,
        expected: UVec2,
        actual: UVec2,
    },

    #[error("framebuffer incomplete: {0:?}")]
    IncompleteFramebuffer(FramebufferStatus),

    #[error("uniform '{name}' expects {expected}, got {found}")]
    UniformTypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("draw needs {requested} texture units, {available} available")]
    TooManyTextureUnits { requested: u32, available: u32 },

    /// A texture uniform names neither a render target nor a known texture.
    #[error("no texture or render target with id {0}")]
    MissingTexture(ResourceId),

    #[error("image data is {actual} bytes, expected {expected}")]
    InvalidImageData { expected: usize, actual: usize },

    /// A driver call failed.
    #[error("device error: {0}")]
    Device(String),

    /// One or more draws of a traversal failed; the first failure is kept.
    #[error("{failed} draw(s) failed, first: {first}")]
    DrawsFailed {
        failed: usize,
        first: Box<RenderError>,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
