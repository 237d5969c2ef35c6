//! The boundary between prism and the graphics driver.
//!
//! Everything that touches driver state goes through [`GraphicsDevice`].
//! Object lifecycle has dedicated methods; bound state, uniform uploads and
//! draws are expressed as [`DeviceCommand`]s so the state layer can compute
//! and test the exact sequence it emits.

mod gl;
mod recording;

pub use gl::GlDevice;
pub use recording::{ObjectKind, RecordingDevice};

use std::ops::{BitOr, BitOrAssign};

use prism_core::{DataType, PixelFormat, TextureParameters};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::Rect;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Backend-assigned raw id.
            pub fn raw(&self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// A compiled shader stage.
    ShaderHandle
);
handle!(
    /// A linked (or linkable) program object.
    ProgramHandle
);
handle!(TextureHandle);
handle!(BufferHandle);
handle!(VertexArrayHandle);
handle!(FramebufferHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data.
    Array,
    /// Index data.
    ElementArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    UnsignedShort,
    UnsignedInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    DepthTest,
    ScissorTest,
    CullFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendEquation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthFunc {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullFace {
    Front,
    #[default]
    Back,
    FrontAndBack,
}

/// Primitive assembly mode of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl From<prism_core::PrimitiveMode> for DrawMode {
    fn from(mode: prism_core::PrimitiveMode) -> Self {
        use prism_core::PrimitiveMode;
        match mode {
            PrimitiveMode::Points => DrawMode::Points,
            PrimitiveMode::Lines => DrawMode::Lines,
            PrimitiveMode::LineStrip => DrawMode::LineStrip,
            PrimitiveMode::Triangles => DrawMode::Triangles,
            PrimitiveMode::TriangleStrip => DrawMode::TriangleStrip,
            PrimitiveMode::TriangleFan => DrawMode::TriangleFan,
        }
    }
}

/// Bitwise-combinable set of buffers to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClearMask(u8);

impl ClearMask {
    pub const NONE: Self = Self(0);
    pub const COLOR: Self = Self(1);
    pub const DEPTH: Self = Self(1 << 1);
    pub const STENCIL: Self = Self(1 << 2);
    pub const ALL: Self = Self(0b111);

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ClearMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ClearMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Framebuffer attachment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentPoint {
    Color(u8),
    Depth,
    Stencil,
    DepthStencil,
}

/// Completeness reported by the driver for a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    MissingAttachment,
    Unsupported,
    Other(u32),
}

/// GLSL type of an active uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    Bool,
    Mat3,
    Mat4,
    Sampler2D,
    SamplerCube,
    /// Any type prism does not upload.
    Other(u32),
}

impl UniformKind {
    pub fn glsl_name(&self) -> &'static str {
        match self {
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec4 => "vec4",
            UniformKind::Int => "int",
            UniformKind::Bool => "bool",
            UniformKind::Mat3 => "mat3",
            UniformKind::Mat4 => "mat4",
            UniformKind::Sampler2D => "sampler2D",
            UniformKind::SamplerCube => "samplerCube",
            UniformKind::Other(_) => "unsupported",
        }
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, UniformKind::Sampler2D | UniformKind::SamplerCube)
    }
}

/// A uniform declared by a linked program. Array names are normalised to
/// their base name (`lights[0]` becomes `lights`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    pub name: String,
    pub kind: UniformKind,
    /// Array length, 1 for scalars.
    pub size: u32,
}

impl ActiveUniform {
    pub fn new(name: &str, kind: UniformKind, size: u32) -> Self {
        let name = name.strip_suffix("[0]").unwrap_or(name).to_owned();
        Self { name, kind, size }
    }
}

/// A vertex input declared by a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttribute {
    pub name: String,
    pub location: u32,
}

/// Component type of a vertex attribute buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float,
    Int,
    UnsignedInt,
    UnsignedShort,
}

/// How one buffer feeds one vertex input of a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    pub location: u32,
    pub buffer: BufferHandle,
    pub components: u8,
    pub format: VertexFormat,
    pub normalized: bool,
    pub stride: u32,
}

/// Storage and sampling for a 2D texture upload. `pixels` is `None` for
/// render targets, which the driver allocates uninitialised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDescriptor<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data_type: DataType,
    pub parameters: TextureParameters,
    pub pixels: Option<&'a [u8]>,
}

/// Uniform data lowered to what the driver uploads.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Float(Vec<f32>),
    Vec2(Vec<f32>),
    Vec3(Vec<f32>),
    Vec4(Vec<f32>),
    Int(Vec<i32>),
    Mat3(Vec<f32>),
    Mat4(Vec<f32>),
}

/// A state change, binding, upload or draw, executed in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    UseProgram(Option<ProgramHandle>),
    BindFramebuffer(Option<FramebufferHandle>),
    Viewport(Rect),
    Scissor(Rect),
    Enable(Capability),
    Disable(Capability),
    BlendEquation(BlendEquation),
    BlendFunc {
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    },
    DepthFunc(DepthFunc),
    ColorMask {
        red: bool,
        green: bool,
        blue: bool,
        alpha: bool,
    },
    DepthMask(bool),
    StencilMask(u32),
    CullFace(CullFace),
    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(i32),
    Clear(ClearMask),
    /// Uploads to the named uniform of the currently used program.
    Uniform {
        program: ProgramHandle,
        name: String,
        data: UniformData,
    },
    BindTexture {
        unit: u32,
        texture: Option<TextureHandle>,
    },
    BindVertexArray(Option<VertexArrayHandle>),
    DrawArrays {
        mode: DrawMode,
        first: u32,
        count: u32,
    },
    DrawElements {
        mode: DrawMode,
        count: u32,
        index_type: IndexType,
    },
}

/// A connection to a graphics driver.
///
/// Delete methods never fail: deleting an object twice is the caller's bug,
/// and backends only report it.
pub trait GraphicsDevice {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle>;

    fn delete_shader(&mut self, shader: ShaderHandle);

    fn create_program(&mut self) -> Result<ProgramHandle>;

    /// Attaches both stages, links, and detaches them again. Relinking an
    /// existing program keeps its handle.
    fn link_program(
        &mut self,
        program: ProgramHandle,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<()>;

    fn delete_program(&mut self, program: ProgramHandle);

    fn program_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveUniform>;

    fn program_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveAttribute>;

    fn create_texture(&mut self, descriptor: &TextureDescriptor<'_>) -> Result<TextureHandle>;

    /// Replaces the storage and sampling parameters of a texture in place.
    fn update_texture(
        &mut self,
        texture: TextureHandle,
        descriptor: &TextureDescriptor<'_>,
    ) -> Result<()>;

    fn delete_texture(&mut self, texture: TextureHandle);

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferHandle>;

    fn update_buffer(&mut self, buffer: BufferHandle, target: BufferTarget, data: &[u8])
    -> Result<()>;

    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn create_vertex_array(
        &mut self,
        bindings: &[VertexBinding],
        index_buffer: Option<BufferHandle>,
    ) -> Result<VertexArrayHandle>;

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    fn create_framebuffer(&mut self) -> Result<FramebufferHandle>;

    /// Binds `texture` (or nothing) to an attachment point. The framebuffer
    /// binding seen by the rest of the pipeline is left unchanged.
    fn attach_texture(
        &mut self,
        framebuffer: FramebufferHandle,
        point: AttachmentPoint,
        texture: Option<TextureHandle>,
    ) -> Result<()>;

    fn framebuffer_status(&mut self, framebuffer: FramebufferHandle) -> FramebufferStatus;

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);

    fn execute(&mut self, command: &DeviceCommand) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_mask_combines() {
        let mask = ClearMask::COLOR | ClearMask::DEPTH;
        assert!(mask.contains(ClearMask::COLOR));
        assert!(mask.contains(ClearMask::DEPTH));
        assert!(!mask.contains(ClearMask::STENCIL));
        assert!(ClearMask::NONE.is_empty());
    }

    #[test]
    fn test_active_uniform_normalises_array_names() {
        let uniform = ActiveUniform::new("lights[0]", UniformKind::Vec3, 4);
        assert_eq!(uniform.name, "lights");
        assert_eq!(ActiveUniform::new("color", UniformKind::Vec3, 1).name, "color");
    }
}
