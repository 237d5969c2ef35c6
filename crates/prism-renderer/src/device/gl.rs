//! OpenGL 3.3 / OpenGL ES 3.0 backend on `glow`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use glow::HasContext;
use prism_core::{DataType, PixelFormat, TextureFilter, TextureWrap};

use super::{
    ActiveAttribute, ActiveUniform, AttachmentPoint, BlendEquation, BlendFactor, BufferHandle,
    BufferTarget, Capability, ClearMask, CullFace, DepthFunc, DeviceCommand, DrawMode,
    FramebufferHandle, FramebufferStatus, GraphicsDevice, IndexType, ProgramHandle, ShaderHandle,
    ShaderStage, TextureDescriptor, TextureHandle, UniformData, UniformKind, VertexArrayHandle,
    VertexBinding, VertexFormat,
};
use crate::error::{RenderError, Result};

/// A [`GraphicsDevice`] driving a live GL context.
///
/// Driver objects are addressed through backend-neutral handles; the device
/// keeps the mapping to `glow` objects and caches uniform locations per
/// program until the program is relinked.
pub struct GlDevice {
    gl: glow::Context,
    next_id: u32,
    shaders: HashMap<ShaderHandle, glow::Shader>,
    programs: HashMap<ProgramHandle, glow::Program>,
    textures: HashMap<TextureHandle, glow::Texture>,
    buffers: HashMap<BufferHandle, glow::Buffer>,
    vertex_arrays: HashMap<VertexArrayHandle, glow::VertexArray>,
    framebuffers: HashMap<FramebufferHandle, glow::Framebuffer>,
    uniform_locations: HashMap<(ProgramHandle, String), Option<glow::UniformLocation>>,
    bound_framebuffer: Option<glow::Framebuffer>,
    anisotropy: bool,
}

impl GlDevice {
    /// Wraps a current GL context.
    ///
    /// Fails with [`RenderError::DeviceUnavailable`] on contexts older than
    /// OpenGL 3.3 or OpenGL ES 3.0.
    pub fn new(gl: glow::Context) -> Result<Self> {
        let version = gl.version();
        let supported = if version.is_embedded {
            version.major >= 3
        } else {
            (version.major, version.minor) >= (3, 3)
        };
        if !supported {
            return Err(RenderError::DeviceUnavailable(format!(
                "OpenGL {}{}.{} ({}) is older than 3.3 / ES 3.0",
                if version.is_embedded { "ES " } else { "" },
                version.major,
                version.minor,
                version.vendor_info
            )));
        }
        tracing::info!(
            major = version.major,
            minor = version.minor,
            embedded = version.is_embedded,
            "GL device ready"
        );

        let extensions = gl.supported_extensions();
        let anisotropy = extensions.contains("GL_EXT_texture_filter_anisotropic")
            || extensions.contains("EXT_texture_filter_anisotropic");

        Ok(Self {
            gl,
            next_id: 0,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            framebuffers: HashMap::new(),
            uniform_locations: HashMap::new(),
            bound_framebuffer: None,
            anisotropy,
        })
    }

    /// The wrapped context.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    unsafe fn upload_texture(&self, texture: glow::Texture, descriptor: &TextureDescriptor<'_>) {
        let gl = &self.gl;
        let params = &descriptor.parameters;
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format(descriptor.format, descriptor.data_type) as i32,
                descriptor.width as i32,
                descriptor.height as i32,
                0,
                pixel_format(descriptor.format),
                data_type(descriptor.data_type),
                descriptor.pixels,
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap(params.wrap_s));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap(params.wrap_t));
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                filter(params.mag_filter),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                filter(params.min_filter),
            );
            if self.anisotropy && params.anisotropy_levels > 1 {
                gl.tex_parameter_f32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MAX_ANISOTROPY_EXT,
                    params.anisotropy_levels as f32,
                );
            }
            if params.generate_mipmaps && descriptor.pixels.is_some() {
                gl.generate_mipmap(glow::TEXTURE_2D);
            }
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    fn uniform_location(
        &mut self,
        program: ProgramHandle,
        name: &str,
    ) -> Result<Option<glow::UniformLocation>> {
        let key = (program, name.to_owned());
        if let Some(location) = self.uniform_locations.get(&key) {
            return Ok(location.clone());
        }
        let gl_program = lookup(&self.programs, program)?;
        let location = unsafe { self.gl.get_uniform_location(gl_program, name) };
        self.uniform_locations.insert(key, location.clone());
        Ok(location)
    }

    fn upload_uniform(&mut self, program: ProgramHandle, name: &str, data: &UniformData) -> Result<()> {
        let Some(location) = self.uniform_location(program, name)? else {
            tracing::trace!(name, "uniform has no location");
            return Ok(());
        };
        let location = Some(&location);
        let gl = &self.gl;
        unsafe {
            match data {
                UniformData::Float(v) => gl.uniform_1_f32_slice(location, v),
                UniformData::Vec2(v) => gl.uniform_2_f32_slice(location, v),
                UniformData::Vec3(v) => gl.uniform_3_f32_slice(location, v),
                UniformData::Vec4(v) => gl.uniform_4_f32_slice(location, v),
                UniformData::Int(v) => gl.uniform_1_i32_slice(location, v),
                UniformData::Mat3(v) => gl.uniform_matrix_3_f32_slice(location, false, v),
                UniformData::Mat4(v) => gl.uniform_matrix_4_f32_slice(location, false, v),
            }
        }
        Ok(())
    }
}

fn lookup<K, V>(objects: &HashMap<K, V>, key: K) -> Result<V>
where
    K: Eq + Hash + Debug,
    V: Copy,
{
    objects
        .get(&key)
        .copied()
        .ok_or_else(|| RenderError::Device(format!("unknown {key:?}")))
}

fn forget<K, V>(objects: &mut HashMap<K, V>, key: K) -> Option<V>
where
    K: Eq + Hash + Debug,
{
    let object = objects.remove(&key);
    if object.is_none() {
        tracing::warn!(?key, "delete of unknown object");
    }
    object
}

impl GraphicsDevice for GlDevice {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let shader = unsafe {
            let shader = self.gl.create_shader(kind).map_err(RenderError::Device)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(RenderError::ShaderCompileFailure { stage, log });
            }
            shader
        };
        let handle = ShaderHandle(self.next_id());
        self.shaders.insert(handle, shader);
        Ok(handle)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if let Some(shader) = forget(&mut self.shaders, shader) {
            unsafe { self.gl.delete_shader(shader) };
        }
    }

    fn create_program(&mut self) -> Result<ProgramHandle> {
        let program = unsafe { self.gl.create_program() }.map_err(RenderError::Device)?;
        let handle = ProgramHandle(self.next_id());
        self.programs.insert(handle, program);
        Ok(handle)
    }

    fn link_program(
        &mut self,
        program: ProgramHandle,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<()> {
        let gl_program = lookup(&self.programs, program)?;
        let vs = lookup(&self.shaders, vertex)?;
        let fs = lookup(&self.shaders, fragment)?;
        self.uniform_locations.retain(|(owner, _), _| *owner != program);

        let linked = unsafe {
            self.gl.attach_shader(gl_program, vs);
            self.gl.attach_shader(gl_program, fs);
            self.gl.link_program(gl_program);
            self.gl.detach_shader(gl_program, vs);
            self.gl.detach_shader(gl_program, fs);
            self.gl.get_program_link_status(gl_program)
        };
        if !linked {
            let log = unsafe { self.gl.get_program_info_log(gl_program) };
            return Err(RenderError::ProgramLinkFailure { log });
        }
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.uniform_locations.retain(|(owner, _), _| *owner != program);
        if let Some(program) = forget(&mut self.programs, program) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn program_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveUniform> {
        let Some(&program) = self.programs.get(&program) else {
            return Vec::new();
        };
        unsafe {
            let count = self.gl.get_active_uniforms(program);
            (0..count)
                .filter_map(|index| self.gl.get_active_uniform(program, index))
                .map(|u| ActiveUniform::new(&u.name, uniform_kind(u.utype), u.size.max(1) as u32))
                .collect()
        }
    }

    fn program_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveAttribute> {
        let Some(&program) = self.programs.get(&program) else {
            return Vec::new();
        };
        unsafe {
            let count = self.gl.get_active_attributes(program);
            (0..count)
                .filter_map(|index| self.gl.get_active_attribute(program, index))
                .filter_map(|a| {
                    // built-ins such as gl_VertexID have no location
                    let location = self.gl.get_attrib_location(program, &a.name)?;
                    Some(ActiveAttribute {
                        name: a.name,
                        location,
                    })
                })
                .collect()
        }
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor<'_>) -> Result<TextureHandle> {
        let texture = unsafe { self.gl.create_texture() }.map_err(RenderError::Device)?;
        unsafe { self.upload_texture(texture, descriptor) };
        let handle = TextureHandle(self.next_id());
        self.textures.insert(handle, texture);
        Ok(handle)
    }

    fn update_texture(
        &mut self,
        texture: TextureHandle,
        descriptor: &TextureDescriptor<'_>,
    ) -> Result<()> {
        let texture = lookup(&self.textures, texture)?;
        unsafe { self.upload_texture(texture, descriptor) };
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(texture) = forget(&mut self.textures, texture) {
            unsafe { self.gl.delete_texture(texture) };
        }
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferHandle> {
        let buffer = unsafe { self.gl.create_buffer() }.map_err(RenderError::Device)?;
        let handle = BufferHandle(self.next_id());
        self.buffers.insert(handle, buffer);
        self.update_buffer(handle, target, data)?;
        Ok(handle)
    }

    fn update_buffer(&mut self, buffer: BufferHandle, target: BufferTarget, data: &[u8]) -> Result<()> {
        let buffer = lookup(&self.buffers, buffer)?;
        let target = buffer_target(target);
        unsafe {
            // element array bindings are vertex array state
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(target, Some(buffer));
            self.gl.buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
            self.gl.bind_buffer(target, None);
        }
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = forget(&mut self.buffers, buffer) {
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn create_vertex_array(
        &mut self,
        bindings: &[VertexBinding],
        index_buffer: Option<BufferHandle>,
    ) -> Result<VertexArrayHandle> {
        let buffers = bindings
            .iter()
            .map(|b| lookup(&self.buffers, b.buffer))
            .collect::<Result<Vec<_>>>()?;
        let index_buffer = index_buffer
            .map(|b| lookup(&self.buffers, b))
            .transpose()?;

        let gl = &self.gl;
        let vertex_array = unsafe {
            let vertex_array = gl.create_vertex_array().map_err(RenderError::Device)?;
            gl.bind_vertex_array(Some(vertex_array));
            for (binding, buffer) in bindings.iter().zip(buffers) {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                gl.enable_vertex_attrib_array(binding.location);
                let size = binding.components as i32;
                let stride = binding.stride as i32;
                match binding.format {
                    VertexFormat::Float => gl.vertex_attrib_pointer_f32(
                        binding.location,
                        size,
                        glow::FLOAT,
                        binding.normalized,
                        stride,
                        0,
                    ),
                    format if binding.normalized => gl.vertex_attrib_pointer_f32(
                        binding.location,
                        size,
                        vertex_format(format),
                        true,
                        stride,
                        0,
                    ),
                    format => gl.vertex_attrib_pointer_i32(
                        binding.location,
                        size,
                        vertex_format(format),
                        stride,
                        0,
                    ),
                }
            }
            if let Some(index_buffer) = index_buffer {
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
            }
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            vertex_array
        };

        let handle = VertexArrayHandle(self.next_id());
        self.vertex_arrays.insert(handle, vertex_array);
        Ok(handle)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if let Some(vertex_array) = forget(&mut self.vertex_arrays, vertex_array) {
            unsafe { self.gl.delete_vertex_array(vertex_array) };
        }
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferHandle> {
        let framebuffer = unsafe { self.gl.create_framebuffer() }.map_err(RenderError::Device)?;
        let handle = FramebufferHandle(self.next_id());
        self.framebuffers.insert(handle, framebuffer);
        Ok(handle)
    }

    fn attach_texture(
        &mut self,
        framebuffer: FramebufferHandle,
        point: AttachmentPoint,
        texture: Option<TextureHandle>,
    ) -> Result<()> {
        let framebuffer = lookup(&self.framebuffers, framebuffer)?;
        let texture = texture.map(|t| lookup(&self.textures, t)).transpose()?;
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment(point),
                glow::TEXTURE_2D,
                texture,
                0,
            );
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, self.bound_framebuffer);
        }
        Ok(())
    }

    fn framebuffer_status(&mut self, framebuffer: FramebufferHandle) -> FramebufferStatus {
        let Some(&framebuffer) = self.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::Unsupported;
        };
        let status = unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, self.bound_framebuffer);
            status
        };
        match status {
            glow::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => FramebufferStatus::IncompleteAttachment,
            glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => FramebufferStatus::MissingAttachment,
            glow::FRAMEBUFFER_UNSUPPORTED => FramebufferStatus::Unsupported,
            other => FramebufferStatus::Other(other),
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if let Some(framebuffer) = forget(&mut self.framebuffers, framebuffer) {
            if self.bound_framebuffer == Some(framebuffer) {
                self.bound_framebuffer = None;
            }
            unsafe { self.gl.delete_framebuffer(framebuffer) };
        }
    }

    fn execute(&mut self, command: &DeviceCommand) -> Result<()> {
        tracing::trace!(?command, "gl");
        if let DeviceCommand::Uniform {
            program,
            name,
            data,
        } = command
        {
            return self.upload_uniform(*program, name, data);
        }

        let gl = &self.gl;
        unsafe {
            match command {
                DeviceCommand::UseProgram(program) => {
                    let program = program.map(|p| lookup(&self.programs, p)).transpose()?;
                    gl.use_program(program);
                }
                DeviceCommand::BindFramebuffer(framebuffer) => {
                    let framebuffer = framebuffer
                        .map(|f| lookup(&self.framebuffers, f))
                        .transpose()?;
                    gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
                    self.bound_framebuffer = framebuffer;
                }
                DeviceCommand::Viewport(rect) => {
                    gl.viewport(rect.x, rect.y, rect.width, rect.height)
                }
                DeviceCommand::Scissor(rect) => gl.scissor(rect.x, rect.y, rect.width, rect.height),
                DeviceCommand::Enable(capability) => gl.enable(self::capability(*capability)),
                DeviceCommand::Disable(capability) => gl.disable(self::capability(*capability)),
                DeviceCommand::BlendEquation(equation) => {
                    gl.blend_equation(blend_equation(*equation))
                }
                DeviceCommand::BlendFunc {
                    src_rgb,
                    dst_rgb,
                    src_alpha,
                    dst_alpha,
                } => gl.blend_func_separate(
                    blend_factor(*src_rgb),
                    blend_factor(*dst_rgb),
                    blend_factor(*src_alpha),
                    blend_factor(*dst_alpha),
                ),
                DeviceCommand::DepthFunc(func) => gl.depth_func(depth_func(*func)),
                DeviceCommand::ColorMask {
                    red,
                    green,
                    blue,
                    alpha,
                } => gl.color_mask(*red, *green, *blue, *alpha),
                DeviceCommand::DepthMask(enabled) => gl.depth_mask(*enabled),
                DeviceCommand::StencilMask(mask) => gl.stencil_mask(*mask),
                DeviceCommand::CullFace(face) => gl.cull_face(cull_face(*face)),
                DeviceCommand::ClearColor([r, g, b, a]) => gl.clear_color(*r, *g, *b, *a),
                DeviceCommand::ClearDepth(depth) => gl.clear_depth_f32(*depth),
                DeviceCommand::ClearStencil(stencil) => gl.clear_stencil(*stencil),
                DeviceCommand::Clear(mask) => gl.clear(clear_bits(*mask)),
                DeviceCommand::BindTexture { unit, texture } => {
                    let texture = texture.map(|t| lookup(&self.textures, t)).transpose()?;
                    gl.active_texture(glow::TEXTURE0 + unit);
                    gl.bind_texture(glow::TEXTURE_2D, texture);
                }
                DeviceCommand::BindVertexArray(vertex_array) => {
                    let vertex_array = vertex_array
                        .map(|v| lookup(&self.vertex_arrays, v))
                        .transpose()?;
                    gl.bind_vertex_array(vertex_array);
                }
                DeviceCommand::DrawArrays { mode, first, count } => {
                    gl.draw_arrays(draw_mode(*mode), *first as i32, *count as i32)
                }
                DeviceCommand::DrawElements {
                    mode,
                    count,
                    index_type,
                } => gl.draw_elements(
                    draw_mode(*mode),
                    *count as i32,
                    match index_type {
                        IndexType::UnsignedShort => glow::UNSIGNED_SHORT,
                        IndexType::UnsignedInt => glow::UNSIGNED_INT,
                    },
                    0,
                ),
                DeviceCommand::Uniform { .. } => {}
            }
        }
        Ok(())
    }
}

fn uniform_kind(gl_type: u32) -> UniformKind {
    match gl_type {
        glow::FLOAT => UniformKind::Float,
        glow::FLOAT_VEC2 => UniformKind::Vec2,
        glow::FLOAT_VEC3 => UniformKind::Vec3,
        glow::FLOAT_VEC4 => UniformKind::Vec4,
        glow::INT => UniformKind::Int,
        glow::BOOL => UniformKind::Bool,
        glow::FLOAT_MAT3 => UniformKind::Mat3,
        glow::FLOAT_MAT4 => UniformKind::Mat4,
        glow::SAMPLER_2D => UniformKind::Sampler2D,
        glow::SAMPLER_CUBE => UniformKind::SamplerCube,
        other => UniformKind::Other(other),
    }
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn vertex_format(format: VertexFormat) -> u32 {
    match format {
        VertexFormat::Float => glow::FLOAT,
        VertexFormat::Int => glow::INT,
        VertexFormat::UnsignedInt => glow::UNSIGNED_INT,
        VertexFormat::UnsignedShort => glow::UNSIGNED_SHORT,
    }
}

fn internal_format(format: PixelFormat, data_type: DataType) -> u32 {
    match (format, data_type) {
        (PixelFormat::Rgba, DataType::Float) => glow::RGBA32F,
        (PixelFormat::Rgba, DataType::HalfFloat) => glow::RGBA16F,
        (PixelFormat::Rgba, _) => glow::RGBA8,
        (PixelFormat::Rgb, DataType::Float) => glow::RGB32F,
        (PixelFormat::Rgb, DataType::HalfFloat) => glow::RGB16F,
        (PixelFormat::Rgb, _) => glow::RGB8,
        (PixelFormat::Alpha | PixelFormat::Luminance, _) => glow::R8,
        (PixelFormat::LuminanceAlpha, _) => glow::RG8,
        (PixelFormat::DepthComponent, DataType::Float) => glow::DEPTH_COMPONENT32F,
        (PixelFormat::DepthComponent, _) => glow::DEPTH_COMPONENT24,
        (PixelFormat::DepthStencil, _) => glow::DEPTH24_STENCIL8,
    }
}

fn pixel_format(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Alpha | PixelFormat::Luminance => glow::RED,
        PixelFormat::LuminanceAlpha => glow::RG,
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Rgba => glow::RGBA,
        PixelFormat::DepthComponent => glow::DEPTH_COMPONENT,
        PixelFormat::DepthStencil => glow::DEPTH_STENCIL,
    }
}

fn data_type(data_type: DataType) -> u32 {
    match data_type {
        DataType::UnsignedByte => glow::UNSIGNED_BYTE,
        DataType::UnsignedShort => glow::UNSIGNED_SHORT,
        DataType::UnsignedInt => glow::UNSIGNED_INT,
        DataType::UnsignedInt24_8 => glow::UNSIGNED_INT_24_8,
        DataType::HalfFloat => glow::HALF_FLOAT,
        DataType::Float => glow::FLOAT,
    }
}

fn wrap(wrap: TextureWrap) -> i32 {
    (match wrap {
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

fn filter(filter: TextureFilter) -> i32 {
    (match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        TextureFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        TextureFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn attachment(point: AttachmentPoint) -> u32 {
    match point {
        AttachmentPoint::Color(index) => glow::COLOR_ATTACHMENT0 + index as u32,
        AttachmentPoint::Depth => glow::DEPTH_ATTACHMENT,
        AttachmentPoint::Stencil => glow::STENCIL_ATTACHMENT,
        AttachmentPoint::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
    }
}

fn capability(capability: Capability) -> u32 {
    match capability {
        Capability::Blend => glow::BLEND,
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::ScissorTest => glow::SCISSOR_TEST,
        Capability::CullFace => glow::CULL_FACE,
    }
}

fn blend_equation(equation: BlendEquation) -> u32 {
    match equation {
        BlendEquation::Add => glow::FUNC_ADD,
        BlendEquation::Subtract => glow::FUNC_SUBTRACT,
        BlendEquation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
    }
}

fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => glow::DST_COLOR,
        BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
    }
}

fn depth_func(func: DepthFunc) -> u32 {
    match func {
        DepthFunc::Never => glow::NEVER,
        DepthFunc::Less => glow::LESS,
        DepthFunc::Equal => glow::EQUAL,
        DepthFunc::LessEqual => glow::LEQUAL,
        DepthFunc::Greater => glow::GREATER,
        DepthFunc::NotEqual => glow::NOTEQUAL,
        DepthFunc::GreaterEqual => glow::GEQUAL,
        DepthFunc::Always => glow::ALWAYS,
    }
}

fn cull_face(face: CullFace) -> u32 {
    match face {
        CullFace::Front => glow::FRONT,
        CullFace::Back => glow::BACK,
        CullFace::FrontAndBack => glow::FRONT_AND_BACK,
    }
}

fn clear_bits(mask: ClearMask) -> u32 {
    let mut bits = 0;
    if mask.contains(ClearMask::COLOR) {
        bits |= glow::COLOR_BUFFER_BIT;
    }
    if mask.contains(ClearMask::DEPTH) {
        bits |= glow::DEPTH_BUFFER_BIT;
    }
    if mask.contains(ClearMask::STENCIL) {
        bits |= glow::STENCIL_BUFFER_BIT;
    }
    bits
}

fn draw_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::Points => glow::POINTS,
        DrawMode::Lines => glow::LINES,
        DrawMode::LineStrip => glow::LINE_STRIP,
        DrawMode::Triangles => glow::TRIANGLES,
        DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
        DrawMode::TriangleFan => glow::TRIANGLE_FAN,
    }
}
