//! Headless device that records everything it is asked to do.
//!
//! Used by tests and tooling that need to observe the exact command stream
//! without a GPU. Handles are allocated from a counter, sources get a light
//! GLSL reflection so programs report realistic uniform tables, and misuse
//! (double deletes, binding dead objects) is recorded as a fault.

use std::collections::{BTreeMap, HashMap};

use glam::UVec2;

use super::{
    ActiveAttribute, ActiveUniform, AttachmentPoint, BufferHandle, BufferTarget, DeviceCommand,
    FramebufferHandle, FramebufferStatus, GraphicsDevice, ProgramHandle, ShaderHandle, ShaderStage,
    TextureDescriptor, TextureHandle, UniformKind, VertexArrayHandle, VertexBinding,
};
use crate::error::{RenderError, Result};

/// Kind of a device object, for leak and fault accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Shader,
    Program,
    Texture,
    Buffer,
    VertexArray,
    Framebuffer,
}

#[derive(Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    uniforms: Vec<ActiveUniform>,
    inputs: Vec<String>,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    uniforms: Vec<ActiveUniform>,
    attributes: Vec<ActiveAttribute>,
    links: u32,
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_id: u32,
    live: HashMap<u32, ObjectKind>,
    shaders: HashMap<ShaderHandle, ShaderRecord>,
    programs: HashMap<ProgramHandle, ProgramRecord>,
    textures: HashMap<TextureHandle, UVec2>,
    framebuffers: HashMap<FramebufferHandle, BTreeMap<AttachmentPoint, TextureHandle>>,
    uploads: HashMap<u32, u32>,
    commands: Vec<DeviceCommand>,
    faults: Vec<String>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands executed so far, in order.
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drains the recorded commands.
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of draw commands recorded so far.
    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    DeviceCommand::DrawArrays { .. } | DeviceCommand::DrawElements { .. }
                )
            })
            .count()
    }

    /// Misuse observed so far, such as double deletes.
    pub fn faults(&self) -> &[String] {
        &self.faults
    }

    /// Number of live objects of `kind`.
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    pub fn is_live(&self, raw: u32) -> bool {
        self.live.contains_key(&raw)
    }

    /// How many times a texture or buffer received data, creation included.
    pub fn upload_count(&self, raw: u32) -> u32 {
        self.uploads.get(&raw).copied().unwrap_or(0)
    }

    /// How many times a program was linked.
    pub fn link_count(&self, program: ProgramHandle) -> u32 {
        self.programs.get(&program).map_or(0, |p| p.links)
    }

    pub fn texture_size(&self, texture: TextureHandle) -> Option<UVec2> {
        self.textures.get(&texture).copied()
    }

    fn allocate(&mut self, kind: ObjectKind) -> u32 {
        self.next_id += 1;
        self.live.insert(self.next_id, kind);
        self.next_id
    }

    fn release(&mut self, raw: u32, kind: ObjectKind) -> bool {
        if self.live.get(&raw) == Some(&kind) {
            self.live.remove(&raw);
            true
        } else {
            self.fault(format!("delete of dead {kind:?} {raw}"));
            false
        }
    }

    fn require(&mut self, raw: u32, kind: ObjectKind) -> Result<()> {
        if self.live.get(&raw) == Some(&kind) {
            Ok(())
        } else {
            let message = format!("use of dead {kind:?} {raw}");
            self.fault(message.clone());
            Err(RenderError::Device(message))
        }
    }

    fn fault(&mut self, message: String) {
        tracing::warn!(%message, "recording device fault");
        self.faults.push(message);
    }
}

impl GraphicsDevice for RecordingDevice {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle> {
        if let Some((line, directive)) = source
            .lines()
            .enumerate()
            .find(|(_, l)| l.trim_start().starts_with("#error"))
        {
            let message = directive.trim_start().trim_start_matches("#error").trim();
            return Err(RenderError::ShaderCompileFailure {
                stage,
                log: format!("ERROR: 0:{}: '#error' : {message}", line + 1),
            });
        }
        if !source.contains("main") {
            return Err(RenderError::ShaderCompileFailure {
                stage,
                log: "ERROR: 0:1: 'main' : missing entry point".to_string(),
            });
        }

        let reflection = reflect(source);
        let handle = ShaderHandle(self.allocate(ObjectKind::Shader));
        self.shaders.insert(
            handle,
            ShaderRecord {
                stage,
                uniforms: reflection.uniforms,
                inputs: reflection.inputs,
            },
        );
        Ok(handle)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if self.release(shader.0, ObjectKind::Shader) {
            self.shaders.remove(&shader);
        }
    }

    fn create_program(&mut self) -> Result<ProgramHandle> {
        let handle = ProgramHandle(self.allocate(ObjectKind::Program));
        self.programs.insert(handle, ProgramRecord::default());
        Ok(handle)
    }

    fn link_program(
        &mut self,
        program: ProgramHandle,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<()> {
        self.require(program.0, ObjectKind::Program)?;
        let (Some(vs), Some(fs)) = (self.shaders.get(&vertex), self.shaders.get(&fragment)) else {
            return Err(RenderError::ProgramLinkFailure {
                log: "attached shader is not compiled".to_string(),
            });
        };
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err(RenderError::ProgramLinkFailure {
                log: "shader stages do not match their slots".to_string(),
            });
        }

        let mut uniforms = vs.uniforms.clone();
        for uniform in &fs.uniforms {
            if !uniforms.iter().any(|u| u.name == uniform.name) {
                uniforms.push(uniform.clone());
            }
        }
        let attributes = vs
            .inputs
            .iter()
            .enumerate()
            .map(|(location, name)| ActiveAttribute {
                name: name.clone(),
                location: location as u32,
            })
            .collect();

        let record = self.programs.entry(program).or_default();
        record.uniforms = uniforms;
        record.attributes = attributes;
        record.links += 1;
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.release(program.0, ObjectKind::Program) {
            self.programs.remove(&program);
        }
    }

    fn program_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveUniform> {
        self.programs
            .get(&program)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn program_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveAttribute> {
        self.programs
            .get(&program)
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor<'_>) -> Result<TextureHandle> {
        let handle = TextureHandle(self.allocate(ObjectKind::Texture));
        self.textures
            .insert(handle, UVec2::new(descriptor.width, descriptor.height));
        *self.uploads.entry(handle.0).or_default() += 1;
        Ok(handle)
    }

    fn update_texture(
        &mut self,
        texture: TextureHandle,
        descriptor: &TextureDescriptor<'_>,
    ) -> Result<()> {
        self.require(texture.0, ObjectKind::Texture)?;
        self.textures
            .insert(texture, UVec2::new(descriptor.width, descriptor.height));
        *self.uploads.entry(texture.0).or_default() += 1;
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.release(texture.0, ObjectKind::Texture) {
            self.textures.remove(&texture);
        }
    }

    fn create_buffer(&mut self, _target: BufferTarget, _data: &[u8]) -> Result<BufferHandle> {
        let handle = BufferHandle(self.allocate(ObjectKind::Buffer));
        *self.uploads.entry(handle.0).or_default() += 1;
        Ok(handle)
    }

    fn update_buffer(
        &mut self,
        buffer: BufferHandle,
        _target: BufferTarget,
        _data: &[u8],
    ) -> Result<()> {
        self.require(buffer.0, ObjectKind::Buffer)?;
        *self.uploads.entry(buffer.0).or_default() += 1;
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.release(buffer.0, ObjectKind::Buffer);
    }

    fn create_vertex_array(
        &mut self,
        bindings: &[VertexBinding],
        index_buffer: Option<BufferHandle>,
    ) -> Result<VertexArrayHandle> {
        for binding in bindings {
            self.require(binding.buffer.0, ObjectKind::Buffer)?;
        }
        if let Some(index_buffer) = index_buffer {
            self.require(index_buffer.0, ObjectKind::Buffer)?;
        }
        Ok(VertexArrayHandle(self.allocate(ObjectKind::VertexArray)))
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.release(vertex_array.0, ObjectKind::VertexArray);
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferHandle> {
        let handle = FramebufferHandle(self.allocate(ObjectKind::Framebuffer));
        self.framebuffers.insert(handle, BTreeMap::new());
        Ok(handle)
    }

    fn attach_texture(
        &mut self,
        framebuffer: FramebufferHandle,
        point: AttachmentPoint,
        texture: Option<TextureHandle>,
    ) -> Result<()> {
        self.require(framebuffer.0, ObjectKind::Framebuffer)?;
        if let Some(texture) = texture {
            self.require(texture.0, ObjectKind::Texture)?;
        }
        let attachments = self.framebuffers.entry(framebuffer).or_default();
        match texture {
            Some(texture) => attachments.insert(point, texture),
            None => attachments.remove(&point),
        };
        Ok(())
    }

    fn framebuffer_status(&mut self, framebuffer: FramebufferHandle) -> FramebufferStatus {
        let Some(attachments) = self.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::Unsupported;
        };
        let mut sizes = attachments
            .values()
            .map(|texture| self.textures.get(texture).copied());
        match sizes.next() {
            None => FramebufferStatus::MissingAttachment,
            Some(first) if first.is_some() && sizes.all(|size| size == first) => {
                FramebufferStatus::Complete
            }
            Some(_) => FramebufferStatus::IncompleteAttachment,
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if self.release(framebuffer.0, ObjectKind::Framebuffer) {
            self.framebuffers.remove(&framebuffer);
        }
    }

    fn execute(&mut self, command: &DeviceCommand) -> Result<()> {
        match command {
            DeviceCommand::UseProgram(Some(program)) => {
                self.require(program.0, ObjectKind::Program)?;
            }
            DeviceCommand::BindFramebuffer(Some(framebuffer)) => {
                self.require(framebuffer.0, ObjectKind::Framebuffer)?;
            }
            DeviceCommand::BindTexture {
                texture: Some(texture),
                ..
            } => {
                self.require(texture.0, ObjectKind::Texture)?;
            }
            DeviceCommand::BindVertexArray(Some(vertex_array)) => {
                self.require(vertex_array.0, ObjectKind::VertexArray)?;
            }
            DeviceCommand::Uniform { program, .. } => {
                self.require(program.0, ObjectKind::Program)?;
            }
            _ => {}
        }
        tracing::trace!(?command, "recorded");
        self.commands.push(command.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Reflection {
    uniforms: Vec<ActiveUniform>,
    inputs: Vec<String>,
}

const QUALIFIERS: &[&str] = &["lowp", "mediump", "highp", "flat", "smooth", "centroid"];

/// Collects `uniform` and `in`/`attribute` declarations from GLSL source.
fn reflect(source: &str) -> Reflection {
    let code: String = source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut reflection = Reflection::default();
    for statement in code.split([';', '{', '}']) {
        let tokens: Vec<&str> = statement
            .split_whitespace()
            .filter(|t| !QUALIFIERS.contains(t))
            .collect();
        let Some(keyword) = tokens
            .iter()
            .position(|t| matches!(*t, "uniform" | "in" | "attribute"))
        else {
            continue;
        };
        let Some(ty) = tokens.get(keyword + 1) else {
            continue;
        };
        let declarators = tokens[keyword + 2..].join(" ");
        for declarator in declarators.split(',') {
            let declarator = declarator.trim();
            if declarator.is_empty() {
                continue;
            }
            let (name, size) = match declarator.split_once('[') {
                Some((name, rest)) => {
                    let size = rest.trim_end_matches(']').trim().parse().unwrap_or(1);
                    (name.trim(), Some(size))
                }
                None => (declarator, None),
            };
            if tokens[keyword] == "uniform" {
                // drivers report array uniforms as `name[0]`
                let reported = match size {
                    Some(_) => format!("{name}[0]"),
                    None => name.to_string(),
                };
                reflection.uniforms.push(ActiveUniform::new(
                    &reported,
                    glsl_kind(ty),
                    size.unwrap_or(1),
                ));
            } else {
                reflection.inputs.push(name.to_string());
            }
        }
    }
    reflection
}

fn glsl_kind(ty: &str) -> UniformKind {
    match ty {
        "float" => UniformKind::Float,
        "vec2" => UniformKind::Vec2,
        "vec3" => UniformKind::Vec3,
        "vec4" => UniformKind::Vec4,
        "int" => UniformKind::Int,
        "bool" => UniformKind::Bool,
        "mat3" => UniformKind::Mat3,
        "mat4" => UniformKind::Mat4,
        "sampler2D" => UniformKind::Sampler2D,
        "samplerCube" => UniformKind::SamplerCube,
        _ => UniformKind::Other(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "#version 300 es
        precision highp float;
        layout(location = 0) in vec3 position;
        in vec2 uv;
        uniform mat4 localToWorld, worldToView;
        uniform highp vec3 lights[4]; // point lights
        out vec2 v_uv;
        void main() {
            v_uv = uv;
            gl_Position = worldToView * localToWorld * vec4(position, 1.0);
        }";

    const FRAGMENT: &str = "#version 300 es
        precision highp float;
        in vec2 v_uv;
        uniform sampler2D map;
        uniform mat4 worldToView;
        out vec4 color;
        void main() { color = texture(map, v_uv); }";

    #[test]
    fn test_reflects_uniforms_and_inputs() {
        let reflection = reflect(VERTEX);
        let names: Vec<_> = reflection.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["localToWorld", "worldToView", "lights"]);
        assert_eq!(reflection.uniforms[2].size, 4);
        assert_eq!(reflection.uniforms[2].kind, UniformKind::Vec3);
        assert_eq!(reflection.inputs, ["position", "uv"]);
    }

    #[test]
    fn test_link_merges_stage_uniforms() {
        let mut device = RecordingDevice::new();
        let vs = device.compile_shader(ShaderStage::Vertex, VERTEX).unwrap();
        let fs = device.compile_shader(ShaderStage::Fragment, FRAGMENT).unwrap();
        let program = device.create_program().unwrap();
        device.link_program(program, vs, fs).unwrap();

        let uniforms = device.program_uniforms(program);
        assert_eq!(uniforms.len(), 4);
        assert!(uniforms.iter().any(|u| u.name == "map" && u.kind == UniformKind::Sampler2D));
        let attributes = device.program_attributes(program);
        assert_eq!(attributes[1].name, "uv");
        assert_eq!(attributes[1].location, 1);
    }

    #[test]
    fn test_error_directive_fails_compilation() {
        let mut device = RecordingDevice::new();
        let source = "void main() {}\n#error unsupported";
        let err = device.compile_shader(ShaderStage::Fragment, source).unwrap_err();
        match err {
            RenderError::ShaderCompileFailure { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("0:2"));
                assert!(log.contains("unsupported"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_double_delete_is_a_fault() {
        let mut device = RecordingDevice::new();
        let buffer = device.create_buffer(BufferTarget::Array, &[0; 4]).unwrap();
        device.delete_buffer(buffer);
        assert!(device.faults().is_empty());
        device.delete_buffer(buffer);
        assert_eq!(device.faults().len(), 1);
    }
}
