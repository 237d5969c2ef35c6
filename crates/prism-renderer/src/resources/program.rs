//! Linked shader programs realized from materials.

use std::collections::HashMap;

use prism_core::ShaderMaterial;

use super::pool::PoolResource;
use crate::device::{
    ActiveAttribute, ActiveUniform, GraphicsDevice, ProgramHandle, ShaderHandle, ShaderStage,
};
use crate::error::Result;

/// A linked program plus the uniform and attribute tables it reported.
#[derive(Debug)]
pub struct Program {
    handle: ProgramHandle,
    uniforms: HashMap<String, ActiveUniform>,
    attributes: Vec<ActiveAttribute>,
    linked_version: u64,
}

impl Program {
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Looks up an active uniform by its base name.
    pub fn uniform(&self, name: &str) -> Option<&ActiveUniform> {
        self.uniforms.get(name)
    }

    pub fn uniforms(&self) -> impl Iterator<Item = &ActiveUniform> {
        self.uniforms.values()
    }

    pub fn attributes(&self) -> &[ActiveAttribute] {
        &self.attributes
    }

    /// Material source version this program was last linked from. Vertex
    /// arrays built against an older link are stale.
    pub fn linked_version(&self) -> u64 {
        self.linked_version
    }

    fn reflect(&mut self, device: &mut dyn GraphicsDevice) {
        self.uniforms = device
            .program_uniforms(self.handle)
            .into_iter()
            .map(|uniform| (uniform.name.clone(), uniform))
            .collect();
        self.attributes = device.program_attributes(self.handle);
    }
}

fn compile_stages(
    device: &mut dyn GraphicsDevice,
    material: &ShaderMaterial,
) -> Result<(ShaderHandle, ShaderHandle)> {
    let vertex = device.compile_shader(ShaderStage::Vertex, material.vertex_source())?;
    match device.compile_shader(ShaderStage::Fragment, material.fragment_source()) {
        Ok(fragment) => Ok((vertex, fragment)),
        Err(err) => {
            device.delete_shader(vertex);
            Err(err)
        }
    }
}

/// Compiles both stages and links them into `program`. Shader objects are
/// deleted whether or not linking succeeds.
fn build(
    device: &mut dyn GraphicsDevice,
    program: ProgramHandle,
    material: &ShaderMaterial,
) -> Result<()> {
    let (vertex, fragment) = compile_stages(device, material)?;
    let linked = device.link_program(program, vertex, fragment);
    device.delete_shader(vertex);
    device.delete_shader(fragment);
    linked
}

impl PoolResource for Program {
    type Source = ShaderMaterial;

    fn create(device: &mut dyn GraphicsDevice, material: &ShaderMaterial) -> Result<Self> {
        let handle = device.create_program()?;
        if let Err(err) = build(device, handle, material) {
            device.delete_program(handle);
            tracing::warn!(material = material.name(), %err, "program build failed");
            return Err(err);
        }

        let mut program = Self {
            handle,
            uniforms: HashMap::new(),
            attributes: Vec::new(),
            linked_version: material.source_version(),
        };
        program.reflect(device);
        tracing::debug!(
            material = material.name(),
            uniforms = program.uniforms.len(),
            attributes = program.attributes.len(),
            "program linked"
        );
        Ok(program)
    }

    fn update(&mut self, device: &mut dyn GraphicsDevice, material: &ShaderMaterial) -> Result<()> {
        if material.source_version() == self.linked_version {
            tracing::trace!(material = material.name(), "program sources unchanged");
            return Ok(());
        }
        build(device, self.handle, material)?;
        self.linked_version = material.source_version();
        self.reflect(device);
        tracing::debug!(material = material.name(), "program relinked");
        Ok(())
    }

    fn release(self, device: &mut dyn GraphicsDevice) {
        device.delete_program(self.handle);
    }
}
