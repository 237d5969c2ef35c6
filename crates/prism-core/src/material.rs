//! Shader materials: program source plus material-level uniforms.

use crate::error::Result;
use crate::assets::Disposable;
use crate::resource::{ResourceState, Versioned};
use crate::uniform::{UniformValue, Uniforms};

/// GLSL vertex/fragment source with default uniform values.
#[derive(Debug)]
pub struct ShaderMaterial {
    state: ResourceState,
    name: String,
    vertex_source: String,
    fragment_source: String,
    source_version: u64,
    uniforms: Uniforms,
}

impl ShaderMaterial {
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            state: ResourceState::new("material"),
            name: String::new(),
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            source_version: 0,
            uniforms: Uniforms::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.uniforms.set(name, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    /// Material version at the last change to either shader stage.
    pub fn source_version(&self) -> u64 {
        self.source_version
    }

    /// Replaces both shader stages; the program is relinked on next use.
    pub fn set_sources(
        &mut self,
        vertex_source: impl Into<String>,
        fragment_source: impl Into<String>,
    ) -> Result<()> {
        self.state.mark_dirty()?;
        self.source_version = self.state.version();
        self.vertex_source = vertex_source.into();
        self.fragment_source = fragment_source.into();
        Ok(())
    }

    /// Bumps the version but not [`ShaderMaterial::source_version`].
    pub fn set_uniform(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Result<()> {
        self.state.mark_dirty()?;
        self.uniforms.set(name, value);
        Ok(())
    }
}

impl Disposable for ShaderMaterial {
    fn dispose(&mut self) -> bool {
        self.state.dispose()
    }
}

impl Versioned for ShaderMaterial {
    fn state(&self) -> &ResourceState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mutation_bumps_version() {
        let mut material = ShaderMaterial::new("v", "f");
        material.set_uniform("tint", 1.0).unwrap();
        assert_eq!(material.version(), 1);
        assert_eq!(material.source_version(), 0);

        material.set_sources("v2", "f2").unwrap();
        assert_eq!(material.version(), 2);
        assert_eq!(material.source_version(), 2);
        assert_eq!(material.vertex_source(), "v2");
    }
}
