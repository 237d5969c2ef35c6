//! Validation and lowering of uniform values against a linked program.

use prism_core::{ResourceId, UniformValue, Uniforms};

use crate::device::{ActiveUniform, TextureHandle, UniformData, UniformKind};
use crate::error::{RenderError, Result};
use crate::resources::Program;

/// Uniform uploads and texture bindings for one draw.
#[derive(Debug, Default, PartialEq)]
pub struct BoundUniforms {
    pub uploads: Vec<(String, UniformData)>,
    /// `(unit, texture)` pairs, units assigned from 0 in upload order.
    pub textures: Vec<(u32, TextureHandle)>,
}

/// Lowers `uniforms` for `program`.
///
/// Values are checked against the program's declared types. Names the
/// program does not declare are skipped, since drivers strip uniforms a
/// shader never reads. Texture values get the next free unit and are
/// resolved to driver handles through `resolve`.
pub fn bind_uniforms(
    program: &Program,
    uniforms: &Uniforms,
    max_texture_units: u32,
    resolve: &mut dyn FnMut(ResourceId) -> Result<TextureHandle>,
) -> Result<BoundUniforms> {
    let mut bound = BoundUniforms::default();
    for (name, value) in uniforms.iter() {
        let Some(active) = program.uniform(name) else {
            tracing::trace!(name, "uniform not declared by program, skipped");
            continue;
        };
        let data = lower(name, active, value, max_texture_units, resolve, &mut bound.textures)?;
        bound.uploads.push((name.to_owned(), data));
    }
    Ok(bound)
}

fn lower(
    name: &str,
    active: &ActiveUniform,
    value: &UniformValue,
    max_texture_units: u32,
    resolve: &mut dyn FnMut(ResourceId) -> Result<TextureHandle>,
    textures: &mut Vec<(u32, TextureHandle)>,
) -> Result<UniformData> {
    let mismatch = || RenderError::UniformTypeMismatch {
        name: name.to_owned(),
        expected: active.kind.glsl_name(),
        found: value.type_name(),
    };

    let items: Vec<&UniformValue> = match value {
        UniformValue::Array(items) => {
            let nested = items.iter().any(|i| matches!(i, UniformValue::Array(_)));
            if items.is_empty() || nested || items.len() > active.size as usize {
                return Err(mismatch());
            }
            items.iter().collect()
        }
        single => vec![single],
    };

    let data = match active.kind {
        UniformKind::Float => flatten(&items, |v| match v {
            UniformValue::Float(f) => Some(vec![*f]),
            _ => None,
        })
        .map(UniformData::Float),
        UniformKind::Vec2 => flatten(&items, |v| match v {
            UniformValue::Vec2(v) => Some(v.to_array().to_vec()),
            _ => None,
        })
        .map(UniformData::Vec2),
        UniformKind::Vec3 => flatten(&items, |v| match v {
            UniformValue::Vec3(v) => Some(v.to_array().to_vec()),
            _ => None,
        })
        .map(UniformData::Vec3),
        UniformKind::Vec4 => flatten(&items, |v| match v {
            UniformValue::Vec4(v) => Some(v.to_array().to_vec()),
            _ => None,
        })
        .map(UniformData::Vec4),
        UniformKind::Mat3 => flatten(&items, |v| match v {
            UniformValue::Mat3(m) => Some(m.to_cols_array().to_vec()),
            _ => None,
        })
        .map(UniformData::Mat3),
        UniformKind::Mat4 => flatten(&items, |v| match v {
            UniformValue::Mat4(m) => Some(m.to_cols_array().to_vec()),
            _ => None,
        })
        .map(UniformData::Mat4),
        UniformKind::Int => flatten(&items, |v| match v {
            UniformValue::Int(i) => Some(vec![*i]),
            _ => None,
        })
        .map(UniformData::Int),
        UniformKind::Bool => flatten(&items, |v| match v {
            UniformValue::Bool(b) => Some(vec![i32::from(*b)]),
            _ => None,
        })
        .map(UniformData::Int),
        UniformKind::Sampler2D | UniformKind::SamplerCube => {
            let ids = flatten(&items, |v| match v {
                UniformValue::Texture(id) => Some(vec![*id]),
                _ => None,
            })
            .ok_or_else(mismatch)?;
            let mut units = Vec::with_capacity(ids.len());
            for id in ids {
                let unit = textures.len() as u32;
                if unit >= max_texture_units {
                    return Err(RenderError::TooManyTextureUnits {
                        requested: unit + 1,
                        available: max_texture_units,
                    });
                }
                textures.push((unit, resolve(id)?));
                units.push(unit as i32);
            }
            Some(UniformData::Int(units))
        }
        UniformKind::Other(_) => None,
    };
    data.ok_or_else(mismatch)
}

/// Concatenates the lowered form of every item; `None` if any item has the
/// wrong type.
fn flatten<T>(items: &[&UniformValue], lower: impl Fn(&UniformValue) -> Option<Vec<T>>) -> Option<Vec<T>> {
    let mut out = Vec::new();
    for item in items {
        out.extend(lower(item)?);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};
    use prism_core::ShaderMaterial;

    use super::*;
    use crate::device::{GraphicsDevice, RecordingDevice};
    use crate::resources::PoolResource;

    const VERTEX: &str = "
        in vec3 position;
        uniform mat4 localToWorld;
        uniform vec3 lights[2];
        uniform bool flipY;
        void main() { gl_Position = localToWorld * vec4(position, 1.0); }";

    const FRAGMENT: &str = "
        uniform sampler2D albedo;
        uniform sampler2D normals;
        out vec4 color;
        void main() { color = vec4(1.0); }";

    fn program(device: &mut RecordingDevice) -> Program {
        Program::create(device, &ShaderMaterial::new(VERTEX, FRAGMENT)).unwrap()
    }

    fn no_textures(_: ResourceId) -> Result<TextureHandle> {
        panic!("no texture expected")
    }

    #[test]
    fn test_lowers_declared_uniforms_and_skips_unknown() {
        let mut device = RecordingDevice::new();
        let program = program(&mut device);
        let uniforms = Uniforms::new()
            .with("localToWorld", Mat4::IDENTITY)
            .with("lights", vec![Vec3::X, Vec3::Y])
            .with("flipY", true)
            .with("unused", 1.0);

        let bound = bind_uniforms(&program, &uniforms, 16, &mut no_textures).unwrap();
        assert_eq!(bound.uploads.len(), 3);
        assert!(bound.uploads.contains(&(
            "lights".to_string(),
            UniformData::Vec3(vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
        )));
        assert!(bound.uploads.contains(&("flipY".to_string(), UniformData::Int(vec![1]))));
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let mut device = RecordingDevice::new();
        let program = program(&mut device);
        let uniforms = Uniforms::new().with("localToWorld", Vec3::ONE);

        let err = bind_uniforms(&program, &uniforms, 16, &mut no_textures).unwrap_err();
        assert_eq!(
            err,
            RenderError::UniformTypeMismatch {
                name: "localToWorld".to_string(),
                expected: "mat4",
                found: "vec3",
            }
        );
    }

    #[test]
    fn test_array_longer_than_declaration_is_rejected() {
        let mut device = RecordingDevice::new();
        let program = program(&mut device);
        let uniforms = Uniforms::new().with("lights", vec![Vec3::X, Vec3::Y, Vec3::Z]);
        assert!(matches!(
            bind_uniforms(&program, &uniforms, 16, &mut no_textures),
            Err(RenderError::UniformTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_textures_get_sequential_units() {
        let mut device = RecordingDevice::new();
        let program = program(&mut device);
        let albedo = ResourceId::new();
        let normals = ResourceId::new();
        let uniforms = Uniforms::new().with("albedo", albedo).with("normals", normals);

        let mut resolved = Vec::new();
        let bound = bind_uniforms(&program, &uniforms, 16, &mut |id| {
            resolved.push(id);
            Ok(TextureHandle(resolved.len() as u32 + 100))
        })
        .unwrap();

        let units: Vec<u32> = bound.textures.iter().map(|(unit, _)| *unit).collect();
        assert_eq!(units, [0, 1]);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_texture_units_are_bounded() {
        let mut device = RecordingDevice::new();
        let program = program(&mut device);
        let uniforms = Uniforms::new()
            .with("albedo", ResourceId::new())
            .with("normals", ResourceId::new());

        let err = bind_uniforms(&program, &uniforms, 1, &mut |_| Ok(TextureHandle(1))).unwrap_err();
        assert_eq!(
            err,
            RenderError::TooManyTextureUnits {
                requested: 2,
                available: 1
            }
        );
    }

    #[test]
    fn test_program_reflection_feeds_validation() {
        let mut device = RecordingDevice::new();
        let program = program(&mut device);
        assert_eq!(program.uniform("lights").map(|u| u.size), Some(2));
        assert!(device.program_uniforms(program.handle()).len() >= 4);
    }
}
