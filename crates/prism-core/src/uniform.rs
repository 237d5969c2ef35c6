//! Closed uniform value model passed from materials and callers to programs.

use std::collections::BTreeMap;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::resource::ResourceId;

/// A value bound to a shader uniform.
///
/// `Texture` refers to either a [`Texture`](crate::Texture) asset or a
/// render target registered with the renderer, by identity.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Texture(ResourceId),
    /// Homogeneous, non-nested array.
    Array(Vec<UniformValue>),
}

impl UniformValue {
    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Int(_) => "int",
            UniformValue::Bool(_) => "bool",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Mat3(_) => "mat3",
            UniformValue::Mat4(_) => "mat4",
            UniformValue::Texture(_) => "texture",
            UniformValue::Array(_) => "array",
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<ResourceId> for UniformValue {
    fn from(v: ResourceId) -> Self {
        UniformValue::Texture(v)
    }
}

impl<T: Into<UniformValue>> From<Vec<T>> for UniformValue {
    fn from(values: Vec<T>) -> Self {
        UniformValue::Array(values.into_iter().map(Into::into).collect())
    }
}

/// Name → value bag bound onto a program for one draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniforms {
    values: BTreeMap<String, UniformValue>,
}

impl Uniforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<UniformValue> {
        self.values.remove(name)
    }

    /// Copies every entry of `other` over this bag.
    pub fn merge(&mut self, other: &Uniforms) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_conversion() {
        let value: UniformValue = vec![Vec3::X, Vec3::Y].into();
        assert_eq!(
            value,
            UniformValue::Array(vec![UniformValue::Vec3(Vec3::X), UniformValue::Vec3(Vec3::Y)])
        );
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = Uniforms::new().with("a", 1.0).with("b", 2);
        base.merge(&Uniforms::new().with("a", 5.0));
        assert_eq!(base.get("a"), Some(&UniformValue::Float(5.0)));
        assert_eq!(base.get("b"), Some(&UniformValue::Int(2)));
        assert_eq!(base.len(), 2);
    }
}
