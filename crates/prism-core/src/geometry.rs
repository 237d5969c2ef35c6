//! CPU-side geometry: named attribute arrays plus an optional index array.

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::assets::Disposable;
use crate::resource::{ResourceState, Versioned};

/// Scalar type of an attribute's components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Float,
    Int,
    UnsignedInt,
    UnsignedShort,
}

impl ComponentType {
    pub fn bytes(&self) -> usize {
        match self {
            ComponentType::UnsignedShort => 2,
            _ => 4,
        }
    }
}

/// Typed attribute storage.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    Float32(Vec<f32>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    UInt16(Vec<u16>),
}

impl AttributeData {
    pub fn len(&self) -> usize {
        match self {
            AttributeData::Float32(v) => v.len(),
            AttributeData::Int32(v) => v.len(),
            AttributeData::UInt32(v) => v.len(),
            AttributeData::UInt16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            AttributeData::Float32(_) => ComponentType::Float,
            AttributeData::Int32(_) => ComponentType::Int,
            AttributeData::UInt32(_) => ComponentType::UnsignedInt,
            AttributeData::UInt16(_) => ComponentType::UnsignedShort,
        }
    }

    /// The raw bytes as uploaded to a GPU buffer.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeData::Float32(v) => bytemuck::cast_slice(v),
            AttributeData::Int32(v) => bytemuck::cast_slice(v),
            AttributeData::UInt32(v) => bytemuck::cast_slice(v),
            AttributeData::UInt16(v) => bytemuck::cast_slice(v),
        }
    }
}

/// A vertex attribute: flat data interpreted in groups of
/// `components_per_vertex`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    data: AttributeData,
    components_per_vertex: u8,
    normalized: bool,
}

impl Attribute {
    pub fn new(data: AttributeData, components_per_vertex: u8) -> Result<Self> {
        if !(1..=4).contains(&components_per_vertex) {
            return Err(CoreError::InvalidAttribute {
                name: String::new(),
                reason: format!("{components_per_vertex} components per vertex"),
            });
        }
        if data.len() % components_per_vertex as usize != 0 {
            return Err(CoreError::InvalidAttribute {
                name: String::new(),
                reason: format!(
                    "{} values is not a multiple of {components_per_vertex}",
                    data.len()
                ),
            });
        }
        Ok(Self {
            data,
            components_per_vertex,
            normalized: false,
        })
    }

    pub fn float32(data: Vec<f32>, components_per_vertex: u8) -> Result<Self> {
        Self::new(AttributeData::Float32(data), components_per_vertex)
    }

    pub fn int32(data: Vec<i32>, components_per_vertex: u8) -> Result<Self> {
        Self::new(AttributeData::Int32(data), components_per_vertex)
    }

    /// A single-component u32 index array.
    pub fn indices(data: Vec<u32>) -> Self {
        Self {
            data: AttributeData::UInt32(data),
            components_per_vertex: 1,
            normalized: false,
        }
    }

    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    pub fn components_per_vertex(&self) -> u8 {
        self.components_per_vertex
    }

    pub fn normalized(&self) -> bool {
        self.normalized
    }

    pub fn component_type(&self) -> ComponentType {
        self.data.component_type()
    }

    pub fn count(&self) -> usize {
        self.data.len() / self.components_per_vertex as usize
    }

    pub fn byte_stride(&self) -> usize {
        self.components_per_vertex as usize * self.component_type().bytes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Named attribute buffers plus optional indices.
#[derive(Debug)]
pub struct Geometry {
    state: ResourceState,
    attributes: BTreeMap<String, Attribute>,
    indices: Option<Attribute>,
    primitive: PrimitiveMode,
}

impl Geometry {
    pub fn new() -> Self {
        Self {
            state: ResourceState::new("geometry"),
            attributes: BTreeMap::new(),
            indices: None,
            primitive: PrimitiveMode::Triangles,
        }
    }

    /// Builder form of [`Geometry::set_attribute`].
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Result<Self> {
        self.set_attribute(name, attribute)?;
        Ok(self)
    }

    /// Builder form of [`Geometry::set_indices`].
    pub fn with_indices(mut self, indices: Attribute) -> Result<Self> {
        self.set_indices(Some(indices))?;
        Ok(self)
    }

    /// Adds or replaces an attribute. All attributes must agree on vertex count.
    pub fn set_attribute(&mut self, name: impl Into<String>, attribute: Attribute) -> Result<()> {
        self.state.ensure_live()?;
        let name = name.into();
        let mismatch = self
            .attributes
            .iter()
            .find(|(other, existing)| **other != name && existing.count() != attribute.count());
        if let Some((other, existing)) = mismatch {
            return Err(CoreError::InvalidAttribute {
                reason: format!(
                    "{} vertices, but '{other}' has {}",
                    attribute.count(),
                    existing.count()
                ),
                name,
            });
        }
        self.state.mark_dirty()?;
        self.attributes.insert(name, attribute);
        Ok(())
    }

    pub fn remove_attribute(&mut self, name: &str) -> Result<Option<Attribute>> {
        self.state.mark_dirty()?;
        Ok(self.attributes.remove(name))
    }

    /// Sets the index array; indices must be single-component unsigned data.
    pub fn set_indices(&mut self, indices: Option<Attribute>) -> Result<()> {
        self.state.ensure_live()?;
        if let Some(indices) = &indices {
            let unsigned = matches!(
                indices.component_type(),
                ComponentType::UnsignedInt | ComponentType::UnsignedShort
            );
            if !unsigned || indices.components_per_vertex() != 1 {
                return Err(CoreError::InvalidAttribute {
                    name: "indices".to_string(),
                    reason: "indices must be single-component u16 or u32".to_string(),
                });
            }
        }
        self.state.mark_dirty()?;
        self.indices = indices;
        Ok(())
    }

    pub fn set_primitive(&mut self, primitive: PrimitiveMode) -> Result<()> {
        self.state.mark_dirty()?;
        self.primitive = primitive;
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(name, a)| (name.as_str(), a))
    }

    pub fn indices(&self) -> Option<&Attribute> {
        self.indices.as_ref()
    }

    pub fn primitive(&self) -> PrimitiveMode {
        self.primitive
    }

    pub fn vertex_count(&self) -> usize {
        self.attributes.values().next().map_or(0, Attribute::count)
    }

    /// Number of elements a draw of this geometry submits.
    pub fn draw_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.count(),
            None => self.vertex_count(),
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for Geometry {
    fn dispose(&mut self) -> bool {
        self.state.dispose()
    }
}

impl Versioned for Geometry {
    fn state(&self) -> &ResourceState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Geometry {
        Geometry::new()
            .with_attribute(
                "position",
                Attribute::float32(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 3).unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_attribute_component_validation() {
        assert!(Attribute::float32(vec![0.0; 4], 3).is_err());
        assert!(Attribute::float32(vec![0.0; 4], 5).is_err());
        assert_eq!(Attribute::float32(vec![0.0; 6], 2).unwrap().count(), 3);
    }

    #[test]
    fn test_vertex_count_must_agree() {
        let mut geometry = triangle();
        let err = geometry
            .set_attribute("uv", Attribute::float32(vec![0.0; 4], 2).unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAttribute { .. }));
        assert!(geometry
            .set_attribute("uv", Attribute::float32(vec![0.0; 6], 2).unwrap())
            .is_ok());
    }

    #[test]
    fn test_replacing_attribute_with_new_count() {
        let mut geometry = triangle();
        let position = Attribute::float32(vec![0.0; 12], 3).unwrap();
        geometry.set_attribute("position", position).unwrap();
        assert_eq!(geometry.vertex_count(), 4);
    }

    #[test]
    fn test_indices_must_be_unsigned() {
        let mut geometry = triangle();
        let signed = Attribute::int32(vec![0, 1, 2], 1).unwrap();
        assert!(geometry.set_indices(Some(signed)).is_err());
        geometry.set_indices(Some(Attribute::indices(vec![0, 1, 2, 2, 1, 0]))).unwrap();
        assert_eq!(geometry.draw_count(), 6);
        assert_eq!(geometry.vertex_count(), 3);
    }

    #[test]
    fn test_as_bytes_length() {
        let data = AttributeData::UInt16(vec![1, 2, 3]);
        assert_eq!(data.as_bytes().len(), 6);
    }

    #[test]
    fn test_disposed_geometry_rejects_changes() {
        let mut geometry = triangle();
        geometry.dispose();
        assert!(geometry.set_primitive(PrimitiveMode::Lines).is_err());
    }
}
