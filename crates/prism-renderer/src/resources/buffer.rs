//! Vertex and index buffers, and the pooled GPU form of a geometry.

use std::collections::{BTreeMap, HashMap};

use prism_core::{Attribute, ComponentType, Geometry};

use super::pool::PoolResource;
use super::program::Program;
use crate::device::{
    BufferHandle, BufferTarget, DrawMode, GraphicsDevice, IndexType, ProgramHandle,
    VertexArrayHandle, VertexBinding, VertexFormat,
};
use crate::error::Result;

/// A single driver buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buffer {
    handle: BufferHandle,
    target: BufferTarget,
    byte_len: usize,
}

impl Buffer {
    pub fn new(device: &mut dyn GraphicsDevice, target: BufferTarget, data: &[u8]) -> Result<Self> {
        Ok(Self {
            handle: device.create_buffer(target, data)?,
            target,
            byte_len: data.len(),
        })
    }

    /// Replaces the buffer contents in place.
    pub fn update(&mut self, device: &mut dyn GraphicsDevice, data: &[u8]) -> Result<()> {
        device.update_buffer(self.handle, self.target, data)?;
        self.byte_len = data.len();
        Ok(())
    }

    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.delete_buffer(self.handle);
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AttributeLayout {
    components: u8,
    format: VertexFormat,
    normalized: bool,
    stride: u32,
}

impl AttributeLayout {
    fn of(attribute: &Attribute) -> Self {
        Self {
            components: attribute.components_per_vertex(),
            format: match attribute.component_type() {
                ComponentType::Float => VertexFormat::Float,
                ComponentType::Int => VertexFormat::Int,
                ComponentType::UnsignedInt => VertexFormat::UnsignedInt,
                ComponentType::UnsignedShort => VertexFormat::UnsignedShort,
            },
            normalized: attribute.normalized(),
            stride: attribute.byte_stride() as u32,
        }
    }
}

/// How a geometry is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    pub mode: DrawMode,
    pub count: u32,
    pub index_type: Option<IndexType>,
}

/// GPU buffers for a [`Geometry`], plus one vertex array per program that
/// has drawn it.
#[derive(Debug)]
pub struct BufferGeometry {
    attributes: BTreeMap<String, (Buffer, AttributeLayout)>,
    indices: Option<(Buffer, IndexType)>,
    range: DrawRange,
    vertex_arrays: HashMap<ProgramHandle, (u64, VertexArrayHandle)>,
}

impl BufferGeometry {
    pub fn draw_range(&self) -> DrawRange {
        self.range
    }

    pub fn attribute_buffer(&self, name: &str) -> Option<Buffer> {
        self.attributes.get(name).map(|(buffer, _)| *buffer)
    }

    pub fn index_buffer(&self) -> Option<Buffer> {
        self.indices.map(|(buffer, _)| buffer)
    }

    /// Vertex array binding this geometry's buffers to `program`'s inputs.
    ///
    /// Built on first use per program and rebuilt after the program is
    /// relinked. Inputs the geometry has no buffer for are left disabled.
    pub fn vertex_array(
        &mut self,
        device: &mut dyn GraphicsDevice,
        program: &Program,
    ) -> Result<VertexArrayHandle> {
        if let Some((linked, vertex_array)) = self.vertex_arrays.get(&program.handle()) {
            if *linked == program.linked_version() {
                return Ok(*vertex_array);
            }
        }
        if let Some((_, stale)) = self.vertex_arrays.remove(&program.handle()) {
            device.delete_vertex_array(stale);
        }

        let mut bindings = Vec::new();
        for input in program.attributes() {
            match self.attributes.get(&input.name) {
                Some((buffer, layout)) => bindings.push(VertexBinding {
                    location: input.location,
                    buffer: buffer.handle(),
                    components: layout.components,
                    format: layout.format,
                    normalized: layout.normalized,
                    stride: layout.stride,
                }),
                None => tracing::trace!(name = %input.name, "geometry lacks vertex input"),
            }
        }
        let index_buffer = self.indices.map(|(buffer, _)| buffer.handle());
        let vertex_array = device.create_vertex_array(&bindings, index_buffer)?;
        self.vertex_arrays.insert(
            program.handle(),
            (program.linked_version(), vertex_array),
        );
        Ok(vertex_array)
    }

    /// Deletes vertex arrays built for programs `is_live` no longer
    /// recognizes.
    pub(crate) fn retain_vertex_arrays(
        &mut self,
        device: &mut dyn GraphicsDevice,
        is_live: impl Fn(ProgramHandle) -> bool,
    ) {
        self.vertex_arrays.retain(|program, (_, vertex_array)| {
            let keep = is_live(*program);
            if !keep {
                device.delete_vertex_array(*vertex_array);
            }
            keep
        });
    }

    pub fn vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    fn release_vertex_arrays(&mut self, device: &mut dyn GraphicsDevice) {
        for (_, (_, vertex_array)) in self.vertex_arrays.drain() {
            device.delete_vertex_array(vertex_array);
        }
    }
}

fn draw_range(geometry: &Geometry) -> DrawRange {
    DrawRange {
        mode: geometry.primitive().into(),
        count: geometry.draw_count() as u32,
        index_type: geometry.indices().map(index_type),
    }
}

fn index_type(indices: &Attribute) -> IndexType {
    match indices.component_type() {
        ComponentType::UnsignedShort => IndexType::UnsignedShort,
        _ => IndexType::UnsignedInt,
    }
}

impl PoolResource for BufferGeometry {
    type Source = Geometry;

    fn create(device: &mut dyn GraphicsDevice, geometry: &Geometry) -> Result<Self> {
        let mut attributes = BTreeMap::new();
        for (name, attribute) in geometry.attributes() {
            let buffer = Buffer::new(device, BufferTarget::Array, attribute.data().as_bytes())?;
            attributes.insert(name.to_owned(), (buffer, AttributeLayout::of(attribute)));
        }
        let indices = match geometry.indices() {
            Some(indices) => Some((
                Buffer::new(device, BufferTarget::ElementArray, indices.data().as_bytes())?,
                index_type(indices),
            )),
            None => None,
        };
        Ok(Self {
            attributes,
            indices,
            range: draw_range(geometry),
            vertex_arrays: HashMap::new(),
        })
    }

    /// Re-uploads in place. Buffers for attributes that still exist keep
    /// their handles; vertex arrays are rebuilt on next use.
    fn update(&mut self, device: &mut dyn GraphicsDevice, geometry: &Geometry) -> Result<()> {
        self.release_vertex_arrays(device);

        let removed: Vec<String> = self
            .attributes
            .keys()
            .filter(|name| geometry.attribute(name).is_none())
            .cloned()
            .collect();
        for name in removed {
            if let Some((buffer, _)) = self.attributes.remove(&name) {
                buffer.release(device);
            }
        }
        for (name, attribute) in geometry.attributes() {
            let bytes = attribute.data().as_bytes();
            match self.attributes.get_mut(name) {
                Some((buffer, layout)) => {
                    buffer.update(device, bytes)?;
                    *layout = AttributeLayout::of(attribute);
                }
                None => {
                    let buffer = Buffer::new(device, BufferTarget::Array, bytes)?;
                    self.attributes
                        .insert(name.to_owned(), (buffer, AttributeLayout::of(attribute)));
                }
            }
        }

        match geometry.indices() {
            Some(indices) => {
                let bytes = indices.data().as_bytes();
                match self.indices.as_mut() {
                    Some((buffer, ty)) => {
                        buffer.update(device, bytes)?;
                        *ty = index_type(indices);
                    }
                    None => {
                        let buffer = Buffer::new(device, BufferTarget::ElementArray, bytes)?;
                        self.indices = Some((buffer, index_type(indices)));
                    }
                }
            }
            None => {
                if let Some((buffer, _)) = self.indices.take() {
                    buffer.release(device);
                }
            }
        }

        self.range = draw_range(geometry);
        Ok(())
    }

    fn release(mut self, device: &mut dyn GraphicsDevice) {
        self.release_vertex_arrays(device);
        for (_, (buffer, _)) in self.attributes {
            buffer.release(device);
        }
        if let Some((buffer, _)) = self.indices {
            buffer.release(device);
        }
    }
}
