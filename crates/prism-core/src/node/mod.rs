//! Scene-graph nodes stored in an arena.
//!
//! Nodes live in a [`NodeStore`] and refer to each other by [`NodeId`]. The
//! store owns the parent/child topology; a node only owns its own transform
//! state and the caches derived from it.

mod store;
mod visit;

pub use store::NodeStore;
pub use visit::{depth_first, root_first, root_last};

use glam::{Mat4, Vec3};

use crate::error::Result;
use crate::resource::{Cached, ResourceId, ResourceState, Versioned};
use crate::transform::{self, Euler};

/// Generational handle into a [`NodeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Drawable content attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mesh {
    pub geometry: ResourceId,
    pub material: ResourceId,
}

/// A transform container in the scene graph.
#[derive(Debug)]
pub struct Node {
    state: ResourceState,
    name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    position: Vec3,
    rotation: Euler,
    scale: Vec3,
    visible: bool,
    mesh: Option<Mesh>,
    transform_version: u64,
    local_to_parent: Cached<Mat4>,
    parent_to_local: Cached<Mat4>,
}

impl Node {
    pub(crate) fn new() -> Self {
        Self {
            state: ResourceState::new("node"),
            name: String::new(),
            parent: None,
            children: Vec::new(),
            position: Vec3::ZERO,
            rotation: Euler::default(),
            scale: Vec3::ONE,
            visible: true,
            mesh: None,
            transform_version: 0,
            local_to_parent: Cached::new(Mat4::IDENTITY),
            parent_to_local: Cached::new(Mat4::IDENTITY),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Euler {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn mesh(&self) -> Option<Mesh> {
        self.mesh
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.state.mark_dirty()?;
        self.name = name.into();
        Ok(())
    }

    pub fn set_position(&mut self, position: Vec3) -> Result<()> {
        self.mark_transform_dirty()?;
        self.position = position;
        Ok(())
    }

    pub fn set_rotation(&mut self, rotation: Euler) -> Result<()> {
        self.mark_transform_dirty()?;
        self.rotation = rotation;
        Ok(())
    }

    pub fn set_scale(&mut self, scale: Vec3) -> Result<()> {
        self.mark_transform_dirty()?;
        self.scale = scale;
        Ok(())
    }

    pub fn set_visible(&mut self, visible: bool) -> Result<()> {
        self.state.mark_dirty()?;
        self.visible = visible;
        Ok(())
    }

    pub fn set_mesh(&mut self, mesh: Option<Mesh>) -> Result<()> {
        self.state.mark_dirty()?;
        self.mesh = mesh;
        Ok(())
    }

    /// Version of the last position, rotation or scale change. Advances with
    /// the node version but ignores name, visibility and mesh edits.
    pub fn transform_version(&self) -> u64 {
        self.transform_version
    }

    fn mark_transform_dirty(&mut self) -> Result<()> {
        self.state.mark_dirty()?;
        self.transform_version = self.state.version();
        Ok(())
    }

    /// Local transform, recomputed only when the transform changed since the
    /// last query.
    pub fn local_to_parent(&mut self) -> Mat4 {
        *self
            .local_to_parent
            .get_or_refresh(self.transform_version, || {
                transform::compose(self.position, self.rotation, self.scale)
            })
    }

    /// Inverse of [`Node::local_to_parent`], cached under its own validity.
    pub fn parent_to_local(&mut self) -> Result<Mat4> {
        let version = self.transform_version;
        let local = self.local_to_parent();
        self.parent_to_local
            .try_get_or_refresh(version, || transform::try_inverse(&local))
            .copied()
    }

    /// How many times the local transform has been recomputed.
    pub fn local_transform_refreshes(&self) -> u64 {
        self.local_to_parent.refreshes()
    }

    pub(crate) fn dispose(&mut self) -> bool {
        self.state.dispose()
    }
}

impl Versioned for Node {
    fn state(&self) -> &ResourceState {
        &self.state
    }
}
