//! Arena storage for scene nodes.

use glam::Mat4;

use super::{Node, NodeId};
use crate::error::{CoreError, Result};
use crate::transform;

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Flat store of nodes addressed by generational [`NodeId`]s.
///
/// Freed slots are recycled; the generation counter makes handles to a
/// disposed node stale instead of aliasing its replacement.
#[derive(Debug, Default)]
pub struct NodeStore {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    len: usize,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached node with an identity transform.
    pub fn create(&mut self) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.node = Some(Node::new());
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(Node::new()),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Creates a named node.
    pub fn create_named(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.create();
        if let Some(node) = self.get_mut(id) {
            node.name = name.into();
        }
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Like [`NodeStore::get`], failing with [`CoreError::UnknownNode`].
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(CoreError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.get_mut(id).ok_or(CoreError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Ids of every live node without a parent.
    pub fn roots(&self) -> Vec<NodeId> {
        self.ids()
            .filter(|id| self.get(*id).is_some_and(|node| node.parent.is_none()))
            .collect()
    }

    /// Ids of every live node, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|_| NodeId {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    /// Appends `child` to `parent`'s children, re-parenting it if needed.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(child)?;
        self.node(parent)?.state.ensure_live()?;
        if parent == child || self.is_ancestor(child, parent)? {
            return Err(CoreError::HierarchyCycle { parent, child });
        }
        self.detach(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Removes `child` from `parent`. Returns false if it was not a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool> {
        let children = &mut self.node_mut(parent)?.children;
        let Some(position) = children.iter().position(|c| *c == child) else {
            return Ok(false);
        };
        children.remove(position);
        self.node_mut(child)?.parent = None;
        Ok(true)
    }

    /// Detaches `id` from its parent, if any.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        if let Some(parent) = self.node(id)?.parent {
            self.remove_child(parent, id)?;
        }
        Ok(())
    }

    /// Returns true if `ancestor` is on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> Result<bool> {
        let mut current = self.node(id)?.parent;
        while let Some(node) = current {
            if node == ancestor {
                return Ok(true);
            }
            current = self.node(node)?.parent;
        }
        Ok(false)
    }

    /// Parent chain of `id`, root first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut chain = Vec::new();
        let mut current = self.node(id)?.parent;
        while let Some(node) = current {
            chain.push(node);
            current = self.node(node)?.parent;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Disposes a node and frees its slot.
    ///
    /// Disposal does not cascade: the node is detached from its parent and
    /// its children become roots. Disposing a stale id is a no-op.
    pub fn dispose(&mut self, id: NodeId) -> Result<bool> {
        let Some(node) = self.get_mut(id) else {
            return Ok(false);
        };
        node.dispose();
        let children = std::mem::take(&mut node.children);
        self.detach(id)?;
        for child in children {
            if let Some(child) = self.get_mut(child) {
                child.parent = None;
            }
        }
        self.slots[id.index as usize].node = None;
        self.free_list.push(id.index);
        self.len -= 1;
        tracing::trace!(index = id.index, "node disposed");
        Ok(true)
    }

    pub fn local_to_parent(&mut self, id: NodeId) -> Result<Mat4> {
        Ok(self.node_mut(id)?.local_to_parent())
    }

    pub fn parent_to_local(&mut self, id: NodeId) -> Result<Mat4> {
        self.node_mut(id)?.parent_to_local()
    }

    /// World transform of `id`, composed root-first from cached local
    /// transforms.
    pub fn local_to_world(&mut self, id: NodeId) -> Result<Mat4> {
        let mut world = Mat4::IDENTITY;
        for ancestor in self.ancestors(id)? {
            world *= self.local_to_parent(ancestor)?;
        }
        Ok(world * self.local_to_parent(id)?)
    }

    pub fn world_to_local(&mut self, id: NodeId) -> Result<Mat4> {
        transform::try_inverse(&self.local_to_world(id)?)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use glam::Vec3;

    use super::*;
    use crate::resource::Versioned;
    use crate::transform::Euler;

    #[test]
    fn test_add_child_sets_parent() {
        let mut store = NodeStore::new();
        let root = store.create_named("root");
        let child = store.create_named("child");
        store.add_child(root, child).unwrap();

        assert_eq!(store.parent(child).unwrap(), Some(root));
        assert_eq!(store.children(root).unwrap(), &[child]);
        assert_eq!(store.roots(), vec![root]);
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut store = NodeStore::new();
        let a = store.create();
        let b = store.create();
        let child = store.create();
        store.add_child(a, child).unwrap();
        store.add_child(b, child).unwrap();

        assert!(store.children(a).unwrap().is_empty());
        assert_eq!(store.children(b).unwrap(), &[child]);
        assert_eq!(store.parent(child).unwrap(), Some(b));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut store = NodeStore::new();
        let a = store.create();
        let b = store.create();
        store.add_child(a, b).unwrap();

        assert!(matches!(
            store.add_child(b, a),
            Err(CoreError::HierarchyCycle { .. })
        ));
        assert!(matches!(
            store.add_child(a, a),
            Err(CoreError::HierarchyCycle { .. })
        ));
    }

    #[test]
    fn test_dispose_does_not_cascade() {
        let mut store = NodeStore::new();
        let root = store.create();
        let middle = store.create();
        let leaf = store.create();
        store.add_child(root, middle).unwrap();
        store.add_child(middle, leaf).unwrap();

        assert!(store.dispose(middle).unwrap());
        assert!(!store.contains(middle));
        assert!(store.contains(leaf));
        assert_eq!(store.parent(leaf).unwrap(), None);
        assert!(store.children(root).unwrap().is_empty());
        assert_eq!(store.len(), 2);

        // second disposal is a no-op
        assert!(!store.dispose(middle).unwrap());
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut store = NodeStore::new();
        let old = store.create();
        store.dispose(old).unwrap();
        let new = store.create();

        assert_eq!(old.index(), new.index());
        assert!(store.get(old).is_none());
        assert!(store.get(new).is_some());
    }

    #[test]
    fn test_world_transform_composes_parent_chain() {
        let mut store = NodeStore::new();
        let root = store.create();
        let child = store.create();
        store.add_child(root, child).unwrap();

        let root_node = store.node_mut(root).unwrap();
        root_node.set_position(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        root_node.set_rotation(Euler::new(0.0, FRAC_PI_2, 0.0)).unwrap();
        store
            .node_mut(child)
            .unwrap()
            .set_position(Vec3::new(1.0, 0.0, 0.0))
            .unwrap();

        // rotating +x by 90 degrees about y yields -z
        let world = store.local_to_world(child).unwrap();
        let position = world.transform_point3(Vec3::ZERO);
        assert!(position.abs_diff_eq(Vec3::new(1.0, 2.0, 2.0), 1e-5));

        let inverse = store.world_to_local(child).unwrap();
        assert!((world * inverse).abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn test_world_to_local_of_flattened_node_fails() {
        let mut store = NodeStore::new();
        let node = store.create();
        store
            .node_mut(node)
            .unwrap()
            .set_scale(Vec3::new(0.0, 1.0, 1.0))
            .unwrap();
        assert!(matches!(
            store.world_to_local(node),
            Err(CoreError::DegenerateTransform { .. })
        ));
    }

    #[test]
    fn test_local_transform_cached_until_mutation() {
        let mut store = NodeStore::new();
        let parent = store.create();
        let child = store.create();
        store.add_child(parent, child).unwrap();

        store.local_to_world(child).unwrap();
        store.local_to_world(child).unwrap();
        assert_eq!(store.node(child).unwrap().local_transform_refreshes(), 1);
        assert_eq!(store.node(parent).unwrap().local_transform_refreshes(), 1);

        store
            .node_mut(parent)
            .unwrap()
            .set_scale(Vec3::splat(2.0))
            .unwrap();
        store.local_to_world(child).unwrap();
        assert_eq!(store.node(child).unwrap().local_transform_refreshes(), 1);
        assert_eq!(store.node(parent).unwrap().local_transform_refreshes(), 2);
    }

    #[test]
    fn test_child_rotation_turns_grandchild_offset() {
        let mut store = NodeStore::new();
        let root = store.create();
        let child = store.create();
        let grandchild = store.create();
        store.add_child(root, child).unwrap();
        store.add_child(child, grandchild).unwrap();

        store
            .node_mut(root)
            .unwrap()
            .set_position(Vec3::new(0.0, 1.0, 0.0))
            .unwrap();
        let child_node = store.node_mut(child).unwrap();
        child_node.set_position(Vec3::new(2.0, 0.0, 0.0)).unwrap();
        child_node.set_rotation(Euler::new(0.0, FRAC_PI_2, 0.0)).unwrap();
        store
            .node_mut(grandchild)
            .unwrap()
            .set_position(Vec3::new(1.0, 0.0, 0.0))
            .unwrap();

        // the child's own rotation leaves its origin alone
        let child_world = store.local_to_world(child).unwrap();
        let child_position = child_world.transform_point3(Vec3::ZERO);
        assert!(child_position.abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-5));

        // but turns the grandchild's +x offset onto -z
        let grandchild_world = store.local_to_world(grandchild).unwrap();
        let grandchild_position = grandchild_world.transform_point3(Vec3::ZERO);
        assert!(grandchild_position.abs_diff_eq(Vec3::new(2.0, 1.0, -1.0), 1e-5));

        let offset = grandchild_position - child_position;
        assert!(offset.abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }

    #[test]
    fn test_every_setter_bumps_version() {
        let mut store = NodeStore::new();
        let id = store.create();
        store.local_to_world(id).unwrap();
        let node = store.node_mut(id).unwrap();

        node.set_name("renamed").unwrap();
        node.set_visible(false).unwrap();
        node.set_mesh(None).unwrap();
        assert_eq!(node.version(), 3);
        assert_eq!(node.transform_version(), 0);

        node.set_position(Vec3::X).unwrap();
        assert_eq!(node.version(), 4);
        assert_eq!(node.transform_version(), 4);

        // only the transform edit forced a recompute
        store.local_to_world(id).unwrap();
        assert_eq!(store.node(id).unwrap().local_transform_refreshes(), 2);
    }
}
