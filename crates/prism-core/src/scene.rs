//! A node arena bundled with the asset stores its meshes refer to.

use crate::assets::Assets;
use crate::error::Result;
use crate::geometry::Geometry;
use crate::material::ShaderMaterial;
use crate::node::{Mesh, NodeId, NodeStore};
use crate::resource::ResourceId;
use crate::texture::Texture;

/// Everything the renderer needs to draw a frame.
///
/// Fields are public so a traversal can walk `nodes` mutably while reading
/// the asset stores.
#[derive(Debug, Default)]
pub struct Scene {
    pub nodes: NodeStore,
    pub geometries: Assets<Geometry>,
    pub materials: Assets<ShaderMaterial>,
    pub textures: Assets<Texture>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> ResourceId {
        self.geometries.insert(geometry)
    }

    pub fn add_material(&mut self, material: ShaderMaterial) -> ResourceId {
        self.materials.insert(material)
    }

    pub fn add_texture(&mut self, texture: Texture) -> ResourceId {
        self.textures.insert(texture)
    }

    /// Creates a node drawing `geometry` with `material`, optionally under
    /// `parent`. Nothing is created if any of them is unknown.
    pub fn spawn_mesh(
        &mut self,
        geometry: ResourceId,
        material: ResourceId,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        self.geometries.try_get(geometry)?;
        self.materials.try_get(material)?;
        if let Some(parent) = parent {
            self.nodes.node(parent)?;
        }

        let id = self.nodes.create();
        let attached = self
            .nodes
            .node_mut(id)
            .and_then(|node| node.set_mesh(Some(Mesh { geometry, material })))
            .and_then(|()| match parent {
                Some(parent) => self.nodes.add_child(parent, id),
                None => Ok(()),
            });
        if let Err(err) = attached {
            self.nodes.dispose(id)?;
            return Err(err);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::geometry::Attribute;

    fn triangle() -> Geometry {
        Geometry::new()
            .with_attribute(
                "position",
                Attribute::float32(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 3).unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_spawn_mesh_under_parent() {
        let mut scene = Scene::new();
        let geometry = scene.add_geometry(triangle());
        let material = scene.add_material(ShaderMaterial::new("", ""));
        let root = scene.nodes.create_named("root");

        let node = scene.spawn_mesh(geometry, material, Some(root)).unwrap();
        let mesh = scene.nodes.node(node).unwrap().mesh().unwrap();
        assert_eq!(mesh.geometry, geometry);
        assert_eq!(scene.nodes.parent(node).unwrap(), Some(root));
    }

    #[test]
    fn test_spawn_mesh_rejects_unknown_assets() {
        let mut scene = Scene::new();
        let material = scene.add_material(ShaderMaterial::new("", ""));
        let missing = ResourceId::new();
        assert_eq!(
            scene.spawn_mesh(missing, material, None).unwrap_err(),
            CoreError::UnknownAsset(missing)
        );
        assert!(scene.nodes.is_empty());
    }

    #[test]
    fn test_spawn_mesh_under_stale_parent_creates_nothing() {
        let mut scene = Scene::new();
        let geometry = scene.add_geometry(triangle());
        let material = scene.add_material(ShaderMaterial::new("", ""));
        let stale = scene.nodes.create();
        scene.nodes.dispose(stale).unwrap();

        assert!(scene.spawn_mesh(geometry, material, Some(stale)).is_err());
        assert!(scene.nodes.is_empty());
        assert!(scene.nodes.roots().is_empty());
    }
}
