//! CPU-side scene model for prism.
//!
//! Every asset (texture, geometry, material, node) carries a
//! [`ResourceState`]: a stable id plus a version that increases on each
//! mutation. Derived data, whether a node's local matrix here or a GPU
//! object in `prism-renderer`, is cached against that version with
//! [`Cached`] and rebuilt only when it falls behind.

pub mod assets;
pub mod camera;
pub mod error;
pub mod geometry;
pub mod material;
pub mod node;
pub mod resource;
pub mod scene;
pub mod texture;
pub mod transform;
pub mod uniform;

pub use assets::{Assets, Disposable};
pub use camera::{Camera, Projection};
pub use error::{CoreError, Result};
pub use geometry::{Attribute, AttributeData, ComponentType, Geometry, PrimitiveMode};
pub use material::ShaderMaterial;
pub use node::{Mesh, Node, NodeId, NodeStore};
pub use resource::{Cached, ResourceId, ResourceState, Versioned};
pub use scene::Scene;
pub use texture::{
    DataType, ImageData, PixelFormat, Texture, TextureFilter, TextureParameters, TextureWrap,
};
pub use transform::{Euler, EulerOrder};
pub use uniform::{UniformValue, Uniforms};
