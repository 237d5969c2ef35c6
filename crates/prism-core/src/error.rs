//! Error types for the CPU-side scene model.

use crate::node::NodeId;
use crate::resource::ResourceId;

/// Errors raised by resources, assets and the node arena.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// A disposed resource was mutated or requested.
    #[error("{kind} {id} has been disposed")]
    InvalidResourceState { kind: &'static str, id: ResourceId },
    /// A transform could not be inverted.
    #[error("degenerate transform (determinant {determinant})")]
    DegenerateTransform { determinant: f32 },
    /// The node handle is stale or was never issued by this store.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    /// Attaching the child would make a node its own ancestor.
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    HierarchyCycle { parent: NodeId, child: NodeId },
    /// Attribute data does not fit the declared layout.
    #[error("invalid attribute '{name}': {reason}")]
    InvalidAttribute { name: String, reason: String },
    /// No asset with this id lives in the store.
    #[error("unknown asset {0}")]
    UnknownAsset(ResourceId),
}

pub type Result<T> = std::result::Result<T, CoreError>;
