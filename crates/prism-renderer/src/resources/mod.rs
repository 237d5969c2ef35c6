//! GPU resources realized from CPU assets.
//!
//! Programs, textures and geometries are cached in [`Pool`]s owned by the
//! rendering context, keyed by the source asset's id and refreshed when its
//! version moves ahead.

mod buffer;
mod pool;
mod program;
mod texture;

pub use buffer::{Buffer, BufferGeometry, DrawRange};
pub use pool::{Pool, PoolResource};
pub use program::Program;
pub use texture::{RenderTarget, RenderTargetKind, TexImage2D};
