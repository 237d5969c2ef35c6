//! Typed asset stores keyed by resource identity.

use std::collections::HashMap;

use crate::error::{CoreError, Result};
use crate::resource::{ResourceId, Versioned};

/// Resources that can be disposed exactly once.
pub trait Disposable {
    /// Returns true only for the call that performed the disposal.
    fn dispose(&mut self) -> bool;
}

/// Store of CPU assets addressed by [`ResourceId`].
///
/// Nodes and uniforms refer to assets by id; the renderer resolves those ids
/// through the store when it realizes GPU objects.
#[derive(Debug)]
pub struct Assets<T> {
    items: HashMap<ResourceId, T>,
}

impl<T: Versioned> Assets<T> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    /// Adds an asset and returns its id.
    pub fn insert(&mut self, asset: T) -> ResourceId {
        let id = asset.id();
        self.items.insert(id, asset);
        id
    }

    pub fn get(&self, id: ResourceId) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    /// Like [`Assets::get`], failing with [`CoreError::UnknownAsset`].
    pub fn try_get(&self, id: ResourceId) -> Result<&T> {
        self.items.get(&id).ok_or(CoreError::UnknownAsset(id))
    }

    pub fn try_get_mut(&mut self, id: ResourceId) -> Result<&mut T> {
        self.items.get_mut(&id).ok_or(CoreError::UnknownAsset(id))
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.items.contains_key(&id)
    }

    /// Removes an asset from the store without disposing it.
    pub fn remove(&mut self, id: ResourceId) -> Option<T> {
        self.items.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &T)> {
        self.items.iter().map(|(id, asset)| (*id, asset))
    }
}

impl<T: Versioned + Disposable> Assets<T> {
    /// Disposes the asset in place. It stays in the store so pools can
    /// observe the disposal.
    pub fn dispose(&mut self, id: ResourceId) -> bool {
        self.items.get_mut(&id).is_some_and(Disposable::dispose)
    }
}

impl<T: Versioned> Default for Assets<T> {
    fn default() -> Self {
        Self::new()
    }
}
