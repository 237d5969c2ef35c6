//! Version-gated cache from CPU resources to their GPU counterparts.

use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;

use prism_core::{CoreError, ResourceId, Versioned};

use crate::device::GraphicsDevice;
use crate::error::Result;

/// A GPU object realized from a versioned CPU resource.
pub trait PoolResource: Sized {
    type Source: Versioned;

    /// Builds the GPU object from the current CPU state.
    fn create(device: &mut dyn GraphicsDevice, source: &Self::Source) -> Result<Self>;

    /// Brings the GPU object in line with a newer CPU state, keeping its
    /// handles.
    fn update(&mut self, device: &mut dyn GraphicsDevice, source: &Self::Source) -> Result<()>;

    /// Deletes every driver object owned by this resource.
    fn release(self, device: &mut dyn GraphicsDevice);
}

struct PoolEntry<R> {
    resource: R,
    version: u64,
}

/// At most one GPU object per resource id, refreshed in place when the
/// source version moves ahead.
pub struct Pool<R: PoolResource> {
    entries: HashMap<ResourceId, PoolEntry<R>>,
    creates: u64,
    updates: u64,
}

impl<R: PoolResource> Pool<R> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            creates: 0,
            updates: 0,
        }
    }

    /// Returns the GPU object for `source`, creating or refreshing it first
    /// if needed.
    ///
    /// A disposed source is rejected with
    /// [`CoreError::InvalidResourceState`], and any GPU object still held
    /// for it is released.
    pub fn acquire(
        &mut self,
        device: &mut dyn GraphicsDevice,
        source: &R::Source,
    ) -> Result<&mut R> {
        let id = source.id();
        if source.is_disposed() {
            tracing::warn!(kind = source.kind(), %id, "disposed resource requested");
            self.release(device, id);
            return Err(CoreError::InvalidResourceState {
                kind: source.kind(),
                id,
            }
            .into());
        }

        let version = source.version();
        match self.entries.entry(id) {
            MapEntry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                if entry.version != version {
                    entry.resource.update(device, source)?;
                    entry.version = version;
                    self.updates += 1;
                    tracing::debug!(kind = source.kind(), %id, version, "GPU resource refreshed");
                }
                Ok(&mut entry.resource)
            }
            MapEntry::Vacant(vacant) => {
                let resource = R::create(device, source)?;
                self.creates += 1;
                tracing::debug!(kind = source.kind(), %id, version, "GPU resource created");
                Ok(&mut vacant.insert(PoolEntry { resource, version }).resource)
            }
        }
    }

    pub fn get(&self, id: ResourceId) -> Option<&R> {
        self.entries.get(&id).map(|entry| &entry.resource)
    }

    /// Version the GPU object for `id` was last synced to.
    pub fn synced_version(&self, id: ResourceId) -> Option<u64> {
        self.entries.get(&id).map(|entry| entry.version)
    }

    /// Releases the GPU object for `id`. Returns false if there was none.
    pub fn release(&mut self, device: &mut dyn GraphicsDevice, id: ResourceId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                entry.resource.release(device);
                tracing::debug!(%id, "GPU resource released");
                true
            }
            None => false,
        }
    }

    /// Releases every GPU object for which `keep` returns false. Returns how
    /// many were released.
    pub fn retain(
        &mut self,
        device: &mut dyn GraphicsDevice,
        mut keep: impl FnMut(ResourceId, &R) -> bool,
    ) -> usize {
        let stale: Vec<ResourceId> = self
            .entries
            .iter()
            .filter(|(id, entry)| !keep(**id, &entry.resource))
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            self.release(device, *id);
        }
        stale.len()
    }

    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) {
        for (_, entry) in self.entries.drain() {
            entry.resource.release(device);
        }
    }

    pub fn resources(&self) -> impl Iterator<Item = &R> {
        self.entries.values().map(|entry| &entry.resource)
    }

    pub(crate) fn resources_mut(&mut self) -> impl Iterator<Item = &mut R> {
        self.entries.values_mut().map(|entry| &mut entry.resource)
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of GPU objects created so far.
    pub fn creates(&self) -> u64 {
        self.creates
    }

    /// Number of in-place refreshes so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

impl<R: PoolResource> Default for Pool<R> {
    fn default() -> Self {
        Self::new()
    }
}
