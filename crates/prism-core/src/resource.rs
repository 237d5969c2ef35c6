//! Versioned resource identity and the version-gated cache.
//!
//! Every CPU-side asset embeds a [`ResourceState`]: a stable identity, a
//! version that strictly increases on each mutation, and a one-way disposed
//! flag. Derived values (transforms, GPU objects) remember the version they
//! were computed from and are refreshed only when it falls behind.

use std::fmt;

use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Stable identity of a versioned resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Uuid);

impl ResourceId {
    /// Allocates a fresh, globally unique identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity, version counter and disposed flag shared by all assets.
#[derive(Debug)]
pub struct ResourceState {
    id: ResourceId,
    kind: &'static str,
    version: u64,
    disposed: bool,
}

impl ResourceState {
    /// Creates live state at version 0.
    pub fn new(kind: &'static str) -> Self {
        Self {
            id: ResourceId::new(),
            kind,
            version: 0,
            disposed: false,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Fails with [`CoreError::InvalidResourceState`] once disposed.
    pub fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(CoreError::InvalidResourceState {
                kind: self.kind,
                id: self.id,
            });
        }
        Ok(())
    }

    /// Bumps the version. Disposed resources reject further mutation.
    pub fn mark_dirty(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.version += 1;
        Ok(())
    }

    /// Marks the resource disposed.
    ///
    /// Returns `true` only for the call that performed the transition; later
    /// calls are no-ops.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.version += 1;
        true
    }
}

/// Access to the [`ResourceState`] embedded in an asset.
pub trait Versioned {
    fn state(&self) -> &ResourceState;

    fn id(&self) -> ResourceId {
        self.state().id()
    }

    fn version(&self) -> u64 {
        self.state().version()
    }

    fn is_disposed(&self) -> bool {
        self.state().is_disposed()
    }

    fn kind(&self) -> &'static str {
        self.state().kind()
    }
}

/// A derived value valid for exactly one source version.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    value: T,
    version: Option<u64>,
    refreshes: u64,
}

impl<T> Cached<T> {
    /// Creates an invalid cache holding a placeholder value.
    pub fn new(placeholder: T) -> Self {
        Self {
            value: placeholder,
            version: None,
            refreshes: 0,
        }
    }

    /// Returns true if the cached value was computed at `version`.
    pub fn is_valid(&self, version: u64) -> bool {
        self.version == Some(version)
    }

    /// Returns the cached value, recomputing it first if it is stale.
    pub fn get_or_refresh(&mut self, version: u64, compute: impl FnOnce() -> T) -> &T {
        if !self.is_valid(version) {
            self.value = compute();
            self.version = Some(version);
            self.refreshes += 1;
        }
        &self.value
    }

    /// Fallible variant of [`Cached::get_or_refresh`].
    ///
    /// A failed computation leaves the cache invalid.
    pub fn try_get_or_refresh<E>(
        &mut self,
        version: u64,
        compute: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<&T, E> {
        if !self.is_valid(version) {
            self.version = None;
            self.value = compute()?;
            self.version = Some(version);
            self.refreshes += 1;
        }
        Ok(&self.value)
    }

    /// Forces the next access to recompute.
    pub fn invalidate(&mut self) {
        self.version = None;
    }

    /// Number of times the value has been recomputed.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_strictly_increases() {
        let mut state = ResourceState::new("texture");
        assert_eq!(state.version(), 0);
        state.mark_dirty().unwrap();
        state.mark_dirty().unwrap();
        assert_eq!(state.version(), 2);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut state = ResourceState::new("texture");
        assert!(state.dispose());
        let version = state.version();
        assert!(!state.dispose());
        assert_eq!(state.version(), version);
        assert!(state.is_disposed());
    }

    #[test]
    fn test_disposed_rejects_mutation() {
        let mut state = ResourceState::new("geometry");
        state.dispose();
        let version = state.version();
        assert!(matches!(
            state.mark_dirty(),
            Err(CoreError::InvalidResourceState { kind: "geometry", .. })
        ));
        assert_eq!(state.version(), version);
    }

    #[test]
    fn test_cached_refreshes_only_on_version_change() {
        let mut cache = Cached::new(0u32);
        assert_eq!(*cache.get_or_refresh(0, || 7), 7);
        assert_eq!(*cache.get_or_refresh(0, || 9), 7);
        assert_eq!(cache.refreshes(), 1);
        assert_eq!(*cache.get_or_refresh(1, || 9), 9);
        assert_eq!(cache.refreshes(), 2);
    }

    #[test]
    fn test_cached_failure_stays_invalid() {
        let mut cache = Cached::new(0u32);
        let result: std::result::Result<&u32, &str> = cache.try_get_or_refresh(3, || Err("nope"));
        assert!(result.is_err());
        assert!(!cache.is_valid(3));
        assert_eq!(cache.refreshes(), 0);
    }
}
