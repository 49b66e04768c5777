use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::handle::ReleaseToken;
use super::ResourceId;

/// Cache key for shareable stencil buffers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StencilKey {
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
}

/// Auxiliary per-pixel buffer used for clipping.
#[derive(Debug)]
pub struct StencilBuffer {
    token: ReleaseToken,
    key: StencilKey,
}

impl StencilBuffer {
    pub(crate) fn new(token: ReleaseToken, key: StencilKey) -> Self {
        Self { token, key }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.token.id()
    }

    #[inline]
    pub fn key(&self) -> StencilKey {
        self.key
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.key.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.key.height
    }

    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.key.sample_count
    }
}

/// Finds stencil buffers that are still referenced by some render target.
///
/// Entries are weak: the cache never keeps a stencil buffer alive on its own.
#[derive(Debug, Default)]
pub struct StencilCache {
    entries: HashMap<StencilKey, Weak<StencilBuffer>>,
}

impl StencilCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&mut self, key: StencilKey) -> Option<Rc<StencilBuffer>> {
        let found = self.entries.get(&key).and_then(Weak::upgrade);
        if found.is_none() {
            self.entries.remove(&key);
        }
        found
    }

    pub fn insert(&mut self, stencil: &Rc<StencilBuffer>) {
        self.entries.insert(stencil.key(), Rc::downgrade(stencil));
    }

    /// Number of cached buffers that are still alive.
    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|w| w.strong_count() > 0).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
