use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Opaque backend identity of a GPU object.
///
/// Ids are allocated by the backend and are unique across resource kinds for
/// the lifetime of that backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ids of resources whose last handle was dropped.
///
/// Handles cannot reach the backend from `Drop`, so they park their id here;
/// `Gpu` drains the queue into `Backend::release_resource` before its next
/// backend call.
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue {
    pending: Rc<RefCell<Vec<ResourceId>>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    pub(crate) fn push(&self, id: ResourceId) {
        self.pending.borrow_mut().push(id);
    }

    /// Takes every pending id, oldest first.
    pub(crate) fn drain(&self) -> Vec<ResourceId> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    pub(crate) fn token(&self, id: ResourceId) -> ReleaseToken {
        ReleaseToken {
            id,
            queue: self.clone(),
        }
    }
}

/// Enqueues its id on the owning queue when dropped.
pub(crate) struct ReleaseToken {
    id: ResourceId,
    queue: ReleaseQueue,
}

impl ReleaseToken {
    #[inline]
    pub(crate) fn id(&self) -> ResourceId {
        self.id
    }
}

impl fmt::Debug for ReleaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReleaseToken").field(&self.id).finish()
    }
}

impl Drop for ReleaseToken {
    fn drop(&mut self) {
        self.queue.push(self.id);
    }
}
