use super::handle::ReleaseToken;
use super::ResourceId;

/// What a buffer is bound as.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    /// 16-bit indices.
    Index,
}

/// Shared handle to a backend vertex or index buffer.
///
/// Geometry sources hold an `Rc<GpuBuffer>` for as long as the buffer is the
/// active source; the backend object is released once the last handle drops.
#[derive(Debug)]
pub struct GpuBuffer {
    token: ReleaseToken,
    kind: BufferKind,
    size: usize,
    dynamic: bool,
}

impl GpuBuffer {
    pub(crate) fn new(token: ReleaseToken, kind: BufferKind, size: usize, dynamic: bool) -> Self {
        Self {
            token,
            kind,
            size,
            dynamic,
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.token.id()
    }

    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}
