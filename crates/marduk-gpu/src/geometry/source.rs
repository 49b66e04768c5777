use std::rc::Rc;

use crate::resource::GpuBuffer;

/// What kind of data a vertex or index source currently points at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SourceKind {
    None,
    /// Transient space handed out by a buffer pool.
    Reserved,
    /// A caller-owned buffer.
    Buffer,
}

/// Where a pool reservation landed.
#[derive(Debug, Clone)]
pub struct PoolSlot {
    pub buffer: Rc<GpuBuffer>,
    /// First element of the reservation inside `buffer`.
    pub start: usize,
}

#[derive(Debug, Clone, Default)]
pub enum VertexSource {
    #[default]
    None,
    Reserved {
        count: usize,
        stride: usize,
        slot: PoolSlot,
    },
    Buffer {
        buffer: Rc<GpuBuffer>,
        stride: usize,
    },
}

impl VertexSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            VertexSource::None => SourceKind::None,
            VertexSource::Reserved { .. } => SourceKind::Reserved,
            VertexSource::Buffer { .. } => SourceKind::Buffer,
        }
    }

    /// Bytes held in the vertex pool by this source.
    pub fn reserved_bytes(&self) -> usize {
        match self {
            VertexSource::Reserved { count, stride, .. } => count * stride,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum IndexSource {
    #[default]
    None,
    Reserved {
        count: usize,
        slot: PoolSlot,
    },
    Buffer(Rc<GpuBuffer>),
}

impl IndexSource {
    /// Indices are 16-bit.
    pub const INDEX_SIZE: usize = std::mem::size_of::<u16>();

    pub fn kind(&self) -> SourceKind {
        match self {
            IndexSource::None => SourceKind::None,
            IndexSource::Reserved { .. } => SourceKind::Reserved,
            IndexSource::Buffer(_) => SourceKind::Buffer,
        }
    }

    /// Bytes held in the index pool by this source.
    pub fn reserved_bytes(&self) -> usize {
        match self {
            IndexSource::Reserved { count, .. } => count * Self::INDEX_SIZE,
            _ => 0,
        }
    }
}

/// Vertex and index source of one nesting level.
///
/// Pool bookkeeping lives inside the `Reserved` variants, so a level can
/// only claim pool space it actually holds.
#[derive(Debug, Clone, Default)]
pub struct GeometryLevel {
    pub vertex: VertexSource,
    pub index: IndexSource,
}

/// Nested geometry sources. Never shallower than one level.
#[derive(Debug)]
pub struct GeometryStack {
    levels: Vec<GeometryLevel>,
}

impl Default for GeometryStack {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryStack {
    pub fn new() -> Self {
        Self {
            levels: vec![GeometryLevel::default()],
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn top(&self) -> &GeometryLevel {
        let last = self.levels.len() - 1;
        &self.levels[last]
    }

    pub fn top_mut(&mut self) -> &mut GeometryLevel {
        let last = self.levels.len() - 1;
        &mut self.levels[last]
    }

    pub fn push(&mut self) {
        self.levels.push(GeometryLevel::default());
    }

    /// Removes the top level and hands it back so its sources can be released.
    pub fn pop(&mut self) -> GeometryLevel {
        assert!(self.levels.len() > 1, "cannot pop the base geometry source");
        let last = self.levels.len() - 1;
        self.levels.remove(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{BufferKind, ReleaseQueue, ResourceId};

    fn buffer(queue: &ReleaseQueue, id: u64) -> Rc<GpuBuffer> {
        Rc::new(GpuBuffer::new(queue.token(ResourceId(id)), BufferKind::Vertex, 64, false))
    }

    #[test]
    fn new_stack_has_one_empty_level() {
        let stack = GeometryStack::new();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top().vertex.kind(), SourceKind::None);
        assert_eq!(stack.top().index.kind(), SourceKind::None);
    }

    #[test]
    fn push_starts_from_none() {
        let queue = ReleaseQueue::new();
        let mut stack = GeometryStack::new();
        stack.top_mut().vertex = VertexSource::Buffer { buffer: buffer(&queue, 1), stride: 8 };
        stack.push();
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.top().vertex.kind(), SourceKind::None);

        let popped = stack.pop();
        assert_eq!(popped.vertex.kind(), SourceKind::None);
        assert_eq!(stack.top().vertex.kind(), SourceKind::Buffer);
    }

    #[test]
    #[should_panic(expected = "cannot pop the base geometry source")]
    fn pop_at_base_panics() {
        GeometryStack::new().pop();
    }

    #[test]
    fn reserved_bytes_follow_element_sizes() {
        let queue = ReleaseQueue::new();
        let slot = PoolSlot { buffer: buffer(&queue, 2), start: 0 };
        let vertex = VertexSource::Reserved { count: 100, stride: 20, slot: slot.clone() };
        let index = IndexSource::Reserved { count: 6, slot };
        assert_eq!(vertex.reserved_bytes(), 2000);
        assert_eq!(index.reserved_bytes(), 12);
        assert_eq!(IndexSource::None.reserved_bytes(), 0);
    }
}
