use std::rc::Rc;

use crate::backend::Backend;
use crate::error::{GpuError, GpuResult};
use crate::resource::{BufferKind, GpuBuffer, ReleaseQueue};

/// Byte written over returned space in debug builds.
#[cfg(debug_assertions)]
const POISON: u8 = 0xDD;

/// Space handed out by [`BufferPool::make_space`].
///
/// `bytes` borrows the pool's staging memory; it must be filled before the
/// next pool call and becomes visible to the backend on [`BufferPool::unmap`].
pub struct PoolSpace<'a> {
    pub buffer: Rc<GpuBuffer>,
    /// Index of the first element inside `buffer`.
    pub start: usize,
    pub bytes: &'a mut [u8],
}

/// Backend buffer plus the CPU copy writes land in.
struct Backing {
    buffer: Rc<GpuBuffer>,
    staging: Vec<u8>,
}

/// A ring slot that currently hands out space.
struct Block {
    slot: usize,
    backing: Backing,
    used: usize,
    flushed: usize,
}

/// Undo record of one reservation.
struct Mark {
    bytes: usize,
    /// Cursor of the current block before the reservation aligned it, or
    /// `None` if the reservation opened a new block.
    prev_used: Option<usize>,
}

/// Bump allocator over a ring of fixed-size backend buffers.
///
/// Blocks in use always occupy consecutive ring slots starting at
/// `ring_start`. Space is returned LIFO with [`put_back`](Self::put_back);
/// [`reset`](Self::reset) rewinds everything and moves the ring start past the
/// buffers written since the previous reset, so the next batch of writes lands
/// in buffers the GPU is less likely to still be reading.
pub struct BufferPool {
    kind: BufferKind,
    block_size: usize,
    ring: Vec<Option<Backing>>,
    ring_start: usize,
    blocks: Vec<Block>,
    /// One entry per outstanding reservation, oldest first.
    marks: Vec<Mark>,
    /// Most blocks in use at once since the last reset.
    touched: usize,
    releases: ReleaseQueue,
}

impl BufferPool {
    pub fn new(kind: BufferKind, block_size: usize, block_count: usize, releases: ReleaseQueue) -> Self {
        assert!(block_size > 0 && block_count > 0, "buffer pool needs a non-empty ring");
        Self {
            kind,
            block_size,
            ring: (0..block_count).map(|_| None).collect(),
            ring_start: 0,
            blocks: Vec::new(),
            marks: Vec::new(),
            touched: 0,
            releases,
        }
    }

    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn blocks_in_use(&self) -> usize {
        self.blocks.len()
    }

    /// Reservations handed out and not yet put back.
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.marks.len()
    }

    /// Bytes handed out across all blocks, alignment padding included.
    pub fn bytes_in_use(&self) -> usize {
        self.blocks.iter().map(|b| b.used).sum()
    }

    /// Reserves `count` elements of `element_size` bytes.
    ///
    /// The start offset is aligned to `element_size` so that it can be
    /// expressed as an element index.
    pub fn make_space<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        element_size: usize,
        count: usize,
    ) -> GpuResult<PoolSpace<'_>> {
        assert!(element_size > 0, "make_space: element size must be positive");
        assert!(count > 0, "make_space: element count must be positive");

        let requested = element_size.saturating_mul(count);
        if requested > self.block_size {
            return Err(GpuError::ReservationTooLarge {
                requested,
                block_size: self.block_size,
            });
        }

        let fit = self.blocks.last().and_then(|block| {
            let offset = block.used.div_ceil(element_size) * element_size;
            (offset + requested <= self.block_size).then_some((offset, block.used))
        });

        let (offset, prev_used) = match fit {
            Some((offset, used)) => (offset, Some(used)),
            None => {
                self.unmap(backend);
                self.push_block(backend)?;
                (0, None)
            }
        };

        self.marks.push(Mark {
            bytes: requested,
            prev_used,
        });
        self.touched = self.touched.max(self.blocks.len());

        let last = self.blocks.len() - 1;
        let block = &mut self.blocks[last];
        block.used = offset + requested;

        Ok(PoolSpace {
            buffer: block.backing.buffer.clone(),
            start: offset / element_size,
            bytes: &mut block.backing.staging[offset..offset + requested],
        })
    }

    /// Ends the most recent reservation, which was `bytes` long.
    ///
    /// The alignment padding in front of it is reclaimed as well.
    pub fn put_back(&mut self, bytes: usize) {
        let Some(mark) = self.marks.pop() else {
            panic!("put_back without an outstanding reservation");
        };
        assert_eq!(
            bytes, mark.bytes,
            "put_back must return the most recent reservation"
        );
        let Some(block) = self.blocks.last_mut() else {
            unreachable!("outstanding reservation without a block");
        };

        let new_used = mark.prev_used.unwrap_or(0);
        #[cfg(debug_assertions)]
        block.backing.staging[new_used..block.used].fill(POISON);
        block.used = new_used;
        block.flushed = block.flushed.min(new_used);

        if block.used == 0 {
            if let Some(block) = self.blocks.pop() {
                self.ring[block.slot] = Some(block.backing);
            }
        }
    }

    /// Rewinds every block. Only valid with no outstanding reservations.
    pub fn reset(&mut self) {
        assert!(
            self.marks.is_empty(),
            "buffer pool reset with {} outstanding reservations",
            self.marks.len()
        );

        for block in self.blocks.drain(..) {
            self.ring[block.slot] = Some(block.backing);
        }
        self.ring_start = (self.ring_start + self.touched) % self.ring.len();
        self.touched = 0;
    }

    /// Makes writes into the current block visible to the backend.
    pub fn unmap<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        let Some(block) = self.blocks.last_mut() else { return };
        if block.flushed >= block.used {
            return;
        }

        let range = block.flushed..block.used;
        let id = block.backing.buffer.id();
        if !backend.update_buffer(id, range.start, &block.backing.staging[range.clone()]) {
            log::warn!("buffer pool: failed to upload {} bytes into {id}", range.len());
        }
        block.flushed = block.used;
    }

    fn push_block<B: Backend + ?Sized>(&mut self, backend: &mut B) -> GpuResult<()> {
        let count = self.ring.len();
        if self.blocks.len() == count {
            return Err(GpuError::PoolExhausted { blocks: count });
        }

        let slot = (self.ring_start + self.blocks.len()) % count;
        let backing = match self.ring[slot].take() {
            Some(backing) => backing,
            None => {
                let id = backend
                    .create_buffer(self.kind, self.block_size, true)
                    .ok_or(GpuError::CreationFailed("pool block"))?;
                log::debug!(
                    "buffer pool: created {:?} block {id} ({} bytes, slot {slot})",
                    self.kind,
                    self.block_size
                );
                Backing {
                    buffer: Rc::new(GpuBuffer::new(
                        self.releases.token(id),
                        self.kind,
                        self.block_size,
                        true,
                    )),
                    staging: vec![0; self.block_size],
                }
            }
        };

        self.blocks.push(Block {
            slot,
            backing,
            used: 0,
            flushed: 0,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MockBackend};

    fn pool(block_size: usize, block_count: usize) -> BufferPool {
        BufferPool::new(BufferKind::Vertex, block_size, block_count, ReleaseQueue::new())
    }

    // ── make_space ────────────────────────────────────────────────────────

    #[test]
    fn make_space_bumps_within_a_block() {
        let mut backend = MockBackend::new();
        let mut pool = pool(256, 2);

        let first = pool.make_space(&mut backend, 8, 4).unwrap();
        assert_eq!(first.start, 0);
        assert_eq!(first.bytes.len(), 32);
        let first_id = first.buffer.id();

        let second = pool.make_space(&mut backend, 8, 2).unwrap();
        assert_eq!(second.start, 4);
        assert_eq!(second.buffer.id(), first_id);
        assert_eq!(pool.outstanding(), 2);
        assert_eq!(pool.bytes_in_use(), 48);
    }

    #[test]
    fn make_space_aligns_start_to_element_size() {
        let mut backend = MockBackend::new();
        let mut pool = pool(256, 1);

        pool.make_space(&mut backend, 2, 3).unwrap(); // 6 bytes
        let space = pool.make_space(&mut backend, 4, 1).unwrap();
        assert_eq!(space.start, 2); // offset 8
        assert_eq!(pool.bytes_in_use(), 12);
    }

    #[test]
    fn make_space_rotates_to_next_block_and_flushes() {
        let mut backend = MockBackend::new();
        let mut pool = pool(64, 2);

        let a = pool.make_space(&mut backend, 16, 3).unwrap();
        a.bytes.fill(7);
        let a_id = a.buffer.id();
        let b = pool.make_space(&mut backend, 16, 2).unwrap();
        let b_id = b.buffer.id();

        assert_ne!(a_id, b_id);
        assert_eq!(b.start, 0);
        assert_eq!(pool.blocks_in_use(), 2);
        assert!(backend.calls.contains(&Call::UpdateBuffer { id: a_id, offset: 0, len: 48 }));
        assert_eq!(&backend.buffer_data(a_id)[..48], &[7u8; 48][..]);
    }

    #[test]
    fn make_space_too_large_fails() {
        let mut backend = MockBackend::new();
        let mut pool = pool(64, 4);
        let err = pool.make_space(&mut backend, 16, 5).err();
        assert_eq!(err, Some(GpuError::ReservationTooLarge { requested: 80, block_size: 64 }));
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn make_space_fails_when_ring_is_full() {
        let mut backend = MockBackend::new();
        let mut pool = pool(64, 2);
        pool.make_space(&mut backend, 64, 1).unwrap();
        pool.make_space(&mut backend, 64, 1).unwrap();
        let err = pool.make_space(&mut backend, 64, 1).err();
        assert_eq!(err, Some(GpuError::PoolExhausted { blocks: 2 }));
        assert_eq!(pool.outstanding(), 2);
    }

    #[test]
    fn make_space_reports_backend_creation_failure() {
        let mut backend = MockBackend::new();
        backend.fail_buffer_creation = true;
        let mut pool = pool(64, 2);
        assert_eq!(
            pool.make_space(&mut backend, 4, 4).err(),
            Some(GpuError::CreationFailed("pool block"))
        );
    }

    // ── put_back ──────────────────────────────────────────────────────────

    #[test]
    fn put_back_reclaims_space_lifo() {
        let mut backend = MockBackend::new();
        let mut pool = pool(2000, 1);

        let space = pool.make_space(&mut backend, 20, 100).unwrap();
        assert_eq!(space.bytes.len(), 2000);
        assert_eq!(pool.outstanding(), 1);

        pool.put_back(2000);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.bytes_in_use(), 0);

        let again = pool.make_space(&mut backend, 20, 100).unwrap();
        assert_eq!(again.start, 0);
    }

    #[test]
    fn put_back_reclaims_alignment_padding() {
        let mut backend = MockBackend::new();
        let mut pool = pool(256, 1);

        pool.make_space(&mut backend, 2, 3).unwrap(); // 6 bytes
        pool.make_space(&mut backend, 4, 1).unwrap(); // padded to offset 8
        assert_eq!(pool.bytes_in_use(), 12);

        pool.put_back(4);
        assert_eq!(pool.bytes_in_use(), 6);
        pool.put_back(6);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.bytes_in_use(), 0);
        assert_eq!(pool.blocks_in_use(), 0);
    }

    #[test]
    #[should_panic(expected = "most recent reservation")]
    fn put_back_of_an_older_reservation_panics() {
        let mut backend = MockBackend::new();
        let mut pool = pool(64, 1);
        pool.make_space(&mut backend, 4, 4).unwrap();
        pool.make_space(&mut backend, 4, 2).unwrap();
        pool.put_back(16);
    }

    #[test]
    fn put_back_spanning_blocks_releases_the_newest_first() {
        let mut backend = MockBackend::new();
        let mut pool = pool(64, 2);
        pool.make_space(&mut backend, 16, 3).unwrap();
        pool.make_space(&mut backend, 16, 2).unwrap();

        pool.put_back(32);
        assert_eq!(pool.blocks_in_use(), 1);
        assert_eq!(pool.bytes_in_use(), 48);
        pool.put_back(48);
        assert_eq!(pool.blocks_in_use(), 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn put_back_poisons_returned_bytes() {
        let mut backend = MockBackend::new();
        let mut pool = pool(64, 1);
        pool.make_space(&mut backend, 4, 2).unwrap().bytes.fill(1);
        pool.make_space(&mut backend, 4, 2).unwrap().bytes.fill(2);
        pool.put_back(8);
        // Re-reserving hands back the poisoned bytes untouched.
        let space = pool.make_space(&mut backend, 4, 2).unwrap();
        assert!(space.bytes.iter().all(|&b| b == POISON));
    }

    #[test]
    #[should_panic(expected = "put_back without an outstanding reservation")]
    fn put_back_without_reservation_panics() {
        pool(64, 1).put_back(4);
    }

    // ── reset ─────────────────────────────────────────────────────────────

    #[test]
    #[should_panic(expected = "outstanding reservations")]
    fn reset_with_outstanding_reservation_panics() {
        let mut backend = MockBackend::new();
        let mut pool = pool(64, 1);
        pool.make_space(&mut backend, 4, 1).unwrap();
        pool.reset();
    }

    #[test]
    fn reset_advances_ring_start_past_written_blocks() {
        let mut backend = MockBackend::new();
        let mut pool = pool(64, 2);

        let first = pool.make_space(&mut backend, 64, 1).unwrap().buffer.id();
        pool.put_back(64);
        assert_eq!(pool.blocks_in_use(), 0);
        pool.reset(); // slot 0 was written: rotate past it

        let second = pool.make_space(&mut backend, 32, 1).unwrap().buffer.id();
        assert_ne!(second, first);
        pool.put_back(32);
        pool.reset();
        pool.reset(); // nothing written since: ring start unchanged

        let third = pool.make_space(&mut backend, 64, 1).unwrap().buffer.id();
        assert_eq!(third, first);
        assert_eq!(backend.count(|c| matches!(c, Call::CreateBuffer { .. })), 2);
    }

    // ── unmap ─────────────────────────────────────────────────────────────

    #[test]
    fn unmap_uploads_only_unflushed_bytes() {
        let mut backend = MockBackend::new();
        let mut pool = pool(64, 1);
        let id = {
            let space = pool.make_space(&mut backend, 4, 2).unwrap();
            space.bytes.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
            space.buffer.id()
        };
        pool.unmap(&mut backend);
        pool.unmap(&mut backend);
        pool.make_space(&mut backend, 4, 1).unwrap().bytes.fill(9);
        pool.unmap(&mut backend);

        let uploads: Vec<_> = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::UpdateBuffer { .. }))
            .cloned()
            .collect();
        assert_eq!(
            uploads,
            vec![
                Call::UpdateBuffer { id, offset: 0, len: 8 },
                Call::UpdateBuffer { id, offset: 8, len: 4 },
            ]
        );
        assert_eq!(&backend.buffer_data(id)[..12], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 9, 9, 9]);
    }
}
