use std::rc::Rc;

use super::Gpu;
use crate::backend::Backend;
use crate::error::GpuResult;
use crate::geometry::{
    BufferPool, GeometryLevel, IndexSource, PoolSlot, SourceKind, VertexSource,
};
use crate::resource::{BufferKind, GpuBuffer, ReleaseQueue};

impl<B: Backend> Gpu<B> {
    // ── stack ─────────────────────────────────────────────────────────────

    /// Opens a nested geometry scope whose sources start out empty.
    ///
    /// Reserved data of the current scope is flushed first so that it stays
    /// valid while the nested scope writes into the pools.
    pub fn push_geometry_source(&mut self) {
        self.finalize_reserved_geometry();
        self.geometry.push();
    }

    /// Closes the current scope, releasing its sources.
    ///
    /// Panics at the base level.
    pub fn pop_geometry_source(&mut self) {
        let level = self.geometry.pop();
        self.release_level(level);
    }

    /// Pops every nested scope and empties the base level.
    pub fn release_geometry(&mut self) {
        while self.geometry.depth() > 1 {
            self.pop_geometry_source();
        }
        self.reset_vertex_source();
        self.reset_index_source();
    }

    // ── buffer-backed sources ─────────────────────────────────────────────

    /// Reads vertices from `buffer`, using the current draw state's stride.
    pub fn set_vertex_source_to_buffer(&mut self, buffer: &Rc<GpuBuffer>) {
        assert_eq!(buffer.kind(), BufferKind::Vertex, "vertex source must be a vertex buffer");
        self.reset_vertex_source();
        self.geometry.top_mut().vertex = VertexSource::Buffer {
            buffer: buffer.clone(),
            stride: self.draw_state.vertex_stride,
        };
    }

    pub fn set_index_source_to_buffer(&mut self, buffer: &Rc<GpuBuffer>) {
        assert_eq!(buffer.kind(), BufferKind::Index, "index source must be an index buffer");
        self.reset_index_source();
        self.geometry.top_mut().index = IndexSource::Buffer(buffer.clone());
    }

    pub fn reset_vertex_source(&mut self) {
        let previous = std::mem::take(&mut self.geometry.top_mut().vertex);
        self.release_vertex(previous);
    }

    pub fn reset_index_source(&mut self) {
        let previous = std::mem::take(&mut self.geometry.top_mut().index);
        self.release_index(previous);
    }

    // ── pool reservations ─────────────────────────────────────────────────

    /// Reserves pool space for `count` vertices of `stride` bytes and makes
    /// it the current vertex source.
    ///
    /// The returned bytes must be written before the next geometry call. On
    /// failure the vertex source is left empty.
    pub fn reserve_vertex_space(&mut self, stride: usize, count: usize) -> GpuResult<&mut [u8]> {
        assert!(count > 0, "reserve_vertex_space: vertex count must be positive");
        assert!(stride > 0, "reserve_vertex_space: stride must be positive");

        self.handle_dirty_context();
        self.reset_vertex_source();

        let pool = prepare_pool(
            &mut self.vertex_pool,
            BufferKind::Vertex,
            self.options.vertex_pool_block_size,
            self.options.vertex_pool_block_count,
            &self.releases,
        );
        let space = pool.make_space(&mut self.backend, stride, count).inspect_err(|err| {
            log::debug!("vertex reservation of {count}x{stride} failed: {err}");
        })?;

        self.geometry.top_mut().vertex = VertexSource::Reserved {
            count,
            stride,
            slot: PoolSlot {
                buffer: space.buffer,
                start: space.start,
            },
        };
        Ok(space.bytes)
    }

    /// Reserves pool space for `count` 16-bit indices and makes it the
    /// current index source.
    pub fn reserve_index_space(&mut self, count: usize) -> GpuResult<&mut [u8]> {
        assert!(count > 0, "reserve_index_space: index count must be positive");

        self.handle_dirty_context();
        self.reset_index_source();

        let pool = prepare_pool(
            &mut self.index_pool,
            BufferKind::Index,
            self.options.index_pool_block_size,
            self.options.index_pool_block_count,
            &self.releases,
        );
        let space = pool
            .make_space(&mut self.backend, IndexSource::INDEX_SIZE, count)
            .inspect_err(|err| log::debug!("index reservation of {count} failed: {err}"))?;

        self.geometry.top_mut().index = IndexSource::Reserved {
            count,
            slot: PoolSlot {
                buffer: space.buffer,
                start: space.start,
            },
        };
        Ok(space.bytes)
    }

    // ── queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn geometry_depth(&self) -> usize {
        self.geometry.depth()
    }

    /// Sources of the current scope.
    #[inline]
    pub fn geometry_source(&self) -> &GeometryLevel {
        self.geometry.top()
    }

    #[inline]
    pub fn vertex_source_kind(&self) -> SourceKind {
        self.geometry.top().vertex.kind()
    }

    #[inline]
    pub fn index_source_kind(&self) -> SourceKind {
        self.geometry.top().index.kind()
    }

    /// Outstanding vertex pool reservations across all scopes.
    pub fn vertex_pool_use_count(&self) -> usize {
        self.vertex_pool.as_ref().map_or(0, BufferPool::outstanding)
    }

    /// Outstanding index pool reservations across all scopes.
    pub fn index_pool_use_count(&self) -> usize {
        self.index_pool.as_ref().map_or(0, BufferPool::outstanding)
    }

    pub fn vertex_pool(&self) -> Option<&BufferPool> {
        self.vertex_pool.as_ref()
    }

    pub fn index_pool(&self) -> Option<&BufferPool> {
        self.index_pool.as_ref()
    }

    // ── internals ─────────────────────────────────────────────────────────

    /// Makes data written into reserved space of the current scope visible
    /// to the backend.
    pub(super) fn finalize_reserved_geometry(&mut self) {
        let top = self.geometry.top();
        let vertex_reserved = top.vertex.kind() == SourceKind::Reserved;
        let index_reserved = top.index.kind() == SourceKind::Reserved;
        if !vertex_reserved && !index_reserved {
            return;
        }

        self.handle_dirty_context();
        if vertex_reserved {
            if let Some(pool) = self.vertex_pool.as_mut() {
                pool.unmap(&mut self.backend);
            }
        }
        if index_reserved {
            if let Some(pool) = self.index_pool.as_mut() {
                pool.unmap(&mut self.backend);
            }
        }
    }

    fn release_level(&mut self, level: GeometryLevel) {
        self.release_vertex(level.vertex);
        self.release_index(level.index);
    }

    fn release_vertex(&mut self, source: VertexSource) {
        if let VertexSource::Reserved { .. } = source {
            match self.vertex_pool.as_mut() {
                Some(pool) => pool.put_back(source.reserved_bytes()),
                None => unreachable!("reserved vertex source without a vertex pool"),
            }
        }
        // Buffer sources drop their reference here.
    }

    fn release_index(&mut self, source: IndexSource) {
        if let IndexSource::Reserved { .. } = source {
            match self.index_pool.as_mut() {
                Some(pool) => pool.put_back(source.reserved_bytes()),
                None => unreachable!("reserved index source without an index pool"),
            }
        }
    }
}

/// Creates the pool on first use, or rewinds it when nothing is outstanding.
fn prepare_pool<'a>(
    pool: &'a mut Option<BufferPool>,
    kind: BufferKind,
    block_size: usize,
    block_count: usize,
    releases: &ReleaseQueue,
) -> &'a mut BufferPool {
    let pool = pool.get_or_insert_with(|| {
        log::debug!("creating {kind:?} pool: {block_count} blocks of {block_size} bytes");
        BufferPool::new(kind, block_size, block_count, releases.clone())
    });
    if pool.outstanding() == 0 {
        pool.reset();
    }
    pool
}
