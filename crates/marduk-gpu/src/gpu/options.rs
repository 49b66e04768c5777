/// Configuration of the transient geometry pools.
///
/// Each pool is a ring of `*_block_count` backend buffers of
/// `*_block_size` bytes. A single reservation must fit into one block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GpuOptions {
    /// Bytes per vertex pool block.
    pub vertex_pool_block_size: usize,

    /// Number of vertex pool blocks in the ring.
    pub vertex_pool_block_count: usize,

    /// Bytes per index pool block.
    pub index_pool_block_size: usize,

    /// Number of index pool blocks in the ring.
    pub index_pool_block_count: usize,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            vertex_pool_block_size: 1 << 18,
            vertex_pool_block_count: 4,
            index_pool_block_size: 1 << 16,
            index_pool_block_count: 4,
        }
    }
}
