//! Geometry sources and the transient buffer pools behind them.
//!
//! `GeometryStack` records, per nesting level, where the next draw reads its
//! vertices and indices from. `BufferPool` hands out the space for
//! `Reserved` sources.

mod pool;
mod source;

pub use pool::{BufferPool, PoolSpace};
pub use source::{GeometryLevel, GeometryStack, IndexSource, PoolSlot, SourceKind, VertexSource};
