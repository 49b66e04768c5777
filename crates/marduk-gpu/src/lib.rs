//! Marduk GPU crate.
//!
//! A backend-agnostic GPU layer: `Gpu` validates requests, keeps the shared
//! bookkeeping (geometry sources, pooled vertex/index space, shared stencil
//! buffers, trace markers), and forwards the hardware work to a `Backend`.
//! The `wgpu-backend` feature provides a headless wgpu implementation.

pub mod logging;
pub mod coords;
pub mod error;
pub mod resource;
pub mod draw;
pub mod backend;
pub mod trace;
pub mod geometry;
pub mod gpu;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;

#[cfg(test)]
mod testing;

pub use backend::Backend;
pub use error::{GpuError, GpuResult};
pub use gpu::{Gpu, GpuOptions};

#[cfg(feature = "wgpu-backend")]
pub use wgpu_backend::{WgpuBackend, WgpuInit};
