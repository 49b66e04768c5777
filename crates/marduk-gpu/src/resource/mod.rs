//! GPU resource handles.
//!
//! Handles are shared through `Rc` and carry only what the core needs to
//! reason about them (id, size, format). The backend owns the real objects
//! and is told to release them through the `ReleaseQueue` once the last
//! handle is gone.

mod buffer;
mod config;
mod desc;
mod handle;
mod path;
mod stencil;
mod texture;

pub use buffer::{BufferKind, GpuBuffer};
pub use config::PixelConfig;
pub use desc::{BackendRenderTargetDesc, BackendTextureDesc, SurfaceDesc, SurfaceFlags, SurfaceOrigin};
pub use handle::{ReleaseQueue, ResourceId};
pub use path::{Path, PathDesc, PathFill, PathRange};
pub use stencil::{StencilBuffer, StencilCache, StencilKey};
pub use texture::{RenderTarget, Texture};
