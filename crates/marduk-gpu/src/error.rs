use thiserror::Error;

use crate::resource::PixelConfig;

/// Recoverable failures reported by the GPU layer.
///
/// Contract violations (unbalanced geometry pops, zero-sized reservations,
/// double stencil attachment, ...) are programming errors and panic instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("pixel config {0:?} is not texturable on this backend")]
    ConfigNotTexturable(PixelConfig),

    #[error("pixel config {config:?} is not renderable (multisampled: {multisampled})")]
    ConfigNotRenderable {
        config: PixelConfig,
        multisampled: bool,
    },

    #[error("compressed texture of {width}x{height} needs non-power-of-two tiling support")]
    NonPowerOfTwoUnsupported { width: u32, height: u32 },

    #[error("backend has no path rendering support")]
    PathRenderingUnsupported,

    #[error("backend failed to create {0}")]
    CreationFailed(&'static str),

    #[error("reservation of {requested} bytes exceeds the {block_size}-byte pool block")]
    ReservationTooLarge { requested: usize, block_size: usize },

    #[error("buffer pool exhausted: all {blocks} blocks are in use")]
    PoolExhausted { blocks: usize },

    #[error("failed to upload data into buffer")]
    BufferUpdateFailed,

    #[error("stencil buffer could not be attached to the render target")]
    StencilAttachFailed,

    #[error("backend failed to read pixels")]
    ReadPixelsFailed,

    #[error("backend failed to write texture pixels")]
    WritePixelsFailed,
}

pub type GpuResult<T> = Result<T, GpuError>;
