//! Integer device-space rectangles and premultiplied colors.
//!
//! Canonical device space:
//! - Physical pixels
//! - Origin top-left
//! - +X right, +Y down

mod color;
mod irect;

pub use color::Color;
pub use irect::IRect;
