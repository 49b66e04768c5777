//! Draw descriptions handed from the facade to the backend.

mod info;
mod state;

pub use info::{
    BoundGeometry, DrawInfo, DrawType, IndexBinding, PathTransformType, PrimitiveType, ScissorState,
    VertexBinding,
};
pub use state::DrawState;
