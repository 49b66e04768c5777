use std::rc::Rc;

use crate::coords::IRect;
use crate::resource::{GpuBuffer, Texture};

/// Topology of a draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Triangles,
    TriangleStrip,
    TriangleFan,
    Points,
    Lines,
    LineStrip,
}

/// Coarse draw classification used when flushing state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DrawType {
    Points,
    Lines,
    Triangles,
    StencilPath,
    DrawPath,
    DrawPaths,
}

impl DrawType {
    #[inline]
    pub fn is_path(self) -> bool {
        matches!(self, DrawType::StencilPath | DrawType::DrawPath | DrawType::DrawPaths)
    }
}

/// Per-path transform layout of a `draw_paths` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PathTransformType {
    None,
    TranslateX,
    TranslateY,
    Translate,
    /// Row-major 2x3 matrix.
    Affine,
}

impl PathTransformType {
    /// Floats consumed per drawn path.
    #[inline]
    pub const fn components(self) -> usize {
        match self {
            PathTransformType::None => 0,
            PathTransformType::TranslateX | PathTransformType::TranslateY => 1,
            PathTransformType::Translate => 2,
            PathTransformType::Affine => 6,
        }
    }
}

impl From<PrimitiveType> for DrawType {
    fn from(primitive: PrimitiveType) -> Self {
        match primitive {
            PrimitiveType::Points => DrawType::Points,
            PrimitiveType::Lines | PrimitiveType::LineStrip => DrawType::Lines,
            PrimitiveType::Triangles | PrimitiveType::TriangleStrip | PrimitiveType::TriangleFan => {
                DrawType::Triangles
            }
        }
    }
}

/// Scissor configuration for a draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ScissorState {
    pub enabled: bool,
    pub rect: IRect,
}

impl ScissorState {
    #[inline]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            rect: IRect::new(0, 0, 0, 0),
        }
    }

    #[inline]
    pub const fn enabled(rect: IRect) -> Self {
        Self { enabled: true, rect }
    }
}

/// One draw call, relative to the active geometry source.
#[derive(Debug, Clone)]
pub struct DrawInfo {
    pub primitive: PrimitiveType,
    pub start_vertex: usize,
    pub start_index: usize,
    pub vertex_count: usize,
    pub index_count: usize,
    /// Copy of the destination, for blends that read it.
    pub dst_copy: Option<Rc<Texture>>,
}

impl DrawInfo {
    pub fn non_indexed(primitive: PrimitiveType, start_vertex: usize, vertex_count: usize) -> Self {
        Self {
            primitive,
            start_vertex,
            start_index: 0,
            vertex_count,
            index_count: 0,
            dst_copy: None,
        }
    }

    pub fn indexed(
        primitive: PrimitiveType,
        start_vertex: usize,
        start_index: usize,
        vertex_count: usize,
        index_count: usize,
    ) -> Self {
        Self {
            primitive,
            start_vertex,
            start_index,
            vertex_count,
            index_count,
            dst_copy: None,
        }
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.index_count > 0
    }

    #[inline]
    pub fn draw_type(&self) -> DrawType {
        self.primitive.into()
    }
}

/// Vertex data the backend should read from.
#[derive(Debug, Clone)]
pub struct VertexBinding {
    pub buffer: Rc<GpuBuffer>,
    /// First vertex of the source inside `buffer` (non-zero for pool space).
    pub base_vertex: usize,
    pub stride: usize,
}

/// Index data the backend should read from.
#[derive(Debug, Clone)]
pub struct IndexBinding {
    pub buffer: Rc<GpuBuffer>,
    /// First index of the source inside `buffer` (non-zero for pool space).
    pub base_index: usize,
}

/// Geometry source resolved for a single draw.
#[derive(Debug, Clone)]
pub struct BoundGeometry {
    pub vertex: VertexBinding,
    pub index: Option<IndexBinding>,
}
