use super::handle::ReleaseToken;
use super::ResourceId;

/// Which side of a path's winding counts as inside.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum PathFill {
    #[default]
    Winding,
    EvenOdd,
}

/// Polygonal outline handed to the backend's path renderer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathDesc {
    /// Closed contours in device space.
    pub contours: Vec<Vec<[f32; 2]>>,
    pub fill: PathFill,
}

impl PathDesc {
    pub fn new(fill: PathFill) -> Self {
        Self { contours: Vec::new(), fill }
    }

    pub fn with_contour(mut self, points: impl IntoIterator<Item = [f32; 2]>) -> Self {
        self.contours.push(points.into_iter().collect());
        self
    }
}

/// Shared handle to a backend path object.
#[derive(Debug)]
pub struct Path {
    token: ReleaseToken,
    fill: PathFill,
}

impl Path {
    pub(crate) fn new(token: ReleaseToken, fill: PathFill) -> Self {
        Self { token, fill }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.token.id()
    }

    #[inline]
    pub fn fill(&self) -> PathFill {
        self.fill
    }
}

/// Shared handle to a backend batch of paths drawn by index.
#[derive(Debug)]
pub struct PathRange {
    token: ReleaseToken,
    len: usize,
}

impl PathRange {
    pub(crate) fn new(token: ReleaseToken, len: usize) -> Self {
        Self { token, len }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.token.id()
    }

    /// Number of paths in the range.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
