use std::rc::Rc;

use super::Gpu;
use crate::backend::Backend;
use crate::draw::{DrawType, PathTransformType, ScissorState};
use crate::error::{GpuError, GpuResult};
use crate::resource::{Path, PathDesc, PathRange, Texture};

impl<B: Backend> Gpu<B> {
    // ── creation ──────────────────────────────────────────────────────────

    pub fn create_path(&mut self, desc: &PathDesc) -> GpuResult<Rc<Path>> {
        self.require_path_rendering()?;
        self.handle_dirty_context();
        let id = self
            .backend
            .create_path(desc)
            .ok_or(GpuError::CreationFailed("path"))?;
        Ok(Rc::new(Path::new(self.releases.token(id), desc.fill)))
    }

    /// Creates one backend object holding every path in `paths`, drawn later
    /// by index through [`Gpu::draw_paths`].
    pub fn create_path_range(&mut self, paths: &[PathDesc]) -> GpuResult<Rc<PathRange>> {
        assert!(!paths.is_empty(), "path range needs at least one path");
        self.require_path_rendering()?;
        self.handle_dirty_context();
        let id = self
            .backend
            .create_path_range(paths)
            .ok_or(GpuError::CreationFailed("path range"))?;
        Ok(Rc::new(PathRange::new(self.releases.token(id), paths.len())))
    }

    fn require_path_rendering(&self) -> GpuResult<()> {
        if self.backend.caps().path_rendering_support {
            Ok(())
        } else {
            Err(GpuError::PathRenderingUnsupported)
        }
    }

    // ── draws ─────────────────────────────────────────────────────────────

    /// Writes `path` into the stencil buffer of the current render target.
    ///
    /// Nothing happens if the backend cannot flush the state.
    pub fn stencil_path(&mut self, path: &Path, scissor: &ScissorState) {
        if !self.flush_path_state(DrawType::StencilPath, scissor, None) {
            return;
        }
        log::trace!("stencil path {}", path.id());
        self.backend.stencil_path(path);
    }

    /// Fills `path` with the current draw state.
    pub fn draw_path(&mut self, path: &Path, scissor: &ScissorState, dst_copy: Option<&Texture>) {
        if !self.flush_path_state(DrawType::DrawPath, scissor, dst_copy) {
            return;
        }
        log::trace!("draw path {}", path.id());
        self.backend.draw_path(path);
    }

    /// Fills the paths of `range` selected by `indices`, each placed by its
    /// slice of `transforms`.
    ///
    /// Panics if an index is out of the range or `transforms` does not hold
    /// exactly one transform per index.
    pub fn draw_paths(
        &mut self,
        range: &PathRange,
        indices: &[u32],
        transforms: &[f32],
        transform_type: PathTransformType,
        scissor: &ScissorState,
        dst_copy: Option<&Texture>,
    ) {
        assert!(!indices.is_empty(), "draw_paths without indices");
        assert!(
            indices.iter().all(|&i| (i as usize) < range.len()),
            "path index out of a range of {}",
            range.len()
        );
        assert_eq!(
            transforms.len(),
            indices.len() * transform_type.components(),
            "{transform_type:?} transforms do not match {} indices",
            indices.len()
        );

        if !self.flush_path_state(DrawType::DrawPaths, scissor, dst_copy) {
            return;
        }
        log::trace!("draw {} paths from range {}", indices.len(), range.id());
        self.backend.draw_paths(range, indices, transforms, transform_type);
    }

    fn flush_path_state(
        &mut self,
        draw_type: DrawType,
        scissor: &ScissorState,
        dst_copy: Option<&Texture>,
    ) -> bool {
        self.handle_dirty_context();
        let state = self.draw_state.clone();
        let flushed = self.backend.flush_state(draw_type, &state, scissor, dst_copy);
        if !flushed {
            log::trace!("skipping {draw_type:?}: state flush failed");
        }
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::IRect;
    use crate::resource::{PathFill, PixelConfig, SurfaceDesc};
    use crate::testing::{mock_gpu, mock_gpu_with, Call, MockBackend};

    fn path_gpu() -> Gpu<MockBackend> {
        let mut backend = MockBackend::new();
        backend.caps.path_rendering_support = true;
        mock_gpu_with(backend)
    }

    fn triangle() -> PathDesc {
        PathDesc::new(PathFill::EvenOdd).with_contour([[0.0, 0.0], [8.0, 0.0], [0.0, 8.0]])
    }

    #[test]
    fn paths_need_backend_support() {
        let mut gpu = mock_gpu();
        assert_eq!(gpu.create_path(&triangle()).unwrap_err(), GpuError::PathRenderingUnsupported);
        assert_eq!(
            gpu.create_path_range(&[triangle()]).unwrap_err(),
            GpuError::PathRenderingUnsupported
        );
        assert!(gpu.backend().calls.is_empty());
    }

    #[test]
    fn dropped_path_is_released() {
        let mut gpu = path_gpu();
        let path = gpu.create_path(&triangle()).unwrap();
        assert_eq!(path.fill(), PathFill::EvenOdd);
        let id = path.id();
        drop(path);

        gpu.handle_dirty_context();
        assert!(gpu.backend().calls.contains(&Call::Release(id)));
    }

    #[test]
    fn stencil_path_flushes_then_delegates() {
        let mut gpu = path_gpu();
        let path = gpu.create_path(&triangle()).unwrap();
        gpu.stencil_path(&path, &ScissorState::enabled(IRect::new(0, 0, 4, 4)));

        let calls = &gpu.backend().calls;
        let flush = calls.iter().position(|c| *c == Call::FlushState(DrawType::StencilPath)).unwrap();
        let stencil = calls.iter().position(|c| *c == Call::StencilPath(path.id())).unwrap();
        assert!(flush < stencil);
    }

    #[test]
    fn draw_path_uses_its_own_draw_type() {
        let mut gpu = path_gpu();
        let path = gpu.create_path(&triangle()).unwrap();
        let dst = gpu
            .create_texture(&SurfaceDesc::new(8, 8, PixelConfig::Rgba8888), None, 0)
            .unwrap();
        gpu.draw_path(&path, &ScissorState::disabled(), Some(&dst));

        assert_eq!(gpu.backend().count(|c| *c == Call::FlushState(DrawType::DrawPath)), 1);
        assert!(gpu.backend().calls.contains(&Call::DrawPath(path.id())));
    }

    #[test]
    fn draw_paths_forwards_indices_and_transforms() {
        let mut gpu = path_gpu();
        let range = gpu.create_path_range(&[triangle(), triangle(), triangle()]).unwrap();
        assert_eq!(range.len(), 3);

        gpu.draw_paths(
            &range,
            &[2, 0],
            &[1.0, 2.0, 3.0, 4.0],
            PathTransformType::Translate,
            &ScissorState::disabled(),
            None,
        );
        assert_eq!(gpu.backend().count(|c| *c == Call::FlushState(DrawType::DrawPaths)), 1);
        assert!(gpu.backend().calls.contains(&Call::DrawPaths {
            range: range.id(),
            indices: vec![2, 0],
            transforms: 4,
        }));
    }

    #[test]
    fn rejected_flush_skips_every_path_draw() {
        let mut gpu = path_gpu();
        let path = gpu.create_path(&triangle()).unwrap();
        let range = gpu.create_path_range(&[triangle()]).unwrap();
        gpu.backend_mut().reject_flush = true;

        gpu.stencil_path(&path, &ScissorState::disabled());
        gpu.draw_path(&path, &ScissorState::disabled(), None);
        gpu.draw_paths(&range, &[0], &[], PathTransformType::None, &ScissorState::disabled(), None);

        let backend = gpu.backend();
        assert_eq!(backend.count(|c| matches!(c, Call::FlushState(t) if t.is_path())), 3);
        assert_eq!(
            backend.count(|c| matches!(c, Call::StencilPath(_) | Call::DrawPath(_) | Call::DrawPaths { .. })),
            0
        );
    }

    #[test]
    #[should_panic(expected = "path index out of a range of 1")]
    fn draw_paths_out_of_range_panics() {
        let mut gpu = path_gpu();
        let range = gpu.create_path_range(&[triangle()]).unwrap();
        gpu.draw_paths(&range, &[1], &[], PathTransformType::None, &ScissorState::disabled(), None);
    }

    #[test]
    #[should_panic(expected = "transforms do not match")]
    fn draw_paths_with_short_transforms_panics() {
        let mut gpu = path_gpu();
        let range = gpu.create_path_range(&[triangle()]).unwrap();
        gpu.draw_paths(&range, &[0], &[1.0], PathTransformType::Affine, &ScissorState::disabled(), None);
    }

    #[test]
    fn failed_path_creation_is_an_error() {
        let mut gpu = path_gpu();
        gpu.backend_mut().fail_path_creation = true;
        assert_eq!(gpu.create_path(&triangle()).unwrap_err(), GpuError::CreationFailed("path"));
    }
}
