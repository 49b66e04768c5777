use std::rc::Rc;

use super::Gpu;
use crate::backend::Backend;
use crate::error::{GpuError, GpuResult};
use crate::resource::GpuBuffer;

/// Quads covered by the shared quad index buffer.
pub const MAX_QUADS: usize = 1 << 12;

const _: () = assert!(4 * MAX_QUADS <= u16::MAX as usize);

/// Two triangles over vertices `0 1 2 3` laid out as a fan.
const QUAD_PATTERN: [u16; 6] = [0, 1, 2, 0, 2, 3];

impl<B: Backend> Gpu<B> {
    /// Shared index buffer for `MAX_QUADS` independent quads.
    ///
    /// The same buffer is returned until the backend reports it destroyed.
    pub fn quad_index_buffer(&mut self) -> GpuResult<Rc<GpuBuffer>> {
        if let Some(buffer) = &self.quad_index_buffer {
            if !self.backend.was_destroyed(buffer.id()) {
                return Ok(buffer.clone());
            }
            log::debug!("quad index buffer {} was destroyed, rebuilding", buffer.id());
        }
        self.quad_index_buffer = None;

        let buffer = self.create_instanced_index_buffer(&QUAD_PATTERN, MAX_QUADS, 4, false)?;
        self.quad_index_buffer = Some(buffer.clone());
        Ok(buffer)
    }

    /// Builds an index buffer repeating `pattern` `reps` times, each
    /// repetition offset by `vertex_count` vertices.
    pub fn create_instanced_index_buffer(
        &mut self,
        pattern: &[u16],
        reps: usize,
        vertex_count: u16,
        dynamic: bool,
    ) -> GpuResult<Rc<GpuBuffer>> {
        assert!(!pattern.is_empty() && reps > 0, "instanced index buffer needs a pattern and repetitions");
        assert!(
            reps * usize::from(vertex_count) <= usize::from(u16::MAX) + 1,
            "{reps} repetitions of {vertex_count} vertices overflow 16-bit indices"
        );
        assert!(
            pattern.iter().all(|&index| index < vertex_count),
            "pattern {pattern:?} indexes past {vertex_count} vertices per repetition"
        );

        let size = pattern.len() * reps * std::mem::size_of::<u16>();
        let buffer = self.create_index_buffer(size, dynamic)?;
        let id = buffer.id();

        if let Some(mapped) = self.backend.map_buffer(id) {
            fill_instanced(&mut mapped[..size], pattern, vertex_count);
            self.backend.unmap_buffer(id);
        } else {
            let mut staging = vec![0u8; size];
            fill_instanced(&mut staging, pattern, vertex_count);
            if !self.backend.update_buffer(id, 0, &staging) {
                log::error!("failed to upload instanced index buffer {id}");
                return Err(GpuError::BufferUpdateFailed);
            }
        }

        log::debug!("built instanced index buffer {id}: {reps} x {pattern:?}");
        Ok(buffer)
    }
}

fn fill_instanced(dst: &mut [u8], pattern: &[u16], vertex_count: u16) {
    for (i, out) in dst.chunks_exact_mut(2).enumerate() {
        let rep = i / pattern.len();
        let index = usize::from(pattern[i % pattern.len()]) + rep * usize::from(vertex_count);
        out.copy_from_slice(&(index as u16).to_ne_bytes());
    }
}
