use bitflags::bitflags;

use crate::resource::PixelConfig;

/// Capabilities a backend reports to the facade.
///
/// Everything defaults to unsupported; backends opt in per config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    texturable: [bool; PixelConfig::COUNT],
    /// `[single-sampled, multisampled]` per config.
    renderable: [[bool; 2]; PixelConfig::COUNT],
    /// Non-power-of-two textures can be tiled (required for npot compressed data).
    pub npot_texture_tile_support: bool,
    /// Backend consumes trace markers.
    pub gpu_tracing_support: bool,
    /// Backend can create, stencil, and cover path objects.
    pub path_rendering_support: bool,
    pub max_sample_count: u32,
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            texturable: [false; PixelConfig::COUNT],
            renderable: [[false; 2]; PixelConfig::COUNT],
            npot_texture_tile_support: false,
            gpu_tracing_support: false,
            path_rendering_support: false,
            max_sample_count: 0,
        }
    }
}

impl Caps {
    #[inline]
    pub fn is_config_texturable(&self, config: PixelConfig) -> bool {
        self.texturable[config.index()]
    }

    #[inline]
    pub fn is_config_renderable(&self, config: PixelConfig, multisampled: bool) -> bool {
        self.renderable[config.index()][multisampled as usize]
    }

    pub fn set_config_texturable(&mut self, config: PixelConfig, supported: bool) {
        self.texturable[config.index()] = supported;
    }

    pub fn set_config_renderable(&mut self, config: PixelConfig, multisampled: bool, supported: bool) {
        self.renderable[config.index()][multisampled as usize] = supported;
    }
}

bitflags! {
    /// Pieces of backend state that may have been changed behind the
    /// layer's back (e.g. by another library sharing the context).
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct BackendState: u32 {
        const RENDER_TARGET = 1 << 0;
        const TEXTURE_BINDING = 1 << 1;
        const VIEW = 1 << 2;
        const BLEND = 1 << 3;
        const SCISSOR = 1 << 4;
        const VERTEX = 1 << 5;
        const STENCIL = 1 << 6;
        const PIXEL_STORE = 1 << 7;
        const PROGRAM = 1 << 8;
        const MISC = 1 << 9;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_supports_nothing() {
        let caps = Caps::default();
        for config in PixelConfig::ALL {
            assert!(!caps.is_config_texturable(config));
            assert!(!caps.is_config_renderable(config, false));
            assert!(!caps.is_config_renderable(config, true));
        }
    }

    #[test]
    fn renderable_tracks_msaa_separately() {
        let mut caps = Caps::default();
        caps.set_config_renderable(PixelConfig::Rgba8888, false, true);
        assert!(caps.is_config_renderable(PixelConfig::Rgba8888, false));
        assert!(!caps.is_config_renderable(PixelConfig::Rgba8888, true));
    }
}
