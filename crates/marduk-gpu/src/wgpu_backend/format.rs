use crate::backend::Caps;
use crate::resource::PixelConfig;

/// wgpu format backing a pixel config, if there is one.
pub(super) fn texture_format(config: PixelConfig) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as F;

    match config {
        PixelConfig::Alpha8 => Some(F::R8Unorm),
        PixelConfig::Rgba8888 => Some(F::Rgba8Unorm),
        PixelConfig::Bgra8888 => Some(F::Bgra8Unorm),
        PixelConfig::Srgba8888 => Some(F::Rgba8UnormSrgb),
        PixelConfig::RgbaFloat => Some(F::Rgba32Float),
        // ETC1 data is valid ETC2 RGB data.
        PixelConfig::Etc1 => Some(F::Etc2Rgb8Unorm),
        PixelConfig::Latc => Some(F::Bc4RUnorm),
        PixelConfig::R11Eac => Some(F::EacR11Unorm),
        PixelConfig::Astc12x12 => Some(F::Astc {
            block: wgpu::AstcBlock::B12x12,
            channel: wgpu::AstcChannel::Unorm,
        }),
        PixelConfig::Unknown | PixelConfig::Rgb565 | PixelConfig::Rgba4444 => None,
    }
}

/// Sample count used when a surface asks for multisampling.
pub(super) const MSAA_SAMPLES: u32 = 4;

/// wgpu sample count for a surface sample count (0 means single-sampled).
#[inline]
pub(super) fn wgpu_samples(sample_count: u32) -> u32 {
    sample_count.max(1)
}

/// Probes per-config support on `adapter`.
///
/// Returns the caps and, per config, whether solid draws may blend into it.
pub(super) fn probe_caps(
    adapter: &wgpu::Adapter,
    device: &wgpu::Device,
) -> (Caps, [bool; PixelConfig::COUNT]) {
    let mut caps = Caps::default();
    let mut blendable = [false; PixelConfig::COUNT];
    let enabled = device.features();

    for config in PixelConfig::ALL {
        let Some(format) = texture_format(config) else { continue };
        if !enabled.contains(format.required_features()) {
            continue;
        }

        let features = adapter.get_texture_format_features(format);
        let usages = features.allowed_usages;
        let flags = features.flags;

        caps.set_config_texturable(config, usages.contains(wgpu::TextureUsages::TEXTURE_BINDING));
        if config.is_compressed() || !usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
            continue;
        }
        caps.set_config_renderable(config, false, true);
        caps.set_config_renderable(
            config,
            true,
            flags.sample_count_supported(MSAA_SAMPLES)
                && flags.contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE),
        );
        blendable[config.index()] = flags.contains(wgpu::TextureFormatFeatureFlags::BLENDABLE);
    }

    // wgpu places no tiling restrictions on npot textures.
    caps.npot_texture_tile_support = true;
    caps.gpu_tracing_support = true;
    caps.max_sample_count = MSAA_SAMPLES;

    (caps, blendable)
}
