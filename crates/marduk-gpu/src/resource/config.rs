/// Pixel layout of a texture or render target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PixelConfig {
    Unknown,
    Alpha8,
    Rgb565,
    Rgba4444,
    Rgba8888,
    Bgra8888,
    Srgba8888,
    /// ETC1 block compression (4x4 blocks, 8 bytes).
    Etc1,
    /// LATC single-channel block compression (4x4 blocks, 8 bytes).
    Latc,
    /// R11 EAC block compression (4x4 blocks, 8 bytes).
    R11Eac,
    /// ASTC 12x12 block compression (16 bytes per block).
    Astc12x12,
    RgbaFloat,
}

impl PixelConfig {
    pub const COUNT: usize = 12;

    pub const ALL: [PixelConfig; Self::COUNT] = [
        PixelConfig::Unknown,
        PixelConfig::Alpha8,
        PixelConfig::Rgb565,
        PixelConfig::Rgba4444,
        PixelConfig::Rgba8888,
        PixelConfig::Bgra8888,
        PixelConfig::Srgba8888,
        PixelConfig::Etc1,
        PixelConfig::Latc,
        PixelConfig::R11Eac,
        PixelConfig::Astc12x12,
        PixelConfig::RgbaFloat,
    ];

    /// Dense index into per-config tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn is_compressed(self) -> bool {
        matches!(
            self,
            PixelConfig::Etc1 | PixelConfig::Latc | PixelConfig::R11Eac | PixelConfig::Astc12x12
        )
    }

    /// Bytes per pixel for uncompressed configs.
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelConfig::Alpha8 => Some(1),
            PixelConfig::Rgb565 | PixelConfig::Rgba4444 => Some(2),
            PixelConfig::Rgba8888 | PixelConfig::Bgra8888 | PixelConfig::Srgba8888 => Some(4),
            PixelConfig::RgbaFloat => Some(16),
            _ => None,
        }
    }

    /// `(block_width, block_height, block_bytes)` for compressed configs.
    pub const fn block_layout(self) -> Option<(u32, u32, usize)> {
        match self {
            PixelConfig::Etc1 | PixelConfig::Latc | PixelConfig::R11Eac => Some((4, 4, 8)),
            PixelConfig::Astc12x12 => Some((12, 12, 16)),
            _ => None,
        }
    }
}
