//! Pixel, depth and stencil formats.
//!
//! [`PixelFormat`] is the closed set of colour formats a render target may
//! use. [`DepthFormat`] and [`StencilFormat`] list the depth/stencil storage
//! candidates in the order the capability probe tries them, and
//! [`DepthStencilMode`] pairs them with the desirability score used to rank
//! probe results.
//!
//! | Depth candidate | Bits | Packed |
//! |-----------------|------|--------|
//! | `None`          | 0    |        |
//! | `D16`           | 16   |        |
//! | `D24`           | 24   |        |
//! | `D32`           | 32   |        |
//! | `D32F`          | 32   |        |
//! | `Packed24S8`    | 24   | ✅     |
//! | `Packed32FS8`   | 32   | ✅     |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gl_types::GlEnum;

// ─── Colour Formats ───────────────────────────────────────────────────────────

/// Colour pixel formats usable as render-target storage.
///
/// `None` is the "no colour" format used by depth-only targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PixelFormat {
    None,
    L8,
    L16,
    A8,
    A4L4,
    L8A8,
    R3G3B2,
    R5G6B5,
    B5G6R5,
    A4R4G4B4,
    A1R5G5B5,
    R8G8B8,
    B8G8R8,
    A8R8G8B8,
    A8B8G8R8,
    B8G8R8A8,
    X8R8G8B8,
    X8B8G8R8,
    A2R10G10B10,
    A2B10G10R10,
    R16G16B16A16,
    Float16R,
    Float16GR,
    Float16Rgb,
    Float16Rgba,
    Float32R,
    Float32GR,
    Float32Rgb,
    Float32Rgba,
    R11G11B10Float,
    Dxt1,
    Dxt3,
    Dxt5,
}

impl PixelFormat {
    /// Every format, in probe order.
    pub const ALL: [PixelFormat; 33] = [
        Self::None,
        Self::L8,
        Self::L16,
        Self::A8,
        Self::A4L4,
        Self::L8A8,
        Self::R3G3B2,
        Self::R5G6B5,
        Self::B5G6R5,
        Self::A4R4G4B4,
        Self::A1R5G5B5,
        Self::R8G8B8,
        Self::B8G8R8,
        Self::A8R8G8B8,
        Self::A8B8G8R8,
        Self::B8G8R8A8,
        Self::X8R8G8B8,
        Self::X8B8G8R8,
        Self::A2R10G10B10,
        Self::A2B10G10R10,
        Self::R16G16B16A16,
        Self::Float16R,
        Self::Float16GR,
        Self::Float16Rgb,
        Self::Float16Rgba,
        Self::Float32R,
        Self::Float32GR,
        Self::Float32Rgb,
        Self::Float32Rgba,
        Self::R11G11B10Float,
        Self::Dxt1,
        Self::Dxt3,
        Self::Dxt5,
    ];

    /// Number of formats; the length of per-format tables.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this format in [`PixelFormat::ALL`].
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "PF_NONE",
            Self::L8 => "PF_L8",
            Self::L16 => "PF_L16",
            Self::A8 => "PF_A8",
            Self::A4L4 => "PF_A4L4",
            Self::L8A8 => "PF_BYTE_LA",
            Self::R3G3B2 => "PF_R3G3B2",
            Self::R5G6B5 => "PF_R5G6B5",
            Self::B5G6R5 => "PF_B5G6R5",
            Self::A4R4G4B4 => "PF_A4R4G4B4",
            Self::A1R5G5B5 => "PF_A1R5G5B5",
            Self::R8G8B8 => "PF_R8G8B8",
            Self::B8G8R8 => "PF_B8G8R8",
            Self::A8R8G8B8 => "PF_A8R8G8B8",
            Self::A8B8G8R8 => "PF_A8B8G8R8",
            Self::B8G8R8A8 => "PF_B8G8R8A8",
            Self::X8R8G8B8 => "PF_X8R8G8B8",
            Self::X8B8G8R8 => "PF_X8B8G8R8",
            Self::A2R10G10B10 => "PF_A2R10G10B10",
            Self::A2B10G10R10 => "PF_A2B10G10R10",
            Self::R16G16B16A16 => "PF_SHORT_RGBA",
            Self::Float16R => "PF_FLOAT16_R",
            Self::Float16GR => "PF_FLOAT16_GR",
            Self::Float16Rgb => "PF_FLOAT16_RGB",
            Self::Float16Rgba => "PF_FLOAT16_RGBA",
            Self::Float32R => "PF_FLOAT32_R",
            Self::Float32GR => "PF_FLOAT32_GR",
            Self::Float32Rgb => "PF_FLOAT32_RGB",
            Self::Float32Rgba => "PF_FLOAT32_RGBA",
            Self::R11G11B10Float => "PF_R11G11B10_FLOAT",
            Self::Dxt1 => "PF_DXT1",
            Self::Dxt3 => "PF_DXT3",
            Self::Dxt5 => "PF_DXT5",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_compressed(self) -> bool {
        matches!(self, Self::Dxt1 | Self::Dxt3 | Self::Dxt5)
    }

    #[must_use]
    pub fn is_floating_point(self) -> bool {
        matches!(
            self,
            Self::Float16R
                | Self::Float16GR
                | Self::Float16Rgb
                | Self::Float16Rgba
                | Self::Float32R
                | Self::Float32GR
                | Self::Float32Rgb
                | Self::Float32Rgba
                | Self::R11G11B10Float
        )
    }

    /// Bits per channel as `[red, green, blue, alpha]`.
    ///
    /// Luminance formats report their luminance bits in the red channel only.
    #[must_use]
    pub fn bit_depths(self) -> [u8; 4] {
        match self {
            Self::None => [0, 0, 0, 0],
            Self::L8 => [8, 0, 0, 0],
            Self::L16 => [16, 0, 0, 0],
            Self::A8 => [0, 0, 0, 8],
            Self::A4L4 => [4, 0, 0, 4],
            Self::L8A8 => [8, 0, 0, 8],
            Self::R3G3B2 => [3, 3, 2, 0],
            Self::R5G6B5 | Self::B5G6R5 => [5, 6, 5, 0],
            Self::A4R4G4B4 => [4, 4, 4, 4],
            Self::A1R5G5B5 => [5, 5, 5, 1],
            Self::R8G8B8 | Self::B8G8R8 | Self::X8R8G8B8 | Self::X8B8G8R8 => [8, 8, 8, 0],
            Self::A8R8G8B8 | Self::A8B8G8R8 | Self::B8G8R8A8 => [8, 8, 8, 8],
            Self::A2R10G10B10 | Self::A2B10G10R10 => [10, 10, 10, 2],
            Self::R16G16B16A16 | Self::Float16Rgba => [16, 16, 16, 16],
            Self::Float16R => [16, 0, 0, 0],
            Self::Float16GR => [16, 16, 0, 0],
            Self::Float16Rgb => [16, 16, 16, 0],
            Self::Float32R => [32, 0, 0, 0],
            Self::Float32GR => [32, 32, 0, 0],
            Self::Float32Rgb => [32, 32, 32, 0],
            Self::Float32Rgba => [32, 32, 32, 32],
            Self::R11G11B10Float => [11, 11, 10, 0],
            Self::Dxt1 => [5, 6, 5, 1],
            Self::Dxt3 | Self::Dxt5 => [5, 6, 5, 4],
        }
    }

    /// Whether red, green and blue all carry bits.
    #[inline]
    #[must_use]
    pub fn has_rgb(self) -> bool {
        let [r, g, b, _] = self.bit_depths();
        r != 0 && g != 0 && b != 0
    }

    /// Native sized internal format, or `None` when the driver has no
    /// renderable equivalent.
    #[must_use]
    pub fn gl_internal_format(self) -> Option<GlEnum> {
        let token = match self {
            Self::None | Self::A4L4 => return None,
            Self::L8 => 0x8040,
            Self::L16 => 0x8042,
            Self::A8 => 0x803C,
            Self::L8A8 => 0x8045,
            Self::R3G3B2 => 0x2A10,
            Self::R5G6B5 | Self::B5G6R5 => 0x8050,
            Self::A4R4G4B4 => 0x8056,
            Self::A1R5G5B5 => 0x8057,
            Self::R8G8B8 | Self::B8G8R8 | Self::X8R8G8B8 | Self::X8B8G8R8 => 0x8051,
            Self::A8R8G8B8 | Self::A8B8G8R8 | Self::B8G8R8A8 => 0x8058,
            Self::A2R10G10B10 | Self::A2B10G10R10 => 0x8059,
            Self::R16G16B16A16 => 0x805B,
            Self::Float16R => 0x822D,
            Self::Float16GR => 0x822F,
            Self::Float16Rgb => 0x881B,
            Self::Float16Rgba => 0x881A,
            Self::Float32R => 0x822E,
            Self::Float32GR => 0x8230,
            Self::Float32Rgb => 0x8815,
            Self::Float32Rgba => 0x8814,
            Self::R11G11B10Float => 0x8C3A,
            Self::Dxt1 => 0x83F1,
            Self::Dxt3 => 0x83F2,
            Self::Dxt5 => 0x83F3,
        };
        Some(token)
    }

    /// Bytes per pixel for uncompressed formats.
    #[must_use]
    pub fn bytes_per_pixel(self) -> u32 {
        let bits: u32 = self.bit_depths().iter().map(|&b| u32::from(b)).sum();
        bits.div_ceil(8)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Depth / Stencil Formats ──────────────────────────────────────────────────

/// Depth storage candidates, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthFormat {
    None,
    D16,
    D24,
    D32,
    D32F,
    /// Combined 24-bit depth and 8-bit stencil in one buffer.
    Packed24S8,
    /// Combined 32-bit float depth and 8-bit stencil in one buffer.
    Packed32FS8,
}

impl DepthFormat {
    pub const ALL: [DepthFormat; 7] = [
        Self::None,
        Self::D16,
        Self::D24,
        Self::D32,
        Self::D32F,
        Self::Packed24S8,
        Self::Packed32FS8,
    ];

    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::D16 => 16,
            Self::D24 | Self::Packed24S8 => 24,
            Self::D32 | Self::D32F | Self::Packed32FS8 => 32,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_packed(self) -> bool {
        matches!(self, Self::Packed24S8 | Self::Packed32FS8)
    }

    #[must_use]
    pub fn gl_token(self) -> Option<GlEnum> {
        match self {
            Self::None => None,
            Self::D16 => Some(0x81A5),
            Self::D24 => Some(0x81A6),
            Self::D32 => Some(0x81A7),
            Self::D32F => Some(0x8CAC),
            Self::Packed24S8 => Some(0x88F0),
            Self::Packed32FS8 => Some(0x8CAD),
        }
    }

    /// Bytes per sample of the storage, stencil plane included for packed
    /// formats.
    #[must_use]
    pub fn bytes_per_sample(self) -> u32 {
        match self {
            Self::None => 0,
            Self::D16 => 2,
            Self::D24 | Self::D32 | Self::D32F | Self::Packed24S8 => 4,
            Self::Packed32FS8 => 8,
        }
    }
}

/// Separate stencil storage candidates, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StencilFormat {
    None,
    S1,
    S4,
    S8,
    S16,
}

impl StencilFormat {
    pub const ALL: [StencilFormat; 5] = [Self::None, Self::S1, Self::S4, Self::S8, Self::S16];

    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::S1 => 1,
            Self::S4 => 4,
            Self::S8 => 8,
            Self::S16 => 16,
        }
    }

    #[must_use]
    pub fn gl_token(self) -> Option<GlEnum> {
        match self {
            Self::None => None,
            Self::S1 => Some(0x8D46),
            Self::S4 => Some(0x8D47),
            Self::S8 => Some(0x8D48),
            Self::S16 => Some(0x8D49),
        }
    }

    #[must_use]
    pub fn bytes_per_sample(self) -> u32 {
        match self {
            Self::None => 0,
            Self::S1 | Self::S4 | Self::S8 => 1,
            Self::S16 => 2,
        }
    }
}

// ─── Modes ────────────────────────────────────────────────────────────────────

/// A legal depth/stencil pairing for some colour format.
///
/// Packed depth formats always carry `StencilFormat::None` here; their stencil
/// plane lives inside the depth buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepthStencilMode {
    pub depth: DepthFormat,
    pub stencil: StencilFormat,
}

impl DepthStencilMode {
    pub const NONE: Self = Self {
        depth: DepthFormat::None,
        stencil: StencilFormat::None,
    };

    #[must_use]
    pub const fn new(depth: DepthFormat, stencil: StencilFormat) -> Self {
        Self { depth, stencil }
    }

    /// Stencil bits available to a target using this mode.
    #[must_use]
    pub fn stencil_bits(self) -> u32 {
        if self.depth.is_packed() {
            8
        } else {
            self.stencil.bits()
        }
    }

    #[inline]
    #[must_use]
    pub fn has_stencil(self) -> bool {
        self.stencil_bits() > 0
    }

    #[inline]
    #[must_use]
    pub fn has_depth(self) -> bool {
        self.depth != DepthFormat::None
    }

    /// Ranking score for the mode.
    ///
    /// ```text
    ///  0          no depth, no stencil
    ///  1000..2000 stencil only
    ///  2000..3000 depth only
    ///  3000+      depth and stencil
    /// ```
    ///
    /// 24-bit depth earns +500. With `prefer_packed`, packed D24S8 earns a
    /// further +5000 so it outranks every separate combination. The total
    /// number of depth and stencil bits breaks the remaining ties.
    #[must_use]
    pub fn desirability(self, prefer_packed: bool) -> u32 {
        let mut score = 0;
        if self.has_stencil() {
            score += 1000;
        }
        if self.has_depth() {
            score += 2000;
        }
        if self.depth.bits() == 24 {
            score += 500;
        }
        if prefer_packed && self.depth == DepthFormat::Packed24S8 {
            score += 5000;
        }
        score + self.stencil_bits() + self.depth.bits()
    }
}

impl fmt::Display for DepthStencilMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.depth.is_packed() {
            write!(f, "Packed-D{}S8", self.depth.bits())
        } else {
            write!(f, "D{}S{}", self.depth.bits(), self.stencil.bits())
        }
    }
}
