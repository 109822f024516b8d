//! Typed GL vocabulary.
//!
//! Every enum here names one family of GL tokens. The state cache and the
//! driver seam speak these types instead of raw `GLenum` values, so a blend
//! factor can never be passed where a compare function is expected.

use bitflags::bitflags;

/// A driver object name (`GLuint`). Zero always means "no object".
pub type GlName = u32;

/// A raw GL enum token.
pub type GlEnum = u32;

// ─── Binding Points ───────────────────────────────────────────────────────────

/// Buffer binding targets (`glBindBuffer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
    Uniform,
    PixelPack,
    PixelUnpack,
    CopyRead,
    CopyWrite,
    TextureBuffer,
    DrawIndirect,
}

/// Framebuffer binding targets (`glBindFramebuffer`).
///
/// Binding [`FramebufferTarget::Framebuffer`] sets both the draw and the
/// read binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    Framebuffer,
    Draw,
    Read,
}

/// Texture binding targets (`glBindTexture`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture1D,
    Texture2D,
    Texture3D,
    CubeMap,
    Texture2DArray,
    Texture2DMultisample,
    Rectangle,
}

/// Texture parameter names (`glTexParameter*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexParam {
    MinFilter,
    MagFilter,
    WrapS,
    WrapT,
    WrapR,
    BaseLevel,
    MaxLevel,
    MaxAnisotropy,
    CompareMode,
    CompareFunc,
}

/// A cached texture parameter value.
///
/// Floats are stored by bit pattern so cached values compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexParamValue {
    Int(i32),
    Float(u32),
}

impl TexParamValue {
    #[must_use]
    pub fn float(value: f32) -> Self {
        Self::Float(value.to_bits())
    }
}

// ─── Fixed Render State ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColour,
    OneMinusSrcColour,
    DstColour,
    OneMinusDstColour,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Point,
    Line,
    Fill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadeModel {
    Flat,
    Smooth,
}

/// Server-side capabilities toggled with `glEnable` / `glDisable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    DepthTest,
    CullFace,
    StencilTest,
    ScissorTest,
    PolygonOffsetFill,
    Multisample,
    FramebufferSrgb,
    AlphaTest,
    Lighting,
    PointSprite,
    ClipDistance(u8),
}

/// Fixed-function texture coordinate generation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexCoordGen {
    ObjectLinear,
    EyeLinear,
    SphereMap,
    ReflectionMap,
    NormalMap,
}

/// Viewport rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Per-channel colour write mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColourMask {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    pub alpha: bool,
}

impl ColourMask {
    pub const ALL: Self = Self {
        red: true,
        green: true,
        blue: true,
        alpha: true,
    };
    pub const NONE: Self = Self {
        red: false,
        green: false,
        blue: false,
        alpha: false,
    };
}

impl Default for ColourMask {
    fn default() -> Self {
        Self::ALL
    }
}

// ─── Framebuffer Vocabulary ───────────────────────────────────────────────────

/// Framebuffer attachment points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    Colour(u8),
    Depth,
    Stencil,
}

/// Values for `glDrawBuffer(s)` / `glReadBuffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawBuffer {
    None,
    Back,
    Front,
    Colour(u8),
}

/// Result of `glCheckFramebufferStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    Undefined,
    IncompleteAttachment,
    IncompleteMissingAttachment,
    IncompleteDimensions,
    IncompleteDrawBuffer,
    IncompleteMultisample,
    Unsupported,
}

impl FramebufferStatus {
    #[inline]
    #[must_use]
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

/// Values returned by `glGetError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlError {
    NoError,
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    InvalidFramebufferOperation,
    OutOfMemory,
}

bitflags! {
    /// Buffer selection for blits and clears.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferMask: u8 {
        const COLOUR  = 1 << 0;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Minification/magnification filter used by blits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlitFilter {
    Nearest,
    Linear,
}
