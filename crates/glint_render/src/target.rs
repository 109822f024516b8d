//! Render target records.
//!
//! A [`RenderTarget`] is the bookkeeping for anything that can be rendered
//! to: a window, a texture rendered through one of the render-to-texture
//! paths, or a framebuffer with several colour attachments. Records live in
//! the render system's arena and are addressed by [`RenderTargetId`].
//!
//! Backend objects are exposed through the closed [`TargetAttribute`] query
//! instead of string-keyed lookups.

use glint_core::format::PixelFormat;
use glint_core::gl_types::{GlName, TextureTarget};
use glint_core::handles::{ContextId, DepthBufferId, FboId, PoolId, RenderTargetId};

/// How a render texture receives its pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RttBacking {
    /// Rendered directly through a framebuffer object.
    Fbo(FboId),
    /// Rendered into a pbuffer, then copied into the texture.
    PBuffer,
    /// Rendered into the current window's back buffer, then copied.
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Window {
        context: ContextId,
        primary: bool,
    },
    RenderTexture {
        backing: RttBacking,
        target: TextureTarget,
        /// Texture owned by the render texture; 0 for depth-only targets.
        texture: GlName,
    },
    MultiRenderTarget {
        fbo: FboId,
    },
}

/// Backend objects that can be queried from a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetAttribute {
    /// The framebuffer object rendered into.
    Fbo,
    /// The context the target renders in.
    GlContext,
    /// The target itself.
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValue {
    Fbo(FboId),
    Context(ContextId),
    Target(RenderTargetId),
    None,
}

#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub(crate) name: String,
    pub(crate) kind: TargetKind,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) samples: u32,
    pub(crate) format: PixelFormat,
    pub(crate) pool_id: PoolId,
    pub(crate) want_stencil: bool,
    pub(crate) srgb: bool,
    pub(crate) depth_buffer: Option<DepthBufferId>,
}

impl RenderTarget {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &TargetKind {
        &self.kind
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Effective multisample count after clamping.
    #[inline]
    #[must_use]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    #[inline]
    #[must_use]
    pub fn wants_stencil(&self) -> bool {
        self.want_stencil
    }

    #[inline]
    #[must_use]
    pub fn is_srgb(&self) -> bool {
        self.srgb
    }

    #[inline]
    #[must_use]
    pub fn depth_buffer(&self) -> Option<DepthBufferId> {
        self.depth_buffer
    }

    /// Framebuffer object behind the target, if any.
    #[must_use]
    pub fn fbo(&self) -> Option<FboId> {
        match self.kind {
            TargetKind::RenderTexture {
                backing: RttBacking::Fbo(fbo),
                ..
            }
            | TargetKind::MultiRenderTarget { fbo } => Some(fbo),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_window(&self) -> bool {
        matches!(self.kind, TargetKind::Window { .. })
    }

    /// Attribute lookup that needs nothing beyond this record.
    ///
    /// [`TargetAttribute::GlContext`] is only known here for windows; the
    /// render system resolves it for the other kinds.
    #[must_use]
    pub fn attribute(&self, id: RenderTargetId, attribute: TargetAttribute) -> AttributeValue {
        match attribute {
            TargetAttribute::Fbo => self.fbo().map_or(AttributeValue::None, AttributeValue::Fbo),
            TargetAttribute::GlContext => match self.kind {
                TargetKind::Window { context, .. } => AttributeValue::Context(context),
                _ => AttributeValue::None,
            },
            TargetAttribute::Target => AttributeValue::Target(id),
        }
    }
}
