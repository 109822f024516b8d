//! Surface descriptors and renderbuffers.
//!
//! A [`SurfaceDesc`] names one 2D image that can be attached to a
//! framebuffer: a texture level/layer or a renderbuffer. It is a non-owning
//! reference; the storage belongs to whoever created the texture or
//! renderbuffer.
//!
//! [`RenderBufferPool`] shares multisample colour renderbuffers between
//! framebuffer objects that need identical storage.

use rustc_hash::FxHashMap;

use glint_core::errors::{GlintError, Result};
use glint_core::format::PixelFormat;
use glint_core::gl_types::{Attachment, GlEnum, GlError, GlName, TextureTarget};

use crate::driver::GlDriver;
use crate::state::StateCache;

/// Where the pixels of a surface live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceSource {
    Texture { target: TextureTarget, name: GlName },
    RenderBuffer { name: GlName },
}

/// One attachable 2D surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceDesc {
    pub source: SurfaceSource,
    /// Array slice, 3D depth slice or cube face.
    pub layer: u32,
    pub mip_level: u32,
    /// Multisample count the surface is rendered with; 0 for single-sampled.
    pub samples: u32,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl SurfaceDesc {
    #[must_use]
    pub fn texture(target: TextureTarget, name: GlName, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            source: SurfaceSource::Texture { target, name },
            layer: 0,
            mip_level: 0,
            samples: 0,
            width,
            height,
            format,
        }
    }

    #[must_use]
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    #[must_use]
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    #[must_use]
    pub fn with_mip_level(mut self, level: u32) -> Self {
        self.mip_level = level;
        self
    }

    /// Driver object name behind the surface.
    #[inline]
    #[must_use]
    pub fn name(&self) -> GlName {
        match self.source {
            SurfaceSource::Texture { name, .. } | SurfaceSource::RenderBuffer { name } => name,
        }
    }

    /// `(width, height, samples)`, the triple every attachment of one
    /// framebuffer must agree on.
    #[inline]
    #[must_use]
    pub fn extent(&self) -> (u32, u32, u32) {
        (self.width, self.height, self.samples)
    }

    /// Attaches the surface to the bound draw framebuffer.
    ///
    /// Surfaces without a colour format (depth-only targets) attach nothing.
    pub fn attach(&self, gl: &mut dyn GlDriver, attachment: Attachment) {
        if self.format == PixelFormat::None {
            return;
        }
        match self.source {
            SurfaceSource::Texture { target, name } => {
                gl.framebuffer_texture(attachment, target, name, self.mip_level, self.layer);
            }
            SurfaceSource::RenderBuffer { name } => gl.framebuffer_renderbuffer(attachment, name),
        }
    }
}

// ─── RenderBuffer ─────────────────────────────────────────────────────────────

/// An owned renderbuffer with allocated storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderBuffer {
    pub name: GlName,
    pub internal: GlEnum,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

impl RenderBuffer {
    /// Generates a renderbuffer and allocates its storage.
    ///
    /// Running out of memory is fatal and reported as
    /// [`GlintError::OutOfMemory`]; the request is never retried with
    /// smaller parameters.
    pub fn create(
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        what: &'static str,
        internal: GlEnum,
        width: u32,
        height: u32,
        samples: u32,
    ) -> Result<Self> {
        let name = gl.gen_renderbuffer();
        state.bind_renderbuffer(gl, name, false);
        // Stale errors must not be blamed on this allocation.
        let _ = gl.get_error();
        gl.renderbuffer_storage(internal, width, height, samples);
        match gl.get_error() {
            GlError::NoError => Ok(Self {
                name,
                internal,
                width,
                height,
                samples,
            }),
            error => {
                state.delete_renderbuffer(gl, name);
                if error == GlError::OutOfMemory {
                    log::error!("Out of GPU memory allocating {what} ({width}x{height}, {samples} samples)");
                    Err(GlintError::OutOfMemory { what, width, height })
                } else {
                    Err(GlintError::DriverError { call: "renderbuffer_storage", error })
                }
            }
        }
    }

    /// Deletes the renderbuffer.
    pub fn destroy(self, gl: &mut dyn GlDriver, state: &mut StateCache) {
        state.delete_renderbuffer(gl, self.name);
        state.invalidate_for_resource(self.name);
    }

    #[must_use]
    pub fn surface(&self, format: PixelFormat) -> SurfaceDesc {
        SurfaceDesc {
            source: SurfaceSource::RenderBuffer { name: self.name },
            layer: 0,
            mip_level: 0,
            samples: self.samples,
            width: self.width,
            height: self.height,
            format,
        }
    }
}

// ─── RenderBufferPool ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RenderBufferKey {
    internal: GlEnum,
    width: u32,
    height: u32,
    samples: u32,
}

#[derive(Debug)]
struct SharedRenderBuffer {
    buffer: RenderBuffer,
    refs: usize,
}

/// Reference-counted renderbuffers keyed by `(format, width, height,
/// samples)`.
#[derive(Debug, Default)]
pub struct RenderBufferPool {
    buffers: FxHashMap<RenderBufferKey, SharedRenderBuffer>,
}

impl RenderBufferPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a renderbuffer with the requested storage, creating it on
    /// first request and bumping its reference count afterwards.
    pub fn request(
        &mut self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        internal: GlEnum,
        width: u32,
        height: u32,
        samples: u32,
    ) -> Result<RenderBuffer> {
        let key = RenderBufferKey {
            internal,
            width,
            height,
            samples,
        };
        if let Some(shared) = self.buffers.get_mut(&key) {
            shared.refs += 1;
            return Ok(shared.buffer);
        }
        let buffer = RenderBuffer::create(gl, state, "multisample colour buffer", internal, width, height, samples)?;
        self.buffers.insert(key, SharedRenderBuffer { buffer, refs: 1 });
        Ok(buffer)
    }

    /// Drops one reference; the renderbuffer is deleted with the last one.
    pub fn release(&mut self, gl: &mut dyn GlDriver, state: &mut StateCache, buffer: &RenderBuffer) {
        let key = RenderBufferKey {
            internal: buffer.internal,
            width: buffer.width,
            height: buffer.height,
            samples: buffer.samples,
        };
        let Some(shared) = self.buffers.get_mut(&key) else {
            log::warn!("Releasing renderbuffer {} that was never requested", buffer.name);
            return;
        };
        shared.refs -= 1;
        if shared.refs == 0
            && let Some(shared) = self.buffers.remove(&key)
        {
            shared.buffer.destroy(gl, state);
        }
    }

    /// Outstanding references to the buffer with this storage.
    #[must_use]
    pub fn ref_count(&self, internal: GlEnum, width: u32, height: u32, samples: u32) -> usize {
        let key = RenderBufferKey {
            internal,
            width,
            height,
            samples,
        };
        self.buffers.get(&key).map_or(0, |s| s.refs)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
