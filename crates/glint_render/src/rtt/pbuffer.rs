//! PBuffer render-to-texture path.
//!
//! One pbuffer is kept per pixel component type and shared by every render
//! texture of that type. The pbuffer grows to the largest texture requested
//! and is destroyed with its last user.
//!
//! ```text
//!   bind()   : main ctx ──switch──▶ pbuffer ctx   (render)
//!   unbind() : copy into texture, pbuffer ctx ──switch──▶ main ctx
//! ```

use rustc_hash::FxHashMap;

use glint_core::capabilities::DriverCapabilities;
use glint_core::errors::{GlintError, Result};
use glint_core::format::PixelFormat;
use glint_core::gl_types::GlEnum;
use glint_core::handles::ContextId;

use crate::context::{ContextKind, ContextSet};
use crate::driver::GlDriver;
use crate::target::{RenderTarget, TargetKind};

// GL_RGBA8 / GL_RGBA16 / GL_RGBA16F / GL_RGBA32F
const GL_RGBA8: GlEnum = 0x8058;
const GL_RGBA16: GlEnum = 0x805B;
const GL_RGBA16F: GlEnum = 0x881A;
const GL_RGBA32F: GlEnum = 0x8814;

/// Storage class of a pixel format's channels. Formats of one class share a
/// pbuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelComponentType {
    Byte,
    Short,
    Float16,
    Float32,
}

impl PixelComponentType {
    #[must_use]
    pub fn of(format: PixelFormat) -> Self {
        let widest = format.bit_depths().into_iter().max().unwrap_or(0);
        match (format.is_floating_point(), widest) {
            (true, 0..=16) => Self::Float16,
            (true, _) => Self::Float32,
            (false, 0..=8) => Self::Byte,
            (false, _) => Self::Short,
        }
    }

    #[must_use]
    pub fn internal_format(self) -> GlEnum {
        match self {
            Self::Byte => GL_RGBA8,
            Self::Short => GL_RGBA16,
            Self::Float16 => GL_RGBA16F,
            Self::Float32 => GL_RGBA32F,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SharedPBuffer {
    context: ContextId,
    width: u32,
    height: u32,
    refs: usize,
}

#[derive(Debug)]
pub struct PBufferManager {
    pbuffers: FxHashMap<PixelComponentType, SharedPBuffer>,
    main: ContextId,
}

impl PBufferManager {
    #[must_use]
    pub fn new(main: ContextId) -> Self {
        Self {
            pbuffers: FxHashMap::default(),
            main,
        }
    }

    /// Reserves the pbuffer for `format`, creating it or growing it to at
    /// least `width × height`.
    pub fn request(
        &mut self,
        gl: &mut dyn GlDriver,
        contexts: &mut ContextSet,
        caps: &DriverCapabilities,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<ContextId> {
        let ctype = PixelComponentType::of(format);
        let (width, height, refs) = match self.pbuffers.get(&ctype) {
            Some(shared) if shared.width >= width && shared.height >= height => {
                let context = shared.context;
                if let Some(shared) = self.pbuffers.get_mut(&ctype) {
                    shared.refs += 1;
                }
                return Ok(context);
            }
            Some(shared) => {
                let grown = (shared.width.max(width), shared.height.max(height), shared.refs);
                log::debug!("Growing {ctype:?} pbuffer to {}x{}", grown.0, grown.1);
                contexts.destroy(gl, shared.context)?;
                grown
            }
            None => (width, height, 0),
        };

        let native = gl
            .create_pbuffer(ctype.internal_format(), width, height)
            .ok_or_else(|| GlintError::ContextCreationFailed(format!("{ctype:?} pbuffer {width}x{height}")))?;
        let context = contexts.adopt(native, ContextKind::PBuffer, caps);
        self.pbuffers.insert(
            ctype,
            SharedPBuffer {
                context,
                width,
                height,
                refs: refs + 1,
            },
        );
        Ok(context)
    }

    /// Drops one reference; the pbuffer is destroyed with its last user.
    pub fn release(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, format: PixelFormat) -> Result<()> {
        let ctype = PixelComponentType::of(format);
        let Some(shared) = self.pbuffers.get_mut(&ctype) else {
            return Ok(());
        };
        shared.refs = shared.refs.saturating_sub(1);
        if shared.refs == 0 {
            let context = shared.context;
            self.pbuffers.remove(&ctype);
            contexts.destroy(gl, context)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn context_for(&self, format: PixelFormat) -> Option<ContextId> {
        self.pbuffers.get(&PixelComponentType::of(format)).map(|p| p.context)
    }

    /// Size of the pbuffer serving `format`.
    #[must_use]
    pub fn extent(&self, format: PixelFormat) -> Option<(u32, u32)> {
        self.pbuffers
            .get(&PixelComponentType::of(format))
            .map(|p| (p.width, p.height))
    }

    pub fn bind(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, target: &RenderTarget) -> Result<()> {
        let context = self.context_for(target.format()).ok_or(GlintError::UnknownContext)?;
        contexts.switch_to(gl, context)
    }

    /// Copies the pbuffer into the texture and returns to the main context.
    pub fn unbind(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, target: &RenderTarget) -> Result<()> {
        if let TargetKind::RenderTexture {
            target: tex_target,
            texture,
            ..
        } = *target.kind()
            && texture != 0
        {
            let state = contexts.current_state()?;
            state.bind_texture(gl, tex_target, texture, false);
            gl.copy_tex_sub_image_2d(tex_target, 0, target.width(), target.height());
        }
        contexts.switch_to(gl, self.main)
    }
}
