//! Render-to-Texture Paths
//!
//! Drivers offer up to three ways of rendering into a texture. The render
//! system picks one at startup and routes every render texture through it.
//!
//! | Path       | Renders into                | Texture receives pixels by |
//! |------------|-----------------------------|----------------------------|
//! | `Fbo`      | framebuffer object          | direct attachment          |
//! | `PBuffer`  | per-format pbuffer context  | copy on unbind             |
//! | `Copying`  | current window back buffer  | copy on unbind             |
//!
//! Selection order follows [`RttPreference`]: framebuffer objects when the
//! driver has them, then pbuffers, then copying, which always works.

mod copying;
mod fbo;
mod pbuffer;

pub use copying::CopyingManager;
pub use fbo::FboManager;
pub use pbuffer::{PBufferManager, PixelComponentType};

use glint_core::capabilities::{DriverCapabilities, RenderCapabilities};
use glint_core::errors::Result;
use glint_core::format::{DepthStencilMode, PixelFormat};
use glint_core::gl_types::FramebufferTarget;
use glint_core::handles::ContextId;
use glint_core::settings::{RenderSystemSettings, RttPreference};

use crate::context::ContextSet;
use crate::driver::GlDriver;
use crate::probe::FormatCompatibilityTable;
use crate::surface::SurfaceDesc;
use crate::target::{RenderTarget, RttBacking, TargetKind};

#[derive(Debug)]
pub enum RttManager {
    Fbo(FboManager),
    PBuffer(PBufferManager),
    Copying(CopyingManager),
}

impl RttManager {
    /// Picks the best path the driver supports, honouring the preference.
    ///
    /// Choosing the framebuffer-object path runs the capability probe on the
    /// current context.
    pub fn select(
        gl: &mut dyn GlDriver,
        contexts: &mut ContextSet,
        caps: &DriverCapabilities,
        settings: &RenderSystemSettings,
    ) -> Result<Self> {
        let fbo = caps.has(RenderCapabilities::FRAMEBUFFER_OBJECT);
        let pbuffer = caps.has(RenderCapabilities::PBUFFER);

        let manager = match settings.rtt_preference {
            RttPreference::Fbo if fbo => {
                let state = contexts.current_state()?;
                Self::Fbo(FboManager::new(gl, state, caps, settings))
            }
            RttPreference::Fbo | RttPreference::PBuffer if pbuffer => {
                if settings.rtt_preference == RttPreference::Fbo {
                    log::warn!("[GL] : Framebuffer objects unsupported; falling back to pbuffers");
                }
                Self::PBuffer(PBufferManager::new(contexts.main()))
            }
            preference => {
                if preference != RttPreference::Copy {
                    log::warn!(
                        "[GL] : Neither framebuffer objects nor pbuffers are supported; \
                         render to texture copies from the back buffer"
                    );
                }
                Self::Copying(CopyingManager::new())
            }
        };
        log::info!("[GL] : Using {} for rendering to textures", manager.name());
        Ok(manager)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fbo(_) => "FBO",
            Self::PBuffer(_) => "PBuffers",
            Self::Copying(_) => "copying",
        }
    }

    #[must_use]
    pub fn preference(&self) -> RttPreference {
        match self {
            Self::Fbo(_) => RttPreference::Fbo,
            Self::PBuffer(_) => RttPreference::PBuffer,
            Self::Copying(_) => RttPreference::Copy,
        }
    }

    /// Compatibility table; only the framebuffer-object path probes.
    #[must_use]
    pub fn table(&self) -> Option<&FormatCompatibilityTable> {
        match self {
            Self::Fbo(m) => Some(m.table()),
            _ => None,
        }
    }

    #[must_use]
    pub fn fbo_manager(&self) -> Option<&FboManager> {
        match self {
            Self::Fbo(m) => Some(m),
            _ => None,
        }
    }

    pub fn fbo_manager_mut(&mut self) -> Option<&mut FboManager> {
        match self {
            Self::Fbo(m) => Some(m),
            _ => None,
        }
    }

    /// Whether textures of `format` can be rendered to.
    #[must_use]
    pub fn check_format(&self, format: PixelFormat) -> bool {
        match self {
            Self::Fbo(m) => m.table().is_valid(format),
            Self::PBuffer(_) | Self::Copying(_) => {
                !format.is_compressed() && format.gl_internal_format().is_some()
            }
        }
    }

    /// Depth/stencil mode for a colour format. Paths that render into a
    /// window or pbuffer use that surface's own depth buffer and report the
    /// no-depth mode.
    #[must_use]
    pub fn get_best_depth_stencil(&self, format: PixelFormat, want_stencil: bool) -> DepthStencilMode {
        match self {
            Self::Fbo(m) => m.table().best_depth_stencil(format, want_stencil),
            Self::PBuffer(_) | Self::Copying(_) => DepthStencilMode::NONE,
        }
    }

    /// Sets up the path-specific backing of a render texture whose texture
    /// is described by `surface`.
    pub fn create_render_texture(
        &mut self,
        gl: &mut dyn GlDriver,
        contexts: &mut ContextSet,
        caps: &DriverCapabilities,
        surface: SurfaceDesc,
    ) -> Result<RttBacking> {
        match self {
            Self::Fbo(m) => m.create_render_texture(gl, contexts, caps, surface).map(RttBacking::Fbo),
            Self::PBuffer(m) => {
                m.request(gl, contexts, caps, surface.format, surface.width, surface.height)?;
                Ok(RttBacking::PBuffer)
            }
            Self::Copying(_) => Ok(RttBacking::Copy),
        }
    }

    pub fn destroy_render_texture(
        &mut self,
        gl: &mut dyn GlDriver,
        contexts: &mut ContextSet,
        backing: RttBacking,
        format: PixelFormat,
    ) -> Result<()> {
        match (self, backing) {
            (Self::Fbo(m), RttBacking::Fbo(id)) => m.destroy(gl, contexts, id)?,
            (Self::PBuffer(m), RttBacking::PBuffer) => m.release(gl, contexts, format)?,
            _ => {}
        }
        Ok(())
    }

    /// Context a target must render in, if the path ties it to one.
    #[must_use]
    pub fn render_context(&self, target: &RenderTarget) -> Option<ContextId> {
        match (self, target.kind()) {
            (_, TargetKind::Window { context, .. }) => Some(*context),
            (Self::Fbo(m), _) => target.fbo().and_then(|id| m.get(id)).and_then(|f| f.context()),
            (Self::PBuffer(m), TargetKind::RenderTexture { .. }) => m.context_for(target.format()),
            _ => None,
        }
    }

    /// Makes `target` the render destination in the current context.
    pub fn bind(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, target: &RenderTarget) -> Result<()> {
        match (self, target.kind()) {
            (Self::Fbo(m), _) if target.fbo().is_some() => m.bind(gl, contexts, target),
            (Self::PBuffer(m), TargetKind::RenderTexture { .. }) => m.bind(gl, contexts, target),
            (manager, _) => {
                // Windows, and the copying path, draw into the default
                // framebuffer of the current context.
                if let Self::Fbo(_) = manager {
                    let state = contexts.current_state()?;
                    state.bind_framebuffer(gl, FramebufferTarget::Framebuffer, 0, false);
                }
                Ok(())
            }
        }
    }

    /// Finishes rendering into `target`.
    pub fn unbind(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, target: &RenderTarget) -> Result<()> {
        match (self, target.kind()) {
            (Self::Fbo(m), _) if target.fbo().is_some() => m.unbind(gl, contexts),
            (Self::PBuffer(m), TargetKind::RenderTexture { .. }) => m.unbind(gl, contexts, target),
            (Self::Copying(m), TargetKind::RenderTexture { .. }) => m.unbind(gl, contexts, target),
            _ => Ok(()),
        }
    }
}
