//! Framebuffer-object render-to-texture path.
//!
//! Owns the compatibility table produced by the probe, the shared
//! multisample renderbuffers, and every framebuffer object in an arena.
//! Framebuffer names an operation lets go of are passed on to the
//! [`ContextSet`] before it returns, failed operations included.

use slotmap::SlotMap;

use glint_core::capabilities::DriverCapabilities;
use glint_core::errors::{GlintError, Result};
use glint_core::gl_types::FramebufferTarget;
use glint_core::handles::FboId;
use glint_core::settings::RenderSystemSettings;

use crate::context::ContextSet;
use crate::driver::GlDriver;
use crate::fbo::{ContextFramebuffers, DepthAttachment, FrameBufferObject};
use crate::probe::{CapabilityProbe, FormatCompatibilityTable};
use crate::state::StateCache;
use crate::surface::{RenderBufferPool, SurfaceDesc};
use crate::target::RenderTarget;

#[derive(Debug)]
pub struct FboManager {
    table: FormatCompatibilityTable,
    buffers: RenderBufferPool,
    fbos: SlotMap<FboId, FrameBufferObject>,
}

impl FboManager {
    /// Builds the compatibility table, probing the driver unless the
    /// settings turn probing off.
    pub fn new(
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        caps: &DriverCapabilities,
        settings: &RenderSystemSettings,
    ) -> Self {
        let table = if settings.probe_formats {
            CapabilityProbe::new(settings).run(gl, state, caps)
        } else {
            log::info!("[GL] : Format probing disabled; assuming every uncompressed format renders");
            FormatCompatibilityTable::assumed(settings.prefer_packed_depth_stencil)
        };
        Self {
            table,
            buffers: RenderBufferPool::new(),
            fbos: SlotMap::with_key(),
        }
    }

    #[inline]
    #[must_use]
    pub fn table(&self) -> &FormatCompatibilityTable {
        &self.table
    }

    #[inline]
    #[must_use]
    pub fn render_buffers(&self) -> &RenderBufferPool {
        &self.buffers
    }

    #[must_use]
    pub fn get(&self, id: FboId) -> Option<&FrameBufferObject> {
        self.fbos.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fbos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fbos.is_empty()
    }

    /// A framebuffer with `surface` in colour slot 0.
    pub fn create_render_texture(
        &mut self,
        gl: &mut dyn GlDriver,
        contexts: &mut ContextSet,
        caps: &DriverCapabilities,
        surface: SurfaceDesc,
    ) -> Result<FboId> {
        let current = contexts.current();
        let state = contexts.current_state()?;
        let mut fbo = FrameBufferObject::new(gl, caps, current, surface.samples);
        let surface = surface.with_samples(fbo.samples());
        if let Err(err) = fbo.bind_surface(gl, state, &mut self.buffers, 0, surface) {
            let names = fbo.destroy(gl, state, &mut self.buffers);
            delete_all(gl, contexts, names)?;
            return Err(err);
        }
        Ok(self.fbos.insert(fbo))
    }

    /// An empty framebuffer in the current context; surfaces are added with
    /// [`bind_surface`](Self::bind_surface).
    pub fn create_multi_render_target(
        &mut self,
        gl: &mut dyn GlDriver,
        contexts: &ContextSet,
        caps: &DriverCapabilities,
        samples: u32,
    ) -> FboId {
        let fbo = FrameBufferObject::new(gl, caps, contexts.current(), samples);
        self.fbos.insert(fbo)
    }

    /// Attaches a colour surface, moving the framebuffer into the current
    /// context first if it was created elsewhere.
    pub fn bind_surface(
        &mut self,
        gl: &mut dyn GlDriver,
        contexts: &mut ContextSet,
        id: FboId,
        slot: usize,
        surface: SurfaceDesc,
    ) -> Result<()> {
        let current = contexts.current();
        let state = contexts.current_state()?;
        let fbo = self.fbos.get_mut(id).ok_or(GlintError::UnknownFramebuffer)?;
        fbo.move_to_context(gl, current);
        let result = fbo.bind_surface(gl, state, &mut self.buffers, slot, surface);
        self.settle(gl, contexts, id)?;
        result
    }

    pub fn unbind_surface(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, id: FboId, slot: usize) -> Result<()> {
        let current = contexts.current();
        let state = contexts.current_state()?;
        let fbo = self.fbos.get_mut(id).ok_or(GlintError::UnknownFramebuffer)?;
        fbo.move_to_context(gl, current);
        let result = fbo.unbind_surface(gl, state, &mut self.buffers, slot);
        self.settle(gl, contexts, id)?;
        result
    }

    pub fn attach_depth(
        &mut self,
        gl: &mut dyn GlDriver,
        contexts: &mut ContextSet,
        id: FboId,
        depth: DepthAttachment,
    ) -> Result<()> {
        let current = contexts.current();
        let state = contexts.current_state()?;
        let fbo = self.fbos.get_mut(id).ok_or(GlintError::UnknownFramebuffer)?;
        let result = fbo.attach_depth_buffer(gl, state, &mut self.buffers, current, depth);
        self.settle(gl, contexts, id)?;
        result
    }

    pub fn detach_depth(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, id: FboId) -> Result<()> {
        let current = contexts.current();
        let state = contexts.current_state()?;
        let fbo = self.fbos.get_mut(id).ok_or(GlintError::UnknownFramebuffer)?;
        let result = fbo.detach_depth_buffer(gl, state, &mut self.buffers, current);
        self.settle(gl, contexts, id)?;
        result
    }

    pub fn swap_buffers(&self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, id: FboId) -> Result<()> {
        let fbo = self.fbos.get(id).ok_or(GlintError::UnknownFramebuffer)?;
        let current = contexts.current();
        fbo.swap_buffers(gl, contexts.current_state()?, current);
        Ok(())
    }

    pub fn bind(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, target: &RenderTarget) -> Result<()> {
        let id = target.fbo().ok_or(GlintError::UnknownFramebuffer)?;
        let current = contexts.current();
        let state = contexts.current_state()?;
        let fbo = self.fbos.get_mut(id).ok_or(GlintError::UnknownFramebuffer)?;
        let result = fbo.bind(gl, state, &mut self.buffers, current, true);
        self.settle(gl, contexts, id)?;
        if result? {
            log::debug!("Recreated FBO for target '{}' in context {current:?}", target.name());
        }
        Ok(())
    }

    pub fn unbind(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet) -> Result<()> {
        let state = contexts.current_state()?;
        state.bind_framebuffer(gl, FramebufferTarget::Framebuffer, 0, false);
        Ok(())
    }

    /// Destroys a framebuffer. Its names are deleted in the context that
    /// created them.
    pub fn destroy(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, id: FboId) -> Result<()> {
        let Some(fbo) = self.fbos.remove(id) else {
            return Ok(());
        };
        let names = fbo.destroy(gl, contexts.current_state()?, &mut self.buffers);
        delete_all(gl, contexts, names)
    }

    /// Hands names the framebuffer dropped to their contexts.
    fn settle(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, id: FboId) -> Result<()> {
        let names = self.fbos.get_mut(id).map(FrameBufferObject::take_orphaned).unwrap_or_default();
        delete_all(gl, contexts, names)
    }
}

fn delete_all(gl: &mut dyn GlDriver, contexts: &mut ContextSet, names: Vec<ContextFramebuffers>) -> Result<()> {
    for framebuffers in names {
        contexts.delete_framebuffers(gl, framebuffers)?;
    }
    Ok(())
}
