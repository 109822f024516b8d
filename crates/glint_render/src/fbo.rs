//! Framebuffer Objects
//!
//! A [`FrameBufferObject`] is one bindable off-screen target: up to
//! [`MAX_COLOUR_ATTACHMENTS`] colour surfaces, one depth and one stencil
//! renderbuffer, and an optional multisample companion used only for
//! resolve.
//!
//! # Multisampling
//!
//! ```text
//!   draw calls ──▶ multisample FB ──swap_buffers()──▶ primary FB ──▶ textures
//!                  (colour RB + depth)   blit/resolve   (colour surfaces)
//! ```
//!
//! With a multisample companion, rendering and depth attachment target the
//! companion; the primary framebuffer only receives resolved colour.
//!
//! # Contexts
//!
//! Framebuffer objects are not shared between contexts. Each FBO remembers
//! the context it was created in; [`FrameBufferObject::bind`] reports a
//! mismatch and can recreate the native objects in the caller's context.
//!
//! Names can only be deleted while their own context is current, so the
//! FBO never deletes them itself. Names it lets go of are queued as
//! [`ContextFramebuffers`] and handed to
//! [`ContextSet::delete_framebuffers`](crate::context::ContextSet::delete_framebuffers),
//! which deletes them now or when their context next becomes current.

use glint_core::capabilities::{DriverCapabilities, RenderCapabilities};
use glint_core::errors::{GlintError, Result};
use glint_core::format::PixelFormat;
use glint_core::gl_types::{
    Attachment, BlitFilter, BufferMask, DrawBuffer, FramebufferStatus, FramebufferTarget, GlName,
    Viewport,
};
use glint_core::handles::ContextId;

use crate::driver::GlDriver;
use crate::state::StateCache;
use crate::surface::{RenderBuffer, RenderBufferPool, SurfaceDesc};

/// Colour attachment slots per framebuffer.
pub const MAX_COLOUR_ATTACHMENTS: usize = 8;

/// Depth and stencil renderbuffers attached to a framebuffer. A packed
/// depth/stencil buffer appears in both fields; `0` means none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthAttachment {
    pub depth: GlName,
    pub stencil: GlName,
}

/// Framebuffer names that must be deleted in `context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFramebuffers {
    pub context: ContextId,
    pub names: [GlName; 2],
}

impl ContextFramebuffers {
    /// Deletes the framebuffers. `context` must be current.
    pub fn delete(&self, gl: &mut dyn GlDriver, state: &mut StateCache) {
        for name in self.names {
            state.delete_framebuffer(gl, name);
            state.invalidate_for_resource(name);
        }
    }
}

#[derive(Debug)]
pub struct FrameBufferObject {
    name: GlName,
    multisample_name: GlName,
    multisample_colour: Option<RenderBuffer>,
    samples: u32,
    context: Option<ContextId>,
    colour: [Option<SurfaceDesc>; MAX_COLOUR_ATTACHMENTS],
    depth: Option<DepthAttachment>,
    orphaned: Vec<ContextFramebuffers>,
}

impl FrameBufferObject {
    /// Creates an empty framebuffer in `context`.
    ///
    /// `samples` is clamped to the driver maximum; without separate
    /// multisample resolve support it is dropped to 0.
    pub fn new(gl: &mut dyn GlDriver, caps: &DriverCapabilities, context: ContextId, samples: u32) -> Self {
        let mut samples = samples.min(caps.max_samples);
        if samples > 0 && !caps.has(RenderCapabilities::SEPARATE_MULTISAMPLE_RESOLVE) {
            log::warn!("Multisample resolve unsupported; FBO falls back to single-sampled");
            samples = 0;
        }
        let name = gl.gen_framebuffer();
        let multisample_name = if samples > 0 { gl.gen_framebuffer() } else { 0 };
        Self {
            name,
            multisample_name,
            multisample_colour: None,
            samples,
            context: Some(context),
            colour: [None; MAX_COLOUR_ATTACHMENTS],
            depth: None,
            orphaned: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> GlName {
        self.name
    }

    /// Name of the multisample companion, 0 if there is none.
    #[inline]
    #[must_use]
    pub fn multisample_name(&self) -> GlName {
        self.multisample_name
    }

    /// Framebuffer that receives draw calls.
    #[inline]
    #[must_use]
    pub fn render_name(&self) -> GlName {
        if self.multisample_name != 0 {
            self.multisample_name
        } else {
            self.name
        }
    }

    #[inline]
    #[must_use]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    #[inline]
    #[must_use]
    pub fn surface(&self, slot: usize) -> Option<&SurfaceDesc> {
        self.colour.get(slot).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.colour[0].map_or(0, |s| s.width)
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.colour[0].map_or(0, |s| s.height)
    }

    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.colour[0].map_or(PixelFormat::None, |s| s.format)
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> Option<DepthAttachment> {
        self.depth
    }

    #[must_use]
    pub fn multisample_colour(&self) -> Option<&RenderBuffer> {
        self.multisample_colour.as_ref()
    }

    /// Names dropped since the last call, still waiting to be deleted in
    /// the context that created them.
    pub fn take_orphaned(&mut self) -> Vec<ContextFramebuffers> {
        std::mem::take(&mut self.orphaned)
    }

    // ── Attachments ──

    /// Attaches a colour surface at `slot`.
    ///
    /// The surface must agree in width, height and sample count with every
    /// surface already attached; a mismatch is rejected here rather than at
    /// bind time. Once slot 0 is populated the framebuffer is
    /// (re)initialised.
    pub fn bind_surface(
        &mut self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        buffers: &mut RenderBufferPool,
        slot: usize,
        surface: SurfaceDesc,
    ) -> Result<()> {
        if slot >= MAX_COLOUR_ATTACHMENTS {
            return Err(GlintError::AttachmentSlotOutOfRange {
                slot,
                max: MAX_COLOUR_ATTACHMENTS,
            });
        }
        for (other, existing) in self.colour.iter().enumerate() {
            if other == slot {
                continue;
            }
            if let Some(existing) = existing
                && existing.extent() != surface.extent()
            {
                return Err(GlintError::AttachmentSizeMismatch {
                    slot,
                    width: existing.width,
                    height: existing.height,
                    samples: existing.samples,
                    found_width: surface.width,
                    found_height: surface.height,
                    found_samples: surface.samples,
                });
            }
        }

        let previous = self.colour[slot].replace(surface);
        if self.colour[0].is_some()
            && let Err(err) = self.initialise(gl, state, buffers)
        {
            // A rejected surface must not stay attached.
            self.colour[slot] = previous;
            if self.colour[0].is_some()
                && let Err(restore) = self.initialise(gl, state, buffers)
            {
                log::warn!("FBO {} could not be restored after a rejected attachment: {restore}", self.name);
            }
            return Err(err);
        }
        Ok(())
    }

    /// Detaches the colour surface at `slot`.
    pub fn unbind_surface(
        &mut self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        buffers: &mut RenderBufferPool,
        slot: usize,
    ) -> Result<()> {
        if slot >= MAX_COLOUR_ATTACHMENTS {
            return Err(GlintError::AttachmentSlotOutOfRange {
                slot,
                max: MAX_COLOUR_ATTACHMENTS,
            });
        }
        self.colour[slot] = None;
        if self.colour[0].is_some() {
            self.initialise(gl, state, buffers)?;
        }
        Ok(())
    }

    /// Validates the attachments and (re)builds the native framebuffer.
    pub fn initialise(
        &mut self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        buffers: &mut RenderBufferPool,
    ) -> Result<()> {
        if let Some(old) = self.multisample_colour.take() {
            buffers.release(gl, state, &old);
        }

        let first = self.colour[0].ok_or(GlintError::MissingColourAttachment)?;
        for (slot, surface) in self.colour.iter().enumerate().skip(1) {
            let Some(surface) = surface else { continue };
            if surface.width != first.width || surface.height != first.height {
                return Err(GlintError::AttachmentSizeMismatch {
                    slot,
                    width: first.width,
                    height: first.height,
                    samples: first.samples,
                    found_width: surface.width,
                    found_height: surface.height,
                    found_samples: surface.samples,
                });
            }
            if surface.format != first.format {
                return Err(GlintError::AttachmentFormatMismatch {
                    slot,
                    expected: first.format,
                    found: surface.format,
                });
            }
        }

        state.bind_framebuffer(gl, FramebufferTarget::Framebuffer, self.name, false);
        for (slot, surface) in self.colour.iter().enumerate() {
            let attachment = Attachment::Colour(slot as u8);
            match surface {
                Some(surface) => surface.attach(gl, attachment),
                None => gl.framebuffer_renderbuffer(attachment, 0),
            }
        }

        if first.format == PixelFormat::None {
            gl.draw_buffers(&[DrawBuffer::None]);
            gl.read_buffer(DrawBuffer::None);
        } else {
            let last = self
                .colour
                .iter()
                .rposition(Option::is_some)
                .unwrap_or(0);
            let draw: Vec<DrawBuffer> = self.colour[..=last]
                .iter()
                .enumerate()
                .map(|(slot, s)| {
                    if s.is_some() {
                        DrawBuffer::Colour(slot as u8)
                    } else {
                        DrawBuffer::None
                    }
                })
                .collect();
            gl.draw_buffers(&draw);
            gl.read_buffer(DrawBuffer::Colour(0));
        }

        let mut status = if first.format == PixelFormat::None {
            // Depth-only framebuffers cannot be complete before a depth
            // buffer is attached.
            FramebufferStatus::Complete
        } else {
            gl.check_framebuffer_status()
        };

        if status.is_complete() && self.multisample_name != 0 && first.format != PixelFormat::None {
            let internal = first
                .format
                .gl_internal_format()
                .ok_or(GlintError::UnsupportedFormat(first.format))?;
            state.bind_framebuffer(gl, FramebufferTarget::Framebuffer, self.multisample_name, false);
            let colour = buffers.request(gl, state, internal, first.width, first.height, self.samples)?;
            gl.framebuffer_renderbuffer(Attachment::Colour(0), colour.name);
            self.multisample_colour = Some(colour);
            if let Some(depth) = self.depth {
                gl.framebuffer_renderbuffer(Attachment::Depth, depth.depth);
                gl.framebuffer_renderbuffer(Attachment::Stencil, depth.stencil);
            }
            status = gl.check_framebuffer_status();
        }

        state.bind_framebuffer(gl, FramebufferTarget::Framebuffer, 0, false);

        match status {
            FramebufferStatus::Complete => Ok(()),
            FramebufferStatus::Unsupported => Err(GlintError::UnsupportedFormatCombination {
                format: first.format,
            }),
            status => Err(GlintError::IncompleteFramebuffer { status }),
        }
    }

    /// Attaches depth (and stencil) renderbuffers to the framebuffer that
    /// receives draw calls, recreating the native objects first if they
    /// belong to another context.
    pub fn attach_depth_buffer(
        &mut self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        buffers: &mut RenderBufferPool,
        current: ContextId,
        depth: DepthAttachment,
    ) -> Result<()> {
        self.bind(gl, state, buffers, current, true)?;
        gl.framebuffer_renderbuffer(Attachment::Depth, depth.depth);
        gl.framebuffer_renderbuffer(Attachment::Stencil, depth.stencil);
        self.depth = Some(depth);
        Ok(())
    }

    /// Detaches depth and stencil. Native detachment only happens if the
    /// framebuffer lives in the current context.
    pub fn detach_depth_buffer(
        &mut self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        buffers: &mut RenderBufferPool,
        current: ContextId,
    ) -> Result<()> {
        let mismatch = self.bind(gl, state, buffers, current, false)?;
        if !mismatch && self.context.is_some() {
            gl.framebuffer_renderbuffer(Attachment::Depth, 0);
            gl.framebuffer_renderbuffer(Attachment::Stencil, 0);
        }
        self.depth = None;
        Ok(())
    }

    // ── Contexts ──

    /// Drops native objects created in a context other than `current`,
    /// queueing their names for deletion there. Returns whether anything
    /// was dropped.
    fn release_foreign(&mut self, current: ContextId) -> bool {
        let Some(owner) = self.context.filter(|&c| c != current) else {
            return false;
        };
        log::debug!("FBO {} belongs to another context; dropping native objects", self.name);
        self.orphaned.push(ContextFramebuffers {
            context: owner,
            names: [self.name, self.multisample_name],
        });
        self.context = None;
        self.name = 0;
        self.multisample_name = 0;
        self.depth = None;
        true
    }

    fn regenerate(&mut self, gl: &mut dyn GlDriver, current: ContextId) {
        self.context = Some(current);
        self.name = gl.gen_framebuffer();
        if self.samples > 0 {
            self.multisample_name = gl.gen_framebuffer();
        }
    }

    /// Makes sure the native objects live in `current`, generating fresh
    /// names if they were created elsewhere or dropped. Attachments are not
    /// rebuilt; the next [`initialise`](Self::initialise) does that.
    pub fn move_to_context(&mut self, gl: &mut dyn GlDriver, current: ContextId) -> bool {
        let moved = self.release_foreign(current);
        if self.context.is_none() {
            self.regenerate(gl, current);
        }
        moved
    }

    // ── Binding ──

    /// Makes this framebuffer the render destination.
    ///
    /// Returns `true` if the framebuffer was tied to a context other than
    /// `current`. Its native objects are then dropped and their names
    /// queued for [`take_orphaned`](Self::take_orphaned); with
    /// `recreate_if_needed` they are rebuilt in `current` and bound,
    /// otherwise nothing is bound and the caller must switch contexts first.
    pub fn bind(
        &mut self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        buffers: &mut RenderBufferPool,
        current: ContextId,
        recreate_if_needed: bool,
    ) -> Result<bool> {
        let mismatch = self.release_foreign(current);

        if self.context.is_none() && recreate_if_needed {
            self.regenerate(gl, current);
            if self.colour[0].is_some() {
                self.initialise(gl, state, buffers)?;
            }
        }

        if self.context.is_some() {
            state.bind_framebuffer(gl, FramebufferTarget::Framebuffer, self.render_name(), false);
        }
        Ok(mismatch)
    }

    /// Resolves the multisample companion into the primary framebuffer.
    /// Without a companion, or outside the framebuffer's context, this does
    /// nothing.
    pub fn swap_buffers(&self, gl: &mut dyn GlDriver, state: &mut StateCache, current: ContextId) {
        if self.multisample_name == 0 || self.context != Some(current) {
            return;
        }
        let previous = state.bound_framebuffer(FramebufferTarget::Draw).unwrap_or(0);
        let rect = Viewport::new(0, 0, self.width() as i32, self.height() as i32);

        state.bind_framebuffer(gl, FramebufferTarget::Read, self.multisample_name, false);
        state.bind_framebuffer(gl, FramebufferTarget::Draw, self.name, false);
        gl.blit_framebuffer(rect, rect, BufferMask::COLOUR, BlitFilter::Nearest);
        state.bind_framebuffer(gl, FramebufferTarget::Framebuffer, previous, false);
    }

    /// Returns the shared multisample colour buffer to the pool. The
    /// framebuffer names, its own and any still orphaned, come back for
    /// deletion in their contexts.
    #[must_use = "framebuffer names leak unless deleted in their context"]
    pub fn destroy(
        mut self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        buffers: &mut RenderBufferPool,
    ) -> Vec<ContextFramebuffers> {
        if let Some(colour) = self.multisample_colour.take() {
            buffers.release(gl, state, &colour);
        }
        if let Some(context) = self.context {
            self.orphaned.push(ContextFramebuffers {
                context,
                names: [self.name, self.multisample_name],
            });
        }
        self.orphaned
    }
}
