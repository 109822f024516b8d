//! Capability Probe
//!
//! Driver extension strings do not reliably say which colour/depth/stencil
//! combinations a driver accepts for off-screen rendering. The probe finds
//! out empirically, once at startup, by building a small scratch framebuffer
//! for every colour format and trying every depth/stencil candidate on it.
//!
//! # Algorithm
//!
//! ```text
//! for colour in PixelFormat::ALL
//!     skip: no native token (except PixelFormat::None), compressed,
//!           non-RGB under ATI_NON_RGB_CRASH
//!     scratch FBO + 16×16 colour texture
//!     valid = colour is None || status == Complete
//!     for depth in DepthFormat::ALL
//!         separate:  for stencil in StencilFormat::ALL → try (depth, stencil)
//!         packed:    try packed buffer on depth + stencil
//! ```
//!
//! Results go into a [`FormatCompatibilityTable`], which ranks every
//! format's modes by [`DepthStencilMode::desirability`] and is read-only
//! afterwards.
//!
//! With [`RenderCapabilities::INTERNAL_FORMAT_QUERY`] the probe asks the
//! driver about each token instead of building attachments.

use std::fmt::Write as _;

use glint_core::capabilities::{DriverCapabilities, DriverQuirks, RenderCapabilities};
use glint_core::format::{DepthFormat, DepthStencilMode, PixelFormat, StencilFormat};
use glint_core::gl_types::{
    Attachment, DrawBuffer, FramebufferTarget, GlEnum, GlError, GlName, TexParam, TexParamValue,
    TextureTarget,
};
use glint_core::settings::RenderSystemSettings;

use crate::driver::GlDriver;
use crate::state::StateCache;

// GL_NEAREST / GL_CLAMP_TO_EDGE
const GL_NEAREST: i32 = 0x2600;
const GL_CLAMP_TO_EDGE: i32 = 0x812F;

// ─── FormatCompatibilityTable ─────────────────────────────────────────────────

/// Probe result for one colour format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatProperties {
    /// The format can be rendered to.
    pub valid: bool,
    /// Legal depth/stencil modes, most desirable first.
    pub modes: Vec<DepthStencilMode>,
}

/// Per-format list of legal depth/stencil modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatCompatibilityTable {
    properties: Vec<FormatProperties>,
    prefer_packed: bool,
}

impl FormatCompatibilityTable {
    /// An empty table; every format is invalid.
    #[must_use]
    pub fn new(prefer_packed: bool) -> Self {
        Self {
            properties: vec![FormatProperties::default(); PixelFormat::COUNT],
            prefer_packed,
        }
    }

    /// A table built without probing: every uncompressed format with a
    /// native token is assumed renderable without depth or stencil.
    #[must_use]
    pub fn assumed(prefer_packed: bool) -> Self {
        let mut table = Self::new(prefer_packed);
        for format in PixelFormat::ALL {
            if format.is_compressed() || (format != PixelFormat::None && format.gl_internal_format().is_none()) {
                continue;
            }
            table.record(format, Vec::new());
        }
        table
    }

    /// Marks `format` valid with `modes`, ranking them.
    ///
    /// Equal scores keep probe order. A valid format with no legal modes
    /// receives the no-depth/no-stencil mode so the list is never empty.
    pub fn record(&mut self, format: PixelFormat, mut modes: Vec<DepthStencilMode>) {
        if modes.is_empty() {
            modes.push(DepthStencilMode::NONE);
        }
        let prefer_packed = self.prefer_packed;
        modes.sort_by_key(|m| std::cmp::Reverse(m.desirability(prefer_packed)));
        self.properties[format.index()] = FormatProperties { valid: true, modes };
    }

    #[inline]
    #[must_use]
    pub fn properties(&self, format: PixelFormat) -> &FormatProperties {
        &self.properties[format.index()]
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self, format: PixelFormat) -> bool {
        self.properties[format.index()].valid
    }

    #[inline]
    #[must_use]
    pub fn modes(&self, format: PixelFormat) -> &[DepthStencilMode] {
        &self.properties[format.index()].modes
    }

    #[inline]
    #[must_use]
    pub fn prefers_packed(&self) -> bool {
        self.prefer_packed
    }

    pub fn valid_formats(&self) -> impl Iterator<Item = PixelFormat> + '_ {
        PixelFormat::ALL.into_iter().filter(|f| self.is_valid(*f))
    }

    /// Best legal depth/stencil mode for a colour format.
    ///
    /// Without `want_stencil` only stencil-free modes are considered, so an
    /// unwanted stencil plane is never allocated even when a combined
    /// format scores higher. Invalid formats get the no-depth mode.
    #[must_use]
    pub fn best_depth_stencil(&self, format: PixelFormat, want_stencil: bool) -> DepthStencilMode {
        self.modes(format)
            .iter()
            .copied()
            .find(|m| want_stencil || !m.has_stencil())
            .unwrap_or(DepthStencilMode::NONE)
    }
}

// ─── CapabilityProbe ──────────────────────────────────────────────────────────

/// Scratch framebuffer with an optional colour texture.
struct Scratch {
    framebuffer: GlName,
    texture: GlName,
}

pub struct CapabilityProbe {
    size: u32,
    prefer_packed: bool,
}

impl CapabilityProbe {
    #[must_use]
    pub fn new(settings: &RenderSystemSettings) -> Self {
        Self {
            size: settings.probe_size.max(1),
            prefer_packed: settings.prefer_packed_depth_stencil,
        }
    }

    /// Probes every colour format and builds the compatibility table.
    ///
    /// All binds go through `state`. The framebuffer binding and the draw
    /// and read buffers are restored afterwards.
    pub fn run(
        &self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        caps: &DriverCapabilities,
    ) -> FormatCompatibilityTable {
        let use_query = caps.has(RenderCapabilities::INTERNAL_FORMAT_QUERY);
        let packed_supported = caps.has(RenderCapabilities::PACKED_DEPTH_STENCIL);
        let ati = caps.has_quirk(DriverQuirks::ATI_NON_RGB_CRASH);
        let corrupting = caps.has_quirk(DriverQuirks::CORRUPT_AFTER_FAILED_PROBE);

        let previous_fb = state.bound_framebuffer(FramebufferTarget::Draw).unwrap_or(0);
        let old_draw = gl.current_draw_buffer();
        let old_read = gl.current_read_buffer();

        let mut table = FormatCompatibilityTable::new(self.prefer_packed);

        for format in PixelFormat::ALL {
            let token = format.gl_internal_format();
            if token.is_none() && format != PixelFormat::None {
                continue;
            }
            if format.is_compressed() {
                continue;
            }
            if ati && token.is_some() && !format.has_rgb() {
                continue;
            }

            let modes = if use_query {
                let supported = token.is_none_or(|t| gl.internal_format_renderable(t));
                supported.then(|| self.query_modes(gl, packed_supported))
            } else {
                let mut scratch = self.create_scratch(gl, state, token);
                let supported = token.is_none() || gl.check_framebuffer_status().is_complete();
                let modes = if supported {
                    Some(self.try_modes(gl, state, token, &mut scratch, packed_supported, corrupting))
                } else {
                    if corrupting {
                        gl.flush();
                    }
                    None
                };
                self.destroy_scratch(gl, state, scratch);
                modes
            };

            if let Some(modes) = modes {
                let mut line = format!("FBO {} depth/stencil support: ", format.name());
                for mode in &modes {
                    let _ = write!(line, "{mode} ");
                }
                log::info!("{}", line.trim_end());
                table.record(format, modes);
            }

            if caps.has_quirk(DriverQuirks::FINISH_BETWEEN_PROBES) {
                gl.finish();
            }
        }

        state.bind_framebuffer(gl, FramebufferTarget::Framebuffer, previous_fb, false);
        gl.draw_buffers(&[old_draw]);
        gl.read_buffer(old_read);

        let valid: Vec<&str> = table.valid_formats().map(PixelFormat::name).collect();
        log::info!("[GL] : Valid FBO targets {}", valid.join(" "));
        table
    }

    fn query_modes(&self, gl: &mut dyn GlDriver, packed_supported: bool) -> Vec<DepthStencilMode> {
        let mut modes = Vec::new();
        for depth in DepthFormat::ALL {
            if depth.is_packed() {
                if packed_supported && depth.gl_token().is_some_and(|t| gl.internal_format_renderable(t)) {
                    modes.push(DepthStencilMode::new(depth, StencilFormat::None));
                }
                continue;
            }
            if let Some(t) = depth.gl_token()
                && !gl.internal_format_renderable(t)
            {
                continue;
            }
            for stencil in StencilFormat::ALL {
                if stencil.gl_token().is_none_or(|t| gl.internal_format_renderable(t)) {
                    modes.push(DepthStencilMode::new(depth, stencil));
                }
            }
        }
        modes
    }

    fn try_modes(
        &self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        token: Option<GlEnum>,
        scratch: &mut Scratch,
        packed_supported: bool,
        corrupting: bool,
    ) -> Vec<DepthStencilMode> {
        let mut modes = Vec::new();
        for depth in DepthFormat::ALL {
            if depth.is_packed() {
                if !packed_supported {
                    continue;
                }
                let ok = self.try_packed_format(gl, state, depth);
                if ok {
                    modes.push(DepthStencilMode::new(depth, StencilFormat::None));
                } else if corrupting {
                    self.reset_scratch(gl, state, token, scratch);
                }
                continue;
            }
            for stencil in StencilFormat::ALL {
                let ok = self.try_format(gl, state, depth, stencil);
                if ok {
                    modes.push(DepthStencilMode::new(depth, stencil));
                } else if corrupting {
                    self.reset_scratch(gl, state, token, scratch);
                }
            }
        }
        modes
    }

    /// Attaches separate depth and stencil renderbuffers to the bound scratch
    /// framebuffer and reports whether the result is complete and error
    /// free.
    fn try_format(
        &self,
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        depth: DepthFormat,
        stencil: StencilFormat,
    ) -> bool {
        let mut failed = false;
        let mut depth_rb = 0;
        let mut stencil_rb = 0;

        if let Some(token) = depth.gl_token() {
            depth_rb = gl.gen_renderbuffer();
            state.bind_renderbuffer(gl, depth_rb, false);
            gl.renderbuffer_storage(token, self.size, self.size, 0);
            gl.framebuffer_renderbuffer(Attachment::Depth, depth_rb);
        }
        if let Some(token) = stencil.gl_token() {
            stencil_rb = gl.gen_renderbuffer();
            state.bind_renderbuffer(gl, stencil_rb, false);
            let _ = gl.get_error();
            gl.renderbuffer_storage(token, self.size, self.size, 0);
            failed |= gl.get_error() != GlError::NoError;
            gl.framebuffer_renderbuffer(Attachment::Stencil, stencil_rb);
            failed |= gl.get_error() != GlError::NoError;
        }

        let status = gl.check_framebuffer_status();

        gl.framebuffer_renderbuffer(Attachment::Depth, 0);
        gl.framebuffer_renderbuffer(Attachment::Stencil, 0);
        state.delete_renderbuffer(gl, depth_rb);
        state.delete_renderbuffer(gl, stencil_rb);
        let _ = gl.get_error();

        status.is_complete() && !failed
    }

    /// Attaches one packed depth/stencil renderbuffer to both attachment
    /// points of the bound scratch framebuffer.
    fn try_packed_format(&self, gl: &mut dyn GlDriver, state: &mut StateCache, depth: DepthFormat) -> bool {
        let Some(token) = depth.gl_token() else {
            return false;
        };
        let mut failed = false;
        let packed_rb = gl.gen_renderbuffer();
        state.bind_renderbuffer(gl, packed_rb, false);
        gl.renderbuffer_storage(token, self.size, self.size, 0);
        let _ = gl.get_error();

        gl.framebuffer_renderbuffer(Attachment::Depth, packed_rb);
        failed |= gl.get_error() != GlError::NoError;
        gl.framebuffer_renderbuffer(Attachment::Stencil, packed_rb);
        failed |= gl.get_error() != GlError::NoError;

        let status = gl.check_framebuffer_status();

        gl.framebuffer_renderbuffer(Attachment::Depth, 0);
        gl.framebuffer_renderbuffer(Attachment::Stencil, 0);
        state.delete_renderbuffer(gl, packed_rb);
        let _ = gl.get_error();

        status.is_complete() && !failed
    }

    // ── Scratch objects ──

    fn create_scratch(&self, gl: &mut dyn GlDriver, state: &mut StateCache, token: Option<GlEnum>) -> Scratch {
        let framebuffer = gl.gen_framebuffer();
        state.bind_framebuffer(gl, FramebufferTarget::Framebuffer, framebuffer, false);

        let texture = match token {
            Some(token) => {
                let target = TextureTarget::Texture2D;
                let texture = gl.gen_texture();
                state.bind_texture(gl, target, texture, false);
                // Some drivers reject incomplete mip chains.
                state.tex_parameter(gl, target, TexParam::MaxLevel, TexParamValue::Int(0));
                state.tex_parameter(gl, target, TexParam::MinFilter, TexParamValue::Int(GL_NEAREST));
                state.tex_parameter(gl, target, TexParam::MagFilter, TexParamValue::Int(GL_NEAREST));
                state.tex_parameter(gl, target, TexParam::WrapS, TexParamValue::Int(GL_CLAMP_TO_EDGE));
                state.tex_parameter(gl, target, TexParam::WrapT, TexParamValue::Int(GL_CLAMP_TO_EDGE));
                gl.tex_image_2d(target, 0, token, self.size, self.size);
                gl.framebuffer_texture(Attachment::Colour(0), target, texture, 0, 0);
                texture
            }
            None => {
                gl.draw_buffers(&[DrawBuffer::None]);
                gl.read_buffer(DrawBuffer::None);
                0
            }
        };
        Scratch { framebuffer, texture }
    }

    fn destroy_scratch(&self, gl: &mut dyn GlDriver, state: &mut StateCache, scratch: Scratch) {
        state.bind_framebuffer(gl, FramebufferTarget::Framebuffer, 0, false);
        state.delete_framebuffer(gl, scratch.framebuffer);
        state.delete_texture(gl, scratch.texture);
    }

    /// Full reset after a failed attempt on a driver that corrupts state:
    /// flush the pipeline and rebuild the scratch objects.
    fn reset_scratch(&self, gl: &mut dyn GlDriver, state: &mut StateCache, token: Option<GlEnum>, scratch: &mut Scratch) {
        log::debug!("Resetting probe scratch objects after a failed attempt");
        gl.flush();
        gl.finish();
        let old = std::mem::replace(scratch, Scratch { framebuffer: 0, texture: 0 });
        self.destroy_scratch(gl, state, old);
        *scratch = self.create_scratch(gl, state, token);
    }
}
