//! Driver seam.
//!
//! Every native GL call made by this crate goes through [`GlDriver`]. The
//! state cache decides *whether* a call is needed; the driver only executes
//! it. A binding for a real GL loader implements this trait directly; the
//! [`HeadlessDriver`] models a GL driver in software for tests and for hosts
//! without a GPU.
//!
//! The trait is deliberately close to the GL entry points: one method per
//! call, no caching, no validation beyond what GL itself performs.

mod headless;

pub use headless::{BlitRecord, HeadlessDriver, HeadlessProfile};

use glint_core::capabilities::DriverCapabilities;
use glint_core::gl_types::{
    Attachment, BlendEquation, BlendFactor, BlitFilter, BufferMask, BufferTarget, Capability,
    ColourMask, CompareFunc, CullFace, DrawBuffer, FramebufferStatus, FramebufferTarget, GlEnum,
    GlError, GlName, PolygonMode, ShadeModel, TexCoordGen, TexParam, TexParamValue,
    TextureTarget, Viewport,
};

/// Opaque native context handle (`HGLRC`, `GLXContext`, `EGLContext`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeContext(pub u64);

/// Fixed-function material colour slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialParam {
    Ambient,
    Diffuse,
    Specular,
    Emission,
}

pub trait GlDriver {
    /// Queries what the driver supports. Called once at startup.
    fn capabilities(&self) -> DriverCapabilities;

    // ── Object names ──
    fn gen_buffer(&mut self) -> GlName;
    fn gen_texture(&mut self) -> GlName;
    fn gen_framebuffer(&mut self) -> GlName;
    fn gen_renderbuffer(&mut self) -> GlName;
    fn delete_buffer(&mut self, name: GlName);
    fn delete_texture(&mut self, name: GlName);
    fn delete_framebuffer(&mut self, name: GlName);
    fn delete_renderbuffer(&mut self, name: GlName);

    // ── Binding ──
    fn bind_buffer(&mut self, target: BufferTarget, name: GlName);
    fn bind_framebuffer(&mut self, target: FramebufferTarget, name: GlName);
    fn bind_renderbuffer(&mut self, name: GlName);
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, target: TextureTarget, name: GlName);
    fn tex_parameter(&mut self, target: TextureTarget, param: TexParam, value: TexParamValue);

    // ── Render state ──
    fn set_enabled(&mut self, cap: Capability, enabled: bool);
    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );
    fn blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation);
    fn depth_func(&mut self, func: CompareFunc);
    fn depth_mask(&mut self, write: bool);
    fn clear_depth(&mut self, depth: f32);
    fn cull_face(&mut self, face: CullFace);
    fn polygon_mode(&mut self, mode: PolygonMode);
    fn shade_model(&mut self, model: ShadeModel);
    fn stencil_mask(&mut self, mask: u32);
    fn clear_colour(&mut self, colour: [f32; 4]);
    fn colour_mask(&mut self, mask: ColourMask);
    fn viewport(&mut self, viewport: Viewport);

    // ── Fixed function ──
    fn material(&mut self, param: MaterialParam, value: [f32; 4]);
    fn shininess(&mut self, value: f32);
    fn light_model_ambient(&mut self, value: [f32; 4]);
    fn point_size(&mut self, size: f32);
    fn point_parameters(&mut self, attenuation: [f32; 3], min: f32, max: f32);
    /// Sets coordinate generation for the active texture unit; `None`
    /// disables it.
    fn tex_coord_gen(&mut self, mode: Option<TexCoordGen>);

    // ── Storage ──
    fn tex_image_2d(&mut self, target: TextureTarget, level: u32, internal: GlEnum, width: u32, height: u32);
    /// Allocates storage for the bound renderbuffer. `samples == 0` means
    /// single-sampled.
    fn renderbuffer_storage(&mut self, internal: GlEnum, width: u32, height: u32, samples: u32);

    // ── Framebuffers ──
    fn framebuffer_texture(
        &mut self,
        attachment: Attachment,
        target: TextureTarget,
        name: GlName,
        level: u32,
        layer: u32,
    );
    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, name: GlName);
    /// Completeness of the framebuffer bound for drawing.
    fn check_framebuffer_status(&mut self) -> FramebufferStatus;
    fn draw_buffers(&mut self, buffers: &[DrawBuffer]);
    fn read_buffer(&mut self, buffer: DrawBuffer);
    fn current_draw_buffer(&self) -> DrawBuffer;
    fn current_read_buffer(&self) -> DrawBuffer;
    fn blit_framebuffer(&mut self, src: Viewport, dst: Viewport, mask: BufferMask, filter: BlitFilter);
    /// Copies from the read framebuffer into the bound texture.
    fn copy_tex_sub_image_2d(&mut self, target: TextureTarget, level: u32, width: u32, height: u32);

    // ── Synchronisation & errors ──
    fn get_error(&mut self) -> GlError;
    fn flush(&mut self);
    fn finish(&mut self);

    /// `glGetInternalformativ(GL_RENDERBUFFER, internal, GL_FRAMEBUFFER_RENDERABLE)`
    /// reports full support. Only meaningful with
    /// [`RenderCapabilities::INTERNAL_FORMAT_QUERY`](glint_core::RenderCapabilities::INTERNAL_FORMAT_QUERY).
    fn internal_format_renderable(&mut self, internal: GlEnum) -> bool;

    // ── Contexts ──
    fn current_context(&self) -> NativeContext;
    fn make_current(&mut self, context: NativeContext);
    /// Creates a context sharing objects with `share_with`.
    fn create_shared_context(&mut self, share_with: NativeContext) -> Option<NativeContext>;
    /// Creates an off-screen pbuffer context.
    fn create_pbuffer(&mut self, internal: GlEnum, width: u32, height: u32) -> Option<NativeContext>;
    fn destroy_context(&mut self, context: NativeContext);
}
