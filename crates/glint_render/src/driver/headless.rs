//! Headless Driver
//!
//! A software model of a GL driver. It keeps object storage, per-context
//! bindings and the sticky error flag, and evaluates framebuffer completeness
//! against a configurable [`HeadlessProfile`]. Nothing is rasterised.
//!
//! Every entry point increments a per-call counter so callers can assert how
//! many native calls an operation issued.
//!
//! # Completeness model
//!
//! ```text
//! no attachments                         → IncompleteMissingAttachment
//! attachment without storage             → IncompleteAttachment
//! mixed sample counts                    → IncompleteMultisample
//! format not renderable / illegal pair   → Unsupported
//! separate depth + stencil (if disabled) → Unsupported
//! draw buffer without attachment         → IncompleteDrawBuffer
//! ```
//!
//! With [`DriverQuirks::CORRUPT_AFTER_FAILED_PROBE`], a failed check poisons
//! the framebuffer it was made on and fails every later check until the
//! driver is flushed. Poisoned framebuffers stay broken until deleted.
//!
//! # Contexts
//!
//! Buffers, textures and renderbuffers are shared by every context.
//! Framebuffers are not: a framebuffer name only exists in the context that
//! generated it. Binding a foreign name fails with `GL_INVALID_OPERATION`
//! and deleting one is silently ignored, as drivers do for unknown names.
//! Destroying a context destroys its framebuffers.

use rustc_hash::{FxHashMap, FxHashSet};

use glint_core::capabilities::{DriverCapabilities, DriverQuirks, RenderCapabilities};
use glint_core::format::{DepthFormat, PixelFormat, StencilFormat};
use glint_core::gl_types::{
    Attachment, BlendEquation, BlendFactor, BlitFilter, BufferMask, BufferTarget, Capability,
    ColourMask, CompareFunc, CullFace, DrawBuffer, FramebufferStatus, FramebufferTarget, GlEnum,
    GlError, GlName, PolygonMode, ShadeModel, TexCoordGen, TexParam, TexParamValue,
    TextureTarget, Viewport,
};

use super::{GlDriver, MaterialParam, NativeContext};

/// Bytes charged per pixel per sample against the memory budget.
const BYTES_PER_SAMPLE: u64 = 4;

// ─── Profile ──────────────────────────────────────────────────────────────────

/// What the simulated driver accepts.
#[derive(Debug, Clone)]
pub struct HeadlessProfile {
    pub capabilities: DriverCapabilities,
    /// Colour internal formats usable as framebuffer attachments.
    pub colour_formats: FxHashSet<GlEnum>,
    /// Depth internal formats (packed ones included) usable as attachments.
    pub depth_formats: FxHashSet<GlEnum>,
    /// Stand-alone stencil internal formats usable as attachments.
    pub stencil_formats: FxHashSet<GlEnum>,
    /// Whether a depth buffer and a different stencil buffer may be attached
    /// together.
    pub separate_depth_stencil: bool,
    /// `(colour, depth-or-stencil)` internal format pairs the driver rejects.
    pub incompatible_pairs: Vec<(GlEnum, GlEnum)>,
    /// Total bytes of texture and renderbuffer storage before allocations
    /// fail with `GL_OUT_OF_MEMORY`.
    pub memory_budget: Option<u64>,
    /// Maximum number of live contexts, the initial one included.
    pub max_contexts: usize,
}

impl Default for HeadlessProfile {
    /// A desktop GL 3.3 driver: every uncompressed RGB(A) format renders,
    /// D16/D24/D32F and both packed formats are accepted, stencil only as
    /// S8, and depth and stencil cannot be split across two buffers.
    fn default() -> Self {
        let colour_formats = PixelFormat::ALL
            .iter()
            .filter(|f| {
                !f.is_compressed()
                    && !matches!(
                        f,
                        PixelFormat::L8 | PixelFormat::L16 | PixelFormat::A8 | PixelFormat::L8A8
                    )
            })
            .filter_map(|f| f.gl_internal_format())
            .collect();

        let depth_formats = [
            DepthFormat::D16,
            DepthFormat::D24,
            DepthFormat::D32F,
            DepthFormat::Packed24S8,
            DepthFormat::Packed32FS8,
        ]
        .iter()
        .filter_map(|d| d.gl_token())
        .collect();

        let stencil_formats = StencilFormat::S8.gl_token().into_iter().collect();

        Self {
            capabilities: DriverCapabilities::default(),
            colour_formats,
            depth_formats,
            stencil_formats,
            separate_depth_stencil: false,
            incompatible_pairs: Vec::new(),
            memory_budget: None,
            max_contexts: 16,
        }
    }
}

impl HeadlessProfile {
    /// A pre-FBO driver that can still create pbuffers.
    #[must_use]
    pub fn legacy() -> Self {
        let mut profile = Self::default();
        profile.capabilities.flags = RenderCapabilities::PBUFFER;
        profile.capabilities.num_multi_render_targets = 4;
        profile.capabilities.max_samples = 0;
        profile
    }

    #[must_use]
    pub fn without_capability(mut self, flag: RenderCapabilities) -> Self {
        self.capabilities.flags.remove(flag);
        self
    }

    #[must_use]
    pub fn with_capability(mut self, flag: RenderCapabilities) -> Self {
        self.capabilities.flags.insert(flag);
        self
    }

    #[must_use]
    pub fn with_quirks(mut self, quirks: DriverQuirks) -> Self {
        self.capabilities.quirks.insert(quirks);
        self
    }

    #[must_use]
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_separate_depth_stencil(mut self, allowed: bool) -> Self {
        self.separate_depth_stencil = allowed;
        self
    }

    #[must_use]
    pub fn with_texture_units(mut self, units: u32) -> Self {
        self.capabilities.num_texture_units = units;
        self
    }

    fn knows(&self, internal: GlEnum) -> bool {
        self.colour_formats.contains(&internal)
            || self.depth_formats.contains(&internal)
            || self.stencil_formats.contains(&internal)
    }
}

fn is_packed_token(internal: GlEnum) -> bool {
    DepthFormat::ALL
        .iter()
        .any(|d| d.is_packed() && d.gl_token() == Some(internal))
}

// ─── Internal Objects ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct Storage {
    internal: GlEnum,
    width: u32,
    height: u32,
    samples: u32,
    bytes: u64,
}

#[derive(Debug, Default)]
struct TextureObject {
    storage: Option<Storage>,
}

#[derive(Debug, Default)]
struct RenderbufferObject {
    storage: Option<Storage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Image {
    Texture(GlName),
    Renderbuffer(GlName),
}

#[derive(Debug)]
struct FramebufferObject {
    owner: u64,
    attachments: FxHashMap<Attachment, Image>,
    draw_buffers: Vec<DrawBuffer>,
    read_buffer: DrawBuffer,
}

impl FramebufferObject {
    fn new(owner: u64) -> Self {
        Self {
            owner,
            attachments: FxHashMap::default(),
            draw_buffers: vec![DrawBuffer::Colour(0)],
            read_buffer: DrawBuffer::Colour(0),
        }
    }
}

/// Bindings owned by one context.
#[derive(Debug)]
struct ContextState {
    draw_fb: GlName,
    read_fb: GlName,
    renderbuffer: GlName,
    active_unit: u32,
    textures: FxHashMap<(u32, TextureTarget), GlName>,
    buffers: FxHashMap<BufferTarget, GlName>,
    enabled: FxHashSet<Capability>,
    default_draw: DrawBuffer,
    default_read: DrawBuffer,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            draw_fb: 0,
            read_fb: 0,
            renderbuffer: 0,
            active_unit: 0,
            textures: FxHashMap::default(),
            buffers: FxHashMap::default(),
            enabled: FxHashSet::default(),
            default_draw: DrawBuffer::Back,
            default_read: DrawBuffer::Back,
        }
    }
}

/// One recorded `glBlitFramebuffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitRecord {
    pub read_framebuffer: GlName,
    pub draw_framebuffer: GlName,
    pub src: Viewport,
    pub dst: Viewport,
    pub mask: BufferMask,
    pub filter: BlitFilter,
}

// ─── Driver ───────────────────────────────────────────────────────────────────

pub struct HeadlessDriver {
    profile: HeadlessProfile,
    next_name: GlName,
    buffers: FxHashSet<GlName>,
    textures: FxHashMap<GlName, TextureObject>,
    renderbuffers: FxHashMap<GlName, RenderbufferObject>,
    framebuffers: FxHashMap<GlName, FramebufferObject>,
    contexts: FxHashMap<u64, ContextState>,
    current: u64,
    next_context: u64,
    error: GlError,
    allocated: u64,
    poisoned: FxHashSet<GlName>,
    needs_flush: bool,
    calls: FxHashMap<&'static str, usize>,
    blits: Vec<BlitRecord>,
    tex_images: Vec<GlEnum>,
    foreign_deletes: usize,
}

impl HeadlessDriver {
    #[must_use]
    pub fn new(profile: HeadlessProfile) -> Self {
        let mut contexts = FxHashMap::default();
        contexts.insert(1, ContextState::default());
        Self {
            profile,
            next_name: 1,
            buffers: FxHashSet::default(),
            textures: FxHashMap::default(),
            renderbuffers: FxHashMap::default(),
            framebuffers: FxHashMap::default(),
            contexts,
            current: 1,
            next_context: 2,
            error: GlError::NoError,
            allocated: 0,
            poisoned: FxHashSet::default(),
            needs_flush: false,
            calls: FxHashMap::default(),
            blits: Vec::new(),
            tex_images: Vec::new(),
            foreign_deletes: 0,
        }
    }

    // ── Inspection ──

    #[must_use]
    pub fn profile(&self) -> &HeadlessProfile {
        &self.profile
    }

    /// Number of times the named entry point was called, e.g.
    /// `"bind_buffer"` or `"check_framebuffer_status"`.
    #[must_use]
    pub fn call_count(&self, call: &str) -> usize {
        self.calls.get(call).copied().unwrap_or(0)
    }

    /// Sum of all call counters.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.values().sum()
    }

    pub fn reset_call_counts(&mut self) {
        self.calls.clear();
    }

    #[must_use]
    pub fn blits(&self) -> &[BlitRecord] {
        &self.blits
    }

    /// Internal formats passed to `tex_image_2d`, in call order.
    #[must_use]
    pub fn tex_image_formats(&self) -> &[GlEnum] {
        &self.tex_images
    }

    #[must_use]
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated
    }

    #[must_use]
    pub fn live_renderbuffers(&self) -> usize {
        self.renderbuffers.len()
    }

    #[must_use]
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    /// Framebuffers generated in `context` and not yet deleted.
    #[must_use]
    pub fn live_framebuffers_in(&self, context: NativeContext) -> usize {
        self.framebuffers.values().filter(|fb| fb.owner == context.0).count()
    }

    /// Context a framebuffer name belongs to.
    #[must_use]
    pub fn framebuffer_owner(&self, name: GlName) -> Option<NativeContext> {
        self.framebuffers.get(&name).map(|fb| NativeContext(fb.owner))
    }

    /// `delete_framebuffer` calls that named a framebuffer of another
    /// context and were ignored.
    #[must_use]
    pub fn foreign_framebuffer_deletes(&self) -> usize {
        self.foreign_deletes
    }

    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn live_contexts(&self) -> usize {
        self.contexts.len()
    }

    /// Framebuffer bound to `target` in the current context.
    #[must_use]
    pub fn bound_framebuffer(&self, target: FramebufferTarget) -> GlName {
        self.contexts.get(&self.current).map_or(0, |ctx| match target {
            FramebufferTarget::Framebuffer | FramebufferTarget::Draw => ctx.draw_fb,
            FramebufferTarget::Read => ctx.read_fb,
        })
    }

    #[must_use]
    pub fn bound_buffer(&self, target: BufferTarget) -> GlName {
        self.contexts
            .get(&self.current)
            .and_then(|ctx| ctx.buffers.get(&target).copied())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_enabled(&self, cap: Capability) -> bool {
        self.contexts
            .get(&self.current)
            .is_some_and(|ctx| ctx.enabled.contains(&cap))
    }

    /// Renderbuffer attached at `attachment` of framebuffer `fb`.
    #[must_use]
    pub fn attached_renderbuffer(&self, fb: GlName, attachment: Attachment) -> Option<GlName> {
        match self.framebuffers.get(&fb)?.attachments.get(&attachment)? {
            Image::Renderbuffer(name) => Some(*name),
            Image::Texture(_) => None,
        }
    }

    /// `(width, height, samples)` of a renderbuffer's storage.
    #[must_use]
    pub fn renderbuffer_extent(&self, name: GlName) -> Option<(u32, u32, u32)> {
        let storage = self.renderbuffers.get(&name)?.storage?;
        Some((storage.width, storage.height, storage.samples))
    }

    // ── Internals ──

    fn count(&mut self, call: &'static str) {
        *self.calls.entry(call).or_insert(0) += 1;
    }

    fn record_error(&mut self, error: GlError) {
        if self.error == GlError::NoError {
            self.error = error;
        }
    }

    fn gen_name(&mut self) -> GlName {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    fn ctx(&mut self) -> &mut ContextState {
        self.contexts.entry(self.current).or_default()
    }

    /// Whether `name` is a framebuffer of the current context.
    fn owns_framebuffer(&self, name: GlName) -> bool {
        self.framebuffers.get(&name).is_some_and(|fb| fb.owner == self.current)
    }

    fn release_bytes(&mut self, storage: Option<Storage>) {
        if let Some(storage) = storage {
            self.allocated = self.allocated.saturating_sub(storage.bytes);
        }
    }

    /// Charges `bytes` against the budget, recording `GL_OUT_OF_MEMORY` on
    /// failure.
    fn reserve(&mut self, bytes: u64) -> bool {
        if let Some(budget) = self.profile.memory_budget
            && self.allocated + bytes > budget
        {
            self.record_error(GlError::OutOfMemory);
            return false;
        }
        self.allocated += bytes;
        true
    }

    fn image_storage(&self, image: Image) -> Option<Storage> {
        match image {
            Image::Texture(name) => self.textures.get(&name)?.storage,
            Image::Renderbuffer(name) => self.renderbuffers.get(&name)?.storage,
        }
    }

    fn evaluate(&self, fb: GlName) -> FramebufferStatus {
        if self.needs_flush || self.poisoned.contains(&fb) {
            return FramebufferStatus::Unsupported;
        }
        let Some(object) = self.framebuffers.get(&fb) else {
            return FramebufferStatus::Undefined;
        };
        if object.attachments.is_empty() {
            return FramebufferStatus::IncompleteMissingAttachment;
        }

        let mut samples = None;
        let mut colours = Vec::new();
        let mut depth = None;
        let mut stencil = None;
        for (&attachment, &image) in &object.attachments {
            let Some(storage) = self.image_storage(image) else {
                return FramebufferStatus::IncompleteAttachment;
            };
            match samples {
                None => samples = Some(storage.samples),
                Some(s) if s != storage.samples => {
                    return FramebufferStatus::IncompleteMultisample;
                }
                Some(_) => {}
            }
            match attachment {
                Attachment::Colour(_) => colours.push(storage.internal),
                Attachment::Depth => depth = Some((image, storage.internal)),
                Attachment::Stencil => stencil = Some((image, storage.internal)),
            }
        }

        if colours
            .iter()
            .any(|c| !self.profile.colour_formats.contains(c))
        {
            return FramebufferStatus::Unsupported;
        }
        if let Some((_, internal)) = depth
            && !self.profile.depth_formats.contains(&internal)
        {
            return FramebufferStatus::Unsupported;
        }
        if let Some((image, internal)) = stencil {
            let shares_packed = depth.is_some_and(|(d, _)| d == image) && is_packed_token(internal);
            if !shares_packed {
                let legal = self.profile.stencil_formats.contains(&internal)
                    || (is_packed_token(internal) && self.profile.depth_formats.contains(&internal));
                if !legal {
                    return FramebufferStatus::Unsupported;
                }
                if depth.is_some() && !self.profile.separate_depth_stencil {
                    return FramebufferStatus::Unsupported;
                }
            }
        }
        for colour in &colours {
            for ds in depth.iter().chain(stencil.iter()).map(|(_, i)| *i) {
                if self.profile.incompatible_pairs.contains(&(*colour, ds)) {
                    return FramebufferStatus::Unsupported;
                }
            }
        }

        for buffer in &object.draw_buffers {
            if let DrawBuffer::Colour(i) = buffer
                && !object.attachments.contains_key(&Attachment::Colour(*i))
            {
                return FramebufferStatus::IncompleteDrawBuffer;
            }
        }
        FramebufferStatus::Complete
    }
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new(HeadlessProfile::default())
    }
}

impl GlDriver for HeadlessDriver {
    fn capabilities(&self) -> DriverCapabilities {
        self.profile.capabilities.clone()
    }

    // ── Object names ──

    fn gen_buffer(&mut self) -> GlName {
        self.count("gen_buffer");
        let name = self.gen_name();
        self.buffers.insert(name);
        name
    }

    fn gen_texture(&mut self) -> GlName {
        self.count("gen_texture");
        let name = self.gen_name();
        self.textures.insert(name, TextureObject::default());
        name
    }

    fn gen_framebuffer(&mut self) -> GlName {
        self.count("gen_framebuffer");
        let name = self.gen_name();
        self.framebuffers.insert(name, FramebufferObject::new(self.current));
        name
    }

    fn gen_renderbuffer(&mut self) -> GlName {
        self.count("gen_renderbuffer");
        let name = self.gen_name();
        self.renderbuffers.insert(name, RenderbufferObject::default());
        name
    }

    fn delete_buffer(&mut self, name: GlName) {
        self.count("delete_buffer");
        self.buffers.remove(&name);
        for ctx in self.contexts.values_mut() {
            ctx.buffers.retain(|_, bound| *bound != name);
        }
    }

    fn delete_texture(&mut self, name: GlName) {
        self.count("delete_texture");
        if let Some(texture) = self.textures.remove(&name) {
            self.release_bytes(texture.storage);
        }
        for ctx in self.contexts.values_mut() {
            ctx.textures.retain(|_, bound| *bound != name);
        }
    }

    fn delete_framebuffer(&mut self, name: GlName) {
        self.count("delete_framebuffer");
        if !self.owns_framebuffer(name) {
            if self.framebuffers.contains_key(&name) {
                self.foreign_deletes += 1;
            }
            return;
        }
        self.framebuffers.remove(&name);
        self.poisoned.remove(&name);
        let ctx = self.ctx();
        if ctx.draw_fb == name {
            ctx.draw_fb = 0;
        }
        if ctx.read_fb == name {
            ctx.read_fb = 0;
        }
    }

    fn delete_renderbuffer(&mut self, name: GlName) {
        self.count("delete_renderbuffer");
        if let Some(rb) = self.renderbuffers.remove(&name) {
            self.release_bytes(rb.storage);
        }
        for ctx in self.contexts.values_mut() {
            if ctx.renderbuffer == name {
                ctx.renderbuffer = 0;
            }
        }
    }

    // ── Binding ──

    fn bind_buffer(&mut self, target: BufferTarget, name: GlName) {
        self.count("bind_buffer");
        self.ctx().buffers.insert(target, name);
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget, name: GlName) {
        self.count("bind_framebuffer");
        if name != 0 && !self.owns_framebuffer(name) {
            self.record_error(GlError::InvalidOperation);
            return;
        }
        let ctx = self.ctx();
        match target {
            FramebufferTarget::Framebuffer => {
                ctx.draw_fb = name;
                ctx.read_fb = name;
            }
            FramebufferTarget::Draw => ctx.draw_fb = name,
            FramebufferTarget::Read => ctx.read_fb = name,
        }
    }

    fn bind_renderbuffer(&mut self, name: GlName) {
        self.count("bind_renderbuffer");
        self.ctx().renderbuffer = name;
    }

    fn active_texture(&mut self, unit: u32) {
        self.count("active_texture");
        if unit >= self.profile.capabilities.num_texture_units {
            self.record_error(GlError::InvalidEnum);
            return;
        }
        self.ctx().active_unit = unit;
    }

    fn bind_texture(&mut self, target: TextureTarget, name: GlName) {
        self.count("bind_texture");
        let ctx = self.ctx();
        let unit = ctx.active_unit;
        ctx.textures.insert((unit, target), name);
    }

    fn tex_parameter(&mut self, _target: TextureTarget, _param: TexParam, _value: TexParamValue) {
        self.count("tex_parameter");
    }

    // ── Render state ──

    fn set_enabled(&mut self, cap: Capability, enabled: bool) {
        self.count("set_enabled");
        let ctx = self.ctx();
        if enabled {
            ctx.enabled.insert(cap);
        } else {
            ctx.enabled.remove(&cap);
        }
    }

    fn blend_func_separate(&mut self, _: BlendFactor, _: BlendFactor, _: BlendFactor, _: BlendFactor) {
        self.count("blend_func_separate");
    }

    fn blend_equation_separate(&mut self, _rgb: BlendEquation, _alpha: BlendEquation) {
        self.count("blend_equation_separate");
    }

    fn depth_func(&mut self, _func: CompareFunc) {
        self.count("depth_func");
    }

    fn depth_mask(&mut self, _write: bool) {
        self.count("depth_mask");
    }

    fn clear_depth(&mut self, _depth: f32) {
        self.count("clear_depth");
    }

    fn cull_face(&mut self, _face: CullFace) {
        self.count("cull_face");
    }

    fn polygon_mode(&mut self, _mode: PolygonMode) {
        self.count("polygon_mode");
    }

    fn shade_model(&mut self, _model: ShadeModel) {
        self.count("shade_model");
    }

    fn stencil_mask(&mut self, _mask: u32) {
        self.count("stencil_mask");
    }

    fn clear_colour(&mut self, _colour: [f32; 4]) {
        self.count("clear_colour");
    }

    fn colour_mask(&mut self, _mask: ColourMask) {
        self.count("colour_mask");
    }

    fn viewport(&mut self, _viewport: Viewport) {
        self.count("viewport");
    }

    // ── Fixed function ──

    fn material(&mut self, _param: MaterialParam, _value: [f32; 4]) {
        self.count("material");
    }

    fn shininess(&mut self, _value: f32) {
        self.count("shininess");
    }

    fn light_model_ambient(&mut self, _value: [f32; 4]) {
        self.count("light_model_ambient");
    }

    fn point_size(&mut self, _size: f32) {
        self.count("point_size");
    }

    fn point_parameters(&mut self, _attenuation: [f32; 3], _min: f32, _max: f32) {
        self.count("point_parameters");
    }

    fn tex_coord_gen(&mut self, _mode: Option<TexCoordGen>) {
        self.count("tex_coord_gen");
    }

    // ── Storage ──

    fn tex_image_2d(&mut self, target: TextureTarget, _level: u32, internal: GlEnum, width: u32, height: u32) {
        self.count("tex_image_2d");
        self.tex_images.push(internal);
        let ctx = self.ctx();
        let unit = ctx.active_unit;
        let name = ctx.textures.get(&(unit, target)).copied().unwrap_or(0);
        if name == 0 || !self.textures.contains_key(&name) {
            self.record_error(GlError::InvalidOperation);
            return;
        }

        let old = self.textures.get_mut(&name).and_then(|t| t.storage.take());
        self.release_bytes(old);
        let bytes = u64::from(width) * u64::from(height) * BYTES_PER_SAMPLE;
        if !self.reserve(bytes) {
            return;
        }
        if let Some(texture) = self.textures.get_mut(&name) {
            texture.storage = Some(Storage {
                internal,
                width,
                height,
                samples: 0,
                bytes,
            });
        }
    }

    fn renderbuffer_storage(&mut self, internal: GlEnum, width: u32, height: u32, samples: u32) {
        self.count("renderbuffer_storage");
        let name = self.ctx().renderbuffer;
        if name == 0 || !self.renderbuffers.contains_key(&name) {
            self.record_error(GlError::InvalidOperation);
            return;
        }
        if !self.profile.knows(internal) {
            self.record_error(GlError::InvalidEnum);
            return;
        }
        if samples > self.profile.capabilities.max_samples {
            self.record_error(GlError::InvalidValue);
            return;
        }

        let old = self.renderbuffers.get_mut(&name).and_then(|rb| rb.storage.take());
        self.release_bytes(old);
        let bytes = u64::from(width) * u64::from(height) * u64::from(samples.max(1)) * BYTES_PER_SAMPLE;
        if !self.reserve(bytes) {
            return;
        }
        if let Some(rb) = self.renderbuffers.get_mut(&name) {
            rb.storage = Some(Storage {
                internal,
                width,
                height,
                samples,
                bytes,
            });
        }
    }

    // ── Framebuffers ──

    fn framebuffer_texture(
        &mut self,
        attachment: Attachment,
        _target: TextureTarget,
        name: GlName,
        _level: u32,
        _layer: u32,
    ) {
        self.count("framebuffer_texture");
        let fb = self.ctx().draw_fb;
        let Some(object) = self.framebuffers.get_mut(&fb) else {
            self.record_error(GlError::InvalidOperation);
            return;
        };
        if name == 0 {
            object.attachments.remove(&attachment);
        } else {
            object.attachments.insert(attachment, Image::Texture(name));
        }
    }

    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, name: GlName) {
        self.count("framebuffer_renderbuffer");
        let fb = self.ctx().draw_fb;
        let Some(object) = self.framebuffers.get_mut(&fb) else {
            self.record_error(GlError::InvalidOperation);
            return;
        };
        if name == 0 {
            object.attachments.remove(&attachment);
        } else {
            object.attachments.insert(attachment, Image::Renderbuffer(name));
        }
    }

    fn check_framebuffer_status(&mut self) -> FramebufferStatus {
        self.count("check_framebuffer_status");
        let fb = self.ctx().draw_fb;
        if fb == 0 {
            return FramebufferStatus::Complete;
        }
        let status = self.evaluate(fb);
        if !status.is_complete()
            && self
                .profile
                .capabilities
                .has_quirk(DriverQuirks::CORRUPT_AFTER_FAILED_PROBE)
        {
            self.poisoned.insert(fb);
            self.needs_flush = true;
        }
        status
    }

    fn draw_buffers(&mut self, buffers: &[DrawBuffer]) {
        self.count("draw_buffers");
        let fb = self.ctx().draw_fb;
        if fb == 0 {
            let first = buffers.first().copied().unwrap_or(DrawBuffer::None);
            self.ctx().default_draw = first;
        } else if let Some(object) = self.framebuffers.get_mut(&fb) {
            object.draw_buffers = buffers.to_vec();
        }
    }

    fn read_buffer(&mut self, buffer: DrawBuffer) {
        self.count("read_buffer");
        let fb = self.ctx().read_fb;
        if fb == 0 {
            self.ctx().default_read = buffer;
        } else if let Some(object) = self.framebuffers.get_mut(&fb) {
            object.read_buffer = buffer;
        }
    }

    fn current_draw_buffer(&self) -> DrawBuffer {
        let Some(ctx) = self.contexts.get(&self.current) else {
            return DrawBuffer::None;
        };
        if ctx.draw_fb == 0 {
            return ctx.default_draw;
        }
        self.framebuffers
            .get(&ctx.draw_fb)
            .and_then(|fb| fb.draw_buffers.first().copied())
            .unwrap_or(DrawBuffer::None)
    }

    fn current_read_buffer(&self) -> DrawBuffer {
        let Some(ctx) = self.contexts.get(&self.current) else {
            return DrawBuffer::None;
        };
        if ctx.read_fb == 0 {
            return ctx.default_read;
        }
        self.framebuffers
            .get(&ctx.read_fb)
            .map_or(DrawBuffer::None, |fb| fb.read_buffer)
    }

    fn blit_framebuffer(&mut self, src: Viewport, dst: Viewport, mask: BufferMask, filter: BlitFilter) {
        self.count("blit_framebuffer");
        let ctx = self.ctx();
        let record = BlitRecord {
            read_framebuffer: ctx.read_fb,
            draw_framebuffer: ctx.draw_fb,
            src,
            dst,
            mask,
            filter,
        };
        self.blits.push(record);
    }

    fn copy_tex_sub_image_2d(&mut self, _target: TextureTarget, _level: u32, _width: u32, _height: u32) {
        self.count("copy_tex_sub_image_2d");
    }

    // ── Synchronisation & errors ──

    fn get_error(&mut self) -> GlError {
        self.count("get_error");
        std::mem::replace(&mut self.error, GlError::NoError)
    }

    fn flush(&mut self) {
        self.count("flush");
        self.needs_flush = false;
    }

    fn finish(&mut self) {
        self.count("finish");
        self.needs_flush = false;
    }

    fn internal_format_renderable(&mut self, internal: GlEnum) -> bool {
        self.count("internal_format_renderable");
        self.profile.knows(internal)
    }

    // ── Contexts ──

    fn current_context(&self) -> NativeContext {
        NativeContext(self.current)
    }

    fn make_current(&mut self, context: NativeContext) {
        self.count("make_current");
        if self.contexts.contains_key(&context.0) {
            self.current = context.0;
        } else {
            self.record_error(GlError::InvalidOperation);
        }
    }

    fn create_shared_context(&mut self, share_with: NativeContext) -> Option<NativeContext> {
        self.count("create_shared_context");
        if !self.contexts.contains_key(&share_with.0) || self.contexts.len() >= self.profile.max_contexts {
            return None;
        }
        let id = self.next_context;
        self.next_context += 1;
        self.contexts.insert(id, ContextState::default());
        Some(NativeContext(id))
    }

    fn create_pbuffer(&mut self, internal: GlEnum, width: u32, height: u32) -> Option<NativeContext> {
        self.count("create_pbuffer");
        if !self.profile.capabilities.has(RenderCapabilities::PBUFFER)
            || self.contexts.len() >= self.profile.max_contexts
        {
            return None;
        }
        let bytes = u64::from(width) * u64::from(height) * BYTES_PER_SAMPLE;
        if internal == 0 || !self.reserve(bytes) {
            return None;
        }
        let id = self.next_context;
        self.next_context += 1;
        self.contexts.insert(id, ContextState::default());
        Some(NativeContext(id))
    }

    fn destroy_context(&mut self, context: NativeContext) {
        self.count("destroy_context");
        if self.contexts.remove(&context.0).is_some() {
            self.framebuffers.retain(|_, fb| fb.owner != context.0);
            let framebuffers = &self.framebuffers;
            self.poisoned.retain(|name| framebuffers.contains_key(name));
        }
    }
}
