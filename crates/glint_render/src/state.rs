//! State Cache
//!
//! Host-side mirror of one GL context's state. Every state-mutating call the
//! crate makes goes through a [`StateCache`], which compares the requested
//! value with the last value it issued and skips the driver call when they
//! match.
//!
//! # Design
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       StateCache                          │
//! │                                                           │
//! │  buffers:      BufferTarget        → GlName               │
//! │  framebuffers: draw / read         → GlName               │
//! │  textures:     (unit, target)      → GlName               │
//! │  tex_params:   texture → (param    → value)               │
//! │  enabled:      Capability          → bool                 │
//! │  fixed state:  blend, depth, cull, masks, clear, viewport │
//! │                                                           │
//! │  set_*(gl, v)  → compare → issue or skip                  │
//! │  invalidate_for_resource(name) → forget every entry = name│
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! - A cached value is always the value last issued to the driver for that
//!   binding point. Anything that may change driver state behind the cache's
//!   back (destroying a resource, another library touching the context) must
//!   be followed by [`StateCache::invalidate_for_resource`] or
//!   [`StateCache::clear_cache`].
//! - One cache per context. Caches are never shared: two contexts can hold
//!   different bindings for the same target.
//! - Missing entries mean "unknown"; the next set always issues.

use rustc_hash::FxHashMap;

use glint_core::capabilities::{DriverCapabilities, RenderCapabilities};
use glint_core::gl_types::{
    BlendEquation, BlendFactor, BufferTarget, Capability, ColourMask, CompareFunc, CullFace,
    FramebufferTarget, GlName, PolygonMode, ShadeModel, TexCoordGen, TexParam, TexParamValue,
    TextureTarget, Viewport,
};

use crate::driver::{GlDriver, MaterialParam};

// ─── Defaults ─────────────────────────────────────────────────────────────────

const DEFAULT_AMBIENT: [f32; 4] = [0.2, 0.2, 0.2, 1.0];
const DEFAULT_DIFFUSE: [f32; 4] = [0.8, 0.8, 0.8, 1.0];
const DEFAULT_SPECULAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const DEFAULT_EMISSIVE: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const DEFAULT_LIGHT_AMBIENT: [f32; 4] = [0.2, 0.2, 0.2, 1.0];
const DEFAULT_ATTENUATION: [f32; 3] = [1.0, 0.0, 0.0];

/// Capabilities whose initial value the cache assumes after a reset, with
/// the GL default for each.
const DEFAULT_CAPABILITIES: [(Capability, bool); 7] = [
    (Capability::Blend, false),
    (Capability::DepthTest, false),
    (Capability::CullFace, false),
    (Capability::StencilTest, false),
    (Capability::ScissorTest, false),
    (Capability::PolygonOffsetFill, false),
    (Capability::Multisample, true),
];

// ─── Public Types ─────────────────────────────────────────────────────────────

/// Blend factors and equations for colour and alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub equation_rgb: BlendEquation,
    pub equation_alpha: BlendEquation,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            src_rgb: BlendFactor::One,
            dst_rgb: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            equation_rgb: BlendEquation::Add,
            equation_alpha: BlendEquation::Add,
        }
    }
}

/// Counters of calls issued to the driver versus calls elided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub issued: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MaterialState {
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    emissive: [f32; 4],
    shininess: f32,
    light_ambient: [f32; 4],
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            ambient: DEFAULT_AMBIENT,
            diffuse: DEFAULT_DIFFUSE,
            specular: DEFAULT_SPECULAR,
            emissive: DEFAULT_EMISSIVE,
            shininess: 0.0,
            light_ambient: DEFAULT_LIGHT_AMBIENT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PointState {
    size: f32,
    min: f32,
    max: f32,
    attenuation: [f32; 3],
}

impl Default for PointState {
    fn default() -> Self {
        Self {
            size: 1.0,
            min: 1.0,
            max: 1.0,
            attenuation: DEFAULT_ATTENUATION,
        }
    }
}

// ─── StateCache ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StateCache {
    num_texture_units: u32,
    separate_blend: bool,

    buffers: FxHashMap<BufferTarget, GlName>,
    draw_framebuffer: Option<GlName>,
    read_framebuffer: Option<GlName>,
    renderbuffer: Option<GlName>,
    active_unit: u32,
    textures: FxHashMap<(u32, TextureTarget), GlName>,
    tex_params: FxHashMap<GlName, FxHashMap<(TextureTarget, TexParam), TexParamValue>>,
    tex_coord_gen: FxHashMap<u32, Option<TexCoordGen>>,
    enabled: FxHashMap<Capability, bool>,

    blend: BlendState,
    depth_func: CompareFunc,
    depth_mask: bool,
    clear_depth: f32,
    cull_face: CullFace,
    polygon_mode: PolygonMode,
    shade_model: ShadeModel,
    stencil_mask: u32,
    clear_colour: [f32; 4],
    colour_mask: ColourMask,
    viewport: Viewport,
    material: MaterialState,
    point: PointState,

    stats: CacheStats,
}

impl StateCache {
    /// Creates a cache for a context of a driver with `caps`.
    ///
    /// The cache starts in the reset state; call
    /// [`initialize_cache`](Self::initialize_cache) once the context is
    /// current to bring the driver in line with it.
    #[must_use]
    pub fn new(caps: &DriverCapabilities) -> Self {
        let mut cache = Self {
            num_texture_units: caps.num_texture_units,
            separate_blend: caps.has(RenderCapabilities::BLEND_EQUATION_SEPARATE),
            buffers: FxHashMap::default(),
            draw_framebuffer: None,
            read_framebuffer: None,
            renderbuffer: None,
            active_unit: 0,
            textures: FxHashMap::default(),
            tex_params: FxHashMap::default(),
            tex_coord_gen: FxHashMap::default(),
            enabled: FxHashMap::default(),
            blend: BlendState::default(),
            depth_func: CompareFunc::Less,
            depth_mask: true,
            clear_depth: 1.0,
            cull_face: CullFace::Back,
            polygon_mode: PolygonMode::Fill,
            shade_model: ShadeModel::Smooth,
            stencil_mask: u32::MAX,
            clear_colour: [0.0; 4],
            colour_mask: ColourMask::ALL,
            viewport: Viewport::default(),
            material: MaterialState::default(),
            point: PointState::default(),
            stats: CacheStats::default(),
        };
        cache.clear_cache();
        cache
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    #[inline]
    fn issued(&mut self) {
        self.stats.issued += 1;
    }

    #[inline]
    fn skipped(&mut self) {
        self.stats.skipped += 1;
    }

    // ── Lifecycle ──

    /// Resets every cached value to the GL defaults for a fresh context.
    ///
    /// Bindings are forgotten rather than assumed to be zero, so the first
    /// bind after a reset always reaches the driver.
    pub fn clear_cache(&mut self) {
        self.buffers.clear();
        self.draw_framebuffer = None;
        self.read_framebuffer = None;
        self.renderbuffer = None;
        self.textures.clear();
        self.tex_params.clear();
        self.tex_coord_gen.clear();
        self.active_unit = 0;

        self.enabled.clear();
        self.enabled.extend(DEFAULT_CAPABILITIES);

        self.blend = BlendState::default();
        self.depth_func = CompareFunc::Less;
        self.depth_mask = true;
        self.clear_depth = 1.0;
        self.cull_face = CullFace::Back;
        self.polygon_mode = PolygonMode::Fill;
        self.shade_model = ShadeModel::Smooth;
        self.stencil_mask = u32::MAX;
        self.clear_colour = [0.0; 4];
        self.colour_mask = ColourMask::ALL;
        self.viewport = Viewport::default();
        self.material = MaterialState::default();
        self.point = PointState::default();
    }

    /// Resets the cache and pushes every default to the driver
    /// unconditionally. Run once per freshly created context.
    pub fn initialize_cache(&mut self, gl: &mut dyn GlDriver) {
        self.clear_cache();

        for (cap, enabled) in DEFAULT_CAPABILITIES {
            gl.set_enabled(cap, enabled);
        }
        gl.active_texture(0);
        gl.blend_equation_separate(self.blend.equation_rgb, self.blend.equation_alpha);
        gl.blend_func_separate(
            self.blend.src_rgb,
            self.blend.dst_rgb,
            self.blend.src_alpha,
            self.blend.dst_alpha,
        );
        gl.cull_face(self.cull_face);
        gl.depth_func(self.depth_func);
        gl.depth_mask(self.depth_mask);
        gl.stencil_mask(self.stencil_mask);
        gl.clear_depth(self.clear_depth);
        gl.clear_colour(self.clear_colour);
        gl.colour_mask(self.colour_mask);
        gl.polygon_mode(self.polygon_mode);
        gl.shade_model(self.shade_model);
        gl.material(MaterialParam::Ambient, self.material.ambient);
        gl.material(MaterialParam::Diffuse, self.material.diffuse);
        gl.material(MaterialParam::Specular, self.material.specular);
        gl.material(MaterialParam::Emission, self.material.emissive);
        gl.shininess(self.material.shininess);
        gl.light_model_ambient(self.material.light_ambient);
        gl.point_size(self.point.size);
        gl.point_parameters(self.point.attenuation, self.point.min, self.point.max);
        self.active_unit = 0;
    }

    /// Forgets every cached binding that refers to `name`.
    ///
    /// Call whenever a texture, buffer, framebuffer or renderbuffer is
    /// destroyed without going through this cache, so that a later object
    /// reusing the same name is bound for real.
    pub fn invalidate_for_resource(&mut self, name: GlName) {
        if name == 0 {
            return;
        }
        self.buffers.retain(|_, bound| *bound != name);
        self.textures.retain(|_, bound| *bound != name);
        self.tex_params.remove(&name);
        if self.draw_framebuffer == Some(name) {
            self.draw_framebuffer = None;
        }
        if self.read_framebuffer == Some(name) {
            self.read_framebuffer = None;
        }
        if self.renderbuffer == Some(name) {
            self.renderbuffer = None;
        }
    }

    // ── Object binding ──

    /// Binds `name` to `target` unless it is already bound there.
    /// `force` always issues the call.
    pub fn bind_buffer(&mut self, gl: &mut dyn GlDriver, target: BufferTarget, name: GlName, force: bool) {
        if !force && self.buffers.get(&target) == Some(&name) {
            self.skipped();
            return;
        }
        self.buffers.insert(target, name);
        gl.bind_buffer(target, name);
        self.issued();
    }

    /// Deletes a buffer and resets any binding that pointed at it to zero.
    /// Name 0 is never deleted.
    pub fn delete_buffer(&mut self, gl: &mut dyn GlDriver, name: GlName) {
        if name == 0 {
            return;
        }
        gl.delete_buffer(name);
        for bound in self.buffers.values_mut() {
            if *bound == name {
                *bound = 0;
            }
        }
    }

    #[must_use]
    pub fn bound_buffer(&self, target: BufferTarget) -> Option<GlName> {
        self.buffers.get(&target).copied()
    }

    pub fn bind_framebuffer(
        &mut self,
        gl: &mut dyn GlDriver,
        target: FramebufferTarget,
        name: GlName,
        force: bool,
    ) {
        let current = match target {
            FramebufferTarget::Framebuffer => {
                (self.draw_framebuffer == Some(name) && self.read_framebuffer == Some(name))
                    .then_some(name)
            }
            FramebufferTarget::Draw => self.draw_framebuffer,
            FramebufferTarget::Read => self.read_framebuffer,
        };
        if !force && current == Some(name) {
            self.skipped();
            return;
        }
        match target {
            FramebufferTarget::Framebuffer => {
                self.draw_framebuffer = Some(name);
                self.read_framebuffer = Some(name);
            }
            FramebufferTarget::Draw => self.draw_framebuffer = Some(name),
            FramebufferTarget::Read => self.read_framebuffer = Some(name),
        }
        gl.bind_framebuffer(target, name);
        self.issued();
    }

    /// Deletes a framebuffer, resetting the draw/read bindings that pointed
    /// at it to zero.
    pub fn delete_framebuffer(&mut self, gl: &mut dyn GlDriver, name: GlName) {
        if name == 0 {
            return;
        }
        gl.delete_framebuffer(name);
        if self.draw_framebuffer == Some(name) {
            self.draw_framebuffer = Some(0);
        }
        if self.read_framebuffer == Some(name) {
            self.read_framebuffer = Some(0);
        }
    }

    #[must_use]
    pub fn bound_framebuffer(&self, target: FramebufferTarget) -> Option<GlName> {
        match target {
            FramebufferTarget::Framebuffer | FramebufferTarget::Draw => self.draw_framebuffer,
            FramebufferTarget::Read => self.read_framebuffer,
        }
    }

    pub fn bind_renderbuffer(&mut self, gl: &mut dyn GlDriver, name: GlName, force: bool) {
        if !force && self.renderbuffer == Some(name) {
            self.skipped();
            return;
        }
        self.renderbuffer = Some(name);
        gl.bind_renderbuffer(name);
        self.issued();
    }

    pub fn delete_renderbuffer(&mut self, gl: &mut dyn GlDriver, name: GlName) {
        if name == 0 {
            return;
        }
        gl.delete_renderbuffer(name);
        if self.renderbuffer == Some(name) {
            self.renderbuffer = Some(0);
        }
    }

    // ── Textures ──

    /// Binds `name` to `target` on the active texture unit.
    pub fn bind_texture(&mut self, gl: &mut dyn GlDriver, target: TextureTarget, name: GlName, force: bool) {
        let key = (self.active_unit, target);
        if !force && self.textures.get(&key) == Some(&name) {
            self.skipped();
            return;
        }
        self.textures.insert(key, name);
        gl.bind_texture(target, name);
        self.issued();
    }

    /// Deletes a texture, resetting its bindings on every unit to zero and
    /// dropping its cached parameters.
    pub fn delete_texture(&mut self, gl: &mut dyn GlDriver, name: GlName) {
        if name == 0 {
            return;
        }
        gl.delete_texture(name);
        for bound in self.textures.values_mut() {
            if *bound == name {
                *bound = 0;
            }
        }
        self.tex_params.remove(&name);
    }

    #[must_use]
    pub fn bound_texture(&self, unit: u32, target: TextureTarget) -> Option<GlName> {
        self.textures.get(&(unit, target)).copied()
    }

    /// Sets a parameter of the texture bound to `target` on the active unit.
    ///
    /// Parameters are cached per texture, so rebinding a texture does not
    /// force its parameters to be re-sent. With nothing bound the call is
    /// always issued.
    pub fn tex_parameter(
        &mut self,
        gl: &mut dyn GlDriver,
        target: TextureTarget,
        param: TexParam,
        value: TexParamValue,
    ) {
        let bound = self
            .textures
            .get(&(self.active_unit, target))
            .copied()
            .unwrap_or(0);
        if bound != 0 {
            let params = self.tex_params.entry(bound).or_default();
            if params.get(&(target, param)) == Some(&value) {
                self.skipped();
                return;
            }
            params.insert((target, param), value);
        }
        gl.tex_parameter(target, param, value);
        self.issued();
    }

    /// Makes `unit` the active texture unit.
    ///
    /// Returns `false` when the driver does not have that many units; no
    /// texture state may be set for such a unit. Unit 0 is always usable.
    pub fn activate_unit(&mut self, gl: &mut dyn GlDriver, unit: u32) -> bool {
        if self.active_unit == unit {
            self.skipped();
            return true;
        }
        if unit < self.num_texture_units {
            gl.active_texture(unit);
            self.active_unit = unit;
            self.issued();
            true
        } else if unit == 0 {
            true
        } else {
            log::warn!(
                "Texture unit {unit} exceeds the {} units reported by the driver",
                self.num_texture_units
            );
            false
        }
    }

    #[inline]
    #[must_use]
    pub fn active_unit(&self) -> u32 {
        self.active_unit
    }

    /// Enables coordinate generation on `unit`, or disables it with `None`.
    /// Returns `false` if the unit is out of range.
    pub fn set_tex_coord_gen(&mut self, gl: &mut dyn GlDriver, unit: u32, mode: Option<TexCoordGen>) -> bool {
        if self.tex_coord_gen.get(&unit) == Some(&mode) {
            self.skipped();
            return true;
        }
        if !self.activate_unit(gl, unit) {
            return false;
        }
        self.tex_coord_gen.insert(unit, mode);
        gl.tex_coord_gen(mode);
        self.issued();
        true
    }

    // ── Capabilities ──

    pub fn set_enabled(&mut self, gl: &mut dyn GlDriver, cap: Capability, enabled: bool) {
        if self.enabled.get(&cap) == Some(&enabled) {
            self.skipped();
            return;
        }
        self.enabled.insert(cap, enabled);
        gl.set_enabled(cap, enabled);
        self.issued();
    }

    #[must_use]
    pub fn is_enabled(&self, cap: Capability) -> Option<bool> {
        self.enabled.get(&cap).copied()
    }

    // ── Blending ──

    pub fn set_blend_func(&mut self, gl: &mut dyn GlDriver, src: BlendFactor, dst: BlendFactor) {
        self.set_blend_func_separate(gl, src, dst, src, dst);
    }

    /// Sets separate colour and alpha blend factors. Without driver support
    /// for separate blending the colour factors are used for both.
    pub fn set_blend_func_separate(
        &mut self,
        gl: &mut dyn GlDriver,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        let (src_alpha, dst_alpha) = if self.separate_blend {
            (src_alpha, dst_alpha)
        } else {
            (src_rgb, dst_rgb)
        };
        let b = &self.blend;
        if b.src_rgb == src_rgb && b.dst_rgb == dst_rgb && b.src_alpha == src_alpha && b.dst_alpha == dst_alpha {
            self.skipped();
            return;
        }
        self.blend.src_rgb = src_rgb;
        self.blend.dst_rgb = dst_rgb;
        self.blend.src_alpha = src_alpha;
        self.blend.dst_alpha = dst_alpha;
        gl.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
        self.issued();
    }

    pub fn set_blend_equation(&mut self, gl: &mut dyn GlDriver, equation: BlendEquation) {
        self.set_blend_equation_separate(gl, equation, equation);
    }

    /// Sets separate colour and alpha blend equations. Without driver
    /// support for separate blending the colour equation is used for both.
    pub fn set_blend_equation_separate(&mut self, gl: &mut dyn GlDriver, rgb: BlendEquation, alpha: BlendEquation) {
        let alpha = if self.separate_blend { alpha } else { rgb };
        if self.blend.equation_rgb == rgb && self.blend.equation_alpha == alpha {
            self.skipped();
            return;
        }
        self.blend.equation_rgb = rgb;
        self.blend.equation_alpha = alpha;
        gl.blend_equation_separate(rgb, alpha);
        self.issued();
    }

    #[inline]
    #[must_use]
    pub fn blend_state(&self) -> BlendState {
        self.blend
    }

    // ── Depth ──

    pub fn set_depth_func(&mut self, gl: &mut dyn GlDriver, func: CompareFunc) {
        if self.depth_func == func {
            self.skipped();
            return;
        }
        self.depth_func = func;
        gl.depth_func(func);
        self.issued();
    }

    pub fn set_depth_mask(&mut self, gl: &mut dyn GlDriver, write: bool) {
        if self.depth_mask == write {
            self.skipped();
            return;
        }
        self.depth_mask = write;
        gl.depth_mask(write);
        self.issued();
    }

    pub fn set_clear_depth(&mut self, gl: &mut dyn GlDriver, depth: f32) {
        if self.clear_depth.to_bits() == depth.to_bits() {
            self.skipped();
            return;
        }
        self.clear_depth = depth;
        gl.clear_depth(depth);
        self.issued();
    }

    #[inline]
    #[must_use]
    pub fn depth_func(&self) -> CompareFunc {
        self.depth_func
    }

    #[inline]
    #[must_use]
    pub fn depth_mask(&self) -> bool {
        self.depth_mask
    }

    // ── Rasterisation ──

    pub fn set_cull_face(&mut self, gl: &mut dyn GlDriver, face: CullFace) {
        if self.cull_face == face {
            self.skipped();
            return;
        }
        self.cull_face = face;
        gl.cull_face(face);
        self.issued();
    }

    pub fn set_polygon_mode(&mut self, gl: &mut dyn GlDriver, mode: PolygonMode) {
        if self.polygon_mode == mode {
            self.skipped();
            return;
        }
        self.polygon_mode = mode;
        gl.polygon_mode(mode);
        self.issued();
    }

    pub fn set_shade_model(&mut self, gl: &mut dyn GlDriver, model: ShadeModel) {
        if self.shade_model == model {
            self.skipped();
            return;
        }
        self.shade_model = model;
        gl.shade_model(model);
        self.issued();
    }

    pub fn set_stencil_mask(&mut self, gl: &mut dyn GlDriver, mask: u32) {
        if self.stencil_mask == mask {
            self.skipped();
            return;
        }
        self.stencil_mask = mask;
        gl.stencil_mask(mask);
        self.issued();
    }

    pub fn set_clear_colour(&mut self, gl: &mut dyn GlDriver, colour: [f32; 4]) {
        if self.clear_colour == colour {
            self.skipped();
            return;
        }
        self.clear_colour = colour;
        gl.clear_colour(colour);
        self.issued();
    }

    pub fn set_colour_mask(&mut self, gl: &mut dyn GlDriver, mask: ColourMask) {
        if self.colour_mask == mask {
            self.skipped();
            return;
        }
        self.colour_mask = mask;
        gl.colour_mask(mask);
        self.issued();
    }

    pub fn set_viewport(&mut self, gl: &mut dyn GlDriver, viewport: Viewport) {
        if self.viewport == viewport {
            self.skipped();
            return;
        }
        self.viewport = viewport;
        gl.viewport(viewport);
        self.issued();
    }

    #[inline]
    #[must_use]
    pub fn cull_face(&self) -> CullFace {
        self.cull_face
    }

    #[inline]
    #[must_use]
    pub fn stencil_mask(&self) -> u32 {
        self.stencil_mask
    }

    #[inline]
    #[must_use]
    pub fn clear_colour(&self) -> [f32; 4] {
        self.clear_colour
    }

    #[inline]
    #[must_use]
    pub fn colour_mask(&self) -> ColourMask {
        self.colour_mask
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // ── Fixed function ──

    pub fn set_material(&mut self, gl: &mut dyn GlDriver, param: MaterialParam, value: [f32; 4]) {
        let slot = match param {
            MaterialParam::Ambient => &mut self.material.ambient,
            MaterialParam::Diffuse => &mut self.material.diffuse,
            MaterialParam::Specular => &mut self.material.specular,
            MaterialParam::Emission => &mut self.material.emissive,
        };
        if *slot == value {
            self.skipped();
            return;
        }
        *slot = value;
        gl.material(param, value);
        self.issued();
    }

    pub fn set_shininess(&mut self, gl: &mut dyn GlDriver, value: f32) {
        if self.material.shininess.to_bits() == value.to_bits() {
            self.skipped();
            return;
        }
        self.material.shininess = value;
        gl.shininess(value);
        self.issued();
    }

    pub fn set_light_ambient(&mut self, gl: &mut dyn GlDriver, value: [f32; 4]) {
        if self.material.light_ambient == value {
            self.skipped();
            return;
        }
        self.material.light_ambient = value;
        gl.light_model_ambient(value);
        self.issued();
    }

    pub fn set_point_size(&mut self, gl: &mut dyn GlDriver, size: f32) {
        if self.point.size.to_bits() == size.to_bits() {
            self.skipped();
            return;
        }
        self.point.size = size;
        gl.point_size(size);
        self.issued();
    }

    pub fn set_point_parameters(&mut self, gl: &mut dyn GlDriver, attenuation: [f32; 3], min: f32, max: f32) {
        let p = &self.point;
        if p.attenuation == attenuation && p.min.to_bits() == min.to_bits() && p.max.to_bits() == max.to_bits() {
            self.skipped();
            return;
        }
        self.point.attenuation = attenuation;
        self.point.min = min;
        self.point.max = max;
        gl.point_parameters(attenuation, min, max);
        self.issued();
    }
}
