//! Render System
//!
//! [`RenderSystem`] wires the driver, the contexts, the render-to-texture
//! path, the render-target arena and the depth-buffer pool together.
//!
//! # Startup
//!
//! ```text
//! RenderSystem::new(driver, settings)
//!   ├─ driver.capabilities()
//!   ├─ ContextSet::new()          adopt the current context as main
//!   └─ RttManager::select()       FBO → PBuffer → Copy
//!        └─ CapabilityProbe::run()   (FBO path only)
//! ```
//!
//! # Depth buffers
//!
//! A target with a pool other than [`PoolId::NO_DEPTH`] gets a depth
//! buffer when it is created, and again whenever it is made the render
//! target while its depth buffer is missing or belongs to another context.
//! Destroying a target detaches it and destroys every pooled depth buffer
//! left without users.

use slotmap::SlotMap;

use glint_core::capabilities::{DriverCapabilities, RenderCapabilities};
use glint_core::errors::{GlintError, Result};
use glint_core::format::{DepthStencilMode, PixelFormat};
use glint_core::gl_types::{
    Capability, GlError, GlName, TexParam, TexParamValue, TextureTarget, Viewport,
};
use glint_core::handles::{ContextId, DepthBufferId, FboId, PoolId, RenderTargetId};
use glint_core::settings::RenderSystemSettings;

use crate::context::{ContextKind, ContextSet, GlContext};
use crate::depth::{DepthBuffer, DepthBufferPool, DepthRequest, DepthStorage, SURFACE_DEPTH_BITS};
use crate::driver::GlDriver;
use crate::fbo::DepthAttachment;
use crate::probe::FormatCompatibilityTable;
use crate::rtt::RttManager;
use crate::state::StateCache;
use crate::surface::SurfaceDesc;
use crate::target::{AttributeValue, RenderTarget, RttBacking, TargetAttribute, TargetKind};

// ─── Descriptors ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDesc {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Multisample count; `None` uses [`RenderSystemSettings::fsaa`].
    pub samples: Option<u32>,
    pub srgb: bool,
}

impl WindowDesc {
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            samples: None,
            srgb: false,
        }
    }

    #[must_use]
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = Some(samples);
        self
    }

    #[must_use]
    pub fn with_srgb(mut self, srgb: bool) -> Self {
        self.srgb = srgb;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTextureDesc {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Colour format; [`PixelFormat::None`] creates a depth-only target.
    pub format: PixelFormat,
    pub target: TextureTarget,
    /// Multisample count; `None` uses [`RenderSystemSettings::fsaa`].
    pub samples: Option<u32>,
    pub pool_id: PoolId,
    pub want_stencil: bool,
    pub srgb: bool,
}

impl RenderTextureDesc {
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            format,
            target: TextureTarget::Texture2D,
            samples: None,
            pool_id: PoolId::DEFAULT,
            want_stencil: true,
            srgb: false,
        }
    }

    #[must_use]
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = Some(samples);
        self
    }

    #[must_use]
    pub fn with_pool(mut self, pool_id: PoolId) -> Self {
        self.pool_id = pool_id;
        self
    }

    #[must_use]
    pub fn with_stencil(mut self, want_stencil: bool) -> Self {
        self.want_stencil = want_stencil;
        self
    }

    #[must_use]
    pub fn with_srgb(mut self, srgb: bool) -> Self {
        self.srgb = srgb;
        self
    }
}

// ─── RenderSystem ─────────────────────────────────────────────────────────────

pub struct RenderSystem<D: GlDriver> {
    driver: D,
    settings: RenderSystemSettings,
    caps: DriverCapabilities,
    contexts: ContextSet,
    rtt: RttManager,
    targets: SlotMap<RenderTargetId, RenderTarget>,
    depth: DepthBufferPool,
    active: Option<RenderTargetId>,
    primary_window: Option<RenderTargetId>,
}

impl<D: GlDriver> RenderSystem<D> {
    /// Adopts the driver's current context and selects the
    /// render-to-texture path, probing formats if it is the FBO path.
    pub fn new(mut driver: D, settings: RenderSystemSettings) -> Result<Self> {
        let mut caps = driver.capabilities();
        log::info!(
            "[GL] : Driver '{}': {} texture units, {} max samples",
            caps.vendor,
            caps.num_texture_units,
            caps.max_samples
        );

        let mut contexts = ContextSet::new(&mut driver, &caps);
        let rtt = RttManager::select(&mut driver, &mut contexts, &caps, &settings)?;

        if !matches!(rtt, RttManager::Fbo(_)) {
            // Multiple render targets need framebuffer objects.
            caps.num_multi_render_targets = 1;
            caps.flags.remove(RenderCapabilities::MULTI_RENDER_TARGETS);
        }

        let depth = DepthBufferPool::new(caps.has(RenderCapabilities::RTT_DEPTHBUFFER_RESOLUTION_LESSEQUAL));

        Ok(Self {
            driver,
            settings,
            caps,
            contexts,
            rtt,
            targets: SlotMap::with_key(),
            depth,
            active: None,
            primary_window: None,
        })
    }

    // ── Accessors ──

    #[inline]
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[inline]
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Driver capabilities as adjusted for the selected path.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &DriverCapabilities {
        &self.caps
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RenderSystemSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn rtt(&self) -> &RttManager {
        &self.rtt
    }

    #[must_use]
    pub fn compatibility_table(&self) -> Option<&FormatCompatibilityTable> {
        self.rtt.table()
    }

    #[inline]
    #[must_use]
    pub fn contexts(&self) -> &ContextSet {
        &self.contexts
    }

    #[inline]
    #[must_use]
    pub fn current_context(&self) -> ContextId {
        self.contexts.current()
    }

    /// Cache of the current context.
    pub fn state(&self) -> Result<&StateCache> {
        self.contexts
            .get(self.contexts.current())
            .map(GlContext::state)
            .ok_or(GlintError::UnknownContext)
    }

    /// Cache of the current context together with the driver, for issuing
    /// state changes.
    pub fn state_and_driver(&mut self) -> Result<(&mut StateCache, &mut D)> {
        let state = self.contexts.current_state()?;
        Ok((state, &mut self.driver))
    }

    #[must_use]
    pub fn target(&self, id: RenderTargetId) -> Option<&RenderTarget> {
        self.targets.get(id)
    }

    pub fn targets(&self) -> impl Iterator<Item = (RenderTargetId, &RenderTarget)> {
        self.targets.iter()
    }

    #[inline]
    #[must_use]
    pub fn active_target(&self) -> Option<RenderTargetId> {
        self.active
    }

    #[inline]
    #[must_use]
    pub fn depth_pool(&self) -> &DepthBufferPool {
        &self.depth
    }

    #[must_use]
    pub fn depth_buffer_for(&self, target: RenderTargetId) -> Option<DepthBufferId> {
        self.targets.get(target).and_then(RenderTarget::depth_buffer)
    }

    #[must_use]
    pub fn get_best_depth_stencil(&self, format: PixelFormat, want_stencil: bool) -> DepthStencilMode {
        self.rtt.get_best_depth_stencil(format, want_stencil)
    }

    /// Backend object lookup for a target.
    pub fn attribute(&self, id: RenderTargetId, attribute: TargetAttribute) -> Result<AttributeValue> {
        let target = self.targets.get(id).ok_or(GlintError::UnknownRenderTarget)?;
        Ok(match (attribute, target.attribute(id, attribute)) {
            (TargetAttribute::GlContext, AttributeValue::None) => self
                .rtt
                .render_context(target)
                .map_or(AttributeValue::None, AttributeValue::Context),
            (_, value) => value,
        })
    }

    // ── Target creation ──

    fn clamp_samples(&self, requested: u32) -> u32 {
        if requested > self.caps.max_samples {
            log::warn!(
                "FSAA level {requested} unsupported; clamped to {}",
                self.caps.max_samples
            );
            self.caps.max_samples
        } else {
            requested
        }
    }

    /// Registers a window. The first window renders in the main context;
    /// every later one gets a context sharing objects with it.
    ///
    /// The window's own depth surface is recorded as a manual depth buffer
    /// in [`PoolId::DEFAULT`], so copying render textures can share it.
    pub fn create_window(&mut self, desc: WindowDesc) -> Result<RenderTargetId> {
        let samples = self.clamp_samples(desc.samples.unwrap_or(self.settings.fsaa));
        let primary = self.primary_window.is_none();
        let context = if primary {
            self.contexts.main()
        } else {
            let main = self
                .contexts
                .get(self.contexts.main())
                .map(GlContext::native)
                .ok_or(GlintError::UnknownContext)?;
            let native = self
                .driver
                .create_shared_context(main)
                .ok_or_else(|| GlintError::ContextCreationFailed(format!("window '{}'", desc.name)))?;
            self.contexts.adopt(native, ContextKind::Window, &self.caps)
        };

        let id = self.targets.insert(RenderTarget {
            name: desc.name,
            kind: TargetKind::Window { context, primary },
            width: desc.width,
            height: desc.height,
            samples,
            format: PixelFormat::A8R8G8B8,
            pool_id: PoolId::DEFAULT,
            want_stencil: true,
            srgb: desc.srgb,
            depth_buffer: None,
        });

        let depth = self.depth.insert(DepthBuffer::surface(
            PoolId::DEFAULT,
            desc.width,
            desc.height,
            samples,
            Some(context),
            true,
        ));
        self.depth.attach(depth, id)?;
        if let Some(target) = self.targets.get_mut(id) {
            target.depth_buffer = Some(depth);
            log::info!("Created window '{}' {}x{} ({samples} samples)", target.name, target.width, target.height);
        }
        if primary {
            self.primary_window = Some(id);
        }
        Ok(id)
    }

    /// Creates a texture and a render target rendering into it.
    ///
    /// Unless the target is in [`PoolId::NO_DEPTH`], a depth buffer is
    /// pulled from the pool immediately.
    pub fn create_render_texture(&mut self, desc: RenderTextureDesc) -> Result<RenderTargetId> {
        if !self.rtt.check_format(desc.format) {
            return Err(GlintError::UnsupportedFormat(desc.format));
        }
        let mut samples = self.clamp_samples(desc.samples.unwrap_or(self.settings.fsaa));

        let texture = match desc.format.gl_internal_format() {
            Some(internal) => self.create_texture(desc.target, internal, desc.width, desc.height)?,
            None => 0,
        };
        let surface =
            SurfaceDesc::texture(desc.target, texture, desc.width, desc.height, desc.format).with_samples(samples);

        let backing = match self
            .rtt
            .create_render_texture(&mut self.driver, &mut self.contexts, &self.caps, surface)
        {
            Ok(backing) => backing,
            Err(err) => {
                self.delete_texture(texture)?;
                return Err(err);
            }
        };

        match backing {
            RttBacking::Fbo(fbo) => {
                samples = self
                    .rtt
                    .fbo_manager()
                    .and_then(|m| m.get(fbo))
                    .map_or(0, |f| f.samples());
            }
            RttBacking::PBuffer | RttBacking::Copy if samples > 0 => {
                log::warn!("FSAA unsupported by the {} path; '{}' renders single-sampled", self.rtt.name(), desc.name);
                samples = 0;
            }
            _ => {}
        }

        let id = self.targets.insert(RenderTarget {
            name: desc.name,
            kind: TargetKind::RenderTexture {
                backing,
                target: desc.target,
                texture,
            },
            width: desc.width,
            height: desc.height,
            samples,
            format: desc.format,
            pool_id: desc.pool_id,
            want_stencil: desc.want_stencil,
            srgb: desc.srgb,
            depth_buffer: None,
        });

        if !desc.pool_id.is_no_depth()
            && let Err(err) = self.set_depth_buffer_for(id)
        {
            self.destroy_render_target(id)?;
            return Err(err);
        }
        Ok(id)
    }

    fn create_texture(&mut self, target: TextureTarget, internal: u32, width: u32, height: u32) -> Result<GlName> {
        let state = self.contexts.current_state()?;
        let gl = &mut self.driver;
        let name = gl.gen_texture();
        state.bind_texture(gl, target, name, false);
        state.tex_parameter(gl, target, TexParam::MaxLevel, TexParamValue::Int(0));
        let _ = gl.get_error();
        gl.tex_image_2d(target, 0, internal, width, height);
        match gl.get_error() {
            GlError::NoError => Ok(name),
            error => {
                state.delete_texture(gl, name);
                if error == GlError::OutOfMemory {
                    log::error!("Out of GPU memory allocating render texture ({width}x{height})");
                    Err(GlintError::OutOfMemory {
                        what: "render texture",
                        width,
                        height,
                    })
                } else {
                    Err(GlintError::DriverError {
                        call: "tex_image_2d",
                        error,
                    })
                }
            }
        }
    }

    fn delete_texture(&mut self, texture: GlName) -> Result<()> {
        if texture == 0 {
            return Ok(());
        }
        let state = self.contexts.current_state()?;
        state.delete_texture(&mut self.driver, texture);
        self.notify_resource_destroyed(texture);
        Ok(())
    }

    /// Surface describing the texture a render texture renders into.
    pub fn render_texture_surface(&self, id: RenderTargetId) -> Result<SurfaceDesc> {
        let target = self.targets.get(id).ok_or(GlintError::UnknownRenderTarget)?;
        match target.kind {
            TargetKind::RenderTexture {
                target: tex_target,
                texture,
                ..
            } => Ok(
                SurfaceDesc::texture(tex_target, texture, target.width, target.height, target.format)
                    .with_samples(target.samples),
            ),
            _ => Err(GlintError::UnknownRenderTarget),
        }
    }

    /// An empty multi render target; colour surfaces are added with
    /// [`bind_surface`](Self::bind_surface).
    pub fn create_multi_render_target(&mut self, name: impl Into<String>, pool_id: PoolId) -> Result<RenderTargetId> {
        let path = self.rtt.name();
        let manager = self
            .rtt
            .fbo_manager_mut()
            .ok_or(GlintError::MultiRenderTargetUnsupported(path))?;
        let fbo = manager.create_multi_render_target(&mut self.driver, &self.contexts, &self.caps, 0);
        Ok(self.targets.insert(RenderTarget {
            name: name.into(),
            kind: TargetKind::MultiRenderTarget { fbo },
            width: 0,
            height: 0,
            samples: 0,
            format: PixelFormat::None,
            pool_id,
            want_stencil: true,
            srgb: false,
            depth_buffer: None,
        }))
    }

    /// Attaches `surface` at colour `slot` of a multi render target.
    ///
    /// If the attached depth buffer no longer fits the new surfaces it is
    /// detached; the next [`set_render_target`](Self::set_render_target)
    /// finds a new one.
    pub fn bind_surface(&mut self, mrt: RenderTargetId, slot: usize, surface: SurfaceDesc) -> Result<()> {
        let max = self.caps.num_multi_render_targets as usize;
        if slot >= max {
            return Err(GlintError::AttachmentSlotOutOfRange { slot, max });
        }
        let fbo = self.mrt_fbo(mrt)?;
        let manager = self.rtt.fbo_manager_mut().ok_or(GlintError::UnknownFramebuffer)?;
        manager.bind_surface(&mut self.driver, &mut self.contexts, fbo, slot, surface)?;
        self.refresh_mrt(mrt, fbo)
    }

    pub fn unbind_surface(&mut self, mrt: RenderTargetId, slot: usize) -> Result<()> {
        let fbo = self.mrt_fbo(mrt)?;
        let manager = self.rtt.fbo_manager_mut().ok_or(GlintError::UnknownFramebuffer)?;
        manager.unbind_surface(&mut self.driver, &mut self.contexts, fbo, slot)?;
        self.refresh_mrt(mrt, fbo)
    }

    fn mrt_fbo(&self, mrt: RenderTargetId) -> Result<FboId> {
        match self.targets.get(mrt).map(RenderTarget::kind) {
            Some(TargetKind::MultiRenderTarget { fbo }) => Ok(*fbo),
            Some(_) => Err(GlintError::UnknownFramebuffer),
            None => Err(GlintError::UnknownRenderTarget),
        }
    }

    fn refresh_mrt(&mut self, mrt: RenderTargetId, fbo: FboId) -> Result<()> {
        let (width, height, format, samples) = self
            .rtt
            .fbo_manager()
            .and_then(|m| m.get(fbo))
            .map(|f| (f.width(), f.height(), f.format(), f.samples()))
            .ok_or(GlintError::UnknownFramebuffer)?;
        let target = self.targets.get_mut(mrt).ok_or(GlintError::UnknownRenderTarget)?;
        target.width = width;
        target.height = height;
        target.format = format;
        target.samples = samples;

        if let Some(depth) = target.depth_buffer {
            let req = self.depth_request(mrt)?;
            if !self.depth.is_compatible(depth, &req) {
                log::debug!("Depth buffer no longer fits multi render target; detaching");
                self.detach_depth_buffer(mrt)?;
            }
        }
        Ok(())
    }

    // ── Depth buffers ──

    /// What `target` needs from a depth buffer in its current pool.
    pub fn depth_request(&self, id: RenderTargetId) -> Result<DepthRequest> {
        let target = self.targets.get(id).ok_or(GlintError::UnknownRenderTarget)?;
        let mode = target
            .fbo()
            .map(|_| self.rtt.get_best_depth_stencil(target.format, target.want_stencil));
        Ok(DepthRequest {
            pool_id: target.pool_id,
            width: target.width,
            height: target.height,
            samples: target.samples,
            bit_depth: mode.map_or(SURFACE_DEPTH_BITS, |m| m.depth.bits()),
            mode,
            context: Some(self.rtt.render_context(target).unwrap_or_else(|| self.contexts.current())),
        })
    }

    fn create_depth_record(&mut self, req: &DepthRequest, manual: bool) -> Result<DepthBuffer> {
        match req.mode {
            Some(mode) => {
                let state = self.contexts.current_state()?;
                let storage = DepthStorage::create(&mut self.driver, state, mode, req.width, req.height, req.samples)?;
                Ok(DepthBuffer::with_storage(
                    req.pool_id,
                    mode,
                    storage,
                    req.width,
                    req.height,
                    req.samples,
                    req.context,
                    manual,
                ))
            }
            None => Ok(DepthBuffer::surface(
                req.pool_id,
                req.width,
                req.height,
                req.samples,
                req.context,
                manual,
            )),
        }
    }

    /// Gives `target` a depth buffer from its pool, allocating one if no
    /// pooled buffer is compatible. Targets in [`PoolId::NO_DEPTH`] get
    /// none.
    ///
    /// Allocation failure is returned unchanged.
    pub fn set_depth_buffer_for(&mut self, id: RenderTargetId) -> Result<Option<DepthBufferId>> {
        let target = self.targets.get(id).ok_or(GlintError::UnknownRenderTarget)?;
        if target.pool_id.is_no_depth() {
            return Ok(None);
        }
        if target.depth_buffer.is_some() {
            self.detach_depth_buffer(id)?;
        }

        let req = self.depth_request(id)?;
        let depth = if let Some(existing) = self.depth.find_compatible(&req) {
            log::debug!("Reusing depth buffer from {} for {}x{}", req.pool_id, req.width, req.height);
            existing
        } else {
            let buffer = self.create_depth_record(&req, false)?;
            self.depth.insert(buffer)
        };
        self.attach_native(id, depth)?;
        Ok(Some(depth))
    }

    fn attach_native(&mut self, id: RenderTargetId, depth: DepthBufferId) -> Result<()> {
        let target = self.targets.get(id).ok_or(GlintError::UnknownRenderTarget)?;
        if let Some(fbo) = target.fbo() {
            let attachment = self
                .depth
                .get(depth)
                .and_then(DepthBuffer::storage)
                .map_or(DepthAttachment { depth: 0, stencil: 0 }, DepthStorage::attachment);
            if let Some(manager) = self.rtt.fbo_manager_mut() {
                manager.attach_depth(&mut self.driver, &mut self.contexts, fbo, attachment)?;
            }
        }
        self.depth.attach(depth, id)?;
        if let Some(target) = self.targets.get_mut(id) {
            target.depth_buffer = Some(depth);
        }
        Ok(())
    }

    /// Creates a manual depth buffer sized for `target` in `pool_id`. It is
    /// not attached and is never destroyed automatically.
    pub fn create_depth_buffer(&mut self, target: RenderTargetId, pool_id: PoolId) -> Result<DepthBufferId> {
        let mut req = self.depth_request(target)?;
        req.pool_id = pool_id;
        let buffer = self.create_depth_record(&req, true)?;
        Ok(self.depth.insert(buffer))
    }

    /// Attaches a specific depth buffer. The target moves to the buffer's
    /// pool.
    pub fn attach_depth_buffer(&mut self, target: RenderTargetId, depth: DepthBufferId) -> Result<()> {
        let pool_id = self.depth.get(depth).ok_or(GlintError::UnknownDepthBuffer)?.pool_id();
        let mut req = self.depth_request(target)?;
        req.pool_id = pool_id;
        if !self.depth.is_compatible(depth, &req) {
            return Err(GlintError::IncompatibleDepthBuffer);
        }
        if self.depth_buffer_for(target).is_some() {
            self.detach_depth_buffer(target)?;
        }
        self.attach_native(target, depth)?;
        if let Some(record) = self.targets.get_mut(target) {
            record.pool_id = pool_id;
        }
        Ok(())
    }

    /// Detaches the target's depth buffer. The buffer survives; pooled
    /// buffers without users are destroyed by the next cleanup.
    pub fn detach_depth_buffer(&mut self, id: RenderTargetId) -> Result<()> {
        let target = self.targets.get(id).ok_or(GlintError::UnknownRenderTarget)?;
        let Some(depth) = target.depth_buffer else {
            return Ok(());
        };
        if let Some(fbo) = target.fbo()
            && let Some(manager) = self.rtt.fbo_manager_mut()
        {
            manager.detach_depth(&mut self.driver, &mut self.contexts, fbo)?;
        }
        self.depth.detach(depth, id)?;
        if let Some(target) = self.targets.get_mut(id) {
            target.depth_buffer = None;
        }
        Ok(())
    }

    /// Frees a manual depth buffer. Fails for pooled buffers and while a
    /// target still uses it.
    pub fn release_depth_buffer(&mut self, depth: DepthBufferId) -> Result<()> {
        let buffer = self.depth.release_manual(depth)?;
        let state = self.contexts.current_state()?;
        buffer.destroy(&mut self.driver, state);
        Ok(())
    }

    /// Destroys pooled depth buffers without users.
    pub fn cleanup_depth_buffers(&mut self) -> Result<usize> {
        let state = self.contexts.current_state()?;
        let destroyed = self.depth.cleanup(&mut self.driver, state);
        if destroyed > 0 {
            log::debug!("Destroyed {destroyed} unused depth buffer(s)");
        }
        Ok(destroyed)
    }

    // ── Rendering ──

    /// Makes `id` the render target.
    ///
    /// Switches to the target's context if it has one, finishes the
    /// previous target, makes sure a depth buffer from the current context
    /// is attached, binds the target and applies its sRGB and viewport
    /// state.
    pub fn set_render_target(&mut self, id: RenderTargetId) -> Result<()> {
        if let Some(previous) = self.active.take() {
            self.unbind_target(previous)?;
        }

        let target = self.targets.get(id).ok_or(GlintError::UnknownRenderTarget)?;
        if let Some(context) = self.rtt.render_context(target)
            && self.contexts.get(context).is_some()
        {
            self.contexts.switch_to(&mut self.driver, context)?;
        }

        let current = self.contexts.current();
        let needs_depth = !target.pool_id.is_no_depth()
            && target
                .depth_buffer
                .and_then(|d| self.depth.get(d))
                .is_none_or(|d| d.context() != Some(current));
        if needs_depth {
            self.set_depth_buffer_for(id)?;
        }

        let target = self.targets.get(id).ok_or(GlintError::UnknownRenderTarget)?;
        self.rtt.bind(&mut self.driver, &mut self.contexts, target)?;

        let state = self.contexts.current_state()?;
        if self.caps.has(RenderCapabilities::FRAMEBUFFER_SRGB) {
            state.set_enabled(&mut self.driver, Capability::FramebufferSrgb, target.srgb);
        }
        state.set_viewport(
            &mut self.driver,
            Viewport::new(0, 0, target.width as i32, target.height as i32),
        );
        self.active = Some(id);
        Ok(())
    }

    fn unbind_target(&mut self, id: RenderTargetId) -> Result<()> {
        if let Some(target) = self.targets.get(id) {
            self.rtt.unbind(&mut self.driver, &mut self.contexts, target)?;
        }
        Ok(())
    }

    /// Resolves a multisampled target into its textures.
    pub fn swap_buffers(&mut self, id: RenderTargetId) -> Result<()> {
        let target = self.targets.get(id).ok_or(GlintError::UnknownRenderTarget)?;
        if let Some(fbo) = target.fbo()
            && let Some(manager) = self.rtt.fbo_manager()
        {
            manager.swap_buffers(&mut self.driver, &mut self.contexts, fbo)?;
        }
        Ok(())
    }

    /// Destroys a target and its path-specific backing, then every pooled
    /// depth buffer left without users.
    pub fn destroy_render_target(&mut self, id: RenderTargetId) -> Result<()> {
        if self.active == Some(id) {
            self.unbind_target(id)?;
            self.active = None;
        }
        let depth = self.depth_buffer_for(id);
        self.detach_depth_buffer(id)?;
        let target = self.targets.remove(id).ok_or(GlintError::UnknownRenderTarget)?;

        match target.kind {
            TargetKind::Window { context, primary } => {
                if primary {
                    self.primary_window = None;
                }
                // The window's own depth surface goes with it, or with the
                // last copying target still sharing it.
                if let Some(depth) = depth
                    && self
                        .depth
                        .get(depth)
                        .is_some_and(|b| b.is_manual() && b.storage().is_none() && b.context() == Some(context))
                {
                    if self.depth.attached_count(depth) == 0 {
                        self.release_depth_buffer(depth)?;
                    } else {
                        log::debug!("Window '{}' depth surface stays with its remaining users", target.name);
                        self.depth.hand_over(depth)?;
                    }
                }
                if !primary {
                    self.contexts.destroy(&mut self.driver, context)?;
                }
            }
            TargetKind::RenderTexture { backing, texture, .. } => {
                self.rtt
                    .destroy_render_texture(&mut self.driver, &mut self.contexts, backing, target.format)?;
                self.delete_texture(texture)?;
            }
            TargetKind::MultiRenderTarget { fbo } => {
                if let Some(manager) = self.rtt.fbo_manager_mut() {
                    manager.destroy(&mut self.driver, &mut self.contexts, fbo)?;
                }
            }
        }
        log::debug!("Destroyed render target '{}'", target.name);

        self.cleanup_depth_buffers()?;
        Ok(())
    }

    /// Destroys every target and depth buffer, ending in the main context
    /// so framebuffers queued there are deleted too.
    pub fn shutdown(&mut self) -> Result<()> {
        let ids: Vec<RenderTargetId> = self.targets.keys().collect();
        for id in ids {
            self.destroy_render_target(id)?;
        }
        let main = self.contexts.main();
        self.contexts.switch_to(&mut self.driver, main)?;
        let state = self.contexts.current_state()?;
        self.depth.clear(&mut self.driver, state);
        Ok(())
    }

    // ── Contexts ──

    pub fn switch_context(&mut self, context: ContextId) -> Result<()> {
        self.contexts.switch_to(&mut self.driver, context)
    }

    /// Creates a context for a background thread, sharing objects with the
    /// main context.
    pub fn register_thread(&mut self) -> Result<GlContext> {
        self.contexts.group().register_thread(&mut self.driver, &self.caps)
    }

    pub fn unregister_thread(&mut self, context: GlContext) {
        self.contexts.group().unregister_thread(&mut self.driver, context);
    }

    /// Forgets `name` in every context's cache. Must be called whenever a
    /// driver object is destroyed outside the caches.
    pub fn notify_resource_destroyed(&mut self, name: GlName) {
        for state in self.contexts.states_mut() {
            state.invalidate_for_resource(name);
        }
    }
}
