//! GL Contexts
//!
//! A [`ContextGroup`] is the registry of every logical context that shares
//! objects with the main one. It is cheap to clone and can be handed to
//! background threads. Registration is the only operation serialised by its
//! lock.
//!
//! A [`GlContext`] pairs one native context with its own [`StateCache`].
//! Switching contexts switches which cache receives subsequent calls; caches
//! are never shared.
//!
//! [`ContextSet`] holds the contexts owned by one render system (the main
//! context, secondary windows and pbuffers) and tracks which one is current.
//!
//! Framebuffer objects are the one kind of object contexts do not share.
//! Each context keeps a list of framebuffer names waiting to be deleted,
//! filled while another context is current and drained as soon as it is
//! made current again.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use glint_core::capabilities::DriverCapabilities;
use glint_core::errors::{GlintError, Result};
use glint_core::handles::ContextId;

use glint_core::gl_types::GlName;

use crate::driver::{GlDriver, NativeContext};
use crate::fbo::ContextFramebuffers;
use crate::state::StateCache;

/// What a registered context is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Main,
    Window,
    PBuffer,
    Thread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRecord {
    pub native: NativeContext,
    pub kind: ContextKind,
}

#[derive(Debug, Default)]
struct Registry {
    records: SlotMap<ContextId, ContextRecord>,
    main: Option<ContextId>,
}

// ─── ContextGroup ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ContextGroup {
    inner: Arc<Mutex<Registry>>,
}

impl ContextGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the context every other context shares objects with.
    pub fn register_main(&self, native: NativeContext) -> ContextId {
        let mut registry = self.inner.lock();
        let id = registry.records.insert(ContextRecord {
            native,
            kind: ContextKind::Main,
        });
        registry.main = Some(id);
        id
    }

    pub fn register(&self, native: NativeContext, kind: ContextKind) -> ContextId {
        self.inner.lock().records.insert(ContextRecord { native, kind })
    }

    pub fn unregister(&self, id: ContextId) -> Option<ContextRecord> {
        let mut registry = self.inner.lock();
        if registry.main == Some(id) {
            registry.main = None;
        }
        registry.records.remove(id)
    }

    #[must_use]
    pub fn main(&self) -> Option<ContextId> {
        self.inner.lock().main
    }

    #[must_use]
    pub fn record(&self, id: ContextId) -> Option<ContextRecord> {
        self.inner.lock().records.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates a context for a background thread.
    ///
    /// The new context shares objects with the main one and comes with a
    /// fresh cache that is initialised the first time it is made current on
    /// the calling thread. The lock is held for the whole operation so
    /// concurrent registrations cannot interleave their driver calls.
    pub fn register_thread(&self, gl: &mut dyn GlDriver, caps: &DriverCapabilities) -> Result<GlContext> {
        let mut registry = self.inner.lock();
        let main = registry.main.ok_or(GlintError::NoMainContext)?;
        let main_native = registry
            .records
            .get(main)
            .map(|r| r.native)
            .ok_or(GlintError::UnknownContext)?;

        let native = gl.create_shared_context(main_native).ok_or_else(|| {
            GlintError::ContextCreationFailed(String::from("driver refused to create a shared context"))
        })?;
        let id = registry.records.insert(ContextRecord {
            native,
            kind: ContextKind::Thread,
        });
        log::info!("Registered background thread context {id:?}");
        Ok(GlContext::new(id, native, caps))
    }

    /// Releases a context created by [`register_thread`](Self::register_thread).
    pub fn unregister_thread(&self, gl: &mut dyn GlDriver, context: GlContext) {
        let mut registry = self.inner.lock();
        registry.records.remove(context.id);
        gl.destroy_context(context.native);
    }
}

// ─── GlContext ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct GlContext {
    id: ContextId,
    native: NativeContext,
    state: StateCache,
    initialized: bool,
    pending_framebuffers: Vec<GlName>,
}

impl GlContext {
    #[must_use]
    pub fn new(id: ContextId, native: NativeContext, caps: &DriverCapabilities) -> Self {
        Self {
            id,
            native,
            state: StateCache::new(caps),
            initialized: false,
            pending_framebuffers: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn native(&self) -> NativeContext {
        self.native
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &StateCache {
        &self.state
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut StateCache {
        &mut self.state
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Framebuffer names queued for deletion in this context.
    #[inline]
    #[must_use]
    pub fn pending_framebuffers(&self) -> &[GlName] {
        &self.pending_framebuffers
    }

    /// Queues framebuffer names created in this context. They are deleted
    /// the next time it is made current.
    pub fn defer_framebuffer_delete(&mut self, names: impl IntoIterator<Item = GlName>) {
        self.pending_framebuffers.extend(names.into_iter().filter(|&name| name != 0));
    }

    /// Makes the context current, running one-time cache initialisation on
    /// first use and deleting queued framebuffers.
    pub fn make_current(&mut self, gl: &mut dyn GlDriver) {
        gl.make_current(self.native);
        if !self.initialized {
            self.state.initialize_cache(gl);
            self.initialized = true;
        }
        if !self.pending_framebuffers.is_empty() {
            log::debug!(
                "Deleting {} deferred framebuffer(s) in {:?}",
                self.pending_framebuffers.len(),
                self.id
            );
            for name in self.pending_framebuffers.drain(..) {
                self.state.delete_framebuffer(gl, name);
                self.state.invalidate_for_resource(name);
            }
        }
    }
}

// ─── ContextSet ───────────────────────────────────────────────────────────────

/// Contexts owned by one render system.
#[derive(Debug)]
pub struct ContextSet {
    group: ContextGroup,
    owned: FxHashMap<ContextId, GlContext>,
    current: ContextId,
    main: ContextId,
}

impl ContextSet {
    /// Adopts the driver's current context as the main context.
    pub fn new(gl: &mut dyn GlDriver, caps: &DriverCapabilities) -> Self {
        let group = ContextGroup::new();
        let native = gl.current_context();
        let main = group.register_main(native);
        let mut context = GlContext::new(main, native, caps);
        context.make_current(gl);

        let mut owned = FxHashMap::default();
        owned.insert(main, context);
        Self {
            group,
            owned,
            current: main,
            main,
        }
    }

    #[inline]
    #[must_use]
    pub fn group(&self) -> &ContextGroup {
        &self.group
    }

    #[inline]
    #[must_use]
    pub fn main(&self) -> ContextId {
        self.main
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> ContextId {
        self.current
    }

    #[must_use]
    pub fn get(&self, id: ContextId) -> Option<&GlContext> {
        self.owned.get(&id)
    }

    pub fn get_mut(&mut self, id: ContextId) -> Option<&mut GlContext> {
        self.owned.get_mut(&id)
    }

    /// Cache of the current context.
    pub fn current_state(&mut self) -> Result<&mut StateCache> {
        self.owned
            .get_mut(&self.current)
            .map(GlContext::state_mut)
            .ok_or(GlintError::UnknownContext)
    }

    /// Registers and adopts a context created by the driver.
    pub fn adopt(&mut self, native: NativeContext, kind: ContextKind, caps: &DriverCapabilities) -> ContextId {
        let id = self.group.register(native, kind);
        self.owned.insert(id, GlContext::new(id, native, caps));
        id
    }

    /// Makes `id` current. Does nothing if it already is.
    pub fn switch_to(&mut self, gl: &mut dyn GlDriver, id: ContextId) -> Result<()> {
        if self.current == id {
            return Ok(());
        }
        let context = self.owned.get_mut(&id).ok_or(GlintError::UnknownContext)?;
        context.make_current(gl);
        log::debug!("Switched GL context to {id:?}");
        self.current = id;
        Ok(())
    }

    /// Destroys an owned context. The main context cannot be destroyed; if
    /// `id` is current, the main context becomes current first.
    ///
    /// Framebuffers still queued for deletion die with the context.
    pub fn destroy(&mut self, gl: &mut dyn GlDriver, id: ContextId) -> Result<()> {
        if id == self.main {
            return Ok(());
        }
        if self.current == id {
            self.switch_to(gl, self.main)?;
        }
        let context = self.owned.remove(&id).ok_or(GlintError::UnknownContext)?;
        self.group.unregister(id);
        gl.destroy_context(context.native);
        Ok(())
    }

    /// Deletes framebuffers in the context that created them: right away if
    /// it is current, otherwise once it next becomes current. Names of a
    /// context that no longer exists are dropped; they went with it.
    pub fn delete_framebuffers(&mut self, gl: &mut dyn GlDriver, framebuffers: ContextFramebuffers) -> Result<()> {
        if framebuffers.context == self.current {
            framebuffers.delete(gl, self.current_state()?);
        } else if let Some(owner) = self.owned.get_mut(&framebuffers.context) {
            log::debug!("Deferring framebuffer deletion until {:?} is current", framebuffers.context);
            owner.defer_framebuffer_delete(framebuffers.names);
        } else {
            log::debug!("Framebuffers of destroyed context {:?} are already gone", framebuffers.context);
        }
        Ok(())
    }

    /// Every owned cache, for invalidations that must reach all contexts.
    pub fn states_mut(&mut self) -> impl Iterator<Item = &mut StateCache> {
        self.owned.values_mut().map(GlContext::state_mut)
    }
}
