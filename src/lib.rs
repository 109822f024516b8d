#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub use glint_core::{capabilities, errors, format, gl_types, handles, settings};
pub use glint_render::{context, depth, driver, fbo, probe, render_system, rtt, state, surface, target};

pub use glint_core::{
    ContextId, DepthBufferId, DepthFormat, DepthStencilMode, DriverCapabilities, DriverQuirks, FboId, GlintError,
    PixelFormat, PoolId, RenderCapabilities, RenderSystemSettings, RenderTargetId, Result, RttPreference,
    StencilFormat,
};

pub use glint_render::{
    AttributeValue, CapabilityProbe, ContextGroup, DepthBufferPool, FormatCompatibilityTable, FrameBufferObject,
    GlContext, GlDriver, HeadlessDriver, HeadlessProfile, RenderSystem, RenderTarget, RenderTextureDesc, RttManager,
    StateCache, SurfaceDesc, TargetAttribute, TargetKind, WindowDesc,
};
