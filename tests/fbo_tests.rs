//! Framebuffer Object Tests
//!
//! Tests for:
//! - Attachment validation (size, format, slot range, unsupported formats)
//! - Multi render targets: surface binding and depth refresh on resize
//! - Multisample companions and resolve on swap
//! - Context ownership, recreation and deferred deletion
//! - Shared multisample colour renderbuffers

use slotmap::KeyData;

use glint::fbo::ContextFramebuffers;
use glint::gl_types::{Attachment, FramebufferTarget, GlEnum, TextureTarget};
use glint::surface::{RenderBufferPool, SurfaceDesc};
use glint::{
    ContextId, FrameBufferObject, GlDriver, GlintError, HeadlessDriver, HeadlessProfile, PixelFormat, PoolId,
    RenderSystem, RenderSystemSettings, RenderTargetId, RenderTextureDesc, StateCache, WindowDesc,
};

const GL_RGBA8: GlEnum = 0x8058;

fn system(profile: HeadlessProfile) -> RenderSystem<HeadlessDriver> {
    let _ = env_logger::builder().is_test(true).try_init();
    RenderSystem::new(HeadlessDriver::new(profile), RenderSystemSettings::default()).unwrap()
}

/// A render texture without depth, for use as a multi render target surface.
fn colour_surface(sys: &mut RenderSystem<HeadlessDriver>, size: u32, format: PixelFormat) -> SurfaceDesc {
    let id = sys
        .create_render_texture(RenderTextureDesc::new("surface", size, size, format).with_pool(PoolId::NO_DEPTH))
        .unwrap();
    sys.render_texture_surface(id).unwrap()
}

fn fbo_of(sys: &RenderSystem<HeadlessDriver>, id: RenderTargetId) -> &FrameBufferObject {
    let fbo = sys.target(id).unwrap().fbo().unwrap();
    sys.rtt().fbo_manager().unwrap().get(fbo).unwrap()
}

fn context(n: u64) -> ContextId {
    ContextId::from(KeyData::from_ffi(n))
}

/// A bare driver, cache and texture of `internal` format.
fn raw_texture(internal: GlEnum, size: u32) -> (HeadlessDriver, StateCache, SurfaceDesc, PixelFormat) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut gl = HeadlessDriver::default();
    let mut state = StateCache::new(&gl.capabilities());
    state.initialize_cache(&mut gl);
    let tex = gl.gen_texture();
    state.bind_texture(&mut gl, TextureTarget::Texture2D, tex, false);
    gl.tex_image_2d(TextureTarget::Texture2D, 0, internal, size, size);
    let format = PixelFormat::ALL
        .into_iter()
        .find(|f| f.gl_internal_format() == Some(internal))
        .unwrap();
    let surface = SurfaceDesc::texture(TextureTarget::Texture2D, tex, size, size, format);
    (gl, state, surface, format)
}

// ============================================================================
// Attachment Validation Tests
// ============================================================================

#[test]
fn mismatched_surface_size_is_rejected() {
    let mut sys = system(HeadlessProfile::default());
    let mrt = sys.create_multi_render_target("gbuffer", PoolId::DEFAULT).unwrap();
    let big = colour_surface(&mut sys, 512, PixelFormat::A8R8G8B8);
    let small = colour_surface(&mut sys, 256, PixelFormat::A8R8G8B8);

    sys.bind_surface(mrt, 0, big).unwrap();
    let err = sys.bind_surface(mrt, 1, small).unwrap_err();

    assert!(matches!(
        err,
        GlintError::AttachmentSizeMismatch {
            slot: 1,
            width: 512,
            found_width: 256,
            ..
        }
    ));
    assert!(fbo_of(&sys, mrt).surface(1).is_none());
}

#[test]
fn mismatched_surface_format_is_rejected_and_not_kept() {
    let mut sys = system(HeadlessProfile::default());
    let mrt = sys.create_multi_render_target("gbuffer", PoolId::DEFAULT).unwrap();
    let albedo = colour_surface(&mut sys, 512, PixelFormat::A8R8G8B8);
    let normals = colour_surface(&mut sys, 512, PixelFormat::Float16Rgba);

    sys.bind_surface(mrt, 0, albedo).unwrap();
    let err = sys.bind_surface(mrt, 1, normals).unwrap_err();

    assert!(matches!(
        err,
        GlintError::AttachmentFormatMismatch {
            slot: 1,
            expected: PixelFormat::A8R8G8B8,
            found: PixelFormat::Float16Rgba,
        }
    ));
    assert!(fbo_of(&sys, mrt).surface(1).is_none());
    assert_eq!(fbo_of(&sys, mrt).surface(0), Some(&albedo));
}

#[test]
fn slot_beyond_driver_limit_is_rejected() {
    let mut sys = system(HeadlessProfile::default());
    let mrt = sys.create_multi_render_target("gbuffer", PoolId::DEFAULT).unwrap();
    let surface = colour_surface(&mut sys, 64, PixelFormat::A8R8G8B8);

    let err = sys.bind_surface(mrt, 8, surface).unwrap_err();
    assert!(matches!(err, GlintError::AttachmentSlotOutOfRange { slot: 8, max: 8 }));
}

#[test]
fn unrenderable_colour_format_reports_unsupported_combination() {
    // L8 is not a renderable colour format on the default profile.
    let (mut gl, mut state, surface, format) = raw_texture(0x8040, 32);
    let caps = gl.capabilities();
    let mut buffers = RenderBufferPool::new();
    let mut fbo = FrameBufferObject::new(&mut gl, &caps, context(1), 0);

    let err = fbo.bind_surface(&mut gl, &mut state, &mut buffers, 0, surface).unwrap_err();

    assert!(matches!(err, GlintError::UnsupportedFormatCombination { format: f } if f == format));
    assert!(fbo.surface(0).is_none());
}

#[test]
fn initialising_without_slot_zero_fails() {
    let (mut gl, mut state, surface, _) = raw_texture(GL_RGBA8, 32);
    let caps = gl.capabilities();
    let mut buffers = RenderBufferPool::new();
    let mut fbo = FrameBufferObject::new(&mut gl, &caps, context(1), 0);

    // Slot 1 alone does not initialise the framebuffer.
    fbo.bind_surface(&mut gl, &mut state, &mut buffers, 1, surface).unwrap();
    let err = fbo.initialise(&mut gl, &mut state, &mut buffers).unwrap_err();
    assert!(matches!(err, GlintError::MissingColourAttachment));
}

// ============================================================================
// Multi Render Target Tests
// ============================================================================

#[test]
fn multi_render_target_follows_its_surfaces() {
    let mut sys = system(HeadlessProfile::default());
    let mrt = sys.create_multi_render_target("gbuffer", PoolId::DEFAULT).unwrap();
    let a = colour_surface(&mut sys, 512, PixelFormat::A8R8G8B8);
    let b = colour_surface(&mut sys, 512, PixelFormat::A8R8G8B8);

    sys.bind_surface(mrt, 0, a).unwrap();
    sys.bind_surface(mrt, 2, b).unwrap();

    let target = sys.target(mrt).unwrap();
    assert_eq!((target.width(), target.height()), (512, 512));
    assert_eq!(target.format(), PixelFormat::A8R8G8B8);

    sys.set_render_target(mrt).unwrap();
    let fbo = fbo_of(&sys, mrt);
    assert_eq!(sys.driver().bound_framebuffer(FramebufferTarget::Draw), fbo.name());
    assert!(sys.depth_buffer_for(mrt).is_some());
}

#[test]
fn resized_multi_render_target_drops_incompatible_depth() {
    let mut sys = system(HeadlessProfile::default());
    let mrt = sys.create_multi_render_target("gbuffer", PoolId::DEFAULT).unwrap();
    let small = colour_surface(&mut sys, 512, PixelFormat::A8R8G8B8);
    let large = colour_surface(&mut sys, 1024, PixelFormat::A8R8G8B8);

    sys.bind_surface(mrt, 0, small).unwrap();
    sys.set_render_target(mrt).unwrap();
    assert!(sys.depth_buffer_for(mrt).is_some());

    sys.bind_surface(mrt, 0, large).unwrap();
    assert_eq!(sys.target(mrt).unwrap().width(), 1024);
    assert_eq!(sys.depth_buffer_for(mrt), None);

    sys.set_render_target(mrt).unwrap();
    let depth = sys.depth_buffer_for(mrt).unwrap();
    assert_eq!(sys.depth_pool().get(depth).unwrap().width(), 1024);
}

// ============================================================================
// Depth Attachment Tests
// ============================================================================

#[test]
fn packed_depth_is_attached_at_both_points() {
    let mut sys = system(HeadlessProfile::default());
    let id = sys
        .create_render_texture(RenderTextureDesc::new("rt", 256, 256, PixelFormat::A8R8G8B8))
        .unwrap();

    let fbo = fbo_of(&sys, id).name();
    let depth = sys.driver().attached_renderbuffer(fbo, Attachment::Depth).unwrap();
    let stencil = sys.driver().attached_renderbuffer(fbo, Attachment::Stencil).unwrap();
    assert_eq!(depth, stencil);
    assert_eq!(sys.driver().renderbuffer_extent(depth), Some((256, 256, 0)));
}

// ============================================================================
// Multisample Tests
// ============================================================================

#[test]
fn multisampled_target_renders_into_companion_and_resolves_on_swap() {
    let mut sys = system(HeadlessProfile::default());
    let id = sys
        .create_render_texture(RenderTextureDesc::new("msaa", 512, 512, PixelFormat::A8R8G8B8).with_samples(4))
        .unwrap();
    let (name, multisample) = {
        let fbo = fbo_of(&sys, id);
        assert_eq!(fbo.samples(), 4);
        assert_ne!(fbo.multisample_name(), 0);
        assert_eq!(fbo.render_name(), fbo.multisample_name());
        (fbo.name(), fbo.multisample_name())
    };
    assert_eq!(sys.target(id).unwrap().samples(), 4);

    sys.set_render_target(id).unwrap();
    assert_eq!(sys.driver().bound_framebuffer(FramebufferTarget::Draw), multisample);

    sys.swap_buffers(id).unwrap();
    let blits = sys.driver().blits();
    assert_eq!(blits.len(), 1);
    assert_eq!(blits[0].read_framebuffer, multisample);
    assert_eq!(blits[0].draw_framebuffer, name);
    assert_eq!(blits[0].src.width, 512);
    // The previous binding is restored.
    assert_eq!(sys.driver().bound_framebuffer(FramebufferTarget::Draw), multisample);
}

#[test]
fn single_sampled_target_swap_does_nothing() {
    let mut sys = system(HeadlessProfile::default());
    let id = sys
        .create_render_texture(RenderTextureDesc::new("plain", 512, 512, PixelFormat::A8R8G8B8))
        .unwrap();

    assert_eq!(fbo_of(&sys, id).multisample_name(), 0);
    sys.swap_buffers(id).unwrap();
    assert!(sys.driver().blits().is_empty());
}

#[test]
fn sample_count_is_clamped_to_driver_maximum() {
    let mut sys = system(HeadlessProfile::default());
    let id = sys
        .create_render_texture(RenderTextureDesc::new("msaa", 128, 128, PixelFormat::A8R8G8B8).with_samples(32))
        .unwrap();

    assert_eq!(fbo_of(&sys, id).samples(), 8);
    assert_eq!(sys.target(id).unwrap().samples(), 8);
}

#[test]
fn identical_multisample_targets_share_colour_buffer() {
    let mut sys = system(HeadlessProfile::default());
    let desc = RenderTextureDesc::new("msaa", 256, 256, PixelFormat::A8R8G8B8).with_samples(4);
    let a = sys.create_render_texture(desc.clone()).unwrap();
    let b = sys.create_render_texture(desc).unwrap();

    let pool = sys.rtt().fbo_manager().unwrap().render_buffers();
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.ref_count(GL_RGBA8, 256, 256, 4), 2);
    assert_eq!(
        fbo_of(&sys, a).multisample_colour().map(|rb| rb.name),
        fbo_of(&sys, b).multisample_colour().map(|rb| rb.name)
    );

    sys.destroy_render_target(a).unwrap();
    let pool = sys.rtt().fbo_manager().unwrap().render_buffers();
    assert_eq!(pool.ref_count(GL_RGBA8, 256, 256, 4), 1);

    sys.destroy_render_target(b).unwrap();
    assert!(sys.rtt().fbo_manager().unwrap().render_buffers().is_empty());
    assert_eq!(sys.driver().live_renderbuffers(), 0);
}

// ============================================================================
// Render Buffer Pool Tests
// ============================================================================

#[test]
fn render_buffer_pool_counts_references() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut gl = HeadlessDriver::default();
    let mut state = StateCache::new(&gl.capabilities());
    let mut pool = RenderBufferPool::new();

    let first = pool.request(&mut gl, &mut state, GL_RGBA8, 64, 64, 4).unwrap();
    let second = pool.request(&mut gl, &mut state, GL_RGBA8, 64, 64, 4).unwrap();
    let other = pool.request(&mut gl, &mut state, GL_RGBA8, 64, 64, 2).unwrap();

    assert_eq!(first, second);
    assert_ne!(first.name, other.name);
    assert_eq!(pool.len(), 2);
    assert_eq!(gl.live_renderbuffers(), 2);

    pool.release(&mut gl, &mut state, &first);
    assert_eq!(gl.live_renderbuffers(), 2);
    pool.release(&mut gl, &mut state, &second);
    pool.release(&mut gl, &mut state, &other);
    assert!(pool.is_empty());
    assert_eq!(gl.live_renderbuffers(), 0);
}

// ============================================================================
// Context Ownership Tests
// ============================================================================

#[test]
fn binding_from_another_context_recreates_native_objects() {
    let (mut gl, mut state, surface, _) = raw_texture(GL_RGBA8, 64);
    let caps = gl.capabilities();
    let mut buffers = RenderBufferPool::new();
    let mut fbo = FrameBufferObject::new(&mut gl, &caps, context(1), 0);
    fbo.bind_surface(&mut gl, &mut state, &mut buffers, 0, surface).unwrap();
    let original = fbo.name();

    let mismatch = fbo.bind(&mut gl, &mut state, &mut buffers, context(2), true).unwrap();
    assert!(mismatch);
    assert_eq!(fbo.context(), Some(context(2)));
    assert_ne!(fbo.name(), original);
    assert_eq!(gl.bound_framebuffer(FramebufferTarget::Draw), fbo.name());

    // The old name is left for its own context to delete.
    assert_eq!(gl.live_framebuffers(), 2);
    let orphaned = fbo.take_orphaned();
    assert_eq!(
        orphaned,
        vec![ContextFramebuffers {
            context: context(1),
            names: [original, 0],
        }]
    );
    orphaned[0].delete(&mut gl, &mut state);
    assert_eq!(gl.live_framebuffers(), 1);

    let again = fbo.bind(&mut gl, &mut state, &mut buffers, context(2), true).unwrap();
    assert!(!again);
    assert!(fbo.take_orphaned().is_empty());
}

#[test]
fn binding_from_another_context_without_recreate_leaves_it_unbound() {
    let (mut gl, mut state, surface, _) = raw_texture(GL_RGBA8, 64);
    let caps = gl.capabilities();
    let mut buffers = RenderBufferPool::new();
    let mut fbo = FrameBufferObject::new(&mut gl, &caps, context(1), 0);
    fbo.bind_surface(&mut gl, &mut state, &mut buffers, 0, surface).unwrap();

    let mismatch = fbo.bind(&mut gl, &mut state, &mut buffers, context(2), false).unwrap();
    assert!(mismatch);
    assert_eq!(fbo.context(), None);
    assert_eq!(fbo.name(), 0);
    assert_eq!(gl.call_count("delete_framebuffer"), 0);
    assert_eq!(fbo.take_orphaned().len(), 1);
}

#[test]
fn destroy_releases_native_objects() {
    let (mut gl, mut state, surface, _) = raw_texture(GL_RGBA8, 64);
    let caps = gl.capabilities();
    let mut buffers = RenderBufferPool::new();
    let mut fbo = FrameBufferObject::new(&mut gl, &caps, context(1), 4);
    fbo.bind_surface(&mut gl, &mut state, &mut buffers, 0, surface.with_samples(4)).unwrap();
    assert_eq!(gl.live_framebuffers(), 2);
    assert_eq!(buffers.len(), 1);

    for framebuffers in fbo.destroy(&mut gl, &mut state, &mut buffers) {
        assert_eq!(framebuffers.context, context(1));
        framebuffers.delete(&mut gl, &mut state);
    }
    assert_eq!(gl.live_framebuffers(), 0);
    assert!(buffers.is_empty());
    assert_eq!(gl.live_renderbuffers(), 0);
}

#[test]
fn foreign_framebuffers_wait_for_their_context() -> anyhow::Result<()> {
    let mut sys = system(HeadlessProfile::default());
    let main = sys.contexts().main();
    let main_native = sys.contexts().get(main).unwrap().native();
    sys.create_window(WindowDesc::new("main", 800, 600))?;
    let tools = sys.create_window(WindowDesc::new("tools", 320, 240))?;
    let rt = sys.create_render_texture(RenderTextureDesc::new("rt", 256, 256, PixelFormat::A8R8G8B8))?;
    let name = fbo_of(&sys, rt).name();
    assert_eq!(sys.driver().framebuffer_owner(name), Some(main_native));

    sys.set_render_target(tools)?;
    assert_ne!(sys.current_context(), main);
    sys.detach_depth_buffer(rt)?;

    // Nothing was deleted in the wrong context.
    assert_eq!(fbo_of(&sys, rt).context(), None);
    assert_eq!(sys.driver().foreign_framebuffer_deletes(), 0);
    assert_eq!(sys.driver().framebuffer_owner(name), Some(main_native));
    assert_eq!(sys.contexts().get(main).unwrap().pending_framebuffers(), &[name]);

    sys.switch_context(main)?;
    assert_eq!(sys.driver().framebuffer_owner(name), None);
    assert!(sys.contexts().get(main).unwrap().pending_framebuffers().is_empty());
    assert_eq!(sys.driver().foreign_framebuffer_deletes(), 0);
    Ok(())
}

#[test]
fn destroying_a_foreign_render_texture_defers_until_shutdown() -> anyhow::Result<()> {
    let mut sys = system(HeadlessProfile::default());
    let main = sys.contexts().main();
    sys.create_window(WindowDesc::new("main", 800, 600))?;
    let tools = sys.create_window(WindowDesc::new("tools", 320, 240))?;
    let rt = sys.create_render_texture(
        RenderTextureDesc::new("rt", 128, 128, PixelFormat::A8R8G8B8).with_pool(PoolId::NO_DEPTH),
    )?;
    let name = fbo_of(&sys, rt).name();

    sys.set_render_target(tools)?;
    sys.destroy_render_target(rt)?;
    assert_eq!(sys.contexts().get(main).unwrap().pending_framebuffers(), &[name]);
    assert_eq!(sys.driver().live_framebuffers(), 1);

    sys.shutdown()?;
    assert_eq!(sys.current_context(), main);
    assert_eq!(sys.driver().live_framebuffers(), 0);
    assert_eq!(sys.driver().foreign_framebuffer_deletes(), 0);
    Ok(())
}

#[test]
fn framebuffers_of_a_closed_window_go_with_its_context() -> anyhow::Result<()> {
    let mut sys = system(HeadlessProfile::default());
    let primary = sys.create_window(WindowDesc::new("main", 800, 600))?;
    let tools = sys.create_window(WindowDesc::new("tools", 320, 240))?;

    // Created while the secondary window's context is current.
    sys.set_render_target(tools)?;
    let tools_context = sys.current_context();
    let rt = sys.create_render_texture(
        RenderTextureDesc::new("rt", 128, 128, PixelFormat::A8R8G8B8).with_pool(PoolId::NO_DEPTH),
    )?;
    assert_eq!(fbo_of(&sys, rt).context(), Some(tools_context));

    let tools_native = sys.contexts().get(tools_context).unwrap().native();

    sys.set_render_target(primary)?;
    sys.destroy_render_target(rt)?;
    assert_eq!(sys.contexts().get(tools_context).unwrap().pending_framebuffers().len(), 1);
    assert_eq!(sys.driver().live_framebuffers_in(tools_native), 1);

    sys.destroy_render_target(tools)?;
    assert!(sys.contexts().get(tools_context).is_none());
    assert_eq!(sys.driver().live_framebuffers(), 0);
    assert_eq!(sys.driver().foreign_framebuffer_deletes(), 0);
    Ok(())
}
