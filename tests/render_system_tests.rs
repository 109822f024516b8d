//! Render System Tests
//!
//! Tests for:
//! - Render-to-texture path selection and capability adjustment
//! - Windows and their contexts
//! - Target attribute queries
//! - Binding render targets on each path (context switches, copies, sRGB,
//!   viewport)
//! - Background thread contexts
//! - Settings loading and sample clamping
//! - Shutdown and resource invalidation

use glint::gl_types::{BufferTarget, Capability, FramebufferTarget, Viewport};
use glint::rtt::RttManager;
use glint::{
    AttributeValue, ContextGroup, ContextId, DepthStencilMode, GlDriver, GlintError, HeadlessDriver,
    HeadlessProfile, PixelFormat, PoolId, RenderCapabilities, RenderSystem, RenderSystemSettings, RenderTextureDesc,
    RttPreference, TargetAttribute, WindowDesc,
};

fn system_with(profile: HeadlessProfile, settings: RenderSystemSettings) -> RenderSystem<HeadlessDriver> {
    let _ = env_logger::builder().is_test(true).try_init();
    RenderSystem::new(HeadlessDriver::new(profile), settings).unwrap()
}

fn system(profile: HeadlessProfile) -> RenderSystem<HeadlessDriver> {
    system_with(profile, RenderSystemSettings::default())
}

fn copying_profile() -> HeadlessProfile {
    HeadlessProfile::legacy().without_capability(RenderCapabilities::PBUFFER)
}

fn rgba(name: &str, width: u32, height: u32) -> RenderTextureDesc {
    RenderTextureDesc::new(name, width, height, PixelFormat::A8R8G8B8)
}

// ============================================================================
// Path Selection Tests
// ============================================================================

#[test]
fn framebuffer_objects_are_preferred() {
    let sys = system(HeadlessProfile::default());

    assert_eq!(sys.rtt().name(), "FBO");
    assert_eq!(sys.rtt().preference(), RttPreference::Fbo);
    assert_eq!(sys.capabilities().num_multi_render_targets, 8);
    assert!(sys.compatibility_table().is_some());
}

#[test]
fn pbuffers_are_used_without_framebuffer_objects() {
    let sys = system(HeadlessProfile::legacy());

    assert!(matches!(sys.rtt(), RttManager::PBuffer(_)));
    assert_eq!(sys.rtt().name(), "PBuffers");
    assert_eq!(sys.capabilities().num_multi_render_targets, 1);
    assert!(!sys.capabilities().has(RenderCapabilities::MULTI_RENDER_TARGETS));
    assert!(sys.compatibility_table().is_none());
    assert_eq!(sys.get_best_depth_stencil(PixelFormat::A8R8G8B8, true), DepthStencilMode::NONE);
}

#[test]
fn copying_is_the_last_resort() {
    let sys = system(copying_profile());

    assert!(matches!(sys.rtt(), RttManager::Copying(_)));
    assert_eq!(sys.rtt().preference(), RttPreference::Copy);
}

#[test]
fn preference_starts_the_fallback_chain() {
    let copy = RenderSystemSettings {
        rtt_preference: RttPreference::Copy,
        ..Default::default()
    };
    assert_eq!(system_with(HeadlessProfile::default(), copy).rtt().name(), "copying");

    let pbuffer = RenderSystemSettings {
        rtt_preference: RttPreference::PBuffer,
        ..Default::default()
    };
    let with_pbuffers = HeadlessProfile::default().with_capability(RenderCapabilities::PBUFFER);
    assert_eq!(system_with(with_pbuffers, pbuffer.clone()).rtt().name(), "PBuffers");
    // The default profile has no pbuffers, so the preference falls through.
    assert_eq!(system_with(HeadlessProfile::default(), pbuffer).rtt().name(), "copying");
}

#[test]
fn multi_render_targets_need_framebuffer_objects() {
    let mut sys = system(HeadlessProfile::legacy());

    let err = sys.create_multi_render_target("gbuffer", PoolId::DEFAULT).unwrap_err();
    assert!(matches!(err, GlintError::MultiRenderTargetUnsupported("PBuffers")));
    assert_eq!(sys.targets().count(), 0);
}

#[test]
fn copying_path_refuses_multi_render_targets() {
    let mut sys = system(copying_profile());

    let err = sys.create_multi_render_target("gbuffer", PoolId::DEFAULT).unwrap_err();
    assert!(matches!(err, GlintError::MultiRenderTargetUnsupported("copying")));
    assert!(err.to_string().contains("copying"));
}

// ============================================================================
// Format Check Tests
// ============================================================================

#[test]
fn unrenderable_formats_are_refused() {
    let mut sys = system(HeadlessProfile::default());

    let err = sys
        .create_render_texture(RenderTextureDesc::new("dxt", 64, 64, PixelFormat::Dxt1))
        .unwrap_err();
    assert!(matches!(err, GlintError::UnsupportedFormat(PixelFormat::Dxt1)));

    let err = sys
        .create_render_texture(RenderTextureDesc::new("lum", 64, 64, PixelFormat::L8))
        .unwrap_err();
    assert!(matches!(err, GlintError::UnsupportedFormat(PixelFormat::L8)));
    assert_eq!(sys.driver().live_textures(), 0);
}

#[test]
fn copying_path_accepts_any_uncompressed_format() {
    let mut sys = system(copying_profile());

    assert!(
        sys.create_render_texture(RenderTextureDesc::new("lum", 64, 64, PixelFormat::L8))
            .is_ok()
    );
    assert!(
        sys.create_render_texture(RenderTextureDesc::new("dxt", 64, 64, PixelFormat::Dxt5))
            .is_err()
    );
}

// ============================================================================
// Window Tests
// ============================================================================

#[test]
fn first_window_uses_main_context_and_later_ones_share() {
    let mut sys = system(HeadlessProfile::default());
    let main = sys.contexts().main();

    let primary = sys.create_window(WindowDesc::new("primary", 1280, 720)).unwrap();
    let secondary = sys.create_window(WindowDesc::new("tools", 640, 480)).unwrap();

    assert_eq!(
        sys.attribute(primary, TargetAttribute::GlContext).unwrap(),
        AttributeValue::Context(main)
    );
    let AttributeValue::Context(tools) = sys.attribute(secondary, TargetAttribute::GlContext).unwrap() else {
        panic!("window without context");
    };
    assert_ne!(tools, main);
    assert_eq!(sys.driver().live_contexts(), 2);
    assert!(sys.target(secondary).unwrap().is_window());

    sys.destroy_render_target(secondary).unwrap();
    assert_eq!(sys.driver().live_contexts(), 1);
    assert!(sys.contexts().get(tools).is_none());
}

#[test]
fn window_depth_surface_is_released_with_window() {
    let mut sys = system(HeadlessProfile::default());

    let window = sys.create_window(WindowDesc::new("main", 800, 600)).unwrap();
    let depth = sys.depth_buffer_for(window).unwrap();
    let record = sys.depth_pool().get(depth).unwrap();
    assert!(record.is_manual());
    assert!(record.storage().is_none());

    sys.destroy_render_target(window).unwrap();
    assert!(sys.depth_pool().is_empty());

    // The next window becomes primary again.
    let next = sys.create_window(WindowDesc::new("again", 800, 600)).unwrap();
    assert_eq!(
        sys.attribute(next, TargetAttribute::GlContext).unwrap(),
        AttributeValue::Context(sys.contexts().main())
    );
}

#[test]
fn window_binding_selects_default_framebuffer() {
    let mut sys = system(HeadlessProfile::default());
    let window = sys.create_window(WindowDesc::new("main", 800, 600)).unwrap();
    let rt = sys.create_render_texture(rgba("rt", 256, 256)).unwrap();

    sys.set_render_target(rt).unwrap();
    assert_ne!(sys.driver().bound_framebuffer(FramebufferTarget::Draw), 0);

    sys.set_render_target(window).unwrap();
    assert_eq!(sys.driver().bound_framebuffer(FramebufferTarget::Draw), 0);
    assert_eq!(sys.active_target(), Some(window));
}

// ============================================================================
// Attribute Tests
// ============================================================================

#[test]
fn render_texture_attributes() {
    let mut sys = system(HeadlessProfile::default());
    let rt = sys.create_render_texture(rgba("rt", 128, 128)).unwrap();
    let fbo = sys.target(rt).unwrap().fbo().unwrap();

    assert_eq!(sys.attribute(rt, TargetAttribute::Fbo).unwrap(), AttributeValue::Fbo(fbo));
    assert_eq!(
        sys.attribute(rt, TargetAttribute::GlContext).unwrap(),
        AttributeValue::Context(sys.contexts().main())
    );
    assert_eq!(sys.attribute(rt, TargetAttribute::Target).unwrap(), AttributeValue::Target(rt));

    let window = sys.create_window(WindowDesc::new("main", 64, 64)).unwrap();
    assert_eq!(sys.attribute(window, TargetAttribute::Fbo).unwrap(), AttributeValue::None);

    sys.destroy_render_target(rt).unwrap();
    assert!(matches!(
        sys.attribute(rt, TargetAttribute::Target),
        Err(GlintError::UnknownRenderTarget)
    ));
}

#[test]
fn copying_texture_has_no_context_of_its_own() {
    let mut sys = system(copying_profile());
    let rt = sys.create_render_texture(rgba("rt", 128, 128)).unwrap();

    assert_eq!(sys.attribute(rt, TargetAttribute::Fbo).unwrap(), AttributeValue::None);
    assert_eq!(sys.attribute(rt, TargetAttribute::GlContext).unwrap(), AttributeValue::None);
}

// ============================================================================
// Binding Tests
// ============================================================================

#[test]
fn pbuffer_target_switches_context_and_copies_on_unbind() {
    let mut sys = system(HeadlessProfile::legacy());
    let main = sys.contexts().main();
    let window = sys.create_window(WindowDesc::new("main", 800, 600)).unwrap();
    let rt = sys.create_render_texture(rgba("reflection", 256, 256)).unwrap();

    let AttributeValue::Context(pbuffer) = sys.attribute(rt, TargetAttribute::GlContext).unwrap() else {
        panic!("pbuffer target without context");
    };
    assert_ne!(pbuffer, main);
    assert_eq!(sys.driver().live_contexts(), 2);

    sys.set_render_target(rt).unwrap();
    assert_eq!(sys.current_context(), pbuffer);
    assert_eq!(sys.driver().call_count("copy_tex_sub_image_2d"), 0);

    sys.set_render_target(window).unwrap();
    assert_eq!(sys.current_context(), main);
    assert_eq!(sys.driver().call_count("copy_tex_sub_image_2d"), 1);
}

#[test]
fn pbuffers_are_shared_per_component_type_and_grow() {
    let mut sys = system(HeadlessProfile::legacy());

    let small = sys.create_render_texture(rgba("small", 128, 128)).unwrap();
    let large = sys.create_render_texture(rgba("large", 512, 256)).unwrap();
    let float = sys
        .create_render_texture(RenderTextureDesc::new("hdr", 64, 64, PixelFormat::Float16Rgba))
        .unwrap();

    // One pbuffer for byte formats, one for half floats.
    assert_eq!(sys.driver().live_contexts(), 3);
    let RttManager::PBuffer(manager) = sys.rtt() else {
        panic!("expected the pbuffer path");
    };
    assert_eq!(manager.extent(PixelFormat::A8R8G8B8), Some((512, 256)));
    assert_eq!(manager.extent(PixelFormat::Float16Rgba), Some((64, 64)));

    sys.destroy_render_target(small).unwrap();
    assert_eq!(sys.driver().live_contexts(), 3);
    sys.destroy_render_target(large).unwrap();
    sys.destroy_render_target(float).unwrap();
    assert_eq!(sys.driver().live_contexts(), 1);
}

#[test]
fn copying_target_copies_back_buffer_on_unbind() {
    let mut sys = system(copying_profile());
    let window = sys.create_window(WindowDesc::new("main", 800, 600)).unwrap();
    let rt = sys.create_render_texture(rgba("mirror", 256, 256)).unwrap();

    sys.set_render_target(rt).unwrap();
    assert_eq!(sys.current_context(), sys.contexts().main());
    sys.set_render_target(window).unwrap();

    assert_eq!(sys.driver().call_count("copy_tex_sub_image_2d"), 1);
    let RttManager::Copying(manager) = sys.rtt() else {
        panic!("expected the copying path");
    };
    assert_eq!(manager.copies(), 1);
}

#[test]
fn binding_applies_viewport_and_srgb() {
    let mut sys = system(HeadlessProfile::default());
    let linear = sys.create_render_texture(rgba("linear", 256, 128)).unwrap();
    let srgb = sys.create_render_texture(rgba("srgb", 64, 64).with_srgb(true)).unwrap();

    sys.set_render_target(srgb).unwrap();
    assert!(sys.driver().is_enabled(Capability::FramebufferSrgb));

    sys.set_render_target(linear).unwrap();
    assert!(!sys.driver().is_enabled(Capability::FramebufferSrgb));
    assert_eq!(sys.state().unwrap().viewport(), Viewport::new(0, 0, 256, 128));
}

#[test]
fn binding_unknown_target_fails() {
    let mut sys = system(HeadlessProfile::default());
    let rt = sys.create_render_texture(rgba("rt", 32, 32)).unwrap();
    sys.destroy_render_target(rt).unwrap();

    assert!(matches!(sys.set_render_target(rt), Err(GlintError::UnknownRenderTarget)));
    assert!(matches!(sys.destroy_render_target(rt), Err(GlintError::UnknownRenderTarget)));
}

// ============================================================================
// Sample Count Tests
// ============================================================================

#[test]
fn default_fsaa_is_clamped_to_driver_maximum() {
    let settings = RenderSystemSettings {
        fsaa: 16,
        ..Default::default()
    };
    let mut sys = system_with(HeadlessProfile::default(), settings);

    let rt = sys.create_render_texture(rgba("rt", 64, 64)).unwrap();
    assert_eq!(sys.target(rt).unwrap().samples(), 8);

    let window = sys.create_window(WindowDesc::new("main", 64, 64).with_samples(2)).unwrap();
    assert_eq!(sys.target(window).unwrap().samples(), 2);
}

#[test]
fn non_fbo_paths_render_single_sampled() {
    let mut profile = HeadlessProfile::legacy();
    profile.capabilities.max_samples = 4;
    let mut sys = system(profile);

    let rt = sys.create_render_texture(rgba("rt", 64, 64).with_samples(4)).unwrap();
    assert_eq!(sys.target(rt).unwrap().samples(), 0);
}

// ============================================================================
// Context Tests
// ============================================================================

#[test]
fn background_threads_get_shared_contexts() {
    let mut sys = system(HeadlessProfile::default());

    let worker = sys.register_thread().unwrap();
    assert_eq!(sys.driver().live_contexts(), 2);
    assert_eq!(sys.contexts().group().len(), 2);
    assert!(!worker.is_initialized());

    sys.unregister_thread(worker);
    assert_eq!(sys.driver().live_contexts(), 1);
    assert_eq!(sys.contexts().group().len(), 1);
}

#[test]
fn thread_registration_needs_a_main_context() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut gl = HeadlessDriver::default();
    let caps = gl.capabilities();

    let err = ContextGroup::new().register_thread(&mut gl, &caps).unwrap_err();
    assert!(matches!(err, GlintError::NoMainContext));
}

#[test]
fn switching_to_unknown_context_fails() {
    let mut sys = system(HeadlessProfile::default());

    assert!(matches!(
        sys.switch_context(ContextId::default()),
        Err(GlintError::UnknownContext)
    ));
    sys.switch_context(sys.contexts().main()).unwrap();
}

#[test]
fn each_context_keeps_its_own_cache() -> anyhow::Result<()> {
    let mut sys = system(HeadlessProfile::default());
    let main = sys.contexts().main();
    sys.create_window(WindowDesc::new("main", 800, 600))?;
    let tools = sys.create_window(WindowDesc::new("tools", 320, 240))?;
    let AttributeValue::Context(tools) = sys.attribute(tools, TargetAttribute::GlContext)? else {
        panic!("window without context");
    };

    let (state, gl) = sys.state_and_driver()?;
    let vbo = gl.gen_buffer();
    state.bind_buffer(gl, BufferTarget::Array, vbo, false);
    assert_eq!(sys.driver().call_count("bind_buffer"), 1);

    // The other context has never seen the binding.
    sys.switch_context(tools)?;
    assert_eq!(sys.state()?.bound_buffer(BufferTarget::Array), None);
    let (state, gl) = sys.state_and_driver()?;
    state.bind_buffer(gl, BufferTarget::Array, vbo, false);
    state.bind_buffer(gl, BufferTarget::Array, vbo, false);
    assert_eq!(sys.driver().call_count("bind_buffer"), 2);
    assert_eq!(sys.driver().bound_buffer(BufferTarget::Array), vbo);

    // Back in the main context the cached binding still holds.
    sys.switch_context(main)?;
    let (state, gl) = sys.state_and_driver()?;
    state.bind_buffer(gl, BufferTarget::Array, vbo, false);
    assert_eq!(sys.driver().call_count("bind_buffer"), 2);
    assert_eq!(sys.driver().bound_buffer(BufferTarget::Array), vbo);
    Ok(())
}

#[test]
fn destroyed_resources_are_forgotten_by_the_cache() {
    let mut sys = system(HeadlessProfile::default());
    let (state, gl) = sys.state_and_driver().unwrap();
    let vbo = gl.gen_buffer();
    state.bind_buffer(gl, BufferTarget::Array, vbo, false);

    sys.notify_resource_destroyed(vbo);
    assert_eq!(sys.state().unwrap().bound_buffer(BufferTarget::Array), None);
}

// ============================================================================
// Settings Tests
// ============================================================================

#[test]
fn partial_settings_keep_defaults() {
    let settings = RenderSystemSettings::from_json(r#"{ "fsaa": 4, "rtt_preference": "Copy" }"#).unwrap();

    assert_eq!(settings.fsaa, 4);
    assert_eq!(settings.rtt_preference, RttPreference::Copy);
    assert!(settings.prefer_packed_depth_stencil);
    assert_eq!(settings.probe_size, 16);
    assert!(settings.probe_formats);
}

#[test]
fn settings_survive_json() -> anyhow::Result<()> {
    let settings = RenderSystemSettings {
        rtt_preference: RttPreference::PBuffer,
        fsaa: 2,
        prefer_packed_depth_stencil: false,
        probe_size: 8,
        probe_formats: false,
    };

    let json = settings.to_json()?;
    assert_eq!(RenderSystemSettings::from_json(&json)?, settings);
    Ok(())
}

#[test]
fn settings_use_plain_field_names() -> anyhow::Result<()> {
    let value = serde_json::to_value(RenderSystemSettings::default())?;

    assert_eq!(value["rtt_preference"], "Fbo");
    assert_eq!(value["fsaa"], 0);
    assert_eq!(value["prefer_packed_depth_stencil"], true);
    assert_eq!(value["probe_size"], 16);
    Ok(())
}

#[test]
fn malformed_settings_are_rejected() {
    let err = RenderSystemSettings::from_json(r#"{ "fsaa": "lots" }"#).unwrap_err();
    assert!(matches!(err, GlintError::InvalidSettings(_)));
    assert!(!err.is_fatal());
}

// ============================================================================
// Shutdown Tests
// ============================================================================

#[test]
fn shutdown_releases_everything() -> anyhow::Result<()> {
    let mut sys = system(HeadlessProfile::default());
    sys.create_window(WindowDesc::new("main", 800, 600))?;
    sys.create_window(WindowDesc::new("tools", 320, 240))?;
    sys.create_render_texture(rgba("a", 256, 256).with_samples(4))?;
    sys.create_render_texture(rgba("b", 512, 512))?;
    let mrt = sys.create_multi_render_target("gbuffer", PoolId::DEFAULT)?;
    let surface = {
        let id = sys.create_render_texture(rgba("albedo", 128, 128).with_pool(PoolId::NO_DEPTH))?;
        sys.render_texture_surface(id)?
    };
    sys.bind_surface(mrt, 0, surface)?;
    sys.set_render_target(mrt)?;

    sys.shutdown()?;

    assert_eq!(sys.targets().count(), 0);
    assert!(sys.depth_pool().is_empty());
    assert_eq!(sys.driver().live_framebuffers(), 0);
    assert_eq!(sys.driver().live_renderbuffers(), 0);
    assert_eq!(sys.driver().live_textures(), 0);
    assert_eq!(sys.driver().live_contexts(), 1);
    Ok(())
}
