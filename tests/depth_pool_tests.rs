//! Depth Buffer Pool Tests
//!
//! Tests for:
//! - Sharing within a pool and isolation between pools
//! - Larger-buffer reuse with and without driver support
//! - Multisample and depth-only targets
//! - Manual buffers: explicit attach, survival and release
//! - Window depth surfaces shared with copying targets
//! - Cleanup of unreferenced pooled buffers
//! - Fatal allocation failure

use glint::{
    AttributeValue, DepthFormat, DepthStencilMode, GlintError, HeadlessDriver, HeadlessProfile, PixelFormat, PoolId,
    RenderCapabilities, RenderSystem, RenderSystemSettings, RenderTextureDesc, StencilFormat, TargetAttribute,
    WindowDesc,
};

const PACKED_D24S8: DepthStencilMode = DepthStencilMode::new(DepthFormat::Packed24S8, StencilFormat::None);

fn system(profile: HeadlessProfile) -> RenderSystem<HeadlessDriver> {
    let _ = env_logger::builder().is_test(true).try_init();
    RenderSystem::new(HeadlessDriver::new(profile), RenderSystemSettings::default()).unwrap()
}

fn rgba(name: &str, size: u32) -> RenderTextureDesc {
    RenderTextureDesc::new(name, size, size, PixelFormat::A8R8G8B8)
}

// ============================================================================
// Pool Sharing Tests
// ============================================================================

#[test]
fn same_pool_targets_share_one_buffer() {
    let mut sys = system(HeadlessProfile::default());

    let a = sys.create_render_texture(rgba("a", 512)).unwrap();
    let b = sys.create_render_texture(rgba("b", 512)).unwrap();

    let depth = sys.depth_buffer_for(a).unwrap();
    assert_eq!(sys.depth_buffer_for(b), Some(depth));
    assert_eq!(sys.depth_pool().len(), 1);
    assert_eq!(sys.depth_pool().attached_count(depth), 2);
    assert_eq!(sys.depth_pool().get(depth).unwrap().mode(), Some(PACKED_D24S8));

    sys.destroy_render_target(a).unwrap();
    assert_eq!(sys.depth_pool().attached_count(depth), 1);
    assert!(sys.depth_pool().contains(depth));

    sys.destroy_render_target(b).unwrap();
    assert!(sys.depth_pool().is_empty());
    assert_eq!(sys.driver().live_renderbuffers(), 0);
    assert_eq!(sys.driver().live_framebuffers(), 0);
    assert_eq!(sys.driver().live_textures(), 0);
}

#[test]
fn different_pools_never_share() {
    let mut sys = system(HeadlessProfile::default());

    let a = sys.create_render_texture(rgba("a", 512).with_pool(PoolId(1))).unwrap();
    let b = sys.create_render_texture(rgba("b", 512).with_pool(PoolId(2))).unwrap();

    assert_ne!(sys.depth_buffer_for(a), sys.depth_buffer_for(b));
    assert_eq!(sys.depth_pool().pool_len(PoolId(1)), 1);
    assert_eq!(sys.depth_pool().pool_len(PoolId(2)), 1);
}

#[test]
fn no_depth_pool_gets_no_buffer() {
    let mut sys = system(HeadlessProfile::default());

    let id = sys.create_render_texture(rgba("shadowless", 256).with_pool(PoolId::NO_DEPTH)).unwrap();

    assert_eq!(sys.depth_buffer_for(id), None);
    assert_eq!(sys.set_depth_buffer_for(id).unwrap(), None);
    assert!(sys.depth_pool().is_empty());

    sys.set_render_target(id).unwrap();
    assert_eq!(sys.depth_buffer_for(id), None);
}

#[test]
fn stencil_free_targets_get_stencil_free_buffers() {
    let mut sys = system(HeadlessProfile::default());

    let with = sys.create_render_texture(rgba("with", 256)).unwrap();
    let without = sys.create_render_texture(rgba("without", 256).with_stencil(false)).unwrap();

    let without_depth = sys.depth_buffer_for(without).unwrap();
    assert_ne!(sys.depth_buffer_for(with), Some(without_depth));
    let mode = sys.depth_pool().get(without_depth).unwrap().mode().unwrap();
    assert_eq!(mode, DepthStencilMode::new(DepthFormat::D24, StencilFormat::None));
}

// ============================================================================
// Resolution Tests
// ============================================================================

#[test]
fn smaller_target_reuses_larger_buffer_when_supported() {
    let mut sys = system(HeadlessProfile::default());
    assert!(sys.depth_pool().allows_larger());

    let big = sys.create_render_texture(rgba("big", 512)).unwrap();
    let small = sys.create_render_texture(rgba("small", 256)).unwrap();

    assert_eq!(sys.depth_buffer_for(small), sys.depth_buffer_for(big));
    assert_eq!(sys.depth_pool().len(), 1);
}

#[test]
fn smaller_target_needs_exact_buffer_without_support() {
    let mut sys = system(
        HeadlessProfile::default().without_capability(RenderCapabilities::RTT_DEPTHBUFFER_RESOLUTION_LESSEQUAL),
    );
    assert!(!sys.depth_pool().allows_larger());

    let big = sys.create_render_texture(rgba("big", 512)).unwrap();
    let small = sys.create_render_texture(rgba("small", 256)).unwrap();

    let small_depth = sys.depth_buffer_for(small).unwrap();
    assert_ne!(sys.depth_buffer_for(big), Some(small_depth));
    let buffer = sys.depth_pool().get(small_depth).unwrap();
    assert_eq!((buffer.width(), buffer.height()), (256, 256));
}

#[test]
fn larger_target_never_reuses_smaller_buffer() {
    let mut sys = system(HeadlessProfile::default());

    let small = sys.create_render_texture(rgba("small", 256)).unwrap();
    let big = sys.create_render_texture(rgba("big", 1024)).unwrap();

    assert_ne!(sys.depth_buffer_for(small), sys.depth_buffer_for(big));
    let big_depth = sys.depth_buffer_for(big).unwrap();
    assert_eq!(sys.depth_pool().get(big_depth).unwrap().width(), 1024);
}

// ============================================================================
// Sample Count and Format Tests
// ============================================================================

#[test]
fn multisampled_buffers_are_not_shared_with_single_sampled() {
    let mut sys = system(HeadlessProfile::default());

    let msaa = sys.create_render_texture(rgba("msaa", 512).with_samples(4)).unwrap();
    let plain = sys.create_render_texture(rgba("plain", 512)).unwrap();

    let msaa_depth = sys.depth_buffer_for(msaa).unwrap();
    assert_ne!(sys.depth_buffer_for(plain), Some(msaa_depth));
    assert_eq!(sys.depth_pool().get(msaa_depth).unwrap().samples(), 4);
}

#[test]
fn depth_only_target_gets_best_depth_mode() {
    let mut sys = system(HeadlessProfile::default());

    let id = sys
        .create_render_texture(RenderTextureDesc::new("shadow map", 1024, 1024, PixelFormat::None))
        .unwrap();

    let depth = sys.depth_buffer_for(id).unwrap();
    assert_eq!(sys.depth_pool().get(depth).unwrap().mode(), Some(PACKED_D24S8));
    assert_eq!(sys.driver().live_textures(), 0);
}

// ============================================================================
// Manual Buffer Tests
// ============================================================================

#[test]
fn manual_buffer_survives_target_and_needs_release() {
    let mut sys = system(HeadlessProfile::default());
    let target = sys.create_render_texture(rgba("target", 512)).unwrap();
    let pooled = sys.depth_buffer_for(target).unwrap();

    let manual = sys.create_depth_buffer(target, PoolId(5)).unwrap();
    assert!(sys.depth_pool().get(manual).unwrap().is_manual());
    assert_eq!(sys.depth_pool().attached_count(manual), 0);

    sys.attach_depth_buffer(target, manual).unwrap();
    assert_eq!(sys.depth_buffer_for(target), Some(manual));
    assert_eq!(sys.target(target).unwrap().pool_id(), PoolId(5));

    // The pooled buffer lost its only user.
    assert_eq!(sys.cleanup_depth_buffers().unwrap(), 1);
    assert!(!sys.depth_pool().contains(pooled));

    let err = sys.release_depth_buffer(manual).unwrap_err();
    assert!(matches!(err, GlintError::DepthBufferInUse { attached: 1 }));

    sys.destroy_render_target(target).unwrap();
    assert!(sys.depth_pool().contains(manual));

    sys.release_depth_buffer(manual).unwrap();
    assert!(sys.depth_pool().is_empty());
    assert_eq!(sys.driver().live_renderbuffers(), 0);
}

#[test]
fn incompatible_manual_buffer_is_rejected() {
    let mut sys = system(HeadlessProfile::default());
    let small = sys.create_render_texture(rgba("small", 128)).unwrap();
    let big = sys.create_render_texture(rgba("big", 512)).unwrap();
    let manual = sys.create_depth_buffer(small, PoolId::DEFAULT).unwrap();

    let err = sys.attach_depth_buffer(big, manual).unwrap_err();
    assert!(matches!(err, GlintError::IncompatibleDepthBuffer));
    assert_ne!(sys.depth_buffer_for(big), Some(manual));
}

// ============================================================================
// Cleanup Tests
// ============================================================================

#[test]
fn detached_buffer_is_destroyed_by_cleanup_and_replaced_on_bind() {
    let mut sys = system(HeadlessProfile::default());
    let id = sys.create_render_texture(rgba("target", 256)).unwrap();
    let first = sys.depth_buffer_for(id).unwrap();

    sys.detach_depth_buffer(id).unwrap();
    assert_eq!(sys.depth_buffer_for(id), None);
    assert!(sys.depth_pool().contains(first));

    assert_eq!(sys.cleanup_depth_buffers().unwrap(), 1);
    assert!(sys.depth_pool().is_empty());

    sys.set_render_target(id).unwrap();
    assert!(sys.depth_buffer_for(id).is_some());
    assert_eq!(sys.depth_pool().len(), 1);
}

#[test]
fn copying_target_shares_window_depth_surface() {
    let mut sys = system(HeadlessProfile::legacy().without_capability(RenderCapabilities::PBUFFER));
    let window = sys.create_window(WindowDesc::new("main", 800, 600)).unwrap();
    let surface = sys.depth_buffer_for(window).unwrap();

    let rt = sys
        .create_render_texture(RenderTextureDesc::new("copy", 800, 600, PixelFormat::A8R8G8B8))
        .unwrap();
    assert_eq!(sys.depth_buffer_for(rt), Some(surface));
    assert!(sys.depth_pool().get(surface).unwrap().storage().is_none());

    sys.destroy_render_target(rt).unwrap();
    assert!(sys.depth_pool().contains(surface));

    sys.destroy_render_target(window).unwrap();
    assert!(sys.depth_pool().is_empty());
}

#[test]
fn window_depth_surface_outlives_window_while_shared() {
    let mut sys = system(HeadlessProfile::legacy().without_capability(RenderCapabilities::PBUFFER));
    let window = sys.create_window(WindowDesc::new("main", 800, 600)).unwrap();
    let surface = sys.depth_buffer_for(window).unwrap();
    let rt = sys
        .create_render_texture(RenderTextureDesc::new("copy", 800, 600, PixelFormat::A8R8G8B8))
        .unwrap();

    sys.destroy_render_target(window).unwrap();
    assert!(sys.target(window).is_none());
    let record = sys.depth_pool().get(surface).unwrap();
    assert!(!record.is_manual());
    assert_eq!(record.attached(), &[rt]);

    sys.destroy_render_target(rt).unwrap();
    assert!(sys.depth_pool().is_empty());

    // The primary window slot was freed with the window.
    let next = sys.create_window(WindowDesc::new("again", 800, 600)).unwrap();
    assert_eq!(
        sys.attribute(next, TargetAttribute::GlContext).unwrap(),
        AttributeValue::Context(sys.contexts().main())
    );
}

#[test]
fn shutdown_with_copying_target_sharing_window_depth() -> anyhow::Result<()> {
    let mut sys = system(HeadlessProfile::legacy().without_capability(RenderCapabilities::PBUFFER));
    sys.create_window(WindowDesc::new("main", 800, 600))?;
    sys.create_render_texture(RenderTextureDesc::new("copy", 800, 600, PixelFormat::A8R8G8B8))?;

    sys.shutdown()?;

    assert_eq!(sys.targets().count(), 0);
    assert!(sys.depth_pool().is_empty());
    assert_eq!(sys.driver().live_textures(), 0);
    Ok(())
}

#[test]
fn pooled_buffers_cannot_be_released_by_hand() {
    let mut sys = system(HeadlessProfile::default());
    let target = sys.create_render_texture(rgba("rt", 256)).unwrap();
    let pooled = sys.depth_buffer_for(target).unwrap();
    sys.detach_depth_buffer(target).unwrap();

    let err = sys.release_depth_buffer(pooled).unwrap_err();
    assert!(matches!(err, GlintError::IncompatibleDepthBuffer));
    assert!(sys.depth_pool().contains(pooled));

    assert_eq!(sys.cleanup_depth_buffers().unwrap(), 1);
    assert_eq!(sys.driver().live_renderbuffers(), 0);
}

// ============================================================================
// Allocation Failure Tests
// ============================================================================

#[test]
fn out_of_memory_is_fatal_and_leaves_nothing_behind() {
    let mut sys = system(HeadlessProfile::default().with_memory_budget(1_100_000));

    let err = sys.create_render_texture(rgba("too big", 512)).unwrap_err();

    assert!(matches!(err, GlintError::OutOfMemory { width: 512, height: 512, .. }));
    assert!(err.is_fatal());
    assert_eq!(sys.targets().count(), 0);
    assert!(sys.depth_pool().is_empty());
    assert_eq!(sys.driver().live_textures(), 0);
    assert_eq!(sys.driver().live_renderbuffers(), 0);
    assert_eq!(sys.driver().allocated_bytes(), 0);
}
