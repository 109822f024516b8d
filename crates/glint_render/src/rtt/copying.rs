//! Copying render-to-texture path.
//!
//! The target is rendered into the back buffer of the current context and
//! copied into its texture when rendering finishes. Texture size is limited
//! by the window size; nothing is allocated besides the texture.

use glint_core::errors::Result;

use crate::context::ContextSet;
use crate::driver::GlDriver;
use crate::target::{RenderTarget, TargetKind};

#[derive(Debug, Default)]
pub struct CopyingManager {
    copies: u64,
}

impl CopyingManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of copies issued so far.
    #[must_use]
    pub fn copies(&self) -> u64 {
        self.copies
    }

    /// Copies the rendered region into the target's texture.
    pub fn unbind(&mut self, gl: &mut dyn GlDriver, contexts: &mut ContextSet, target: &RenderTarget) -> Result<()> {
        let TargetKind::RenderTexture {
            target: tex_target,
            texture,
            ..
        } = *target.kind()
        else {
            return Ok(());
        };
        if texture == 0 {
            return Ok(());
        }
        let state = contexts.current_state()?;
        state.bind_texture(gl, tex_target, texture, false);
        gl.copy_tex_sub_image_2d(tex_target, 0, target.width(), target.height());
        self.copies += 1;
        Ok(())
    }
}
