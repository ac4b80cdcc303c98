use bytemuck::{Pod, Zeroable};

use crate::transform::Mat4;

use super::plan::ColorEffects;

/// CPU mirror of the std140 `PassParams` block shared by every stage.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PassUniforms {
    pub u_transform: [[f32; 4]; 4],
    /// xy: texel step in uv units along the blur axis.
    pub u_texel_step: [f32; 4],
    /// x: darken, y: vignette, z: grayscale, w: brightness.
    pub u_effects: [f32; 4],
    /// x: slot alpha.
    pub u_output: [f32; 4],
}

unsafe impl Zeroable for PassUniforms {}
unsafe impl Pod for PassUniforms {}

pub(crate) const PASS_UNIFORMS_SIZE: u64 = std::mem::size_of::<PassUniforms>() as u64;

impl PassUniforms {
    pub fn new(transform: &Mat4) -> Self {
        Self {
            u_transform: transform.to_cols_array(),
            u_texel_step: [0.0; 4],
            u_effects: [0.0, 0.0, 0.0, 1.0],
            u_output: [1.0, 0.0, 0.0, 0.0],
        }
    }

    /// Horizontal blur over a picture drawn `scaled_width` pixels wide.
    pub fn blur_horizontal(transform: &Mat4, radius: f32, scaled_width: f32) -> Self {
        let mut uniforms = Self::new(transform);
        uniforms.u_texel_step[0] = tap_step(radius, scaled_width);
        uniforms
    }

    /// Vertical blur over a full-surface target `surface_height` pixels tall.
    pub fn blur_vertical(transform: &Mat4, radius: f32, surface_height: f32) -> Self {
        let mut uniforms = Self::new(transform);
        uniforms.u_texel_step[1] = tap_step(radius, surface_height);
        uniforms
    }

    pub fn effects(transform: &Mat4, effects: ColorEffects, alpha: f32) -> Self {
        let mut uniforms = Self::new(transform);
        uniforms.u_effects = [
            effects.darken,
            effects.vignette,
            effects.grayscale,
            effects.brightness,
        ];
        uniforms.u_output[0] = alpha.clamp(0.0, 1.0);
        uniforms
    }
}

// Four taps either side of centre, so a radius spreads over four steps.
fn tap_step(radius: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return 0.0;
    }
    (radius.max(0.0) / 4.0) / extent
}
