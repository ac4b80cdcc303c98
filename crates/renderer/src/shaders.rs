//! GLSL sources for every program, compiled through naga's GLSL frontend.
//!
//! All stages share one uniform block (`PassParams`) so a single bind group
//! layout serves the blur and color-effects programs alike. The block layout
//! must match [`crate::gpu::uniforms::PassUniforms`].

use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::error::RenderError;

macro_rules! pass_params {
    () => {
        r"layout(std140, set = 0, binding = 0) uniform PassParams {
    mat4 u_transform;
    vec4 u_texel_step;
    vec4 u_effects;
    vec4 u_output;
} params;
"
    };
}

macro_rules! source_texture {
    () => {
        r"layout(set = 1, binding = 0) uniform texture2D u_texture;
layout(set = 1, binding = 1) uniform sampler u_sampler;
#define SOURCE sampler2D(u_texture, u_sampler)
"
    };
}

// Nine taps along one axis with pre-normalised, near-Gaussian weights. The
// radius only widens the tap spacing, so a zero step collapses to a passthrough.
macro_rules! blur_fragment {
    ($axis:literal) => {
        concat!(
            "#version 450\n",
            "layout(location = 0) in vec2 v_tex_coord;\n",
            "layout(location = 0) out vec4 out_color;\n",
            pass_params!(),
            source_texture!(),
            "const vec2 AXIS = ",
            $axis,
            ";\n",
            r"const float W0 = 0.2270270270;
const float W1 = 0.1945945946;
const float W2 = 0.1216216216;
const float W3 = 0.0540540541;
const float W4 = 0.0162162162;

void main() {
    vec2 step_uv = params.u_texel_step.xy * AXIS;
    vec4 color = texture(SOURCE, v_tex_coord) * W0;
    color += texture(SOURCE, v_tex_coord + step_uv) * W1;
    color += texture(SOURCE, v_tex_coord - step_uv) * W1;
    color += texture(SOURCE, v_tex_coord + step_uv * 2.0) * W2;
    color += texture(SOURCE, v_tex_coord - step_uv * 2.0) * W2;
    color += texture(SOURCE, v_tex_coord + step_uv * 3.0) * W3;
    color += texture(SOURCE, v_tex_coord - step_uv * 3.0) * W3;
    color += texture(SOURCE, v_tex_coord + step_uv * 4.0) * W4;
    color += texture(SOURCE, v_tex_coord - step_uv * 4.0) * W4;
    out_color = color;
}
"
        )
    };
}

/// Passthrough vertex stage: applies the pass transform and forwards both the
/// texture coordinate and the screen-space position.
pub const VERTEX_SHADER: &str = concat!(
    "#version 450\n",
    "layout(location = 0) in vec2 a_position;\n",
    "layout(location = 1) in vec2 a_tex_coord;\n",
    "layout(location = 0) out vec2 v_tex_coord;\n",
    "layout(location = 1) out vec2 v_screen;\n",
    pass_params!(),
    r"
void main() {
    vec4 clip = params.u_transform * vec4(a_position, 0.0, 1.0);
    v_tex_coord = a_tex_coord;
    v_screen = clip.xy * 0.5 + vec2(0.5, 0.5);
    gl_Position = clip;
}
"
);

pub const BLUR_HORIZONTAL_SHADER: &str = blur_fragment!("vec2(1.0, 0.0)");

pub const BLUR_VERTICAL_SHADER: &str = blur_fragment!("vec2(0.0, 1.0)");

/// Darken, vignette, grayscale and adaptive brightness in one branch-free stage.
///
/// Output is premultiplied by the slot alpha and blended additively, so two
/// slots at `1 - p` and `p` sum to a true crossfade.
pub const EFFECTS_SHADER: &str = concat!(
    "#version 450\n",
    "layout(location = 0) in vec2 v_tex_coord;\n",
    "layout(location = 1) in vec2 v_screen;\n",
    "layout(location = 0) out vec4 out_color;\n",
    pass_params!(),
    source_texture!(),
    r"
const vec3 LUMA = vec3(0.2126, 0.7152, 0.0722);

void main() {
    vec3 color = texture(SOURCE, v_tex_coord).rgb;
    float darken = params.u_effects.x;
    float vignette = params.u_effects.y;
    float grayscale = params.u_effects.z;
    float brightness = params.u_effects.w;
    float alpha = params.u_output.x;

    color = color * (1.0 - darken);

    float dist = length(v_screen - vec2(0.5, 0.5)) * 1.4142135;
    float falloff = 1.0 - smoothstep(0.35, 1.0, dist);
    color = mix(color, color * falloff, vignette);

    float luma = dot(color, LUMA);
    color = mix(color, vec3(luma, luma, luma), grayscale);

    color = color * brightness;
    out_color = vec4(color * alpha, alpha);
}
"
);

pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule, RenderError> {
    compile(device, "wallpaper vertex", VERTEX_SHADER, ShaderStage::Vertex)
}

pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    label: &'static str,
    source: &'static str,
) -> Result<wgpu::ShaderModule, RenderError> {
    compile(device, label, source, ShaderStage::Fragment)
}

fn compile(
    device: &wgpu::Device,
    label: &'static str,
    source: &'static str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::ProgramCompile {
            label,
            reason: err.to_string(),
        });
    }
    tracing::debug!(label, "compiled shader stage");
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga::front::glsl::{Frontend, Options};
    use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

    fn validate(source: &str, stage: ShaderStage) {
        let module = Frontend::default()
            .parse(&Options::from(stage), source)
            .unwrap_or_else(|err| panic!("glsl parse failed: {err:?}\n{source}"));
        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .unwrap_or_else(|err| panic!("validation failed: {err:?}"));
    }

    #[test]
    fn vertex_stage_validates() {
        validate(VERTEX_SHADER, ShaderStage::Vertex);
    }

    #[test]
    fn blur_stages_validate() {
        validate(BLUR_HORIZONTAL_SHADER, ShaderStage::Fragment);
        validate(BLUR_VERTICAL_SHADER, ShaderStage::Fragment);
    }

    #[test]
    fn effects_stage_validates() {
        validate(EFFECTS_SHADER, ShaderStage::Fragment);
    }

    #[test]
    fn blur_axes_differ_only_in_direction() {
        assert!(BLUR_HORIZONTAL_SHADER.contains("AXIS = vec2(1.0, 0.0)"));
        assert!(BLUR_VERTICAL_SHADER.contains("AXIS = vec2(0.0, 1.0)"));
        assert_eq!(
            BLUR_HORIZONTAL_SHADER.replace("vec2(1.0, 0.0);", "vec2(0.0, 1.0);"),
            BLUR_VERTICAL_SHADER
        );
    }

    #[test]
    fn blur_weights_are_normalised() {
        let weights = [0.2270270270f64, 0.1945945946, 0.1216216216, 0.0540540541, 0.0162162162];
        let total = weights[0] + 2.0 * weights[1..].iter().sum::<f64>();
        assert!((total - 1.0).abs() < 1e-6);
    }
}
