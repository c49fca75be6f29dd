//! Fixed auxiliary programs. Every key but the shadow mask is a literal.
use std::borrow::Cow;

use batch::program::compose;
use batch::AuxiliaryKey;
use capability::ShadowKind;

use crate::lighting::{self, FULLSCREEN_VERTEX};
use crate::writer::{StageWriter, FRAME, LIGHT};

const EMPTY: &str = r"//@stage vertex
#version 450

void main() {
    gl_Position = vec4(0.0, 0.0, 0.0, 1.0);
}
//@stage fragment
#version 450

void main() {
}
";

const FLAT_CLIP: &str = r"//@stage vertex
#version 450
layout(location = 0) in vec4 a_position;

void main() {
    gl_Position = a_position;
}
//@stage fragment
#version 450
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform FlatParams {
    vec4 color;
} flat_params;

void main() {
    out_color = flat_params.color;
}
";

const COPY_FRAGMENT: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(set = 1, binding = 0) uniform texture2D source_texture;
layout(set = 1, binding = 1) uniform sampler source_sampler;

void main() {
    out_color = texture(sampler2D(source_texture, source_sampler), v_uv);
}
";

const DEPTH_PREPASS: &str = r"//@stage vertex
#version 450
layout(location = 0) in vec3 a_position;

layout(std140, set = 0, binding = 0) uniform ObjectParams {
    mat4 model;
} object;
layout(std140, set = 0, binding = 1) uniform FrameParams {
    mat4 view_projection;
    mat4 inverse_view_projection;
    vec4 camera_position;
    vec2 inverse_viewport;
    vec2 _padding0;
} frame;

void main() {
    gl_Position = frame.view_projection * object.model * vec4(a_position, 1.0);
}
//@stage fragment
#version 450

void main() {
}
";

const AMBIENT_OCCLUSION_FRAGMENT: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_occlusion;

layout(std140, set = 0, binding = 0) uniform FrameParams {
    mat4 view_projection;
    mat4 inverse_view_projection;
    vec4 camera_position;
    vec2 inverse_viewport;
    vec2 _padding0;
} frame;

layout(set = 1, binding = 0) uniform texture2D gbuffer_depth_texture;
layout(set = 1, binding = 1) uniform sampler gbuffer_depth_sampler;

const vec2 taps[4] = vec2[4](
    vec2(1.0, 0.0),
    vec2(-1.0, 0.0),
    vec2(0.0, 1.0),
    vec2(0.0, -1.0)
);

void main() {
    float center = texture(sampler2D(gbuffer_depth_texture, gbuffer_depth_sampler), v_uv).r;
    float occlusion = 0.0;
    for (int i = 0; i < 4; i++) {
        vec2 uv = v_uv + taps[i] * frame.inverse_viewport * 4.0;
        float neighbour = texture(sampler2D(gbuffer_depth_texture, gbuffer_depth_sampler), uv).r;
        occlusion += step(neighbour, center - 0.001);
    }
    out_occlusion = vec4(1.0 - occlusion * 0.25);
}
";

const AMBIENT_OCCLUSION_BLUR_FRAGMENT: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_occlusion;

layout(std140, set = 0, binding = 0) uniform FrameParams {
    mat4 view_projection;
    mat4 inverse_view_projection;
    vec4 camera_position;
    vec2 inverse_viewport;
    vec2 _padding0;
} frame;

layout(set = 1, binding = 0) uniform texture2D occlusion_texture;
layout(set = 1, binding = 1) uniform sampler occlusion_sampler;

void main() {
    float sum = 0.0;
    for (int x = -1; x <= 1; x++) {
        for (int y = -1; y <= 1; y++) {
            vec2 uv = v_uv + vec2(float(x), float(y)) * frame.inverse_viewport;
            sum += texture(sampler2D(occlusion_texture, occlusion_sampler), uv).r;
        }
    }
    out_occlusion = vec4(sum / 9.0);
}
";

const VARIANCE_BLUR_FRAGMENT: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_moments;

layout(std140, set = 0, binding = 0) uniform BlurParams {
    vec2 direction;
    vec2 _padding0;
} blur;

layout(set = 1, binding = 0) uniform texture2D moments_texture;
layout(set = 1, binding = 1) uniform sampler moments_sampler;

const float weights[3] = float[3](0.375, 0.25, 0.0625);

void main() {
    vec2 sum = texture(sampler2D(moments_texture, moments_sampler), v_uv).rg * weights[0];
    for (int i = 1; i < 3; i++) {
        vec2 step_uv = blur.direction * float(i);
        sum += texture(sampler2D(moments_texture, moments_sampler), v_uv + step_uv).rg * weights[i];
        sum += texture(sampler2D(moments_texture, moments_sampler), v_uv - step_uv).rg * weights[i];
    }
    out_moments = vec4(sum, 0.0, 1.0);
}
";

/// Screen-space shadow pre-pass: projects each g-buffer position into the
/// light's shadow map and stores visibility.
pub(crate) fn shadow_mask(kind: ShadowKind) -> String {
    let mut stage = StageWriter::new();
    stage
        .input("vec2", "v_uv")
        .output("vec4", "out_visibility")
        .block(&FRAME)
        .block(&LIGHT);
    lighting::reconstruct_position(&mut stage);
    lighting::shadow_map_helper(&mut stage, kind);
    lighting::shadow_coord(&mut stage);
    stage.line("out_visibility = vec4(shadow_visibility(shadow_coord));");
    compose(FULLSCREEN_VERTEX, &stage.finish())
}

pub(crate) fn source(key: AuxiliaryKey) -> Cow<'static, str> {
    match key {
        AuxiliaryKey::Empty => Cow::Borrowed(EMPTY),
        AuxiliaryKey::FlatClip => Cow::Borrowed(FLAT_CLIP),
        AuxiliaryKey::DepthPrepass => Cow::Borrowed(DEPTH_PREPASS),
        AuxiliaryKey::Copy => Cow::Owned(compose(FULLSCREEN_VERTEX, COPY_FRAGMENT)),
        AuxiliaryKey::AmbientOcclusion => {
            Cow::Owned(compose(FULLSCREEN_VERTEX, AMBIENT_OCCLUSION_FRAGMENT))
        }
        AuxiliaryKey::AmbientOcclusionBlur => {
            Cow::Owned(compose(FULLSCREEN_VERTEX, AMBIENT_OCCLUSION_BLUR_FRAGMENT))
        }
        AuxiliaryKey::VarianceBlur => {
            Cow::Owned(compose(FULLSCREEN_VERTEX, VARIANCE_BLUR_FRAGMENT))
        }
        AuxiliaryKey::ShadowMask(kind) => Cow::Owned(shadow_mask(kind)),
    }
}
