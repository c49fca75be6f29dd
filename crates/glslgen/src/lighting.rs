use capability::{LightDescriptor, LightKind, ShadowKind};

use crate::writer::{sample, StageWriter, TextureShape};

/// Where a lit pass reads light visibility from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShadowSource {
    /// Screen-space mask written by the shadow mask pre-pass.
    Mask,
    /// The light's shadow map, sampled directly.
    Map,
}

/// Defines `vec3 to_light` and `float attenuation`. Reads `position`.
pub(crate) fn incident(stage: &mut StageWriter, kind: LightKind) {
    match kind {
        LightKind::Directional => {
            stage
                .line("vec3 to_light = normalize(-light.direction.xyz);")
                .line("float attenuation = 1.0;");
        }
        LightKind::Spherical | LightKind::Projective => {
            stage
                .line("vec3 light_offset = light.position.xyz - position;")
                .line("vec3 to_light = normalize(light_offset);")
                .line("float attenuation = 1.0 / (1.0 + light.falloff.x * dot(light_offset, light_offset));");
            if kind == LightKind::Projective {
                stage
                    .line("float cone = dot(-to_light, normalize(light.direction.xyz));")
                    .line("attenuation *= smoothstep(light.falloff.z, light.falloff.y, cone);");
            }
        }
    }
}

/// Declares `shadow_visibility(vec3 coord)` over the light's shadow map.
pub(crate) fn shadow_map_helper(stage: &mut StageWriter, kind: ShadowKind) {
    stage.texture(TextureShape::Flat, "shadow_map");
    let lookup = sample("shadow_map", TextureShape::Flat, "coord.xy");
    let body = match kind {
        ShadowKind::None => "    return 1.0;\n".to_string(),
        ShadowKind::Basic => format!(
            "    float stored = {lookup}.r;\n    return coord.z - light.falloff.w <= stored ? 1.0 : 0.0;\n"
        ),
        ShadowKind::Variance => format!(
            "    vec2 moments = {lookup}.rg;\n\
             \x20   if (coord.z <= moments.x) {{\n\
             \x20       return 1.0;\n\
             \x20   }}\n\
             \x20   float variance = max(moments.y - moments.x * moments.x, 0.00002);\n\
             \x20   float delta = coord.z - moments.x;\n\
             \x20   return variance / (variance + delta * delta);\n"
        ),
    };
    stage.helper(&format!("float shadow_visibility(vec3 coord) {{\n{body}}}\n"));
}

/// Projects `position` into light space. Defines `vec3 shadow_coord`.
pub(crate) fn shadow_coord(stage: &mut StageWriter) {
    stage
        .line("vec4 shadow_clip = light.view_projection * vec4(position, 1.0);")
        .line("vec3 shadow_coord = shadow_clip.xyz / shadow_clip.w * 0.5 + 0.5;");
}

/// Defines `float visibility`.
pub(crate) fn visibility(stage: &mut StageWriter, light: &LightDescriptor, source: ShadowSource) {
    if !light.casts_shadow() {
        stage.line("float visibility = 1.0;");
        return;
    }
    match source {
        ShadowSource::Mask => {
            stage.texture(TextureShape::Flat, "shadow_mask");
            stage.line(format!(
                "float visibility = {}.r;",
                sample(
                    "shadow_mask",
                    TextureShape::Flat,
                    "gl_FragCoord.xy * frame.inverse_viewport"
                )
            ));
        }
        ShadowSource::Map => {
            shadow_map_helper(stage, light.shadow());
            shadow_coord(stage);
            stage.line("float visibility = shadow_visibility(shadow_coord);");
        }
    }
}

/// Lambert diffuse plus Blinn specular. Defines `vec3 lit`; reads `n`,
/// `to_eye`, `to_light`, `attenuation`, `visibility`, `base` and
/// `specular_color`.
pub(crate) fn shade(stage: &mut StageWriter) {
    stage
        .line("float diffuse = max(dot(n, to_light), 0.0);")
        .line("vec3 halfway = normalize(to_light + to_eye);")
        .line("float highlight = pow(max(dot(n, halfway), 0.0), material.specular.a);")
        .line("vec3 lit = (base.rgb * diffuse + specular_color * highlight) * light.color.rgb * attenuation * visibility;");
}

/// The full-screen triangle vertex stage shared by screen-space passes.
pub(crate) const FULLSCREEN_VERTEX: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Reconstructs the world position of a screen-space fragment from the
/// g-buffer depth. Defines `vec3 position`.
pub(crate) fn reconstruct_position(stage: &mut StageWriter) {
    stage.texture(TextureShape::Flat, "gbuffer_depth");
    stage
        .line(format!(
            "float depth = {}.r;",
            sample("gbuffer_depth", TextureShape::Flat, "v_uv")
        ))
        .line("vec4 world = frame.inverse_view_projection * vec4(v_uv * 2.0 - 1.0, depth, 1.0);")
        .line("vec3 position = world.xyz / world.w;");
}
