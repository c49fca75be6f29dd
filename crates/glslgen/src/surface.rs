//! Mesh vertex stage and per-axis material snippets. Each snippet declares
//! the resources it reads and defines one local for later snippets.
use capability::{
    AlbedoKind, DepthKind, EmissiveKind, EnvironmentKind, NormalKind, SpecularKind,
    TranslucencyKind,
};

use crate::writer::{sample, StageWriter, TextureShape, FRAME, LIGHT, OBJECT};

/// Clip-space transform applied by the mesh vertex stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Projection {
    Camera,
    Light,
}

pub(crate) fn mesh_vertex(tangents: bool, projection: Projection) -> String {
    let mut stage = StageWriter::new();
    stage
        .input("vec3", "a_position")
        .input("vec3", "a_normal")
        .input("vec2", "a_uv");
    if tangents {
        stage.input("vec4", "a_tangent");
    }
    stage
        .output("vec3", "v_position")
        .output("vec3", "v_normal")
        .output("vec2", "v_uv");
    if tangents {
        stage.output("vec4", "v_tangent");
    }
    stage.block(&OBJECT);
    let clip = match projection {
        Projection::Camera => {
            stage.block(&FRAME);
            "frame.view_projection"
        }
        Projection::Light => {
            stage.block(&LIGHT);
            "light.view_projection"
        }
    };

    stage
        .line("vec4 world = object.model * vec4(a_position, 1.0);")
        .line("v_position = world.xyz;")
        .line("v_normal = (object.model * vec4(a_normal, 0.0)).xyz;")
        .line("v_uv = a_uv;");
    if tangents {
        stage.line("v_tangent = vec4((object.model * vec4(a_tangent.xyz, 0.0)).xyz, a_tangent.w);");
    }
    stage.line(format!("gl_Position = {clip} * world;"));
    stage.finish()
}

/// Fragment-side counterpart of `mesh_vertex`'s outputs.
pub(crate) fn mesh_inputs(stage: &mut StageWriter, tangents: bool) {
    stage
        .input("vec3", "v_position")
        .input("vec3", "v_normal")
        .input("vec2", "v_uv");
    if tangents {
        stage.input("vec4", "v_tangent");
    }
}

/// Defines `vec4 base`.
pub(crate) fn albedo(stage: &mut StageWriter, kind: AlbedoKind) {
    match kind {
        AlbedoKind::Textured => {
            stage.texture(TextureShape::Flat, "albedo");
            stage.line(format!(
                "vec4 base = {} * material.albedo;",
                sample("albedo", TextureShape::Flat, "v_uv")
            ));
        }
        AlbedoKind::Untextured => {
            stage.line("vec4 base = material.albedo;");
        }
    }
}

/// Discards fragments below the alpha cutoff. Reads `base`.
pub(crate) fn depth(stage: &mut StageWriter, kind: DepthKind) {
    if kind == DepthKind::Mapped {
        stage
            .line("if (base.a < material.alpha_cutoff) {")
            .line("    discard;")
            .line("}");
    }
}

/// Defines `float alpha`. Reads `base`.
pub(crate) fn translucency(stage: &mut StageWriter, kind: TranslucencyKind) {
    match kind {
        TranslucencyKind::Constant => stage.line("float alpha = material.opacity;"),
        TranslucencyKind::Mapped => stage.line("float alpha = base.a * material.opacity;"),
    };
}

/// Defines `vec3 n`.
pub(crate) fn normal(stage: &mut StageWriter, kind: NormalKind) {
    stage.line("vec3 n = normalize(v_normal);");
    if kind == NormalKind::Mapped {
        stage.texture(TextureShape::Flat, "normal_map");
        stage
            .line("vec3 t = normalize(v_tangent.xyz);")
            .line("vec3 b = cross(n, t) * v_tangent.w;")
            .line(format!(
                "vec3 perturbed = {}.xyz * 2.0 - 1.0;",
                sample("normal_map", TextureShape::Flat, "v_uv")
            ))
            .line("n = normalize(mat3(t, b, n) * perturbed);");
    }
}

/// Defines `vec3 specular_color`.
pub(crate) fn specular(stage: &mut StageWriter, kind: SpecularKind) {
    match kind {
        SpecularKind::None => stage.line("vec3 specular_color = vec3(0.0);"),
        SpecularKind::Constant => stage.line("vec3 specular_color = material.specular.rgb;"),
        SpecularKind::Mapped => {
            stage.texture(TextureShape::Flat, "specular_map");
            stage.line(format!(
                "vec3 specular_color = {}.rgb * material.specular.rgb;",
                sample("specular_map", TextureShape::Flat, "v_uv")
            ))
        }
    };
}

/// Defines `vec3 emitted`.
pub(crate) fn emissive(stage: &mut StageWriter, kind: EmissiveKind) {
    match kind {
        EmissiveKind::None => stage.line("vec3 emitted = vec3(0.0);"),
        EmissiveKind::Constant => stage.line("vec3 emitted = material.emissive.rgb;"),
        EmissiveKind::Mapped => {
            stage.texture(TextureShape::Flat, "emissive_map");
            stage.line(format!(
                "vec3 emitted = {}.rgb * material.emissive.rgb;",
                sample("emissive_map", TextureShape::Flat, "v_uv")
            ))
        }
    };
}

/// Defines `vec3 to_eye`. Reads `position`.
pub(crate) fn view_direction(stage: &mut StageWriter) {
    stage.line("vec3 to_eye = normalize(frame.camera_position.xyz - position);");
}

/// Defines `vec3 reflected`. Reads `n` and `to_eye`.
pub(crate) fn environment(stage: &mut StageWriter, kind: EnvironmentKind) {
    match kind {
        EnvironmentKind::None => stage.line("vec3 reflected = vec3(0.0);"),
        EnvironmentKind::Reflective => {
            stage.texture(TextureShape::Cube, "environment");
            stage.line(format!(
                "vec3 reflected = {}.rgb * material.specular.rgb;",
                sample("environment", TextureShape::Cube, "reflect(-to_eye, n)")
            ))
        }
    };
}
