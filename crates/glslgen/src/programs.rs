use batch::program::compose;
use capability::{
    AlbedoKind, DepthKind, DepthMaterial, LightDescriptor, NormalKind, OpaqueMaterial,
    RefractionKind, RefractiveMaterial, ShadowKind, TranslucentMaterial,
};

use crate::lighting::{self, ShadowSource, FULLSCREEN_VERTEX};
use crate::surface::{self, Projection};
use crate::writer::{sample, StageWriter, TextureShape, FRAME, LIGHT, MATERIAL};

fn surface_fragment(tangents: bool) -> StageWriter {
    let mut stage = StageWriter::new();
    surface::mesh_inputs(&mut stage, tangents);
    stage.block(&FRAME).block(&MATERIAL);
    stage
}

/// Forward opaque shading. Without a light the surface is written unshaded.
pub(crate) fn opaque(material: &OpaqueMaterial, light: Option<&LightDescriptor>) -> String {
    let tangents = material.normal == NormalKind::Mapped;
    let mut stage = surface_fragment(tangents);
    if light.is_some() {
        stage.block(&LIGHT);
    }
    stage.output("vec4", "out_color");

    stage.line("vec3 position = v_position;");
    surface::albedo(&mut stage, material.albedo);
    surface::depth(&mut stage, material.depth);
    surface::normal(&mut stage, material.normal);
    surface::specular(&mut stage, material.specular);
    surface::emissive(&mut stage, material.emissive);
    surface::view_direction(&mut stage);
    surface::environment(&mut stage, material.environment);

    match light {
        Some(light) => {
            lighting::incident(&mut stage, light.kind());
            lighting::visibility(&mut stage, light, ShadowSource::Mask);
            lighting::shade(&mut stage);
            stage.line("out_color = vec4(lit + emitted + reflected, 1.0);");
        }
        None => {
            stage.line("out_color = vec4(base.rgb + emitted + reflected, 1.0);");
        }
    }

    compose(
        &surface::mesh_vertex(tangents, Projection::Camera),
        &stage.finish(),
    )
}

/// Writes the g-buffer: albedo, encoded normal, specular and emission.
pub(crate) fn geometry(material: &OpaqueMaterial) -> String {
    let tangents = material.normal == NormalKind::Mapped;
    let mut stage = surface_fragment(tangents);
    stage
        .output("vec4", "out_albedo")
        .output("vec4", "out_normal")
        .output("vec4", "out_specular")
        .output("vec4", "out_emissive");

    surface::albedo(&mut stage, material.albedo);
    surface::depth(&mut stage, material.depth);
    surface::normal(&mut stage, material.normal);
    surface::specular(&mut stage, material.specular);
    surface::emissive(&mut stage, material.emissive);
    stage
        .line("out_albedo = vec4(base.rgb, 1.0);")
        .line("out_normal = vec4(n * 0.5 + 0.5, 1.0);")
        .line("out_specular = vec4(specular_color, material.specular.a);")
        .line("out_emissive = vec4(emitted, 1.0);");

    compose(
        &surface::mesh_vertex(tangents, Projection::Camera),
        &stage.finish(),
    )
}

/// Translucent shading, lit by one light or unlit.
pub(crate) fn translucent(
    material: &TranslucentMaterial,
    light: Option<&LightDescriptor>,
) -> String {
    let tangents = material.normal == NormalKind::Mapped;
    let mut stage = surface_fragment(tangents);
    if light.is_some() {
        stage.block(&LIGHT);
    }
    stage.output("vec4", "out_color");

    stage.line("vec3 position = v_position;");
    surface::albedo(&mut stage, material.albedo);
    surface::translucency(&mut stage, material.translucency);
    surface::normal(&mut stage, material.normal);
    surface::specular(&mut stage, material.specular);
    surface::view_direction(&mut stage);
    surface::environment(&mut stage, material.environment);

    match light {
        Some(light) => {
            lighting::incident(&mut stage, light.kind());
            lighting::visibility(&mut stage, light, ShadowSource::Map);
            lighting::shade(&mut stage);
            stage.line("out_color = vec4(lit + reflected, alpha);");
        }
        None => {
            stage.line("out_color = vec4(base.rgb + reflected, alpha);");
        }
    }

    compose(
        &surface::mesh_vertex(tangents, Projection::Camera),
        &stage.finish(),
    )
}

/// Samples the resolved scene behind the surface, offset along the normal.
pub(crate) fn refractive(material: &RefractiveMaterial) -> String {
    let tangents = material.normal == NormalKind::Mapped;
    let mut stage = surface_fragment(tangents);
    stage.output("vec4", "out_color");
    stage.texture(TextureShape::Flat, "scene");

    surface::normal(&mut stage, material.normal);
    surface::specular(&mut stage, material.specular);
    stage.line("vec2 offset = n.xy * material.refraction_strength;");
    if material.refraction == RefractionKind::Masked {
        stage.texture(TextureShape::Flat, "refraction_mask");
        stage.line(format!(
            "offset *= {}.r;",
            sample("refraction_mask", TextureShape::Flat, "v_uv")
        ));
    }
    stage
        .line("vec2 screen_uv = gl_FragCoord.xy * frame.inverse_viewport + offset;")
        .line(format!(
            "vec3 behind = {}.rgb;",
            sample("scene", TextureShape::Flat, "screen_uv")
        ))
        .line("out_color = vec4(behind * material.albedo.rgb + specular_color, 1.0);");

    compose(
        &surface::mesh_vertex(tangents, Projection::Camera),
        &stage.finish(),
    )
}

/// Full-screen accumulation of one light over the g-buffer.
pub(crate) fn deferred_light(light: &LightDescriptor) -> String {
    let mut stage = StageWriter::new();
    stage
        .input("vec2", "v_uv")
        .output("vec4", "out_color")
        .block(&FRAME)
        .block(&LIGHT)
        .block(&MATERIAL)
        .texture(TextureShape::Flat, "gbuffer_albedo")
        .texture(TextureShape::Flat, "gbuffer_normal")
        .texture(TextureShape::Flat, "gbuffer_specular");

    lighting::reconstruct_position(&mut stage);
    stage
        .line(format!(
            "vec4 base = {};",
            sample("gbuffer_albedo", TextureShape::Flat, "v_uv")
        ))
        .line(format!(
            "vec3 n = normalize({}.xyz * 2.0 - 1.0);",
            sample("gbuffer_normal", TextureShape::Flat, "v_uv")
        ))
        .line(format!(
            "vec3 specular_color = {}.rgb;",
            sample("gbuffer_specular", TextureShape::Flat, "v_uv")
        ));
    surface::view_direction(&mut stage);
    lighting::incident(&mut stage, light.kind());
    lighting::visibility(&mut stage, light, ShadowSource::Mask);
    lighting::shade(&mut stage);
    stage.line("out_color = vec4(lit, 1.0);");

    compose(FULLSCREEN_VERTEX, &stage.finish())
}

/// Renders caster depth from the light. Basic maps store depth, variance
/// maps store the first two depth moments.
pub(crate) fn caster(material: &DepthMaterial, light: Option<&LightDescriptor>) -> String {
    let mut stage = StageWriter::new();
    surface::mesh_inputs(&mut stage, false);
    stage.block(&MATERIAL).output("vec4", "out_depth");

    if material.depth == DepthKind::Mapped {
        surface::albedo(&mut stage, AlbedoKind::Textured);
        surface::depth(&mut stage, material.depth);
    }
    stage.line("float z = gl_FragCoord.z;");
    match light.map(LightDescriptor::shadow) {
        Some(ShadowKind::Variance) => stage.line("out_depth = vec4(z, z * z, 0.0, 1.0);"),
        Some(ShadowKind::Basic | ShadowKind::None) | None => {
            stage.line("out_depth = vec4(z, 0.0, 0.0, 1.0);")
        }
    };

    compose(
        &surface::mesh_vertex(false, Projection::Light),
        &stage.finish(),
    )
}
