/// Set holding uniform blocks.
pub(crate) const UNIFORM_SET: u32 = 0;
/// Set holding texture/sampler pairs.
pub(crate) const TEXTURE_SET: u32 = 1;

/// A std140 uniform block. Bindings are assigned in declaration order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UniformBlock {
    pub name: &'static str,
    pub instance: &'static str,
    pub fields: &'static [&'static str],
}

pub(crate) const FRAME: UniformBlock = UniformBlock {
    name: "FrameParams",
    instance: "frame",
    fields: &[
        "mat4 view_projection",
        "mat4 inverse_view_projection",
        "vec4 camera_position",
        "vec2 inverse_viewport",
        "vec2 _padding0",
    ],
};

pub(crate) const OBJECT: UniformBlock = UniformBlock {
    name: "ObjectParams",
    instance: "object",
    fields: &["mat4 model"],
};

// specular.a carries the Blinn exponent.
pub(crate) const MATERIAL: UniformBlock = UniformBlock {
    name: "MaterialParams",
    instance: "material",
    fields: &[
        "vec4 albedo",
        "vec4 specular",
        "vec4 emissive",
        "float opacity",
        "float alpha_cutoff",
        "float refraction_strength",
        "float _padding0",
    ],
};

// falloff: x quadratic attenuation, y inner cone cosine, z outer cone
// cosine, w shadow depth bias.
pub(crate) const LIGHT: UniformBlock = UniformBlock {
    name: "LightParams",
    instance: "light",
    fields: &[
        "mat4 view_projection",
        "vec4 position",
        "vec4 direction",
        "vec4 color",
        "vec4 falloff",
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextureShape {
    Flat,
    Cube,
}

impl TextureShape {
    fn texture_type(self) -> &'static str {
        match self {
            Self::Flat => "texture2D",
            Self::Cube => "textureCube",
        }
    }

    fn sampler_constructor(self) -> &'static str {
        match self {
            Self::Flat => "sampler2D",
            Self::Cube => "samplerCube",
        }
    }
}

/// `texture(...)` call on a declared texture/sampler pair.
pub(crate) fn sample(name: &str, shape: TextureShape, coords: &str) -> String {
    format!(
        "texture({}({name}_texture, {name}_sampler), {coords})",
        shape.sampler_constructor()
    )
}

/// Accumulates one GLSL 450 stage: interface declarations, helper
/// functions and the body of `main`.
#[derive(Debug, Default)]
pub(crate) struct StageWriter {
    declarations: String,
    helpers: String,
    body: String,
    inputs: u32,
    outputs: u32,
    uniform_binding: u32,
    texture_binding: u32,
}

impl StageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&mut self, ty: &str, name: &str) -> &mut Self {
        self.declarations.push_str(&format!(
            "layout(location = {}) in {ty} {name};\n",
            self.inputs
        ));
        self.inputs += 1;
        self
    }

    pub fn output(&mut self, ty: &str, name: &str) -> &mut Self {
        self.declarations.push_str(&format!(
            "layout(location = {}) out {ty} {name};\n",
            self.outputs
        ));
        self.outputs += 1;
        self
    }

    pub fn block(&mut self, block: &UniformBlock) -> &mut Self {
        self.declarations.push_str(&format!(
            "layout(std140, set = {UNIFORM_SET}, binding = {}) uniform {} {{\n",
            self.uniform_binding, block.name
        ));
        for field in block.fields {
            self.declarations.push_str(&format!("    {field};\n"));
        }
        self.declarations
            .push_str(&format!("}} {};\n", block.instance));
        self.uniform_binding += 1;
        self
    }

    /// Declares `<name>_texture` and `<name>_sampler` on consecutive
    /// bindings.
    pub fn texture(&mut self, shape: TextureShape, name: &str) -> &mut Self {
        let binding = self.texture_binding;
        self.declarations.push_str(&format!(
            "layout(set = {TEXTURE_SET}, binding = {binding}) uniform {} {name}_texture;\n\
             layout(set = {TEXTURE_SET}, binding = {}) uniform sampler {name}_sampler;\n",
            shape.texture_type(),
            binding + 1
        ));
        self.texture_binding += 2;
        self
    }

    pub fn helper(&mut self, text: &str) -> &mut Self {
        self.helpers.push('\n');
        self.helpers.push_str(text);
        if !text.ends_with('\n') {
            self.helpers.push('\n');
        }
        self
    }

    pub fn line(&mut self, statement: impl AsRef<str>) -> &mut Self {
        self.body.push_str("    ");
        self.body.push_str(statement.as_ref());
        self.body.push('\n');
        self
    }

    pub fn finish(&self) -> String {
        format!(
            "#version 450\n{}{}\nvoid main() {{\n{}}}\n",
            self.declarations, self.helpers, self.body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_locations_and_bindings_in_order() {
        let mut stage = StageWriter::new();
        stage
            .input("vec3", "a_position")
            .input("vec2", "a_uv")
            .output("vec4", "out_color")
            .block(&OBJECT)
            .block(&FRAME)
            .texture(TextureShape::Flat, "albedo")
            .texture(TextureShape::Cube, "environment")
            .line("out_color = vec4(1.0);");
        let text = stage.finish();

        assert!(text.starts_with("#version 450\n"));
        assert!(text.contains("layout(location = 1) in vec2 a_uv;"));
        assert!(text.contains("layout(location = 0) out vec4 out_color;"));
        assert!(text.contains("layout(std140, set = 0, binding = 1) uniform FrameParams {"));
        assert!(text.contains("layout(set = 1, binding = 2) uniform textureCube environment_texture;"));
        assert!(text.contains("layout(set = 1, binding = 3) uniform sampler environment_sampler;"));
        assert!(text.ends_with("void main() {\n    out_color = vec4(1.0);\n}\n"));
    }

    #[test]
    fn sample_builds_combined_sampler() {
        assert_eq!(
            sample("albedo", TextureShape::Flat, "v_uv"),
            "texture(sampler2D(albedo_texture, albedo_sampler), v_uv)"
        );
    }
}
