//! Typed material and light descriptors and the `Case` union built from them.
//!
//! Types:
//!
//! - `OpaqueMaterial`, `TranslucentMaterial`, `RefractiveMaterial` and
//!   `DepthMaterial` carry exactly one value per axis applicable to their
//!   category; inapplicable axes are simply not fields.
//! - `MaterialDescriptor` tags a material with its category.
//! - `LightDescriptor` pairs a light kind with a shadow kind and refuses
//!   shadows on kinds that cannot cast them.
//! - `Case` is the unit of generation: a bare material, a bare light, or a
//!   lit `(light, material)` pair.
//!
//! Every category lists its pruning rules as a static table so the rules can
//! be audited and tested without running the generators.
use crate::axis::{
    AlbedoKind, Axis, DepthKind, EmissiveKind, EnvironmentKind, LightKind, NormalKind,
    RefractionKind, ShadowKind, SpecularKind, TranslucencyKind,
};
use crate::enumerate::{Enumerable, Rule};
use crate::naming::Coded;
use crate::CapabilityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpaqueMaterial {
    pub albedo: AlbedoKind,
    pub normal: NormalKind,
    pub specular: SpecularKind,
    pub emissive: EmissiveKind,
    pub environment: EnvironmentKind,
    pub depth: DepthKind,
}

fn alpha_depth_needs_texture(material: &OpaqueMaterial) -> bool {
    material.depth != DepthKind::Mapped || material.albedo == AlbedoKind::Textured
}

static OPAQUE_RULES: [Rule<OpaqueMaterial>; 1] =
    [Rule::new("alpha-depth-needs-texture", alpha_depth_needs_texture)];

impl Enumerable for OpaqueMaterial {
    fn product() -> Vec<Self> {
        let mut out = Vec::new();
        for &albedo in AlbedoKind::ALL {
            for &normal in NormalKind::ALL {
                for &specular in SpecularKind::ALL {
                    for &emissive in EmissiveKind::ALL {
                        for &environment in EnvironmentKind::ALL {
                            for &depth in DepthKind::ALL {
                                out.push(Self {
                                    albedo,
                                    normal,
                                    specular,
                                    emissive,
                                    environment,
                                    depth,
                                });
                            }
                        }
                    }
                }
            }
        }
        out
    }

    fn rules() -> &'static [Rule<Self>] {
        &OPAQUE_RULES
    }
}

impl Coded for OpaqueMaterial {
    fn push_codes(&self, codes: &mut Vec<&'static str>) {
        codes.extend([
            self.albedo.code(),
            self.normal.code(),
            self.specular.code(),
            self.emissive.code(),
            self.environment.code(),
            self.depth.code(),
        ]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TranslucentMaterial {
    pub albedo: AlbedoKind,
    pub normal: NormalKind,
    pub specular: SpecularKind,
    pub environment: EnvironmentKind,
    pub translucency: TranslucencyKind,
}

fn mapped_opacity_needs_texture(material: &TranslucentMaterial) -> bool {
    material.translucency != TranslucencyKind::Mapped || material.albedo == AlbedoKind::Textured
}

static TRANSLUCENT_RULES: [Rule<TranslucentMaterial>; 1] = [Rule::new(
    "mapped-opacity-needs-texture",
    mapped_opacity_needs_texture,
)];

impl Enumerable for TranslucentMaterial {
    fn product() -> Vec<Self> {
        let mut out = Vec::new();
        for &albedo in AlbedoKind::ALL {
            for &normal in NormalKind::ALL {
                for &specular in SpecularKind::ALL {
                    for &environment in EnvironmentKind::ALL {
                        for &translucency in TranslucencyKind::ALL {
                            out.push(Self {
                                albedo,
                                normal,
                                specular,
                                environment,
                                translucency,
                            });
                        }
                    }
                }
            }
        }
        out
    }

    fn rules() -> &'static [Rule<Self>] {
        &TRANSLUCENT_RULES
    }
}

impl Coded for TranslucentMaterial {
    fn push_codes(&self, codes: &mut Vec<&'static str>) {
        codes.extend([
            self.albedo.code(),
            self.normal.code(),
            self.specular.code(),
            self.environment.code(),
            self.translucency.code(),
        ]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefractiveMaterial {
    pub normal: NormalKind,
    pub refraction: RefractionKind,
    pub specular: SpecularKind,
}

// Refraction shading supplies its own specular term.
fn refraction_owns_specular(material: &RefractiveMaterial) -> bool {
    material.specular == SpecularKind::None
}

static REFRACTIVE_RULES: [Rule<RefractiveMaterial>; 1] =
    [Rule::new("refraction-owns-specular", refraction_owns_specular)];

impl Enumerable for RefractiveMaterial {
    fn product() -> Vec<Self> {
        let mut out = Vec::new();
        for &normal in NormalKind::ALL {
            for &refraction in RefractionKind::ALL {
                for &specular in SpecularKind::ALL {
                    out.push(Self {
                        normal,
                        refraction,
                        specular,
                    });
                }
            }
        }
        out
    }

    fn rules() -> &'static [Rule<Self>] {
        &REFRACTIVE_RULES
    }
}

impl Coded for RefractiveMaterial {
    fn push_codes(&self, codes: &mut Vec<&'static str>) {
        codes.extend([
            self.normal.code(),
            self.refraction.code(),
            self.specular.code(),
        ]);
    }
}

/// The part of a material a shadow caster needs: how its depth is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepthMaterial {
    pub depth: DepthKind,
}

impl Enumerable for DepthMaterial {
    fn product() -> Vec<Self> {
        DepthKind::ALL.iter().map(|&depth| Self { depth }).collect()
    }
}

impl Coded for DepthMaterial {
    fn push_codes(&self, codes: &mut Vec<&'static str>) {
        codes.push(self.depth.code());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MaterialDescriptor {
    Opaque(OpaqueMaterial),
    Translucent(TranslucentMaterial),
    Refractive(RefractiveMaterial),
    Depth(DepthMaterial),
}

impl MaterialDescriptor {
    pub fn category(&self) -> MaterialCategory {
        match self {
            Self::Opaque(_) => MaterialCategory::OpaqueRegular,
            Self::Translucent(_) => MaterialCategory::TranslucentRegular,
            Self::Refractive(_) => MaterialCategory::TranslucentRefractive,
            Self::Depth(_) => MaterialCategory::DepthOnly,
        }
    }

    pub fn albedo(&self) -> Option<AlbedoKind> {
        match self {
            Self::Opaque(m) => Some(m.albedo),
            Self::Translucent(m) => Some(m.albedo),
            Self::Refractive(_) | Self::Depth(_) => None,
        }
    }

    pub fn normal(&self) -> Option<NormalKind> {
        match self {
            Self::Opaque(m) => Some(m.normal),
            Self::Translucent(m) => Some(m.normal),
            Self::Refractive(m) => Some(m.normal),
            Self::Depth(_) => None,
        }
    }

    pub fn specular(&self) -> Option<SpecularKind> {
        match self {
            Self::Opaque(m) => Some(m.specular),
            Self::Translucent(m) => Some(m.specular),
            Self::Refractive(m) => Some(m.specular),
            Self::Depth(_) => None,
        }
    }

    pub fn environment(&self) -> Option<EnvironmentKind> {
        match self {
            Self::Opaque(m) => Some(m.environment),
            Self::Translucent(m) => Some(m.environment),
            Self::Refractive(_) | Self::Depth(_) => None,
        }
    }

    /// All materials of one category, pruned by that category's rules.
    pub fn enumerate(category: MaterialCategory) -> Vec<Self> {
        match category {
            MaterialCategory::OpaqueRegular => OpaqueMaterial::enumerate()
                .into_iter()
                .map(Self::Opaque)
                .collect(),
            MaterialCategory::TranslucentRegular => TranslucentMaterial::enumerate()
                .into_iter()
                .map(Self::Translucent)
                .collect(),
            MaterialCategory::TranslucentRefractive => RefractiveMaterial::enumerate()
                .into_iter()
                .map(Self::Refractive)
                .collect(),
            MaterialCategory::DepthOnly => DepthMaterial::enumerate()
                .into_iter()
                .map(Self::Depth)
                .collect(),
        }
    }
}

impl Coded for MaterialDescriptor {
    fn push_codes(&self, codes: &mut Vec<&'static str>) {
        match self {
            Self::Opaque(m) => m.push_codes(codes),
            Self::Translucent(m) => m.push_codes(codes),
            Self::Refractive(m) => m.push_codes(codes),
            Self::Depth(m) => m.push_codes(codes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MaterialCategory {
    OpaqueRegular,
    TranslucentRegular,
    TranslucentRefractive,
    DepthOnly,
}

impl MaterialCategory {
    pub const ALL: [MaterialCategory; 4] = [
        Self::OpaqueRegular,
        Self::TranslucentRegular,
        Self::TranslucentRefractive,
        Self::DepthOnly,
    ];

    /// Names of the pruning rules applied to the category, for diagnostics.
    pub fn rule_names(self) -> Vec<&'static str> {
        fn names<T>(rules: &[Rule<T>]) -> Vec<&'static str> {
            rules.iter().map(|rule| rule.name).collect()
        }
        match self {
            Self::OpaqueRegular => names(OpaqueMaterial::rules()),
            Self::TranslucentRegular => names(TranslucentMaterial::rules()),
            Self::TranslucentRefractive => names(RefractiveMaterial::rules()),
            Self::DepthOnly => names(DepthMaterial::rules()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LightDescriptor {
    kind: LightKind,
    shadow: ShadowKind,
}

fn shadow_needs_capable_light(light: &LightDescriptor) -> bool {
    light.shadow == ShadowKind::None || light.kind.supports_shadows()
}

static LIGHT_RULES: [Rule<LightDescriptor>; 1] =
    [Rule::new("shadow-needs-capable-light", shadow_needs_capable_light)];

impl LightDescriptor {
    pub fn new(kind: LightKind, shadow: ShadowKind) -> Result<Self, CapabilityError> {
        let light = Self { kind, shadow };
        if shadow_needs_capable_light(&light) {
            Ok(light)
        } else {
            Err(CapabilityError::ShadowNotSupported { light: kind, shadow })
        }
    }

    pub fn unshadowed(kind: LightKind) -> Self {
        Self {
            kind,
            shadow: ShadowKind::None,
        }
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn shadow(&self) -> ShadowKind {
        self.shadow
    }

    pub fn casts_shadow(&self) -> bool {
        self.shadow != ShadowKind::None
    }
}

impl Enumerable for LightDescriptor {
    fn product() -> Vec<Self> {
        let mut out = Vec::new();
        for &kind in LightKind::ALL {
            for &shadow in ShadowKind::ALL {
                out.push(Self { kind, shadow });
            }
        }
        out
    }

    fn rules() -> &'static [Rule<Self>] {
        &LIGHT_RULES
    }
}

impl Coded for LightDescriptor {
    fn push_codes(&self, codes: &mut Vec<&'static str>) {
        codes.push(self.kind.code());
        if self.kind.supports_shadows() {
            codes.push(self.shadow.code());
        }
    }
}

/// One concrete, valid combination selected for generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Case {
    Material(MaterialDescriptor),
    Light(LightDescriptor),
    Lit(LightDescriptor, MaterialDescriptor),
}

impl Case {
    pub fn light(&self) -> Option<&LightDescriptor> {
        match self {
            Self::Light(light) | Self::Lit(light, _) => Some(light),
            Self::Material(_) => None,
        }
    }

    pub fn material(&self) -> Option<&MaterialDescriptor> {
        match self {
            Self::Material(material) | Self::Lit(_, material) => Some(material),
            Self::Light(_) => None,
        }
    }
}

impl Coded for Case {
    fn push_codes(&self, codes: &mut Vec<&'static str>) {
        if let Some(light) = self.light() {
            light.push_codes(codes);
        }
        if let Some(material) = self.material() {
            material.push_codes(codes);
        }
    }
}
