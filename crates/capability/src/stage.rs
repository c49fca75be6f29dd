use std::collections::BTreeSet;
use std::fmt;

use crate::axis::{EnvironmentKind, NormalKind, SpecularKind};
use crate::descriptor::{Case, LightDescriptor, MaterialCategory, MaterialDescriptor};
use crate::enumerate::{enumerate, Enumerable, Rule};
use crate::naming::OutputName;

/// A pipeline stage that owns one batch of generated programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    ForwardOpaqueLit,
    ForwardOpaqueUnlit,
    ForwardTranslucentRegular,
    ForwardTranslucentRefractive,
    DeferredGeometry,
    DeferredLight,
    DeferredLightTranslucent,
    Shadow,
}

/// How a stage builds its candidate cases before stage rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseShape {
    /// Bare materials of one category (unlit stages).
    Material(MaterialCategory),
    /// Bare lights.
    Light,
    /// Every light paired with every material of one category.
    Lit(MaterialCategory),
}

fn unlit_ignores_lighting(case: &Case) -> bool {
    case.material().is_some_and(|material| {
        material.normal() != Some(NormalKind::Mapped)
            && material
                .specular()
                .map_or(true, |specular| specular == SpecularKind::None)
    })
}

fn gbuffer_has_no_environment(case: &Case) -> bool {
    case.material()
        .and_then(MaterialDescriptor::environment)
        .map_or(true, |environment| environment == EnvironmentKind::None)
}

fn shadow_needs_caster(case: &Case) -> bool {
    case.light().is_some_and(LightDescriptor::casts_shadow)
}

static UNLIT_RULES: [Rule<Case>; 1] =
    [Rule::new("unlit-ignores-lighting", unlit_ignores_lighting)];
static GEOMETRY_RULES: [Rule<Case>; 1] =
    [Rule::new("gbuffer-has-no-environment", gbuffer_has_no_environment)];
static SHADOW_RULES: [Rule<Case>; 1] = [Rule::new("shadow-needs-caster", shadow_needs_caster)];

impl Stage {
    pub const ALL: [Stage; 8] = [
        Self::ForwardOpaqueLit,
        Self::ForwardOpaqueUnlit,
        Self::ForwardTranslucentRegular,
        Self::ForwardTranslucentRefractive,
        Self::DeferredGeometry,
        Self::DeferredLight,
        Self::DeferredLightTranslucent,
        Self::Shadow,
    ];

    /// Command-line spelling of the stage.
    pub fn code(self) -> &'static str {
        match self {
            Self::ForwardOpaqueLit => "forward-opaque-lit",
            Self::ForwardOpaqueUnlit => "forward-opaque-unlit",
            Self::ForwardTranslucentRegular => "forward-translucent-regular",
            Self::ForwardTranslucentRefractive => "forward-translucent-refractive",
            Self::DeferredGeometry => "deferred-geometry",
            Self::DeferredLight => "deferred-light",
            Self::DeferredLightTranslucent => "deferred-light-translucent",
            Self::Shadow => "shadow",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.code() == code)
    }

    /// Dotted package under the root package holding the stage's programs.
    pub fn package(self) -> &'static str {
        match self {
            Self::ForwardOpaqueLit => "forward.opaque.lit",
            Self::ForwardOpaqueUnlit => "forward.opaque.unlit",
            Self::ForwardTranslucentRegular => "forward.translucent.regular",
            Self::ForwardTranslucentRefractive => "forward.translucent.refractive",
            Self::DeferredGeometry => "deferred.geometry",
            Self::DeferredLight => "deferred.light",
            Self::DeferredLightTranslucent => "deferred.light.translucent",
            Self::Shadow => "shadow",
        }
    }

    pub fn shape(self) -> CaseShape {
        match self {
            Self::ForwardOpaqueLit => CaseShape::Lit(MaterialCategory::OpaqueRegular),
            Self::ForwardOpaqueUnlit | Self::DeferredGeometry => {
                CaseShape::Material(MaterialCategory::OpaqueRegular)
            }
            Self::ForwardTranslucentRegular => {
                CaseShape::Material(MaterialCategory::TranslucentRegular)
            }
            Self::ForwardTranslucentRefractive => {
                CaseShape::Material(MaterialCategory::TranslucentRefractive)
            }
            Self::DeferredLight => CaseShape::Light,
            Self::DeferredLightTranslucent => CaseShape::Lit(MaterialCategory::TranslucentRegular),
            Self::Shadow => CaseShape::Lit(MaterialCategory::DepthOnly),
        }
    }

    /// Stage-specific pruning, applied after the category rules.
    pub fn rules(self) -> &'static [Rule<Case>] {
        match self {
            Self::ForwardOpaqueUnlit | Self::ForwardTranslucentRegular => &UNLIT_RULES,
            Self::DeferredGeometry => &GEOMETRY_RULES,
            Self::Shadow => &SHADOW_RULES,
            Self::ForwardOpaqueLit
            | Self::ForwardTranslucentRefractive
            | Self::DeferredLight
            | Self::DeferredLightTranslucent => &[],
        }
    }

    /// Every valid case of the stage.
    pub fn enumerate(self) -> BTreeSet<Case> {
        let candidates: Vec<Case> = match self.shape() {
            CaseShape::Material(category) => MaterialDescriptor::enumerate(category)
                .into_iter()
                .map(Case::Material)
                .collect(),
            CaseShape::Light => LightDescriptor::enumerate()
                .into_iter()
                .map(Case::Light)
                .collect(),
            CaseShape::Lit(category) => {
                let materials = MaterialDescriptor::enumerate(category);
                LightDescriptor::enumerate()
                    .into_iter()
                    .flat_map(|light| {
                        materials
                            .iter()
                            .map(move |material| Case::Lit(light, *material))
                    })
                    .collect()
            }
        };
        enumerate(candidates, self.rules())
    }

    /// Output name of a primary (per-case) program of this stage.
    pub fn name_of(self, case: &Case) -> OutputName {
        OutputName::of(self.package(), case)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::ShadowKind;

    #[test]
    fn stage_case_counts() {
        let expected = [
            (Stage::ForwardOpaqueLit, 540),
            (Stage::ForwardOpaqueUnlit, 18),
            (Stage::ForwardTranslucentRegular, 6),
            (Stage::ForwardTranslucentRefractive, 4),
            (Stage::DeferredGeometry, 54),
            (Stage::DeferredLight, 5),
            (Stage::DeferredLightTranslucent, 180),
            (Stage::Shadow, 4),
        ];
        for (stage, count) in expected {
            assert_eq!(stage.enumerate().len(), count, "{stage}");
        }
    }

    #[test]
    fn names_are_deterministic_across_runs() {
        for stage in Stage::ALL {
            let first: BTreeSet<OutputName> =
                stage.enumerate().iter().map(|case| stage.name_of(case)).collect();
            let second: BTreeSet<OutputName> =
                stage.enumerate().iter().map(|case| stage.name_of(case)).collect();
            assert_eq!(first, second, "{stage}");
        }
    }

    #[test]
    fn primary_names_never_collide() {
        let mut all = BTreeSet::new();
        let mut total = 0;
        for stage in Stage::ALL {
            let cases = stage.enumerate();
            total += cases.len();
            let names: BTreeSet<OutputName> =
                cases.iter().map(|case| stage.name_of(case)).collect();
            assert_eq!(names.len(), cases.len(), "{stage}");
            all.extend(names);
        }
        assert_eq!(all.len(), total);
    }

    #[test]
    fn shadow_stage_only_uses_casters() {
        for case in Stage::Shadow.enumerate() {
            let light = case.light().expect("shadow cases are lit");
            assert_ne!(light.shadow(), ShadowKind::None);
        }
    }

    #[test]
    fn unlit_stages_have_no_lights() {
        for stage in [
            Stage::ForwardOpaqueUnlit,
            Stage::ForwardTranslucentRegular,
            Stage::ForwardTranslucentRefractive,
            Stage::DeferredGeometry,
        ] {
            assert!(stage.enumerate().iter().all(|case| case.light().is_none()));
        }
    }

    #[test]
    fn stage_codes_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_code(stage.code()), Some(stage));
        }
        assert_eq!(Stage::from_code("forward"), None);
    }
}
