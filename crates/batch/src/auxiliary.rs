use capability::{Axis, Case, OutputName, ShadowKind, Stage};

/// Identity of an auxiliary program. The key alone determines the output
/// name, so two cases that need the same auxiliary always agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuxiliaryKey {
    /// Writes nothing; used to satisfy pipeline slots.
    Empty,
    /// Clip-space passthrough that writes a flat colour.
    FlatClip,
    /// Full-screen texture copy.
    Copy,
    DepthPrepass,
    AmbientOcclusion,
    AmbientOcclusionBlur,
    VarianceBlur,
    /// Screen-space shadow pre-pass, keyed only on the shadow kind.
    ShadowMask(ShadowKind),
}

impl AuxiliaryKey {
    /// Present in every stage's batch regardless of its cases.
    pub const COMMON: [AuxiliaryKey; 3] = [Self::Empty, Self::FlatClip, Self::Copy];

    pub fn code(&self) -> String {
        match self {
            Self::Empty => "empty".to_string(),
            Self::FlatClip => "flat_clip".to_string(),
            Self::Copy => "copy".to_string(),
            Self::DepthPrepass => "depth_prepass".to_string(),
            Self::AmbientOcclusion => "ambient_occlusion".to_string(),
            Self::AmbientOcclusionBlur => "ambient_occlusion_blur".to_string(),
            Self::VarianceBlur => "variance_blur".to_string(),
            Self::ShadowMask(shadow) => format!("shadow_mask_{}", shadow.code()),
        }
    }

    pub fn output_name(&self) -> OutputName {
        OutputName::auxiliary(&self.code())
    }

    /// Fixed auxiliaries of a stage: the common set plus stage utilities.
    pub fn fixed_for(stage: Stage) -> Vec<AuxiliaryKey> {
        let mut keys = Self::COMMON.to_vec();
        match stage {
            Stage::ForwardOpaqueLit => keys.push(Self::DepthPrepass),
            Stage::DeferredLight => {
                keys.push(Self::AmbientOcclusion);
                keys.push(Self::AmbientOcclusionBlur);
            }
            Stage::Shadow => keys.push(Self::VarianceBlur),
            Stage::ForwardOpaqueUnlit
            | Stage::ForwardTranslucentRegular
            | Stage::ForwardTranslucentRefractive
            | Stage::DeferredGeometry
            | Stage::DeferredLightTranslucent => {}
        }
        keys
    }

    /// Auxiliary a case depends on, derived from a subset of its data.
    /// Opaque shading reads shadows from the screen-space mask; translucent
    /// and shadow-map passes sample the shadow map directly.
    pub fn required_by(stage: Stage, case: &Case) -> Option<AuxiliaryKey> {
        let uses_mask = matches!(stage, Stage::ForwardOpaqueLit | Stage::DeferredLight);
        let light = case.light()?;
        (uses_mask && light.casts_shadow()).then(|| Self::ShadowMask(light.shadow()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::{LightDescriptor, LightKind};

    #[test]
    fn shadow_mask_names_depend_only_on_shadow_kind() {
        let key = AuxiliaryKey::ShadowMask(ShadowKind::Basic);
        assert_eq!(key.output_name().as_str(), "shaders.aux.shadow_mask_hb.prog");
    }

    #[test]
    fn masks_are_required_only_by_shadowed_opaque_lighting() {
        let shadowed =
            Case::Light(LightDescriptor::new(LightKind::Projective, ShadowKind::Variance).unwrap());
        let plain = Case::Light(LightDescriptor::unshadowed(LightKind::Spherical));
        assert_eq!(
            AuxiliaryKey::required_by(Stage::DeferredLight, &shadowed),
            Some(AuxiliaryKey::ShadowMask(ShadowKind::Variance))
        );
        assert_eq!(AuxiliaryKey::required_by(Stage::DeferredLight, &plain), None);
        assert_eq!(
            AuxiliaryKey::required_by(Stage::DeferredLightTranslucent, &shadowed),
            None
        );
    }

    #[test]
    fn every_stage_carries_the_common_auxiliaries() {
        for stage in Stage::ALL {
            let fixed = AuxiliaryKey::fixed_for(stage);
            for common in AuxiliaryKey::COMMON {
                assert!(fixed.contains(&common), "{stage} misses {common:?}");
            }
        }
    }
}
