//! Capability model for generated shader programs.
//!
//! Closed axes (`axis`) combine into typed material and light descriptors
//! (`descriptor`); stages (`stage`) enumerate the valid cases of their
//! pipeline pass through declarative rule tables (`enumerate`) and assign
//! each case a deterministic output name (`naming`).
mod axis;
mod descriptor;
mod enumerate;
mod naming;
mod stage;

pub use axis::{
    is_code_safe, AlbedoKind, Axis, DepthKind, EmissiveKind, EnvironmentKind, LightKind,
    NormalKind, RefractionKind, ShadowKind, SpecularKind, TranslucencyKind,
};
pub use descriptor::{
    Case, DepthMaterial, LightDescriptor, MaterialCategory, MaterialDescriptor, OpaqueMaterial,
    RefractiveMaterial, TranslucentMaterial,
};
pub use enumerate::{enumerate, rejections, Enumerable, Rule};
pub use naming::{
    code_of, Coded, OutputName, AUX_PACKAGE, CODE_DELIMITER, PROGRAM_SUFFIX, ROOT_PACKAGE,
};
pub use stage::{CaseShape, Stage};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{light:?} lights cannot carry {shadow:?} shadows")]
    ShadowNotSupported { light: LightKind, shadow: ShadowKind },

    #[error("invalid output name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("capability model is inconsistent: {0:?}")]
    Model(Vec<String>),
}

/// Startup check over the whole model: axis codes are safe, unique and
/// resolvable, and every stage enumerates at least one case.
pub fn validate_model() -> Result<(), CapabilityError> {
    let mut issues = Vec::new();
    issues.extend(axis::audit_axis::<AlbedoKind>());
    issues.extend(axis::audit_axis::<NormalKind>());
    issues.extend(axis::audit_axis::<SpecularKind>());
    issues.extend(axis::audit_axis::<EmissiveKind>());
    issues.extend(axis::audit_axis::<EnvironmentKind>());
    issues.extend(axis::audit_axis::<DepthKind>());
    issues.extend(axis::audit_axis::<RefractionKind>());
    issues.extend(axis::audit_axis::<TranslucencyKind>());
    issues.extend(axis::audit_axis::<LightKind>());
    issues.extend(axis::audit_axis::<ShadowKind>());
    for stage in Stage::ALL {
        if stage.enumerate().is_empty() {
            issues.push(format!("stage '{stage}' enumerates no cases"));
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(CapabilityError::Model(issues))
    }
}
