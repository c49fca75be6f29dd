//! Template-based GLSL program generator.
//!
//! `GlslGenerator` assembles a `#version 450` vertex/fragment program for
//! every case from per-axis snippets, and supplies the fixed auxiliary
//! programs. Resources follow one layout throughout: std140 uniform blocks
//! in set 0 and texture/sampler pairs in set 1, bound in declaration order.
//! Output is a pure function of the stage and case.
mod auxiliary;
mod lighting;
mod programs;
mod surface;
mod writer;

use std::borrow::Cow;

use batch::{AuxiliaryKey, SourceGenerator};
use capability::{Case, MaterialDescriptor, Stage};

#[derive(Debug, Clone, Copy, Default)]
pub struct GlslGenerator;

impl SourceGenerator for GlslGenerator {
    fn generate(&self, stage: Stage, case: &Case) -> String {
        let (light, material) = match case {
            Case::Light(light) => return programs::deferred_light(light),
            Case::Material(material) => (None, material),
            Case::Lit(light, material) => (Some(light), material),
        };
        match material {
            MaterialDescriptor::Opaque(m) if stage == Stage::DeferredGeometry => {
                programs::geometry(m)
            }
            MaterialDescriptor::Opaque(m) => programs::opaque(m, light),
            MaterialDescriptor::Translucent(m) => programs::translucent(m, light),
            MaterialDescriptor::Refractive(m) => programs::refractive(m),
            MaterialDescriptor::Depth(m) => programs::caster(m, light),
        }
    }

    fn auxiliary(&self, key: AuxiliaryKey) -> Cow<'static, str> {
        auxiliary::source(key)
    }
}
