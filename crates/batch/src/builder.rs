use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use capability::{Case, OutputName, Stage};
use tracing::{debug, info};

use crate::auxiliary::AuxiliaryKey;
use crate::BatchError;

/// File extension of generated source files.
pub const SOURCE_EXTENSION: &str = "glsl";

/// Where the source text of a batch entry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    /// Produced by the source generator from a case.
    Case(Case),
    /// A fixed literal owned by the generator.
    Auxiliary(AuxiliaryKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Source file name the compiler reads, relative to the source directory.
    pub identifier: String,
    pub output: OutputName,
    pub source: EntrySource,
}

impl BatchEntry {
    fn new(output: OutputName, source: EntrySource) -> Self {
        let identifier = format!("{}.{SOURCE_EXTENSION}", output.stem());
        Self {
            identifier,
            output,
            source,
        }
    }

    pub fn is_auxiliary(&self) -> bool {
        matches!(self.source, EntrySource::Auxiliary(_))
    }
}

/// The ordered, duplicate-free work list of one stage: primaries sorted by
/// output name, followed by auxiliaries sorted by output name.
#[derive(Debug, Clone)]
pub struct Batch {
    stage: Stage,
    entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn primaries(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter().filter(|entry| !entry.is_auxiliary())
    }

    pub fn auxiliaries(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter().filter(|entry| entry.is_auxiliary())
    }

    pub fn find(&self, output: &OutputName) -> Option<&BatchEntry> {
        self.entries.iter().find(|entry| &entry.output == output)
    }
}

/// Builds the batch of `stage` from its cases plus the given fixed
/// auxiliaries.
///
/// Auxiliaries required by cases are collected by their own key, so a
/// pre-pass shared by many lights is listed once no matter which case asked
/// for it first. Two primaries with the same output name, or a primary that
/// shadows an auxiliary name, are a naming bug and fail the build.
pub fn build_batch(
    stage: Stage,
    cases: impl IntoIterator<Item = Case>,
    fixed: &[AuxiliaryKey],
) -> Result<Batch, BatchError> {
    let mut primaries: BTreeMap<OutputName, Case> = BTreeMap::new();
    let mut auxiliaries: BTreeMap<OutputName, AuxiliaryKey> = BTreeMap::new();
    let mut shared = 0usize;

    for key in fixed {
        if let Entry::Vacant(slot) = auxiliaries.entry(key.output_name()) {
            slot.insert(*key);
        }
    }

    for case in cases {
        let output = stage.name_of(&case);
        match primaries.entry(output) {
            Entry::Occupied(existing) => {
                return Err(BatchError::DuplicateOutput {
                    output: existing.key().clone(),
                    first: format!("{:?}", existing.get()),
                    second: format!("{case:?}"),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(case);
            }
        }
        if let Some(key) = AuxiliaryKey::required_by(stage, &case) {
            match auxiliaries.entry(key.output_name()) {
                Entry::Occupied(_) => shared += 1,
                Entry::Vacant(slot) => {
                    slot.insert(key);
                }
            }
        }
    }

    if let Some((output, case)) = primaries
        .iter()
        .find(|(output, _)| auxiliaries.contains_key(*output))
    {
        return Err(BatchError::DuplicateOutput {
            output: output.clone(),
            first: format!("{case:?}"),
            second: format!("{:?}", auxiliaries[output]),
        });
    }

    debug!(
        stage = %stage,
        primaries = primaries.len(),
        auxiliaries = auxiliaries.len(),
        shared,
        "assembled batch"
    );

    let entries = primaries
        .into_iter()
        .map(|(output, case)| BatchEntry::new(output, EntrySource::Case(case)))
        .chain(
            auxiliaries
                .into_iter()
                .map(|(output, key)| BatchEntry::new(output, EntrySource::Auxiliary(key))),
        )
        .collect();

    Ok(Batch { stage, entries })
}

/// The complete batch of a stage: every enumerated case plus the stage's
/// fixed auxiliaries.
pub fn stage_batch(stage: Stage) -> Result<Batch, BatchError> {
    let batch = build_batch(stage, stage.enumerate(), &AuxiliaryKey::fixed_for(stage))?;
    info!(stage = %stage, entries = batch.len(), "built stage batch");
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::{LightDescriptor, LightKind, MaterialCategory, MaterialDescriptor, ShadowKind};

    fn projective(shadow: ShadowKind) -> LightDescriptor {
        LightDescriptor::new(LightKind::Projective, shadow).unwrap()
    }

    #[test]
    fn shared_prepass_is_listed_once() {
        let materials = MaterialDescriptor::enumerate(MaterialCategory::OpaqueRegular);
        let light = projective(ShadowKind::Basic);
        let cases = vec![Case::Lit(light, materials[0]), Case::Lit(light, materials[1])];

        let batch = build_batch(Stage::ForwardOpaqueLit, cases, &[]).unwrap();

        let masks: Vec<_> = batch
            .entries()
            .iter()
            .filter(|entry| entry.output.as_str() == "shaders.aux.shadow_mask_hb.prog")
            .collect();
        assert_eq!(masks.len(), 1);
        assert_eq!(batch.primaries().count(), 2);
    }

    #[test]
    fn duplicate_primary_fails_fast() {
        let case = Case::Light(projective(ShadowKind::Variance));
        let err = build_batch(Stage::DeferredLight, [case, case], &[]).unwrap_err();
        match err {
            BatchError::DuplicateOutput { output, .. } => {
                assert_eq!(output.as_str(), "shaders.deferred.light.lp_hv.prog");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fixed_auxiliaries_follow_primaries_in_name_order() {
        let batch = stage_batch(Stage::DeferredLight).unwrap();
        let names: Vec<&str> = batch.entries().iter().map(|e| e.output.as_str()).collect();
        assert_eq!(batch.primaries().count(), 5);
        assert!(names[..5].windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(
            &names[5..],
            &[
                "shaders.aux.ambient_occlusion.prog",
                "shaders.aux.ambient_occlusion_blur.prog",
                "shaders.aux.copy.prog",
                "shaders.aux.empty.prog",
                "shaders.aux.flat_clip.prog",
                "shaders.aux.shadow_mask_hb.prog",
                "shaders.aux.shadow_mask_hv.prog",
            ]
        );
    }

    #[test]
    fn repeated_fixed_auxiliaries_collapse() {
        let fixed = [AuxiliaryKey::Copy, AuxiliaryKey::Copy, AuxiliaryKey::Empty];
        let batch = build_batch(Stage::ForwardOpaqueUnlit, [], &fixed).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn identifiers_follow_output_names() {
        let batch = stage_batch(Stage::Shadow).unwrap();
        for entry in batch.entries() {
            assert_eq!(
                entry.identifier,
                format!("{}.{SOURCE_EXTENSION}", entry.output.stem())
            );
        }
    }

    #[test]
    fn every_stage_builds() {
        for stage in Stage::ALL {
            let batch = stage_batch(stage).unwrap();
            assert_eq!(batch.primaries().count(), stage.enumerate().len(), "{stage}");
        }
    }
}
