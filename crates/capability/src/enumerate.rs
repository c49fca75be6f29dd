//! Cartesian enumeration with declarative pruning tables.
//!
//! A category produces the full product of its axis values through
//! [`Enumerable::product`]; [`enumerate`] then keeps only the combinations
//! every [`Rule`] accepts. Rules are plain function pointers over the typed
//! descriptor, so they cannot perform I/O and are trivially listable in
//! diagnostics.
use std::collections::BTreeSet;
use std::fmt;

/// A named pruning predicate. A case survives only if every rule accepts it.
pub struct Rule<T> {
    pub name: &'static str,
    pub accepts: fn(&T) -> bool,
}

impl<T> Rule<T> {
    pub const fn new(name: &'static str, accepts: fn(&T) -> bool) -> Self {
        Self { name, accepts }
    }

    pub fn check(&self, candidate: &T) -> bool {
        (self.accepts)(candidate)
    }
}

impl<T> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// A descriptor whose unpruned value space is the product of closed axes.
pub trait Enumerable: Sized + Ord + 'static {
    /// Every combination of the applicable axis values, before pruning.
    fn product() -> Vec<Self>;

    /// The category's own validity rules.
    fn rules() -> &'static [Rule<Self>] {
        &[]
    }

    /// The surviving combinations of the category.
    fn enumerate() -> BTreeSet<Self> {
        enumerate(Self::product(), Self::rules())
    }
}

/// Keeps the candidates accepted by every rule. The result is a set: callers
/// must not rely on the order the product was generated in.
pub fn enumerate<T: Ord>(
    candidates: impl IntoIterator<Item = T>,
    rules: &[Rule<T>],
) -> BTreeSet<T> {
    candidates
        .into_iter()
        .filter(|candidate| rules.iter().all(|rule| rule.check(candidate)))
        .collect()
}

/// Names of the rules that reject `candidate`; empty when it is valid.
pub fn rejections<T>(candidate: &T, rules: &[Rule<T>]) -> Vec<&'static str> {
    rules
        .iter()
        .filter(|rule| !rule.check(candidate))
        .map(|rule| rule.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{capability_axis, AlbedoKind, Axis, SpecularKind};
    use crate::naming::{code_of, Coded};

    capability_axis! {
        Refractive, "refractive" {
            No => "rn",
            Yes => "ry",
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct Plain {
        albedo: AlbedoKind,
        specular: SpecularKind,
    }

    impl Enumerable for Plain {
        fn product() -> Vec<Self> {
            let mut out = Vec::new();
            for &albedo in AlbedoKind::ALL {
                for &specular in SpecularKind::ALL {
                    out.push(Self { albedo, specular });
                }
            }
            out
        }
    }

    impl Coded for Plain {
        fn push_codes(&self, codes: &mut Vec<&'static str>) {
            codes.push(self.albedo.code());
            codes.push(self.specular.code());
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct Glass {
        refractive: Refractive,
        specular: SpecularKind,
    }

    fn refraction_owns_specular(glass: &Glass) -> bool {
        glass.refractive == Refractive::No || glass.specular == SpecularKind::None
    }

    static REFRACTION_RULES: [Rule<Glass>; 1] =
        [Rule::new("refraction-owns-specular", refraction_owns_specular)];

    impl Enumerable for Glass {
        fn product() -> Vec<Self> {
            let mut out = Vec::new();
            for &refractive in Refractive::ALL {
                for &specular in SpecularKind::ALL {
                    out.push(Self {
                        refractive,
                        specular,
                    });
                }
            }
            out
        }

        fn rules() -> &'static [Rule<Self>] {
            &REFRACTION_RULES
        }
    }

    #[test]
    fn unpruned_product_yields_every_combination() {
        let cases = Plain::enumerate();
        assert_eq!(cases.len(), 6);
        let names: BTreeSet<String> = cases.iter().map(code_of).collect();
        assert_eq!(names.len(), 6);
        assert!(names.contains("at_sm"));
    }

    #[test]
    fn categories_without_rules_keep_every_candidate() {
        assert!(Plain::rules().is_empty());
        let everything: BTreeSet<Plain> = Plain::product().into_iter().collect();
        assert_eq!(Plain::enumerate(), everything);
    }

    #[test]
    fn refraction_rule_forces_specular_none() {
        let cases = Glass::enumerate();
        assert_eq!(cases.len(), 4);
        let refractive: Vec<_> = cases
            .iter()
            .filter(|case| case.refractive == Refractive::Yes)
            .collect();
        assert_eq!(refractive.len(), 1);
        assert_eq!(refractive[0].specular, SpecularKind::None);
    }

    #[test]
    fn reports_rejecting_rules() {
        let bad = Glass {
            refractive: Refractive::Yes,
            specular: SpecularKind::Mapped,
        };
        assert_eq!(
            rejections(&bad, Glass::rules()),
            vec!["refraction-owns-specular"]
        );
    }

    #[test]
    fn enumeration_is_repeatable() {
        assert_eq!(Glass::enumerate(), Glass::enumerate());
        let reversed = enumerate(Glass::product().into_iter().rev(), Glass::rules());
        assert_eq!(reversed, Glass::enumerate());
    }
}
