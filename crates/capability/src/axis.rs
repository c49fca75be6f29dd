//! Closed capability axes. Each axis is declared once through
//! `capability_axis!`, which emits the enum, its `ALL` value list, and the
//! code table from the same variant list so the enumerator can never see a
//! value the type does not have (or miss one it does).
use std::fmt::Debug;
use std::hash::Hash;

/// One orthogonal, closed dimension of a material or light description.
pub trait Axis: Copy + Debug + Eq + Ord + Hash + 'static {
    /// Human-readable axis name used in diagnostics.
    const LABEL: &'static str;
    /// Every value of the axis in declaration order.
    const ALL: &'static [Self];

    /// Stable code token used in output names. Never reused across versions.
    fn code(self) -> &'static str;

    fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|value| value.code() == code)
    }
}

macro_rules! capability_axis {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $crate::axis::Axis for $name {
            const LABEL: &'static str = $label;
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }
    };
}

#[cfg(test)]
pub(crate) use capability_axis;

capability_axis! {
    /// Where the base colour comes from.
    AlbedoKind, "albedo" {
        Untextured => "au",
        Textured => "at",
    }
}

capability_axis! {
    NormalKind, "normal" {
        Vertex => "nv",
        /// Tangent-space normal map.
        Mapped => "nm",
    }
}

capability_axis! {
    SpecularKind, "specular" {
        None => "sn",
        Constant => "sc",
        Mapped => "sm",
    }
}

capability_axis! {
    EmissiveKind, "emissive" {
        None => "en",
        Constant => "ec",
        Mapped => "em",
    }
}

capability_axis! {
    EnvironmentKind, "environment" {
        None => "vn",
        /// Cube-map reflection.
        Reflective => "vr",
    }
}

capability_axis! {
    DepthKind, "depth" {
        Constant => "dc",
        /// Alpha-tested against the albedo texture.
        Mapped => "dm",
    }
}

capability_axis! {
    RefractionKind, "refraction" {
        Unmasked => "ru",
        Masked => "rm",
    }
}

capability_axis! {
    TranslucencyKind, "translucency" {
        Constant => "oc",
        /// Opacity read from the albedo texture alpha.
        Mapped => "om",
    }
}

capability_axis! {
    LightKind, "light" {
        Directional => "ld",
        Spherical => "ls",
        Projective => "lp",
    }
}

capability_axis! {
    ShadowKind, "shadow" {
        None => "hn",
        Basic => "hb",
        Variance => "hv",
    }
}

impl LightKind {
    pub fn supports_shadows(self) -> bool {
        matches!(self, LightKind::Projective)
    }
}

/// Code tokens must be non-empty and drawn from `[a-z0-9]`; `_` is reserved
/// as the name delimiter.
pub fn is_code_safe(code: &str) -> bool {
    !code.is_empty()
        && code
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Returns human-readable issues for one axis: unsafe or duplicate codes and
/// codes that fail to round-trip through `from_code`.
pub(crate) fn audit_axis<A: Axis>() -> Vec<String> {
    let mut issues = Vec::new();
    if A::ALL.is_empty() {
        issues.push(format!("axis '{}' declares no values", A::LABEL));
    }
    for (index, value) in A::ALL.iter().enumerate() {
        let code = value.code();
        if !is_code_safe(code) {
            issues.push(format!(
                "axis '{}' value {:?} has unsafe code '{}'",
                A::LABEL,
                value,
                code
            ));
        }
        if A::ALL[..index].iter().any(|other| other.code() == code) {
            issues.push(format!(
                "axis '{}' reuses code '{}' for {:?}",
                A::LABEL,
                code,
                value
            ));
        }
        if A::from_code(code) != Some(*value) {
            issues.push(format!(
                "axis '{}' code '{}' does not resolve back to {:?}",
                A::LABEL,
                code,
                value
            ));
        }
    }
    issues
}
