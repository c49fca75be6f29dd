//! Deterministic output names.
//!
//! A case's name is its axis codes, in the category's fixed axis order,
//! joined with `_`, placed under a dotted package and suffixed with
//! [`PROGRAM_SUFFIX`]. Codes never contain `_`, so the joined form can be
//! split back into the exact code sequence and distinct cases can never
//! produce the same name.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CapabilityError;

/// Root package shared by every generated program.
pub const ROOT_PACKAGE: &str = "shaders";
/// Package holding auxiliary (hand-written or shared) programs.
pub const AUX_PACKAGE: &str = "aux";
/// File suffix of every program output name.
pub const PROGRAM_SUFFIX: &str = "prog";
/// Separator between code tokens inside one name segment.
pub const CODE_DELIMITER: &str = "_";

/// Anything that contributes code tokens to an output name.
pub trait Coded {
    /// Appends this value's codes in fixed axis order.
    fn push_codes(&self, codes: &mut Vec<&'static str>);

    fn codes(&self) -> Vec<&'static str> {
        let mut codes = Vec::new();
        self.push_codes(&mut codes);
        codes
    }
}

/// The `_`-joined code of a value, e.g. `lp_hb_at_nm_sc_en_vn_dc`.
pub fn code_of<C: Coded + ?Sized>(value: &C) -> String {
    value.codes().join(CODE_DELIMITER)
}

/// A qualified, dotted program name such as
/// `shaders.forward.opaque.lit.ld_au_nv_sn_en_vn_dc.prog`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutputName(String);

impl OutputName {
    /// Builds `<root>.<package>.<code>.<suffix>`.
    pub fn compose(package: &str, code: &str) -> Self {
        Self(format!(
            "{ROOT_PACKAGE}.{package}.{code}.{PROGRAM_SUFFIX}"
        ))
    }

    /// Name of a coded value under `package`.
    pub fn of<C: Coded + ?Sized>(package: &str, value: &C) -> Self {
        Self::compose(package, &code_of(value))
    }

    /// Name of an auxiliary program; auxiliaries share one package so that
    /// a unit keyed only on its own data gets one name in every stage.
    pub fn auxiliary(code: &str) -> Self {
        Self::compose(AUX_PACKAGE, code)
    }

    /// Parses and validates an existing name (for example from a batch file).
    pub fn parse(raw: &str) -> Result<Self, CapabilityError> {
        let issues = audit_name(raw);
        if issues.is_empty() {
            Ok(Self(raw.to_string()))
        } else {
            Err(CapabilityError::InvalidName {
                name: raw.to_string(),
                reason: issues.join("; "),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without the program suffix, used to derive source file names.
    pub fn stem(&self) -> &str {
        self.0
            .strip_suffix(PROGRAM_SUFFIX)
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or(&self.0)
    }

    pub fn is_auxiliary(&self) -> bool {
        self.0
            .strip_prefix(ROOT_PACKAGE)
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|rest| rest.starts_with(&format!("{AUX_PACKAGE}.")))
    }
}

fn audit_name(raw: &str) -> Vec<String> {
    let mut issues = Vec::new();
    if !raw.starts_with(&format!("{ROOT_PACKAGE}.")) {
        issues.push(format!("must start with '{ROOT_PACKAGE}.'"));
    }
    if !raw.ends_with(&format!(".{PROGRAM_SUFFIX}")) {
        issues.push(format!("must end with '.{PROGRAM_SUFFIX}'"));
    }
    if raw.split('.').any(str::is_empty) {
        issues.push("contains an empty path segment".to_string());
    }
    if let Some(bad) = raw
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.')))
    {
        issues.push(format!("contains unsupported character '{bad}'"));
    }
    issues
}

impl fmt::Display for OutputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OutputName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OutputName {
    type Error = CapabilityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OutputName> for String {
    fn from(value: OutputName) -> Self {
        value.0
    }
}
