use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shading-language target emitted for every compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Glsl330,
    Glsl410,
    Glsl450,
    GlslEs300,
    Wgsl,
}

impl Dialect {
    pub const ALL: [Dialect; 5] = [
        Self::Glsl330,
        Self::Glsl410,
        Self::Glsl450,
        Self::GlslEs300,
        Self::Wgsl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Glsl330 => "glsl330",
            Self::Glsl410 => "glsl410",
            Self::Glsl450 => "glsl450",
            Self::GlslEs300 => "glsles300",
            Self::Wgsl => "wgsl",
        }
    }

    /// `#version` line of the GLSL dialects.
    pub fn version_directive(self) -> Option<&'static str> {
        match self {
            Self::Glsl330 => Some("#version 330 core"),
            Self::Glsl410 => Some("#version 410 core"),
            Self::Glsl450 => Some("#version 450 core"),
            Self::GlslEs300 => Some("#version 300 es"),
            Self::Wgsl => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|dialect| dialect.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|d| d.as_str()).collect();
                format!("unknown dialect '{raw}'; expected one of {}", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerBackend {
    /// Parse, validate and re-emit through naga.
    #[default]
    Naga,
    /// Rewrite the `#version` directive and nothing else.
    Passthrough,
}

impl fmt::Display for CompilerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerBackend::Naga => f.write_str("naga"),
            CompilerBackend::Passthrough => f.write_str("passthrough"),
        }
    }
}

impl FromStr for CompilerBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "naga" => Ok(Self::Naga),
            "passthrough" | "none" => Ok(Self::Passthrough),
            other => Err(format!(
                "unknown compiler '{other}'; expected 'naga' or 'passthrough'"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub version: u32,
    /// Worker threads; defaults to the available hardware parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    #[serde(default = "default_dialects")]
    pub dialects: Vec<Dialect>,
    #[serde(default = "default_compact")]
    pub compact: bool,
    #[serde(default)]
    pub compiler: CompilerBackend,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            workers: None,
            timeout: default_timeout(),
            dialects: default_dialects(),
            compact: default_compact(),
            compiler: CompilerBackend::default(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_dialects() -> Vec<Dialect> {
    vec![Dialect::Glsl330, Dialect::GlslEs300]
}

fn default_compact() -> bool {
    true
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct TimeoutVisitor;
    impl<'de> de::Visitor<'de> for TimeoutVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("seconds or a duration such as \"90s\"")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            parse_duration(v).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("timeout must not be negative"))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Duration, E> {
            Duration::try_from_secs_f64(v).map_err(|_| E::custom("timeout must not be negative"))
        }
    }

    deserializer.deserialize_any(TimeoutVisitor)
}

/// Parses `"90s"`, `"2m"` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    if let Ok(secs) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{raw}': {err}"))
}

impl BuildConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: BuildConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "timeout must be greater than zero".into(),
            ));
        }

        if self.dialects.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one dialect must be configured".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        for dialect in &self.dialects {
            if !seen.insert(dialect) {
                return Err(ConfigError::Invalid(format!(
                    "dialect '{dialect}' listed more than once"
                )));
            }
        }

        Ok(())
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn dialect_set(&self) -> BTreeSet<Dialect> {
        self.dialects.iter().copied().collect()
    }
}
