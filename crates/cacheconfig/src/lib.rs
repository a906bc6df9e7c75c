//! Typed configuration for the renderer's program cache.
//!
//! The cache is created once per renderer context, so everything here is
//! read at startup: how loudly failures are reported, how much map capacity
//! to reserve, and the soft limits that make an unexpectedly large shader
//! permutation space visible in the logs.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Only supported configuration schema version.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Attach the full offending source text to critical compile/link logs.
    #[serde(default = "default_log_failed_sources")]
    pub log_failed_sources: bool,
    /// Number of entries to reserve up front.
    #[serde(default)]
    pub initial_capacity: usize,
    /// Warn once when the cache grows to this many programs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_warning_threshold: Option<usize>,
    /// Warn when a single miss (compile + link) takes longer than this.
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub slow_compile_warning: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_failed_sources: true,
            initial_capacity: 0,
            entry_warning_threshold: None,
            slow_compile_warning: None,
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_log_failed_sources() -> bool {
    true
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration_opt<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(duration) => {
            serializer.serialize_str(&humantime::format_duration(*duration).to_string())
        }
        None => serializer.serialize_none(),
    }
}

impl CacheConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: CacheConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.entry_warning_threshold == Some(0) {
            return Err(ConfigError::Invalid(
                "entry_warning_threshold must be greater than zero".into(),
            ));
        }

        if let Some(threshold) = self.slow_compile_warning {
            if threshold.is_zero() {
                return Err(ConfigError::Invalid(
                    "slow_compile_warning must be greater than zero".into(),
                ));
            }
        }

        Ok(())
    }
}
