//! Configuration layer: typed settings with layered precedence (file → env).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::{AssetSpec, LogicalKey, MediaKind};

const LOCAL_CONFIG_BASENAME: &str = "staffetta";
const ENV_PREFIX: &str = "STAFFETTA";
const DEFAULT_MEDIA_ROOT: &str = "media";
const DEFAULT_TRANSMIT_TIMEOUT_SECS: u64 = 60;

/// Fully validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub delivery: DeliverySettings,
    pub admin: AdminSettings,
    /// The asset catalog: every logical asset the service knows about.
    pub assets: Vec<AssetSpec>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DeliverySettings {
    /// Directory relative asset paths resolve against.
    pub media_root: PathBuf,
    /// Upper bound on a single transmission or reference delivery.
    pub transmit_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AdminSettings {
    /// Caller identities allowed to run privileged operations.
    pub privileged_ids: Vec<u64>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    logging: RawLogging,
    #[serde(default)]
    delivery: RawDelivery,
    #[serde(default)]
    admin: RawAdmin,
    #[serde(default)]
    assets: Vec<RawAsset>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDelivery {
    media_root: Option<PathBuf>,
    transmit_timeout_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAdmin {
    privileged_ids: Option<Vec<u64>>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    key: String,
    path: PathBuf,
    kind: MediaKind,
    #[serde(default)]
    caption: String,
}

impl RawSettings {
    fn into_settings(self) -> Result<Settings, LoadError> {
        let level = match self.logging.level {
            Some(raw) => LevelFilter::from_str(&raw).map_err(|_| {
                LoadError::invalid(
                    "logging.level",
                    format!("`{raw}` is not one of trace|debug|info|warn|error|off"),
                )
            })?,
            None => LevelFilter::INFO,
        };

        let format = match self.logging.format.as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") | None => LogFormat::Compact,
            Some(other) => {
                return Err(LoadError::invalid(
                    "logging.format",
                    format!("`{other}` is not one of json|compact"),
                ));
            }
        };

        let timeout_secs = self
            .delivery
            .transmit_timeout_seconds
            .unwrap_or(DEFAULT_TRANSMIT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(LoadError::invalid(
                "delivery.transmit_timeout_seconds",
                "must be greater than zero",
            ));
        }

        let mut seen_keys = HashSet::new();
        let mut assets = Vec::with_capacity(self.assets.len());
        for raw in self.assets {
            if raw.key.is_empty() {
                return Err(LoadError::invalid("assets.key", "must not be empty"));
            }
            if !seen_keys.insert(raw.key.clone()) {
                return Err(LoadError::invalid(
                    "assets.key",
                    format!("duplicate logical key `{}`", raw.key),
                ));
            }
            assets.push(AssetSpec {
                key: LogicalKey::new(raw.key),
                source_path: raw.path,
                kind: raw.kind,
                caption: raw.caption,
            });
        }

        Ok(Settings {
            logging: LoggingSettings { level, format },
            delivery: DeliverySettings {
                media_root: self
                    .delivery
                    .media_root
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT)),
                transmit_timeout: Duration::from_secs(timeout_secs),
            },
            admin: AdminSettings {
                privileged_ids: self.admin.privileged_ids.unwrap_or_default(),
            },
            assets,
        })
    }
}

impl Settings {
    /// Load settings with layered precedence: local `staffetta.toml` if
    /// present, then an explicit file if given, then `STAFFETTA_`-prefixed
    /// environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self, LoadError> {
        let mut builder =
            Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }
        let raw: RawSettings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        raw.into_settings()
    }
}

impl Default for Settings {
    fn default() -> Self {
        RawSettings::default()
            .into_settings()
            .expect("default settings are valid")
    }
}
