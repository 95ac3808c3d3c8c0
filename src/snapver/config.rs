use crate::error::{Result, SnapverError};
use crate::store::native::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_BACKUP_EXT: &str = ".bak";

/// Which attribute store backs tags and audit trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeBackend {
    /// Native extended attributes where the platform has them, else sidecars.
    #[default]
    Auto,
    Native,
    Sidecar,
}

impl fmt::Display for AttributeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeBackend::Auto => "auto",
            AttributeBackend::Native => "native",
            AttributeBackend::Sidecar => "sidecar",
        };
        f.write_str(name)
    }
}

impl FromStr for AttributeBackend {
    type Err = SnapverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(AttributeBackend::Auto),
            "native" | "xattr" => Ok(AttributeBackend::Native),
            "sidecar" => Ok(AttributeBackend::Sidecar),
            other => Err(SnapverError::Config(format!(
                "Unknown attribute backend '{}' (expected auto, native or sidecar)",
                other
            ))),
        }
    }
}

/// Configuration for snapver, stored in `<config dir>/config.json`.
///
/// Constructed once at startup and handed to the API. It is only written back
/// at explicit save points (`config <key> <value>`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapverConfig {
    /// Directory holding the `.bak` copies
    #[serde(default)]
    pub backup_directory: Option<PathBuf>,

    /// Directory holding the working documents the backups belong to
    #[serde(default)]
    pub production_directory: Option<PathBuf>,

    /// Extension backup files end with (before any numeric version suffix)
    #[serde(default = "default_backup_ext")]
    pub backup_extension: String,

    #[serde(default)]
    pub attribute_backend: AttributeBackend,

    /// Prefix for native attribute names
    #[serde(default = "default_namespace")]
    pub attribute_namespace: String,
}

fn default_backup_ext() -> String {
    DEFAULT_BACKUP_EXT.to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for SnapverConfig {
    fn default() -> Self {
        Self {
            backup_directory: None,
            production_directory: None,
            backup_extension: default_backup_ext(),
            attribute_backend: AttributeBackend::default(),
            attribute_namespace: default_namespace(),
        }
    }
}

/// Keys accepted by `config <key> [value]`.
pub const CONFIG_KEYS: &[&str] = &[
    "backup-dir",
    "production-dir",
    "backup-ext",
    "attribute-backend",
    "attribute-namespace",
];

impl SnapverConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: SnapverConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    /// Set the backup extension (normalizes to start with a dot)
    pub fn set_backup_extension(&mut self, ext: &str) {
        if ext.starts_with('.') {
            self.backup_extension = ext.to_string();
        } else {
            self.backup_extension = format!(".{}", ext);
        }
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "backup-dir" => display_dir(&self.backup_directory),
            "production-dir" => display_dir(&self.production_directory),
            "backup-ext" => self.backup_extension.clone(),
            "attribute-backend" => self.attribute_backend.to_string(),
            "attribute-namespace" => self.attribute_namespace.clone(),
            other => return Err(unknown_key(other)),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "backup-dir" => self.backup_directory = Some(PathBuf::from(value)),
            "production-dir" => self.production_directory = Some(PathBuf::from(value)),
            "backup-ext" => self.set_backup_extension(value),
            "attribute-backend" => self.attribute_backend = value.parse()?,
            "attribute-namespace" => {
                if value.trim().is_empty() {
                    return Err(SnapverError::Config(
                        "attribute-namespace cannot be empty".to_string(),
                    ));
                }
                self.attribute_namespace = value.trim().to_string();
            }
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }

    /// All keys with their current values, in display order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .map(|key| (*key, self.get(key).unwrap_or_default()))
            .collect()
    }
}

fn display_dir(dir: &Option<PathBuf>) -> String {
    dir.as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_default()
}

fn unknown_key(key: &str) -> SnapverError {
    SnapverError::Config(format!(
        "Unknown config key '{}' (expected one of: {})",
        key,
        CONFIG_KEYS.join(", ")
    ))
}
