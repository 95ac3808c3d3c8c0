use crate::api::SnapverApi;
use crate::config::SnapverConfig;
use crate::error::{Result, SnapverError};
use crate::store::FsAttributeStore;
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides the platform config directory.
pub const HOME_ENV: &str = "SNAPVER_HOME";

pub struct SnapverContext {
    pub api: SnapverApi<FsAttributeStore>,
    pub config_dir: PathBuf,
}

/// Where `config.json` lives: `$SNAPVER_HOME`, else the platform config dir.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(home) = env::var_os(HOME_ENV).filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("com", "snapver", "snapver")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            SnapverError::Config(format!(
                "Could not determine config dir (set {} to choose one)",
                HOME_ENV
            ))
        })
}

pub fn initialize(config_dir: PathBuf) -> Result<SnapverContext> {
    let config = SnapverConfig::load(&config_dir)?;
    let store = FsAttributeStore::from_backend(config.attribute_backend, &config.attribute_namespace);
    debug!(
        config_dir = %config_dir.display(),
        backend = %config.attribute_backend,
        "initialized"
    );

    let api = SnapverApi::new(store, config, config_dir.clone());
    Ok(SnapverContext { api, config_dir })
}

/// The backup directory to work in: an explicit override, else the
/// configured one, else `cwd`.
pub fn backup_directory(config: &SnapverConfig, override_dir: Option<&Path>, cwd: &Path) -> PathBuf {
    override_dir
        .map(Path::to_path_buf)
        .or_else(|| config.backup_directory.clone())
        .unwrap_or_else(|| cwd.to_path_buf())
}
